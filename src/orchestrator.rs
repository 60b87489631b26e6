use crate::browser::{AgentMessage, PageTransport, TargetId};
use crate::dom::ProbeRequest;
use crate::dom::raw::PROBE_TEXT_CLIP;
use crate::error::{AgentError, Result};
use crate::extract::{Extractor, Summarizer};
use crate::results::PageSnapshot;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::{sleep, timeout};

pub const DEFAULT_SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_EXECUTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Code to run inside one target. The code is passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub target_id: TargetId,
    pub code: String,
}

/// What a successful execution returned, if anything
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    pub result: Option<Value>,
}

/// Single-assignment slot for the reply to one request.
///
/// The first [`ReplyCell::answer`] is delivered to the receiver returned by
/// [`ReplyCell::new`]; every later answer is dropped and reports `false`.
#[derive(Debug)]
pub struct ReplyCell<T> {
    sender: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T> ReplyCell<T> {
    pub fn new() -> (Arc<Self>, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        let cell = Arc::new(Self {
            sender: Mutex::new(Some(tx)),
        });
        (cell, rx)
    }

    /// Deliver `value` unless the cell was already answered
    pub fn answer(&self, value: T) -> bool {
        let sender = match self.sender.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match sender {
            Some(tx) => {
                // A dropped receiver still consumes the answer
                let _ = tx.send(value);
                true
            }
            None => false,
        }
    }

    pub fn is_answered(&self) -> bool {
        match self.sender.lock() {
            Ok(slot) => slot.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }
}

/// Brokers snapshot and execution requests between the caller and the page agent
pub struct Orchestrator<T: PageTransport + 'static> {
    transport: Arc<T>,
    extractor: Extractor,
    summarizer: Summarizer,
    snapshot_timeout: Duration,
    execution_timeout: Duration,
}

impl<T: PageTransport + 'static> Orchestrator<T> {
    pub fn new(transport: Arc<T>, extractor: Extractor, summarizer: Summarizer) -> Self {
        Self {
            transport,
            extractor,
            summarizer,
            snapshot_timeout: DEFAULT_SNAPSHOT_TIMEOUT,
            execution_timeout: DEFAULT_EXECUTION_TIMEOUT,
        }
    }

    pub fn with_snapshot_timeout(mut self, deadline: Duration) -> Self {
        self.snapshot_timeout = deadline;
        self
    }

    pub fn with_execution_timeout(mut self, deadline: Duration) -> Self {
        self.execution_timeout = deadline;
        self
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// The probe parameters the extractor and summarizer need
    pub fn probe_request(&self) -> ProbeRequest {
        let options = self.extractor.options();
        ProbeRequest {
            max_depth: options.max_depth,
            max_children: options.max_children,
            max_important_children: options.max_important_children,
            text_clip: PROBE_TEXT_CLIP,
            queries: self.summarizer.probe_queries(),
            meta_names: self.summarizer.meta_names(),
        }
    }

    /// Capture a snapshot of `target`.
    ///
    /// Runs the probe directly in the document first and falls back to asking the page
    /// agent. Bounded by the snapshot deadline.
    pub async fn request_snapshot(&self, target: &TargetId) -> Result<PageSnapshot> {
        ::log::debug!("Requesting snapshot of {}", target);
        match timeout(self.snapshot_timeout, self.collect_snapshot(target)).await {
            Ok(result) => result,
            Err(_) => {
                ::log::warn!(
                    "Snapshot of {} did not complete within {:?}",
                    target,
                    self.snapshot_timeout
                );
                Err(AgentError::Timeout(self.snapshot_timeout))
            }
        }
    }

    async fn collect_snapshot(&self, target: &TargetId) -> Result<PageSnapshot> {
        ensure_agent(self.transport.as_ref(), target).await;
        let request = self.probe_request();

        let page = match self.transport.collect_direct(target, &request).await {
            Ok(page) => page,
            Err(e) => {
                ::log::info!(
                    "Direct extraction in {} failed ({}), asking the page agent",
                    target,
                    e
                );
                let message = AgentMessage::GetDomStructure { options: request };
                let reply = self.transport.send_message(target, &message).await?;
                if !reply.success {
                    return Err(AgentError::Target(reply.error.unwrap_or_else(|| {
                        "page agent could not read the page".to_string()
                    })));
                }
                reply.dom_structure.ok_or_else(|| {
                    AgentError::Target("page agent replied without a page".to_string())
                })?
            }
        };

        Ok(PageSnapshot::capture(&page, &self.extractor, &self.summarizer))
    }

    /// Run `request.code` in its target and wait for exactly one reply.
    ///
    /// The reply is the page agent's answer or a [`AgentError::Timeout`] once the
    /// execution deadline passes, whichever comes first.
    pub async fn execute_code(&self, request: ExecutionRequest) -> Result<ExecutionOutcome> {
        let deadline = self.execution_timeout;
        let (cell, reply) = ReplyCell::new();
        ::log::info!(
            "Executing {} bytes of code in {}",
            request.code.len(),
            request.target_id
        );

        let timer = {
            let cell = Arc::clone(&cell);
            let target = request.target_id.clone();
            tokio::spawn(async move {
                sleep(deadline).await;
                if cell.answer(Err(AgentError::Timeout(deadline))) {
                    ::log::warn!("Execution in {} timed out after {:?}", target, deadline);
                }
            })
        };

        let worker = {
            let cell = Arc::clone(&cell);
            let transport = Arc::clone(&self.transport);
            tokio::spawn(async move {
                let outcome = run_script(transport.as_ref(), &request, deadline).await;
                if !cell.answer(outcome) {
                    ::log::debug!(
                        "Discarding late execution reply from {}",
                        request.target_id
                    );
                }
            })
        };

        let outcome = match reply.await {
            Ok(outcome) => outcome,
            Err(_) => Err(AgentError::Transport(
                "execution ended without a reply".to_string(),
            )),
        };
        timer.abort();
        // A worker still waiting on the page would keep holding the transport
        worker.abort();
        outcome
    }
}

/// Install the page agent, ignoring failures; an existing agent looks the same as a refusal
async fn ensure_agent<T: PageTransport + ?Sized>(transport: &T, target: &TargetId) {
    if let Err(e) = transport.inject_agent(target).await {
        ::log::debug!("Ignoring page agent injection error in {}: {}", target, e);
    }
}

async fn run_script<T: PageTransport + ?Sized>(
    transport: &T,
    request: &ExecutionRequest,
    deadline: Duration,
) -> Result<ExecutionOutcome> {
    ensure_agent(transport, &request.target_id).await;

    let message = AgentMessage::ExecuteScript {
        tab_id: request.target_id.clone(),
        script: request.code.clone(),
        timeout_ms: deadline.as_millis() as u64,
    };
    let reply = transport.send_message(&request.target_id, &message).await?;

    if reply.success {
        ::log::info!("Script executed in {}", request.target_id);
        Ok(ExecutionOutcome {
            result: reply.result,
        })
    } else {
        let error = reply
            .error
            .unwrap_or_else(|| "script failed without an error message".to_string());
        ::log::warn!("Script failed in {}: {}", request.target_id, error);
        Err(AgentError::Target(error))
    }
}
