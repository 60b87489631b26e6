use crate::browser::{PageTransport, TargetId};
use crate::config::SettingsProvider;
use crate::error::Result;
use crate::generation::{Generation, GenerationClient};
use crate::orchestrator::{ExecutionOutcome, ExecutionRequest, Orchestrator};
use serde::Serialize;
use std::fmt;

/// Who an interaction log entry comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub role: Role,
    pub text: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.role {
            Role::User => write!(f, "> {}", self.text),
            Role::Assistant => write!(f, "{}", self.text),
            Role::System => write!(f, "[system] {}", self.text),
            Role::Error => write!(f, "[error] {}", self.text),
        }
    }
}

/// A suggested script waiting for the user's go-ahead
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingScript {
    pub target_id: TargetId,
    pub code: String,
}

/// One user's conversation about one page
pub struct Session<T: PageTransport + 'static, S: SettingsProvider> {
    orchestrator: Orchestrator<T>,
    client: GenerationClient<S>,
    target: TargetId,
    log: Vec<LogEntry>,
    pending: Option<PendingScript>,
}

impl<T: PageTransport + 'static, S: SettingsProvider> Session<T, S> {
    pub fn new(orchestrator: Orchestrator<T>, client: GenerationClient<S>, target: TargetId) -> Self {
        Self {
            orchestrator,
            client,
            target,
            log: Vec::new(),
            pending: None,
        }
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    pub fn pending_script(&self) -> Option<&PendingScript> {
        self.pending.as_ref()
    }

    pub fn orchestrator(&self) -> &Orchestrator<T> {
        &self.orchestrator
    }

    pub fn target(&self) -> &TargetId {
        &self.target
    }

    fn record(&mut self, role: Role, text: impl Into<String>) {
        let entry = LogEntry {
            role,
            text: text.into(),
        };
        ::log::debug!("{}", entry);
        self.log.push(entry);
    }

    /// Run one turn. Every failure ends up in the log; the session stays usable.
    ///
    /// Returns the generation when the service answered.
    pub async fn send(&mut self, input: &str) -> Option<Generation> {
        let message = input.trim();
        if message.is_empty() {
            return None;
        }

        // One read per turn; the same values reach the generation request
        let settings = match self.client.settings().load() {
            Ok(settings) => settings,
            Err(e) => {
                self.record(Role::Error, e.to_string());
                return None;
            }
        };
        if let Err(e) = settings.require_api_key() {
            self.record(Role::Error, e.to_string());
            return None;
        }

        self.record(Role::User, message);
        self.pending = None;

        let snapshot = match self.orchestrator.request_snapshot(&self.target).await {
            Ok(snapshot) => {
                self.record(Role::System, format!("Read the current page: {}", snapshot.title));
                Some(snapshot)
            }
            Err(e) => {
                ::log::warn!("Continuing without a snapshot ({}): {}", e.kind(), e);
                self.record(Role::System, format!("Could not read the page: {}", e));
                None
            }
        };

        match self
            .client
            .generate_with(&settings, message, snapshot.as_ref())
            .await
        {
            Ok(generation) => {
                self.record(Role::Assistant, generation.text.clone());
                if generation.truncated {
                    self.record(
                        Role::System,
                        "The reply was cut off at the output token limit.",
                    );
                }
                if let (Some(code), Some(_)) = (&generation.code, &snapshot) {
                    self.pending = Some(PendingScript {
                        target_id: self.target.clone(),
                        code: code.clone(),
                    });
                }
                Some(generation)
            }
            Err(e) => {
                ::log::error!("Generation failed ({}): {}", e.kind(), e);
                self.record(Role::Error, e.to_string());
                None
            }
        }
    }

    /// Execute the pending script, if any, and log the outcome
    pub async fn execute_pending(&mut self) -> Option<Result<ExecutionOutcome>> {
        let script = self.pending.take()?;
        let outcome = self
            .orchestrator
            .execute_code(ExecutionRequest {
                target_id: script.target_id,
                code: script.code,
            })
            .await;

        match &outcome {
            Ok(ExecutionOutcome {
                result: Some(value),
            }) if !value.is_null() => {
                self.record(Role::System, format!("Script executed: {}", value))
            }
            Ok(_) => self.record(Role::System, "Script executed."),
            Err(e) => self.record(Role::Error, format!("Script failed: {}", e)),
        }
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::AgentReply;
    use crate::config::{GenerationSettings, StaticSettings};
    use crate::extract::{Extractor, Summarizer};
    use crate::orchestrator::tests::{FakeReply, FakeTransport, demo_page};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SCRIPTED_REPLY: &str = "Sure:\n```javascript\nreturn document.title;\n```";

    async fn service(status: u16, body: Value) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&server)
            .await;
        server
    }

    fn answer(text: &str) -> Value {
        json!({"candidates": [{"content": {"parts": [{"text": text}]}, "finishReason": "STOP"}]})
    }

    fn session(
        transport: FakeTransport,
        server: &MockServer,
        api_key: &str,
    ) -> Session<FakeTransport, StaticSettings> {
        let orchestrator = Orchestrator::new(
            Arc::new(transport),
            Extractor::default(),
            Summarizer::default(),
        )
        .with_snapshot_timeout(Duration::from_secs(2))
        .with_execution_timeout(Duration::from_millis(200));
        let settings = StaticSettings(GenerationSettings {
            api_key: api_key.to_string(),
            ..GenerationSettings::default()
        });
        Session::new(
            orchestrator,
            GenerationClient::with_base_url(settings, server.uri()),
            TargetId::new("target-1"),
        )
    }

    fn roles<T: PageTransport + 'static, S: SettingsProvider>(session: &Session<T, S>) -> Vec<Role> {
        session.log().iter().map(|entry| entry.role).collect()
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let server = service(200, answer("hi")).await;
        let mut session = session(FakeTransport::new(Some(demo_page()), FakeReply::Never), &server, "k");

        assert!(session.send("   \n").await.is_none());
        assert!(session.log().is_empty());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_key_reported_before_anything_else() {
        let server = service(200, answer("hi")).await;
        let mut session = session(FakeTransport::new(Some(demo_page()), FakeReply::Never), &server, "");

        assert!(session.send("hello").await.is_none());
        assert_eq!(roles(&session), vec![Role::Error]);
        assert_eq!(
            session.orchestrator().transport().injections.load(Ordering::SeqCst),
            0
        );
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_turn_with_script_then_execute() {
        let server = service(200, answer(SCRIPTED_REPLY)).await;
        let execution_reply = AgentReply {
            success: true,
            result: Some(json!("Demo")),
            ..AgentReply::default()
        };
        let mut session = session(
            FakeTransport::new(Some(demo_page()), FakeReply::Reply(execution_reply)),
            &server,
            "k",
        );

        let generation = session.send("What is the title?").await.unwrap();
        assert_eq!(generation.code.as_deref(), Some("return document.title;"));
        assert_eq!(roles(&session), vec![Role::User, Role::System, Role::Assistant]);
        assert_eq!(session.log()[2].text, SCRIPTED_REPLY);
        assert_eq!(
            session.pending_script().map(|script| script.code.as_str()),
            Some("return document.title;")
        );

        let outcome = session.execute_pending().await.unwrap().unwrap();
        assert_eq!(outcome.result, Some(json!("Demo")));
        assert!(session.pending_script().is_none());
        assert_eq!(session.log().last().unwrap().role, Role::System);
        assert!(session.execute_pending().await.is_none());
    }

    #[tokio::test]
    async fn test_snapshot_failure_degrades_gracefully() {
        let server = service(200, answer(SCRIPTED_REPLY)).await;
        let mut session = session(
            FakeTransport::new(None, FakeReply::Fail("Receiving end does not exist".to_string())),
            &server,
            "k",
        );

        let generation = session.send("Click the button").await.unwrap();
        assert!(generation.code.is_some());
        assert!(session.pending_script().is_none());
        assert_eq!(roles(&session), vec![Role::User, Role::System, Role::Assistant]);
        assert!(session.log()[1].text.contains("Could not read the page"));

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["contents"][0]["parts"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_service_error_keeps_session_usable() {
        let server = service(429, json!({"error": {"message": "quota exceeded"}})).await;
        let mut session = session(FakeTransport::new(Some(demo_page()), FakeReply::Never), &server, "k");

        assert!(session.send("first").await.is_none());
        assert!(session.send("second").await.is_none());

        let errors: Vec<&str> = session
            .log()
            .iter()
            .filter(|entry| entry.role == Role::Error)
            .map(|entry| entry.text.as_str())
            .collect();
        assert_eq!(errors, vec!["quota exceeded", "quota exceeded"]);
        assert_eq!(session.log().iter().filter(|e| e.role == Role::User).count(), 2);
    }

    #[tokio::test]
    async fn test_execution_timeout_is_logged() {
        let server = service(200, answer(SCRIPTED_REPLY)).await;
        let mut session = session(FakeTransport::new(Some(demo_page()), FakeReply::Never), &server, "k");

        session.send("Do it").await.unwrap();
        let outcome = session.execute_pending().await.unwrap();

        assert!(outcome.is_err());
        let last = session.log().last().unwrap();
        assert_eq!(last.role, Role::Error);
        assert!(last.text.contains("timed out"));
    }

    struct CountingSettings {
        loads: std::sync::atomic::AtomicUsize,
    }

    impl SettingsProvider for CountingSettings {
        fn load(&self) -> Result<GenerationSettings> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(GenerationSettings {
                api_key: "k".to_string(),
                ..GenerationSettings::default()
            })
        }
    }

    #[tokio::test]
    async fn test_settings_read_once_per_turn() {
        let server = service(200, answer("hi")).await;
        let orchestrator = Orchestrator::new(
            Arc::new(FakeTransport::new(Some(demo_page()), FakeReply::Never)),
            Extractor::default(),
            Summarizer::default(),
        );
        let settings = CountingSettings {
            loads: std::sync::atomic::AtomicUsize::new(0),
        };
        let mut session = Session::new(
            orchestrator,
            GenerationClient::with_base_url(settings, server.uri()),
            TargetId::new("target-1"),
        );

        session.send("first").await.unwrap();
        assert_eq!(session.client.settings().loads.load(Ordering::SeqCst), 1);
        session.send("second").await.unwrap();
        assert_eq!(session.client.settings().loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_log_entry_display() {
        let entry = LogEntry {
            role: Role::Error,
            text: "quota exceeded".to_string(),
        };
        assert_eq!(entry.to_string(), "[error] quota exceeded");
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({"role": "error", "text": "quota exceeded"})
        );
    }
}
