use crate::dom::{ProbeRequest, RawPage};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The page probe, a function expression taking a [`ProbeRequest`]
pub const PROBE_SCRIPT: &str = include_str!("scripts/probe.js");

const AGENT_TEMPLATE: &str = include_str!("scripts/agent.js");

/// Script body that installs `window.__pageAgent`; evaluates to `false` if already present
pub fn agent_install_script() -> String {
    format!(
        "return {}",
        AGENT_TEMPLATE
            .trim()
            .replace("__COLLECT_PAGE__", PROBE_SCRIPT.trim())
    )
}

/// Script body that runs the probe synchronously with `arguments[0]` as its options
pub fn direct_probe_script() -> String {
    format!("return ({})(arguments[0]);", PROBE_SCRIPT.trim())
}

/// Asynchronous script body that relays `arguments[0]` to the page agent
pub const RELAY_SCRIPT: &str = r#"
var done = arguments[arguments.length - 1];
if (!window.__pageAgent) {
  throw new Error('page agent is not loaded');
}
window.__pageAgent.handle(arguments[0], done);
"#;

/// Identifies one controllable document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(String);

impl TargetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A request understood by the page agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum AgentMessage {
    #[serde(rename = "getDOMStructure")]
    GetDomStructure { options: ProbeRequest },

    #[serde(rename = "executeScript")]
    ExecuteScript {
        #[serde(rename = "tabId")]
        tab_id: TargetId,
        script: String,
        /// The page answers with an error once this many milliseconds pass
        #[serde(rename = "timeoutMs")]
        timeout_ms: u64,
    },
}

/// The page agent's reply to an [`AgentMessage`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentReply {
    pub success: bool,
    pub page_title: String,
    pub page_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dom_structure: Option<RawPage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentReply {
    /// A failed reply carrying an error message
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// The channel between the orchestrator and a document.
///
/// Every method may fail with a transport error. An error inside the document is not a
/// transport failure: `send_message` reports it through [`AgentReply::error`].
#[async_trait]
pub trait PageTransport: Send + Sync {
    /// Install the page agent into the target. Installing twice is harmless.
    async fn inject_agent(&self, target: &TargetId) -> Result<()>;

    /// Run the probe directly in the target document
    async fn collect_direct(&self, target: &TargetId, request: &ProbeRequest) -> Result<RawPage>;

    /// Deliver a message to the already-installed page agent and wait for its reply
    async fn send_message(&self, target: &TargetId, message: &AgentMessage) -> Result<AgentReply>;
}
