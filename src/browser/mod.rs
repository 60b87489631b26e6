//! The channel into a live page: the page agent scripts, the transport seam the
//! orchestrator talks through, and its WebDriver implementation.

pub mod transport;
pub mod webdriver;

pub use transport::{AgentMessage, AgentReply, PageTransport, TargetId};
pub use webdriver::WebDriverTransport;
