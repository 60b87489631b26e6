// Re-export modules
pub mod browser;
pub mod config;
pub mod dom;
pub mod error;
pub mod extract;
pub mod filter;
pub mod generation;
pub mod orchestrator;
pub mod results;
pub mod session;
pub mod utils;

// Re-export commonly used types for convenience
pub use error::{AgentError, Result};
pub use results::{PageSnapshot, StructuredNode};
pub use session::Session;

use browser::WebDriverTransport;
use config::{AgentConfig, StoredSettings};
use dom::StaticDocument;
use extract::{Extractor, Summarizer};
use generation::GenerationClient;
use orchestrator::Orchestrator;
use std::path::PathBuf;
use std::sync::Arc;

/// Settings file used when none is given
pub const DEFAULT_SETTINGS_FILE: &str = "page-agent.settings.json";

/// Main builder for page sessions and snapshots
pub struct Agent {
    config: AgentConfig,
    settings_path: PathBuf,
}

impl Default for Agent {
    fn default() -> Self {
        Self::new()
    }
}

impl Agent {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: AgentConfig::default(),
            settings_path: PathBuf::from(DEFAULT_SETTINGS_FILE),
        }
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Load configuration from a file
    pub fn with_config_file(self, path: impl AsRef<std::path::Path>) -> Result<Self> {
        let config = AgentConfig::from_file(path)?;
        Ok(self.with_config(config))
    }

    /// Load configuration from a string
    pub fn with_config_str(self, config_str: &str) -> Result<Self> {
        let config = AgentConfig::from_json(config_str)?;
        Ok(self.with_config(config))
    }

    pub fn with_webdriver_url(mut self, url: impl Into<String>) -> Self {
        self.config.webdriver_url = url.into();
        self
    }

    /// Where generation settings are read from on every request
    pub fn with_settings_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = path.into();
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn settings(&self) -> StoredSettings {
        StoredSettings::new(&self.settings_path)
    }

    pub fn extractor(&self) -> Extractor {
        Extractor::new(self.config.extract.clone(), self.config.importance.clone())
    }

    pub fn summarizer(&self) -> Summarizer {
        Summarizer::new(self.config.summary.clone())
    }

    pub fn generation_client(&self) -> GenerationClient<StoredSettings> {
        GenerationClient::with_base_url(self.settings(), self.config.api_base_url.clone())
    }

    /// Snapshot an HTML document without a browser
    pub fn snapshot_html(&self, html: &str, base_url: Option<&str>) -> PageSnapshot {
        let doc = StaticDocument::parse(html, base_url);
        PageSnapshot::capture(&doc, &self.extractor(), &self.summarizer())
    }

    /// Connect to WebDriver, honouring the `WEBDRIVER_URL` override
    pub async fn connect(&self) -> Result<Arc<WebDriverTransport>> {
        let config = self.config.clone().with_env_overrides();
        ::log::info!("Connecting to WebDriver at {}", config.webdriver_url);
        let transport =
            WebDriverTransport::connect(&config.webdriver_url, config.script_timeout()).await?;
        Ok(Arc::new(transport))
    }

    pub fn orchestrator(&self, transport: Arc<WebDriverTransport>) -> Orchestrator<WebDriverTransport> {
        Orchestrator::new(transport, self.extractor(), self.summarizer())
            .with_snapshot_timeout(self.config.snapshot_timeout())
            .with_execution_timeout(self.config.execution_timeout())
    }

    /// Open `url` in a fresh browser session and start a conversation about it
    pub async fn open(&self, url: &str) -> Result<Session<WebDriverTransport, StoredSettings>> {
        let transport = self.connect().await?;
        let target = transport.open(url).await?;
        Ok(Session::new(
            self.orchestrator(transport),
            self.generation_client(),
            target,
        ))
    }

    /// Snapshot one live page and close the browser session
    pub async fn snapshot_url(&self, url: &str) -> Result<PageSnapshot> {
        let transport = self.connect().await?;
        let result = match transport.open(url).await {
            Ok(target) => {
                self.orchestrator(Arc::clone(&transport))
                    .request_snapshot(&target)
                    .await
            }
            Err(e) => Err(e),
        };

        if let Err(e) = transport.close().await {
            ::log::warn!("Failed to close WebDriver session: {}", e);
        }
        result
    }
}
