use super::transport::{
    AgentMessage, AgentReply, PageTransport, RELAY_SCRIPT, TargetId, agent_install_script,
    direct_probe_script,
};
use crate::dom::{ProbeRequest, RawPage};
use crate::error::{AgentError, Result};
use async_trait::async_trait;
use fantoccini::wd::{TimeoutConfiguration, WindowHandle};
use fantoccini::{Client, ClientBuilder};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

/// Common WebDriver endpoints tried when the configured one refuses the session
const FALLBACK_WEBDRIVER_URLS: &[&str] = &[
    "http://localhost:9515", // ChromeDriver default
    "http://localhost:4723", // Appium default
    "http://localhost:9222", // Chrome debug port default
    "http://127.0.0.1:4444",
];

#[derive(Debug, Default)]
struct Windows {
    handles: HashMap<TargetId, WindowHandle>,
    focused: Option<TargetId>,
    opened: usize,
}

impl Windows {
    /// The browser now shows a window no target owns
    fn focus_lost(&mut self) {
        self.focused = None;
    }

    fn register(&mut self, handle: WindowHandle) -> TargetId {
        self.opened += 1;
        let target = TargetId::new(format!("target-{}", self.opened));
        self.handles.insert(target.clone(), handle);
        self.focused = Some(target.clone());
        target
    }

    fn is_focused(&self, target: &TargetId) -> bool {
        self.focused.as_ref() == Some(target)
    }
}

/// [`PageTransport`] over one WebDriver session; each target is a browser window
pub struct WebDriverTransport {
    client: Client,
    // Held for the whole command so a window switch and the script it serves stay paired
    windows: Mutex<Windows>,
}

impl WebDriverTransport {
    /// Start a session at `webdriver_url`, falling back to well-known local endpoints.
    ///
    /// `script_timeout` bounds every script the session runs and should exceed the
    /// orchestrator's deadlines.
    pub async fn connect(webdriver_url: &str, script_timeout: Duration) -> Result<Self> {
        let client = connect_to_webdriver(webdriver_url).await?;
        client
            .update_timeouts(TimeoutConfiguration::new(Some(script_timeout), None, None))
            .await?;

        Ok(Self {
            client,
            windows: Mutex::new(Windows::default()),
        })
    }

    /// Navigate to `url` and return it as a new target.
    ///
    /// The first target reuses the session's initial window; later ones open a tab.
    pub async fn open(&self, url: &str) -> Result<TargetId> {
        let mut windows = self.windows.lock().await;

        let handle = if windows.handles.is_empty() {
            self.client.window().await?
        } else {
            let created = self.client.new_window(true).await?;
            windows.focus_lost();
            self.client.switch_to_window(created.handle.clone()).await?;
            created.handle
        };

        if let Err(e) = self.client.goto(url).await {
            ::log::error!("Failed to navigate to {}: {}", url, e);
            return Err(e.into());
        }

        let target = windows.register(handle);

        ::log::info!("Opened {} as {}", url, target);
        Ok(target)
    }

    /// End the WebDriver session
    pub async fn close(&self) -> Result<()> {
        self.client.clone().close().await?;
        ::log::debug!("Closed WebDriver session");
        Ok(())
    }

    /// Lock the window table with `target` focused
    async fn focus(&self, target: &TargetId) -> Result<MutexGuard<'_, Windows>> {
        let mut windows = self.windows.lock().await;
        if windows.is_focused(target) {
            return Ok(windows);
        }

        let handle = windows
            .handles
            .get(target)
            .cloned()
            .ok_or_else(|| AgentError::Transport(format!("no such target: {}", target)))?;
        self.client.switch_to_window(handle).await?;
        windows.focused = Some(target.clone());
        ::log::trace!("Switched to {}", target);
        Ok(windows)
    }
}

#[async_trait]
impl PageTransport for WebDriverTransport {
    async fn inject_agent(&self, target: &TargetId) -> Result<()> {
        let _focus = self.focus(target).await?;
        let installed = self.client.execute(&agent_install_script(), Vec::new()).await?;
        if installed.as_bool() == Some(false) {
            ::log::debug!("Page agent already present in {}", target);
        } else {
            ::log::debug!("Installed page agent in {}", target);
        }
        Ok(())
    }

    async fn collect_direct(&self, target: &TargetId, request: &ProbeRequest) -> Result<RawPage> {
        let argument = serde_json::to_value(request)
            .map_err(|e| AgentError::Transport(format!("cannot encode probe request: {}", e)))?;

        let _focus = self.focus(target).await?;
        let value = self
            .client
            .execute(&direct_probe_script(), vec![argument])
            .await?;

        serde_json::from_value(value)
            .map_err(|e| AgentError::Transport(format!("unreadable probe output: {}", e)))
    }

    async fn send_message(&self, target: &TargetId, message: &AgentMessage) -> Result<AgentReply> {
        let argument = serde_json::to_value(message)
            .map_err(|e| AgentError::Transport(format!("cannot encode message: {}", e)))?;

        let _focus = self.focus(target).await?;
        let value = self
            .client
            .execute_async(RELAY_SCRIPT, vec![argument])
            .await?;

        serde_json::from_value(value)
            .map_err(|e| AgentError::Transport(format!("unreadable agent reply: {}", e)))
    }
}

/// Connects to the WebDriver instance
async fn connect_to_webdriver(webdriver_url: &str) -> Result<Client> {
    let first_error = match ClientBuilder::native().connect(webdriver_url).await {
        Ok(client) => {
            ::log::debug!("Connected to WebDriver at {}", webdriver_url);
            return Ok(client);
        }
        Err(e) => {
            ::log::error!(
                "Failed to connect to WebDriver at {}: {}",
                webdriver_url,
                e
            );
            e
        }
    };

    for url in FALLBACK_WEBDRIVER_URLS {
        if *url == webdriver_url {
            continue;
        }

        ::log::info!("Trying fallback WebDriver URL: {}", url);
        if let Ok(client) = ClientBuilder::native().connect(url).await {
            ::log::debug!("Connected to fallback WebDriver at {}", url);
            return Ok(client);
        }
    }

    ::log::error!(
        "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
    );
    Err(first_error.into())
}
