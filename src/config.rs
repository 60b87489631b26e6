use crate::error::{AgentError, Result};
use crate::extract::{ExtractOptions, SummaryConfig};
use crate::filter::ImportanceConfig;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides the configured WebDriver URL
pub const WEBDRIVER_URL_ENV: &str = "WEBDRIVER_URL";

/// Environment variable that overrides the stored API key
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Configuration for the page agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    #[serde(default)]
    pub extract: ExtractOptions,

    /// Which elements count as important containers
    #[serde(default)]
    pub importance: ImportanceConfig,

    #[serde(default)]
    pub summary: SummaryConfig,

    /// Deadline for one snapshot request
    #[serde(default = "default_snapshot_timeout_secs")]
    pub snapshot_timeout_secs: u64,

    /// Deadline for one code execution request
    #[serde(default = "default_execution_timeout_secs")]
    pub execution_timeout_secs: u64,

    /// WebDriver script timeout; keep it above both deadlines
    #[serde(default = "default_script_timeout_secs")]
    pub script_timeout_secs: u64,

    /// Root of the generation service API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_snapshot_timeout_secs() -> u64 {
    30
}

fn default_execution_timeout_secs() -> u64 {
    10
}

fn default_script_timeout_secs() -> u64 {
    60
}

fn default_api_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            extract: ExtractOptions::default(),
            importance: ImportanceConfig::default(),
            summary: SummaryConfig::default(),
            snapshot_timeout_secs: default_snapshot_timeout_secs(),
            execution_timeout_secs: default_execution_timeout_secs(),
            script_timeout_secs: default_script_timeout_secs(),
            api_base_url: default_api_base_url(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = read_file(path)?;
        Self::from_json(&contents)
            .map_err(|e| AgentError::Configuration(format!("{}: {}", path.display(), e)))
    }

    /// Load configuration from a JSON string
    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).map_err(|e| AgentError::Configuration(e.to_string()))
    }

    /// Apply environment overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(webdriver_url) = std::env::var(WEBDRIVER_URL_ENV) {
            if !webdriver_url.is_empty() {
                self.webdriver_url = webdriver_url;
            }
        }
        self
    }

    pub fn snapshot_timeout(&self) -> Duration {
        Duration::from_secs(self.snapshot_timeout_secs)
    }

    pub fn execution_timeout(&self) -> Duration {
        Duration::from_secs(self.execution_timeout_secs)
    }

    pub fn script_timeout(&self) -> Duration {
        Duration::from_secs(self.script_timeout_secs)
    }
}

/// User-level settings for the generation service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Opaque credential; never logged
    #[serde(rename = "geminiApiKey", default)]
    pub api_key: String,

    #[serde(rename = "geminiModel", default = "default_model")]
    pub model: String,

    /// Sampling temperature in 0.0..=1.0
    #[serde(rename = "geminiTemperature", default = "default_temperature")]
    pub temperature: f32,

    #[serde(rename = "geminiMaxTokens", default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

fn default_model() -> String {
    "gemini-1.5-pro".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_output_tokens() -> u32 {
    8192
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

impl GenerationSettings {
    /// Fail with a configuration error unless a credential is present
    pub fn require_api_key(&self) -> Result<&str> {
        let key = self.api_key.trim();
        if key.is_empty() {
            return Err(AgentError::Configuration(
                "no API key is set; add one to the settings file or set GEMINI_API_KEY".to_string(),
            ));
        }
        Ok(key)
    }

    /// Temperature limited to the range the service accepts
    pub fn clamped_temperature(&self) -> f32 {
        if !(0.0..=1.0).contains(&self.temperature) {
            ::log::warn!(
                "Temperature {} is outside 0.0..=1.0, clamping",
                self.temperature
            );
        }
        self.temperature.clamp(0.0, 1.0)
    }
}

/// Source of [`GenerationSettings`], consulted once per request
pub trait SettingsProvider: Send + Sync {
    fn load(&self) -> Result<GenerationSettings>;
}

/// Fixed settings
#[derive(Debug, Clone, Default)]
pub struct StaticSettings(pub GenerationSettings);

impl SettingsProvider for StaticSettings {
    fn load(&self) -> Result<GenerationSettings> {
        Ok(self.0.clone())
    }
}

/// Settings kept in a JSON key-value file, re-read on every load.
///
/// A missing file yields defaults without a credential.
#[derive(Debug, Clone)]
pub struct StoredSettings {
    path: PathBuf,
    key_env: Option<String>,
}

impl StoredSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            key_env: Some(API_KEY_ENV.to_string()),
        }
    }

    /// Ignore the API key environment variable
    pub fn without_env_override(mut self) -> Self {
        self.key_env = None;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `settings` back to the file
    pub fn save(&self, settings: &GenerationSettings) -> Result<()> {
        let contents = serde_json::to_string_pretty(settings)
            .map_err(|e| AgentError::Configuration(e.to_string()))?;
        std::fs::write(&self.path, contents).map_err(|e| {
            AgentError::Configuration(format!("cannot write {}: {}", self.path.display(), e))
        })?;
        ::log::info!("Saved settings to {}", self.path.display());
        Ok(())
    }
}

impl SettingsProvider for StoredSettings {
    fn load(&self) -> Result<GenerationSettings> {
        let mut settings = if self.path.exists() {
            let contents = read_file(&self.path)?;
            serde_json::from_str(&contents).map_err(|e| {
                AgentError::Configuration(format!("{}: {}", self.path.display(), e))
            })?
        } else {
            ::log::debug!(
                "Settings file {} not found, using defaults",
                self.path.display()
            );
            GenerationSettings::default()
        };

        if let Some(var) = &self.key_env {
            if let Ok(key) = std::env::var(var) {
                if !key.trim().is_empty() {
                    settings.api_key = key;
                }
            }
        }

        Ok(settings)
    }
}

fn read_file(path: &Path) -> Result<String> {
    let mut contents = String::new();
    File::open(path)
        .and_then(|mut file| file.read_to_string(&mut contents))
        .map_err(|e| AgentError::Configuration(format!("cannot read {}: {}", path.display(), e)))?;
    Ok(contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_defaults() {
        let config = AgentConfig::from_json("{}").unwrap();
        assert_eq!(config, AgentConfig::default());
        assert_eq!(config.snapshot_timeout(), Duration::from_secs(30));
        assert_eq!(config.execution_timeout(), Duration::from_secs(10));
        assert_eq!(config.extract.max_depth, 8);
        assert_eq!(config.importance.tags, vec!["main", "article", "section"]);
    }

    #[test]
    fn test_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "webdriver_url": "http://localhost:9515",
                "extract": {{"max_children": 20}},
                "importance": {{"class_keywords": ["story"]}},
                "execution_timeout_secs": 3
            }}"#
        )
        .unwrap();

        let config = AgentConfig::from_file(file.path()).unwrap();
        assert_eq!(config.webdriver_url, "http://localhost:9515");
        assert_eq!(config.extract.max_children, 20);
        assert_eq!(config.extract.max_important_children, 100);
        assert_eq!(config.importance.class_keywords, vec!["story"]);
        assert_eq!(config.importance.ids, vec!["main", "content"]);
        assert_eq!(config.execution_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_config_errors_are_configuration_errors() {
        let err = AgentConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, AgentError::Configuration(_)));

        let err = AgentConfig::from_file("/nonexistent/agent.json").unwrap_err();
        assert!(matches!(err, AgentError::Configuration(_)));
    }

    #[test]
    fn test_stored_settings_reread_each_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = StoredSettings::new(&path).without_env_override();

        let loaded = settings.load().unwrap();
        assert_eq!(loaded, GenerationSettings::default());
        assert!(loaded.require_api_key().is_err());

        std::fs::write(
            &path,
            r#"{"geminiApiKey": "abc", "geminiModel": "gemini-2.5-flash-preview", "geminiTemperature": 0.2}"#,
        )
        .unwrap();
        let loaded = settings.load().unwrap();
        assert_eq!(loaded.require_api_key().unwrap(), "abc");
        assert_eq!(loaded.model, "gemini-2.5-flash-preview");
        assert_eq!(loaded.temperature, 0.2);
        assert_eq!(loaded.max_output_tokens, 8192);
    }

    #[test]
    fn test_stored_settings_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let settings = StoredSettings::new(dir.path().join("settings.json")).without_env_override();
        let value = GenerationSettings {
            api_key: "k".to_string(),
            model: "gemini-2.0-flash".to_string(),
            temperature: 1.0,
            max_output_tokens: 1024,
        };

        settings.save(&value).unwrap();
        assert_eq!(settings.load().unwrap(), value);
    }

    #[test]
    fn test_invalid_settings_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[1, 2]").unwrap();
        let err = StoredSettings::new(file.path())
            .without_env_override()
            .load()
            .unwrap_err();
        assert!(matches!(err, AgentError::Configuration(_)));
    }

    #[test]
    fn test_temperature_clamp() {
        let settings = GenerationSettings {
            temperature: 1.7,
            ..GenerationSettings::default()
        };
        assert_eq!(settings.clamped_temperature(), 1.0);
        assert_eq!(GenerationSettings::default().clamped_temperature(), 0.7);
    }
}
