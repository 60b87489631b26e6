//! Client for the external text-generation service.
//!
//! Each call reads settings fresh from the injected [`SettingsProvider`], builds a
//! [`GenerationRequest`] embedding the page snapshot, and surfaces the reply text together
//! with any executable code block it contains.

pub mod request;
pub mod types;


use crate::config::{GenerationSettings, SettingsProvider};
use crate::error::{AgentError, Result};
use crate::results::PageSnapshot;
use regex::Regex;
use reqwest::StatusCode;
use std::sync::LazyLock;
use types::{ErrorEnvelope, GenerateContentResponse, ModelList};

pub use request::{
    ApiVersion, GenerationRequest, ensure_valid_model_name, extract_code, select_api_version,
};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const UNEXPECTED_SHAPE: &str = "unexpected response shape";

static MODEL_GENERATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"gemini-(\d+(?:\.\d+)?)").expect("model generation pattern is valid")
});

/// Text returned for one user turn
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    /// Full reply, shown as-is
    pub text: String,
    /// Trimmed body of the first executable code block
    pub code: Option<String>,
    /// The service stopped at the output token limit
    pub truncated: bool,
    /// Model identifier the request was sent to
    pub model: String,
}

pub struct GenerationClient<S: SettingsProvider> {
    http: reqwest::Client,
    settings: S,
    base_url: String,
}

impl<S: SettingsProvider> GenerationClient<S> {
    pub fn new(settings: S) -> Self {
        Self::with_base_url(settings, DEFAULT_BASE_URL)
    }

    /// Create a client for a custom API root (for tests and proxies)
    pub fn with_base_url(settings: S, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn settings(&self) -> &S {
        &self.settings
    }

    /// Send `message`, with the page snapshot when one is available
    pub async fn generate(
        &self,
        message: &str,
        snapshot: Option<&PageSnapshot>,
    ) -> Result<Generation> {
        let settings = self.settings.load()?;
        self.generate_with(&settings, message, snapshot).await
    }

    /// Same as [`GenerationClient::generate`] with settings the caller already loaded
    pub async fn generate_with(
        &self,
        settings: &GenerationSettings,
        message: &str,
        snapshot: Option<&PageSnapshot>,
    ) -> Result<Generation> {
        let api_key = settings.require_api_key()?;
        let request = GenerationRequest::new(settings, message, snapshot)?;

        let url = format!(
            "{}/{}/models/{}:generateContent",
            self.base_url, request.api_version, request.model
        );
        ::log::info!(
            "Requesting generation from {} ({} API, snapshot: {})",
            request.model,
            request.api_version,
            snapshot.is_some()
        );
        ::log::debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .query(&[("key", api_key)])
            .json(&request.to_wire())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = service_error_message(status, &body);
            ::log::error!("Generation request failed with {}: {}", status, message);
            return Err(AgentError::Service(message));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body).map_err(|e| {
            ::log::error!("Unreadable generation response: {}", e);
            AgentError::Service(UNEXPECTED_SHAPE.to_string())
        })?;

        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Service(UNEXPECTED_SHAPE.to_string()))?;
        let text = candidate
            .content
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text)
            .ok_or_else(|| AgentError::Service(UNEXPECTED_SHAPE.to_string()))?;

        let truncated = candidate.finish_reason.as_deref() == Some("MAX_TOKENS");
        if truncated {
            ::log::warn!(
                "Reply stopped at the output token limit ({}); raise max output tokens for longer answers",
                request.max_output_tokens
            );
        }

        let code = extract_code(&text);
        ::log::debug!(
            "Received {} characters, code block: {}",
            text.chars().count(),
            code.is_some()
        );

        Ok(Generation {
            text,
            code,
            truncated,
            model: request.model,
        })
    }

    /// Generation-capable model names, newest generation first
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let settings = self.settings.load()?;
        let api_key = settings.require_api_key()?;
        let url = format!("{}/v1beta/models", self.base_url);
        ::log::debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .query(&[("key", api_key)])
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AgentError::Service(service_error_message(status, &body)));
        }

        let list: ModelList = serde_json::from_str(&body)
            .map_err(|_| AgentError::Service(UNEXPECTED_SHAPE.to_string()))?;

        let mut models: Vec<String> = list
            .models
            .into_iter()
            .filter(|model| {
                model.name.contains("gemini")
                    && model
                        .supported_generation_methods
                        .iter()
                        .any(|method| method == "generateContent")
            })
            .map(|model| match model.name.strip_prefix("models/") {
                Some(name) => name.to_string(),
                None => model.name,
            })
            .collect();

        models.sort_by(|a, b| {
            let a = model_generation(a).unwrap_or(f64::MIN);
            let b = model_generation(b).unwrap_or(f64::MIN);
            b.total_cmp(&a)
        });

        ::log::info!("{} generation models available", models.len());
        Ok(models)
    }
}

/// Version number in a model name, e.g. `2.5` for `gemini-2.5-pro`
fn model_generation(name: &str) -> Option<f64> {
    MODEL_GENERATION
        .captures(name)
        .and_then(|captures| captures.get(1))
        .and_then(|version| version.as_str().parse().ok())
}

/// The service's own error message, or a generic description of the failure
fn service_error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| format!("API request failed ({})", status))
}
