use super::types::{Content, GenerateContentRequest, GenerationConfig, Part};
use crate::config::GenerationSettings;
use crate::error::{AgentError, Result};
use crate::results::PageSnapshot;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

pub const TOP_K: u32 = 40;
pub const TOP_P: f32 = 0.95;

/// Undated preview names the service rejects, mapped to their dated release
const DATED_MODEL_NAMES: &[(&str, &str)] = &[
    ("gemini-2.5-flash-preview", "gemini-2.5-flash-preview-05-20"),
    ("gemini-2.5-pro-preview", "gemini-2.5-pro-preview-05-20"),
];

const SYSTEM_INSTRUCTION: &str = "You are Page Agent, an assistant that analyses the web page \
the user currently has open. You can read the page directly through the page information \
provided below, so never claim that you cannot see the page. Answer questions about the page \
concretely, and when an action on the page is needed, provide code that can be executed.";

static CODE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:javascript|js)\b[ \t]*(.*?)```").expect("code block pattern is valid")
});

/// API surface of the generation service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    V1,
    V1Beta,
}

impl ApiVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiVersion::V1 => "v1",
            ApiVersion::V1Beta => "v1beta",
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Preview and 2.5-class models are only served by the beta surface
pub fn select_api_version(model: &str) -> ApiVersion {
    if model.contains("2.5") || model.contains("preview") {
        ApiVersion::V1Beta
    } else {
        ApiVersion::V1
    }
}

/// Rewrites bare preview identifiers to their dated form; anything else is unchanged
pub fn ensure_valid_model_name(model: &str) -> String {
    DATED_MODEL_NAMES
        .iter()
        .find(|(bare, _)| *bare == model)
        .map(|(_, dated)| dated.to_string())
        .unwrap_or_else(|| model.to_string())
}

/// Trimmed body of the first fenced `javascript`/`js` block, if it has any content
pub fn extract_code(text: &str) -> Option<String> {
    let captures = CODE_BLOCK.captures(text)?;
    let code = captures.get(1)?.as_str().trim();
    if code.is_empty() { None } else { Some(code.to_string()) }
}

/// One user turn, ready to send
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Instruction, user message, then the snapshot block when there is one
    pub parts: Vec<String>,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
    /// Normalised model identifier
    pub model: String,
    pub api_version: ApiVersion,
}

impl GenerationRequest {
    pub fn new(
        settings: &GenerationSettings,
        message: &str,
        snapshot: Option<&PageSnapshot>,
    ) -> Result<Self> {
        let mut parts = vec![SYSTEM_INSTRUCTION.to_string(), message.to_string()];
        if let Some(snapshot) = snapshot {
            parts.push(snapshot_block(snapshot)?);
        }

        Ok(Self {
            parts,
            temperature: settings.clamped_temperature(),
            top_k: TOP_K,
            top_p: TOP_P,
            max_output_tokens: settings.max_output_tokens,
            model: ensure_valid_model_name(&settings.model),
            api_version: select_api_version(&settings.model),
        })
    }

    pub fn to_wire(&self) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                parts: self.parts.iter().map(Part::text).collect(),
                role: None,
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                top_k: self.top_k,
                top_p: self.top_p,
                max_output_tokens: self.max_output_tokens,
            },
        }
    }
}

/// The page block; the snapshot is embedded whole
fn snapshot_block(snapshot: &PageSnapshot) -> Result<String> {
    let serialized = serde_json::to_string(snapshot)
        .map_err(|e| AgentError::Service(format!("cannot serialize snapshot: {}", e)))?;

    Ok(format!(
        "\n\nPage currently open:\nTitle: {}\nURL: {}\n\nPage structure:\n{}\n\n\
         Answer using the information above. Cover the page content and quote the text \
         relevant to the question. When the page needs to be operated on, provide the script \
         in this format:\n\n```javascript\n// what the script does\nscript code\n```\n\n\
         The script runs when the user chooses to execute it.",
        snapshot.title, snapshot.url, serialized
    ))
}
