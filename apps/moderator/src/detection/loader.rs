//! Prompt loader — discovers `*.prompt.yml` files and parses them into
//! `PromptDefinition`s.
//!
//! File format (YAML mapping):
//!
//! ```yaml
//! name: Spam detection          # optional
//! model: gpt-4o-mini            # optional, falls back to the configured default
//! responseFormat: json_schema   # optional, paired with jsonSchema
//! jsonSchema: '{ ... }'         # optional, JSON text or an inline mapping
//! messages:                     # required, non-empty
//!   - role: system
//!     content: ...
//!   - role: user
//!     content: ...
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::detection::EvaluationError;
use crate::llm_client::ChatMessage;

/// Reserved suffix; files without it are never discovered.
pub const PROMPT_FILE_SUFFIX: &str = ".prompt.yml";

const JSON_SCHEMA_FORMAT: &str = "json_schema";

/// How a prompt's template is rendered and its response reduced.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationMode {
    /// Content appended to the last user message; the model answers `True`/`False`.
    Simple,
    /// Content substituted for `{{stdin}}`; the model answers with a JSON record.
    Structured { schema: serde_json::Value },
}

/// A parsed prompt file. Read-only after load.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptDefinition {
    pub source_path: PathBuf,
    pub name: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub model: Option<String>,
    pub mode: EvaluationMode,
}

impl PromptDefinition {
    /// File name used in logs and for channel classification.
    pub fn file_name(&self) -> String {
        file_name_of(&self.source_path)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPrompt {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    messages: Option<serde_yaml::Value>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    response_format: Option<String>,
    #[serde(default)]
    json_schema: Option<serde_yaml::Value>,
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Lists prompt files in `dir`, in directory enumeration order.
pub async fn list_prompt_files(dir: &Path) -> Result<Vec<PathBuf>, EvaluationError> {
    let to_dir_error = |source: std::io::Error| EvaluationError::PromptDirectory {
        dir: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(to_dir_error)?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(to_dir_error)? {
        if entry
            .file_name()
            .to_string_lossy()
            .ends_with(PROMPT_FILE_SUFFIX)
        {
            files.push(entry.path());
        }
    }

    Ok(files)
}

/// Reads and parses one prompt file.
pub async fn load_prompt(path: &Path) -> Result<PromptDefinition, EvaluationError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| malformed(path, format!("cannot read file: {e}")))?;
    parse_prompt(path, &text)
}

/// Parses prompt YAML. `path` is recorded on the definition and in errors.
pub fn parse_prompt(path: &Path, text: &str) -> Result<PromptDefinition, EvaluationError> {
    // An empty document parses as null rather than an empty mapping.
    let document: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|e| malformed(path, format!("invalid YAML: {e}")))?;
    if document.is_null() {
        return Err(malformed(path, "missing messages array"));
    }

    let raw: RawPrompt = serde_yaml::from_value(document)
        .map_err(|e| malformed(path, format!("unexpected structure: {e}")))?;

    let messages = match raw.messages {
        Some(value @ serde_yaml::Value::Sequence(_)) => {
            serde_yaml::from_value::<Vec<ChatMessage>>(value)
                .map_err(|e| malformed(path, format!("invalid message: {e}")))?
        }
        _ => return Err(malformed(path, "missing messages array")),
    };
    if messages.is_empty() {
        return Err(malformed(path, "messages array is empty"));
    }

    let mode = match (raw.response_format.as_deref(), raw.json_schema) {
        (Some(JSON_SCHEMA_FORMAT), Some(schema)) => EvaluationMode::Structured {
            schema: parse_schema(path, schema)?,
        },
        (None, None) => EvaluationMode::Simple,
        (format, schema) => {
            warn!(
                "Prompt {} declares responseFormat={:?} with{} jsonSchema; evaluating in simple mode",
                path.display(),
                format,
                if schema.is_some() { "" } else { "out" }
            );
            EvaluationMode::Simple
        }
    };

    Ok(PromptDefinition {
        source_path: path.to_path_buf(),
        name: raw.name,
        messages,
        model: raw.model.filter(|m| !m.trim().is_empty()),
        mode,
    })
}

/// `jsonSchema` is usually JSON text embedded in the YAML; an inline mapping is accepted too.
fn parse_schema(
    path: &Path,
    schema: serde_yaml::Value,
) -> Result<serde_json::Value, EvaluationError> {
    match schema {
        serde_yaml::Value::String(text) => serde_json::from_str(&text)
            .map_err(|e| malformed(path, format!("jsonSchema is not valid JSON: {e}"))),
        other => serde_json::to_value(other)
            .map_err(|e| malformed(path, format!("jsonSchema cannot be converted: {e}"))),
    }
}

fn malformed(path: &Path, reason: impl Into<String>) -> EvaluationError {
    EvaluationError::MalformedPrompt {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}
