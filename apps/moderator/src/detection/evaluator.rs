//! Prompt evaluator — runs one prompt definition against one piece of content.
//!
//! Steps:
//! 1. render the messages (mode-dependent content substitution)
//! 2. call the oracle at temperature 0
//! 3. reduce the response to a `DetectionVerdict`
//!
//! Errors are returned, never swallowed. Isolation is the aggregator's job.

use tracing::debug;

use crate::detection::loader::{EvaluationMode, PromptDefinition};
use crate::detection::verdict::{parse_boolean, parse_structured, DetectionVerdict};
use crate::detection::EvaluationError;
use crate::llm_client::{ChatMessage, ModelOracle, OracleRequest, Role};

/// Placeholder replaced by the content in structured-mode templates.
pub const CONTENT_PLACEHOLDER: &str = "{{stdin}}";

/// Enough for "True" or "False" and nothing more.
pub const SIMPLE_MAX_OUTPUT_TOKENS: u32 = 10;

const TEMPERATURE: f32 = 0.0;

/// Renders the prompt's messages with `content` substituted in.
///
/// Simple mode appends the content to the final message when it is a user
/// message; other messages are untouched. Structured mode replaces every
/// `{{stdin}}` occurrence in every message.
pub fn render_messages(prompt: &PromptDefinition, content: &str) -> Vec<ChatMessage> {
    match prompt.mode {
        EvaluationMode::Simple => {
            let last = prompt.messages.len().saturating_sub(1);
            prompt
                .messages
                .iter()
                .enumerate()
                .map(|(i, msg)| {
                    if i == last && msg.role == Role::User {
                        ChatMessage {
                            role: msg.role,
                            content: format!("{}{}", msg.content, content),
                        }
                    } else {
                        msg.clone()
                    }
                })
                .collect()
        }
        EvaluationMode::Structured { .. } => prompt
            .messages
            .iter()
            .map(|msg| ChatMessage {
                role: msg.role,
                content: msg.content.replace(CONTENT_PLACEHOLDER, content),
            })
            .collect(),
    }
}

/// Builds the oracle request for `prompt` over `content`.
pub fn build_request(
    prompt: &PromptDefinition,
    content: &str,
    default_model: &str,
) -> OracleRequest {
    let (max_output_tokens, response_schema) = match &prompt.mode {
        EvaluationMode::Simple => (Some(SIMPLE_MAX_OUTPUT_TOKENS), None),
        EvaluationMode::Structured { schema } => (None, Some(schema.clone())),
    };

    OracleRequest {
        model: prompt
            .model
            .clone()
            .unwrap_or_else(|| default_model.to_string()),
        messages: render_messages(prompt, content),
        temperature: TEMPERATURE,
        max_output_tokens,
        response_schema,
    }
}

/// Evaluates one prompt. Oracle failures surface as `OracleInvocation`,
/// unparseable structured responses as `ResponseParse`.
pub async fn evaluate(
    oracle: &dyn ModelOracle,
    prompt: &PromptDefinition,
    content: &str,
    default_model: &str,
) -> Result<DetectionVerdict, EvaluationError> {
    let request = build_request(prompt, content, default_model);
    debug!(
        "Evaluating {} ({}) with model {}",
        prompt.file_name(),
        prompt.name.as_deref().unwrap_or("unnamed"),
        request.model
    );

    let response = oracle.complete(request).await?;

    match prompt.mode {
        EvaluationMode::Simple => Ok(parse_boolean(&response.text)),
        EvaluationMode::Structured { .. } => parse_structured(&response.text),
    }
}
