//! Detection engine — loads the declarative detection prompts, evaluates each
//! against the model oracle and folds the verdicts into spam / AI flags.
//!
//! Flow: list_prompt_files → classify by file name → load_prompt → evaluate
//!       (bounded fan-out) → fold_outcomes.

pub mod aggregator;
pub mod evaluator;
pub mod loader;
pub mod verdict;

use std::path::PathBuf;

use thiserror::Error;

use crate::llm_client::LlmError;

pub use aggregator::{evaluate_content, AggregateFlags, EvaluationOptions};

/// Failure of a single prompt evaluation, or of the prompt directory itself.
///
/// Only `PromptDirectory` escapes `evaluate_content`; everything else is
/// contained at the per-prompt boundary.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("Malformed prompt {}: {reason}", .path.display())]
    MalformedPrompt { path: PathBuf, reason: String },

    #[error("Oracle invocation failed: {0}")]
    OracleInvocation(#[from] LlmError),

    #[error("Invalid structured response ({reason}): {raw}")]
    ResponseParse { reason: String, raw: String },

    #[error("Cannot read prompt directory {}: {source}", .dir.display())]
    PromptDirectory {
        dir: PathBuf,
        source: std::io::Error,
    },
}
