//! Aggregator — evaluates every detection prompt in a directory and folds the
//! verdicts into two channels.
//!
//! CRITICAL: a single prompt can never fail the whole run. Each prompt is
//! evaluated as its own task whose result (verdict or error) is captured as a
//! `PromptOutcome`, and the fold over outcomes is a pure OR. Only a failure to
//! enumerate the prompt directory propagates.

use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::detection::evaluator::evaluate;
use crate::detection::loader::{file_name_of, list_prompt_files, load_prompt};
use crate::detection::verdict::DetectionVerdict;
use crate::detection::EvaluationError;
use crate::llm_client::ModelOracle;

const AI_MARKERS: [&str; 1] = ["ai-detection"];
const SPAM_MARKERS: [&str; 3] = ["spam-detection", "bot-detection", "link-spam"];

/// Signal channel a prompt contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Spam,
    Ai,
}

/// Classifies a prompt by file name (case-insensitive substring match).
/// `None` means the file is not a detection prompt and is skipped.
pub fn classify(file_name: &str) -> Option<Channel> {
    let name = file_name.to_lowercase();
    if AI_MARKERS.iter().any(|m| name.contains(m)) {
        Some(Channel::Ai)
    } else if SPAM_MARKERS.iter().any(|m| name.contains(m)) {
        Some(Channel::Spam)
    } else {
        None
    }
}

/// Final decision for one piece of content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregateFlags {
    pub spam: bool,
    pub ai: bool,
}

impl AggregateFlags {
    /// Flags carrying a single prompt's signal.
    pub fn signal(channel: Channel, flagged: bool) -> AggregateFlags {
        AggregateFlags {
            spam: channel == Channel::Spam && flagged,
            ai: channel == Channel::Ai && flagged,
        }
    }

    /// Channel-wise OR. Commutative, associative and idempotent.
    pub fn merge(self, other: AggregateFlags) -> AggregateFlags {
        AggregateFlags {
            spam: self.spam || other.spam,
            ai: self.ai || other.ai,
        }
    }

    pub fn any(&self) -> bool {
        self.spam || self.ai
    }
}

/// Result of one prompt's evaluation, success or failure.
#[derive(Debug)]
pub struct PromptOutcome {
    pub path: PathBuf,
    pub channel: Channel,
    pub result: Result<DetectionVerdict, EvaluationError>,
}

#[derive(Debug, Clone)]
pub struct EvaluationOptions {
    /// Model for prompts that do not name one.
    pub default_model: String,
    /// Upper bound on concurrent oracle calls. Zero is treated as one.
    pub max_concurrency: usize,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            default_model: "gpt-4o".to_string(),
            max_concurrency: 4,
        }
    }
}

/// OR-folds outcomes into channel flags. Failed outcomes contribute nothing.
pub fn fold_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a PromptOutcome>) -> AggregateFlags {
    outcomes
        .into_iter()
        .filter_map(|outcome| match &outcome.result {
            Ok(verdict) => Some(AggregateFlags::signal(outcome.channel, verdict.is_flagged())),
            Err(_) => None,
        })
        .fold(AggregateFlags::default(), AggregateFlags::merge)
}

/// Loads and evaluates a single prompt file.
pub async fn run_prompt_file(
    oracle: &dyn ModelOracle,
    path: &Path,
    content: &str,
    default_model: &str,
) -> Result<DetectionVerdict, EvaluationError> {
    let prompt = load_prompt(path).await?;
    evaluate(oracle, &prompt, content, default_model).await
}

/// Evaluates `content` against every detection prompt in `prompts_dir`.
///
/// Each classified file is attempted exactly once. Files that match no
/// channel are skipped without being loaded.
pub async fn evaluate_content(
    oracle: &dyn ModelOracle,
    prompts_dir: &Path,
    content: &str,
    options: &EvaluationOptions,
) -> Result<AggregateFlags, EvaluationError> {
    let files = list_prompt_files(prompts_dir).await?;

    let classified: Vec<(PathBuf, Channel)> = files
        .into_iter()
        .filter_map(|path| match classify(&file_name_of(&path)) {
            Some(channel) => Some((path, channel)),
            None => {
                debug!("Skipping unclassified prompt {}", path.display());
                None
            }
        })
        .collect();

    info!(
        "Evaluating content against {} prompt(s) from {}",
        classified.len(),
        prompts_dir.display()
    );

    let outcomes: Vec<PromptOutcome> = stream::iter(classified)
        .map(|(path, channel)| async move {
            let result = run_prompt_file(oracle, &path, content, &options.default_model).await;
            PromptOutcome {
                path,
                channel,
                result,
            }
        })
        .buffer_unordered(options.max_concurrency.max(1))
        .collect()
        .await;

    for outcome in &outcomes {
        log_outcome(outcome);
    }

    let flags = fold_outcomes(&outcomes);
    info!("Detection result: spam={}, ai={}", flags.spam, flags.ai);
    Ok(flags)
}

fn log_outcome(outcome: &PromptOutcome) {
    let name = file_name_of(&outcome.path);
    match &outcome.result {
        Ok(verdict) => {
            info!("{name} → {}", verdict.is_flagged());
            if let DetectionVerdict::Structured(v) = verdict {
                debug!(
                    "{name}: {}={} confidence={:?} indicators={:?}",
                    v.flag_field, v.flagged, v.confidence, v.indicators
                );
                trace!("{name} metadata: {:?}", v.metadata);
            }
            if let Some(reasoning) = verdict.reasoning() {
                debug!("{name} reasoning: {reasoning}");
            }
        }
        Err(e) => warn!("Error evaluating prompt {name}: {e}"),
    }
}
