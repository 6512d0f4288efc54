//! Moderation orchestrator — gate → extract → detect → act.
//!
//! All inputs are explicit: the event is passed in, collaborators are held as
//! trait objects, and settings are fixed at construction.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::config::Config;
use crate::detection::{evaluate_content, AggregateFlags, EvaluationOptions};
use crate::errors::AppError;
use crate::events::{extract, is_eligible, TriggerEvent};
use crate::github::{ModerationActions, RepoRef};
use crate::llm_client::ModelOracle;

#[derive(Debug, Clone)]
pub struct ModerationSettings {
    pub prompts_dir: PathBuf,
    pub spam_label: String,
    pub ai_label: String,
    /// Used when the event does not name its repository.
    pub default_repository: Option<RepoRef>,
    pub evaluation: EvaluationOptions,
}

impl ModerationSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            prompts_dir: config.prompts_dir.clone(),
            spam_label: config.spam_label.clone(),
            ai_label: config.ai_label.clone(),
            default_repository: config
                .github_repository
                .as_deref()
                .and_then(RepoRef::parse),
            evaluation: EvaluationOptions {
                default_model: config.default_model.clone(),
                max_concurrency: config.max_concurrency,
            },
        }
    }

    /// Labels for the flagged channels, spam first.
    pub fn labels_for(&self, flags: AggregateFlags) -> Vec<String> {
        let mut labels = Vec::new();
        if flags.spam {
            labels.push(self.spam_label.clone());
        }
        if flags.ai {
            labels.push(self.ai_label.clone());
        }
        labels
    }
}

/// What happened to one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModerationOutcome {
    Skipped {
        reason: String,
    },
    Clean,
    Flagged {
        flags: AggregateFlags,
        /// Labels actually applied; empty when the event has no issue number.
        labels: Vec<String>,
        issue_number: Option<u64>,
        comment_minimized: bool,
    },
}

impl ModerationOutcome {
    pub fn unsupported(event: &TriggerEvent) -> Self {
        ModerationOutcome::Skipped {
            reason: format!("unsupported event {}.{}", event.kind, event.action),
        }
    }
}

pub struct Moderator {
    oracle: Arc<dyn ModelOracle>,
    actions: Arc<dyn ModerationActions>,
    settings: ModerationSettings,
}

impl Moderator {
    pub fn new(
        oracle: Arc<dyn ModelOracle>,
        actions: Arc<dyn ModerationActions>,
        settings: ModerationSettings,
    ) -> Self {
        Self {
            oracle,
            actions,
            settings,
        }
    }

    pub fn settings(&self) -> &ModerationSettings {
        &self.settings
    }

    /// Runs the full pipeline for one event. Detection failures of single
    /// prompts never surface here; action failures do.
    pub async fn moderate(&self, event: &TriggerEvent) -> Result<ModerationOutcome, AppError> {
        if !is_eligible(event) {
            info!("Nothing to do for event {} ({})", event.kind, event.action);
            return Ok(ModerationOutcome::unsupported(event));
        }

        let content_info = extract(event);
        if content_info.content.trim().is_empty() {
            info!("No text content found, skipping.");
            return Ok(ModerationOutcome::Skipped {
                reason: "empty content".to_string(),
            });
        }

        info!("Evaluating content for spam and AI-generated content...");
        let flags = evaluate_content(
            self.oracle.as_ref(),
            &self.settings.prompts_dir,
            &content_info.content,
            &self.settings.evaluation,
        )
        .await?;

        if !flags.any() {
            info!("No spam detected");
            return Ok(ModerationOutcome::Clean);
        }

        let mut applied = Vec::new();
        if let Some(issue_number) = content_info.issue_number {
            let labels = self.settings.labels_for(flags);
            let repo = event
                .repository
                .as_ref()
                .or(self.settings.default_repository.as_ref())
                .ok_or_else(|| {
                    AppError::Validation(
                        "Event has no repository and GITHUB_REPOSITORY is not set".to_string(),
                    )
                })?;
            self.actions.add_labels(repo, issue_number, &labels).await?;
            info!(
                "Added labels [{}] to {repo}#{issue_number}",
                labels.join(", ")
            );
            applied = labels;
        }

        let mut comment_minimized = false;
        if let Some(node_id) = &content_info.comment_node_id {
            self.actions.minimize_comment(node_id).await?;
            info!("Comment {node_id} minimized as spam");
            comment_minimized = true;
        }

        Ok(ModerationOutcome::Flagged {
            flags,
            labels: applied,
            issue_number: content_info.issue_number,
            comment_minimized,
        })
    }
}
