//! Test doubles for the oracle and GitHub collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::github::{GitHubError, ModerationActions, RepoRef};
use crate::llm_client::{LlmError, ModelOracle, OracleRequest, OracleResponse};

enum Script {
    Respond(String),
    Fail,
}

/// Oracle answering by marker: the first rule whose marker occurs in any
/// rendered message decides the response. Records every request.
#[derive(Default)]
pub struct ScriptedOracle {
    rules: Vec<(String, Script)>,
    calls: Mutex<Vec<OracleRequest>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, marker: &str, text: &str) -> Self {
        self.rules
            .push((marker.to_string(), Script::Respond(text.to_string())));
        self
    }

    pub fn fail(mut self, marker: &str) -> Self {
        self.rules.push((marker.to_string(), Script::Fail));
        self
    }

    /// Holds every call open for `delay` so overlapping calls can be observed.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<OracleRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelOracle for ScriptedOracle {
    async fn complete(&self, request: OracleRequest) -> Result<OracleResponse, LlmError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.calls.lock().unwrap().push(request.clone());

        let rule = self.rules.iter().find(|(marker, _)| {
            request
                .messages
                .iter()
                .any(|m| m.content.contains(marker.as_str()))
        });

        match rule {
            Some((_, Script::Respond(text))) => Ok(OracleResponse { text: text.clone() }),
            Some((_, Script::Fail)) => Err(LlmError::Api {
                status: 500,
                message: "scripted failure".to_string(),
            }),
            None => Err(LlmError::Api {
                status: 404,
                message: "no scripted response".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelCall {
    pub repo: RepoRef,
    pub issue_number: u64,
    pub labels: Vec<String>,
}

/// Records moderation actions instead of calling GitHub.
#[derive(Default)]
pub struct RecordingActions {
    labels: Mutex<Vec<LabelCall>>,
    minimized: Mutex<Vec<String>>,
    fail_minimize: bool,
}

impl RecordingActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_minimize() -> Self {
        Self {
            fail_minimize: true,
            ..Self::default()
        }
    }

    pub fn label_calls(&self) -> Vec<LabelCall> {
        self.labels.lock().unwrap().clone()
    }

    pub fn minimized(&self) -> Vec<String> {
        self.minimized.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModerationActions for RecordingActions {
    async fn add_labels(
        &self,
        repo: &RepoRef,
        issue_number: u64,
        labels: &[String],
    ) -> Result<(), GitHubError> {
        if labels.is_empty() {
            return Ok(());
        }
        self.labels.lock().unwrap().push(LabelCall {
            repo: repo.clone(),
            issue_number,
            labels: labels.to_vec(),
        });
        Ok(())
    }

    async fn minimize_comment(&self, node_id: &str) -> Result<(), GitHubError> {
        if self.fail_minimize {
            return Err(GitHubError::GraphQl("scripted failure".to_string()));
        }
        self.minimized.lock().unwrap().push(node_id.to_string());
        Ok(())
    }
}

/// Writes a simple-mode prompt whose user message is `marker`, so a
/// `ScriptedOracle` rule keyed on the same marker answers it.
pub fn write_simple_prompt(dir: &std::path::Path, file_name: &str, marker: &str) {
    let yaml = format!(
        "messages:\n  - role: system\n    content: Answer True or False.\n  - role: user\n    content: '{marker} '\n"
    );
    std::fs::write(dir.join(file_name), yaml).unwrap();
}
