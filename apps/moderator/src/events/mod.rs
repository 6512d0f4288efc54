//! Trigger events — the typed view of a GitHub webhook delivery.
//!
//! A delivery is a loosely-shaped JSON document whose fields depend on the
//! event kind. It is decoded once, at the edge, into `TriggerEvent` so the
//! gate and extractor can match exhaustively instead of probing JSON paths.
//! Each top-level section is decoded on its own; a malformed section never
//! takes the others down with it.

pub mod extractor;
pub mod gate;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

use crate::github::RepoRef;

pub use extractor::extract;
pub use gate::is_eligible;

pub const ISSUES: &str = "issues";
pub const ISSUE_COMMENT: &str = "issue_comment";
pub const PULL_REQUEST_REVIEW_COMMENT: &str = "pull_request_review_comment";

/// A string field that keeps a missing key apart from an explicit `null`.
/// The two render differently when interpolated into classified text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TextField {
    #[default]
    Missing,
    Null,
    Text(String),
}

impl From<Option<Option<String>>> for TextField {
    fn from(value: Option<Option<String>>) -> Self {
        match value {
            None => TextField::Missing,
            Some(None) => TextField::Null,
            Some(Some(text)) => TextField::Text(text),
        }
    }
}

/// Issue fields used for classification. Every field may be absent in a delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssuePayload {
    pub number: Option<u64>,
    pub title: TextField,
    pub body: TextField,
}

/// Comment fields shared by issue comments and pull request review comments.
/// `parent_number` is the issue or pull request the comment belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentPayload {
    pub parent_number: Option<u64>,
    pub comment_node_id: Option<String>,
    pub comment_body: Option<String>,
}

/// Payload shape, selected by event kind only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPayload {
    Issue(IssuePayload),
    IssueComment(CommentPayload),
    ReviewComment(CommentPayload),
    Unrecognized,
}

/// One webhook delivery. Built once per invocation and only borrowed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerEvent {
    pub kind: String,
    pub action: String,
    pub payload: EventPayload,
    pub repository: Option<RepoRef>,
}

// ────────────────────────────────────────────────────────────────────────────
// Raw delivery shapes (serde only)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct RawIssue {
    number: Option<u64>,
    #[serde(default, deserialize_with = "present")]
    title: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    body: Option<Option<String>>,
}

/// Only called when the key exists, so the outer `Some` marks presence.
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize)]
struct RawComment {
    node_id: Option<String>,
    body: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawNumbered {
    number: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawRepository {
    full_name: Option<String>,
}

impl TriggerEvent {
    /// Decodes a webhook delivery. Never fails: a section that does not match
    /// the expected shape is logged and treated as absent.
    pub fn from_webhook(kind: &str, payload: &Value) -> Self {
        let action = payload
            .get("action")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let event_payload = match kind {
            ISSUES => {
                let issue: RawIssue = section(kind, payload, "issue").unwrap_or_default();
                EventPayload::Issue(IssuePayload {
                    number: issue.number,
                    title: issue.title.into(),
                    body: issue.body.into(),
                })
            }
            ISSUE_COMMENT => EventPayload::IssueComment(comment_payload(
                section::<RawNumbered>(kind, payload, "issue").and_then(|i| i.number),
                section(kind, payload, "comment"),
            )),
            PULL_REQUEST_REVIEW_COMMENT => EventPayload::ReviewComment(comment_payload(
                section::<RawNumbered>(kind, payload, "pull_request").and_then(|pr| pr.number),
                section(kind, payload, "comment"),
            )),
            _ => EventPayload::Unrecognized,
        };

        TriggerEvent {
            kind: kind.to_string(),
            action,
            payload: event_payload,
            repository: section::<RawRepository>(kind, payload, "repository")
                .and_then(|r| r.full_name)
                .and_then(|name| RepoRef::parse(&name)),
        }
    }
}

/// Decodes one top-level section. Missing or `null` sections are `None`;
/// malformed ones are logged and also `None`.
fn section<T: DeserializeOwned>(kind: &str, payload: &Value, key: &str) -> Option<T> {
    let value = payload.get(key).filter(|v| !v.is_null())?;
    serde_json::from_value(value.clone())
        .map_err(|e| warn!("Unexpected '{key}' shape in '{kind}' event: {e}"))
        .ok()
}

fn comment_payload(parent_number: Option<u64>, comment: Option<RawComment>) -> CommentPayload {
    let comment = comment.unwrap_or_default();
    CommentPayload {
        parent_number,
        comment_node_id: comment.node_id,
        comment_body: comment.body,
    }
}
