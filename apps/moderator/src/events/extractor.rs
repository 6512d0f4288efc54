//! Content extractor — maps a trigger event to the text to classify and the
//! identifiers the moderation actions need. Pure: no I/O, no logging.

use crate::events::{CommentPayload, EventPayload, TextField, TriggerEvent};

/// Interpolated for a key the delivery does not carry at all.
const MISSING: &str = "undefined";
/// Interpolated for a key whose value is an explicit JSON `null`.
const NULL: &str = "null";

/// Classifiable content plus the identifiers used to act on it.
/// `content` is empty when the event is not one the pipeline handles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentInfo {
    pub content: String,
    pub issue_number: Option<u64>,
    pub comment_node_id: Option<String>,
}

/// Extracts content from an event. Total over its input.
///
/// - issue opened: `title + "\n" + body`, a missing key rendered as
///   `undefined` and an explicit null as `null`
/// - comment created (issue or review): the comment body, or `""`
/// - anything else: empty
pub fn extract(event: &TriggerEvent) -> ContentInfo {
    match (&event.payload, event.action.as_str()) {
        (EventPayload::Issue(issue), "opened") => ContentInfo {
            content: format!(
                "{}\n{}",
                render(&issue.title),
                render(&issue.body)
            ),
            issue_number: issue.number,
            comment_node_id: None,
        },
        (EventPayload::IssueComment(comment), "created")
        | (EventPayload::ReviewComment(comment), "created") => from_comment(comment),
        (EventPayload::Issue(_), _)
        | (EventPayload::IssueComment(_), _)
        | (EventPayload::ReviewComment(_), _)
        | (EventPayload::Unrecognized, _) => ContentInfo::default(),
    }
}

fn render(field: &TextField) -> &str {
    match field {
        TextField::Missing => MISSING,
        TextField::Null => NULL,
        TextField::Text(text) => text,
    }
}

fn from_comment(comment: &CommentPayload) -> ContentInfo {
    ContentInfo {
        content: comment.comment_body.clone().unwrap_or_default(),
        issue_number: comment.parent_number,
        comment_node_id: comment.comment_node_id.clone(),
    }
}
