//! Event gate — decides whether a delivery is in scope for moderation.

use crate::events::{TriggerEvent, ISSUES, ISSUE_COMMENT, PULL_REQUEST_REVIEW_COMMENT};

/// `(kind, action)` pairs that carry freshly authored text worth classifying.
const ELIGIBLE: [(&str, &str); 3] = [
    (ISSUES, "opened"),
    (ISSUE_COMMENT, "created"),
    (PULL_REQUEST_REVIEW_COMMENT, "created"),
];

/// Returns true iff the event's `(kind, action)` is one the pipeline handles.
/// Recognized kinds with other actions (edits, closes, deletions) are out of scope.
pub fn is_eligible(event: &TriggerEvent) -> bool {
    ELIGIBLE
        .iter()
        .any(|(kind, action)| event.kind == *kind && event.action == *action)
}
