use std::sync::Arc;

use crate::moderation::Moderator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub moderator: Arc<Moderator>,
    /// When set, deliveries must carry a valid `X-Hub-Signature-256`.
    pub webhook_secret: Option<String>,
}
