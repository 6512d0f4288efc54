//! GitHub webhook receiver.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::events::{is_eligible, TriggerEvent};
use crate::moderation::ModerationOutcome;
use crate::state::AppState;

pub const EVENT_HEADER: &str = "x-github-event";
pub const DELIVERY_HEADER: &str = "x-github-delivery";
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

type HmacSha256 = Hmac<Sha256>;

/// Checks a `sha256=<hex>` signature over the raw body. Constant-time compare.
pub fn verify_signature(secret: &[u8], body: &[u8], header_value: &str) -> bool {
    let Some(hex_digest) = header_value.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// POST /webhook
///
/// Verifies the delivery and decodes it into a `TriggerEvent`. Out-of-scope
/// events are answered inline with the `Skipped` outcome; in-scope ones are
/// acknowledged with 202 and moderated in a background task, since a full run
/// can outlast GitHub's delivery timeout.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    if let Some(secret) = &state.webhook_secret {
        let signature = header(&headers, SIGNATURE_HEADER).ok_or(AppError::Unauthorized)?;
        if !verify_signature(secret.as_bytes(), &body, signature) {
            warn!("Rejected webhook delivery with invalid signature");
            return Err(AppError::Unauthorized);
        }
    }

    let kind = header(&headers, EVENT_HEADER)
        .ok_or_else(|| AppError::Validation("Missing X-GitHub-Event header".to_string()))?;
    let delivery = header(&headers, DELIVERY_HEADER).unwrap_or("-");

    if kind == "ping" {
        return Ok(Json(json!({ "status": "pong" })).into_response());
    }

    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("Invalid JSON payload: {e}")))?;

    info!("Received {kind} delivery {delivery}");
    let event = TriggerEvent::from_webhook(kind, &payload);

    if !is_eligible(&event) {
        return Ok(Json(ModerationOutcome::unsupported(&event)).into_response());
    }

    let moderator = state.moderator.clone();
    let delivery_id = delivery.to_string();
    tokio::spawn(async move {
        match moderator.moderate(&event).await {
            Ok(outcome) => info!("Delivery {delivery_id} moderated: {outcome:?}"),
            Err(e) => error!("Delivery {delivery_id} failed: {e}"),
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "status": "accepted", "delivery": delivery })),
    )
        .into_response())
}
