use std::time::Instant;

use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use relay_core::{Extraction, NotifyLayout};
use relay_telemetry::{TelemetryLabels, record_counter, record_histogram};
use serde_json::{Map, Value, json};
use tracing::Instrument;

use crate::error::WebhookError;
use crate::event::{EventClass, WebhookEvent, classify};
use crate::format::{Markup, database_summary, page_summary, trade_card};
use crate::reqid::RequestId;
use crate::respond::{self, ExtractionStep};
use crate::signature::verify_signature;
use crate::state::AppState;

pub const SERVICE: &str = "notion-webhook";

pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "active",
        "service": SERVICE,
        "secret_configured": state.verification.is_configured(),
    }))
}

pub async fn receive(
    State(state): State<AppState>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, WebhookError> {
    if !is_json_content_type(&headers) {
        return Err(WebhookError::Validation("Content-Type must be application/json"));
    }
    let payload = match serde_json::from_slice::<Value>(&body) {
        Ok(Value::Object(map)) => map,
        _ => return Err(WebhookError::Validation("Invalid JSON body")),
    };

    if state.options.accept_legacy_token {
        if let Some(token) = payload.get("verification_token") {
            return Ok(legacy_verification(&state, &payload, token));
        }
    }

    if payload.get("type").and_then(Value::as_str) == Some("webhook_verification") {
        return match payload.get("challenge") {
            Some(challenge) => {
                tracing::info!("webhook verification challenge answered");
                Ok(respond::challenge(challenge.clone()).into_response())
            }
            None => Err(WebhookError::Validation("Missing challenge")),
        };
    }

    let signature = state
        .options
        .signature_headers
        .iter()
        .find_map(|name| headers.get(name.as_str()))
        .and_then(|value| value.to_str().ok());
    let secret = state.verification.secret().unwrap_or_default();
    if !verify_signature(secret, &body, signature) {
        tracing::warn!(
            request_id = %request_id,
            secret_configured = !secret.is_empty(),
            signature_present = signature.is_some(),
            "rejected webhook with invalid signature"
        );
        record_counter(
            "relay_webhook_events_total",
            1,
            &TelemetryLabels::new(SERVICE).with_outcome("forbidden"),
        );
        return Err(WebhookError::Forbidden);
    }

    let event: WebhookEvent = serde_json::from_value(Value::Object(payload)).unwrap_or_default();
    let Some(kind) = event.kind.clone() else {
        tracing::warn!(request_id = %request_id, "webhook event without type");
        return Ok(respond::missing_event_type().into_response());
    };

    let span = tracing::info_span!(
        "ingress.handle",
        request_id = %request_id,
        event_type = %kind,
        entity_id = event.entity_id().unwrap_or("-"),
    );
    process_event(&state, &kind, &event).instrument(span).await
}

fn legacy_verification(state: &AppState, payload: &Map<String, Value>, token: &Value) -> Response {
    match token.as_str() {
        Some(secret) if state.verification.store_if_unset(secret) => {
            tracing::info!(
                token = %relay_telemetry::redact(secret),
                "verification token stored"
            );
        }
        Some(_) => tracing::info!("verification token received; keeping the existing secret"),
        None => tracing::warn!("verification token is not a string; ignored"),
    }
    match payload.get("challenge") {
        Some(challenge) => respond::challenge(challenge.clone()).into_response(),
        None => respond::token_saved().into_response(),
    }
}

async fn process_event(
    state: &AppState,
    kind: &str,
    event: &WebhookEvent,
) -> Result<Response, WebhookError> {
    let started = Instant::now();
    let markup = Markup::from_parse_mode(state.options.parse_mode.as_deref());
    let entity_id = event.entity_id();

    let (step, text) = match classify(kind, event.entity_kind()) {
        EventClass::Page { extract: true } => {
            let (step, extraction) = match entity_id {
                Some(id) => {
                    let extraction = state.extractor.fetch_page_properties(id).await;
                    let extraction = match extraction {
                        Extraction::Available(props) if kind == "page.properties_updated" => {
                            Extraction::Available(props.retain_named(&event.updated_properties()))
                        }
                        other => other,
                    };
                    (ExtractionStep::from(&extraction), Some(extraction))
                }
                None => {
                    tracing::warn!("page event without entity id; extraction skipped");
                    (ExtractionStep::Skipped, None)
                }
            };
            (step, render_page(state, markup, kind, entity_id, extraction.as_ref()))
        }
        EventClass::Page { extract: false } => (
            ExtractionStep::NotRequested,
            page_summary(markup, kind, entity_id, None),
        ),
        EventClass::Block => {
            let (step, extraction) = match entity_id {
                Some(id) => {
                    let extraction = state.extractor.fetch_block_page_properties(id).await;
                    (ExtractionStep::from(&extraction), Some(extraction))
                }
                None => (ExtractionStep::Skipped, None),
            };
            let page_id = extraction
                .as_ref()
                .and_then(Extraction::properties)
                .map(|props| props.page_id.clone());
            let text = render_page(
                state,
                markup,
                kind,
                page_id.as_deref().or(entity_id),
                extraction.as_ref(),
            );
            (step, text)
        }
        EventClass::Database => (
            ExtractionStep::NotRequested,
            database_summary(markup, kind, entity_id),
        ),
        EventClass::Other => {
            tracing::info!("unhandled notion event type; skipping");
            record_event(kind, "skipped");
            return Ok(respond::skipped().into_response());
        }
    };

    let notified = state.dispatcher.dispatch(&text).await;
    if !notified {
        tracing::warn!("telegram notification not delivered; acknowledging anyway");
    }
    tracing::info!(extraction = step.as_str(), notified, "notion event processed");
    record_event(kind, if notified { "processed" } else { "processed_undelivered" });
    record_histogram(
        "relay_webhook_processing_seconds",
        started.elapsed().as_secs_f64(),
        &TelemetryLabels::new(SERVICE).with_event_type(kind),
    );
    Ok(respond::processed(step, notified).into_response())
}

fn render_page(
    state: &AppState,
    markup: Markup,
    kind: &str,
    page_id: Option<&str>,
    extraction: Option<&Extraction>,
) -> String {
    match state.options.layout {
        NotifyLayout::Trade => trade_card(extraction.and_then(Extraction::properties)),
        NotifyLayout::Plain => page_summary(markup, kind, page_id, extraction),
    }
}

fn record_event(kind: &str, outcome: &str) {
    record_counter(
        "relay_webhook_events_total",
        1,
        &TelemetryLabels::new(SERVICE)
            .with_event_type(kind)
            .with_outcome(outcome),
    );
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn content_type_allows_parameters() {
        let mut headers = HeaderMap::new();
        assert!(!is_json_content_type(&headers));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        assert!(is_json_content_type(&headers));
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("Application/JSON; charset=utf-8"),
        );
        assert!(is_json_content_type(&headers));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        assert!(!is_json_content_type(&headers));
    }
}
