use axum::{Json, http::StatusCode, response::IntoResponse};
use relay_core::Extraction;
use serde::Serialize;
use serde_json::{Value, json};

/// Outcome of the property-extraction step of one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStep {
    Ok,
    Unavailable,
    Skipped,
    NotRequested,
}

impl ExtractionStep {
    pub fn as_str(self) -> &'static str {
        match self {
            ExtractionStep::Ok => "ok",
            ExtractionStep::Unavailable => "unavailable",
            ExtractionStep::Skipped => "skipped",
            ExtractionStep::NotRequested => "not_requested",
        }
    }
}

impl From<&Extraction> for ExtractionStep {
    fn from(extraction: &Extraction) -> Self {
        match extraction {
            Extraction::Available(_) => ExtractionStep::Ok,
            Extraction::Unavailable(_) => ExtractionStep::Unavailable,
        }
    }
}

pub fn processed(extraction: ExtractionStep, notified: bool) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "processed",
            "extraction": extraction,
            "notified": notified,
        })),
    )
}

pub fn skipped() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "skipped" })))
}

pub fn missing_event_type() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "status": "error", "reason": "missing event type" })),
    )
}

pub fn challenge(value: Value) -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "challenge": value })))
}

pub fn token_saved() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "Token saved" })))
}
