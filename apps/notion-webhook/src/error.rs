use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("Invalid signature")]
    Forbidden,
    #[error("internal error: {0}")]
    Internal(String),
}

impl WebhookError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookError::Validation(_) => StatusCode::BAD_REQUEST,
            WebhookError::Forbidden => StatusCode::FORBIDDEN,
            WebhookError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let message = match &self {
            WebhookError::Internal(detail) => {
                tracing::error!(error = %detail, "webhook processing failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (self.status(), Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_of(err: WebhookError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn maps_errors_to_status_and_body() {
        assert_eq!(
            body_of(WebhookError::Validation("Invalid JSON body")).await,
            (StatusCode::BAD_REQUEST, json!({"error": "Invalid JSON body"}))
        );
        assert_eq!(
            body_of(WebhookError::Forbidden).await,
            (StatusCode::FORBIDDEN, json!({"error": "Invalid signature"}))
        );
    }

    #[tokio::test]
    async fn internal_details_are_not_exposed() {
        let (status, body) = body_of(WebhookError::Internal("db exploded".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Internal server error"}));
    }
}
