use std::time::Duration;

use reqwest::{StatusCode, header};

use crate::error::ProviderError;

const USER_AGENT: &str = concat!("notion-relay/", env!("CARGO_PKG_VERSION"));

/// Builds the shared outbound client; every request inherits the finite timeout.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(ProviderError::Transport)
}

/// Passes 2xx responses through and maps everything else onto `ProviderError`.
pub async fn classify_response(res: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let retry_header = res.headers().get(header::RETRY_AFTER).cloned();
    let body = res.text().await.unwrap_or_else(|_| "<empty>".to_string());

    Err(match status {
        StatusCode::UNAUTHORIZED => ProviderError::Unauthorized { body },
        StatusCode::NOT_FOUND => ProviderError::NotFound { body },
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited {
            retry_after: retry_header
                .as_ref()
                .and_then(|value| value.to_str().ok())
                .and_then(parse_retry_after),
            body,
        },
        status if status.is_server_error() => ProviderError::Server { status, body },
        status => ProviderError::Client { status, body },
    })
}

fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, http::StatusCode as AxumStatus, routing::get};
    use tokio::net::TcpListener;

    #[test]
    fn parses_retry_after_seconds() {
        assert_eq!(parse_retry_after("10"), Some(Duration::from_secs(10)));
        assert_eq!(parse_retry_after("soon"), None);
    }

    #[tokio::test]
    async fn classifies_statuses_from_live_server() {
        let listener = match TcpListener::bind("127.0.0.1:0").await {
            Ok(listener) => listener,
            Err(err) => {
                eprintln!("skipping classifies_statuses_from_live_server: {err}");
                return;
            }
        };
        let addr = listener.local_addr().unwrap();
        let app = Router::new()
            .route("/ok", get(|| async { "fine" }))
            .route("/401", get(|| async { (AxumStatus::UNAUTHORIZED, "bad token") }))
            .route("/404", get(|| async { (AxumStatus::NOT_FOUND, "missing") }))
            .route(
                "/429",
                get(|| async {
                    (
                        AxumStatus::TOO_MANY_REQUESTS,
                        [("retry-after", "3")],
                        "slow down",
                    )
                }),
            )
            .route("/400", get(|| async { (AxumStatus::BAD_REQUEST, "nope") }))
            .route("/503", get(|| async { (AxumStatus::SERVICE_UNAVAILABLE, "down") }));
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let client = build_client(Duration::from_secs(2)).unwrap();
        let fetch = |path: &str| client.get(format!("http://{addr}{path}")).send();

        assert!(classify_response(fetch("/ok").await.unwrap()).await.is_ok());
        assert!(matches!(
            classify_response(fetch("/401").await.unwrap()).await,
            Err(ProviderError::Unauthorized { .. })
        ));
        assert!(matches!(
            classify_response(fetch("/404").await.unwrap()).await,
            Err(ProviderError::NotFound { .. })
        ));
        match classify_response(fetch("/429").await.unwrap()).await {
            Err(ProviderError::RateLimited { retry_after, body }) => {
                assert_eq!(retry_after, Some(Duration::from_secs(3)));
                assert_eq!(body, "slow down");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            classify_response(fetch("/400").await.unwrap()).await,
            Err(ProviderError::Client { status, .. }) if status == StatusCode::BAD_REQUEST
        ));
        assert!(matches!(
            classify_response(fetch("/503").await.unwrap()).await,
            Err(ProviderError::Server { .. })
        ));

        server.abort();
    }
}
