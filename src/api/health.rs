/// Local liveness and Prometheus scrape endpoints
use crate::{context::AppContext, error::ApiError, metrics};
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};

/// Liveness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessStatus {
    pub status: String,
    pub version: String,
}

/// Build health routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/health/live", get(liveness))
        .route("/metrics", get(prometheus_metrics))
}

/// Answers as long as the process can serve requests
async fn liveness() -> Json<LivenessStatus> {
    Json(LivenessStatus {
        status: "alive".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn prometheus_metrics() -> Response {
    match metrics::render_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => ApiError::Internal(format!("Failed to render metrics: {}", e)).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_liveness() {
        let Json(status) = liveness().await;
        assert_eq!(status.status, "alive");
        assert_eq!(status.version, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        metrics::record_user_created();
        let response = prometheus_metrics().await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; version=0.0.4"
        );
    }
}
