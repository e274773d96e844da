/// Documentation and upstream health pass-through
use crate::{context::AppContext, error::ApiResult, proxy::ProxiedResponse};
use axum::{
    body::{Body, Bytes},
    extract::{OriginalUri, State},
    http::{header, HeaderMap, Method},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};

/// Build proxy routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/docs", any(proxy_docs))
        .route("/docs/*rest", any(proxy_docs))
        .route("/redoc", any(proxy_docs))
        .route("/openapi.json", any(proxy_docs))
        .route("/health", get(upstream_health))
}

/// Forward the request with its original path and query
async fn proxy_docs(
    State(ctx): State<AppContext>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());

    let ProxiedResponse {
        status,
        content_type,
        body,
    } = ctx
        .docs
        .forward(method, path_and_query, &headers, body)
        .await?;

    Ok((status, [(header::CONTENT_TYPE, content_type)], Body::from(body)).into_response())
}

async fn upstream_health(State(ctx): State<AppContext>) -> ApiResult<Json<serde_json::Value>> {
    Ok(Json(ctx.docs.health().await?))
}
