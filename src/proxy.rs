/// Pass-through client for the external documentation and health service
use crate::{
    auth::API_KEY_HEADER,
    config::UpstreamConfig,
    error::{ApiError, ApiResult},
    metrics,
};
use axum::{
    body::Bytes,
    http::{header, HeaderMap, HeaderName, Method, StatusCode},
};

/// Request headers that must not be forwarded upstream
const HOP_BY_HOP: [HeaderName; 10] = [
    header::CONNECTION,
    header::HOST,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
    header::TE,
    header::TRAILER,
    header::UPGRADE,
    header::PROXY_AUTHORIZATION,
    // Bodies are relayed without their encoding header
    header::ACCEPT_ENCODING,
    HeaderName::from_static(API_KEY_HEADER),
];

const DEFAULT_CONTENT_TYPE: &str = "text/html";

/// Upstream reply relayed back to the caller
#[derive(Debug, Clone)]
pub struct ProxiedResponse {
    pub status: StatusCode,
    pub content_type: String,
    pub body: Bytes,
}

/// Forwards documentation paths and health checks upstream
#[derive(Debug, Clone)]
pub struct DocsProxy {
    http_client: reqwest::Client,
    docs_url: String,
    health_url: String,
}

impl DocsProxy {
    /// Create a new proxy client
    pub fn new(config: &UpstreamConfig) -> ApiResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("battery-os/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout())
            .build()
            .map_err(|e| ApiError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            docs_url: config.docs_url.clone(),
            health_url: config.health_url.clone(),
        })
    }

    /// Forward a request verbatim to the documentation service
    pub async fn forward(
        &self,
        method: Method,
        path_and_query: &str,
        headers: &HeaderMap,
        body: Bytes,
    ) -> ApiResult<ProxiedResponse> {
        let url = format!("{}{}", self.docs_url, path_and_query);
        tracing::info!(%method, %url, "Proxying request to documentation service");

        let result = self.send(method, &url, headers, body).await;
        metrics::record_proxy_request("docs", result.is_ok());
        result.map_err(|e| {
            tracing::error!(%url, error = %e, "Error proxying to documentation service");
            e
        })
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        headers: &HeaderMap,
        body: Bytes,
    ) -> ApiResult<ProxiedResponse> {
        let mut request = self
            .http_client
            .request(method, url)
            .headers(forwardable_headers(headers));
        if !body.is_empty() {
            request = request.body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::UpstreamUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::UpstreamUnavailable(format!(
                "Documentation service responded with status: {}",
                status
            )));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::UpstreamUnavailable(e.to_string()))?;

        Ok(ProxiedResponse {
            status,
            content_type,
            body,
        })
    }

    /// Fetch the upstream health document
    pub async fn health(&self) -> ApiResult<serde_json::Value> {
        let url = format!("{}/health", self.health_url);
        tracing::debug!(%url, "Proxying health check");

        let result = self.fetch_health(&url).await;
        metrics::record_proxy_request("health", result.is_ok());
        result.map_err(|e| {
            tracing::error!(%url, error = %e, "Upstream health check failed");
            e
        })
    }

    async fn fetch_health(&self, url: &str) -> ApiResult<serde_json::Value> {
        let response = self
            .http_client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ApiError::UpstreamUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ApiError::UpstreamUnavailable(format!(
                "Health service responded with status: {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::UpstreamUnavailable(e.to_string()))
    }
}

/// Copy end-to-end headers, dropping hop-by-hop ones
fn forwardable_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = headers.clone();
    for name in HOP_BY_HOP.iter() {
        forwarded.remove(name);
    }
    forwarded
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_hop_by_hop_and_credentials_dropped() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("battery.local"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("text/html"));
        headers.insert("x-api-key", HeaderValue::from_static("abc"));

        let forwarded = forwardable_headers(&headers);
        assert!(forwarded.get(header::HOST).is_none());
        assert!(forwarded.get(header::CONNECTION).is_none());
        assert_eq!(forwarded.get(header::ACCEPT).unwrap(), "text/html");
        assert!(forwarded.get("x-api-key").is_none());
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_unavailable() {
        let proxy = DocsProxy::new(&UpstreamConfig {
            docs_url: "http://127.0.0.1:1".to_string(),
            health_url: "http://127.0.0.1:1".to_string(),
            timeout_secs: 2,
        })
        .unwrap();

        let err = proxy
            .forward(Method::GET, "/docs", &HeaderMap::new(), Bytes::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::UpstreamUnavailable(_)));

        let err = proxy.health().await.unwrap_err();
        assert!(matches!(err, ApiError::UpstreamUnavailable(_)));
    }
}
