use crate::request::HttpRequest;
use hy3d_core::ApiError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    /// `"404 Not Found"`, or just the code for non-standard statuses.
    pub fn status_line(&self) -> String {
        let reason = reqwest::StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason());
        match reason {
            Some(r) => format!("{} {}", self.status, r),
            None => self.status.to_string(),
        }
    }
}

/// Sends `HttpRequest`s over a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpRuntime {
    client: reqwest::Client,
}

impl HttpRuntime {
    pub fn new() -> Result<Self, ApiError> {
        // Without an explicit timeout a stalled relay would hold a poll tick forever.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ApiError::Config(format!("build http client: {e}")))?;
        Ok(Self { client })
    }

    pub async fn execute(&self, req: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut headers = HeaderMap::new();
        for (k, v) in &req.headers {
            let name = HeaderName::from_bytes(k.as_bytes())
                .map_err(|_| ApiError::Config(format!("invalid header name: {k}")))?;
            let value = HeaderValue::from_str(v)
                .map_err(|_| ApiError::Config(format!("invalid header value for {k}")))?;
            headers.insert(name, value);
        }

        // Both endpoints are JSON POSTs.
        if req.method != "POST" {
            return Err(ApiError::Config(format!("unsupported method: {}", req.method)));
        }
        let builder = self
            .client
            .post(&req.url)
            .headers(headers)
            .body(req.body.clone());

        log::debug!("{} {}", req.method, req.url);

        let resp = builder.send().await.map_err(classify_send_error)?;
        let status = resp.status().as_u16();
        let body = resp
            .bytes()
            .await
            .map_err(|e| ApiError::Network(format!("failed reading response body: {e}")))?
            .to_vec();

        Ok(HttpResponse { status, body })
    }
}

// Everything except a malformed request counts as "no response", which is
// what triggers the proxy fallback.
fn classify_send_error(e: reqwest::Error) -> ApiError {
    if e.is_builder() {
        ApiError::Config(format!("could not build request: {e}"))
    } else if e.is_timeout() {
        ApiError::Network(format!("request timed out: {e}"))
    } else if e.is_connect() {
        ApiError::Network(format!("could not connect: {e}"))
    } else {
        ApiError::Network(format!("network request failed: {e}"))
    }
}
