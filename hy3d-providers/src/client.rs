use crate::hunyuan::{build_query_request, build_submit_request};
use crate::parse::{extract_error_message, parse_query_response, parse_submit_response};
use crate::request::HttpRequest;
use crate::runtime::HttpRuntime;
use hy3d_core::{ApiError, ClientConfig, ErrorKind, GenerationRequest, JobId, QueryResult, SubmitResult};

/// One logical submit/query against the job API.
///
/// When the configured route cannot be reached at all, the call is retried
/// once with the proxy setting flipped (direct <-> relay) before giving up.
#[derive(Debug, Clone)]
pub struct HunyuanClient {
    http: HttpRuntime,
}

impl HunyuanClient {
    pub fn new() -> Result<Self, ApiError> {
        Ok(Self {
            http: HttpRuntime::new()?,
        })
    }

    pub async fn submit(
        &self,
        cfg: &ClientConfig,
        request: &GenerationRequest,
    ) -> Result<SubmitResult, ApiError> {
        log::info!("submitting {:?} job ({} mode)", request.kind(), cfg.mode_label());
        self.call_with_fallback(
            cfg,
            |c| build_submit_request(c, request),
            parse_submit_response,
            |original| {
                format!(
                    "Request failed. This is most likely a CORS or network restriction; \
                     try toggling the proxy in settings. Original error: {original}"
                )
            },
        )
        .await
    }

    pub async fn query(&self, cfg: &ClientConfig, job_id: &JobId) -> Result<QueryResult, ApiError> {
        log::debug!("querying job {job_id} ({} mode)", cfg.mode_label());
        self.call_with_fallback(
            cfg,
            |c| build_query_request(c, job_id),
            parse_query_response,
            |original| {
                format!("Connection failed. Check your network or CORS settings. Original error: {original}")
            },
        )
        .await
    }

    async fn call_with_fallback<T>(
        &self,
        cfg: &ClientConfig,
        build: impl Fn(&ClientConfig) -> Result<HttpRequest, ApiError>,
        parse: impl Fn(&[u8]) -> Result<T, ApiError>,
        exhausted: impl FnOnce(&ApiError) -> String,
    ) -> Result<T, ApiError> {
        let primary = match self.send(&build(cfg)?).await {
            Ok(body) => return parse(&body),
            Err(e) if e.is_network() => e,
            Err(e) => return Err(e),
        };

        let alternate = cfg.with_proxy_toggled();
        log::warn!(
            "{} request failed ({primary}); retrying once in {} mode",
            cfg.mode_label(),
            alternate.mode_label()
        );

        // An unusable alternate route just means the retry is spent.
        let retried = match build(&alternate) {
            Ok(req) => match self.send(&req).await {
                Ok(body) => parse(&body),
                Err(e) => Err(e),
            },
            Err(e) => {
                log::warn!("cannot build {} request: {e}", alternate.mode_label());
                Err(e)
            }
        };

        match retried {
            Ok(v) => Ok(v),
            // A definitive answer from the backend beats a guess about CORS.
            Err(e) if e.kind() == ErrorKind::BackendReported => Err(e),
            Err(e) => {
                log::warn!("{} retry failed as well: {e}", alternate.mode_label());
                Err(ApiError::Network(exhausted(&primary)))
            }
        }
    }

    async fn send(&self, req: &HttpRequest) -> Result<Vec<u8>, ApiError> {
        let resp = self.http.execute(req).await?;
        if !resp.is_success() {
            let message = extract_error_message(&resp.body)
                .unwrap_or_else(|| format!("HTTP Error: {}", resp.status_line()));
            return Err(ApiError::Http {
                status: resp.status,
                message,
            });
        }
        Ok(resp.body)
    }
}
