use async_trait::async_trait;
use hy3d_core::{ApiError, ClientConfig, GenerationRequest, JobId, QueryResult, SubmitResult};
use hy3d_engine::JobApi;
use hy3d_providers::HunyuanClient;

/// `JobApi` backed by the HTTP client.
#[derive(Debug, Clone)]
pub struct HunyuanJobApi {
    client: HunyuanClient,
}

impl HunyuanJobApi {
    pub fn new() -> Result<Self, ApiError> {
        Ok(Self {
            client: HunyuanClient::new()?,
        })
    }
}

#[async_trait]
impl JobApi for HunyuanJobApi {
    async fn submit(
        &self,
        cfg: &ClientConfig,
        request: &GenerationRequest,
    ) -> Result<SubmitResult, ApiError> {
        self.client.submit(cfg, request).await
    }

    async fn query(&self, cfg: &ClientConfig, job_id: &JobId) -> Result<QueryResult, ApiError> {
        self.client.query(cfg, job_id).await
    }
}
