use async_trait::async_trait;
use hy3d_core::{ApiError, ClientConfig, GenerationRequest, JobId, QueryResult, SubmitResult};
use rand::Rng;

/// Upper bound (exclusive) of the per-tick cosmetic progress increment.
pub const MAX_JITTER: f32 = 5.0;

/// The remote job API as seen by the controller.
///
/// `cfg` is passed on every call; implementations must not cache it.
#[async_trait]
pub trait JobApi: Send + Sync {
    async fn submit(
        &self,
        cfg: &ClientConfig,
        request: &GenerationRequest,
    ) -> Result<SubmitResult, ApiError>;

    async fn query(&self, cfg: &ClientConfig, job_id: &JobId) -> Result<QueryResult, ApiError>;
}

/// Source of the progress increment applied on each poll tick.
pub trait ProgressJitter: Send + Sync {
    fn next_increment(&self) -> f32;
}

/// Uniform in `[0, MAX_JITTER)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomJitter;

impl ProgressJitter for RandomJitter {
    fn next_increment(&self) -> f32 {
        rand::thread_rng().gen_range(0.0..MAX_JITTER)
    }
}
