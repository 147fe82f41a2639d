use hy3d_core::{JobId, QueryResult, RemoteStatus};
use serde::{Deserialize, Serialize};

pub const SUBMIT_PROGRESS: f32 = 5.0;
pub const POLL_START_PROGRESS: f32 = 10.0;
pub const POLL_PROGRESS_CAP: f32 = 90.0;
pub const DONE_PROGRESS: f32 = 100.0;

pub const SUBMIT_FAILURE_MESSAGE: &str = "Failed to submit task";
pub const SERVER_FAILURE_MESSAGE: &str = "Generation failed on server side.";
pub const NO_MODEL_URL_MESSAGE: &str = "Job completed but no Model URL found in response.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Idle,
    Submitting,
    Polling,
    Success,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Submitting => "SUBMITTING",
            Self::Polling => "POLLING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable view of a session, published after every transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub status: SessionStatus,
    pub job_id: Option<JobId>,
    pub result_url: Option<String>,
    pub error_message: Option<String>,
    pub progress: u8,
}

impl JobSnapshot {
    pub fn idle() -> Self {
        JobSession::idle().snapshot()
    }
}

/// State of one generation attempt. Only the controller mutates it.
///
/// Progress is accumulated as a fraction so sub-percent jitter still adds up;
/// snapshots expose the floor.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSession {
    status: SessionStatus,
    job_id: Option<JobId>,
    result_url: Option<String>,
    error_message: Option<String>,
    progress: f32,
}

impl JobSession {
    pub fn idle() -> Self {
        Self {
            status: SessionStatus::Idle,
            job_id: None,
            result_url: None,
            error_message: None,
            progress: 0.0,
        }
    }

    pub fn submitting() -> Self {
        Self {
            status: SessionStatus::Submitting,
            progress: SUBMIT_PROGRESS,
            ..Self::idle()
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn job_id(&self) -> Option<&JobId> {
        self.job_id.as_ref()
    }

    pub fn begin_polling(&mut self, job_id: JobId) {
        self.status = SessionStatus::Polling;
        self.job_id = Some(job_id);
        self.progress = self.progress.max(POLL_START_PROGRESS);
    }

    /// No-op outside `POLLING`. Never decreases, never passes the cap.
    pub fn advance_progress(&mut self, increment: f32) {
        if self.status != SessionStatus::Polling || !increment.is_finite() {
            return;
        }
        self.progress = (self.progress + increment.max(0.0)).min(POLL_PROGRESS_CAP);
    }

    pub fn succeed(&mut self, result_url: impl Into<String>) {
        self.status = SessionStatus::Success;
        self.result_url = Some(result_url.into());
        self.error_message = None;
        self.progress = DONE_PROGRESS;
    }

    /// Keeps the job id if submission had already succeeded.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = SessionStatus::Failed;
        self.result_url = None;
        self.error_message = Some(message.into());
    }

    /// Applies a poll response. Returns `true` if the session became terminal.
    pub fn apply_query(&mut self, result: &QueryResult) -> bool {
        match &result.status {
            RemoteStatus::Success => {
                match result.resolved_model_url() {
                    Some(url) => self.succeed(url),
                    None => self.fail(NO_MODEL_URL_MESSAGE),
                }
                true
            }
            RemoteStatus::Failed => {
                let message = result
                    .error_message
                    .as_deref()
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .unwrap_or(SERVER_FAILURE_MESSAGE);
                self.fail(message);
                true
            }
            RemoteStatus::Waiting | RemoteStatus::Running | RemoteStatus::Other(_) => false,
        }
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            status: self.status,
            job_id: self.job_id.clone(),
            result_url: self.result_url.clone(),
            error_message: self.error_message.clone(),
            progress: self.progress.floor().clamp(0.0, DONE_PROGRESS) as u8,
        }
    }
}

impl Default for JobSession {
    fn default() -> Self {
        Self::idle()
    }
}
