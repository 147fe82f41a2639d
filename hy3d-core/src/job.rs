use crate::types::JobId;
use serde::{Deserialize, Serialize};

/// Job status as reported by the backend, after canonicalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteStatus {
    Waiting,
    Running,
    Success,
    Failed,
    /// Anything else, upper-cased. An absent status is `Other("")`.
    Other(String),
}

impl RemoteStatus {
    /// Case-insensitive; `SUCCEEDED` and `COMPLETED` both mean `SUCCESS`.
    pub fn normalize(raw: &str) -> Self {
        let upper = raw.trim().to_uppercase();
        match upper.as_str() {
            "WAITING" => Self::Waiting,
            "RUNNING" => Self::Running,
            "SUCCESS" | "SUCCEEDED" | "COMPLETED" => Self::Success,
            "FAILED" => Self::Failed,
            _ => Self::Other(upper),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Waiting => "WAITING",
            Self::Running => "RUNNING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Other(s) => s,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResult {
    pub job_id: JobId,
}

/// A query response reduced to the fields the controller cares about,
/// independent of which backend dialect produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    pub job_id: Option<JobId>,
    pub status: RemoteStatus,
    pub model_url: Option<String>,
    pub cover_url: Option<String>,
    pub error_message: Option<String>,
}

impl QueryResult {
    pub fn with_status(status: RemoteStatus) -> Self {
        Self {
            job_id: None,
            status,
            model_url: None,
            cover_url: None,
            error_message: None,
        }
    }

    /// First non-empty of the model URL and the cover URL.
    pub fn resolved_model_url(&self) -> Option<&str> {
        [self.model_url.as_deref(), self.cover_url.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|u| !u.is_empty())
    }
}
