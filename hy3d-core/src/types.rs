use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque identifier the backend assigns to a submitted job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl JobId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    Text,
    Image,
}

/// What the caller wants turned into a 3D asset.
///
/// Exactly one input is ever carried; the enum makes "both" and "neither"
/// unrepresentable.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationRequest {
    Text { prompt: String },
    Image { image_data: String },
}

impl std::fmt::Debug for GenerationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Image payloads are multi-megabyte data URLs; never dump them into logs.
        match self {
            Self::Text { prompt } => f.debug_struct("Text").field("prompt", prompt).finish(),
            Self::Image { image_data } => f
                .debug_struct("Image")
                .field("image_data", &format_args!("len={}", image_data.len()))
                .finish(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("prompt must not be empty")]
    EmptyPrompt,
    #[error("image data must not be empty")]
    EmptyImage,
}

impl GenerationRequest {
    pub fn text(prompt: impl Into<String>) -> Result<Self, RequestError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(RequestError::EmptyPrompt);
        }
        Ok(Self::Text { prompt })
    }

    pub fn image(image_data: impl Into<String>) -> Result<Self, RequestError> {
        let image_data = image_data.into();
        if image_data.is_empty() {
            return Err(RequestError::EmptyImage);
        }
        Ok(Self::Image { image_data })
    }

    pub fn kind(&self) -> TaskKind {
        match self {
            Self::Text { .. } => TaskKind::Text,
            Self::Image { .. } => TaskKind::Image,
        }
    }
}
