use thiserror::Error;

/// Coarse classification the lifecycle controller acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network unreachable, relay rejection, non-2xx status.
    Transport,
    /// Malformed or incomplete response, or unusable client settings.
    Protocol,
    /// The backend explicitly said the job failed.
    BackendReported,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The request never produced a response (connection refused, DNS, relay
    /// dropped the connection, body read aborted).
    #[error("{0}")]
    Network(String),

    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("response is not valid JSON: {0}")]
    Decode(String),

    #[error("{0}")]
    Protocol(String),

    #[error("{}", message.as_deref().unwrap_or("backend reported an error"))]
    Backend { message: Option<String> },

    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl ApiError {
    pub fn backend(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::Backend {
            message: (!message.trim().is_empty()).then_some(message),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) | Self::Http { .. } => ErrorKind::Transport,
            Self::Decode(_) | Self::Protocol(_) | Self::Config(_) => ErrorKind::Protocol,
            Self::Backend { .. } => ErrorKind::BackendReported,
        }
    }

    /// Whether a poll that failed this way may succeed on the next tick.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Http { .. } | Self::Decode(_)
        )
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Message suitable for a user-facing session, `None` if the error
    /// carries nothing better than a generic fallback.
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::Backend { message } => message.clone(),
            other => {
                let s = other.to_string();
                (!s.trim().is_empty()).then_some(s)
            }
        }
    }
}
