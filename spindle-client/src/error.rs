//! Errors raised by the gate and registry clients

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

/// Failure of one call to the gate or the registry
#[derive(Debug, Error)]
pub enum ClientError {
    /// The call never produced a usable answer (connect, timeout, body read)
    #[error("request to remote failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The remote answered with a non-success status
    #[error("remote answered {status}: {message}")]
    ApiError { status: u16, message: String },

    /// The body was not the document we asked for
    #[error("unreadable response: {0}")]
    ParseError(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Rejected locally before anything was sent
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// HTTP status carried by the error, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ApiError { status, .. } => Some(*status),
            Self::RequestFailed(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// A missing pipeline or image, whether reported by status or by an
    /// empty answer
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_)) || self.status() == Some(404)
    }

    /// 4xx; a lookup failing this way is treated as "absent"
    pub fn is_client_error(&self) -> bool {
        self.status().is_some_and(|status| (400..500).contains(&status))
    }

    /// 5xx; always fatal for a run
    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|status| status >= 500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let missing = ClientError::api_error(404, "no such pipeline");
        assert!(missing.is_not_found());
        assert!(missing.is_client_error());
        assert_eq!(missing.status(), Some(404));

        let broken = ClientError::api_error(503, "unavailable");
        assert!(broken.is_server_error());
        assert!(!broken.is_client_error());
        assert!(!broken.is_not_found());

        assert_eq!(ClientError::ParseError("bad".into()).status(), None);
    }

    #[test]
    fn test_messages_name_the_remote_answer() {
        let err = ClientError::api_error(403, "forbidden");
        assert_eq!(err.to_string(), "remote answered 403: forbidden");

        let err = ClientError::NotFound("image acme/orders".into());
        assert!(err.is_not_found());
        assert!(!err.is_client_error());
        assert_eq!(err.to_string(), "not found: image acme/orders");
    }
}
