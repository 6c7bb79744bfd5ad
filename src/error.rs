use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Transport,
    Protocol,
    Authentication,
    Data,
}

#[derive(Debug, Error)]
pub enum CallError {
    #[error("network request failed: {0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
    #[error("HTTP error: {status}")]
    HttpStatus { status: u16, body: Option<Value> },
    #[error("failed to parse response body: {0}")]
    Parse(String),
}

impl CallError {
    pub fn kind(&self) -> FailureKind {
        match self {
            CallError::Transport(_) | CallError::Timeout => FailureKind::Transport,
            CallError::HttpStatus { .. } | CallError::Parse(_) => FailureKind::Protocol,
        }
    }

    /// A dropped connection; timeouts are excluded.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, CallError::Transport(_))
    }

    pub fn body(&self) -> Option<&Value> {
        match self {
            CallError::HttpStatus { body, .. } => body.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum StudyError {
    #[error("authentication lost while studying course {course_id}: {message}")]
    AuthenticationLost { course_id: String, message: String },
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl StudyError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, StudyError::AuthenticationLost { .. })
    }

    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            StudyError::AuthenticationLost { .. } => Some(FailureKind::Authentication),
            StudyError::Unexpected(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_loss_is_fatal() {
        let err = StudyError::AuthenticationLost {
            course_id: "c1".into(),
            message: "登录超时".into(),
        };
        assert!(err.is_fatal());
        assert_eq!(err.kind(), Some(FailureKind::Authentication));

        let err = StudyError::from(anyhow::anyhow!("course has no id"));
        assert!(!err.is_fatal());
        assert_eq!(err.kind(), None);
    }

    #[test]
    fn only_dropped_connections_are_connection_failures() {
        assert!(CallError::Transport("reset".into()).is_connection_failure());
        assert!(!CallError::Timeout.is_connection_failure());
        assert_eq!(CallError::Timeout.kind(), FailureKind::Transport);
        assert_eq!(CallError::Parse("eof".into()).kind(), FailureKind::Protocol);
    }
}
