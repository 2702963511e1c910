use super::events::ServerFrame;
use crate::error::AppError;

/// Errors surfaced to a single session. Only `Auth` is fatal to the
/// connection; the rest are reported and the connection stays open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Bad or expired token. The connection is closed.
    Auth(String),
    /// Operation the session is not allowed to perform.
    Permission(String),
    /// Malformed or inconsistent payload.
    Validation(String),
    /// Persistence failed; the message was not broadcast.
    Dispatch(String),
}

impl GatewayError {
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Auth(_) => "auth_error",
            GatewayError::Permission(_) => "permission_error",
            GatewayError::Validation(_) => "validation_error",
            GatewayError::Dispatch(_) => "dispatch_error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            GatewayError::Auth(m)
            | GatewayError::Permission(m)
            | GatewayError::Validation(m)
            | GatewayError::Dispatch(m) => m,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, GatewayError::Auth(_))
    }

    pub fn to_frame(&self) -> ServerFrame {
        ServerFrame::Error {
            code: self.code(),
            message: self.message().to_string(),
        }
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl From<AppError> for GatewayError {
    fn from(e: AppError) -> Self {
        GatewayError::Dispatch(format!("collaborator error: {e:?}"))
    }
}
