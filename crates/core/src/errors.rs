use tracing::Level;

/// Application error taxonomy.
///
/// Each kind fixes an HTTP-style status code, a message template filled from
/// its fields, and the severity it is logged at when surfaced.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AppError {
    #[error("{entity} not found!")]
    NotFound { entity: String },
    #[error("{entity} with this {fields} already exists.")]
    DuplicateEntry { entity: String, fields: String },
    #[error("Incorrect email or password.")]
    InvalidCredentials,
    #[error("Token has been expired.")]
    TokenExpired,
    #[error("Invalid token signature.")]
    InvalidSignature,
    #[error("Access denied.")]
    PermissionDenied,
    #[error("Your account is disabled.")]
    AccountDisabled,
    #[error("{reason}")]
    BadRequest { reason: String },
    #[error("Invalid event: {event}")]
    InvalidEvent { event: String },
}

impl AppError {
    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::NotFound { entity: entity.into() }
    }

    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::BadRequest { reason: reason.into() }
    }

    /// The HTTP status code this kind maps to at the boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::NotFound { .. } => 404,
            AppError::DuplicateEntry { .. } => 400,
            AppError::InvalidCredentials => 401,
            AppError::TokenExpired => 401,
            AppError::InvalidSignature => 400,
            AppError::PermissionDenied => 403,
            AppError::AccountDisabled => 403,
            AppError::BadRequest { .. } => 400,
            AppError::InvalidEvent { .. } => 400,
        }
    }

    /// The severity this kind is logged at when it reaches the boundary.
    pub fn log_level(&self) -> Level {
        match self {
            AppError::InvalidCredentials
            | AppError::PermissionDenied
            | AppError::AccountDisabled => Level::INFO,
            _ => Level::DEBUG,
        }
    }

    /// Emit the error at its own severity.
    pub fn log(&self) {
        if self.log_level() == Level::INFO {
            tracing::info!(error = %self, "request error");
        } else {
            tracing::debug!(error = %self, "request error");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::not_found("Thread").status_code(), 404);
        assert_eq!(
            AppError::DuplicateEntry {
                entity: "User".to_string(),
                fields: "email".to_string()
            }
            .status_code(),
            400
        );
        assert_eq!(AppError::InvalidCredentials.status_code(), 401);
        assert_eq!(AppError::TokenExpired.status_code(), 401);
        assert_eq!(AppError::InvalidSignature.status_code(), 400);
        assert_eq!(AppError::PermissionDenied.status_code(), 403);
        assert_eq!(AppError::AccountDisabled.status_code(), 403);
        assert_eq!(AppError::bad_request("nope").status_code(), 400);
    }

    #[test]
    fn test_message_templates() {
        assert_eq!(AppError::not_found("Thread").to_string(), "Thread not found!");
        let dup = AppError::DuplicateEntry {
            entity: "User".to_string(),
            fields: "email".to_string(),
        };
        assert_eq!(dup.to_string(), "User with this email already exists.");
        let event = AppError::InvalidEvent { event: "ping".to_string() };
        assert_eq!(event.to_string(), "Invalid event: ping");
    }

    #[test]
    fn test_log_levels() {
        assert_eq!(AppError::InvalidCredentials.log_level(), Level::INFO);
        assert_eq!(AppError::not_found("User").log_level(), Level::DEBUG);
    }
}
