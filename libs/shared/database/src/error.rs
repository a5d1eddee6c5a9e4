use thiserror::Error;

/// PostgreSQL unique_violation, surfaced by PostgREST in the error body.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Authentication error: {0}")]
    Unauthorized(String),

    #[error("Permission denied: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Admin API is not configured")]
    AdminNotConfigured,

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type DbResult<T> = Result<T, DatabaseError>;

impl DatabaseError {
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 => DatabaseError::Unauthorized(body),
            403 => DatabaseError::Forbidden(body),
            404 => DatabaseError::NotFound(body),
            409 => DatabaseError::Conflict(body),
            400 if body.contains(UNIQUE_VIOLATION) => DatabaseError::Conflict(body),
            _ => DatabaseError::Api { status, message: body },
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, DatabaseError::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound(_))
    }
}
