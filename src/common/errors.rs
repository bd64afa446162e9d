use thiserror::Error;

/// Behavioural error kinds shared across the catalogue, reconciler,
/// person-search pipeline, and batch orchestrator. These are
/// deliberately coarse — callers match on the kind, not on the source.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("transient remote failure: {0}")]
    TransientRemote(String),

    #[error("authentication expired")]
    AuthExpired,

    #[error("invalid input: {0}")]
    Invalid(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("index degraded, falling back to catalogue scan: {0}")]
    IndexDegraded(String),
}

impl From<sea_orm::DbErr> for CoreError {
    fn from(err: sea_orm::DbErr) -> Self {
        match &err {
            sea_orm::DbErr::RecordNotFound(msg) => Self::NotFound(msg.clone()),
            _ => Self::Conflict(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.status() == Some(reqwest::StatusCode::NOT_FOUND) {
            Self::NotFound(err.to_string())
        } else if err.status() == Some(reqwest::StatusCode::UNAUTHORIZED) {
            Self::AuthExpired
        } else if err.is_timeout() || err.is_connect() || err.status().is_some_and(|s| s.is_server_error()) {
            Self::TransientRemote(err.to_string())
        } else {
            Self::TransientRemote(err.to_string())
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
