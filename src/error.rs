use thiserror::Error;

/// Business-rule violations (`NotFound`, `BadRequest`, `Conflict`) are
/// constructed and returned by the services; infrastructure variants are
/// propagated from the store and storage layers with `?`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store error")]
    Store(#[from] mongodb::error::Error),

    #[error("Storage error")]
    Storage(#[from] object_store::Error),

    #[error("Serialization error")]
    Json(#[from] serde_json::Error),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// True for the error classes a caller maps to a 4xx response rather
    /// than unwinding.
    pub fn is_business(&self) -> bool {
        matches!(
            self,
            AppError::NotFound(_) | AppError::BadRequest(_) | AppError::Conflict(_)
        )
    }
}

pub type AppResult<T> = Result<T, AppError>;
