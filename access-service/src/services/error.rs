use service_core::error::AppError;
use thiserror::Error;

use crate::models::Lidnr;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Member not found: {0}")]
    MemberNotFound(Lidnr),

    #[error("Album not found: {0}")]
    AlbumNotFound(u64),

    #[error("Page not found: {0}")]
    PageNotFound(String),

    #[error("Session signing key unavailable")]
    SigningKeyUnavailable,

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Internal(e) => AppError::InternalError(e),
            ServiceError::InvalidCredentials => {
                AppError::Unauthorized(anyhow::anyhow!("Invalid credentials"))
            }
            ServiceError::MemberNotFound(lidnr) => {
                AppError::NotFound(anyhow::anyhow!("Member {} not found", lidnr))
            }
            ServiceError::AlbumNotFound(id) => {
                AppError::NotFound(anyhow::anyhow!("Album {} not found", id))
            }
            ServiceError::PageNotFound(slug) => {
                AppError::NotFound(anyhow::anyhow!("Page {} not found", slug))
            }
            ServiceError::SigningKeyUnavailable => AppError::ServiceUnavailable,
            ServiceError::Token(e) => AppError::InternalError(anyhow::Error::new(e)),
        }
    }
}
