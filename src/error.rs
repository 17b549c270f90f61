use thiserror::Error;

use crate::storage::DatabaseError;

#[derive(Debug, Error)]
pub enum AuthError {
    /// No secrets have been written yet
    #[error("System is not initialized")]
    NotInitialized,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{0}")]
    Validation(String),
    /// Infrastructure fault; never reported as a credential failure
    #[error("Secret store unavailable: {0}")]
    StoreUnavailable(#[from] DatabaseError),
    #[error("Failed to sign session token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}
