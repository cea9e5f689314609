use app_core::error::AppError;
use app_core::identity::IdentityError;
use thiserror::Error;

/// Failures that end a callback in the login-failure redirect.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Authorization code exchange rejected: {0}")]
    AuthExchange(String),

    #[error("No authenticated identity")]
    NoSession,

    #[error("Profile lookup failed")]
    ProfileLookup(#[source] AppError),
}

/// Cleanup failures during reconciliation. Logged, never shown to the user.
#[derive(Debug, Error)]
pub enum ReconciliationWarning {
    #[error("Failed to delete orphaned identity {identity_id}")]
    DeleteIdentity {
        identity_id: String,
        #[source]
        source: IdentityError,
    },

    #[error("Failed to clear session of identity {identity_id}")]
    ClearSession {
        identity_id: String,
        #[source]
        source: IdentityError,
    },
}
