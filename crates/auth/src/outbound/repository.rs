use app_core::error::AppError;
use async_trait::async_trait;

use crate::domain::entity::profile::Profile;

/// Read access to application profiles.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait ProfileRepository: Send + Sync {
    /// Looks up the profile of an identity.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(profile))` when the identity completed registration.
    /// * `Ok(None)` when no profile row exists.
    /// * `Err(AppError)` when the store could not be queried.
    async fn find_profile_by_id(&self, id: &str) -> Result<Option<Profile>, AppError>;
}
