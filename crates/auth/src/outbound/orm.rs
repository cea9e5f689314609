use std::sync::Arc;

use app_core::error::AppError;
use async_trait::async_trait;
use sea_orm::{DatabaseConnection, EntityTrait};
use uuid::Uuid;

use super::entity::prelude::Profiles;
use super::entity::profiles;
use super::repository::ProfileRepository;
use crate::domain::entity::profile::Profile;

/// SeaORM-backed [`ProfileRepository`] over the `profiles` table.
pub struct ProfileORM {
    db: Arc<DatabaseConnection>,
}

impl ProfileORM {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn to_profile(&self, model: profiles::Model) -> Profile {
        Profile { id: model.id.to_string(), full_name: model.full_name, created_at: model.created_at.into() }
    }
}

#[async_trait]
impl ProfileRepository for ProfileORM {
    async fn find_profile_by_id(&self, id: &str) -> Result<Option<Profile>, AppError> {
        // Profiles are keyed by uuid; no row can match anything else.
        let Ok(key) = Uuid::parse_str(id) else {
            tracing::warn!(identity_id = %id, "Identity id is not a uuid, treating profile as missing");
            return Ok(None);
        };

        let model = Profiles::find_by_id(key).one(self.db.as_ref()).await?;

        Ok(model.map(|m| self.to_profile(m)))
    }
}
