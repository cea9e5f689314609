use chrono::{DateTime, Utc};

/// Application-owned record created by registration, keyed by identity id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: String,
    pub full_name: Option<String>,
    pub created_at: DateTime<Utc>,
}
