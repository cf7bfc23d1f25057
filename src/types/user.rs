//! Account owner as known to the user directory

use super::account::OwnerId;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Registered account owner
///
/// Emails are stored lowercased and are unique across users.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: OwnerId,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Canonical form of an email used for lookups and uniqueness
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
