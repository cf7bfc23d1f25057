//! In-memory user directory
//!
//! Resolves transfer destinations given as an email or a numeric user id.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tracing::info;

use crate::core::traits::UserDirectory;
use crate::types::user::normalize_email;
use crate::types::{LedgerError, OwnerId, User};

/// User directory keyed by id and by lowercased email
#[derive(Debug)]
pub struct MemoryDirectory {
    users: DashMap<OwnerId, User>,
    emails: DashMap<String, OwnerId>,
    next_user_id: AtomicU64,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            emails: DashMap::new(),
            next_user_id: AtomicU64::new(1),
        }
    }
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn resolve(&self, identifier: &str) -> Result<Option<OwnerId>, LedgerError> {
        let identifier = identifier.trim();
        if let Ok(id) = identifier.parse::<OwnerId>() {
            return Ok(self.users.contains_key(&id).then_some(id));
        }
        Ok(self
            .emails
            .get(&normalize_email(identifier))
            .map(|id| *id.value()))
    }

    async fn register(&self, email: &str, name: &str) -> Result<User, LedgerError> {
        let email = normalize_email(email);

        // The email slot is claimed first so concurrent registrations of one
        // address cannot both win.
        let mut created = false;
        let id = *self
            .emails
            .entry(email.clone())
            .or_insert_with(|| {
                created = true;
                self.next_user_id.fetch_add(1, Ordering::Relaxed)
            })
            .value();

        if !created {
            return Err(LedgerError::already_exists(format!("User {}", email)));
        }

        let user = User {
            id,
            email,
            name: name.trim().to_string(),
            created_at: Utc::now(),
        };
        self.users.insert(id, user.clone());

        info!(user = id, email = %user.email, "user registered");
        Ok(user)
    }

    async fn unregister(&self, id: OwnerId) -> Result<(), LedgerError> {
        if let Some((_, user)) = self.users.remove(&id) {
            self.emails.remove(&user.email);
            info!(user = id, email = %user.email, "user removed");
        }
        Ok(())
    }
}
