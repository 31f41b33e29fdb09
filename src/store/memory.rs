use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{LoadError, StoreError};

use super::{NewUser, ProvenanceStore, User};

/// In-memory [`ProvenanceStore`], seedable from a JSON list of users.
///
/// Ids are assigned sequentially after the highest seeded id.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    users: RwLock<BTreeMap<u64, User>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from existing records, rejecting duplicate ids or emails.
    pub fn with_users(users: impl IntoIterator<Item = User>) -> Result<Self, LoadError> {
        let mut map = BTreeMap::new();
        for user in users {
            if map.contains_key(&user.id) {
                return Err(LoadError::Duplicate(format!("user id {}", user.id)));
            }
            if map.values().any(|u: &User| u.email == user.email) {
                return Err(LoadError::Duplicate(user.email));
            }
            map.insert(user.id, user);
        }
        Ok(Self {
            users: RwLock::new(map),
        })
    }

    /// Load seed users from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let users: Vec<User> = serde_json::from_str(&raw).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_users(users)
    }
}

#[async_trait]
impl ProvenanceStore for InMemoryStore {
    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.users.read().await.values().cloned().collect())
    }

    async fn get_user(&self, id: u64) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!(
                "a user with email '{}' already exists",
                user.email
            )));
        }

        let id = users.keys().next_back().map_or(1, |last| last + 1);
        let created = User {
            id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            institution: user.institution,
        };
        users.insert(id, created.clone());
        Ok(created)
    }
}
