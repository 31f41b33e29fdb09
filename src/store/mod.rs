//! Provenance data store collaborator.
//!
//! The gateway never reaches the workflow-provenance database directly; route
//! handlers call into it through [`ProvenanceStore`] and receive typed records
//! they translate into response bodies.

mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub use memory::InMemoryStore;

/// A user record as exposed by the REST API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub institution: String,
}

/// Fields accepted when creating a user; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub institution: String,
}

/// Typed query surface of the provenance data store.
#[async_trait]
pub trait ProvenanceStore: Send + Sync {
    /// All users, ordered by id.
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    async fn get_user(&self, id: u64) -> Result<Option<User>, StoreError>;

    /// Look up a user by email. Emails double as login identifiers.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Create a user. Fails with [`StoreError::Conflict`] on a duplicate email.
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;
}
