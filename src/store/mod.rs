//! Durable stores behind the consistency engine.
//!
//! The three collections (assignment groups, sets, users) are separate contracts and are
//! mutated independently. Assignment lists are written with compare-and-swap on a per-row
//! `version`, so a read-modify-write that lost a race reports `false` instead of silently
//! overwriting another writer.

use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::assignment::{AssignmentRef, Availability};
use crate::types::{AssignmentGroup, NamedEntry, NewSet, Product, ProductDraft, Role, Set, SetPatch, User};

pub mod sqlite;

pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("{entity} name already exists: {name}")]
    DuplicateName { entity: &'static str, name: String },

    #[error("{0}")]
    MissingReference(String),

    #[error("corrupt {entity} record {id}: {message}")]
    Corrupt { entity: &'static str, id: String, message: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Uniqueness key for display names: case-insensitive and blind to whitespace.
pub fn name_key(name: &str) -> String {
    name.chars().filter(|c| !c.is_whitespace()).flat_map(char::to_lowercase).collect()
}

#[async_trait]
pub trait AssignmentStore: Send + Sync {
    async fn list_groups(&self) -> StoreResult<Vec<AssignmentGroup>>;
    async fn get_group(&self, id: Uuid) -> StoreResult<Option<AssignmentGroup>>;
    async fn create_group(&self, name: &str) -> StoreResult<AssignmentGroup>;
    async fn rename_group(&self, id: Uuid, name: &str) -> StoreResult<AssignmentGroup>;
    /// Returns `false` when no such group existed.
    async fn delete_group(&self, id: Uuid) -> StoreResult<bool>;
    async fn group_ids(&self) -> StoreResult<HashSet<Uuid>>;
}

#[async_trait]
pub trait SetCatalog: Send + Sync {
    async fn list_sets(&self) -> StoreResult<Vec<Set>>;
    async fn get_set(&self, id: Uuid) -> StoreResult<Option<Set>>;
    /// Inserts the set and its products in one transaction.
    async fn create_set(&self, set: NewSet, products: &[ProductDraft]) -> StoreResult<Set>;
    /// Applies the patch and, when given, the availability in one write, iff the row is
    /// still at `expected_version`.
    async fn update_set_fields(
        &self,
        id: Uuid,
        expected_version: i64,
        patch: &SetPatch,
        availability: Option<&Availability>,
    ) -> StoreResult<bool>;
    /// Writes the availability iff the row is still at `expected_version`.
    async fn write_availability(
        &self,
        id: Uuid,
        expected_version: i64,
        availability: &Availability,
    ) -> StoreResult<bool>;
    /// Deletes the set and its products. Returns `false` when no such set existed.
    async fn delete_set(&self, id: Uuid) -> StoreResult<bool>;
    async fn list_products(&self, set_id: Uuid) -> StoreResult<Vec<Product>>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn create_user(&self, username: &str, role: Role, refs: &[Uuid]) -> StoreResult<User>;
    /// Writes the role and/or the assignment list in one write, iff the row is still at
    /// `expected_version`.
    async fn update_profile(
        &self,
        id: Uuid,
        expected_version: i64,
        role: Option<Role>,
        refs: Option<&[AssignmentRef]>,
    ) -> StoreResult<bool>;
    /// Writes the assignment list iff the row is still at `expected_version`.
    async fn write_assignments(
        &self,
        id: Uuid,
        expected_version: i64,
        refs: &[AssignmentRef],
    ) -> StoreResult<bool>;
    async fn delete_user(&self, id: Uuid) -> StoreResult<bool>;
    /// Resolves a bearer token to the user of its session.
    async fn user_for_token(&self, token: &str) -> StoreResult<Option<User>>;
}

/// Simple name tables referenced by sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Manufacturers,
    Categories,
    SetNames,
}

impl Lookup {
    pub fn table(&self) -> &'static str {
        match self {
            Lookup::Manufacturers => "manufacturers",
            Lookup::Categories => "categories",
            Lookup::SetNames => "set_names",
        }
    }

    pub fn entity(&self) -> &'static str {
        match self {
            Lookup::Manufacturers => "manufacturer",
            Lookup::Categories => "category",
            Lookup::SetNames => "set name",
        }
    }
}

#[async_trait]
pub trait LookupStore: Send + Sync {
    async fn list_entries(&self, lookup: Lookup) -> StoreResult<Vec<NamedEntry>>;
    async fn create_entry(&self, lookup: Lookup, name: &str) -> StoreResult<NamedEntry>;
    async fn rename_entry(&self, lookup: Lookup, id: Uuid, name: &str) -> StoreResult<NamedEntry>;
}

#[cfg(test)]
mod tests {
    use super::name_key;

    #[test]
    fn name_key_ignores_case_and_whitespace() {
        assert_eq!(name_key("Lehrer Technik"), name_key("  lehrer-technik".replace('-', " ").as_str()));
        assert_eq!(name_key("Lehrer\tTechnik"), "lehrertechnik");
        assert_ne!(name_key("Lehrer-Technik"), name_key("LehrerTechnik"));
    }
}
