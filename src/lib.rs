//! # Ausleihe Backend Library
//!
//! Access control for an equipment-lending catalog: which sets a user may see and book,
//! and how sets, users and assignment groups stay consistent while they are edited.
//!
//! ## Architecture
//!
//! - **Axum** for the REST API
//! - **SQLx** over SQLite for the stores
//! - **Tokio** as the async runtime
//! - **Serde** for JSON and the legacy reference forms
//!
//! ## Core Components
//!
//! - [`assignment`]: assignment references, their normalization and set availability
//! - [`resolver`]: pure access resolution and group membership queries
//! - [`consistency`]: the engine that mutates sets and users and cascades deletes
//! - [`set_copy`]: duplicating a set with its products
//! - [`store`]: store contracts and their SQLite implementation
//! - [`collation`]: German catalog ordering
//! - [`config`], [`db`], [`error`], [`metrics`], [`middleware`], [`routes`], [`state`]

pub mod assignment;
pub mod collation;
pub mod config;
pub mod consistency;
pub mod db;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod resolver;
pub mod routes;
pub mod session;
pub mod set_copy;
pub mod state;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;
