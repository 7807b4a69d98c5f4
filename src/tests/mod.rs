//! Integration and unit tests for the Ausleihe backend.
//!
//! - **support**: in-memory database fixtures and seeding helpers
//! - **engine_tests**: consistency engine scenarios, cascades and compare-and-swap retries
//! - **api_tests**: HTTP endpoints through the full router
//! - **error_tests**: error responses and conversions
//! - **config_tests**: layered configuration and validation
//! - **db_tests**: schema, legacy data and store constraints

pub mod support;
pub mod api_tests;
pub mod db_tests;
