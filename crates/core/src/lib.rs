//! Domain types shared by every mediatag crate.
//!
//! This crate has no internal dependencies. It defines the recognition status
//! model, queue message shapes, batching and idempotency rules, request DTOs,
//! and the port traits that the `db` and `cloud` crates implement.

pub mod batching;
pub mod error;
pub mod idempotency;
pub mod media;
pub mod message;
pub mod ports;
pub mod requests;
pub mod status;
pub mod types;
pub mod validation;
pub mod vision;
