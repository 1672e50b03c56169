//! # MedPortal Core
//!
//! Domain types and rules shared by the database and API crates.
//!
//! - [`scheduling`] decides whether a doctor's slot is free.
//! - [`cancellation`] enforces the notice period for cancellations.
//! - [`models`] holds the request/response and entity types.
//!
//! Nothing in this crate touches the database or the network, so the rules
//! can be tested with plain values.

pub mod cancellation;
pub mod errors;
pub mod models;
pub mod scheduling;
