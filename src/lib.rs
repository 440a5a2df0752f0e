//! NyayaSetu case core
//!
//! Backend for government relief-case management: victims file cases against
//! an FIR, officers review them, and approved relief is released in three
//! verified phases (25% / 25% / 50%) with the victim confirming each bank
//! transfer by its transaction reference. Grievance tickets, an
//! officer/victim query channel, and document uploads ride alongside.
//!
//! Layering: `domain` holds the pure transition logic over the `Case`
//! aggregate, `store` is the persistence seam (Postgres or in-memory),
//! `service` runs authorization and read-modify-write cycles, and `api`
//! exposes the HTTP surface.

pub mod api;
pub mod auth;
pub mod blob_store;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod model;
pub mod notify;
pub mod service;
pub mod store;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::{AppError, AppResult};
