//! Domain layer for specforge
//!
//! Models for the contract-first generation pipeline, the port traits its
//! collaborators implement, and domain errors. Nothing here performs I/O.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
