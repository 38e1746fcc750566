//! cypherform protocol types
//!
//! Defines what the compiler hands to an execution collaborator.
//!
//! # Modules
//!
//! - **message**: requests, records and column-oriented results
//! - **executor**: the `Executor` trait implemented by transports
//! - **http**: the transactional HTTP endpoint payloads

pub mod executor;
pub mod http;
pub mod message;

pub use executor::Executor;
pub use http::{TransactionalRequest, TransactionalResponse};
pub use message::{QueryResult, Record, Request};
