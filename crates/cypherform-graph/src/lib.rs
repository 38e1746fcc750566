//! cypherform graph layer
//!
//! Connects compiled queries to an execution collaborator.
//!
//! # Overview
//!
//! The graph layer provides:
//! - Schema statements derived from property flags, and a registry that
//!   reflects live schema before writing
//! - A bounded query log
//! - The `Graph` facade and its configuration
//! - An in-memory executor for tests and dry runs

pub mod config;
pub mod graph;
pub mod log;
pub mod memory;
pub mod schema;

pub use config::GraphConfig;
pub use graph::Graph;
pub use log::QueryLog;
pub use memory::MemoryExecutor;
pub use schema::{Schema, SchemaKind, SchemaStatement, node_schema, property_schema};
