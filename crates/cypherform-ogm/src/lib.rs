//! cypherform object-graph mapping
//!
//! Maps application objects onto graph nodes and compiles their writes
//! into Cypher run through a [`cypherform_graph::Graph`].
//!
//! # Modules
//!
//! - **model**: model descriptors built with `ModelBuilder`
//! - **object**: mapped instances with change tracking and write guards
//! - **relation**: typed relations between mapped instances and their backrefs

pub mod model;
pub mod object;
pub mod relation;

pub use model::{Model, ModelBuilder};
pub use object::{Change, Object};
pub use relation::{Cardinality, Direction, Relation};
