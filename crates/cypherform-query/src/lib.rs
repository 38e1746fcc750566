//! cypherform query compiler
//!
//! Compiles entities and expressions into parameterized Cypher.
//!
//! # Overview
//!
//! The compiler implements:
//! - CREATE / CREATE UNIQUE / MATCH / OPTIONAL MATCH / MERGE statements
//! - Relationship legs chained off a primary pattern
//! - WHERE / SET / ON CREATE / ON MATCH / REMOVE / DELETE / WITH / RETURN /
//!   ORDER BY / SKIP / LIMIT clauses in a fixed order
//! - Sequencing and UNION combinators over a shared parameter table

pub mod query;
pub mod statement;

pub use query::{CompiledQuery, Query};
pub use statement::{Clause, Projection, SetScope, Statement, Verb};
