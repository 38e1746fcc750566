//! Execution collaborator seam

use crate::message::{Record, Request};
use cypherform_core::Result;
use std::sync::Arc;

/// Runs compiled statements against a graph database
///
/// The compiler never parses results beyond the records returned here;
/// transport, sessions and transactions belong to the implementor.
pub trait Executor: Send + Sync {
    fn run(&self, request: &Request) -> Result<Vec<Record>>;
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn run(&self, request: &Request) -> Result<Vec<Record>> {
        (**self).run(request)
    }
}

impl<E: Executor + ?Sized> Executor for Box<E> {
    fn run(&self, request: &Request) -> Result<Vec<Record>> {
        (**self).run(request)
    }
}
