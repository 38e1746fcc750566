//! In-memory executor
//!
//! Records every request and replays canned records keyed by statement
//! text. Statements without a canned response return no records.

use cypherform_core::{Error, PropertyValue, Result};
use cypherform_protocol::{Executor, Record, Request};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct MemoryExecutor {
    requests: Mutex<Vec<Request>>,
    responses: Mutex<HashMap<String, Vec<Record>>>,
    failures: Mutex<HashMap<String, String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| Error::Internal("memory executor lock poisoned".to_string()))
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `statement` with `records` from now on
    pub fn respond(&self, statement: impl Into<String>, records: Vec<Record>) -> Result<()> {
        lock(&self.responses)?.insert(statement.into(), records);
        Ok(())
    }

    /// Fail `statement` with an execution error from now on
    pub fn fail(&self, statement: impl Into<String>, message: impl Into<String>) -> Result<()> {
        lock(&self.failures)?.insert(statement.into(), message.into());
        Ok(())
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<Request> {
        lock(&self.requests).map(|r| r.clone()).unwrap_or_default()
    }

    /// Statement texts received so far, oldest first
    pub fn statements(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|request| request.statement)
            .collect()
    }

    /// Most recent request
    pub fn last(&self) -> Option<Request> {
        lock(&self.requests).ok()?.last().cloned()
    }

    /// Forget received requests, keeping canned responses
    pub fn clear(&self) -> Result<()> {
        lock(&self.requests)?.clear();
        Ok(())
    }
}

impl Executor for MemoryExecutor {
    fn run(&self, request: &Request) -> Result<Vec<Record>> {
        lock(&self.requests)?.push(request.clone());

        if let Some(message) = lock(&self.failures)?.get(&request.statement) {
            return Err(Error::Execution(message.clone()));
        }
        Ok(lock(&self.responses)?
            .get(&request.statement)
            .cloned()
            .unwrap_or_default())
    }
}

/// Build a record from column/value pairs
pub fn record<I, K, V>(pairs: I) -> Record
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<PropertyValue>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
