//! Graph facade over an executor

use crate::config::GraphConfig;
use crate::log::QueryLog;
use crate::schema::{Schema, SchemaStatement};
use cypherform_core::{Error, Node, Result};
use cypherform_protocol::{Executor, Record, Request};
use cypherform_query::Query;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

/// A graph reached through an executor
///
/// Every request is logged before it runs. The schema registry and the
/// query log are shared between threads.
pub struct Graph {
    /// Graph configuration
    config: GraphConfig,

    /// Execution collaborator
    executor: Arc<dyn Executor>,

    /// Schema registered through this graph
    schema: RwLock<Schema>,

    /// Most recent requests
    log: Mutex<QueryLog>,
}

impl Graph {
    /// Create a graph with the default configuration
    pub fn new<E: Executor + 'static>(executor: E) -> Self {
        Self::with_config(executor, GraphConfig::default())
    }

    pub fn with_config<E: Executor + 'static>(executor: E, config: GraphConfig) -> Self {
        info!("Opening graph {}", config.name);
        Self {
            schema: RwLock::new(Schema::new(config.reflect_schema)),
            log: Mutex::new(QueryLog::new(config.log_capacity)),
            executor: Arc::new(executor),
            config,
        }
    }

    /// Get the graph name
    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn executor(&self) -> &Arc<dyn Executor> {
        &self.executor
    }

    fn log_guard(&self) -> Result<MutexGuard<'_, QueryLog>> {
        self.log
            .lock()
            .map_err(|_| Error::Internal("query log lock poisoned".to_string()))
    }

    fn schema_read(&self) -> Result<RwLockReadGuard<'_, Schema>> {
        self.schema
            .read()
            .map_err(|_| Error::Internal("schema lock poisoned".to_string()))
    }

    fn schema_write(&self) -> Result<RwLockWriteGuard<'_, Schema>> {
        self.schema
            .write()
            .map_err(|_| Error::Internal("schema lock poisoned".to_string()))
    }

    // ========== Execution ==========

    /// Log and run a request
    pub fn execute(&self, request: &Request) -> Result<Vec<Record>> {
        if self.config.log_parameters {
            debug!(
                "Running on graph {}: {} with {:?}",
                self.config.name, request.statement, request.parameters
            );
        } else {
            debug!("Running on graph {}: {}", self.config.name, request.statement);
        }
        self.log_guard()?.push(request.clone());
        self.executor.run(request)
    }

    /// Run a statement without parameters
    pub fn query(&self, statement: &str) -> Result<Vec<Record>> {
        self.execute(&Request::query(statement))
    }

    /// Compile and run a query
    pub fn run_query(&self, query: &Query) -> Result<Vec<Record>> {
        let compiled = query.compile()?;
        self.execute(&Request::new(
            compiled.statement.clone(),
            compiled.params.clone(),
        ))
    }

    /// Every node in the graph
    pub fn all(&self) -> Result<Vec<Record>> {
        self.query("MATCH (all) RETURN all")
    }

    /// Delete every node and relationship
    pub fn delete_all(&self) -> Result<()> {
        self.query("MATCH (all) DETACH DELETE all")?;
        info!("Deleted everything in graph {}", self.config.name);
        Ok(())
    }

    /// Snapshot of the query log, oldest first
    pub fn log(&self) -> Result<Vec<Request>> {
        Ok(self.log_guard()?.iter().cloned().collect())
    }

    pub fn clear_log(&self) -> Result<()> {
        self.log_guard()?.clear();
        Ok(())
    }

    // ========== Schema ==========

    /// Register the schema of `node`'s type
    pub fn add_schema(&self, node: &Node, overwrite: bool) -> Result<Vec<SchemaStatement>> {
        let mut schema = self.schema_write()?;
        schema.add(self, node, overwrite)
    }

    /// Registered schema statements
    pub fn schema_ls(&self) -> Result<Vec<SchemaStatement>> {
        Ok(self.schema_read()?.ls().into_iter().cloned().collect())
    }

    /// Check if a label's schema is registered
    pub fn has_schema(&self, label: &str) -> Result<bool> {
        Ok(self.schema_read()?.contains(label))
    }

    /// Reflect live schema again on the next write
    pub fn refresh_schema(&self) -> Result<()> {
        self.schema_write()?.refresh();
        Ok(())
    }

    /// Drop every registered schema statement
    pub fn drop_schema(&self) -> Result<usize> {
        let mut schema = self.schema_write()?;
        schema.drop_all(self)
    }
}

impl Executor for Graph {
    fn run(&self, request: &Request) -> Result<Vec<Record>> {
        self.execute(request)
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryExecutor, record};
    use cypherform_core::{GraphObject, Property, PropertyValue};

    fn graph() -> (Arc<MemoryExecutor>, Graph) {
        let executor = Arc::new(MemoryExecutor::new());
        let graph = Graph::with_config(executor.clone(), GraphConfig::for_testing());
        (executor, graph)
    }

    #[test]
    fn test_run_query() {
        let (executor, graph) = graph();
        let mut node = Node::builder(["User"])
            .property("name", Property::new())
            .build()
            .unwrap();
        node.set("name", "Frank".into()).unwrap();

        graph.run_query(&Query::create(&node).unwrap()).unwrap();
        let request = executor.last().unwrap();
        assert_eq!(
            request.statement,
            "CREATE (node:`User`)\n    SET node.name = {node_name}"
        );
        assert_eq!(
            request.parameters.get("node_name"),
            Some(&PropertyValue::from("Frank"))
        );
    }

    #[test]
    fn test_query_log() {
        let executor = Arc::new(MemoryExecutor::new());
        let graph = Graph::with_config(executor, GraphConfig::for_testing().log_capacity(2));
        graph.query("RETURN 1").unwrap();
        graph.all().unwrap();
        graph.delete_all().unwrap();

        let log = graph.log().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].statement, "MATCH (all) RETURN all");
        assert_eq!(log[1].statement, "MATCH (all) DETACH DELETE all");

        graph.clear_log().unwrap();
        assert!(graph.log().unwrap().is_empty());
    }

    #[test]
    fn test_failed_request_is_logged() {
        let (executor, graph) = graph();
        executor.fail("RETURN 1", "boom").unwrap();
        assert!(graph.query("RETURN 1").is_err());
        assert_eq!(graph.log().unwrap().len(), 1);
    }

    #[test]
    fn test_records_returned() {
        let (executor, graph) = graph();
        executor
            .respond("MATCH (all) RETURN all", vec![record([("all", 1)])])
            .unwrap();
        let records = graph.all().unwrap();
        assert_eq!(records[0]["all"], PropertyValue::Integer(1));
    }

    #[test]
    fn test_schema_through_graph() {
        let (executor, graph) = graph();
        let node = Node::builder(["Person"])
            .property("email", Property::builder().unique().build().unwrap())
            .build()
            .unwrap();

        let created = graph.add_schema(&node, false).unwrap();
        assert_eq!(created.len(), 1);
        assert!(graph.has_schema("Person").unwrap());
        assert_eq!(graph.schema_ls().unwrap().len(), 1);
        assert_eq!(
            executor.last().unwrap().statement,
            "CREATE CONSTRAINT ON ( person:Person ) ASSERT person.email IS UNIQUE"
        );

        assert_eq!(graph.drop_schema().unwrap(), 1);
        assert!(!graph.has_schema("Person").unwrap());
    }
}
