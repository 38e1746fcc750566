//! Protocol message types

use cypherform_core::{Parameters, PropertyValue, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One result row keyed by column name
pub type Record = HashMap<String, PropertyValue>;

/// A statement and its parameters, ready for an executor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    pub statement: String,
    pub parameters: Parameters,
}

impl Request {
    /// Create a request with parameters
    pub fn new(statement: impl Into<String>, parameters: Parameters) -> Self {
        Self {
            statement: statement.into(),
            parameters,
        }
    }

    /// Create a request without parameters
    pub fn query(statement: impl Into<String>) -> Self {
        Self::new(statement, Parameters::new())
    }

    /// True if the statement only reads
    pub fn is_read_only(&self) -> bool {
        const WRITES: [&str; 6] = ["CREATE", "MERGE", "SET", "DELETE", "REMOVE", "DROP"];
        !self
            .statement
            .split_whitespace()
            .any(|word| WRITES.contains(&word))
    }

    /// Body for the transactional HTTP endpoint
    pub fn to_http_payload(&self) -> Result<String> {
        crate::http::TransactionalRequest::single(self).to_json()
    }
}

/// Column-oriented query result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names
    pub columns: Vec<String>,

    /// Rows of data
    pub rows: Vec<Vec<PropertyValue>>,
}

impl QueryResult {
    /// Create an empty result
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a result with columns and rows
    pub fn new(columns: Vec<String>, rows: Vec<Vec<PropertyValue>>) -> Self {
        Self { columns, rows }
    }

    /// Get row count
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Rows keyed by column name
    pub fn records(&self) -> Vec<Record> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_creation() {
        let req = Request::query("MATCH (n) RETURN n");
        assert!(req.is_read_only());
        assert!(req.parameters.is_empty());

        let req = Request::query("MATCH (n)\n    DETACH DELETE n");
        assert!(!req.is_read_only());
    }

    #[test]
    fn test_request_json() {
        let params: Parameters = [("node_name", "Frank")].into_iter().collect();
        let req = Request::new("CREATE (node:`User`)\n    SET node.name = {node_name}", params);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["parameters"]["node_name"], "Frank");
    }

    #[test]
    fn test_query_result_records() {
        let result = QueryResult::new(
            vec!["name".to_string(), "age".to_string()],
            vec![vec![PropertyValue::from("Alice"), PropertyValue::Integer(29)]],
        );

        assert_eq!(result.row_count(), 1);
        let records = result.records();
        assert_eq!(records[0]["name"], PropertyValue::from("Alice"));
        assert_eq!(records[0]["age"], PropertyValue::Integer(29));
        assert!(QueryResult::empty().records().is_empty());
    }
}
