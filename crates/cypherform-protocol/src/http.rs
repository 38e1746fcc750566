//! Transactional HTTP endpoint payloads
//!
//! Request: `{"statements":[{"statement": ..., "parameters": {...}}]}`.
//! Response: `{"results":[{"columns": [...], "data":[{"row": [...]}]}],
//! "errors":[{"code": ..., "message": ...}]}`.

use crate::message::{QueryResult, Record, Request};
use cypherform_core::{Error, PropertyValue, Result};
use serde::{Deserialize, Serialize};

/// HTTP API endpoint paths
pub mod endpoints {
    pub const TRANSACTION: &str = "/db/data/transaction";
    pub const TRANSACTION_COMMIT: &str = "/db/data/transaction/commit";
}

/// Body posted to the transactional endpoint
#[derive(Debug, Clone, Serialize)]
pub struct TransactionalRequest<'a> {
    pub statements: Vec<&'a Request>,
}

impl<'a> TransactionalRequest<'a> {
    pub fn single(request: &'a Request) -> Self {
        Self {
            statements: vec![request],
        }
    }

    pub fn batch<I: IntoIterator<Item = &'a Request>>(requests: I) -> Self {
        Self {
            statements: requests.into_iter().collect(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// One statement's result in a transactional response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatementResult {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub data: Vec<RowData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RowData {
    pub row: Vec<PropertyValue>,
}

impl From<StatementResult> for QueryResult {
    fn from(result: StatementResult) -> Self {
        QueryResult::new(
            result.columns,
            result.data.into_iter().map(|d| d.row).collect(),
        )
    }
}

/// Error entry in a transactional response
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    /// Error code
    pub code: String,

    /// Human-readable message
    pub message: String,
}

/// Body returned by the transactional endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionalResponse {
    #[serde(default)]
    pub results: Vec<StatementResult>,
    #[serde(default)]
    pub errors: Vec<ErrorResponse>,
}

impl TransactionalResponse {
    pub fn from_json(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Check if the server reported any error
    pub fn is_error(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Records of every statement, or the first reported error
    pub fn into_results(self) -> Result<Vec<QueryResult>> {
        if let Some(err) = self.errors.into_iter().next() {
            return Err(Error::Execution(format!("{}: {}", err.code, err.message)));
        }
        Ok(self.results.into_iter().map(QueryResult::from).collect())
    }

    /// Records of a single-statement request
    pub fn into_records(self) -> Result<Vec<Record>> {
        Ok(self
            .into_results()?
            .into_iter()
            .next()
            .map(|result| result.records())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cypherform_core::Parameters;

    #[test]
    fn test_request_payload() {
        let params: Parameters = [("n_name", "Alice")].into_iter().collect();
        let req = Request::new("MATCH (n:`Person`)\n    WHERE n.name = {n_name}", params);
        let payload: serde_json::Value =
            serde_json::from_str(&req.to_http_payload().unwrap()).unwrap();
        assert_eq!(
            payload,
            serde_json::json!({
                "statements": [{
                    "statement": "MATCH (n:`Person`)\n    WHERE n.name = {n_name}",
                    "parameters": {"n_name": "Alice"}
                }]
            })
        );
    }

    #[test]
    fn test_batch_payload() {
        let a = Request::query("CALL db.labels()");
        let b = Request::query("CALL db.indexes()");
        let json = TransactionalRequest::batch([&a, &b]).to_json().unwrap();
        assert!(json.contains("db.labels"));
        assert!(json.contains("db.indexes"));
    }

    #[test]
    fn test_response_records() {
        let body = r#"{
            "results": [{"columns": ["label"], "data": [{"row": ["Person"]}, {"row": ["User"]}]}],
            "errors": []
        }"#;
        let records = TransactionalResponse::from_json(body)
            .unwrap()
            .into_records()
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["label"], PropertyValue::from("User"));
    }

    #[test]
    fn test_response_error() {
        let body = r#"{"results": [], "errors": [{"code": "Neo.ClientError.Statement.SyntaxError", "message": "bad"}]}"#;
        let response = TransactionalResponse::from_json(body).unwrap();
        assert!(response.is_error());
        let err = response.into_records().unwrap_err();
        assert!(matches!(err, Error::Execution(_)));
    }

    #[test]
    fn test_malformed_response() {
        let err = TransactionalResponse::from_json("{not json").unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
