//! Error types for cypherform
//!
//! Every failure in the toolkit is raised synchronously at the point of
//! violation. Nothing here is retried or swallowed internally.

use thiserror::Error;

/// The main error type for cypherform operations
#[derive(Error, Debug)]
pub enum Error {
    // ========== Structural Errors ==========
    #[error("Can't reset immutable attribute '{attribute}' on {owner} object.")]
    ImmutableAttribute { attribute: String, owner: String },

    #[error("Incomplete relationship: {0}")]
    IncompleteRelationship(String),

    #[error("Relationship '{var}' has no {endpoint} node")]
    DetachedRelationship { var: String, endpoint: String },

    #[error("Can't {action} {object} object when not attached to any graph instance.")]
    DetachedObject { action: String, object: String },

    #[error("Unbounded {action} on {object} object. {hint}")]
    UnboundedWrite {
        action: String,
        object: String,
        hint: String,
    },

    // ========== Property Errors ==========
    #[error("Cannot coerce {value} to {expected}")]
    TypeCoercion { value: String, expected: String },

    #[error("Duplicate property found: '{0}'")]
    DuplicateProperty(String),

    #[error("Unknown property: '{0}'")]
    UnknownProperty(String),

    // ========== Query Errors ==========
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid relation: {0}")]
    InvalidRelation(String),

    // ========== Validation Errors ==========
    #[error("Validation error: {0}")]
    Validation(String),

    // ========== Execution Errors ==========
    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // ========== Configuration Errors ==========
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ========== Internal Errors ==========
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for cypherform operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for an immutability violation
    pub fn immutable(attribute: impl Into<String>, owner: impl Into<String>) -> Self {
        Error::ImmutableAttribute {
            attribute: attribute.into(),
            owner: owner.into(),
        }
    }

    /// Shorthand for a detached-object error
    pub fn detached(action: impl Into<String>, object: impl Into<String>) -> Self {
        Error::DetachedObject {
            action: action.into(),
            object: object.into(),
        }
    }

    /// Returns true if this error is an attempt to reset a set-once attribute
    pub fn is_immutability(&self) -> bool {
        matches!(self, Error::ImmutableAttribute { .. })
    }

    /// Returns true if this error signals a query built incorrectly
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Error::IncompleteRelationship(_)
                | Error::DetachedRelationship { .. }
                | Error::DetachedObject { .. }
                | Error::InvalidPattern(_)
                | Error::InvalidQuery(_)
        )
    }

    /// Returns true if this error is the full-label write guard
    pub fn is_unbounded_write(&self) -> bool {
        matches!(self, Error::UnboundedWrite { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::immutable("name", "Property");
        assert_eq!(
            err.to_string(),
            "Can't reset immutable attribute 'name' on Property object."
        );

        let err = Error::detached("create", "Customer");
        assert_eq!(
            err.to_string(),
            "Can't create Customer object when not attached to any graph instance."
        );
    }

    #[test]
    fn test_error_structural() {
        assert!(Error::IncompleteRelationship("r1".to_string()).is_structural());
        assert!(Error::InvalidPattern("x".to_string()).is_structural());
        let err = Error::DetachedRelationship {
            var: "rel".to_string(),
            endpoint: "end".to_string(),
        };
        assert!(err.is_structural());
        assert_eq!(err.to_string(), "Relationship 'rel' has no end node");
        assert!(!Error::DuplicateProperty("name".to_string()).is_structural());
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::immutable("type", "Node").is_immutability());
        assert!(
            Error::UnboundedWrite {
                action: "delete".to_string(),
                object: "Order".to_string(),
                hint: String::new(),
            }
            .is_unbounded_write()
        );
        assert!(!Error::Internal("x".to_string()).is_unbounded_write());
    }
}
