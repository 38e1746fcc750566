//! Write-once fields
//!
//! Identity attributes (a property's name, a relationship's endpoints, ...)
//! may be assigned while empty and never again.

use crate::error::{Error, Result};

/// A field that accepts exactly one assignment
#[derive(Debug, Clone, PartialEq)]
pub struct SetOnce<T> {
    attribute: &'static str,
    value: Option<T>,
}

impl<T> SetOnce<T> {
    /// An empty field named `attribute` (used in error messages)
    pub const fn empty(attribute: &'static str) -> Self {
        Self {
            attribute,
            value: None,
        }
    }

    /// A field that is already set
    pub fn with(attribute: &'static str, value: T) -> Self {
        Self {
            attribute,
            value: Some(value),
        }
    }

    /// A field that is set when `value` is `Some`
    pub fn from_option(attribute: &'static str, value: Option<T>) -> Self {
        Self { attribute, value }
    }

    /// Assign the field; fails if it already holds a value
    pub fn set(&mut self, value: T, owner: &str) -> Result<()> {
        if self.value.is_some() {
            return Err(Error::immutable(self.attribute, owner));
        }
        self.value = Some(value);
        Ok(())
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    pub fn attribute(&self) -> &'static str {
        self.attribute
    }
}
