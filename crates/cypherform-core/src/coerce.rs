//! Property type coercions
//!
//! A [`PropertyType`] is a named conversion applied to every non-null value
//! assigned to a property, and to every literal compared against it.

use crate::error::{Error, Result};
use crate::validators;
use crate::value::PropertyValue;
use std::fmt;
use std::sync::Arc;

type CoerceFn = dyn Fn(PropertyValue) -> Result<PropertyValue> + Send + Sync;

/// A named value coercion
#[derive(Clone)]
pub struct PropertyType {
    name: Arc<str>,
    coerce: Arc<CoerceFn>,
}

impl PropertyType {
    /// Build a coercion from a closure
    pub fn custom<F>(name: &str, coerce: F) -> Self
    where
        F: Fn(PropertyValue) -> Result<PropertyValue> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            coerce: Arc::new(coerce),
        }
    }

    /// Pass values through unchanged
    pub fn any() -> Self {
        Self::custom("any", Ok)
    }

    /// Stringify scalars
    pub fn string() -> Self {
        Self::custom("string", |value| match value {
            PropertyValue::String(_) | PropertyValue::Null => Ok(value),
            PropertyValue::Integer(i) => Ok(PropertyValue::String(i.to_string())),
            PropertyValue::Float(f) => Ok(PropertyValue::String(f.to_string())),
            PropertyValue::Boolean(b) => Ok(PropertyValue::String(b.to_string())),
            other => Err(mismatch(&other, "string")),
        })
    }

    /// Parse strings and truncate floats to integers
    pub fn integer() -> Self {
        Self::custom("integer", |value| match value {
            PropertyValue::Integer(_) | PropertyValue::Null => Ok(value),
            PropertyValue::Float(f) if f.is_finite() => Ok(PropertyValue::Integer(f.trunc() as i64)),
            PropertyValue::Boolean(b) => Ok(PropertyValue::Integer(i64::from(b))),
            PropertyValue::String(ref s) => s
                .trim()
                .parse::<i64>()
                .map(PropertyValue::Integer)
                .map_err(|_| mismatch(&value, "integer")),
            other => Err(mismatch(&other, "integer")),
        })
    }

    pub fn float() -> Self {
        Self::custom("float", |value| match value {
            PropertyValue::Float(_) | PropertyValue::Null => Ok(value),
            PropertyValue::Integer(i) => Ok(PropertyValue::Float(i as f64)),
            PropertyValue::Boolean(b) => Ok(PropertyValue::Float(if b { 1.0 } else { 0.0 })),
            PropertyValue::String(ref s) => s
                .trim()
                .parse::<f64>()
                .map(PropertyValue::Float)
                .map_err(|_| mismatch(&value, "float")),
            other => Err(mismatch(&other, "float")),
        })
    }

    pub fn boolean() -> Self {
        Self::custom("boolean", |value| match value {
            PropertyValue::Boolean(_) | PropertyValue::Null => Ok(value),
            PropertyValue::Integer(i) => Ok(PropertyValue::Boolean(i != 0)),
            PropertyValue::String(ref s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(PropertyValue::Boolean(true)),
                "false" | "0" | "no" => Ok(PropertyValue::Boolean(false)),
                _ => Err(mismatch(&value, "boolean")),
            },
            other => Err(mismatch(&other, "boolean")),
        })
    }

    /// Canonical hyphenated UUID string
    pub fn uuid() -> Self {
        Self::string_validator("uuid", validators::valid_uuid)
    }

    /// ISO-8601 date (`YYYY-MM-DD`)
    pub fn isodate() -> Self {
        Self::string_validator("isodate", validators::isodate)
    }

    /// ISO-8601 date and time (`YYYY-MM-DDTHH:MM:SS`)
    pub fn isodatetime() -> Self {
        Self::string_validator("isodatetime", validators::isodatetime)
    }

    /// String of at most `max_len` characters
    pub fn varchar(max_len: usize) -> Self {
        let name = format!("varchar({})", max_len);
        Self::custom(&name, move |value| match value {
            PropertyValue::Null => Ok(value),
            PropertyValue::String(s) => validators::varchar(&s, max_len).map(PropertyValue::String),
            other => Err(mismatch(&other, "string")),
        })
    }

    pub fn ipv4() -> Self {
        Self::string_validator("ipv4", validators::ipv4)
    }

    pub fn ipv6() -> Self {
        Self::string_validator("ipv6", validators::ipv6)
    }

    /// Either an IPv4 or an IPv6 address
    pub fn ip() -> Self {
        Self::string_validator("ip", validators::ip)
    }

    fn string_validator(name: &str, validate: fn(&str) -> Result<String>) -> Self {
        Self::custom(name, move |value| match value {
            PropertyValue::Null => Ok(value),
            PropertyValue::String(s) => validate(&s).map(PropertyValue::String),
            other => Err(mismatch(&other, "string")),
        })
    }

    /// Name shown in error messages
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Apply the coercion; null always passes through
    pub fn coerce(&self, value: PropertyValue) -> Result<PropertyValue> {
        if value.is_null() {
            return Ok(value);
        }
        (self.coerce)(value)
    }
}

impl Default for PropertyType {
    fn default() -> Self {
        Self::string()
    }
}

impl fmt::Debug for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PropertyType").field(&self.name).finish()
    }
}

fn mismatch(value: &PropertyValue, expected: &str) -> Error {
    Error::TypeCoercion {
        value: value.to_string(),
        expected: expected.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_string_coercion() {
        let kind = PropertyType::string();
        assert_eq!(kind.coerce(1i64.into()).unwrap(), PropertyValue::from("1"));
        assert_eq!(kind.coerce("x".into()).unwrap(), PropertyValue::from("x"));
        assert!(kind.coerce(vec![1i64].into()).is_err());
    }

    #[test]
    fn test_integer_coercion() {
        let kind = PropertyType::integer();
        assert_eq!(kind.coerce("29".into()).unwrap(), PropertyValue::Integer(29));
        assert_eq!(kind.coerce(29.9.into()).unwrap(), PropertyValue::Integer(29));
        let err = kind.coerce("rutabaga".into()).unwrap_err();
        assert_eq!(err.to_string(), "Cannot coerce \"rutabaga\" to integer");
    }

    #[test]
    fn test_null_passes_through() {
        for kind in [PropertyType::integer(), PropertyType::uuid(), PropertyType::boolean()] {
            assert!(kind.coerce(PropertyValue::Null).unwrap().is_null());
        }
    }

    #[test]
    fn test_custom_coercion() {
        let upper = PropertyType::custom("upper", |v| match v {
            PropertyValue::String(s) => Ok(PropertyValue::String(s.to_uppercase())),
            other => Ok(other),
        });
        assert_eq!(upper.name(), "upper");
        assert_eq!(upper.coerce("ny".into()).unwrap(), PropertyValue::from("NY"));
    }

    #[test]
    fn test_validator_types() {
        assert!(PropertyType::isodate().coerce("rutabaga".into()).is_err());
        assert_eq!(
            PropertyType::isodate().coerce("1987-07-12".into()).unwrap(),
            PropertyValue::from("1987-07-12")
        );
        assert!(PropertyType::uuid().coerce(5i64.into()).is_err());
        assert!(PropertyType::varchar(3).coerce("hello".into()).is_err());
    }

    proptest! {
        #[test]
        fn prop_integer_coercion_is_idempotent(n in any::<i64>()) {
            let kind = PropertyType::integer();
            let once = kind.coerce(PropertyValue::String(n.to_string())).unwrap();
            let twice = kind.coerce(once.clone()).unwrap();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_string_coercion_is_idempotent(s in ".*") {
            let kind = PropertyType::string();
            let once = kind.coerce(PropertyValue::String(s)).unwrap();
            prop_assert_eq!(kind.coerce(once.clone()).unwrap(), once);
        }
    }
}
