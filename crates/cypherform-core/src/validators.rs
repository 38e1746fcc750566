//! String validators backing the built-in property types
//!
//! Each validator returns the normalized form of its input or a
//! `TypeCoercion` error naming the rejected value.

use crate::error::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%y",
    "%m-%d-%y",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
    "%Y%m%d",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
    "%b %d, %Y %H:%M",
    "%b %d, %Y %I:%M %p",
    "%B %d, %Y %I:%M %p",
];

fn reject(value: &str, expected: &str) -> Error {
    Error::TypeCoercion {
        value: format!("{:?}", value),
        expected: expected.to_string(),
    }
}

/// Canonical lowercase hyphenated form of a UUID
pub fn valid_uuid(value: &str) -> Result<String> {
    uuid::Uuid::parse_str(value.trim())
        .map(|id| id.hyphenated().to_string())
        .map_err(|_| reject(value, "uuid"))
}

/// Parse a loosely formatted date into `YYYY-MM-DD`
pub fn isodate(value: &str) -> Result<String> {
    let trimmed = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .map(|date| date.format("%Y-%m-%d").to_string())
        .ok_or_else(|| reject(value, "isodate"))
}

/// Parse a loosely formatted timestamp into `YYYY-MM-DDTHH:MM:SS`
pub fn isodatetime(value: &str) -> Result<String> {
    let normalized = value
        .trim()
        .replace("a.m.", "AM")
        .replace("p.m.", "PM");

    if let Ok(stamp) = chrono::DateTime::parse_from_rfc3339(&normalized) {
        return Ok(stamp.naive_utc().format("%Y-%m-%dT%H:%M:%S").to_string());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&normalized, fmt).ok())
        .or_else(|| {
            // A bare date is midnight of that day
            isodate(&normalized)
                .ok()
                .and_then(|date| NaiveDate::parse_from_str(&date, "%Y-%m-%d").ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|stamp| stamp.format("%Y-%m-%dT%H:%M:%S").to_string())
        .ok_or_else(|| reject(value, "isodatetime"))
}

/// Accept strings of at most `max_len` characters
pub fn varchar(value: &str, max_len: usize) -> Result<String> {
    if value.chars().count() > max_len {
        return Err(reject(value, &format!("varchar({})", max_len)));
    }
    Ok(value.to_string())
}

pub fn ipv4(value: &str) -> Result<String> {
    value
        .trim()
        .parse::<Ipv4Addr>()
        .map(|_| value.trim().to_string())
        .map_err(|_| reject(value, "ipv4"))
}

pub fn ipv6(value: &str) -> Result<String> {
    value
        .trim()
        .parse::<Ipv6Addr>()
        .map(|_| value.trim().to_string())
        .map_err(|_| reject(value, "ipv6"))
}

pub fn ip(value: &str) -> Result<String> {
    value
        .trim()
        .parse::<IpAddr>()
        .map(|_| value.trim().to_string())
        .map_err(|_| reject(value, "ip"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid() {
        let id = valid_uuid("67E55044-10B1-426F-9247-BB680E5FE0C8").unwrap();
        assert_eq!(id, "67e55044-10b1-426f-9247-bb680e5fe0c8");
        assert!(valid_uuid("rutabaga").is_err());
    }

    #[test]
    fn test_isodate() {
        assert_eq!(isodate("3-24-85").unwrap(), "1985-03-24");
        assert_eq!(isodate("Mar 24, 1985").unwrap(), "1985-03-24");
        assert_eq!(isodate("1985-03-24").unwrap(), "1985-03-24");
        assert!(isodate("rutabaga").is_err());
    }

    #[test]
    fn test_isodatetime() {
        assert_eq!(
            isodatetime("Mar 24, 1985 10:50 p.m.").unwrap(),
            "1985-03-24T22:50:00"
        );
        assert_eq!(
            isodatetime("1985-03-24T22:50:00+00:00").unwrap(),
            "1985-03-24T22:50:00"
        );
        assert_eq!(isodatetime("1985-03-24").unwrap(), "1985-03-24T00:00:00");
        assert!(isodatetime("rutabaga").is_err());
    }

    #[test]
    fn test_varchar() {
        assert_eq!(varchar("abc", 3).unwrap(), "abc");
        let err = varchar("abcd", 3).unwrap_err();
        assert_eq!(err.to_string(), "Cannot coerce \"abcd\" to varchar(3)");
    }

    #[test]
    fn test_ip_addresses() {
        assert!(ipv4("0.0.0.0").is_ok());
        assert!(ipv4("123.456.789.000").is_err());
        assert!(ipv6("::FFFF:123:456:789:000").is_ok());
        assert!(ipv6("0.0.0.0").is_err());
        assert!(ip("0.0.0.0").is_ok());
        assert!(ip("::1").is_ok());
        assert!(ip("rutabaga").is_err());
    }
}
