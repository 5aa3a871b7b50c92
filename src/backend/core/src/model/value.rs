//! Typed parameter values.
//!
//! Design note: request parameters are pinned to a closed, enumerated type
//! set rather than carried as an untyped JSON value. Coercion from the raw
//! request string happens once, at the Dispatcher boundary; everything
//! downstream works with [`TypedValue`].

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::GatewayError;

/// The fixed set of parameter types a `QueryParameter` may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ParamType {
    String,
    Integer,
    Long,
    Decimal,
    Boolean,
    Timestamp,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::String => "STRING",
            Self::Integer => "INTEGER",
            Self::Long => "LONG",
            Self::Decimal => "DECIMAL",
            Self::Boolean => "BOOLEAN",
            Self::Timestamp => "TIMESTAMP",
        };
        f.write_str(s)
    }
}

/// A value coerced to its declared [`ParamType`], or SQL NULL.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    String(String),
    Integer(i32),
    Long(i64),
    Decimal(BigDecimal),
    Boolean(bool),
    Timestamp(NaiveDateTime),
    Null,
}

impl TypedValue {
    /// Coerce a raw request string into the declared type.
    ///
    /// String→int parsing and decimal parsing fail with a message naming
    /// the offending raw value, matching the Dispatcher's coercion-failure
    /// contract (`BadRequest` with an explicit cause).
    pub fn coerce(raw: &str, param_type: ParamType) -> Result<Self, GatewayError> {
        match param_type {
            ParamType::String => Ok(Self::String(raw.to_string())),
            ParamType::Integer => raw
                .parse::<i32>()
                .map(Self::Integer)
                .map_err(|_| GatewayError::bad_request(format!("invalid INTEGER value: {raw}"))),
            ParamType::Long => raw
                .parse::<i64>()
                .map(Self::Long)
                .map_err(|_| GatewayError::bad_request(format!("invalid LONG value: {raw}"))),
            ParamType::Decimal => {
                if !raw.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '-')
                    || raw.matches('.').count() > 1
                {
                    return Err(GatewayError::bad_request(format!(
                        "invalid DECIMAL value: {raw}"
                    )));
                }
                BigDecimal::from_str(raw)
                    .map(Self::Decimal)
                    .map_err(|_| GatewayError::bad_request(format!("invalid DECIMAL value: {raw}")))
            }
            ParamType::Boolean => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(Self::Boolean(true)),
                "false" | "0" => Ok(Self::Boolean(false)),
                _ => Err(GatewayError::bad_request(format!(
                    "invalid BOOLEAN value: {raw}"
                ))),
            },
            ParamType::Timestamp => parse_timestamp(raw)
                .ok_or_else(|| GatewayError::bad_request(format!("invalid TIMESTAMP value: {raw}"))),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Accepts ISO-like forms: `YYYY-MM-DDTHH:MM:SS`, with or without
/// fractional seconds, and a plain `YYYY-MM-DD` date.
fn parse_timestamp(raw: &str) -> Option<TypedValue> {
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(TypedValue::Timestamp(dt));
        }
    }
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| TypedValue::Timestamp(d.and_hms_opt(0, 0, 0).unwrap()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerces_long_successfully() {
        let v = TypedValue::coerce("42", ParamType::Long).unwrap();
        assert_eq!(v, TypedValue::Long(42));
    }

    #[test]
    fn rejects_non_numeric_long() {
        let err = TypedValue::coerce("abc", ParamType::Long).unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::BadRequest);
    }

    #[test]
    fn decimal_accepts_single_point() {
        let v = TypedValue::coerce("12.50", ParamType::Decimal).unwrap();
        assert!(matches!(v, TypedValue::Decimal(_)));
    }

    #[test]
    fn decimal_rejects_two_points() {
        assert!(TypedValue::coerce("1.2.3", ParamType::Decimal).is_err());
    }

    #[test]
    fn boolean_accepts_true_false() {
        assert_eq!(
            TypedValue::coerce("true", ParamType::Boolean).unwrap(),
            TypedValue::Boolean(true)
        );
        assert_eq!(
            TypedValue::coerce("false", ParamType::Boolean).unwrap(),
            TypedValue::Boolean(false)
        );
    }

    #[test]
    fn timestamp_accepts_iso_form() {
        let v = TypedValue::coerce("2024-01-15T10:30:00", ParamType::Timestamp).unwrap();
        assert!(matches!(v, TypedValue::Timestamp(_)));
    }

    #[test]
    fn timestamp_rejects_garbage() {
        assert!(TypedValue::coerce("not-a-date", ParamType::Timestamp).is_err());
    }
}
