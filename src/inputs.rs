//! Built-in argument types for the [request parser](crate::reqparse).
//!
//! Each function returns an [`ArgType`]: a coercion from the raw request
//! value (a JSON value, or a string for query, form and header values) to the
//! value stored in the parse result. The argument name is passed along so
//! messages can mention it.
//!
//! ```rust
//! use astor_restful::inputs;
//! use astor_restful::reqparse::Argument;
//!
//! let page = Argument::new("page").arg_type(inputs::positive()).default(1);
//! let size = Argument::new("size").arg_type(inputs::int_range(1, 100));
//! let custom = Argument::new("tag").arg_type(inputs::ArgType::custom(|value, _name| {
//!     Ok(value.as_str().unwrap_or_default().to_uppercase().into())
//! }));
//! # let _ = (page, size, custom);
//! ```

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use regex::Regex;
use serde_json::{Number, Value};
use thiserror::Error;

/// Why a value could not be coerced. The message is shown to the client.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct InputError(String);

impl InputError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

type CoerceFn = dyn Fn(Value, &str) -> Result<Value, InputError> + Send + Sync;

/// A named coercion from raw request value to parsed value.
#[derive(Clone)]
pub struct ArgType {
    name: &'static str,
    coerce: Arc<CoerceFn>,
}

impl ArgType {
    /// Wraps a closure `(value, argument_name) -> Result<Value, InputError>`.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(Value, &str) -> Result<Value, InputError> + Send + Sync + 'static,
    {
        Self::named("custom", f)
    }

    fn named<F>(name: &'static str, f: F) -> Self
    where
        F: Fn(Value, &str) -> Result<Value, InputError> + Send + Sync + 'static,
    {
        Self { name, coerce: Arc::new(f) }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn coerce(&self, value: Value, argument: &str) -> Result<Value, InputError> {
        (self.coerce)(value, argument)
    }
}

impl fmt::Debug for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ArgType").field(&self.name).finish()
    }
}

/// Text of a scalar value, as it would appear in a query string.
fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Any scalar, converted to its string form.
pub fn string() -> ArgType {
    ArgType::named("string", |value, _| match value {
        Value::Array(_) | Value::Object(_) => Err(InputError::new("Expected a string value")),
        other => Ok(Value::String(text(&other))),
    })
}

/// A whole number.
pub fn integer() -> ArgType {
    ArgType::named("integer", |value, _| {
        parse_i64(&value)
            .map(Value::from)
            .ok_or_else(|| InputError::new(format!("Invalid integer: '{}'", text(&value))))
    })
}

/// A finite floating-point number.
pub fn float() -> ArgType {
    ArgType::named("float", |value, _| {
        let parsed = match &value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| InputError::new(format!("Invalid float: '{}'", text(&value))))
    })
}

/// `true`/`false`, `1`/`0`, `yes`/`no`, `on`/`off`, case-insensitive.
pub fn boolean() -> ArgType {
    ArgType::named("boolean", |value, _| {
        let parsed = match &value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => match n.as_i64() {
                Some(1) => Some(true),
                Some(0) => Some(false),
                _ => None,
            },
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Some(true),
                "false" | "0" | "no" | "off" => Some(false),
                _ => None,
            },
            _ => None,
        };
        parsed
            .map(Value::Bool)
            .ok_or_else(|| InputError::new(format!("Invalid literal for boolean(): {}", text(&value))))
    })
}

/// An integer `>= 0`.
pub fn natural() -> ArgType {
    ArgType::named("natural", |value, name| match parse_i64(&value) {
        Some(n) if n >= 0 => Ok(Value::from(n)),
        _ => Err(InputError::new(format!(
            "Invalid {name}: {}. {name} must be a non-negative integer",
            text(&value)
        ))),
    })
}

/// An integer `>= 1`.
pub fn positive() -> ArgType {
    ArgType::named("positive", |value, name| match parse_i64(&value) {
        Some(n) if n >= 1 => Ok(Value::from(n)),
        _ => Err(InputError::new(format!(
            "Invalid {name}: {}. {name} must be a positive integer",
            text(&value)
        ))),
    })
}

/// An integer within `low..=high`.
pub fn int_range(low: i64, high: i64) -> ArgType {
    ArgType::named("int_range", move |value, name| match parse_i64(&value) {
        Some(n) if (low..=high).contains(&n) => Ok(Value::from(n)),
        _ => Err(InputError::new(format!(
            "Invalid {name}: {}. {name} must be within the range {low} - {high}",
            text(&value)
        ))),
    })
}

/// A string matching `pattern`. The pattern is compiled once, here.
pub fn regex(pattern: &str) -> Result<ArgType, regex::Error> {
    let re = Regex::new(pattern)?;
    Ok(ArgType::named("regex", move |value, _| {
        let s = text(&value);
        if re.is_match(&s) {
            Ok(Value::String(s))
        } else {
            Err(InputError::new(format!("Value does not match pattern: '{}'", re.as_str())))
        }
    }))
}

/// An ISO-8601 calendar date (`2024-02-29`), normalized to `YYYY-MM-DD`.
pub fn date() -> ArgType {
    ArgType::named("date", |value, _| {
        let s = text(&value);
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
            .map_err(|_| InputError::new(format!("Invalid date literal '{s}'")))
    })
}

/// An RFC 3339 / ISO-8601 timestamp with offset, normalized to UTC.
pub fn datetime_iso8601() -> ArgType {
    ArgType::named("datetime_iso8601", |value, _| {
        let s = text(&value);
        DateTime::parse_from_rfc3339(s.trim())
            .map(|dt| {
                Value::String(dt.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::AutoSi, true))
            })
            .map_err(|_| InputError::new(format!("Invalid ISO-8601 datetime: '{s}'")))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ok(t: &ArgType, v: Value) -> Value {
        t.coerce(v, "arg").unwrap()
    }

    fn err(t: &ArgType, v: Value) -> String {
        t.coerce(v, "arg").unwrap_err().to_string()
    }

    #[test]
    fn integer_accepts_strings_and_whole_numbers() {
        let t = integer();
        assert_eq!(ok(&t, json!("42")), json!(42));
        assert_eq!(ok(&t, json!(-3)), json!(-3));
        assert_eq!(ok(&t, json!(5.0)), json!(5));
        assert_eq!(err(&t, json!("4.5")), "Invalid integer: '4.5'");
        assert_eq!(err(&t, json!(true)), "Invalid integer: 'true'");
    }

    #[test]
    fn float_parses_numbers() {
        assert_eq!(ok(&float(), json!("2.5")), json!(2.5));
        assert!(float().coerce(json!("NaN"), "x").is_err());
    }

    #[test]
    fn boolean_literals() {
        let t = boolean();
        for truthy in ["true", "On", "1", "YES"] {
            assert_eq!(ok(&t, json!(truthy)), json!(true));
        }
        assert_eq!(ok(&t, json!(0)), json!(false));
        assert!(t.coerce(json!("maybe"), "x").is_err());
    }

    #[test]
    fn natural_positive_and_ranges_name_the_argument() {
        assert_eq!(ok(&natural(), json!("0")), json!(0));
        assert_eq!(
            positive().coerce(json!("0"), "page").unwrap_err().to_string(),
            "Invalid page: 0. page must be a positive integer"
        );
        let size = int_range(1, 10);
        assert_eq!(ok(&size, json!("10")), json!(10));
        assert_eq!(
            size.coerce(json!("11"), "size").unwrap_err().to_string(),
            "Invalid size: 11. size must be within the range 1 - 10"
        );
    }

    #[test]
    fn regex_matches_whole_pattern() {
        let t = regex(r"^[a-z]+$").unwrap();
        assert_eq!(ok(&t, json!("abc")), json!("abc"));
        assert_eq!(err(&t, json!("ABC")), "Value does not match pattern: '^[a-z]+$'");
        assert!(regex("(").is_err());
    }

    #[test]
    fn dates_normalize() {
        assert_eq!(ok(&date(), json!("2024-02-29")), json!("2024-02-29"));
        assert!(date().coerce(json!("2023-02-29"), "d").is_err());
        assert_eq!(
            ok(&datetime_iso8601(), json!("2024-01-01T10:00:00+02:00")),
            json!("2024-01-01T08:00:00Z")
        );
    }

    #[test]
    fn string_rejects_containers() {
        assert_eq!(ok(&string(), json!(12)), json!("12"));
        assert!(string().coerce(json!([1]), "x").is_err());
    }
}
