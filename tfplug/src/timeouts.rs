//! `timeouts` nested attribute support
//!
//! Resources that wait on remote operations accept
//! `timeouts = { create = "1h", update = "30m", delete = "10m" }`. Values are
//! Go-style durations.

use crate::error::{Result, TfplugError};
use crate::schema::{Attribute, AttributeBuilder, AttributeType};
use crate::types::{AttributePath, DynamicValue};
use std::collections::HashMap;
use std::time::Duration;

pub const TIMEOUTS_ATTRIBUTE: &str = "timeouts";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

/// Schema attribute for the given operations
pub fn timeouts_attribute(operations: &[Operation]) -> Attribute {
    let fields = operations
        .iter()
        .map(|op| (op.as_str().to_string(), AttributeType::String))
        .collect::<HashMap<_, _>>();

    AttributeBuilder::new(TIMEOUTS_ATTRIBUTE, AttributeType::Object(fields))
        .description("Operation timeouts as duration strings, e.g. \"30m\" or \"1h30m\"")
        .optional()
        .build()
}

/// Timeout configured for `operation`, or `default` when unset
pub fn get_timeout(
    value: &DynamicValue,
    operation: Operation,
    default: Duration,
) -> Result<Duration> {
    let path = AttributePath::new(TIMEOUTS_ATTRIBUTE).attribute(operation.as_str());
    match value.get_optional_string(&path) {
        Some(raw) => parse_duration(&raw),
        None => Ok(default),
    }
}

/// Parse a Go duration string such as `"1h30m"`, `"45s"` or `"1.5h"`
pub fn parse_duration(input: &str) -> Result<Duration> {
    let invalid = || TfplugError::InvalidDuration(input.to_string());
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }
    if trimmed == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total = 0f64;
    let mut rest = trimmed;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        if number_len == 0 {
            return Err(invalid());
        }
        let number: f64 = rest[..number_len].parse().map_err(|_| invalid())?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let seconds_per_unit = match &rest[..unit_len] {
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            _ => return Err(invalid()),
        };
        total += number * seconds_per_unit;
        rest = &rest[unit_len..];
    }

    Ok(Duration::from_secs_f64(total))
}
