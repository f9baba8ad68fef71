//! Attribute validators run during config validation
//!
//! Null and unknown values are skipped by every validator here; required-ness is
//! enforced by the server, not by validators.

use crate::schema::{Validator, ValidatorRequest, ValidatorResponse};
use crate::types::{Diagnostic, Dynamic};

/// Accepts only strings from a fixed set
pub struct StringOneOf {
    values: Vec<String>,
}

impl StringOneOf {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn boxed<I, S>(values: I) -> Box<dyn Validator>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Box::new(Self::new(values))
    }
}

impl Validator for StringOneOf {
    fn description(&self) -> String {
        format!("value must be one of: {}", self.values.join(", "))
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = vec![];
        if let Dynamic::String(s) = &request.config_value {
            if !self.values.iter().any(|v| v == s) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("Invalid value for {}", request.path),
                        format!("{}, got: {:?}", self.description(), s),
                    )
                    .with_attribute(request.path),
                );
            }
        }
        ValidatorResponse { diagnostics }
    }
}

/// Accepts strings matching a regular expression
pub struct StringPattern {
    pattern: regex::Regex,
    description: String,
}

impl StringPattern {
    pub fn new(pattern: regex::Regex, description: impl Into<String>) -> Self {
        Self {
            pattern,
            description: description.into(),
        }
    }
}

impl Validator for StringPattern {
    fn description(&self) -> String {
        format!("value must match {}", self.description)
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = vec![];
        if let Dynamic::String(s) = &request.config_value {
            if !self.pattern.is_match(s) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} must match {}", request.path, self.description),
                        format!("Value '{}' does not match pattern", s),
                    )
                    .with_attribute(request.path),
                );
            }
        }
        ValidatorResponse { diagnostics }
    }
}

/// Accepts numbers greater than or equal to a lower bound
pub struct NumberAtLeast {
    min: f64,
}

impl NumberAtLeast {
    pub fn new(min: f64) -> Self {
        Self { min }
    }
}

impl Validator for NumberAtLeast {
    fn description(&self) -> String {
        format!("value must be at least {}", self.min)
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = vec![];
        if let Dynamic::Number(n) = request.config_value {
            if n < self.min {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} must be at least {}", request.path, self.min),
                        format!("Got {}", n),
                    )
                    .with_attribute(request.path),
                );
            }
        }
        ValidatorResponse { diagnostics }
    }
}

/// Accepts numbers less than or equal to an upper bound
pub struct NumberAtMost {
    max: f64,
}

impl NumberAtMost {
    pub fn new(max: f64) -> Self {
        Self { max }
    }
}

impl Validator for NumberAtMost {
    fn description(&self) -> String {
        format!("value must be at most {}", self.max)
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = vec![];
        if let Dynamic::Number(n) = request.config_value {
            if n > self.max {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} must be at most {}", request.path, self.max),
                        format!("Got {}", n),
                    )
                    .with_attribute(request.path),
                );
            }
        }
        ValidatorResponse { diagnostics }
    }
}
