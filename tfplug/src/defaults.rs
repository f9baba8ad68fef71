//! Static default values for optional + computed attributes

use crate::schema::{Default, DefaultRequest, DefaultResponse};
use crate::types::Dynamic;

pub struct StaticString(pub String);

impl StaticString {
    pub fn boxed(value: impl Into<String>) -> Box<dyn Default> {
        Box::new(Self(value.into()))
    }
}

impl Default for StaticString {
    fn description(&self) -> String {
        format!("defaults to {:?}", self.0)
    }

    fn default_value(&self, _request: DefaultRequest) -> DefaultResponse {
        DefaultResponse {
            value: Dynamic::String(self.0.clone()),
        }
    }
}

pub struct StaticBool(pub bool);

impl StaticBool {
    pub fn boxed(value: bool) -> Box<dyn Default> {
        Box::new(Self(value))
    }
}

impl Default for StaticBool {
    fn description(&self) -> String {
        format!("defaults to {}", self.0)
    }

    fn default_value(&self, _request: DefaultRequest) -> DefaultResponse {
        DefaultResponse {
            value: Dynamic::Bool(self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttributePath;

    #[test]
    fn static_defaults_return_their_value() {
        let request = || DefaultRequest {
            path: AttributePath::new("x509_type"),
        };
        assert_eq!(
            StaticString("NONE".into()).default_value(request()).value,
            Dynamic::String("NONE".into())
        );
        assert_eq!(
            StaticBool(false).default_value(request()).value,
            Dynamic::Bool(false)
        );
    }
}
