//! Core type system for tfplug
//!
//! This module provides the core types used throughout the framework,
//! including Dynamic values, type definitions, and utility types.

use crate::error::{Result, TfplugError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Dynamic represents Terraform values that can be of any type
/// This is the core type for all configuration and state data
/// IMPORTANT: Always use type-safe accessors instead of matching directly
#[derive(Debug, Clone, PartialEq)]
pub enum Dynamic {
    /// Explicit null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Number value (all numbers are f64 to match Terraform)
    Number(f64),
    /// String value
    String(String),
    /// List of values (ordered, allows duplicates)
    List(Vec<Dynamic>),
    /// Map of string keys to values (objects are represented as Maps)
    Map(HashMap<String, Dynamic>),
    /// Value not yet known (during planning)
    Unknown,
}

impl Dynamic {
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Dynamic::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Dynamic::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Dynamic::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Dynamic]> {
        match self {
            Dynamic::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<String, Dynamic>> {
        match self {
            Dynamic::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Dynamic::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Dynamic::Unknown)
    }

    /// True when the value or anything nested inside it is unknown
    pub fn contains_unknown(&self) -> bool {
        match self {
            Dynamic::Unknown => true,
            Dynamic::List(l) => l.iter().any(Dynamic::contains_unknown),
            Dynamic::Map(m) => m.values().any(Dynamic::contains_unknown),
            _ => false,
        }
    }

    /// Build a map value from key/value pairs
    pub fn object<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Dynamic)>,
        K: Into<String>,
    {
        Dynamic::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// String value, or null when absent
    pub fn string_or_null(value: Option<impl Into<String>>) -> Self {
        value.map_or(Dynamic::Null, |v| Dynamic::String(v.into()))
    }

    pub fn number_or_null(value: Option<f64>) -> Self {
        value.map_or(Dynamic::Null, Dynamic::Number)
    }

    pub fn bool_or_null(value: Option<bool>) -> Self {
        value.map_or(Dynamic::Null, Dynamic::Bool)
    }

    pub fn string_list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Dynamic::List(
            values
                .into_iter()
                .map(|v| Dynamic::String(v.into()))
                .collect(),
        )
    }
}

impl Serialize for Dynamic {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Dynamic::Null => serializer.serialize_unit(),
            Dynamic::Bool(b) => serializer.serialize_bool(*b),
            Dynamic::Number(n) => serializer.serialize_f64(*n),
            Dynamic::String(s) => serializer.serialize_str(s),
            Dynamic::List(l) => l.serialize(serializer),
            Dynamic::Map(m) => m.serialize(serializer),
            Dynamic::Unknown => serializer.serialize_str("__unknown__"),
        }
    }
}

impl<'de> Deserialize<'de> for Dynamic {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};
        use std::fmt;

        struct DynamicVisitor;

        impl<'de> Visitor<'de> for DynamicVisitor {
            type Value = Dynamic;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a valid Dynamic value")
            }

            fn visit_unit<E>(self) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Null)
            }

            fn visit_bool<E>(self, value: bool) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Bool(value))
            }

            fn visit_i64<E>(self, value: i64) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Number(value as f64))
            }

            fn visit_u64<E>(self, value: u64) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Number(value as f64))
            }

            fn visit_f64<E>(self, value: f64) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                Ok(Dynamic::Number(value))
            }

            fn visit_str<E>(self, value: &str) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                if value == "__unknown__" {
                    Ok(Dynamic::Unknown)
                } else {
                    Ok(Dynamic::String(value.to_string()))
                }
            }

            fn visit_string<E>(self, value: String) -> std::result::Result<Dynamic, E>
            where
                E: de::Error,
            {
                if value == "__unknown__" {
                    Ok(Dynamic::Unknown)
                } else {
                    Ok(Dynamic::String(value))
                }
            }

            fn visit_seq<V>(self, mut seq: V) -> std::result::Result<Dynamic, V::Error>
            where
                V: de::SeqAccess<'de>,
            {
                let mut vec = Vec::new();
                while let Some(elem) = seq.next_element()? {
                    vec.push(elem);
                }
                Ok(Dynamic::List(vec))
            }

            fn visit_map<V>(self, mut map: V) -> std::result::Result<Dynamic, V::Error>
            where
                V: de::MapAccess<'de>,
            {
                let mut hashmap = HashMap::new();
                while let Some((key, value)) = map.next_entry()? {
                    hashmap.insert(key, value);
                }
                Ok(Dynamic::Map(hashmap))
            }
        }

        deserializer.deserialize_any(DynamicVisitor)
    }
}

/// DynamicValue wraps Dynamic and provides encoding/decoding capabilities
/// This is what gets passed between Terraform and the provider
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicValue {
    pub value: Dynamic,
}

impl DynamicValue {
    pub fn new(value: Dynamic) -> Self {
        Self { value }
    }

    pub fn null() -> Self {
        Self {
            value: Dynamic::Null,
        }
    }

    pub fn unknown() -> Self {
        Self {
            value: Dynamic::Unknown,
        }
    }

    /// Encoding/decoding for wire protocol - Terraform uses msgpack by default
    pub fn encode_msgpack(&self) -> Result<Vec<u8>> {
        match &self.value {
            Dynamic::Null => Ok(vec![]),
            Dynamic::Map(map) => rmp_serde::encode::to_vec(map)
                .map_err(|e| TfplugError::EncodingError(format!("msgpack encoding failed: {}", e))),
            _ => rmp_serde::encode::to_vec(&self.value)
                .map_err(|e| TfplugError::EncodingError(format!("msgpack encoding failed: {}", e))),
        }
    }

    pub fn decode_msgpack(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Ok(Self::null());
        }

        // Try to decode as a map first (most common case from Terraform)
        match rmp_serde::decode::from_slice::<HashMap<String, Dynamic>>(data) {
            Ok(map) => Ok(Self {
                value: Dynamic::Map(map),
            }),
            Err(_) => {
                // Fall back to decoding as a Dynamic value directly
                match rmp_serde::decode::from_slice::<Dynamic>(data) {
                    Ok(value) => Ok(Self { value }),
                    Err(_) => {
                        // Try decoding as Option<HashMap> for null values
                        match rmp_serde::decode::from_slice::<Option<HashMap<String, Dynamic>>>(
                            data,
                        ) {
                            Ok(None) => Ok(Self::null()),
                            Ok(Some(map)) => Ok(Self {
                                value: Dynamic::Map(map),
                            }),
                            Err(e) => Err(TfplugError::DecodingError(format!(
                                "msgpack decoding failed: {}",
                                e
                            ))),
                        }
                    }
                }
            }
        }
    }

    /// Value at `path` converted by `pick`, or a type mismatch naming `expected`
    fn typed<'a, T>(
        &'a self,
        path: &AttributePath,
        expected: &str,
        pick: impl FnOnce(&'a Dynamic) -> Option<T>,
    ) -> Result<T> {
        let value = self.navigate_path(path)?;
        pick(value).ok_or_else(|| TfplugError::TypeMismatch {
            expected: expected.to_string(),
            actual: self.type_name(value),
        })
    }

    pub fn get_string(&self, path: &AttributePath) -> Result<String> {
        self.typed(path, "string", |v| v.as_string().map(str::to_string))
    }

    pub fn get_number(&self, path: &AttributePath) -> Result<f64> {
        self.typed(path, "number", Dynamic::as_number)
    }

    pub fn get_bool(&self, path: &AttributePath) -> Result<bool> {
        self.typed(path, "bool", Dynamic::as_bool)
    }

    /// List of strings, skipping any element that is not a string
    pub fn get_string_list(&self, path: &AttributePath) -> Result<Vec<String>> {
        self.typed(path, "list", |v| {
            v.as_list().map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_string().map(str::to_string))
                    .collect()
            })
        })
    }

    /// Like `get_string` but treats missing, null and unknown values as absent
    pub fn get_optional_string(&self, path: &AttributePath) -> Option<String> {
        self.get_string(path).ok()
    }

    pub fn get_optional_number(&self, path: &AttributePath) -> Option<f64> {
        self.get_number(path).ok()
    }

    pub fn get_optional_bool(&self, path: &AttributePath) -> Option<bool> {
        self.get_bool(path).ok()
    }

    /// Raw value at a path, `Dynamic::Null` when the path does not exist
    pub fn get(&self, path: &AttributePath) -> Dynamic {
        self.navigate_path(path).cloned().unwrap_or(Dynamic::Null)
    }

    pub fn set_string(&mut self, path: &AttributePath, value: String) -> Result<()> {
        self.set_value(path, Dynamic::String(value))
    }

    pub fn set_number(&mut self, path: &AttributePath, value: f64) -> Result<()> {
        self.set_value(path, Dynamic::Number(value))
    }

    /// Set a raw value at a path
    pub fn set(&mut self, path: &AttributePath, value: Dynamic) -> Result<()> {
        self.set_value(path, value)
    }

    /// Convert a JSON document into a value, objects become maps
    pub fn from_json_value(value: serde_json::Value) -> Result<Self> {
        let value = serde_json::from_value(value)
            .map_err(|e| TfplugError::DecodingError(format!("json conversion failed: {}", e)))?;
        Ok(Self { value })
    }

    /// Helpers for handling unknown values during planning
    pub fn is_null(&self) -> bool {
        matches!(self.value, Dynamic::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self.value, Dynamic::Unknown)
    }

    /// Mark computed values as unknown during planning
    pub fn mark_unknown(&mut self, path: &AttributePath) -> Result<()> {
        self.set_value(path, Dynamic::Unknown)
    }

    fn navigate_path<'a>(&'a self, path: &AttributePath) -> Result<&'a Dynamic> {
        let mut current = &self.value;

        for step in &path.steps {
            current = match (current, step) {
                (Dynamic::Map(m), AttributePathStep::AttributeName(name))
                | (Dynamic::Map(m), AttributePathStep::ElementKeyString(name)) => m
                    .get(name)
                    .ok_or_else(|| TfplugError::AttributeNotFound(name.clone()))?,
                (Dynamic::List(l), AttributePathStep::ElementKeyInt(idx)) => l
                    .get(*idx as usize)
                    .ok_or(TfplugError::IndexOutOfBounds(*idx as usize))?,
                (other, step) => return Err(invalid_step(step, other)),
            };
        }

        Ok(current)
    }

    /// Writes `new_value` at `path`, creating intermediate objects and lists
    /// as needed; list elements must already exist
    fn set_value(&mut self, path: &AttributePath, new_value: Dynamic) -> Result<()> {
        let Some((last, parents)) = path.steps.split_last() else {
            self.value = new_value;
            return Ok(());
        };

        if !matches!(self.value, Dynamic::Map(_)) {
            self.value = Dynamic::Map(HashMap::new());
        }

        let mut current = &mut self.value;
        for (idx, step) in parents.iter().enumerate() {
            current = match (current, step) {
                (Dynamic::Map(m), AttributePathStep::AttributeName(name))
                | (Dynamic::Map(m), AttributePathStep::ElementKeyString(name)) => {
                    let slot = m.entry(name.clone()).or_insert(Dynamic::Null);
                    if slot.is_null() {
                        *slot = match path.steps.get(idx + 1) {
                            Some(AttributePathStep::ElementKeyInt(_)) => Dynamic::List(Vec::new()),
                            _ => Dynamic::Map(HashMap::new()),
                        };
                    }
                    slot
                }
                (Dynamic::List(l), AttributePathStep::ElementKeyInt(idx)) => l
                    .get_mut(*idx as usize)
                    .ok_or(TfplugError::IndexOutOfBounds(*idx as usize))?,
                (other, step) => return Err(invalid_step(step, other)),
            };
        }

        match (current, last) {
            (Dynamic::Map(m), AttributePathStep::AttributeName(name))
            | (Dynamic::Map(m), AttributePathStep::ElementKeyString(name)) => {
                m.insert(name.clone(), new_value);
                Ok(())
            }
            (Dynamic::List(l), AttributePathStep::ElementKeyInt(idx)) => {
                let slot = l
                    .get_mut(*idx as usize)
                    .ok_or(TfplugError::IndexOutOfBounds(*idx as usize))?;
                *slot = new_value;
                Ok(())
            }
            (other, step) => Err(invalid_step(step, other)),
        }
    }

    fn type_name(&self, value: &Dynamic) -> String {
        match value {
            Dynamic::Null => "null".to_string(),
            Dynamic::Bool(_) => "bool".to_string(),
            Dynamic::Number(_) => "number".to_string(),
            Dynamic::String(_) => "string".to_string(),
            Dynamic::List(_) => "list".to_string(),
            Dynamic::Map(_) => "map".to_string(),
            Dynamic::Unknown => "unknown".to_string(),
        }
    }
}

/// AttributePath represents a path to an attribute within a DynamicValue
#[derive(Debug, Clone, PartialEq)]
pub struct AttributePath {
    pub steps: Vec<AttributePathStep>,
}

impl AttributePath {
    pub fn new(name: &str) -> Self {
        Self {
            steps: vec![AttributePathStep::AttributeName(name.to_string())],
        }
    }

    pub fn root() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn attribute(mut self, name: &str) -> Self {
        self.steps
            .push(AttributePathStep::AttributeName(name.to_string()));
        self
    }

    pub fn index(mut self, idx: i64) -> Self {
        self.steps.push(AttributePathStep::ElementKeyInt(idx));
        self
    }

    pub fn key(mut self, key: &str) -> Self {
        self.steps
            .push(AttributePathStep::ElementKeyString(key.to_string()));
        self
    }
}

impl std::fmt::Display for AttributePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                AttributePathStep::AttributeName(name) if i == 0 => write!(f, "{}", name)?,
                AttributePathStep::AttributeName(name) => write!(f, ".{}", name)?,
                AttributePathStep::ElementKeyString(key) => write!(f, "[{:?}]", key)?,
                AttributePathStep::ElementKeyInt(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

fn invalid_step(step: &AttributePathStep, found: &Dynamic) -> TfplugError {
    let step = match step {
        AttributePathStep::AttributeName(name) => format!(".{}", name),
        AttributePathStep::ElementKeyString(key) => format!("[{:?}]", key),
        AttributePathStep::ElementKeyInt(idx) => format!("[{}]", idx),
    };
    let found = match found {
        Dynamic::Null => "null",
        Dynamic::Bool(_) => "bool",
        Dynamic::Number(_) => "number",
        Dynamic::String(_) => "string",
        Dynamic::List(_) => "list",
        Dynamic::Map(_) => "object",
        Dynamic::Unknown => "unknown",
    };
    TfplugError::InvalidPathStep { step, found }
}

/// Individual step in an AttributePath
#[derive(Debug, Clone, PartialEq)]
pub enum AttributePathStep {
    /// Access attribute by name in object/map
    AttributeName(String),
    /// Access element by string key (for maps)
    ElementKeyString(String),
    /// Access element by integer index (for lists)
    ElementKeyInt(i64),
}

/// Diagnostic represents a warning or error from the provider
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub summary: String,
    pub detail: String,
    pub attribute: Option<AttributePath>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn with_attribute(mut self, path: AttributePath) -> Self {
        self.attribute = Some(path);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

/// True when any diagnostic in the slice is an error
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DiagnosticSeverity {
    Invalid,
    Error,
    Warning,
}

/// ServerCapabilities indicates provider capabilities
#[derive(Debug, Clone)]
pub struct ServerCapabilities {
    pub plan_destroy: bool,
    pub get_provider_schema_optional: bool,
    pub move_resource_state: bool,
}

/// ClientCapabilities indicates Terraform client capabilities
#[derive(Debug, Clone)]
pub struct ClientCapabilities {
    pub deferral_allowed: bool,
    pub write_only_attributes_allowed: bool,
}

impl Default for ClientCapabilities {
    fn default() -> Self {
        Self {
            deferral_allowed: false,
            write_only_attributes_allowed: false,
        }
    }
}

impl Default for ServerCapabilities {
    fn default() -> Self {
        Self {
            plan_destroy: true,
            get_provider_schema_optional: false,
            move_resource_state: false,
        }
    }
}

/// Config represents configuration values
pub type Config = DynamicValue;

/// State represents resource state values
pub type State = DynamicValue;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dynamic_value_string_access() {
        let mut dv = DynamicValue::new(Dynamic::Map(HashMap::new()));
        dv.set_string(&AttributePath::new("name"), "test".to_string())
            .unwrap();

        let result = dv.get_string(&AttributePath::new("name")).unwrap();
        assert_eq!(result, "test");
    }

    #[test]
    fn dynamic_value_nested_access() {
        let mut dv = DynamicValue::new(Dynamic::Map(HashMap::new()));
        let path = AttributePath::new("config").attribute("endpoint");
        dv.set_string(&path, "https://example.com".to_string())
            .unwrap();

        let result = dv.get_string(&path).unwrap();
        assert_eq!(result, "https://example.com");
    }

    #[test]
    fn msgpack_round_trip_preserves_unknown() {
        let mut dv = DynamicValue::new(Dynamic::Map(HashMap::new()));
        dv.set_string(&AttributePath::new("project_id"), "p1".to_string())
            .unwrap();
        dv.mark_unknown(&AttributePath::new("snapshot_id")).unwrap();

        let bytes = dv.encode_msgpack().unwrap();
        let decoded = DynamicValue::decode_msgpack(&bytes).unwrap();

        assert_eq!(decoded.get_string(&AttributePath::new("project_id")).unwrap(), "p1");
        assert!(decoded.get(&AttributePath::new("snapshot_id")).is_unknown());
    }

    #[test]
    fn optional_getters_treat_null_as_absent() {
        let mut dv = DynamicValue::new(Dynamic::Map(HashMap::new()));
        dv.set(&AttributePath::new("description"), Dynamic::Null)
            .unwrap();

        assert_eq!(dv.get_optional_string(&AttributePath::new("description")), None);
        assert_eq!(dv.get_optional_number(&AttributePath::new("missing")), None);
    }

    #[test]
    fn set_creates_intermediate_maps_over_null() {
        let mut dv = DynamicValue::new(Dynamic::object([("provider_settings", Dynamic::Null)]));
        let path = AttributePath::new("provider_settings").attribute("region_name");
        dv.set_string(&path, "US_EAST_1".to_string()).unwrap();

        assert_eq!(dv.get_string(&path).unwrap(), "US_EAST_1");
    }

    #[test]
    fn from_json_value_maps_objects_and_arrays() {
        let dv = DynamicValue::from_json_value(serde_json::json!({
            "status": "completed",
            "members": [{"id": "a"}],
            "storageSizeBytes": 1024
        }))
        .unwrap();

        assert_eq!(dv.get_string(&AttributePath::new("status")).unwrap(), "completed");
        assert_eq!(
            dv.get_string(&AttributePath::new("members").index(0).attribute("id"))
                .unwrap(),
            "a"
        );
        assert_eq!(dv.get_number(&AttributePath::new("storageSizeBytes")).unwrap(), 1024.0);
    }

    #[test]
    fn attribute_path_display() {
        let path = AttributePath::new("roles").index(0).attribute("role_name");
        assert_eq!(path.to_string(), "roles[0].role_name");
    }

    #[test]
    fn path_errors_name_the_failing_step() {
        let mut dv = DynamicValue::new(Dynamic::object([
            ("name", Dynamic::String("flexy".into())),
            ("roles", Dynamic::List(vec![])),
        ]));

        assert!(matches!(
            dv.set(&AttributePath::new("roles").index(2), Dynamic::Null),
            Err(TfplugError::IndexOutOfBounds(2))
        ));
        assert!(matches!(
            dv.get_string(&AttributePath::new("name").index(0)),
            Err(TfplugError::InvalidPathStep { found: "string", .. })
        ));
        assert!(matches!(
            dv.get_string(&AttributePath::new("missing")),
            Err(TfplugError::AttributeNotFound(_))
        ));
    }
}
