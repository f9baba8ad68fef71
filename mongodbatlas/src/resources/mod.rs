//! Resource implementations

pub mod alert_configuration;
pub mod cloud_backup_snapshot;
pub mod database_user;
pub mod encryption_at_rest;
pub mod flex_cluster;
pub mod privatelink_endpoint;

pub use alert_configuration::AlertConfigurationResource;
pub use cloud_backup_snapshot::CloudBackupSnapshotResource;
pub use database_user::DatabaseUserResource;
pub use encryption_at_rest::EncryptionAtRestResource;
pub use flex_cluster::FlexClusterResource;
pub use privatelink_endpoint::PrivateLinkEndpointResource;

use std::collections::HashMap;
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

/// Required string attribute, as a diagnostic pointing at it when missing
pub(crate) fn required_string(value: &DynamicValue, name: &str) -> Result<String, Diagnostic> {
    value
        .get_optional_string(&AttributePath::new(name))
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            Diagnostic::error(
                format!("Missing {}", name),
                format!("Attribute {} must be set", name),
            )
            .with_attribute(AttributePath::new(name))
        })
}

/// Items of a nested block or list-of-object attribute; null means none
pub(crate) fn object_items(value: &DynamicValue, name: &str) -> Vec<HashMap<String, Dynamic>> {
    match value.get(&AttributePath::new(name)) {
        Dynamic::List(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Dynamic::Map(m) => Some(m),
                _ => None,
            })
            .collect(),
        _ => vec![],
    }
}

pub(crate) fn item_string(item: &HashMap<String, Dynamic>, key: &str) -> Option<String> {
    item.get(key)
        .and_then(Dynamic::as_string)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub(crate) fn item_number(item: &HashMap<String, Dynamic>, key: &str) -> Option<f64> {
    item.get(key).and_then(Dynamic::as_number)
}

pub(crate) fn item_bool(item: &HashMap<String, Dynamic>, key: &str) -> Option<bool> {
    item.get(key).and_then(Dynamic::as_bool)
}

/// Non-empty string list, or null
pub(crate) fn string_list_or_null(values: &[String]) -> Dynamic {
    if values.is_empty() {
        Dynamic::Null
    } else {
        Dynamic::string_list(values.iter().cloned())
    }
}

pub(crate) fn api_error(summary: &str, error: impl std::fmt::Display) -> Diagnostic {
    Diagnostic::error(summary, format!("API error: {}", error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_items_ignores_null_and_non_objects() {
        let value = DynamicValue::new(Dynamic::object([
            (
                "roles",
                Dynamic::List(vec![
                    Dynamic::object([("role_name", Dynamic::String("read".into()))]),
                    Dynamic::String("junk".into()),
                ]),
            ),
            ("labels", Dynamic::Null),
        ]));

        let roles = object_items(&value, "roles");
        assert_eq!(roles.len(), 1);
        assert_eq!(item_string(&roles[0], "role_name").as_deref(), Some("read"));
        assert!(object_items(&value, "labels").is_empty());
        assert!(object_items(&value, "scopes").is_empty());
    }

    #[test]
    fn required_string_points_at_attribute() {
        let value = DynamicValue::new(Dynamic::object([("name", Dynamic::String(String::new()))]));
        let diag = required_string(&value, "name").unwrap_err();
        assert_eq!(diag.summary, "Missing name");
        assert_eq!(diag.attribute.unwrap().to_string(), "name");
    }
}
