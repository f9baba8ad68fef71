//! Composite state IDs
//!
//! Resources nested under a project (and often a cluster) need several
//! values to be located again. Those values are packed into the single `id`
//! attribute: keys are sorted, each key and value is base64 encoded, pairs are
//! written as `key:value` and joined with `-`. Neither delimiter appears in the
//! base64 alphabet, so values may contain anything.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::BTreeMap;

const PAIR_SEPARATOR: char = '-';
const KEY_VALUE_SEPARATOR: char = ':';

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportIdError {
    #[error("import format error: to import {resource}, use the format {format}")]
    Format {
        resource: &'static str,
        format: &'static str,
    },

    #[error("state id does not contain {0}")]
    MissingField(String),
}

/// Encode named fields into one state ID
///
/// Output is independent of the iteration order of `fields`.
pub fn encode_state_id<I, K, V>(fields: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let sorted: BTreeMap<String, String> = fields
        .into_iter()
        .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
        .collect();

    sorted
        .iter()
        .map(|(k, v)| {
            format!(
                "{}{}{}",
                STANDARD.encode(k),
                KEY_VALUE_SEPARATOR,
                STANDARD.encode(v)
            )
        })
        .collect::<Vec<_>>()
        .join(&PAIR_SEPARATOR.to_string())
}

/// Decode a state ID produced by [`encode_state_id`]
///
/// Malformed pairs are skipped, so garbage input gives an empty map rather
/// than an error. Callers decide which keys they need.
pub fn decode_state_id(id: &str) -> BTreeMap<String, String> {
    id.split(PAIR_SEPARATOR)
        .filter_map(|pair| {
            let mut parts = pair.split(KEY_VALUE_SEPARATOR);
            let (key, value) = match (parts.next(), parts.next(), parts.next()) {
                (Some(key), Some(value), None) => (key, value),
                _ => return None,
            };
            Some((decode_part(key)?, decode_part(value)?))
        })
        .collect()
}

fn decode_part(part: &str) -> Option<String> {
    let bytes = STANDARD.decode(part).ok()?;
    String::from_utf8(bytes).ok()
}

/// Decoded state ID with typed access to the fields a resource needs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateIdFields(BTreeMap<String, String>);

impl StateIdFields {
    pub fn decode(id: &str) -> Self {
        Self(decode_state_id(id))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// A field that must be present; absence means the ID does not identify
    /// anything and the resource should be treated as gone
    pub fn require(&self, key: &str) -> Result<&str, ImportIdError> {
        self.get(key)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ImportIdError::MissingField(key.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_id_round_trips() {
        let id = encode_state_id([
            ("project_id", "p1"),
            ("cluster_name", "c1"),
            ("snapshot_id", "s1"),
        ]);
        let decoded = decode_state_id(&id);

        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded["project_id"], "p1");
        assert_eq!(decoded["cluster_name"], "c1");
        assert_eq!(decoded["snapshot_id"], "s1");
    }

    #[test]
    fn encoding_is_order_independent() {
        let a = encode_state_id([("b", "2"), ("a", "1")]);
        let b = encode_state_id([("a", "1"), ("b", "2")]);
        assert_eq!(a, b);
        assert_eq!(a, "YQ==:MQ==-Yg==:Mg==");
    }

    #[test]
    fn values_may_contain_delimiters() {
        let id = encode_state_id([("cluster_name", "my-cluster:prod"), ("username", "a-b")]);
        let decoded = decode_state_id(&id);
        assert_eq!(decoded["cluster_name"], "my-cluster:prod");
        assert_eq!(decoded["username"], "a-b");
    }

    #[test]
    fn empty_values_survive() {
        let decoded = decode_state_id(&encode_state_id([("region", "")]));
        assert_eq!(decoded["region"], "");
    }

    #[test]
    fn malformed_input_decodes_to_empty_map() {
        assert!(decode_state_id("").is_empty());
        assert!(decode_state_id("not-an-id").is_empty());
        assert!(decode_state_id("5d0f1f73cf09a29120e173cf-Cluster0").is_empty());
        assert!(decode_state_id("a:b:c").is_empty());
        assert!(decode_state_id("!!!:???").is_empty());
    }

    #[test]
    fn malformed_pairs_are_skipped() {
        let id = format!("{}-garbage", encode_state_id([("project_id", "p1")]));
        let decoded = decode_state_id(&id);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded["project_id"], "p1");
    }

    #[test]
    fn require_reports_missing_fields() {
        let fields = StateIdFields::decode(&encode_state_id([("project_id", "p1"), ("name", "")]));
        assert_eq!(fields.require("project_id").unwrap(), "p1");
        assert_eq!(
            fields.require("name"),
            Err(ImportIdError::MissingField("name".to_string()))
        );
        assert!(fields.require("snapshot_id").is_err());
        assert!(StateIdFields::decode("junk").is_empty());
    }
}
