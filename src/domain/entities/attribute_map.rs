use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::errors::CodecError;

/// Flat key to string map stored in a data unit's manifest channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeMap(BTreeMap<String, String>);

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(&self.0).map_err(|e| CodecError::Manifest(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.is_empty() {
            return Ok(Self::new());
        }
        serde_json::from_slice(bytes)
            .map(Self)
            .map_err(|e| CodecError::Manifest(e.to_string()))
    }
}

impl FromIterator<(String, String)> for AttributeMap {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_round_trip() {
        let mut attrs = AttributeMap::new();
        attrs.insert("Feed", "TEST_FEED");
        attrs.insert("RecordCount", "12");

        let bytes = attrs.to_bytes().unwrap();
        assert_eq!(AttributeMap::from_bytes(&bytes).unwrap(), attrs);
    }

    #[test]
    fn test_empty_bytes_is_empty_map() {
        assert!(AttributeMap::from_bytes(b"").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_manifest() {
        let err = AttributeMap::from_bytes(b"{not json").unwrap_err();
        assert!(matches!(err, CodecError::Manifest(_)));
    }

    #[test]
    fn test_insert_replaces() {
        let mut attrs = AttributeMap::new();
        assert_eq!(attrs.insert("k", "1"), None);
        assert_eq!(attrs.insert("k", "2"), Some("1".to_string()));
        assert_eq!(attrs.get("k"), Some("2"));
        assert_eq!(attrs.len(), 1);
    }
}
