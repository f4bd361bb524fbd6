use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// String label map attached to the cluster object or to a service.
///
/// This is the storage format shared with the engine, so it stays an open
/// `BTreeMap`; typed access goes through [`crate::SwarmLabel`] and [`crate::ServiceLabel`].
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Labels(pub BTreeMap<String, String>);

impl Labels {
    /// Create an empty set of labels.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Returns `true` if no labels are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of stored entries, tombstones included.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Insert or overwrite a label.
    ///
    /// Returns `self` for chaining.
    pub fn insert<K, V>(&mut self, key: K, val: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.0.insert(key.into(), val.into());
        self
    }

    /// Get the raw value for a key, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|s| s.as_str())
    }

    /// Get the value for a key, treating an empty value as unset.
    pub fn get_set(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// Remove a key, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    /// Copy every entry of `other` into `self`, `other` winning on collisions.
    pub fn merge(&mut self, other: &Labels) {
        for (k, v) in other.iter() {
            self.0.insert(k.to_string(), v.to_string());
        }
    }

    /// Iterate through all labels as `(&str, &str)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterate over the labels whose key starts with `prefix`, yielding the key remainder.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.0
            .range(prefix.to_string()..)
            .take_while(move |(k, _)| k.starts_with(prefix))
            .map(move |(k, v)| (&k[prefix.len()..], v.as_str()))
    }
}

impl<'de> Deserialize<'de> for Labels {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Clients send `null` for labels they want gone; the engine has no notion of it.
        let raw = Option::<BTreeMap<String, Option<String>>>::deserialize(deserializer)?;
        Ok(Labels(
            raw.unwrap_or_default()
                .into_iter()
                .filter_map(|(k, v)| v.map(|v| (k, v)))
                .collect(),
        ))
    }
}

impl<K, V> FromIterator<(K, V)> for Labels
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Labels(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
