//! Tag maps and the provider-level tag policies.
//!
//! - `aws:`-prefixed keys are reserved by the service and never managed
//! - default tags from provider config are merged into every table on create
//!   and stripped from the resource's own `tags` on read
//! - ignored keys and key prefixes are dropped from everything read back

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prefix of tag keys reserved for the service.
pub const AWS_TAG_PREFIX: &str = "aws:";

/// Key/value tag mapping. Keys are unique.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
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

    /// Drop keys reserved by the service.
    pub fn ignore_aws(self) -> Self {
        self.0
            .into_iter()
            .filter(|(k, _)| !k.starts_with(AWS_TAG_PREFIX))
            .collect()
    }

    /// Drop keys matched by the provider's ignore rules.
    pub fn ignore_config(self, ignore: &IgnoreTagsConfig) -> Self {
        self.0
            .into_iter()
            .filter(|(k, _)| !ignore.ignores(k))
            .collect()
    }

    /// Overlay `self` on top of the provider default tags.
    pub fn merge_defaults(self, defaults: &DefaultTagsConfig) -> Self {
        let mut merged = defaults.tags.0.clone();
        merged.extend(self.0);
        Tags(merged)
    }

    /// Remove entries inherited unchanged from the provider default tags.
    pub fn remove_defaults(self, defaults: &DefaultTagsConfig) -> Self {
        self.0
            .into_iter()
            .filter(|(k, v)| defaults.tags.get(k) != Some(v.as_str()))
            .collect()
    }

    /// Minimal delta that turns `self` into `new`.
    pub fn diff(&self, new: &Tags) -> TagDiff {
        let old = self.clone().ignore_aws();
        let new = new.clone().ignore_aws();

        let to_remove = old
            .0
            .iter()
            .filter(|(k, _)| !new.0.contains_key(*k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let to_add = new
            .0
            .iter()
            .filter(|(k, v)| old.0.get(*k) != Some(*v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        TagDiff { to_add, to_remove }
    }
}

impl FromIterator<(String, String)> for Tags {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Tags(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[(&str, &str); N]> for Tags {
    fn from(pairs: [(&str, &str); N]) -> Self {
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

impl IntoIterator for Tags {
    type Item = (String, String);
    type IntoIter = std::collections::btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Tags to untag and tags to (re)apply.
///
/// A key whose value changed is only in `to_add`; tagging overwrites it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TagDiff {
    pub to_add: Tags,
    pub to_remove: Tags,
}

impl TagDiff {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Tags applied to every table managed by this provider.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DefaultTagsConfig {
    #[serde(default)]
    pub tags: Tags,
}

/// Tag keys that are never read back or diffed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IgnoreTagsConfig {
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub key_prefixes: Vec<String>,
}

impl IgnoreTagsConfig {
    pub fn ignores(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key) || self.key_prefixes.iter().any(|p| key.starts_with(p))
    }
}
