use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

/// Structured view over an event's tag sequence.
///
/// A keyed entry holds `Some(value)` when it came from `key=value` and `None`
/// for a valueless keyed tag (only produced programmatically; it serializes as
/// a bare `key`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ParsedTags {
    pub keyed: BTreeMap<String, Option<String>>,
    pub plain: Vec<String>,
}

impl ParsedTags {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Value of a keyed tag. `None` if the key is absent or valueless.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.keyed.get(key).and_then(|v| v.as_deref())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.keyed.contains_key(key)
    }

    pub fn has_plain(&self, tag: &str) -> bool {
        self.plain.iter().any(|t| t == tag)
    }

    /// Insert or overwrite a keyed tag.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.keyed.insert(key.into(), Some(value.into()));
    }

    /// Insert a valueless keyed tag.
    pub fn set_valueless(&mut self, key: impl Into<String>) {
        self.keyed.insert(key.into(), None);
    }

    pub fn remove(&mut self, key: &str) -> Option<Option<String>> {
        self.keyed.remove(key)
    }

    /// Drop every reserved keyed and plain tag in place.
    pub fn strip_reserved(&mut self, reserved: &ReservedTags) {
        self.keyed.retain(|k, _| !reserved.is_reserved(k));
        self.plain.retain(|t| !reserved.is_reserved(t));
    }

    /// Total number of tags this view serializes to (before any stripping).
    pub fn len(&self) -> usize {
        self.keyed.len() + self.plain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyed.is_empty() && self.plain.is_empty()
    }
}

/// Rule deciding which tags never leave the engine.
///
/// A tag is reserved when it starts with the reserved prefix, or when its key
/// (or the whole plain tag) equals one of the reserved names. An empty prefix
/// matches nothing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReservedTags {
    prefix: String,
    names: BTreeSet<String>,
}

impl ReservedTags {
    pub fn new<I, S>(prefix: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefix: prefix.into(),
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// `true` if a keyed tag's key or a plain tag is reserved.
    pub fn is_reserved(&self, key_or_tag: &str) -> bool {
        (!self.prefix.is_empty() && key_or_tag.starts_with(&self.prefix))
            || self.names.contains(key_or_tag)
    }
}
