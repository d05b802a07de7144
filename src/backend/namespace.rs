//! Key Namespace Module
//!
//! Maps logical keys to the keys actually held by a store.

/// Concatenates `prefix` and `logical_key`.
pub fn namespaced_key(logical_key: &str, prefix: &str) -> String {
    let mut key = String::with_capacity(prefix.len() + logical_key.len());
    key.push_str(prefix);
    key.push_str(logical_key);
    key
}

// == Key Namespace ==
/// Group prefix in effect for a single operation.
///
/// Either empty (no grouping) or a non-empty token. All keys written under
/// the same non-empty prefix form one invalidation group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyNamespace {
    prefix: String,
}

impl KeyNamespace {
    /// Namespace with no group prefix.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn is_grouped(&self) -> bool {
        !self.prefix.is_empty()
    }

    /// Returns the storage key for `logical_key`.
    pub fn key(&self, logical_key: &str) -> String {
        namespaced_key(logical_key, &self.prefix)
    }

    /// Resolves the group an expiry applies to: the explicit argument if
    /// non-empty, else this namespace's prefix if non-empty.
    pub fn resolve_group<'a>(&'a self, group: Option<&'a str>) -> Option<&'a str> {
        match group {
            Some(g) if !g.is_empty() => Some(g),
            _ if self.is_grouped() => Some(self.prefix.as_str()),
            _ => None,
        }
    }
}
