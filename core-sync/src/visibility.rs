//! Field visibility
//!
//! Users can hide fields they never use. A hidden field is left out of the
//! sync registry entirely, so the merge engine never sees it.

use crate::error::Result;
use bridge_traits::storage::SettingsStore;
use std::collections::HashSet;

/// Settings key prefix of the per-field visibility flags.
pub const VISIBILITY_PREFIX: &str = "fields.visibility.";

/// Answers whether a field is in use.
pub trait FieldVisibility: Send + Sync {
    fn is_used(&self, key: &str) -> bool;
}

/// Every field is in use.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllFieldsVisible;

impl FieldVisibility for AllFieldsVisible {
    fn is_used(&self, _key: &str) -> bool {
        true
    }
}

/// Every field is in use except an explicit set.
#[derive(Debug, Clone, Default)]
pub struct HiddenFields {
    hidden: HashSet<String>,
}

impl HiddenFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hide(mut self, key: impl Into<String>) -> Self {
        self.hidden.insert(key.into());
        self
    }

    /// Read the `fields.visibility.<key>` flags; a stored `false` hides the key.
    pub async fn load(store: &dyn SettingsStore) -> Result<Self> {
        let mut hidden = HashSet::new();
        for setting in store.list_keys_with_prefix(VISIBILITY_PREFIX).await? {
            if store.get_bool(&setting).await? == Some(false) {
                if let Some(key) = setting.strip_prefix(VISIBILITY_PREFIX) {
                    hidden.insert(key.to_string());
                }
            }
        }
        Ok(Self { hidden })
    }

    pub fn len(&self) -> usize {
        self.hidden.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hidden.is_empty()
    }
}

impl FieldVisibility for HiddenFields {
    fn is_used(&self, key: &str) -> bool {
        !self.hidden.contains(key)
    }
}
