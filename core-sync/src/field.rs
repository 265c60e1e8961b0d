//! A single field under sync control

use crate::action::SyncAction;
use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};

/// Binds a book field key to its merge policy.
///
/// Only [`action`](Self::action) changes after construction. A field that
/// cannot append never holds [`SyncAction::Append`], whichever way the action
/// is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredSyncField")]
pub struct SyncField {
    key: String,
    label: String,
    can_append: bool,
    default_action: SyncAction,
    action: SyncAction,
}

impl SyncField {
    /// Create a field whose current action is its default.
    ///
    /// # Errors
    ///
    /// [`SyncError::InvalidArgument`] for an empty key or label, or an
    /// `Append` default on a field that cannot append.
    pub fn new(
        key: impl Into<String>,
        label: impl Into<String>,
        can_append: bool,
        default_action: SyncAction,
    ) -> Result<Self> {
        let key = key.into();
        let label = label.into();
        if key.trim().is_empty() {
            return Err(SyncError::InvalidArgument("field key is empty".to_string()));
        }
        if label.trim().is_empty() {
            return Err(SyncError::InvalidArgument(format!("field {key} has no label")));
        }
        if !can_append && default_action == SyncAction::Append {
            return Err(SyncError::InvalidArgument(format!(
                "field {key} is not a list and cannot default to Append"
            )));
        }

        Ok(Self {
            key,
            label,
            can_append,
            default_action,
            action: default_action,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn can_append(&self) -> bool {
        self.can_append
    }

    pub fn default_action(&self) -> SyncAction {
        self.default_action
    }

    pub fn action(&self) -> SyncAction {
        self.action
    }

    /// # Errors
    ///
    /// [`SyncError::InvalidArgument`] when `action` is `Append` and the field
    /// is not a list.
    pub fn set_action(&mut self, action: SyncAction) -> Result<()> {
        if action == SyncAction::Append && !self.can_append {
            return Err(SyncError::InvalidArgument(format!(
                "field {} is not a list and cannot append",
                self.key
            )));
        }
        self.action = action;
        Ok(())
    }

    /// Set the action from an untrusted source (stored preferences, bulk
    /// updates); `Append` on a non-list field becomes `Overwrite`.
    pub fn set_action_lenient(&mut self, action: SyncAction) {
        self.action = self.coerce(action);
    }

    /// Back to the default action.
    pub fn reset_action(&mut self) {
        self.action = self.default_action;
    }

    /// The action a UI toggle would move to next.
    pub fn next_state(&self) -> SyncAction {
        self.action.next_state(self.can_append)
    }

    /// Move to [`next_state`](Self::next_state) and return it.
    pub fn cycle_action(&mut self) -> SyncAction {
        self.action = self.next_state();
        self.action
    }

    /// A copy of this field under another key.
    ///
    /// Label, list capability and both actions are shared.
    pub fn create_related_field(&self, key: impl Into<String>) -> SyncField {
        SyncField {
            key: key.into(),
            label: self.label.clone(),
            can_append: self.can_append,
            default_action: self.default_action,
            action: self.action,
        }
    }

    fn coerce(&self, action: SyncAction) -> SyncAction {
        if action == SyncAction::Append && !self.can_append {
            SyncAction::Overwrite
        } else {
            action
        }
    }
}

/// Wire form; normalised on the way in.
#[derive(Deserialize)]
struct StoredSyncField {
    key: String,
    label: String,
    can_append: bool,
    default_action: SyncAction,
    action: SyncAction,
}

impl From<StoredSyncField> for SyncField {
    fn from(stored: StoredSyncField) -> Self {
        let mut field = SyncField {
            key: stored.key,
            label: stored.label,
            can_append: stored.can_append,
            default_action: stored.default_action,
            action: stored.action,
        };
        field.default_action = field.coerce(field.default_action);
        field.action = field.coerce(field.action);
        field
    }
}
