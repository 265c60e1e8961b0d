//! Per-field merge policies

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// How remote data for one field is merged into the local book.
///
/// Persisted as its ordinal. The declaration order is the order a UI toggle
/// cycles through, it carries no other meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncAction {
    /// Never touch the field.
    Skip,
    /// Take the remote value only when the local one is blank.
    CopyIfBlank,
    /// Merge remote and local lists, then remove duplicates.
    Append,
    /// The remote value replaces the local one.
    Overwrite,
}

impl SyncAction {
    pub const ALL: [SyncAction; 4] = [
        SyncAction::Skip,
        SyncAction::CopyIfBlank,
        SyncAction::Append,
        SyncAction::Overwrite,
    ];

    pub fn ordinal(self) -> i64 {
        self as i64
    }

    /// Out-of-range ordinals decode to [`SyncAction::Skip`].
    pub fn from_ordinal(ordinal: i64) -> Self {
        usize::try_from(ordinal)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
            .unwrap_or(SyncAction::Skip)
    }

    /// The action a UI toggle moves to next.
    ///
    /// Fields that cannot append go straight from `CopyIfBlank` to `Overwrite`.
    pub fn next_state(self, allow_append: bool) -> Self {
        match self {
            SyncAction::Skip => SyncAction::CopyIfBlank,
            SyncAction::CopyIfBlank if allow_append => SyncAction::Append,
            SyncAction::CopyIfBlank => SyncAction::Overwrite,
            SyncAction::Append => SyncAction::Overwrite,
            SyncAction::Overwrite => SyncAction::Skip,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SyncAction::Skip => "Skip",
            SyncAction::CopyIfBlank => "Copy if blank",
            SyncAction::Append => "Append",
            SyncAction::Overwrite => "Overwrite",
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for SyncAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.ordinal())
    }
}

impl<'de> Deserialize<'de> for SyncAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i64::deserialize(deserializer).map(SyncAction::from_ordinal)
    }
}
