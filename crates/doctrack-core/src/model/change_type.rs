use serde::{Deserialize, Serialize};

/// Tracking state of a registered entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    Unchanged,
    Added,
    Modified,
    Deleted,
}

impl ChangeType {
    /// Stable upper-case label used in logs and errors
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Unchanged => "UNCHANGED",
            ChangeType::Added => "ADDED",
            ChangeType::Modified => "MODIFIED",
            ChangeType::Deleted => "DELETED",
        }
    }

    /// Whether an already tracked entity may move from `self` to `next`
    ///
    /// Only UNCHANGED entities may change state, and only to MODIFIED or DELETED.
    pub fn can_transition_to(&self, next: ChangeType) -> bool {
        matches!(
            (self, next),
            (ChangeType::Unchanged, ChangeType::Modified)
                | (ChangeType::Unchanged, ChangeType::Deleted)
        )
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
