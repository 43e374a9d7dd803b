//! Membership delta computation.

use std::collections::BTreeSet;

use serde::Serialize;

/// Members to grant and members to revoke. The two sets are always disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MembershipDelta {
    pub to_add: BTreeSet<String>,
    pub to_remove: BTreeSet<String>,
}

impl MembershipDelta {
    /// Returns true if the current and previous sets were equal.
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Total number of grant/revoke calls the delta implies.
    pub fn len(&self) -> usize {
        self.to_add.len() + self.to_remove.len()
    }
}

/// Compare the directory's current members against the last snapshot.
///
/// `to_add = current - previous`, `to_remove = previous - current`, by exact
/// string equality. Identifiers present on both sides appear in neither set.
pub fn diff(current: &BTreeSet<String>, previous: &BTreeSet<String>) -> MembershipDelta {
    MembershipDelta {
        to_add: current.difference(previous).cloned().collect(),
        to_remove: previous.difference(current).cloned().collect(),
    }
}
