//! Review units ("changes") and their patch sets.

use pushgate_state::ProjectName;
use serde::{Deserialize, Serialize};

/// An existing review that a push is updating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// Change number.
    pub number: u32,
    /// Canonical Change-Id key (`I` + 40 hex chars).
    pub key: String,
    pub project: ProjectName,
    /// Destination branch, full ref name.
    pub dest: String,
}

/// Patch set of a change, rendered as `<change>,<patch set>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatchSetId {
    pub change: u32,
    pub number: u32,
}

impl PatchSetId {
    pub fn new(change: u32, number: u32) -> Self {
        Self { change, number }
    }

    /// Ref holding this patch set: `refs/changes/<last two digits>/<change>/<ps>`.
    pub fn to_ref_name(&self) -> String {
        format!(
            "refs/changes/{:02}/{}/{}",
            self.change % 100,
            self.change,
            self.number
        )
    }
}

impl std::fmt::Display for PatchSetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.change, self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_set_rendering() {
        let ps = PatchSetId::new(1234, 2);
        assert_eq!(ps.to_string(), "1234,2");
        assert_eq!(ps.to_ref_name(), "refs/changes/34/1234/2");
        assert_eq!(PatchSetId::new(5, 1).to_ref_name(), "refs/changes/05/5/1");
    }
}
