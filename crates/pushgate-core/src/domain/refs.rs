//! Ref namespaces and magic paths.

use std::sync::OnceLock;

use regex::Regex;

pub const R_HEADS: &str = "refs/heads/";

/// Review refs: `refs/changes/<XX>/<change>/<patch set>`.
pub const REFS_CHANGES: &str = "refs/changes/";

/// Project configuration branch.
pub const REFS_CONFIG: &str = "refs/meta/config";

pub const REFS_GROUPS: &str = "refs/groups/";
pub const REFS_DELETED_GROUPS: &str = "refs/deleted-groups/";
pub const REFS_GROUPNAMES: &str = "refs/meta/group-names";

/// Magic branch prefix for creating or updating reviews.
pub const NEW_CHANGE: &str = "refs/for/";

/// Pseudo files that appear in diffs but are not part of the tree.
pub const MAGIC_PATHS: &[&str] = &["/COMMIT_MSG", "/MERGE_LIST", "/PATCHSET_LEVEL"];

fn new_patch_set_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^refs/changes/(?:[0-9][0-9]/)?([1-9][0-9]*)(?:/[1-9][0-9]*)?$")
            .expect("new patch set pattern is valid")
    })
}

/// Whether `ref_name` pushes for review (`refs/for/...`).
pub fn is_magic_branch(ref_name: &str) -> bool {
    ref_name.starts_with(NEW_CHANGE)
}

/// Change number targeted by a `refs/changes/[XX/]N[/PS]` push, if any.
pub fn new_patch_set_change(ref_name: &str) -> Option<u32> {
    new_patch_set_pattern()
        .captures(ref_name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

pub fn is_group_ref(ref_name: &str) -> bool {
    ref_name.starts_with(REFS_GROUPS)
        || ref_name.starts_with(REFS_DELETED_GROUPS)
        || ref_name == REFS_GROUPNAMES
}

pub fn is_magic_path(path: &str) -> bool {
    MAGIC_PATHS.contains(&path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_branch() {
        assert!(is_magic_branch("refs/for/main"));
        assert!(is_magic_branch("refs/for/main%topic=x"));
        assert!(!is_magic_branch("refs/heads/main"));
    }

    #[test]
    fn new_patch_set_refs() {
        assert_eq!(new_patch_set_change("refs/changes/34/1234/2"), Some(1234));
        assert_eq!(new_patch_set_change("refs/changes/1234"), Some(1234));
        assert_eq!(new_patch_set_change("refs/changes/34/1234"), Some(1234));
        assert_eq!(new_patch_set_change("refs/changes/0123"), None);
        assert_eq!(new_patch_set_change("refs/changes/34/1234/0"), None);
        assert_eq!(new_patch_set_change("refs/heads/main"), None);
    }

    #[test]
    fn group_refs() {
        assert!(is_group_ref("refs/groups/ab/abcdef"));
        assert!(is_group_ref("refs/deleted-groups/ab/abcdef"));
        assert!(is_group_ref(REFS_GROUPNAMES));
        assert!(!is_group_ref("refs/heads/main"));
    }

    #[test]
    fn magic_paths() {
        assert!(is_magic_path("/COMMIT_MSG"));
        assert!(is_magic_path("/MERGE_LIST"));
        assert!(!is_magic_path("src/lib.rs"));
    }
}
