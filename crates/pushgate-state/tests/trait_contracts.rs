//! Trait contract tests for the collaborator traits.
//!
//! These tests verify the behavioral contracts of the collaborator traits
//! using the in-memory fakes. Any conforming implementation must pass these.

use pushgate_state::fakes::{
    MemoryBannedCommits, MemoryDiffOperations, MemoryPermissionBackend, MemoryProjectCache,
    MemoryProjectConfigLoader,
};
use pushgate_state::storage_traits::*;
use pushgate_state::{
    ConfigLoadError, ObjectId, PermissionCheckError, ProjectConfig, ProjectName, ProjectState,
    RefPermission,
};

fn oid(c: char) -> ObjectId {
    ObjectId::parse(&c.to_string().repeat(40)).unwrap()
}

// ===========================================================================
// Permission backend
// ===========================================================================

#[tokio::test]
async fn permission_test_reports_grants() {
    let backend = MemoryPermissionBackend::granting([RefPermission::Merge]);
    let perm = backend.for_ref("refs/heads/main");

    assert!(perm.test(RefPermission::Merge).await.unwrap());
    assert!(!perm.test(RefPermission::ForgeAuthor).await.unwrap());
    assert_eq!(perm.ref_name(), "refs/heads/main");
}

#[tokio::test]
async fn permission_check_denial_is_distinct_from_failure() {
    let backend = MemoryPermissionBackend::new();
    let err = backend
        .for_ref("refs/heads/main")
        .check(RefPermission::ForgeServer)
        .await
        .unwrap_err();
    assert!(matches!(err, PermissionCheckError::Denied { .. }));
    assert!(err.to_string().contains("forge server"));

    let failing = MemoryPermissionBackend::failing();
    let err = failing
        .for_ref("refs/heads/main")
        .check(RefPermission::ForgeServer)
        .await
        .unwrap_err();
    assert!(matches!(err, PermissionCheckError::Backend(_)));
}

#[tokio::test]
async fn permission_evaluations_are_recorded() {
    let backend = MemoryPermissionBackend::new();
    let perm = backend.for_ref("refs/for/main");
    let _ = perm.test(RefPermission::ForgeCommitter).await;

    assert_eq!(
        backend.tested(),
        vec![("refs/for/main".to_string(), RefPermission::ForgeCommitter)]
    );
}

// ===========================================================================
// Project data
// ===========================================================================

#[test]
fn project_cache_lookup() {
    let cache = MemoryProjectCache::new().with_project(ProjectState::active(ProjectName::new("p")));
    assert!(cache.get(&ProjectName::new("p")).is_some());
    assert!(cache.get(&ProjectName::new("q")).is_none());
}

#[tokio::test]
async fn config_loader_serves_registered_revision() {
    let loader = MemoryProjectConfigLoader::new();
    let project = ProjectName::new("p");
    loader.insert(oid('a'), ProjectConfig::new(project.clone()));

    let cfg = loader.load(&project, &oid('a')).await.unwrap();
    assert_eq!(cfg.project, project);

    let err = loader.load(&project, &oid('b')).await.unwrap_err();
    assert!(matches!(err, ConfigLoadError::Io(_)));
}

#[tokio::test]
async fn config_loader_returns_registered_errors() {
    let loader = MemoryProjectConfigLoader::new();
    let project = ProjectName::new("p");
    loader.insert_error(
        project.clone(),
        oid('c'),
        ConfigLoadError::Invalid("bad key".to_string()),
    );

    let err = loader.load(&project, &oid('c')).await.unwrap_err();
    assert_eq!(err.user_message(), Some("bad key"));
}

#[tokio::test]
async fn diff_unknown_commit_is_not_available() {
    let diff = MemoryDiffOperations::new();
    diff.insert_count(oid('d'), 3);
    let project = ProjectName::new("p");

    assert_eq!(diff.modified_files(&project, &oid('d'), 0).await.unwrap().len(), 3);
    assert!(diff.modified_files(&project, &oid('e'), 0).await.is_err());
    assert_eq!(diff.calls(), 2);
}

#[tokio::test]
async fn banned_commit_index() {
    let banned = MemoryBannedCommits::new();
    banned.ban(oid('f'));

    assert!(banned.contains(&oid('f')).await.unwrap());
    assert!(!banned.contains(&oid('a')).await.unwrap());
    assert!(MemoryBannedCommits::failing().contains(&oid('a')).await.is_err());
}
