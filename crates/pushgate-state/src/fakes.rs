//! In-memory fakes for the collaborator traits (testing and dry runs)
//!
//! Provides `MemoryPermissionBackend`, `MemoryProjectCache`,
//! `MemoryProjectConfigLoader`, `MemoryDiffOperations`, `MemoryBannedCommits`,
//! `MemoryMetrics`, `StaticUrlFormatter` and `SimpleApprovalQueryBuilder`
//! that satisfy the trait contracts without any external dependencies.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{ConfigLoadError, DiffNotAvailable, PermissionBackendError, StateError};
use crate::schema::*;
use crate::storage_traits::*;

// ---------------------------------------------------------------------------
// MemoryPermissionBackend
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct PermissionState {
    granted: BTreeSet<RefPermission>,
    failing: bool,
    tested: Vec<(String, RefPermission)>,
}

/// Permission backend granting a fixed set of permissions on every ref.
///
/// Every `test` call is recorded so tests can assert which permissions a
/// validator consulted.
#[derive(Debug, Clone, Default)]
pub struct MemoryPermissionBackend {
    state: Arc<Mutex<PermissionState>>,
}

impl MemoryPermissionBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn granting(permissions: impl IntoIterator<Item = RefPermission>) -> Self {
        let backend = Self::new();
        backend.state.lock().unwrap().granted.extend(permissions);
        backend
    }

    /// Backend whose every evaluation fails.
    pub fn failing() -> Self {
        let backend = Self::new();
        backend.state.lock().unwrap().failing = true;
        backend
    }

    pub fn grant(&self, permission: RefPermission) {
        self.state.lock().unwrap().granted.insert(permission);
    }

    /// All `(ref, permission)` pairs evaluated so far.
    pub fn tested(&self) -> Vec<(String, RefPermission)> {
        self.state.lock().unwrap().tested.clone()
    }
}

impl ProjectPermissions for MemoryPermissionBackend {
    fn for_ref(&self, ref_name: &str) -> Arc<dyn RefPermissions> {
        Arc::new(MemoryRefPermissions {
            ref_name: ref_name.to_string(),
            state: self.state.clone(),
        })
    }
}

struct MemoryRefPermissions {
    ref_name: String,
    state: Arc<Mutex<PermissionState>>,
}

#[async_trait]
impl RefPermissions for MemoryRefPermissions {
    fn ref_name(&self) -> &str {
        &self.ref_name
    }

    async fn test(&self, permission: RefPermission) -> Result<bool, PermissionBackendError> {
        let mut state = self.state.lock().unwrap();
        state.tested.push((self.ref_name.clone(), permission));
        if state.failing {
            return Err(PermissionBackendError(format!(
                "cannot evaluate {} on {}",
                permission.name(),
                self.ref_name
            )));
        }
        Ok(state.granted.contains(&permission))
    }
}

// ---------------------------------------------------------------------------
// MemoryProjectCache
// ---------------------------------------------------------------------------

/// Project cache backed by a `HashMap<ProjectName, ProjectState>`.
#[derive(Debug, Default)]
pub struct MemoryProjectCache {
    projects: Mutex<HashMap<ProjectName, ProjectState>>,
}

impl MemoryProjectCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(self, state: ProjectState) -> Self {
        self.insert(state);
        self
    }

    pub fn insert(&self, state: ProjectState) {
        let mut projects = self.projects.lock().unwrap();
        projects.insert(state.name.clone(), state);
    }
}

impl ProjectCache for MemoryProjectCache {
    fn get(&self, project: &ProjectName) -> Option<ProjectState> {
        self.projects.lock().unwrap().get(project).cloned()
    }
}

// ---------------------------------------------------------------------------
// MemoryProjectConfigLoader
// ---------------------------------------------------------------------------

/// Config loader serving pre-registered configs keyed by `(project, revision)`.
///
/// Unknown revisions fail with `ConfigLoadError::Io`.
#[derive(Debug, Default)]
pub struct MemoryProjectConfigLoader {
    configs: Mutex<HashMap<(ProjectName, ObjectId), Result<ProjectConfig, ConfigLoadError>>>,
}

impl MemoryProjectConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, revision: ObjectId, config: ProjectConfig) {
        let mut configs = self.configs.lock().unwrap();
        configs.insert((config.project.clone(), revision), Ok(config));
    }

    pub fn insert_error(&self, project: ProjectName, revision: ObjectId, err: ConfigLoadError) {
        let mut configs = self.configs.lock().unwrap();
        configs.insert((project, revision), Err(err));
    }
}

#[async_trait]
impl ProjectConfigLoader for MemoryProjectConfigLoader {
    async fn load(
        &self,
        project: &ProjectName,
        revision: &ObjectId,
    ) -> Result<ProjectConfig, ConfigLoadError> {
        let configs = self.configs.lock().unwrap();
        configs
            .get(&(project.clone(), revision.clone()))
            .cloned()
            .unwrap_or_else(|| {
                Err(ConfigLoadError::Io(format!(
                    "no project.config for {} at {}",
                    project, revision
                )))
            })
    }
}

// ---------------------------------------------------------------------------
// MemoryDiffOperations
// ---------------------------------------------------------------------------

/// Diff provider serving pre-registered file lists per commit.
///
/// Commits without a registered entry are reported as not available.
#[derive(Debug, Default)]
pub struct MemoryDiffOperations {
    files: Mutex<HashMap<ObjectId, Vec<ModifiedFile>>>,
    calls: Mutex<u64>,
}

impl MemoryDiffOperations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, commit: ObjectId, files: Vec<ModifiedFile>) {
        self.files.lock().unwrap().insert(commit, files);
    }

    /// Register `count` added files (`file-0`, `file-1`, ...) for `commit`.
    pub fn insert_count(&self, commit: ObjectId, count: usize) {
        let files = (0..count)
            .map(|i| ModifiedFile::added(format!("file-{i}")))
            .collect();
        self.insert(commit, files);
    }

    /// Number of `modified_files` calls served so far.
    pub fn calls(&self) -> u64 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl DiffOperations for MemoryDiffOperations {
    async fn modified_files(
        &self,
        _project: &ProjectName,
        commit: &ObjectId,
        _parent: usize,
    ) -> Result<Vec<ModifiedFile>, DiffNotAvailable> {
        *self.calls.lock().unwrap() += 1;
        self.files
            .lock()
            .unwrap()
            .get(commit)
            .cloned()
            .ok_or_else(|| DiffNotAvailable(format!("no diff for {}", commit)))
    }
}

// ---------------------------------------------------------------------------
// MemoryBannedCommits
// ---------------------------------------------------------------------------

/// Ban index backed by a `HashSet<ObjectId>`.
#[derive(Debug, Default)]
pub struct MemoryBannedCommits {
    banned: Mutex<HashSet<ObjectId>>,
    failing: bool,
}

impl MemoryBannedCommits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index whose reads always fail.
    pub fn failing() -> Self {
        Self {
            banned: Mutex::new(HashSet::new()),
            failing: true,
        }
    }

    pub fn ban(&self, commit: ObjectId) {
        self.banned.lock().unwrap().insert(commit);
    }
}

#[async_trait]
impl BannedCommits for MemoryBannedCommits {
    async fn contains(&self, commit: &ObjectId) -> Result<bool, StateError> {
        if self.failing {
            return Err(StateError::Read("reject-commits notes unreadable".to_string()));
        }
        Ok(self.banned.lock().unwrap().contains(commit))
    }
}

// ---------------------------------------------------------------------------
// MemoryMetrics
// ---------------------------------------------------------------------------

/// One recorded counter increment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricIncrement {
    pub metric: String,
    pub fields: Vec<(String, String)>,
}

/// Metrics sink that records every increment.
#[derive(Debug, Default)]
pub struct MemoryMetrics {
    increments: Mutex<Vec<MetricIncrement>>,
}

impl MemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increments(&self) -> Vec<MetricIncrement> {
        self.increments.lock().unwrap().clone()
    }

    pub fn count(&self, metric: &str) -> usize {
        self.increments
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.metric == metric)
            .count()
    }
}

impl MetricsSink for MemoryMetrics {
    fn increment(&self, metric: &str, fields: &[(&str, String)]) {
        self.increments.lock().unwrap().push(MetricIncrement {
            metric: metric.to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        });
    }
}

// ---------------------------------------------------------------------------
// StaticUrlFormatter
// ---------------------------------------------------------------------------

/// URL formatter with a fixed canonical web URL.
#[derive(Debug, Clone, Default)]
pub struct StaticUrlFormatter {
    web_url: Option<String>,
}

impl StaticUrlFormatter {
    /// A trailing `/` is appended when missing.
    pub fn new(web_url: Option<&str>) -> Self {
        Self {
            web_url: web_url.map(|u| {
                if u.ends_with('/') {
                    u.to_string()
                } else {
                    format!("{u}/")
                }
            }),
        }
    }
}

impl UrlFormatter for StaticUrlFormatter {
    fn web_url(&self) -> Option<String> {
        self.web_url.clone()
    }
}

// ---------------------------------------------------------------------------
// SimpleApprovalQueryBuilder
// ---------------------------------------------------------------------------

/// Minimal copy-condition parser.
///
/// Accepts `operator:value` terms joined by `AND` / `OR`, optionally negated
/// with `NOT` or `-`, grouped with balanced parentheses.
#[derive(Debug, Clone, Default)]
pub struct SimpleApprovalQueryBuilder;

impl SimpleApprovalQueryBuilder {
    const OPERATORS: &'static [&'static str] = &[
        "approverin",
        "changekind",
        "has",
        "is",
        "uploaderin",
    ];
}

impl ApprovalQueryBuilder for SimpleApprovalQueryBuilder {
    fn parse(&self, query: &str) -> Result<(), String> {
        let spaced = query.replace('(', " ( ").replace(')', " ) ");
        let mut depth = 0i32;
        let mut expect_term = true;
        for token in spaced.split_whitespace() {
            match token {
                "(" => {
                    if !expect_term {
                        return Err("unexpected '('".to_string());
                    }
                    depth += 1;
                }
                ")" => {
                    if expect_term || depth == 0 {
                        return Err("unexpected ')'".to_string());
                    }
                    depth -= 1;
                }
                "AND" | "OR" => {
                    if expect_term {
                        return Err(format!("unexpected '{token}'"));
                    }
                    expect_term = true;
                }
                "NOT" => {
                    if !expect_term {
                        return Err("unexpected 'NOT'".to_string());
                    }
                }
                term => {
                    if !expect_term {
                        return Err(format!("missing operator before '{term}'"));
                    }
                    let term = term.strip_prefix('-').unwrap_or(term);
                    let (op, value) = term
                        .split_once(':')
                        .ok_or_else(|| format!("'{term}' is not an operator:value term"))?;
                    if value.is_empty() {
                        return Err(format!("operator '{op}' needs a value"));
                    }
                    if !Self::OPERATORS.contains(&op) {
                        return Err(format!("unsupported operator '{op}'"));
                    }
                    expect_term = false;
                }
            }
        }
        if expect_term {
            return Err("incomplete query".to_string());
        }
        if depth != 0 {
            return Err("unbalanced parentheses".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_builder_accepts_valid_conditions() {
        let qb = SimpleApprovalQueryBuilder;
        assert!(qb.parse("is:MAX").is_ok());
        assert!(qb.parse("changekind:NO_CHANGE OR is:ANY").is_ok());
        assert!(qb.parse("(is:MIN OR is:MAX) AND NOT uploaderin:Admins").is_ok());
        assert!(qb.parse("-is:ANY").is_ok());
    }

    #[test]
    fn query_builder_rejects_invalid_conditions() {
        let qb = SimpleApprovalQueryBuilder;
        assert!(qb.parse("").is_err());
        assert!(qb.parse("is:").is_err());
        assert!(qb.parse("foo:bar").is_err());
        assert!(qb.parse("is:MAX OR").is_err());
        assert!(qb.parse("(is:MAX").is_err());
        assert!(qb.parse("is:MAX is:MIN").is_err());
        assert!(qb.parse("nonsense").is_err());
    }

    #[test]
    fn static_url_formatter_appends_slash() {
        let f = StaticUrlFormatter::new(Some("https://review.example.com"));
        assert_eq!(f.web_url().as_deref(), Some("https://review.example.com/"));
    }

    #[test]
    fn metrics_record_fields_in_order() {
        let m = MemoryMetrics::new();
        m.increment("validation/file_count", &[("file_count", "3".to_string())]);
        assert_eq!(m.count("validation/file_count"), 1);
        assert_eq!(m.increments()[0].fields[0].0, "file_count");
    }
}
