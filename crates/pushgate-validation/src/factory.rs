//! Assembly of validator chains per push scenario.

use std::sync::Arc;

use pushgate_core::{
    BranchNameKey, Change, IdentifiedUser, ProjectName, ProjectState, SshInfo, ValidationConfig,
};
use pushgate_state::{
    ApprovalQueryBuilder, BannedCommits, MetricsSink, ProjectCache, ProjectConfigLoader,
    ProjectPermissions, UrlFormatter,
};
use thiserror::Error;
use tracing::debug;

use crate::listener::{CommitValidationInfoListener, CommitValidationListener};
use crate::pipeline::CommitValidators;
use crate::skip::SkippablePluginValidator;
use crate::validators::{
    AmendedGerritMergeCommitValidationListener, AuthorUploaderValidator, BannedCommitsValidator,
    ChangeIdValidator, CommitterUploaderValidator, ConfigValidator, FileCountValidator,
    GroupCommitValidator, LabelConfigValidator, ProjectStateValidationListener,
    SignedOffByValidator, UploadMergesPermissionValidator,
};

/// A validator chain could not be assembled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblyError {
    #[error("project not found in cache: {0}")]
    ProjectNotFound(ProjectName),
}

/// Inputs for validating commits received from a client push.
pub struct ReceiveCommitsRequest {
    pub permissions: Arc<dyn ProjectPermissions>,
    pub branch: BranchNameKey,
    pub user: IdentifiedUser,
    pub ssh_info: SshInfo,
    pub banned_commits: Arc<dyn BannedCommits>,
    /// Review being updated, if any.
    pub change: Option<Change>,
    /// The user asked to bypass plugin validation.
    pub skip_validation: bool,
}

/// Inputs for validating commits created by the server itself (e.g. edits,
/// rebases, cherry-picks).
pub struct GerritCommitsRequest {
    pub permissions: Arc<dyn ProjectPermissions>,
    pub branch: BranchNameKey,
    pub user: IdentifiedUser,
    pub ssh_info: SshInfo,
    pub change: Option<Change>,
}

/// Inputs for creating reviews of already merged commits.
pub struct MergedCommitsRequest {
    pub permissions: Arc<dyn ProjectPermissions>,
    pub branch: BranchNameKey,
    pub user: IdentifiedUser,
}

/// Builds [`CommitValidators`] for each push scenario.
///
/// Holds server-wide collaborators; everything scoped to one push comes in
/// through the request.
pub struct CommitValidatorsFactory {
    config: ValidationConfig,
    url_formatter: Arc<dyn UrlFormatter>,
    project_cache: Arc<dyn ProjectCache>,
    config_loader: Arc<dyn ProjectConfigLoader>,
    metrics: Arc<dyn MetricsSink>,
    approval_query_builder: Arc<dyn ApprovalQueryBuilder>,
    plugin_validators: Vec<Arc<dyn CommitValidationListener>>,
    info_listeners: Vec<Arc<dyn CommitValidationInfoListener>>,
}

impl CommitValidatorsFactory {
    pub fn new(
        config: ValidationConfig,
        url_formatter: Arc<dyn UrlFormatter>,
        project_cache: Arc<dyn ProjectCache>,
        config_loader: Arc<dyn ProjectConfigLoader>,
        metrics: Arc<dyn MetricsSink>,
        approval_query_builder: Arc<dyn ApprovalQueryBuilder>,
    ) -> Self {
        Self {
            config,
            url_formatter,
            project_cache,
            config_loader,
            metrics,
            approval_query_builder,
            plugin_validators: Vec::new(),
            info_listeners: Vec::new(),
        }
    }

    /// Register a plugin validator. Plugins run in registration order.
    pub fn with_plugin_validator(mut self, validator: Arc<dyn CommitValidationListener>) -> Self {
        self.plugin_validators.push(validator);
        self
    }

    /// Register an observer notified after successful runs.
    pub fn with_info_listener(mut self, listener: Arc<dyn CommitValidationInfoListener>) -> Self {
        self.info_listeners.push(listener);
        self
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    fn project_state(
        &self,
        branch: &BranchNameKey,
    ) -> Result<ProjectState, AssemblyError> {
        self.project_cache
            .get(&branch.project)
            .ok_or_else(|| AssemblyError::ProjectNotFound(branch.project.clone()))
    }

    fn change_id_validator(
        &self,
        project_state: &ProjectState,
        user: &IdentifiedUser,
        ssh_info: &SshInfo,
        change: &Option<Change>,
    ) -> Arc<dyn CommitValidationListener> {
        Arc::new(ChangeIdValidator::new(
            project_state.clone(),
            user.clone(),
            self.url_formatter.clone(),
            self.config.install_commit_msg_hook_command.clone(),
            ssh_info.clone(),
            change.clone(),
        ))
    }

    fn config_validator(
        &self,
        branch: &BranchNameKey,
        user: &IdentifiedUser,
    ) -> Arc<dyn CommitValidationListener> {
        Arc::new(ConfigValidator::new(
            self.config_loader.clone(),
            branch.clone(),
            user.clone(),
            self.config.all_users.clone(),
            self.config.all_projects.clone(),
        ))
    }

    fn file_count_validator(&self) -> Arc<dyn CommitValidationListener> {
        Arc::new(FileCountValidator::new(
            self.config.max_files,
            self.url_formatter.clone(),
            self.metrics.clone(),
        ))
    }

    fn trailing_validators(&self) -> [Arc<dyn CommitValidationListener>; 2] {
        [
            Arc::new(GroupCommitValidator::new(self.config.all_users.clone())),
            Arc::new(LabelConfigValidator::new(
                self.approval_query_builder.clone(),
                self.config_loader.clone(),
            )),
        ]
    }

    fn finish(&self, validators: Vec<Arc<dyn CommitValidationListener>>) -> CommitValidators {
        let chain = CommitValidators::new(validators, self.info_listeners.clone());
        debug!(validators = ?chain.validator_names(), "assembled validator chain");
        chain
    }

    /// Chain for commits pushed by a client.
    ///
    /// Plugin validators honour `skip_validation`.
    pub fn for_receive_commits(
        &self,
        req: ReceiveCommitsRequest,
    ) -> Result<CommitValidators, AssemblyError> {
        let project_state = self.project_state(&req.branch)?;
        let perm = req.permissions.for_ref(&req.branch.branch);
        let url = &self.url_formatter;

        let mut validators: Vec<Arc<dyn CommitValidationListener>> = vec![
            Arc::new(UploadMergesPermissionValidator::new(perm.clone())),
            Arc::new(ProjectStateValidationListener::new(project_state.clone())),
            Arc::new(AmendedGerritMergeCommitValidationListener::new(
                perm.clone(),
                self.config.server_ident.clone(),
            )),
            Arc::new(AuthorUploaderValidator::new(
                req.user.clone(),
                perm.clone(),
                url.clone(),
            )),
            self.file_count_validator(),
            Arc::new(CommitterUploaderValidator::new(
                req.user.clone(),
                perm.clone(),
                url.clone(),
            )),
            Arc::new(SignedOffByValidator::new(
                req.user.clone(),
                perm,
                project_state.clone(),
            )),
            self.change_id_validator(&project_state, &req.user, &req.ssh_info, &req.change),
            self.config_validator(&req.branch, &req.user),
            Arc::new(BannedCommitsValidator::new(req.banned_commits)),
        ];
        validators.extend(self.plugin_validators.iter().map(|plugin| {
            Arc::new(SkippablePluginValidator::new(
                plugin.clone(),
                req.skip_validation,
            )) as Arc<dyn CommitValidationListener>
        }));
        validators.extend(self.trailing_validators());

        Ok(self.finish(validators))
    }

    /// Chain for commits the server creates on the user's behalf.
    ///
    /// Plugin validators always run.
    pub fn for_gerrit_commits(
        &self,
        req: GerritCommitsRequest,
    ) -> Result<CommitValidators, AssemblyError> {
        let project_state = self.project_state(&req.branch)?;
        let perm = req.permissions.for_ref(&req.branch.branch);
        let url = &self.url_formatter;

        let mut validators: Vec<Arc<dyn CommitValidationListener>> = vec![
            Arc::new(UploadMergesPermissionValidator::new(perm.clone())),
            Arc::new(ProjectStateValidationListener::new(project_state.clone())),
            Arc::new(AmendedGerritMergeCommitValidationListener::new(
                perm.clone(),
                self.config.server_ident.clone(),
            )),
            Arc::new(AuthorUploaderValidator::new(
                req.user.clone(),
                perm.clone(),
                url.clone(),
            )),
            self.file_count_validator(),
            Arc::new(SignedOffByValidator::new(
                req.user.clone(),
                perm,
                project_state.clone(),
            )),
            self.change_id_validator(&project_state, &req.user, &req.ssh_info, &req.change),
            self.config_validator(&req.branch, &req.user),
        ];
        validators.extend(self.plugin_validators.iter().cloned());
        validators.extend(self.trailing_validators());

        Ok(self.finish(validators))
    }

    /// Chain for reviews of commits that are already merged.
    ///
    /// Only permission based checks apply: nothing that would require
    /// amending the commit.
    pub fn for_merged_commits(
        &self,
        req: MergedCommitsRequest,
    ) -> Result<CommitValidators, AssemblyError> {
        let project_state = self.project_state(&req.branch)?;
        let perm = req.permissions.for_ref(&req.branch.branch);
        let url = &self.url_formatter;

        let validators: Vec<Arc<dyn CommitValidationListener>> = vec![
            Arc::new(UploadMergesPermissionValidator::new(perm.clone())),
            Arc::new(ProjectStateValidationListener::new(project_state)),
            Arc::new(AuthorUploaderValidator::new(
                req.user.clone(),
                perm.clone(),
                url.clone(),
            )),
            Arc::new(CommitterUploaderValidator::new(req.user, perm, url.clone())),
        ];

        Ok(self.finish(validators))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pushgate_state::fakes::{
        MemoryBannedCommits, MemoryMetrics, MemoryPermissionBackend, MemoryProjectCache,
        MemoryProjectConfigLoader, SimpleApprovalQueryBuilder, StaticUrlFormatter,
    };

    fn factory(cache: MemoryProjectCache) -> CommitValidatorsFactory {
        CommitValidatorsFactory::new(
            ValidationConfig::default(),
            Arc::new(StaticUrlFormatter::new(Some("https://review.example.com"))),
            Arc::new(cache),
            Arc::new(MemoryProjectConfigLoader::new()),
            Arc::new(MemoryMetrics::new()),
            Arc::new(SimpleApprovalQueryBuilder),
        )
    }

    fn branch(project: &str) -> BranchNameKey {
        BranchNameKey::new(ProjectName::new(project), "refs/heads/main")
    }

    #[test]
    fn unknown_project_is_an_assembly_error() {
        let f = factory(MemoryProjectCache::new());
        let err = f
            .for_merged_commits(MergedCommitsRequest {
                permissions: Arc::new(MemoryPermissionBackend::new()),
                branch: branch("missing"),
                user: IdentifiedUser::new(1),
            })
            .unwrap_err();
        assert_eq!(err, AssemblyError::ProjectNotFound(ProjectName::new("missing")));
    }

    #[test]
    fn receive_chain_consults_permissions_of_destination_branch() {
        let backend = MemoryPermissionBackend::new();
        let f = factory(
            MemoryProjectCache::new().with_project(ProjectState::active(ProjectName::new("p"))),
        );
        let chain = f
            .for_receive_commits(ReceiveCommitsRequest {
                permissions: Arc::new(backend.clone()),
                branch: branch("p"),
                user: IdentifiedUser::new(1),
                ssh_info: SshInfo::default(),
                banned_commits: Arc::new(MemoryBannedCommits::new()),
                change: None,
                skip_validation: false,
            })
            .unwrap();
        assert_eq!(chain.len(), 12);
        // assembly evaluates nothing
        assert!(backend.tested().is_empty());
    }
}
