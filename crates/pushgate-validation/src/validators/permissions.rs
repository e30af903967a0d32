//! Validators gated on the pushing user's ref permissions.

use std::sync::Arc;

use async_trait::async_trait;
use pushgate_core::domain::footer::keys;
use pushgate_core::{
    CommitReceivedEvent, CommitValidationError, CommitValidationInfo, CommitValidationMessage,
    IdentifiedUser, PersonIdent, ProjectState, RefPermission, ValidationResult,
};
use pushgate_state::{PermissionCheckError, RefPermissions, UrlFormatter};
use tracing::error;

use crate::listener::CommitValidationListener;

const INTERNAL_AUTH_ERROR: &str = "internal auth error";

/// Non-throwing permission test; backend failures become internal rejections.
async fn test_permission(
    perm: &dyn RefPermissions,
    permission: RefPermission,
) -> Result<bool, CommitValidationError> {
    perm.test(permission).await.map_err(|e| {
        error!(permission = permission.name(), error = %e, "cannot check permission");
        CommitValidationError::internal(INTERNAL_AUTH_ERROR)
    })
}

/// Explains why `who`'s email address cannot be used by `user`.
///
/// `kind` is `author` or `committer`.
pub fn invalid_email(
    kind: &str,
    who: &PersonIdent,
    user: &IdentifiedUser,
    url_formatter: &dyn UrlFormatter,
) -> CommitValidationMessage {
    let mut text = format!(
        "email address {} is not registered in your account, and you lack 'forge {}' permission.\n",
        who.email, kind
    );

    if user.emails.is_empty() {
        text.push_str("You have not registered any email addresses.\n");
    } else {
        text.push_str("The following addresses are currently registered:\n");
        for address in user.email_addresses() {
            text.push_str("   ");
            text.push_str(address);
            text.push('\n');
        }
    }

    if url_formatter.settings_url("").is_some() {
        if let Some(url) = url_formatter.settings_url("EmailAddresses") {
            text.push_str("To register an email address, visit:\n");
            text.push_str(&url);
            text.push_str("\n\n");
        }
    }
    CommitValidationMessage::error(text)
}

/// Merge commits require the `Merge` permission.
pub struct UploadMergesPermissionValidator {
    perm: Arc<dyn RefPermissions>,
}

impl UploadMergesPermissionValidator {
    pub fn new(perm: Arc<dyn RefPermissions>) -> Self {
        Self { perm }
    }
}

#[async_trait]
impl CommitValidationListener for UploadMergesPermissionValidator {
    fn name(&self) -> &str {
        "UploadMergesPermissionValidator"
    }

    async fn validate_commit(&self, event: &CommitReceivedEvent) -> ValidationResult {
        if event.commit.parent_count() <= 1 {
            return Ok(CommitValidationInfo::no_messages());
        }
        if test_permission(self.perm.as_ref(), RefPermission::Merge).await? {
            Ok(CommitValidationInfo::no_messages())
        } else {
            Err(CommitValidationError::new(
                "you are not allowed to upload merges",
            ))
        }
    }
}

/// Shared logic of the author and committer checks.
async fn check_identity(
    kind: &str,
    who: &PersonIdent,
    permission: RefPermission,
    user: &IdentifiedUser,
    perm: &dyn RefPermissions,
    url_formatter: &dyn UrlFormatter,
) -> ValidationResult {
    if user.has_email_address(&who.email) {
        return Ok(CommitValidationInfo::no_messages());
    }
    if test_permission(perm, permission).await? {
        return Ok(CommitValidationInfo::no_messages());
    }
    Err(CommitValidationError::with_messages(
        format!("invalid {kind}"),
        vec![invalid_email(kind, who, user, url_formatter)],
    ))
}

/// The author must be the uploader, unless the uploader may forge authors.
pub struct AuthorUploaderValidator {
    user: IdentifiedUser,
    perm: Arc<dyn RefPermissions>,
    url_formatter: Arc<dyn UrlFormatter>,
}

impl AuthorUploaderValidator {
    pub fn new(
        user: IdentifiedUser,
        perm: Arc<dyn RefPermissions>,
        url_formatter: Arc<dyn UrlFormatter>,
    ) -> Self {
        Self {
            user,
            perm,
            url_formatter,
        }
    }
}

#[async_trait]
impl CommitValidationListener for AuthorUploaderValidator {
    fn name(&self) -> &str {
        "AuthorUploaderValidator"
    }

    async fn validate_commit(&self, event: &CommitReceivedEvent) -> ValidationResult {
        check_identity(
            "author",
            &event.commit.author,
            RefPermission::ForgeAuthor,
            &self.user,
            self.perm.as_ref(),
            self.url_formatter.as_ref(),
        )
        .await
    }
}

/// The committer must be the uploader, unless the uploader may forge
/// committers.
pub struct CommitterUploaderValidator {
    user: IdentifiedUser,
    perm: Arc<dyn RefPermissions>,
    url_formatter: Arc<dyn UrlFormatter>,
}

impl CommitterUploaderValidator {
    pub fn new(
        user: IdentifiedUser,
        perm: Arc<dyn RefPermissions>,
        url_formatter: Arc<dyn UrlFormatter>,
    ) -> Self {
        Self {
            user,
            perm,
            url_formatter,
        }
    }
}

#[async_trait]
impl CommitValidationListener for CommitterUploaderValidator {
    fn name(&self) -> &str {
        "CommitterUploaderValidator"
    }

    async fn validate_commit(&self, event: &CommitReceivedEvent) -> ValidationResult {
        check_identity(
            "committer",
            &event.commit.committer,
            RefPermission::ForgeCommitter,
            &self.user,
            self.perm.as_ref(),
            self.url_formatter.as_ref(),
        )
        .await
    }
}

/// When the project requires it, a `Signed-off-by` footer must name the
/// author, the committer or the uploader.
pub struct SignedOffByValidator {
    user: IdentifiedUser,
    perm: Arc<dyn RefPermissions>,
    project_state: ProjectState,
}

impl SignedOffByValidator {
    pub fn new(
        user: IdentifiedUser,
        perm: Arc<dyn RefPermissions>,
        project_state: ProjectState,
    ) -> Self {
        Self {
            user,
            perm,
            project_state,
        }
    }
}

#[async_trait]
impl CommitValidationListener for SignedOffByValidator {
    fn name(&self) -> &str {
        "SignedOffByValidator"
    }

    async fn validate_commit(&self, event: &CommitReceivedEvent) -> ValidationResult {
        if !self.project_state.use_signed_off_by {
            return Ok(CommitValidationInfo::no_messages());
        }

        let commit = &event.commit;
        let signed_off = commit
            .footer_lines()
            .iter()
            .filter(|f| f.matches(keys::SIGNED_OFF_BY))
            .filter_map(|f| f.email_address())
            .any(|email| {
                commit.author.email == email
                    || commit.committer.email == email
                    || self.user.has_email_address(email)
            });
        if signed_off {
            return Ok(CommitValidationInfo::no_messages());
        }

        if test_permission(self.perm.as_ref(), RefPermission::ForgeCommitter).await? {
            Ok(CommitValidationInfo::no_messages())
        } else {
            Err(CommitValidationError::new(
                "not Signed-off-by author/committer/uploader in message footer",
            ))
        }
    }
}

/// Merge commits authored by the server identity may only be pushed with
/// `ForgeServer`; users must not amend merges the server created.
pub struct AmendedGerritMergeCommitValidationListener {
    perm: Arc<dyn RefPermissions>,
    server_ident: PersonIdent,
}

impl AmendedGerritMergeCommitValidationListener {
    pub fn new(perm: Arc<dyn RefPermissions>, server_ident: PersonIdent) -> Self {
        Self { perm, server_ident }
    }
}

#[async_trait]
impl CommitValidationListener for AmendedGerritMergeCommitValidationListener {
    fn name(&self) -> &str {
        "AmendedGerritMergeCommitValidationListener"
    }

    async fn validate_commit(&self, event: &CommitReceivedEvent) -> ValidationResult {
        let commit = &event.commit;
        let author = &commit.author;
        if !commit.is_merge()
            || author.name != self.server_ident.name
            || author.email != self.server_ident.email
        {
            return Ok(CommitValidationInfo::no_messages());
        }

        match self.perm.check(RefPermission::ForgeServer).await {
            Ok(()) => Ok(CommitValidationInfo::no_messages()),
            Err(PermissionCheckError::Denied { .. }) => Err(CommitValidationError::new(format!(
                "pushing merge commit {} by {} requires '{}' permission",
                commit.id,
                self.server_ident.email,
                RefPermission::ForgeServer.name()
            ))),
            Err(PermissionCheckError::Backend(e)) => {
                error!(permission = "FORGE_SERVER", error = %e, "cannot check permission");
                Err(CommitValidationError::internal(INTERNAL_AUTH_ERROR))
            }
        }
    }
}
