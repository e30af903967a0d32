//! Change-Id footer policy.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use pushgate_core::domain::footer::keys;
use pushgate_core::domain::refs::{is_magic_branch, new_patch_set_change};
use pushgate_core::{
    server_host, Change, CommitReceivedEvent, CommitValidationError, CommitValidationInfo,
    CommitValidationMessage, IdentifiedUser, ProjectState, SshInfo, ValidationResult,
};
use pushgate_state::UrlFormatter;
use regex::Regex;
use thiserror::Error;
use tracing::error;

use crate::listener::CommitValidationListener;

const CHANGE_ID_PREFIX: &str = "Change-Id:";

const MISSING_CHANGE_ID_MSG: &str = "missing Change-Id in message footer";
const MISSING_SUBJECT_MSG: &str = "missing subject; Change-Id must be in message footer";
const CHANGE_ID_ABOVE_FOOTER_MSG: &str = "Change-Id must be in message footer";
const MULTIPLE_CHANGE_ID_MSG: &str = "multiple Change-Id lines in message footer";
const INVALID_CHANGE_ID_MSG: &str = "invalid Change-Id line format in message footer";
const CHANGE_ID_MISMATCH_MSG: &str =
    "Change-Id in message footer does not match Change-Id of target change";

const SCP_FLAG_HINT: &str =
    "(for OpenSSH >= 9.0 you need to add the flag '-O' to the scp command)";

fn change_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^I[0-9a-f]{40}$").expect("valid Change-Id regex"))
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^I00*$").expect("valid placeholder regex"))
}

/// Whether `value` (trimmed) is a well-formed Change-Id.
pub fn is_valid_change_id(value: &str) -> bool {
    change_id_pattern().is_match(value.trim())
}

/// The commit-msg hook installation hint could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HintError {
    #[error("canonical web URL is not configured")]
    MissingWebUrl,

    #[error("invalid SSH host key address: {0}")]
    InvalidHostKey(String),
}

/// Shell command(s) that install the commit-msg hook.
///
/// A configured `install_command` wins. Without SSH host keys the HTTP(S)
/// command is returned; otherwise an `scp` command built from the first host
/// key, followed by the HTTP(S) alternative.
pub fn commit_msg_hook_installation_hint(
    install_command: Option<&str>,
    ssh_info: &SshInfo,
    web_url: Option<&str>,
    user_name: Option<&str>,
) -> Result<String, HintError> {
    if let Some(cmd) = install_command {
        return Ok(cmd.to_string());
    }

    let web_url = web_url.ok_or(HintError::MissingWebUrl)?;
    let http_hook = format!(
        "f=\"$(git rev-parse --git-dir)/hooks/commit-msg\"; curl -o \"$f\" {web_url}tools/hooks/commit-msg ; chmod +x \"$f\""
    );

    let Some(key) = ssh_info.host_keys.first() else {
        return Ok(http_hook);
    };

    let (ssh_host, ssh_port) = match key.host.rfind(':') {
        Some(c) => {
            let port: u16 = key.host[c + 1..]
                .parse()
                .map_err(|_| HintError::InvalidHostKey(key.host.clone()))?;
            let host = if key.host.starts_with("*:") {
                server_host(Some(web_url))
            } else {
                key.host[..c].to_string()
            };
            (host, port)
        }
        None => (key.host.clone(), 22),
    };

    let ssh_hook = format!(
        "gitdir=$(git rev-parse --git-dir); scp -p -P {ssh_port} {}@{ssh_host}:hooks/commit-msg ${{gitdir}}/hooks/",
        user_name.unwrap_or("<USERNAME>")
    );
    Ok(format!(
        "  {ssh_hook}\n{SCP_FLAG_HINT}\nor, for http(s):\n  {http_hook}"
    ))
}

/// Requires a single well-formed `Change-Id` footer on commits pushed for
/// review.
pub struct ChangeIdValidator {
    project_state: ProjectState,
    user: IdentifiedUser,
    url_formatter: Arc<dyn UrlFormatter>,
    install_commit_msg_hook_command: Option<String>,
    ssh_info: SshInfo,
    change: Option<Change>,
}

impl ChangeIdValidator {
    pub fn new(
        project_state: ProjectState,
        user: IdentifiedUser,
        url_formatter: Arc<dyn UrlFormatter>,
        install_commit_msg_hook_command: Option<String>,
        ssh_info: SshInfo,
        change: Option<Change>,
    ) -> Self {
        Self {
            project_state,
            user,
            url_formatter,
            install_commit_msg_hook_command,
            ssh_info,
            change,
        }
    }

    fn should_validate(event: &CommitReceivedEvent) -> bool {
        is_magic_branch(event.ref_name()) || new_patch_set_change(event.ref_name()).is_some()
    }

    /// Rejection carrying the hook installation hint.
    fn reject_with_hook_hint(&self, reason: &str) -> CommitValidationError {
        let web_url = self.url_formatter.web_url();
        let hint = match commit_msg_hook_installation_hint(
            self.install_commit_msg_hook_command.as_deref(),
            &self.ssh_info,
            web_url.as_deref(),
            self.user.user_name.as_deref(),
        ) {
            Ok(hint) => hint,
            Err(e) => {
                error!(error = %e, "cannot build commit-msg hook installation hint");
                return CommitValidationError::internal(reason);
            }
        };
        let message = format!(
            "{reason}\n\nHint: to automatically insert a Change-Id, install the hook:\n{hint}\nand then amend the commit:\n  git commit --amend --no-edit\nFinally, push your changes again\n"
        );
        CommitValidationError::with_messages(reason, vec![CommitValidationMessage::error(message)])
    }

    fn reject_multiple(ids: &[String]) -> CommitValidationError {
        let listing = ids
            .iter()
            .map(|id| {
                let tag = if is_valid_change_id(id) {
                    "VALID"
                } else {
                    "INVALID"
                };
                format!("* {id} [{tag}]")
            })
            .collect::<Vec<_>>()
            .join("\n");
        let message = format!(
            "{MULTIPLE_CHANGE_ID_MSG}\n\nHint: the following Change-Ids were found:\n{listing}\n"
        );
        CommitValidationError::with_messages(
            MULTIPLE_CHANGE_ID_MSG,
            vec![CommitValidationMessage::error(message)],
        )
    }
}

#[async_trait]
impl CommitValidationListener for ChangeIdValidator {
    fn name(&self) -> &str {
        "ChangeIdValidator"
    }

    async fn validate_commit(&self, event: &CommitReceivedEvent) -> ValidationResult {
        if !Self::should_validate(event) {
            return Ok(CommitValidationInfo::no_messages());
        }

        let commit = &event.commit;
        let ids = commit.footer_values(keys::CHANGE_ID);

        match ids.as_slice() {
            [] => {
                let subject = commit.subject();
                if let Some(rest) = subject.strip_prefix(CHANGE_ID_PREFIX) {
                    if is_valid_change_id(rest) {
                        return Err(CommitValidationError::new(MISSING_SUBJECT_MSG));
                    }
                }
                if commit.message.contains(&format!("\n{CHANGE_ID_PREFIX}")) {
                    let message = format!(
                        "{CHANGE_ID_ABOVE_FOOTER_MSG}\n\nHint: run\n  git commit --amend\nand move 'Change-Id: Ixxx..' to the bottom on a separate line\n"
                    );
                    return Err(CommitValidationError::with_messages(
                        CHANGE_ID_ABOVE_FOOTER_MSG,
                        vec![CommitValidationMessage::error(message)],
                    ));
                }
                if self.project_state.require_change_id {
                    return Err(self.reject_with_hook_hint(MISSING_CHANGE_ID_MSG));
                }
            }
            [id] => {
                let id = id.trim();
                if !is_valid_change_id(id) || placeholder_pattern().is_match(id) {
                    return Err(self.reject_with_hook_hint(INVALID_CHANGE_ID_MSG));
                }
                if let Some(change) = &self.change {
                    if change.key != id {
                        return Err(CommitValidationError::new(CHANGE_ID_MISMATCH_MSG));
                    }
                }
            }
            many => return Err(Self::reject_multiple(many)),
        }

        Ok(CommitValidationInfo::no_messages())
    }
}
