//! Validator and observer contracts.

use async_trait::async_trait;
use pushgate_core::{CommitReceivedEvent, PatchSetId, ValidationInfos, ValidationResult};

/// A single policy check run against a received commit.
///
/// Implementations must not mutate shared state; the same instance may be
/// invoked for many commits of one push.
#[async_trait]
pub trait CommitValidationListener: Send + Sync {
    /// Name under which the outcome is recorded. Defaults to the type's
    /// simple name.
    fn name(&self) -> &str {
        simple_type_name(std::any::type_name::<Self>())
    }

    /// Whether the check must run even when the user asked to skip
    /// validation.
    fn should_validate_all_commits(&self) -> bool {
        false
    }

    /// `Ok` accepts the commit (possibly with diagnostics), `Err` rejects it.
    async fn validate_commit(&self, event: &CommitReceivedEvent) -> ValidationResult;
}

/// Observer notified once a commit passed every validator.
#[async_trait]
pub trait CommitValidationInfoListener: Send + Sync {
    fn name(&self) -> &str {
        simple_type_name(std::any::type_name::<Self>())
    }

    /// Failures are logged by the runner and never change the validation
    /// result.
    async fn commit_validated(
        &self,
        infos: &ValidationInfos,
        event: &CommitReceivedEvent,
        patch_set: Option<&PatchSetId>,
    ) -> anyhow::Result<()>;
}

/// `a::b::Foo<c::Bar>` -> `Foo`
fn simple_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pushgate_core::CommitValidationInfo;

    struct PlainCheck;

    #[async_trait]
    impl CommitValidationListener for PlainCheck {
        async fn validate_commit(&self, _event: &CommitReceivedEvent) -> ValidationResult {
            Ok(CommitValidationInfo::no_messages())
        }
    }

    #[test]
    fn default_name_is_simple_type_name() {
        assert_eq!(PlainCheck.name(), "PlainCheck");
        assert!(!PlainCheck.should_validate_all_commits());
    }

    #[test]
    fn simple_name_strips_path_and_generics() {
        assert_eq!(simple_type_name("a::b::Foo"), "Foo");
        assert_eq!(simple_type_name("a::Foo<b::Bar>"), "Foo");
        assert_eq!(simple_type_name("Foo"), "Foo");
    }
}
