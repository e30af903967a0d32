//! The acting (pushing) user.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Numeric account identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub u32);

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An authenticated user with their registered email addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifiedUser {
    pub account_id: AccountId,
    /// Login name, used for SSH commands.
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub emails: BTreeSet<String>,
}

impl IdentifiedUser {
    pub fn new(account_id: u32) -> Self {
        Self {
            account_id: AccountId(account_id),
            user_name: None,
            display_name: None,
            emails: BTreeSet::new(),
        }
    }

    pub fn with_user_name(mut self, user_name: impl Into<String>) -> Self {
        self.user_name = Some(user_name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.emails.insert(email.into());
        self
    }

    pub fn has_email_address(&self, email: &str) -> bool {
        self.emails.contains(email)
    }

    /// Registered addresses in sorted order.
    pub fn email_addresses(&self) -> impl Iterator<Item = &str> {
        self.emails.iter().map(String::as_str)
    }

    /// Name safe to put in logs.
    pub fn loggable_name(&self) -> String {
        self.user_name
            .clone()
            .or_else(|| self.display_name.clone())
            .unwrap_or_else(|| format!("a/{}", self.account_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_lookup_is_exact() {
        let user = IdentifiedUser::new(1).with_email("me@example.com");
        assert!(user.has_email_address("me@example.com"));
        assert!(!user.has_email_address("other@example.com"));
    }

    #[test]
    fn loggable_name_fallbacks() {
        assert_eq!(IdentifiedUser::new(7).loggable_name(), "a/7");
        assert_eq!(
            IdentifiedUser::new(7).with_user_name("jdoe").loggable_name(),
            "jdoe"
        );
    }
}
