//! The commit under validation.

use pushgate_state::ObjectId;
use serde::{Deserialize, Serialize};

use super::footer::{parse_footer_lines, FooterLine};

/// Name and email of an author or committer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonIdent {
    pub name: String,
    pub email: String,
}

impl PersonIdent {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

impl std::fmt::Display for PersonIdent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// A parsed commit object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub id: ObjectId,
    #[serde(default)]
    pub parents: Vec<ObjectId>,
    pub author: PersonIdent,
    pub committer: PersonIdent,
    /// Full commit message, including the subject line.
    pub message: String,
}

impl Commit {
    pub fn parent_count(&self) -> usize {
        self.parents.len()
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// First paragraph of the message with line breaks folded to spaces.
    pub fn subject(&self) -> String {
        let first_paragraph = self
            .message
            .split("\n\n")
            .next()
            .unwrap_or_default()
            .trim();
        first_paragraph
            .lines()
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn footer_lines(&self) -> Vec<FooterLine> {
        parse_footer_lines(&self.message)
    }

    /// Values of all footers whose key matches `key` (case-insensitive).
    pub fn footer_values(&self, key: &str) -> Vec<String> {
        self.footer_lines()
            .into_iter()
            .filter(|f| f.matches(key))
            .map(|f| f.value)
            .collect()
    }
}
