//! Commit message trailer ("footer") parsing.
//!
//! Footer lines are the `Key: value` lines of the last paragraph of a commit
//! message. The subject line is never a footer, and lines of the last
//! paragraph that are not well-formed `Key:` lines are skipped.

use serde::{Deserialize, Serialize};

/// Well-known footer keys.
pub mod keys {
    pub const CHANGE_ID: &str = "Change-Id";
    pub const SIGNED_OFF_BY: &str = "Signed-off-by";
}

/// A single `Key: value` trailer line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FooterLine {
    pub key: String,
    pub value: String,
}

impl FooterLine {
    /// Case-insensitive key comparison.
    pub fn matches(&self, key: &str) -> bool {
        self.key.eq_ignore_ascii_case(key)
    }

    /// Email address carried by the value.
    ///
    /// `Name <addr>` yields `addr`; a bare value is returned when it contains
    /// an `@`. Anything else has no address.
    pub fn email_address(&self) -> Option<&str> {
        match self.value.find('<') {
            Some(lt) => {
                let rest = &self.value[lt + 1..];
                rest.find('>').map(|gt| &rest[..gt])
            }
            None => {
                let v = self.value.trim();
                v.contains('@').then_some(v)
            }
        }
    }
}

/// Parse the footer lines of a full commit message, in message order.
pub fn parse_footer_lines(message: &str) -> Vec<FooterLine> {
    let lines: Vec<&str> = message.trim_end_matches('\n').split('\n').collect();
    let mut footers = Vec::new();

    // Walk upwards from the last line; line 0 is the subject.
    for line in lines.iter().skip(1).rev() {
        if line.trim().is_empty() {
            break;
        }
        if let Some(footer) = parse_footer_line(line) {
            footers.push(footer);
        }
    }
    footers.reverse();
    footers
}

fn parse_footer_line(line: &str) -> Option<FooterLine> {
    let colon = line.find(':')?;
    let key = &line[..colon];
    if key.is_empty()
        || !key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-')
    {
        return None;
    }
    let value = line[colon + 1..].trim();
    Some(FooterLine {
        key: key.to_string(),
        value: value.to_string(),
    })
}
