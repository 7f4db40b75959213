//! Host entry model
//!
//! An [`Entry`] is one record of a hosts file. Its canonical textual form
//! (the [`Display`](std::fmt::Display) output) is used both when writing the
//! entry back to disk and when deciding whether two entries are the same.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker that starts a comment, and prefixes disabled entries
pub const COMMENT_MARKER: char = '#';

/// A single record of a hosts file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Network address, kept as an opaque token
    pub address: String,
    /// Hostname; aliases on the same line are separated by a single space
    pub hostname: String,
    /// Trailing free text after the comment marker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Disabled entries are written as commented-out lines
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// 1-based line number at load time
    ///
    /// Only an identity hint: it becomes stale as soon as the file is
    /// rewritten. New entries have no line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

fn default_enabled() -> bool {
    true
}

impl Entry {
    pub fn new(address: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            hostname: hostname.into(),
            comment: None,
            enabled: true,
            line: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// The canonical textual form of this entry
    pub fn canonical(&self) -> String {
        self.to_string()
    }

    /// True if both entries have the same canonical form, ignoring lines
    pub fn is_identical(&self, other: &Entry) -> bool {
        self.canonical() == other.canonical()
    }

    /// Individual names listed in `hostname`
    pub fn hostnames(&self) -> impl Iterator<Item = &str> {
        self.hostname.split_whitespace()
    }

    /// Copy address, hostname, comment and enabled flag from `other`
    ///
    /// The line number is left untouched.
    pub fn assign_fields(&mut self, other: &Entry) {
        self.address = other.address.clone();
        self.hostname = other.hostname.clone();
        self.comment = other.comment.clone();
        self.enabled = other.enabled;
    }

    fn comment_text(&self) -> Option<&str> {
        self.comment
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// Canonical form: `[#]<address> <hostname>[ # <comment>]`
impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.enabled {
            write!(f, "{}", COMMENT_MARKER)?;
        }
        write!(f, "{}", self.address.trim())?;
        for name in self.hostnames() {
            write!(f, " {}", name)?;
        }
        if let Some(comment) = self.comment_text() {
            write!(f, " {} {}", COMMENT_MARKER, comment)?;
        }
        Ok(())
    }
}
