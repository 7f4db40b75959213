//! Hosts line parsing
//!
//! Format, one record per line:
//!
//! ```text
//! 127.0.0.1   localhost localhost.localdomain   # loopback
//! #10.0.0.5   staging.local                      # disabled entry
//! # a plain comment
//! ```
//!
//! A line starting with `#` is a disabled entry only if the first token after
//! the marker is an IP address and at least one name follows. Everything else
//! that does not yield an address and a name is not an entry.

use hosts_manager_common::{is_ip_address, Entry, COMMENT_MARKER};

/// Line terminator style of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    /// Style of the first terminated line; `Lf` if there is none
    pub fn detect(text: &str) -> Self {
        match text.find('\n') {
            Some(i) if text[..i].ends_with('\r') => Self::CrLf,
            _ => Self::Lf,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

/// Split file text into physical lines without terminators
///
/// Returns the lines and whether the text ended with a terminator.
pub fn split_lines(text: &str) -> (Vec<&str>, bool) {
    if text.is_empty() {
        return (Vec::new(), true);
    }

    let terminated = text.ends_with('\n');
    let body = text.strip_suffix('\n').unwrap_or(text);
    let lines = body
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect();
    (lines, terminated)
}

/// Parse one physical line into an entry positioned at `line`
///
/// Returns `None` for blank lines, plain comments and malformed lines.
pub fn parse_line(raw: &str, line: usize) -> Option<Entry> {
    let trimmed = raw.trim();

    let (enabled, body) = match trimmed.strip_prefix(COMMENT_MARKER) {
        Some(rest) => (false, rest.trim_start()),
        None => (true, trimmed),
    };

    let (fields, comment) = match body.split_once(COMMENT_MARKER) {
        Some((fields, comment)) => (fields, Some(comment.trim())),
        None => (body, None),
    };

    let mut tokens = fields.split_whitespace();
    let address = tokens.next()?;
    let names: Vec<&str> = tokens.collect();
    if names.is_empty() {
        return None;
    }
    if !enabled && !is_ip_address(address) {
        return None;
    }

    Some(Entry {
        address: address.to_string(),
        hostname: names.join(" "),
        comment: comment.filter(|c| !c.is_empty()).map(str::to_string),
        enabled,
        line: Some(line),
    })
}
