//! Address and hostname checks for entries coming from clients
//!
//! The store itself treats addresses as opaque. [`validate_entry`] is applied
//! at the request boundary when validation is enabled;
//! [`validate_line_format`] is always applied before an entry is written.

use crate::entry::{Entry, COMMENT_MARKER};
use regex::Regex;
use std::net::IpAddr;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid hostname: {0}")]
    InvalidHostname(String),

    #[error("invalid comment: {0}")]
    InvalidComment(String),
}

pub type ValidationResult<T> = Result<T, ValidationError>;

// DNS label: alphanumeric and hyphens, 1-63 chars, no leading/trailing hyphen
static LABEL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?$").expect("label regex is valid")
});

/// RFC 1035 limit on the length of a full name
const MAX_HOSTNAME_LEN: usize = 253;

/// True if `token` parses as an IPv4 or IPv6 address
pub fn is_ip_address(token: &str) -> bool {
    token.parse::<IpAddr>().is_ok()
}

/// Validates an IP address (IPv4 or IPv6)
pub fn validate_address(address: &str) -> ValidationResult<IpAddr> {
    address
        .trim()
        .parse::<IpAddr>()
        .map_err(|_| ValidationError::InvalidAddress(address.to_string()))
}

/// Validates a single DNS name
///
/// - 1-253 characters in total
/// - dot-separated labels of 1-63 alphanumerics and hyphens
/// - no leading or trailing dot or hyphen
pub fn validate_hostname(hostname: &str) -> ValidationResult<()> {
    let invalid = |reason: String| Err(ValidationError::InvalidHostname(reason));

    if hostname.is_empty() {
        return invalid("hostname cannot be empty".to_string());
    }
    if hostname.len() > MAX_HOSTNAME_LEN {
        let prefix: String = hostname.chars().take(16).collect();
        return invalid(format!(
            "'{}...' exceeds maximum length of {} characters",
            prefix, MAX_HOSTNAME_LEN
        ));
    }
    if hostname.starts_with('.') || hostname.ends_with('.') {
        return invalid(format!("'{}' cannot start or end with dot", hostname));
    }

    match hostname.split('.').find(|label| !LABEL_REGEX.is_match(label)) {
        Some(label) => invalid(format!("invalid label '{}' in '{}'", label, hostname)),
        None => Ok(()),
    }
}

/// Checks that an entry renders as exactly one line that parses back to it
///
/// - address: one token, no comment marker; an IP address if disabled
/// - hostname: at least one name, none containing the comment marker
/// - comment: no line terminators
pub fn validate_line_format(entry: &Entry) -> ValidationResult<()> {
    let address = entry.address.trim();
    if address.is_empty() {
        return Err(ValidationError::InvalidAddress(
            "address cannot be empty".to_string(),
        ));
    }
    if address.contains(char::is_whitespace) || address.contains(COMMENT_MARKER) {
        return Err(ValidationError::InvalidAddress(format!(
            "{:?} must be a single token without '{}'",
            entry.address, COMMENT_MARKER
        )));
    }
    if !entry.enabled && !is_ip_address(address) {
        return Err(ValidationError::InvalidAddress(format!(
            "disabled entry needs an IP address, got '{}'",
            address
        )));
    }

    let mut names = entry.hostnames().peekable();
    if names.peek().is_none() {
        return Err(ValidationError::InvalidHostname(
            "hostname cannot be empty".to_string(),
        ));
    }
    if let Some(name) = names.find(|name| name.contains(COMMENT_MARKER)) {
        return Err(ValidationError::InvalidHostname(format!(
            "'{}' contains '{}'",
            name, COMMENT_MARKER
        )));
    }

    match &entry.comment {
        Some(comment) if comment.contains(['\n', '\r']) => Err(ValidationError::InvalidComment(
            format!("{:?} spans more than one line", comment),
        )),
        _ => Ok(()),
    }
}

/// Validates the address, every name and the comment of an entry
pub fn validate_entry(entry: &Entry) -> ValidationResult<()> {
    validate_line_format(entry)?;
    validate_address(&entry.address)?;

    let mut names = entry.hostnames().peekable();
    if names.peek().is_none() {
        return Err(ValidationError::InvalidHostname(
            "hostname cannot be empty".to_string(),
        ));
    }
    names.try_for_each(validate_hostname)
}
