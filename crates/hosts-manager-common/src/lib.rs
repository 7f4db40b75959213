//! Shared model for hosts-manager
//!
//! - [`Entry`]: one record of a hosts file and its canonical textual form
//! - [`validation`]: address and hostname checks applied at the request boundary

pub mod entry;
pub mod validation;

pub use entry::{Entry, COMMENT_MARKER};
pub use validation::{
    is_ip_address, validate_address, validate_entry, validate_hostname, validate_line_format,
    ValidationError, ValidationResult,
};
