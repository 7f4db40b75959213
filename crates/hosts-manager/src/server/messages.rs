//! Request and response payloads
//!
//! Requests are a tagged enum decided at the boundary; the reconciler only
//! ever sees a decoded [`Batch`]. Both sides serialize with serde, e.g.:
//!
//! ```json
//! {"kind": "edit",
//!  "original_entries": [{"address": "10.0.0.1", "hostname": "a.local", "line": 3}],
//!  "changed_entries":  [{"address": "10.0.0.2", "hostname": "a.local"}]}
//! ```

use crate::server::reconcile::{Batch, EntryEdit};
use hosts_manager_common::{validate_entry, Entry, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("edit request has {original} original entries but {changed} changed entries")]
    MismatchedEdit { original: usize, changed: usize },

    #[error("entry {index}: {source}")]
    InvalidEntry {
        index: usize,
        #[source]
        source: ValidationError,
    },
}

/// A client submission as it arrives over the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BatchRequest {
    Add {
        entries: Vec<Entry>,
    },
    /// Positionally paired lists of the same length
    Edit {
        original_entries: Vec<Entry>,
        changed_entries: Vec<Entry>,
    },
    Delete {
        entries: Vec<Entry>,
    },
}

impl BatchRequest {
    /// Decode into a batch, pairing edit lists
    pub fn into_batch(self) -> Result<Batch, RequestError> {
        match self {
            Self::Add { entries } => Ok(Batch::Add(entries)),
            Self::Delete { entries } => Ok(Batch::Delete(entries)),
            Self::Edit {
                original_entries,
                changed_entries,
            } => {
                if original_entries.len() != changed_entries.len() {
                    return Err(RequestError::MismatchedEdit {
                        original: original_entries.len(),
                        changed: changed_entries.len(),
                    });
                }
                Ok(Batch::Edit(
                    original_entries
                        .into_iter()
                        .zip(changed_entries)
                        .map(|(original, changed)| EntryEdit { original, changed })
                        .collect(),
                ))
            }
        }
    }
}

/// Validate the entries a batch would write
///
/// Claims (originals and delete targets) describe what is already in the
/// file and are not checked.
pub fn validate_batch(batch: &Batch) -> Result<(), RequestError> {
    let written: Vec<&Entry> = match batch {
        Batch::Add(entries) => entries.iter().collect(),
        Batch::Edit(edits) => edits.iter().map(|e| &e.changed).collect(),
        Batch::Delete(_) => return Ok(()),
    };

    written
        .into_iter()
        .enumerate()
        .try_for_each(|(index, entry)| {
            validate_entry(entry).map_err(|source| RequestError::InvalidEntry { index, source })
        })
}

/// What the service hands back to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ServiceResponse {
    Entries { entries: Vec<Entry> },
    Ok { applied: usize },
    Error { message: String },
}

impl ServiceResponse {
    pub fn error(err: impl fmt::Display) -> Self {
        Self::Error {
            message: err.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_edit_request_json() {
        let json = r#"{
            "kind": "edit",
            "original_entries": [{"address": "10.0.0.1", "hostname": "a.local", "line": 3}],
            "changed_entries": [{"address": "10.0.0.2", "hostname": "a.local", "enabled": false}]
        }"#;

        let request: BatchRequest = serde_json::from_str(json).unwrap();
        let batch = request.into_batch().unwrap();
        match batch {
            Batch::Edit(edits) => {
                assert_eq!(edits.len(), 1);
                assert_eq!(edits[0].original.line, Some(3));
                assert!(!edits[0].changed.enabled);
            }
            other => panic!("expected Edit, got {:?}", other),
        }
    }

    #[test]
    fn test_mismatched_edit_lists() {
        let request = BatchRequest::Edit {
            original_entries: vec![Entry::new("10.0.0.1", "a").at_line(1)],
            changed_entries: vec![],
        };
        assert!(matches!(
            request.into_batch(),
            Err(RequestError::MismatchedEdit {
                original: 1,
                changed: 0
            })
        ));
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let json = r#"{"kind": "rename", "entries": []}"#;
        assert!(serde_json::from_str::<BatchRequest>(json).is_err());
    }

    #[test]
    fn test_validate_batch() {
        let good = Batch::Add(vec![Entry::new("10.0.0.1", "a.local")]);
        assert!(validate_batch(&good).is_ok());

        let bad = Batch::Add(vec![
            Entry::new("10.0.0.1", "a.local"),
            Entry::new("10.0.0.300", "b.local"),
        ]);
        assert!(matches!(
            validate_batch(&bad),
            Err(RequestError::InvalidEntry { index: 1, .. })
        ));

        // Claims are not validated
        let delete = Batch::Delete(vec![Entry::new("whatever", "bad_name").at_line(1)]);
        assert!(validate_batch(&delete).is_ok());

        let edit = Batch::Edit(vec![EntryEdit {
            original: Entry::new("legacy", "old_name").at_line(1),
            changed: Entry::new("10.0.0.1", "new-name"),
        }]);
        assert!(validate_batch(&edit).is_ok());
    }

    #[test]
    fn test_response_serialization() {
        let json = serde_json::to_value(ServiceResponse::Ok { applied: 2 }).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["applied"], 2);

        let err = ServiceResponse::error("file has changed; please reload");
        assert!(err.is_error());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "file has changed; please reload");
    }
}
