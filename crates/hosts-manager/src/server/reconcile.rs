//! Batch reconciliation against the live hosts file
//!
//! Clients describe edits and deletes in terms of the entries they last saw.
//! Each such claim is checked against a freshly loaded store before anything
//! is changed:
//!
//! 1. The entry at the claimed line must exist and have the claimed content,
//!    otherwise the file changed underneath the client ([`ReconcileError::EditCollision`]).
//! 2. The target is then located by content. Failing to find it means the
//!    store is internally inconsistent ([`ReconcileError::StoreInconsistent`]).
//!
//! Every claim of a batch is resolved against the store as loaded, before
//! anything is changed, so an earlier item can never redirect a later one.
//! Each claim resolves to a distinct entry. The mutations are then applied in
//! order to the working copy. If any item fails, the copy is dropped and the
//! file is never written.

use hosts_manager_common::{validate_line_format, Entry, ValidationError};
use hosts_manager_store::{EntriesStore, EntryHandle, HostsFileIo, StoreError, StoreOptions};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The claimed line is gone or holds different content
    #[error(
        "hosts file has changed at line {}: '{}' no longer matches. Reload and try again",
        line_label(.line),
        .expected
    )]
    EditCollision {
        line: Option<usize>,
        expected: String,
    },

    /// Line check passed but the entry could not be located by content
    #[error("file has changed; please reload")]
    StoreInconsistent { expected: String },

    /// An entry to be written would not survive as a single line
    #[error("entry {index} cannot be written: {source}")]
    UnwritableEntry {
        index: usize,
        #[source]
        source: ValidationError,
    },

    #[error("hosts file unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

fn line_label(line: &Option<usize>) -> String {
    line.map_or_else(|| "<none>".to_string(), |l| l.to_string())
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Edit of one entry: the claim and the desired field values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryEdit {
    pub original: Entry,
    pub changed: Entry,
}

/// One client submission, applied all-or-nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Batch {
    Add(Vec<Entry>),
    Edit(Vec<EntryEdit>),
    Delete(Vec<Entry>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    Add,
    Edit,
    Delete,
}

impl fmt::Display for BatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Edit => write!(f, "edit"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

impl Batch {
    pub fn kind(&self) -> BatchKind {
        match self {
            Self::Add(_) => BatchKind::Add,
            Self::Edit(_) => BatchKind::Edit,
            Self::Delete(_) => BatchKind::Delete,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Add(entries) | Self::Delete(entries) => entries.len(),
            Self::Edit(edits) => edits.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries this batch would write
    fn written_entries(&self) -> Vec<&Entry> {
        match self {
            Self::Add(entries) => entries.iter().collect(),
            Self::Edit(edits) => edits.iter().map(|e| &e.changed).collect(),
            Self::Delete(_) => Vec::new(),
        }
    }
}

/// Result of a successfully applied batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub kind: BatchKind,
    /// Number of items applied
    pub applied: usize,
    /// Entries in the file after the batch
    pub entry_count: usize,
    /// False if the batch was empty and the file was left alone
    pub written: bool,
}

/// Locate the live entry a client claim refers to
///
/// Position first, then content. The three outcomes stay distinct: no entry
/// at the line or different content there is a collision; a content match
/// that cannot be found again is an inconsistency.
pub fn find_host_entry(claimed: &Entry, store: &EntriesStore) -> ReconcileResult<EntryHandle> {
    find_unclaimed_entry(claimed, store, &HashSet::new())
}

/// [`find_host_entry`], skipping entries already claimed in the same batch
fn find_unclaimed_entry(
    claimed: &Entry,
    store: &EntriesStore,
    taken: &HashSet<EntryHandle>,
) -> ReconcileResult<EntryHandle> {
    let expected = claimed.canonical();

    let at_line = claimed
        .line
        .and_then(|line| store.entries().find(|(_, e)| e.line == Some(line)));

    match at_line {
        Some((_, current)) if current.canonical() == expected => {}
        Some((_, current)) => {
            warn!(
                line = ?claimed.line,
                expected = %expected,
                found = %current.canonical(),
                "Edit collision: entry changed at claimed line"
            );
            return Err(ReconcileError::EditCollision {
                line: claimed.line,
                expected,
            });
        }
        None => {
            warn!(
                line = ?claimed.line,
                expected = %expected,
                "Edit collision: no entry at claimed line"
            );
            return Err(ReconcileError::EditCollision {
                line: claimed.line,
                expected,
            });
        }
    }

    store
        .entries()
        .find(|(handle, e)| !taken.contains(handle) && e.canonical() == expected)
        .map(|(handle, _)| handle)
        .ok_or(ReconcileError::StoreInconsistent { expected })
}

/// Applies batches to one hosts file
pub struct Reconciler {
    io: Arc<dyn HostsFileIo>,
    path: PathBuf,
    options: StoreOptions,
}

impl Reconciler {
    pub fn new(io: Arc<dyn HostsFileIo>, path: impl Into<PathBuf>, options: StoreOptions) -> Self {
        Self {
            io,
            path: path.into(),
            options,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load a fresh view of the file
    pub fn load(&self) -> Result<EntriesStore, StoreError> {
        EntriesStore::load(Arc::clone(&self.io), self.path.clone(), self.options)
    }

    /// Current entries with their line numbers
    pub fn get_entries(&self) -> ReconcileResult<Vec<Entry>> {
        Ok(self.load()?.to_entries())
    }

    /// Apply a batch and persist it once, or change nothing
    pub fn apply(&self, batch: &Batch) -> ReconcileResult<BatchOutcome> {
        let kind = batch.kind();
        check_writable(batch)?;
        let mut store = self.load()?;

        if batch.is_empty() {
            debug!(kind = %kind, "Empty batch, nothing to write");
            return Ok(BatchOutcome {
                kind,
                applied: 0,
                entry_count: store.len(),
                written: false,
            });
        }

        match batch {
            Batch::Add(entries) => add_entries(&mut store, entries),
            Batch::Edit(edits) => edit_entries(&mut store, edits)?,
            Batch::Delete(entries) => delete_entries(&mut store, entries)?,
        }

        let entry_count = store.save()?;

        info!(
            kind = %kind,
            applied = batch.len(),
            entries = entry_count,
            path = %self.path.display(),
            "Applied batch"
        );

        Ok(BatchOutcome {
            kind,
            applied: batch.len(),
            entry_count,
            written: true,
        })
    }
}

fn add_entries(store: &mut EntriesStore, entries: &[Entry]) {
    for entry in entries {
        store.append(entry.clone());
    }
}

/// Reject entries whose canonical form would not parse back as one entry
fn check_writable(batch: &Batch) -> ReconcileResult<()> {
    batch
        .written_entries()
        .into_iter()
        .enumerate()
        .try_for_each(|(index, entry)| {
            validate_line_format(entry).map_err(|source| {
                warn!(index, error = %source, "Rejected unwritable entry");
                ReconcileError::UnwritableEntry { index, source }
            })
        })
}

/// Resolve every claim against the unmodified store
fn resolve_claims<'a>(
    store: &EntriesStore,
    claims: impl IntoIterator<Item = &'a Entry>,
) -> ReconcileResult<Vec<EntryHandle>> {
    let mut taken = HashSet::new();
    claims
        .into_iter()
        .map(|claim| {
            let handle = find_unclaimed_entry(claim, store, &taken)?;
            taken.insert(handle);
            Ok(handle)
        })
        .collect()
}

fn edit_entries(store: &mut EntriesStore, edits: &[EntryEdit]) -> ReconcileResult<()> {
    let handles = resolve_claims(store, edits.iter().map(|e| &e.original))?;
    for (handle, edit) in handles.into_iter().zip(edits) {
        if !store.update(handle, &edit.changed) {
            return Err(ReconcileError::StoreInconsistent {
                expected: edit.original.canonical(),
            });
        }
    }
    Ok(())
}

fn delete_entries(store: &mut EntriesStore, claims: &[Entry]) -> ReconcileResult<()> {
    let handles = resolve_claims(store, claims)?;
    for (handle, claim) in handles.into_iter().zip(claims) {
        store
            .remove(handle)
            .ok_or_else(|| ReconcileError::StoreInconsistent {
                expected: claim.canonical(),
            })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hosts_manager_store::MemoryHostsFileIo;

    const PATH: &str = "/etc/hosts";

    fn setup(text: &str) -> (Arc<MemoryHostsFileIo>, Reconciler) {
        let io = Arc::new(MemoryHostsFileIo::with_file(PATH, text));
        let reconciler = Reconciler::new(io.clone(), PATH, StoreOptions::default());
        (io, reconciler)
    }

    fn content(io: &MemoryHostsFileIo) -> String {
        io.get(Path::new(PATH)).unwrap_or_default()
    }

    #[test]
    fn test_find_host_entry_matches_line_and_content() {
        let (_, reconciler) = setup("10.0.0.1 a.local\n10.0.0.2 b.local\n");
        let store = reconciler.load().unwrap();

        let claim = Entry::new("10.0.0.2", "b.local").at_line(2);
        let handle = find_host_entry(&claim, &store).unwrap();
        assert_eq!(store.get(handle).unwrap().line, Some(2));
    }

    #[test]
    fn test_find_host_entry_no_entry_at_line() {
        let (_, reconciler) = setup("10.0.0.1 a.local\n# comment\n");
        let store = reconciler.load().unwrap();

        let claim = Entry::new("10.0.0.1", "a.local").at_line(2);
        let err = find_host_entry(&claim, &store).unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::EditCollision { line: Some(2), .. }
        ));
    }

    #[test]
    fn test_find_host_entry_changed_at_line() {
        let (_, reconciler) = setup("10.0.0.1 a.local\n10.0.0.2 b-renamed.local\n");
        let store = reconciler.load().unwrap();

        let claim = Entry::new("10.0.0.2", "b.local").at_line(2);
        let err = find_host_entry(&claim, &store).unwrap_err();
        match err {
            ReconcileError::EditCollision { line, expected } => {
                assert_eq!(line, Some(2));
                assert_eq!(expected, "10.0.0.2 b.local");
            }
            other => panic!("expected EditCollision, got {:?}", other),
        }
    }

    #[test]
    fn test_find_host_entry_without_line_is_collision() {
        let (_, reconciler) = setup("10.0.0.1 a.local\n");
        let store = reconciler.load().unwrap();

        let claim = Entry::new("10.0.0.1", "a.local");
        assert!(matches!(
            find_host_entry(&claim, &store),
            Err(ReconcileError::EditCollision { line: None, .. })
        ));
    }

    #[test]
    fn test_find_host_entry_relocates_to_first_identical() {
        let (_, reconciler) = setup("10.0.0.1 dup.local\n10.0.0.9 x.local\n10.0.0.1 dup.local\n");
        let store = reconciler.load().unwrap();

        let claim = Entry::new("10.0.0.1", "dup.local").at_line(3);
        let handle = find_host_entry(&claim, &store).unwrap();
        assert_eq!(store.get(handle).unwrap().line, Some(1));
    }

    #[test]
    fn test_find_host_entry_ignores_raw_spacing() {
        let (_, reconciler) = setup("10.0.0.1\t\ta.local   #  note\n");
        let store = reconciler.load().unwrap();

        let claim = Entry::new("10.0.0.1", "a.local").with_comment("note").at_line(1);
        assert!(find_host_entry(&claim, &store).is_ok());
    }

    #[test]
    fn test_duplicate_deletes_remove_both() {
        let (io, reconciler) = setup("10.0.0.1 dup.local\n10.0.0.1 dup.local\n10.0.0.2 keep.local\n");

        let batch = Batch::Delete(vec![
            Entry::new("10.0.0.1", "dup.local").at_line(1),
            Entry::new("10.0.0.1", "dup.local").at_line(2),
        ]);
        reconciler.apply(&batch).unwrap();

        assert_eq!(content(&io), "10.0.0.2 keep.local\n");
    }

    #[test]
    fn test_same_claim_twice_in_one_batch_is_rejected() {
        let (io, reconciler) = setup("10.0.0.1 a.local\n");

        let original = Entry::new("10.0.0.1", "a.local").at_line(1);
        let batch = Batch::Edit(vec![
            EntryEdit {
                original: original.clone(),
                changed: Entry::new("10.0.0.1", "b.local"),
            },
            EntryEdit {
                original,
                changed: Entry::new("10.0.0.1", "c.local"),
            },
        ]);

        assert!(matches!(
            reconciler.apply(&batch),
            Err(ReconcileError::StoreInconsistent { .. })
        ));
        assert_eq!(content(&io), "10.0.0.1 a.local\n");
        assert_eq!(io.write_count(), 0);
    }

    #[test]
    fn test_earlier_edit_does_not_redirect_later_claim() {
        let (io, reconciler) = setup("10.0.0.1 a.local\n10.0.0.2 b.local\n");

        let batch = Batch::Edit(vec![
            EntryEdit {
                original: Entry::new("10.0.0.1", "a.local").at_line(1),
                changed: Entry::new("10.0.0.2", "b.local"),
            },
            EntryEdit {
                original: Entry::new("10.0.0.2", "b.local").at_line(2),
                changed: Entry::new("10.0.0.3", "c.local"),
            },
        ]);
        reconciler.apply(&batch).unwrap();

        assert_eq!(content(&io), "10.0.0.2 b.local\n10.0.0.3 c.local\n");
    }

    #[test]
    fn test_delete_claims_resolve_before_removal() {
        let (io, reconciler) = setup("10.0.0.1 a.local\n10.0.0.2 b.local\n10.0.0.3 c.local\n");

        let batch = Batch::Delete(vec![
            Entry::new("10.0.0.1", "a.local").at_line(1),
            Entry::new("10.0.0.3", "c.local").at_line(3),
        ]);
        reconciler.apply(&batch).unwrap();

        assert_eq!(content(&io), "10.0.0.2 b.local\n");
    }

    #[test]
    fn test_multiline_comment_is_unwritable() {
        let (io, reconciler) = setup("10.0.0.1 a.local\n");

        let err = reconciler
            .apply(&Batch::Add(vec![
                Entry::new("10.0.0.2", "b.local").with_comment("note\n10.6.6.6 evil.local")
            ]))
            .unwrap_err();

        assert!(matches!(
            err,
            ReconcileError::UnwritableEntry {
                index: 0,
                source: ValidationError::InvalidComment(_)
            }
        ));
        assert_eq!(io.write_count(), 0);
    }

    #[test]
    fn test_disabled_non_ip_entry_is_unwritable() {
        let (io, reconciler) = setup("10.0.0.1 a.local\n");

        let batch = Batch::Edit(vec![EntryEdit {
            original: Entry::new("10.0.0.1", "a.local").at_line(1),
            changed: Entry::new("gateway", "a.local").disabled(),
        }]);

        assert!(matches!(
            reconciler.apply(&batch),
            Err(ReconcileError::UnwritableEntry { index: 0, .. })
        ));
        assert_eq!(content(&io), "10.0.0.1 a.local\n");
    }

    #[test]
    fn test_empty_batch_does_not_write() {
        let (io, reconciler) = setup("10.0.0.1 a.local\n");

        let outcome = reconciler.apply(&Batch::Add(vec![])).unwrap();
        assert!(!outcome.written);
        assert_eq!(outcome.entry_count, 1);
        assert_eq!(io.write_count(), 0);
    }

    #[test]
    fn test_write_failure_is_store_unavailable() {
        let (io, reconciler) = setup("10.0.0.1 a.local\n");
        io.fail_writes(true);

        let err = reconciler
            .apply(&Batch::Add(vec![Entry::new("10.0.0.2", "b.local")]))
            .unwrap_err();
        assert!(matches!(err, ReconcileError::StoreUnavailable(_)));
        assert_eq!(content(&io), "10.0.0.1 a.local\n");
    }

    #[test]
    fn test_outcome_counts() {
        let (_, reconciler) = setup("10.0.0.1 a.local\n");
        let outcome = reconciler
            .apply(&Batch::Add(vec![
                Entry::new("10.0.0.2", "b.local"),
                Entry::new("10.0.0.3", "c.local"),
            ]))
            .unwrap();
        assert_eq!(
            outcome,
            BatchOutcome {
                kind: BatchKind::Add,
                applied: 2,
                entry_count: 3,
                written: true,
            }
        );
    }

    #[test]
    fn test_error_messages() {
        let err = ReconcileError::EditCollision {
            line: Some(3),
            expected: "10.0.0.1 a.local".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("line 3"));
        assert!(msg.contains("10.0.0.1 a.local"));

        let err = ReconcileError::EditCollision {
            line: None,
            expected: "x".to_string(),
        };
        assert!(err.to_string().contains("<none>"));

        let err = ReconcileError::StoreInconsistent {
            expected: "x".to_string(),
        };
        assert_eq!(err.to_string(), "file has changed; please reload");
    }
}
