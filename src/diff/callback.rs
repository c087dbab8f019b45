use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::{Error, RepoPathBuf};

/// The per-path status taxonomy a diff run reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScmFileStatus {
    Added,
    Modified,
    Removed,
    Ignored,
}

/// The accumulated outcome of a diff run: definitive per-path statuses, plus
/// the paths that could not be classified. An error at one path never blocks
/// entries for unaffected subtrees.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScmStatus {
    pub entries: BTreeMap<RepoPathBuf, ScmFileStatus>,
    pub errors: BTreeMap<RepoPathBuf, String>,
}

/// The sink the diff engine emits into. Implementations must be safe for
/// concurrent invocation; emissions from sibling subtrees interleave
/// arbitrarily.
pub trait DiffCallback: Send + Sync {
    fn record_status(&self, path: RepoPathBuf, status: ScmFileStatus);
    fn record_error(&self, path: RepoPathBuf, err: &Error);
}

/// A [DiffCallback] accumulating everything into a [ScmStatus].
#[derive(Default)]
pub struct ScmStatusCollector {
    inner: Mutex<ScmStatus>,
}

impl ScmStatusCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extracts the accumulated status, leaving the collector empty.
    pub fn take_status(&self) -> ScmStatus {
        std::mem::take(&mut self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ScmStatus> {
        // A poisoned lock only means a recording thread panicked; the maps
        // themselves are still consistent after any single insert.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl DiffCallback for ScmStatusCollector {
    fn record_status(&self, path: RepoPathBuf, status: ScmFileStatus) {
        self.lock().entries.insert(path, status);
    }

    fn record_error(&self, path: RepoPathBuf, err: &Error) {
        self.lock().errors.insert(path, err.to_string());
    }
}
