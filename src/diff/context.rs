use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use super::DiffCallback;
use crate::store::ObjectStore;
use crate::{Digest, Error, PathComponent, RepoPath};

/// The entry name that introduces a new ignore scope on descent.
pub const GITIGNORE_NAME: &[u8] = b".gitignore";

/// Loads the contents of an ignore file encountered during a diff.
///
/// The digest is the ignore blob's id on the side of the comparison being
/// scanned, so an ignore file whose contents differ between the two trees is
/// evaluated with each side's own rules. The default loader fetches the blob
/// from the store; tests inject canned contents instead.
#[async_trait]
pub trait IgnoreLoader: Send + Sync {
    async fn load(&self, path: &RepoPath, digest: &Digest) -> Result<Bytes, Error>;
}

/// The default [IgnoreLoader], resolving ignore files through the store.
pub struct StoreIgnoreLoader {
    store: Arc<dyn ObjectStore>,
}

impl StoreIgnoreLoader {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl IgnoreLoader for StoreIgnoreLoader {
    async fn load(&self, _path: &RepoPath, digest: &Digest) -> Result<Bytes, Error> {
        self.store.get_blob(digest).await
    }
}

/// Configuration and shared state for one diff run. Read-mostly: the
/// callback is the only mutation point, and serializes internally.
pub struct DiffContext {
    store: Arc<dyn ObjectStore>,
    callback: Arc<dyn DiffCallback>,
    list_ignored: bool,
    ignore_loader: Arc<dyn IgnoreLoader>,
    hidden_names: BTreeSet<PathComponent>,
}

impl DiffContext {
    pub fn new(store: Arc<dyn ObjectStore>, callback: Arc<dyn DiffCallback>) -> Self {
        let ignore_loader = Arc::new(StoreIgnoreLoader::new(store.clone()));

        Self {
            store,
            callback,
            list_ignored: true,
            ignore_loader,
            hidden_names: default_hidden_names(),
        }
    }

    /// Whether ignored paths are reported at all. Defaults to true.
    pub fn with_list_ignored(mut self, list_ignored: bool) -> Self {
        self.list_ignored = list_ignored;
        self
    }

    pub fn with_ignore_loader(mut self, loader: Arc<dyn IgnoreLoader>) -> Self {
        self.ignore_loader = loader;
        self
    }

    pub fn with_hidden_names(mut self, names: BTreeSet<PathComponent>) -> Self {
        self.hidden_names = names;
        self
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    pub fn callback(&self) -> &dyn DiffCallback {
        self.callback.as_ref()
    }

    pub fn list_ignored(&self) -> bool {
        self.list_ignored
    }

    /// Entries with these names are invisible to the diff: no events, no
    /// descent, on either side.
    pub fn is_hidden(&self, name: &PathComponent) -> bool {
        self.hidden_names.contains(name)
    }

    pub(super) async fn load_ignore_file(
        &self,
        path: &RepoPath,
        digest: &Digest,
    ) -> Result<Bytes, Error> {
        self.ignore_loader.load(path, digest).await
    }
}

fn default_hidden_names() -> BTreeSet<PathComponent> {
    [&b".hg"[..], b".eden", b".git"]
        .into_iter()
        .filter_map(|name| PathComponent::try_from(name).ok())
        .collect()
}
