use async_trait::async_trait;
use bytes::Bytes;

use crate::{BlobMetadata, Commit, Digest, Error, Tree};

mod cache;
mod memory;

pub use self::cache::Cache;
pub use self::memory::MemoryObjectStore;

/// The fetch surface the diff engine consumes. All lookups are keyed by
/// [Digest] and may complete in any order; the engine never depends on
/// completion ordering.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Looks up a [Commit] by its digest.
    /// Fails with [Error::NotFound] if the digest is unknown.
    async fn get_commit(&self, digest: &Digest) -> Result<Commit, Error>;

    /// Looks up a [Tree] by its digest.
    async fn get_tree(&self, digest: &Digest) -> Result<Tree, Error>;

    /// Looks up metadata for a blob, enough to decide content equality
    /// without fetching the bytes.
    async fn get_blob_metadata(&self, digest: &Digest) -> Result<BlobMetadata, Error>;

    /// Fetches the contents of a blob. The diff engine only ever does this
    /// for ignore files.
    async fn get_blob(&self, digest: &Digest) -> Result<Bytes, Error>;
}

#[async_trait]
impl<A> ObjectStore for A
where
    A: AsRef<dyn ObjectStore> + Send + Sync,
{
    async fn get_commit(&self, digest: &Digest) -> Result<Commit, Error> {
        self.as_ref().get_commit(digest).await
    }

    async fn get_tree(&self, digest: &Digest) -> Result<Tree, Error> {
        self.as_ref().get_tree(digest).await
    }

    async fn get_blob_metadata(&self, digest: &Digest) -> Result<BlobMetadata, Error> {
        self.as_ref().get_blob_metadata(digest).await
    }

    async fn get_blob(&self, digest: &Digest) -> Result<Bytes, Error> {
        self.as_ref().get_blob(digest).await
    }
}
