use async_trait::async_trait;
use bytes::Bytes;
use tracing::{instrument, trace};

use super::{MemoryObjectStore, ObjectStore};
use crate::{BlobMetadata, Commit, Digest, Error, Tree};

/// Asks near first, if not found, asks far.
/// If found in there, returns it, and *inserts* it into near, so shared
/// subtrees are not refetched across diff runs.
/// There is no negative cache: a [Error::NotFound] from near always falls
/// through to far.
#[derive(Clone)]
pub struct Cache<FS> {
    near: MemoryObjectStore,
    far: FS,
}

impl<FS> Cache<FS> {
    pub fn new(near: MemoryObjectStore, far: FS) -> Self {
        Self { near, far }
    }
}

#[async_trait]
impl<FS> ObjectStore for Cache<FS>
where
    FS: ObjectStore + 'static,
{
    #[instrument(skip(self, digest), fields(commit.digest = %digest))]
    async fn get_commit(&self, digest: &Digest) -> Result<Commit, Error> {
        match self.near.get_commit(digest).await {
            Ok(commit) => {
                trace!("serving from cache");
                Ok(commit)
            }
            Err(Error::NotFound(_)) => {
                trace!("not found in near, asking far");
                let commit = self.far.get_commit(digest).await?;
                self.near.put_commit(commit.clone())?;
                Ok(commit)
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, digest), fields(tree.digest = %digest))]
    async fn get_tree(&self, digest: &Digest) -> Result<Tree, Error> {
        match self.near.get_tree(digest).await {
            Ok(tree) => {
                trace!("serving from cache");
                Ok(tree)
            }
            Err(Error::NotFound(_)) => {
                trace!("not found in near, asking far");
                let tree = self.far.get_tree(digest).await?;
                self.near.put_tree(tree.clone())?;
                Ok(tree)
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, digest), fields(blob.digest = %digest))]
    async fn get_blob_metadata(&self, digest: &Digest) -> Result<BlobMetadata, Error> {
        match self.near.get_blob_metadata(digest).await {
            Ok(metadata) => Ok(metadata),
            Err(Error::NotFound(_)) => self.far.get_blob_metadata(digest).await,
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, digest), fields(blob.digest = %digest))]
    async fn get_blob(&self, digest: &Digest) -> Result<Bytes, Error> {
        match self.near.get_blob(digest).await {
            Ok(contents) => Ok(contents),
            Err(Error::NotFound(_)) => {
                let contents = self.far.get_blob(digest).await?;
                self.near.put_blob_alias(digest.clone(), contents.clone())?;
                Ok(contents)
            }
            Err(e) => Err(e),
        }
    }
}
