use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{instrument, warn};

use super::ObjectStore;
use crate::{BlobMetadata, Commit, Digest, Error, Tree};

/// An in-memory [ObjectStore], mainly used for testing and as the near side
/// of a [super::Cache]. Cheaply clonable, all clones share the same maps.
#[derive(Clone, Default)]
pub struct MemoryObjectStore {
    commits: Arc<RwLock<HashMap<Digest, Commit>>>,
    trees: Arc<RwLock<HashMap<Digest, Tree>>>,
    blobs: Arc<RwLock<HashMap<Digest, Bytes>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a commit under its canonical digest, which is returned.
    pub fn put_commit(&self, commit: Commit) -> Result<Digest, Error> {
        let digest = commit.digest();
        self.commits.write()?.insert(digest.clone(), commit);
        Ok(digest)
    }

    /// Stores a tree under its canonical digest, which is returned.
    pub fn put_tree(&self, tree: Tree) -> Result<Digest, Error> {
        let digest = tree.digest();
        self.trees.write()?.insert(digest.clone(), tree);
        Ok(digest)
    }

    /// Stores blob contents under their content digest, which is returned.
    pub fn put_blob(&self, contents: Bytes) -> Result<Digest, Error> {
        let digest: Digest = blake3::hash(&contents).into();
        self.blobs.write()?.insert(digest.clone(), contents);
        Ok(digest)
    }

    /// Registers an alternate id for blob contents. Metadata lookups under
    /// the alias report the contents' actual digest, so two ids can compare
    /// content-equal.
    pub fn put_blob_alias(&self, alias: Digest, contents: Bytes) -> Result<(), Error> {
        self.blobs.write()?.insert(alias, contents);
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    #[instrument(skip(self, digest), fields(commit.digest = %digest))]
    async fn get_commit(&self, digest: &Digest) -> Result<Commit, Error> {
        let commits = self.commits.read()?;
        commits
            .get(digest)
            .cloned()
            .ok_or_else(|| Error::NotFound(digest.clone()))
    }

    #[instrument(skip(self, digest), fields(tree.digest = %digest))]
    async fn get_tree(&self, digest: &Digest) -> Result<Tree, Error> {
        let trees = self.trees.read()?;
        match trees.get(digest) {
            None => Err(Error::NotFound(digest.clone())),
            Some(tree) => {
                // Validate the retrieved Tree indeed has the digest we expect
                // it to have, to detect corruptions.
                let actual_digest = tree.digest();
                if actual_digest != *digest {
                    warn!(%actual_digest, "tree failed digest validation");
                    return Err(Error::StorageError(format!(
                        "requested tree with digest {}, but got {}",
                        digest, actual_digest
                    )));
                }

                Ok(tree.clone())
            }
        }
    }

    #[instrument(skip(self, digest), fields(blob.digest = %digest))]
    async fn get_blob_metadata(&self, digest: &Digest) -> Result<BlobMetadata, Error> {
        let blobs = self.blobs.read()?;
        let contents = blobs
            .get(digest)
            .ok_or_else(|| Error::NotFound(digest.clone()))?;

        Ok(BlobMetadata {
            size: contents.len() as u64,
            content_digest: blake3::hash(contents).into(),
        })
    }

    #[instrument(skip(self, digest), fields(blob.digest = %digest))]
    async fn get_blob(&self, digest: &Digest) -> Result<Bytes, Error> {
        let blobs = self.blobs.read()?;
        blobs
            .get(digest)
            .cloned()
            .ok_or_else(|| Error::NotFound(digest.clone()))
    }
}
