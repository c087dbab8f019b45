//! Test fixtures: digests, a builder assembling nested trees into a store,
//! a store whose objects become available (or fail) on demand, and a canned
//! ignore-file loader.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use lazy_static::lazy_static;
use tokio::sync::watch;

use crate::diff::IgnoreLoader;
use crate::store::{MemoryObjectStore, ObjectStore};
use crate::{BlobMetadata, Commit, Digest, Error, Node, RepoPath, RepoPathBuf, Tree};

lazy_static! {
    pub static ref DUMMY_DIGEST: Digest = {
        let u = [0u8; 32];
        (&u).into()
    };
    pub static ref DUMMY_DIGEST_2: Digest = {
        let mut u = [0u8; 32];
        u[0] = 0x10;
        (&u).into()
    };
}

#[derive(Clone)]
enum EntrySpec {
    File { contents: Bytes, executable: bool },
    Symlink { target: Bytes },
    Dir,
}

/// Assembles a nested tree structure from path/contents pairs, then writes
/// all blobs and trees into a store bottom-up.
///
/// Paths are given as strings for test ergonomics; an invalid path is a bug
/// in the test, so these methods panic rather than return errors.
#[derive(Clone, Default)]
pub struct TreeBuilder {
    entries: BTreeMap<RepoPathBuf, EntrySpec>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_file(&mut self, path: &str, contents: &str) {
        self.insert(
            path,
            EntrySpec::File {
                contents: Bytes::copy_from_slice(contents.as_bytes()),
                executable: false,
            },
        );
    }

    pub fn set_executable_file(&mut self, path: &str, contents: &str) {
        self.insert(
            path,
            EntrySpec::File {
                contents: Bytes::copy_from_slice(contents.as_bytes()),
                executable: true,
            },
        );
    }

    pub fn set_symlink(&mut self, path: &str, target: &str) {
        self.insert(
            path,
            EntrySpec::Symlink {
                target: Bytes::copy_from_slice(target.as_bytes()),
            },
        );
    }

    /// Records an (otherwise empty) directory.
    pub fn mkdir(&mut self, path: &str) {
        self.insert(path, EntrySpec::Dir);
    }

    pub fn remove_file(&mut self, path: &str) {
        let path = parse_path(path);
        assert!(
            self.entries.remove(&path).is_some(),
            "no entry at {} to remove",
            path
        );
    }

    fn insert(&mut self, path: &str, spec: EntrySpec) {
        self.entries.insert(parse_path(path), spec);
    }

    /// Writes all blobs and trees into a [MemoryObjectStore] and returns the
    /// root tree digest.
    pub fn finalize(&self, store: &MemoryObjectStore) -> Result<Digest, Error> {
        let (trees, blobs) = self.build();
        for (_, contents) in blobs {
            store.put_blob(contents)?;
        }

        let mut root = None;
        for (path, tree) in trees {
            let digest = store.put_tree(tree)?;
            if path.is_root() {
                root = Some(digest);
            }
        }

        Ok(root.unwrap_or_else(|| Tree::new().digest()))
    }

    /// Like [TreeBuilder::finalize], but into a [FakeObjectStore], where
    /// every object starts out pending.
    pub fn finalize_unready(&self, store: &FakeObjectStore) -> Result<Digest, Error> {
        let (trees, blobs) = self.build();
        for (digest, contents) in blobs {
            store.insert_blob(digest, contents)?;
        }

        let mut root = None;
        for (path, tree) in trees {
            let digest = store.insert_tree(tree)?;
            if path.is_root() {
                root = Some(digest);
            }
        }

        Ok(root.unwrap_or_else(|| Tree::new().digest()))
    }

    /// Finalizes into the store and registers a [Commit] for the root.
    pub fn commit(&self, store: &MemoryObjectStore) -> Result<Digest, Error> {
        let root_tree = self.finalize(store)?;
        store.put_commit(Commit { root_tree })
    }

    /// The digest the subtree at `path` will have, without touching any
    /// store. Handy for targeting one subtree with [FakeObjectStore] gates.
    pub fn tree_digest(&self, path: &str) -> Digest {
        let path = parse_path(path);
        let (trees, _) = self.build();
        trees
            .get(&path)
            .unwrap_or_else(|| panic!("no directory at {}", path))
            .digest()
    }

    /// The content digest of the blob at `path`.
    pub fn blob_digest(&self, path: &str) -> Digest {
        let path = parse_path(path);
        match self.entries.get(&path) {
            Some(EntrySpec::File { contents, .. }) => blake3::hash(contents).into(),
            Some(EntrySpec::Symlink { target }) => blake3::hash(target).into(),
            _ => panic!("no file at {}", path),
        }
    }

    fn build(&self) -> (BTreeMap<RepoPathBuf, Tree>, Vec<(Digest, Bytes)>) {
        // Every ancestor of an entry is a directory, as is every explicit
        // mkdir.
        let mut dirs: BTreeSet<RepoPathBuf> = BTreeSet::new();
        dirs.insert(RepoPathBuf::new());
        for (path, spec) in &self.entries {
            if matches!(spec, EntrySpec::Dir) {
                dirs.insert(path.clone());
            }
            let mut ancestor = path.parent();
            while let Some(dir) = ancestor {
                dirs.insert(dir.to_owned());
                ancestor = dir.parent();
            }
        }

        let mut blobs = Vec::new();
        let mut trees: BTreeMap<RepoPathBuf, Tree> = BTreeMap::new();
        let mut tree_digests: BTreeMap<RepoPathBuf, Digest> = BTreeMap::new();

        // Deepest directories first, so subtree digests exist before their
        // parents reference them.
        let mut order: Vec<RepoPathBuf> = dirs.into_iter().collect();
        order.sort_by_key(|path| std::cmp::Reverse(path.components_bytes().count()));

        for dir in order {
            let mut tree = Tree::new();

            for (path, spec) in &self.entries {
                if path.parent() != Some(&*dir) {
                    continue;
                }
                let name = path.file_name().expect("entry path has a final component");
                match spec {
                    EntrySpec::File {
                        contents,
                        executable,
                    } => {
                        let digest: Digest = blake3::hash(contents).into();
                        blobs.push((digest.clone(), contents.clone()));
                        tree.add(
                            name,
                            Node::File {
                                digest,
                                executable: *executable,
                            },
                        )
                        .expect("builder entries are unique");
                    }
                    EntrySpec::Symlink { target } => {
                        let digest: Digest = blake3::hash(target).into();
                        blobs.push((digest.clone(), target.clone()));
                        tree.add(name, Node::Symlink { digest })
                            .expect("builder entries are unique");
                    }
                    EntrySpec::Dir => {}
                }
            }

            for (child, digest) in &tree_digests {
                if child.parent() == Some(&*dir) {
                    let name = child.file_name().expect("subdirectory has a name");
                    tree.add(
                        name,
                        Node::Tree {
                            digest: digest.clone(),
                        },
                    )
                    .expect("builder entries are unique");
                }
            }

            tree_digests.insert(dir.clone(), tree.digest());
            trees.insert(dir, tree);
        }

        (trees, blobs)
    }
}

fn parse_path(path: &str) -> RepoPathBuf {
    path.parse()
        .unwrap_or_else(|_| panic!("invalid fixture path {:?}", path))
}

#[derive(Clone, Debug)]
enum GateState {
    Pending,
    Ready,
    Failed(String),
}

/// An [ObjectStore] whose objects are inserted pending and only resolve once
/// the test marks them ready, in whatever order it likes. Lookups of a
/// pending object suspend; this is how completion-order and failure
/// isolation scenarios are driven.
#[derive(Default)]
pub struct FakeObjectStore {
    commits: RwLock<HashMap<Digest, Commit>>,
    trees: RwLock<HashMap<Digest, Tree>>,
    blobs: RwLock<HashMap<Digest, Bytes>>,
    gates: RwLock<HashMap<Digest, watch::Sender<GateState>>>,
}

impl FakeObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_commit(&self, commit: Commit) -> Result<Digest, Error> {
        let digest = commit.digest();
        self.commits.write()?.insert(digest.clone(), commit);
        self.ensure_gate(&digest)?;
        Ok(digest)
    }

    pub fn insert_tree(&self, tree: Tree) -> Result<Digest, Error> {
        let digest = tree.digest();
        self.trees.write()?.insert(digest.clone(), tree);
        self.ensure_gate(&digest)?;
        Ok(digest)
    }

    pub fn insert_blob(&self, digest: Digest, contents: Bytes) -> Result<(), Error> {
        self.blobs.write()?.insert(digest.clone(), contents);
        self.ensure_gate(&digest)?;
        Ok(())
    }

    /// Releases one object; a pending lookup of it completes.
    pub fn set_ready(&self, digest: &Digest) {
        if let Ok(gates) = self.gates.read() {
            if let Some(gate) = gates.get(digest) {
                gate.send_if_modified(|state| {
                    if matches!(state, GateState::Pending) {
                        *state = GateState::Ready;
                        true
                    } else {
                        false
                    }
                });
            }
        }
    }

    /// Releases every object still pending. Objects already failed stay
    /// failed.
    pub fn set_all_ready(&self) {
        if let Ok(gates) = self.gates.read() {
            for gate in gates.values() {
                gate.send_if_modified(|state| {
                    if matches!(state, GateState::Pending) {
                        *state = GateState::Ready;
                        true
                    } else {
                        false
                    }
                });
            }
        }
    }

    /// Makes lookups of one object fail with a storage error.
    pub fn set_error(&self, digest: &Digest, message: &str) {
        if let Ok(gates) = self.gates.read() {
            if let Some(gate) = gates.get(digest) {
                gate.send_replace(GateState::Failed(message.to_string()));
            }
        }
    }

    fn ensure_gate(&self, digest: &Digest) -> Result<(), Error> {
        let mut gates = self.gates.write()?;
        gates
            .entry(digest.clone())
            .or_insert_with(|| watch::channel(GateState::Pending).0);
        Ok(())
    }

    async fn wait_ready(&self, digest: &Digest) -> Result<(), Error> {
        let mut rx = {
            let gates = self.gates.read()?;
            match gates.get(digest) {
                Some(gate) => gate.subscribe(),
                None => return Err(Error::NotFound(digest.clone())),
            }
        };

        loop {
            let state = rx.borrow_and_update().clone();
            match state {
                GateState::Ready => return Ok(()),
                GateState::Failed(message) => return Err(Error::StorageError(message)),
                GateState::Pending => {
                    if rx.changed().await.is_err() {
                        return Err(Error::StorageError("store dropped".to_string()));
                    }
                }
            }
        }
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn get_commit(&self, digest: &Digest) -> Result<Commit, Error> {
        self.wait_ready(digest).await?;
        let commits = self.commits.read()?;
        commits
            .get(digest)
            .cloned()
            .ok_or_else(|| Error::NotFound(digest.clone()))
    }

    async fn get_tree(&self, digest: &Digest) -> Result<Tree, Error> {
        self.wait_ready(digest).await?;
        let trees = self.trees.read()?;
        trees
            .get(digest)
            .cloned()
            .ok_or_else(|| Error::NotFound(digest.clone()))
    }

    async fn get_blob_metadata(&self, digest: &Digest) -> Result<BlobMetadata, Error> {
        self.wait_ready(digest).await?;
        let blobs = self.blobs.read()?;
        let contents = blobs
            .get(digest)
            .ok_or_else(|| Error::NotFound(digest.clone()))?;

        Ok(BlobMetadata {
            size: contents.len() as u64,
            content_digest: blake3::hash(contents).into(),
        })
    }

    async fn get_blob(&self, digest: &Digest) -> Result<Bytes, Error> {
        self.wait_ready(digest).await?;
        let blobs = self.blobs.read()?;
        blobs
            .get(digest)
            .cloned()
            .ok_or_else(|| Error::NotFound(digest.clone()))
    }
}

/// An [IgnoreLoader] answering every lookup with the same canned contents,
/// the shape most ignore tests want.
pub struct CannedIgnoreLoader {
    contents: Bytes,
}

impl CannedIgnoreLoader {
    pub fn new(contents: &str) -> Self {
        Self {
            contents: Bytes::copy_from_slice(contents.as_bytes()),
        }
    }
}

#[async_trait]
impl IgnoreLoader for CannedIgnoreLoader {
    async fn load(&self, _path: &RepoPath, _digest: &Digest) -> Result<Bytes, Error> {
        Ok(self.contents.clone())
    }
}
