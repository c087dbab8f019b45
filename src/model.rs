//! The content-addressed model the diff engine traverses: trees, their
//! entries, and the commits pointing at root trees.

use std::collections::BTreeMap;

use crate::errors::TreeError;
use crate::path::PathComponent;
use crate::Digest;

/// A single entry in a [Tree]. Entries themselves don't carry names; the
/// [Tree] maps names to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A subdirectory, referring to another [Tree] by its digest.
    Tree { digest: Digest },
    /// A regular or executable file, referring to its contents.
    File { digest: Digest, executable: bool },
    /// A symlink; its target bytes are stored as a blob.
    Symlink { digest: Digest },
}

/// The kind of a [Node]. Kind equality is strict: a regular file and a
/// symlink with identical contents are not equal, which is how a mode change
/// surfaces as a modification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Tree,
    RegularFile,
    ExecutableFile,
    Symlink,
}

impl NodeKind {
    fn tag(&self) -> u8 {
        match self {
            NodeKind::Tree => b't',
            NodeKind::RegularFile => b'f',
            NodeKind::ExecutableFile => b'x',
            NodeKind::Symlink => b'l',
        }
    }
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Tree { .. } => NodeKind::Tree,
            Node::File {
                executable: false, ..
            } => NodeKind::RegularFile,
            Node::File {
                executable: true, ..
            } => NodeKind::ExecutableFile,
            Node::Symlink { .. } => NodeKind::Symlink,
        }
    }

    pub fn digest(&self) -> &Digest {
        match self {
            Node::Tree { digest } => digest,
            Node::File { digest, .. } => digest,
            Node::Symlink { digest } => digest,
        }
    }

    pub fn is_tree(&self) -> bool {
        matches!(self, Node::Tree { .. })
    }
}

/// A Tree is an immutable, name-ordered list of entries.
/// Entry names:
///  - MUST not contain slashes or null bytes
///  - MUST not be '.' or '..'
///  - MUST be unique within the tree
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    nodes: BTreeMap<PathComponent, Node>,
}

impl Tree {
    /// Constructs a new, empty Tree.
    pub fn new() -> Self {
        Tree {
            nodes: BTreeMap::new(),
        }
    }

    /// Allows iterating over all entries, as tuples of name and node,
    /// in strict byte-lexicographic name order. The merge walk in the diff
    /// engine relies on this ordering.
    pub fn nodes(&self) -> impl Iterator<Item = (&PathComponent, &Node)> + Send + Sync + '_ {
        self.nodes.iter()
    }

    /// Looks up a single entry by name.
    pub fn get(&self, name: &[u8]) -> Option<&Node> {
        self.nodes.get(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Calculates the digest of the Tree, which is the blake3 hash of its
    /// canonical serialization: one `<kind> <name> NUL <entry digest>` record
    /// per entry, in name order.
    pub fn digest(&self) -> Digest {
        let mut hasher = blake3::Hasher::new();
        for (name, node) in &self.nodes {
            hasher.update(&[node.kind().tag(), b' ']);
            hasher.update(name.as_ref());
            hasher.update(&[0x00]);
            hasher.update(node.digest().as_slice());
        }
        hasher.finalize().into()
    }

    /// Adds the specified [Node] to the Tree with a given name.
    ///
    /// Inserting an element that already exists with the same name in the
    /// tree will yield an error, as will invalid names.
    pub fn add(&mut self, name: PathComponent, node: Node) -> Result<(), TreeError> {
        match self.nodes.entry(name) {
            std::collections::btree_map::Entry::Vacant(e) => {
                e.insert(node);
                Ok(())
            }
            std::collections::btree_map::Entry::Occupied(occupied) => {
                Err(TreeError::DuplicateName(occupied.key().to_owned()))
            }
        }
    }
}

/// A Commit only contributes its root tree to the diff engine; any other
/// commit metadata lives outside this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub root_tree: Digest,
}

impl Commit {
    /// The identity of a commit in the store, the blake3 hash of its
    /// canonical serialization.
    pub fn digest(&self) -> Digest {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"commit\x00");
        hasher.update(self.root_tree.as_slice());
        hasher.finalize().into()
    }
}

/// Enough information about a blob to decide content equality without
/// fetching its bytes. The object id a blob was looked up under and its
/// `content_digest` may differ when a store aliases ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobMetadata {
    pub size: u64,
    pub content_digest: Digest,
}

#[cfg(test)]
mod tests {
    use super::{Node, NodeKind, Tree};
    use crate::fixtures::DUMMY_DIGEST;

    #[test]
    fn add_nodes_to_tree() {
        let mut t = Tree::new();

        t.add(
            "b".try_into().unwrap(),
            Node::Tree {
                digest: DUMMY_DIGEST.clone(),
            },
        )
        .unwrap();
        t.add(
            "a".try_into().unwrap(),
            Node::File {
                digest: DUMMY_DIGEST.clone(),
                executable: false,
            },
        )
        .unwrap();
        t.add(
            "z".try_into().unwrap(),
            Node::Symlink {
                digest: DUMMY_DIGEST.clone(),
            },
        )
        .unwrap();

        // Iteration is sorted by name, regardless of insertion order.
        let names: Vec<_> = t.nodes().map(|(name, _)| name.to_string()).collect();
        assert_eq!(vec!["a", "b", "z"], names);
    }

    #[test]
    fn add_duplicate_node_to_tree() {
        let mut t = Tree::new();

        t.add(
            "a".try_into().unwrap(),
            Node::Tree {
                digest: DUMMY_DIGEST.clone(),
            },
        )
        .unwrap();
        assert_eq!(
            format!(
                "{}",
                t.add(
                    "a".try_into().unwrap(),
                    Node::File {
                        digest: DUMMY_DIGEST.clone(),
                        executable: true,
                    }
                )
                .expect_err("adding duplicate entry must fail")
            ),
            "\"a\" is a duplicate name"
        );
    }

    #[test]
    fn kind_distinguishes_modes() {
        let regular = Node::File {
            digest: DUMMY_DIGEST.clone(),
            executable: false,
        };
        let executable = Node::File {
            digest: DUMMY_DIGEST.clone(),
            executable: true,
        };
        let symlink = Node::Symlink {
            digest: DUMMY_DIGEST.clone(),
        };

        assert_eq!(NodeKind::RegularFile, regular.kind());
        assert_eq!(NodeKind::ExecutableFile, executable.kind());
        assert_eq!(NodeKind::Symlink, symlink.kind());
        assert_ne!(regular.kind(), executable.kind());
    }

    #[test]
    fn digest_tracks_contents() {
        let mut a = Tree::new();
        a.add(
            "f".try_into().unwrap(),
            Node::File {
                digest: DUMMY_DIGEST.clone(),
                executable: false,
            },
        )
        .unwrap();

        // Same entries, same digest.
        let mut b = Tree::new();
        b.add(
            "f".try_into().unwrap(),
            Node::File {
                digest: DUMMY_DIGEST.clone(),
                executable: false,
            },
        )
        .unwrap();
        assert_eq!(a.digest(), b.digest());

        // A mode flip changes the digest.
        let mut c = Tree::new();
        c.add(
            "f".try_into().unwrap(),
            Node::File {
                digest: DUMMY_DIGEST.clone(),
                executable: true,
            },
        )
        .unwrap();
        assert_ne!(a.digest(), c.digest());

        assert_ne!(Tree::new().digest(), a.digest());
    }
}
