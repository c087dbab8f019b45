//! Relative paths inside a source-control tree.
//!
//! Every status the diff engine reports is keyed by a path relative to the
//! root of the trees being compared: `/`-separated, never absolute, with
//! every segment a validated [PathComponent]. The empty path is the root.
//! Because segments can never be `..`, joining onto a path cannot escape the
//! tree it is rooted at.

use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use thiserror::Error;

mod component;
pub use component::{PathComponent, PathComponentError};

/// Error produced when bytes do not form a valid relative path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid path: {0}")]
pub struct RepoPathError(#[from] PathComponentError);

/// A borrowed relative path: zero or more `/`-separated components.
///
/// This is a view type, always obtained by borrowing from a [RepoPathBuf]
/// or by slicing another `RepoPath`; the pairing mirrors how the standard
/// library splits `Path` and `PathBuf`.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct RepoPath([u8]);

impl RepoPath {
    /// The tree root.
    pub const ROOT: &'static RepoPath = RepoPath::from_checked(b"");

    /// Wraps bytes already known to be a well-formed path.
    const fn from_checked(bytes: &[u8]) -> &RepoPath {
        // SAFETY: RepoPath is a transparent wrapper around [u8], so the
        // pointer cast preserves layout; validity is the caller's invariant.
        unsafe { &*(bytes as *const [u8] as *const RepoPath) }
    }

    fn parse(bytes: &[u8]) -> Result<&RepoPath, RepoPathError> {
        if !bytes.is_empty() {
            for segment in bytes.split(|&b| b == b'/') {
                component::check_component(segment)?;
            }
        }

        Ok(RepoPath::from_checked(bytes))
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Everything up to the final component; None at the root.
    pub fn parent(&self) -> Option<&RepoPath> {
        if self.is_root() {
            return None;
        }

        Some(match self.0.iter().rposition(|&b| b == b'/') {
            Some(cut) => RepoPath::from_checked(&self.0[..cut]),
            None => RepoPath::ROOT,
        })
    }

    /// The final component; None at the root.
    pub fn file_name(&self) -> Option<PathComponent> {
        self.file_name_bytes()
            .map(|name| PathComponent(bytes::Bytes::copy_from_slice(name)))
    }

    /// The final component, as raw bytes; None at the root.
    pub fn file_name_bytes(&self) -> Option<&[u8]> {
        if self.is_root() {
            return None;
        }

        Some(match self.0.iter().rposition(|&b| b == b'/') {
            Some(cut) => &self.0[cut + 1..],
            None => &self.0,
        })
    }

    /// The segments of the path, in order; empty at the root.
    pub fn components_bytes(&self) -> impl Iterator<Item = &[u8]> {
        // The root is the only path whose split produces an empty segment.
        self.0
            .split(|&b| b == b'/')
            .filter(|segment| !segment.is_empty())
    }

    /// Adjoins one validated component. This cannot fail and cannot escape
    /// the root, since a component is never `..`.
    pub fn join(&self, name: &PathComponent) -> RepoPathBuf {
        let mut joined = Vec::with_capacity(self.0.len() + name.as_bytes().len() + 1);
        joined.extend_from_slice(&self.0);
        if !joined.is_empty() {
            joined.push(b'/');
        }
        joined.extend_from_slice(name.as_bytes());

        RepoPathBuf(joined)
    }

    /// Adjoins a raw name, validating it first.
    pub fn try_join(&self, name: &[u8]) -> Result<RepoPathBuf, RepoPathError> {
        component::check_component(name)?;

        let mut joined = Vec::with_capacity(self.0.len() + name.len() + 1);
        joined.extend_from_slice(&self.0);
        if !joined.is_empty() {
            joined.push(b'/');
        }
        joined.extend_from_slice(name);

        Ok(RepoPathBuf(joined))
    }

    /// Strips `base` off the front: Some when self is `base` itself or lies
    /// below it, None otherwise. A partial final segment (`a/bc` against
    /// `a/b`) is not a prefix.
    pub fn strip_prefix(&self, base: &RepoPath) -> Option<&RepoPath> {
        if base.is_root() {
            return Some(self);
        }
        if self.0.len() == base.0.len() {
            return (self.0 == base.0).then_some(RepoPath::ROOT);
        }
        if self.0.len() > base.0.len()
            && self.0.starts_with(&base.0)
            && self.0[base.0.len()] == b'/'
        {
            return Some(RepoPath::from_checked(&self.0[base.0.len() + 1..]));
        }

        None
    }
}

impl ToOwned for RepoPath {
    type Owned = RepoPathBuf;

    fn to_owned(&self) -> RepoPathBuf {
        RepoPathBuf(self.0.to_vec())
    }
}

impl fmt::Display for RepoPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for RepoPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.0))
    }
}

/// An owned [RepoPath].
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RepoPathBuf(Vec<u8>);

impl RepoPathBuf {
    /// The tree root.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl Deref for RepoPathBuf {
    type Target = RepoPath;

    fn deref(&self) -> &RepoPath {
        RepoPath::from_checked(&self.0)
    }
}

impl Borrow<RepoPath> for RepoPathBuf {
    fn borrow(&self) -> &RepoPath {
        self
    }
}

impl FromStr for RepoPathBuf {
    type Err = RepoPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RepoPath::parse(s.as_bytes()).map(RepoPath::to_owned)
    }
}

impl fmt::Display for RepoPathBuf {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&**self, f)
    }
}

impl fmt::Debug for RepoPathBuf {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}
