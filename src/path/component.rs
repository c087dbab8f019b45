use std::fmt;

use bytes::Bytes;
use thiserror::Error;

/// Longest entry name accepted, matching common filesystem limits.
pub const MAX_COMPONENT_LEN: usize = 255;

/// Why a byte string was rejected as an entry name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathComponentError {
    #[error("empty name")]
    Empty,
    #[error("'.' and '..' are reserved")]
    Reserved,
    #[error("name contains '/' or NUL")]
    ForbiddenByte,
    #[error("name longer than {} bytes", MAX_COMPONENT_LEN)]
    TooLong,
}

/// One name inside a tree: a single path segment.
///
/// Names are raw bytes, not necessarily UTF-8. Anything that could make a
/// segment mean something other than "one entry of this directory" is
/// rejected at construction: the empty string, the dot segments, and bytes
/// that would terminate the name early or start a new one. This is what lets
/// [crate::RepoPath] joins never escape the tree root.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PathComponent(pub(super) Bytes);

impl PathComponent {
    pub fn new(name: Bytes) -> Result<Self, PathComponentError> {
        check_component(&name)?;
        Ok(Self(name))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

pub(super) fn check_component(name: &[u8]) -> Result<(), PathComponentError> {
    if name.is_empty() {
        return Err(PathComponentError::Empty);
    }
    if name == b"." || name == b".." {
        return Err(PathComponentError::Reserved);
    }
    if name.iter().any(|&b| b == b'/' || b == 0x00) {
        return Err(PathComponentError::ForbiddenByte);
    }
    if name.len() > MAX_COMPONENT_LEN {
        return Err(PathComponentError::TooLong);
    }
    Ok(())
}

impl AsRef<[u8]> for PathComponent {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::borrow::Borrow<[u8]> for PathComponent {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl From<PathComponent> for Bytes {
    fn from(name: PathComponent) -> Self {
        name.0
    }
}

impl TryFrom<&[u8]> for PathComponent {
    type Error = PathComponentError;

    fn try_from(name: &[u8]) -> Result<Self, Self::Error> {
        Self::new(Bytes::copy_from_slice(name))
    }
}

impl TryFrom<&str> for PathComponent {
    type Error = PathComponentError;

    fn try_from(name: &str) -> Result<Self, Self::Error> {
        Self::try_from(name.as_bytes())
    }
}

impl fmt::Display for PathComponent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for PathComponent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.0))
    }
}
