mod digests;
mod errors;

pub mod diff;
pub mod fixtures;
pub mod ignore;
pub mod store;

mod model;
pub use model::{BlobMetadata, Commit, Node, NodeKind, Tree};

mod path;
pub use path::{PathComponent, PathComponentError, RepoPath, RepoPathBuf, RepoPathError};

pub use digests::{Digest, DIGEST_LEN};
pub use errors::{Error, TreeError};

#[cfg(test)]
mod tests;
