use std::sync::Arc;

use super::IgnoreFile;
use crate::{RepoPath, RepoPathBuf};

/// The answer of an ignore lookup for one candidate path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreMatch {
    /// A negated rule matched; the path is explicitly re-included.
    Include,
    /// A plain rule matched; the path is ignored.
    Exclude,
    /// No rule had an opinion. Added files are treated as included.
    NoOpinion,
}

/// A node in the chain of ignore scopes in effect at one point of the
/// traversal: this scope's [IgnoreFile] plus everything above it.
///
/// Nodes are pushed on descent and shared by reference between the
/// concurrent subtree tasks below them; the [Arc] keeps a parent alive for
/// as long as any descendant task still holds the chain.
pub struct IgnoreStack {
    parent: Option<Arc<IgnoreStack>>,
    file: IgnoreFile,
}

impl IgnoreStack {
    /// Pushes a new innermost scope, returning the extended chain.
    pub fn push(parent: Option<Arc<IgnoreStack>>, file: IgnoreFile) -> Arc<Self> {
        Arc::new(IgnoreStack { parent, file })
    }

    /// Matches a path against the whole chain, innermost scope first; the
    /// first scope with an opinion decides.
    pub fn match_path(&self, path: &RepoPath, is_dir: bool) -> IgnoreMatch {
        match self.file.match_path(path, is_dir) {
            IgnoreMatch::NoOpinion => match &self.parent {
                Some(parent) => parent.match_path(path, is_dir),
                None => IgnoreMatch::NoOpinion,
            },
            decided => decided,
        }
    }
}

/// The ignore layers that exist outside any tree: the system-level file and
/// the user-level (global) file. They scope at the repository root and sit
/// below every `.gitignore` in precedence.
pub struct TopLevelIgnores {
    stack: Option<Arc<IgnoreStack>>,
}

impl TopLevelIgnores {
    /// Builds the outer chain from raw user- and system-level ignore file
    /// contents. Either may be empty.
    pub fn new(user_contents: &[u8], system_contents: &[u8]) -> Self {
        let mut stack = None;
        // Outermost first: the user layer shadows the system layer.
        for contents in [system_contents, user_contents] {
            if !contents.is_empty() {
                stack = Some(IgnoreStack::push(
                    stack,
                    IgnoreFile::parse(RepoPathBuf::new(), contents),
                ));
            }
        }

        Self { stack }
    }

    pub fn empty() -> Self {
        Self { stack: None }
    }

    /// The root of the ignore chain a diff run starts from.
    pub fn stack(&self) -> Option<Arc<IgnoreStack>> {
        self.stack.clone()
    }
}
