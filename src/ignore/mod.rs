//! Hierarchical ignore-rule evaluation in the gitignore dialect.
//!
//! One [IgnoreRule] is a single parsed pattern line, an [IgnoreFile] is the
//! ordered rule list of one ignore file scoped at the directory it was found
//! in, and an [IgnoreStack] chains the files in effect at a given point of
//! the traversal, from the system level down to the deepest `.gitignore`.

mod file;
mod rule;
mod stack;

pub use self::file::IgnoreFile;
pub use self::rule::IgnoreRule;
pub use self::stack::{IgnoreMatch, IgnoreStack, TopLevelIgnores};
