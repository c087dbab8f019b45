use bstr::ByteSlice;

use super::{IgnoreMatch, IgnoreRule};
use crate::{RepoPath, RepoPathBuf};

/// The parsed rules of one ignore file, scoped at the directory it was
/// declared in. Candidate paths outside that directory are never matched.
pub struct IgnoreFile {
    base: RepoPathBuf,
    rules: Vec<IgnoreRule>,
}

impl IgnoreFile {
    /// Parses raw ignore file contents. Declaration order is preserved;
    /// [IgnoreFile::match_path] consults it in reverse, which yields git's
    /// last-match-wins convention within a single file.
    pub fn parse(base: RepoPathBuf, contents: &[u8]) -> Self {
        let rules = contents
            .split_str(b"\n")
            .filter_map(IgnoreRule::parse)
            .collect();

        Self { base, rules }
    }

    pub fn base(&self) -> &RepoPath {
        &self.base
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Matches a candidate path against this file's rules, walking the rules
    /// from last to first and returning on the first hit.
    pub fn match_path(&self, path: &RepoPath, is_dir: bool) -> IgnoreMatch {
        let Some(rel) = path.strip_prefix(&self.base) else {
            return IgnoreMatch::NoOpinion;
        };
        if rel.is_root() {
            // The scope root itself is governed by outer scopes.
            return IgnoreMatch::NoOpinion;
        }

        let components: Vec<&[u8]> = rel.components_bytes().collect();
        for rule in self.rules.iter().rev() {
            if rule.matches(&components, is_dir) {
                return if rule.is_negated() {
                    IgnoreMatch::Include
                } else {
                    IgnoreMatch::Exclude
                };
            }
        }

        IgnoreMatch::NoOpinion
    }
}
