//! End-to-end scenarios for the diff engine, driven through real stores.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::diff::{diff_trees, DiffContext, ScmFileStatus, ScmStatus, ScmStatusCollector};
use crate::fixtures::CannedIgnoreLoader;
use crate::ignore::TopLevelIgnores;
use crate::store::ObjectStore;
use crate::{Digest, RepoPathBuf};

mod diff;
mod diff_errors;

/// Diffs two trees the way `diff_commits_with_ignores` would, but with
/// canned `.gitignore` contents served for every ignore file encountered.
async fn diff_with_ignores(
    store: Arc<dyn ObjectStore>,
    left: Digest,
    right: Digest,
    gitignore: &str,
    user_ignore: &str,
    system_ignore: &str,
    list_ignored: bool,
) -> ScmStatus {
    let callback = Arc::new(ScmStatusCollector::new());
    let ctx = DiffContext::new(store, callback.clone())
        .with_list_ignored(list_ignored)
        .with_ignore_loader(Arc::new(CannedIgnoreLoader::new(gitignore)));

    let ignores = TopLevelIgnores::new(user_ignore.as_bytes(), system_ignore.as_bytes());
    diff_trees(
        &ctx,
        RepoPathBuf::new(),
        left,
        right,
        ignores.stack(),
        false,
    )
    .await;

    callback.take_status()
}

fn entries(expected: &[(&str, ScmFileStatus)]) -> BTreeMap<RepoPathBuf, ScmFileStatus> {
    expected
        .iter()
        .map(|(path, status)| (path.parse().expect("valid path"), *status))
        .collect()
}

fn no_entries() -> BTreeMap<RepoPathBuf, ScmFileStatus> {
    BTreeMap::new()
}

fn no_errors() -> BTreeMap<RepoPathBuf, String> {
    BTreeMap::new()
}
