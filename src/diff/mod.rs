//! The recursive tree comparator.
//!
//! Three traversal modes cover a subtree pair: both sides present
//! ([diff_trees]), right side only ([diff_added_tree]) and left side only
//! ([diff_removed_tree]). All of them emit `(path, status)` and
//! `(path, error)` events into the run's [DiffCallback] and only signal
//! completion; per-entry work at one directory is issued concurrently and
//! joined, so sibling subtrees complete in any order.
//!
//! Ignore rules are consulted for the added side only. A path tracked on the
//! left is always reported when it changes or disappears, no matter what the
//! ignore stack says; that asymmetry is deliberate and load-bearing.

use std::sync::Arc;

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use tracing::{instrument, warn};

use crate::ignore::{IgnoreFile, IgnoreMatch, IgnoreStack, TopLevelIgnores};
use crate::store::ObjectStore;
use crate::{Digest, Node, RepoPath, RepoPathBuf, Tree};

mod callback;
mod context;

pub use self::callback::{DiffCallback, ScmFileStatus, ScmStatus, ScmStatusCollector};
pub use self::context::{DiffContext, IgnoreLoader, StoreIgnoreLoader, GITIGNORE_NAME};

use crate::Error;

/// Diffs two commits and returns the accumulated status, with ignored paths
/// listed and no user- or system-level ignore rules.
///
/// Failing to resolve either commit fails the whole run; any error below the
/// root trees is captured per-path in [ScmStatus::errors] instead.
pub async fn diff_commits(
    store: Arc<dyn ObjectStore>,
    left: Digest,
    right: Digest,
) -> Result<ScmStatus, Error> {
    diff_commits_with_ignores(store, left, right, b"", b"", true).await
}

/// Diffs two commits with explicit user- and system-level ignore file
/// contents, and control over whether ignored paths are reported.
#[instrument(skip_all, fields(commit.left = %left, commit.right = %right))]
pub async fn diff_commits_with_ignores(
    store: Arc<dyn ObjectStore>,
    left: Digest,
    right: Digest,
    user_ignore: &[u8],
    system_ignore: &[u8],
    list_ignored: bool,
) -> Result<ScmStatus, Error> {
    let (left_commit, right_commit) =
        futures::try_join!(store.get_commit(&left), store.get_commit(&right))?;

    let callback = Arc::new(ScmStatusCollector::new());
    let ctx = DiffContext::new(store, callback.clone()).with_list_ignored(list_ignored);

    if left_commit.root_tree != right_commit.root_tree {
        let ignores = TopLevelIgnores::new(user_ignore, system_ignore);
        diff_trees(
            &ctx,
            RepoPathBuf::new(),
            left_commit.root_tree,
            right_commit.root_tree,
            ignores.stack(),
            false,
        )
        .await;
    }

    Ok(callback.take_status())
}

/// Diffs the trees identified by `left` and `right`, rooted at `path`.
///
/// Passing two equal digests is wasted work: identical subtrees are meant to
/// be skipped by the caller, which is what makes large unchanged trees
/// cheap. `parent_ignored` marks that an ancestor directory was excluded,
/// which forces every added entry below to be ignored (negations cannot
/// re-include inside an excluded directory).
#[instrument(skip(ctx, left, right, stack), fields(%path))]
pub async fn diff_trees(
    ctx: &DiffContext,
    path: RepoPathBuf,
    left: Digest,
    right: Digest,
    stack: Option<Arc<IgnoreStack>>,
    parent_ignored: bool,
) {
    diff_trees_inner(ctx, path, left, right, stack, parent_ignored).await
}

/// Walks a tree that only exists on the right side: every reachable leaf is
/// reported `ADDED`, or `IGNORED` under the given ignore stack.
#[instrument(skip(ctx, digest, stack), fields(%path))]
pub async fn diff_added_tree(
    ctx: &DiffContext,
    path: RepoPathBuf,
    digest: Digest,
    stack: Option<Arc<IgnoreStack>>,
    parent_ignored: bool,
) {
    diff_added_tree_inner(ctx, path, digest, stack, parent_ignored).await
}

/// Walks a tree that only exists on the left side: every reachable leaf is
/// reported `REMOVED`. Ignore rules are never consulted here; a tracked file
/// that disappears is always reported.
#[instrument(skip(ctx, digest), fields(%path))]
pub async fn diff_removed_tree(ctx: &DiffContext, path: RepoPathBuf, digest: Digest) {
    diff_removed_tree_inner(ctx, path, digest).await
}

fn diff_trees_inner<'a>(
    ctx: &'a DiffContext,
    path: RepoPathBuf,
    left: Digest,
    right: Digest,
    stack: Option<Arc<IgnoreStack>>,
    parent_ignored: bool,
) -> BoxFuture<'a, ()> {
    async move {
        let (left_tree, right_tree) = futures::join!(
            ctx.store().get_tree(&left),
            ctx.store().get_tree(&right)
        );
        let (left_tree, right_tree) = match (left_tree, right_tree) {
            (Ok(left_tree), Ok(right_tree)) => (left_tree, right_tree),
            (left_res, right_res) => {
                // The error stays local to this subtree; siblings continue.
                for err in [left_res.err(), right_res.err()].into_iter().flatten() {
                    warn!(%path, %err, "failed to load tree");
                    ctx.callback().record_error(path.clone(), &err);
                }
                return;
            }
        };

        // Rules only matter for added entries, which are all forced ignored
        // anyway below an excluded ancestor.
        let stack = if parent_ignored {
            stack
        } else {
            push_ignore_scope(ctx, &path, &right_tree, stack).await
        };

        let mut deferred: Vec<BoxFuture<'a, ()>> = Vec::new();
        let mut left_iter = left_tree.nodes().peekable();
        let mut right_iter = right_tree.nodes().peekable();

        loop {
            enum Step {
                LeftOnly,
                RightOnly,
                Both,
            }

            let step = match (left_iter.peek(), right_iter.peek()) {
                (None, None) => break,
                (Some(_), None) => Step::LeftOnly,
                (None, Some(_)) => Step::RightOnly,
                (Some((left_name, _)), Some((right_name, _))) => match left_name.cmp(right_name) {
                    std::cmp::Ordering::Less => Step::LeftOnly,
                    std::cmp::Ordering::Greater => Step::RightOnly,
                    std::cmp::Ordering::Equal => Step::Both,
                },
            };

            match step {
                Step::LeftOnly => {
                    if let Some((name, node)) = left_iter.next() {
                        if !ctx.is_hidden(name) {
                            removed_entry(ctx, path.join(name), node, &mut deferred);
                        }
                    }
                }
                Step::RightOnly => {
                    if let Some((name, node)) = right_iter.next() {
                        if !ctx.is_hidden(name) {
                            added_entry(ctx, path.join(name), node, &stack, parent_ignored, &mut deferred);
                        }
                    }
                }
                Step::Both => {
                    if let (Some((name, left_node)), Some((_, right_node))) =
                        (left_iter.next(), right_iter.next())
                    {
                        if !ctx.is_hidden(name) {
                            matched_entry(
                                ctx,
                                path.join(name),
                                left_node,
                                right_node,
                                &stack,
                                parent_ignored,
                                &mut deferred,
                            );
                        }
                    }
                }
            }
        }

        join_all(deferred).await;
    }
    .boxed()
}

fn diff_added_tree_inner<'a>(
    ctx: &'a DiffContext,
    path: RepoPathBuf,
    digest: Digest,
    stack: Option<Arc<IgnoreStack>>,
    parent_ignored: bool,
) -> BoxFuture<'a, ()> {
    async move {
        let tree = match ctx.store().get_tree(&digest).await {
            Ok(tree) => tree,
            Err(err) => {
                warn!(%path, %err, "failed to load added tree");
                ctx.callback().record_error(path, &err);
                return;
            }
        };

        let stack = if parent_ignored {
            stack
        } else {
            push_ignore_scope(ctx, &path, &tree, stack).await
        };

        let mut deferred: Vec<BoxFuture<'a, ()>> = Vec::new();
        for (name, node) in tree.nodes() {
            if ctx.is_hidden(name) {
                continue;
            }
            added_entry(ctx, path.join(name), node, &stack, parent_ignored, &mut deferred);
        }

        join_all(deferred).await;
    }
    .boxed()
}

fn diff_removed_tree_inner<'a>(
    ctx: &'a DiffContext,
    path: RepoPathBuf,
    digest: Digest,
) -> BoxFuture<'a, ()> {
    async move {
        let tree = match ctx.store().get_tree(&digest).await {
            Ok(tree) => tree,
            Err(err) => {
                warn!(%path, %err, "failed to load removed tree");
                ctx.callback().record_error(path, &err);
                return;
            }
        };

        let mut deferred: Vec<BoxFuture<'a, ()>> = Vec::new();
        for (name, node) in tree.nodes() {
            if ctx.is_hidden(name) {
                continue;
            }
            removed_entry(ctx, path.join(name), node, &mut deferred);
        }

        join_all(deferred).await;
    }
    .boxed()
}

/// Handles one name present in both trees.
fn matched_entry<'a>(
    ctx: &'a DiffContext,
    path: RepoPathBuf,
    left: &Node,
    right: &Node,
    stack: &Option<Arc<IgnoreStack>>,
    parent_ignored: bool,
    deferred: &mut Vec<BoxFuture<'a, ()>>,
) {
    match (left, right) {
        (Node::Tree { digest: left }, Node::Tree { digest: right }) => {
            // Equal digests mean equal subtrees; skipping them is the
            // fast-path that makes huge unchanged trees cheap.
            if left != right {
                deferred.push(diff_trees_inner(
                    ctx,
                    path,
                    left.clone(),
                    right.clone(),
                    stack.clone(),
                    parent_ignored,
                ));
            }
        }
        (Node::Tree { digest: left }, _) => {
            // A directory was replaced by a leaf: the old contents are
            // removed, the new leaf is an addition subject to ignore rules.
            deferred.push(diff_removed_tree_inner(ctx, path.clone(), left.clone()));
            added_entry(ctx, path, right, stack, parent_ignored, deferred);
        }
        (_, Node::Tree { .. }) => {
            // A leaf was replaced by a directory; the leaf was tracked, so
            // its removal is unconditional.
            ctx.callback()
                .record_status(path.clone(), ScmFileStatus::Removed);
            added_entry(ctx, path, right, stack, parent_ignored, deferred);
        }
        (left, right) => {
            if left.kind() != right.kind() {
                // A mode change is a content change.
                ctx.callback().record_status(path, ScmFileStatus::Modified);
            } else if left.digest() != right.digest() {
                deferred.push(compare_leaf_contents(
                    ctx,
                    path,
                    left.digest().clone(),
                    right.digest().clone(),
                ));
            }
        }
    }
}

/// Handles one entry only present on the right side.
fn added_entry<'a>(
    ctx: &'a DiffContext,
    path: RepoPathBuf,
    node: &Node,
    stack: &Option<Arc<IgnoreStack>>,
    parent_ignored: bool,
    deferred: &mut Vec<BoxFuture<'a, ()>>,
) {
    match node {
        Node::Tree { digest } => {
            let entry_ignored = parent_ignored || is_excluded(stack, &path, true);
            if entry_ignored && !ctx.list_ignored() {
                // Nothing under an ignored directory could be reported.
                return;
            }
            deferred.push(diff_added_tree_inner(
                ctx,
                path,
                digest.clone(),
                stack.clone(),
                entry_ignored,
            ));
        }
        _ => {
            if parent_ignored || is_excluded(stack, &path, false) {
                if ctx.list_ignored() {
                    ctx.callback().record_status(path, ScmFileStatus::Ignored);
                }
            } else {
                ctx.callback().record_status(path, ScmFileStatus::Added);
            }
        }
    }
}

/// Handles one entry only present on the left side.
fn removed_entry<'a>(
    ctx: &'a DiffContext,
    path: RepoPathBuf,
    node: &Node,
    deferred: &mut Vec<BoxFuture<'a, ()>>,
) {
    match node {
        Node::Tree { digest } => {
            deferred.push(diff_removed_tree_inner(ctx, path, digest.clone()));
        }
        _ => ctx.callback().record_status(path, ScmFileStatus::Removed),
    }
}

/// Decides whether two same-kind leaves with different object ids actually
/// differ in content, via blob metadata.
fn compare_leaf_contents<'a>(
    ctx: &'a DiffContext,
    path: RepoPathBuf,
    left: Digest,
    right: Digest,
) -> BoxFuture<'a, ()> {
    async move {
        let (left_meta, right_meta) = futures::join!(
            ctx.store().get_blob_metadata(&left),
            ctx.store().get_blob_metadata(&right)
        );
        match (left_meta, right_meta) {
            (Ok(left_meta), Ok(right_meta)) => {
                if left_meta.content_digest != right_meta.content_digest {
                    ctx.callback().record_status(path, ScmFileStatus::Modified);
                }
            }
            (left_res, right_res) => {
                for err in [left_res.err(), right_res.err()].into_iter().flatten() {
                    warn!(%path, %err, "failed to load blob metadata");
                    ctx.callback().record_error(path.clone(), &err);
                }
            }
        }
    }
    .boxed()
}

/// If the tree carries a `.gitignore` file, loads its contents and pushes a
/// scope for this directory onto the stack. A load failure is recorded at
/// the ignore file's path and the subtree continues with the outer scopes;
/// ignore evaluation is best-effort, tracked paths never depend on it.
async fn push_ignore_scope(
    ctx: &DiffContext,
    path: &RepoPath,
    tree: &Tree,
    stack: Option<Arc<IgnoreStack>>,
) -> Option<Arc<IgnoreStack>> {
    let digest = match tree.get(GITIGNORE_NAME) {
        Some(Node::File { digest, .. }) => digest,
        // Absent, or a symlink we don't follow: no new scope.
        _ => return stack,
    };

    let ignore_path = path
        .try_join(GITIGNORE_NAME)
        .expect("static ignore file name is a valid component");

    match ctx.load_ignore_file(&ignore_path, digest).await {
        Ok(contents) => Some(IgnoreStack::push(
            stack,
            IgnoreFile::parse(path.to_owned(), &contents),
        )),
        Err(err) => {
            warn!(path = %ignore_path, %err, "failed to load ignore file, keeping outer scopes");
            ctx.callback().record_error(ignore_path, &err);
            stack
        }
    }
}

fn is_excluded(stack: &Option<Arc<IgnoreStack>>, path: &RepoPath, is_dir: bool) -> bool {
    matches!(
        stack.as_ref().map(|stack| stack.match_path(path, is_dir)),
        Some(IgnoreMatch::Exclude)
    )
}
