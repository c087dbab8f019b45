use std::collections::BTreeMap;
use std::sync::Arc;

use super::{entries, no_errors};
use crate::diff::diff_commits;
use crate::diff::ScmFileStatus::{Added, Modified, Removed};
use crate::fixtures::{FakeObjectStore, TreeBuilder};
use crate::{Commit, RepoPathBuf};

fn errors(expected: &[(&str, &str)]) -> BTreeMap<RepoPathBuf, String> {
    expected
        .iter()
        .map(|(path, message)| (path.parse().expect("valid path"), message.to_string()))
        .collect()
}

// The store hands out objects in whatever order the test releases them;
// the diff must make progress as data trickles in and still produce the
// complete result.
#[tokio::test]
async fn blocked_lookups_complete_out_of_order() {
    let store = Arc::new(FakeObjectStore::new());

    let mut builder = TreeBuilder::new();
    builder.set_file("a/b/c/d/e/f.txt", "contents");
    builder.set_file("a/b/1.txt", "1");
    builder.set_file("a/b/2.txt", "2");
    builder.set_file("src/main.c", "hello world");
    builder.set_file("src/test/test.c", "testing");
    let root1 = builder.finalize_unready(&store).unwrap();
    let commit1 = store.insert_commit(Commit { root_tree: root1 }).unwrap();

    let mut builder2 = builder.clone();
    builder2.set_file("src/main.c", "hello world v2");
    builder2.set_file("src/test/test2.c", "another test");
    builder2.remove_file("a/b/c/d/e/f.txt");
    builder2.set_executable_file("a/b/1.txt", "1");
    builder2.set_file("src/newdir/a.txt", "a");
    builder2.set_file("src/newdir/b/c.txt", "c");
    let root2 = builder2.finalize_unready(&store).unwrap();
    let commit2 = store.insert_commit(Commit { root_tree: root2 }).unwrap();

    let handle = {
        let store = store.clone();
        let (commit1, commit2) = (commit1.clone(), commit2.clone());
        tokio::spawn(async move { diff_commits(store, commit1, commit2).await })
    };

    // Release the data progressively, in an order no sequential walk would
    // produce: second commit first, then leaves before their parents.
    store.set_ready(&commit2);
    store.set_ready(&builder2.tree_digest("src/test"));
    store.set_ready(&builder.tree_digest("a/b/c/d/e"));
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
    // Nothing it needs has fully arrived, so the diff cannot be done yet.
    assert!(!handle.is_finished());

    store.set_all_ready();

    let result = handle.await.expect("diff task must not panic").unwrap();
    assert_eq!(no_errors(), result.errors);
    assert_eq!(
        entries(&[
            ("src/main.c", Modified),
            ("src/test/test2.c", Added),
            ("a/b/c/d/e/f.txt", Removed),
            ("a/b/1.txt", Modified),
            ("src/newdir/a.txt", Added),
            ("src/newdir/b/c.txt", Added),
        ]),
        result.entries
    );
}

// A store failure below one subtree is captured at that subtree's path;
// unrelated subtrees still produce definitive entries.
#[tokio::test]
async fn tree_load_error_is_isolated() {
    let store = Arc::new(FakeObjectStore::new());

    let mut builder = TreeBuilder::new();
    builder.set_file("a/b/1.txt", "1");
    builder.set_file("a/b/2.txt", "2");
    builder.set_file("a/b/3.txt", "3");
    builder.set_file("x/y/test.txt", "test");
    builder.set_file("x/y/z/file1.txt", "file1");
    let root1 = builder.finalize_unready(&store).unwrap();
    let commit1 = store.insert_commit(Commit { root_tree: root1 }).unwrap();

    let mut builder2 = builder.clone();
    builder2.set_file("a/b/3.txt", "new3");
    builder2.set_file("x/y/z/file2.txt", "file2");
    let root2 = builder2.finalize_unready(&store).unwrap();
    let commit2 = store.insert_commit(Commit { root_tree: root2 }).unwrap();

    // The right-hand x/y/z tree fails to load; everything else resolves.
    store.set_error(&builder2.tree_digest("x/y/z"), "oh noes");
    store.set_all_ready();

    let result = diff_commits(store, commit1, commit2).await.unwrap();
    assert_eq!(
        errors(&[("x/y/z", "internal storage error: oh noes")]),
        result.errors
    );
    assert_eq!(entries(&[("a/b/3.txt", Modified)]), result.entries);
}

// A blob metadata failure during a content-equality check is captured at
// the file's path, with no status entry for it.
#[tokio::test]
async fn blob_metadata_error_is_isolated() {
    let store = Arc::new(FakeObjectStore::new());

    let mut builder = TreeBuilder::new();
    builder.set_file("a/b/3.txt", "3");
    builder.set_file("a/b/4.txt", "4");
    let root1 = builder.finalize_unready(&store).unwrap();
    let commit1 = store.insert_commit(Commit { root_tree: root1 }).unwrap();

    let mut builder2 = builder.clone();
    builder2.set_file("a/b/3.txt", "new3");
    builder2.set_file("a/b/4.txt", "new4");
    let root2 = builder2.finalize_unready(&store).unwrap();
    let commit2 = store.insert_commit(Commit { root_tree: root2 }).unwrap();

    store.set_error(&builder2.blob_digest("a/b/3.txt"), "blob gone");
    store.set_all_ready();

    let result = diff_commits(store, commit1, commit2).await.unwrap();
    assert_eq!(
        errors(&[("a/b/3.txt", "internal storage error: blob gone")]),
        result.errors
    );
    assert_eq!(entries(&[("a/b/4.txt", Modified)]), result.entries);
}

// A failing ignore-file load records an error at the ignore file's path,
// and the subtree still diffs with the outer scopes.
#[tokio::test]
async fn ignore_load_error_falls_back_to_outer_scopes() {
    let store = Arc::new(FakeObjectStore::new());

    let mut builder = TreeBuilder::new();
    builder.set_file(".gitignore", "*.log\n");
    builder.set_file("src/main.c", "hello world");
    let root1 = builder.finalize_unready(&store).unwrap();
    let commit1 = store.insert_commit(Commit { root_tree: root1 }).unwrap();

    let mut builder2 = builder.clone();
    builder2.set_file("trace.log", "late");
    builder2.set_file("notes.txt", "new");
    let root2 = builder2.finalize_unready(&store).unwrap();
    let commit2 = store.insert_commit(Commit { root_tree: root2 }).unwrap();

    store.set_error(&builder.blob_digest(".gitignore"), "unavailable");
    store.set_all_ready();

    let result = diff_commits(store, commit1, commit2).await.unwrap();
    assert_eq!(
        errors(&[(".gitignore", "internal storage error: unavailable")]),
        result.errors
    );
    // Without the root rules, the log file surfaces as a plain addition.
    assert_eq!(
        entries(&[("trace.log", Added), ("notes.txt", Added)]),
        result.entries
    );
}
