use std::sync::Arc;

use super::{entries, no_entries, no_errors};
use crate::diff::ScmFileStatus::{Added, Modified, Removed};
use crate::diff::{
    diff_added_tree, diff_commits, diff_removed_tree, DiffContext, ScmStatusCollector,
};
use crate::fixtures::{TreeBuilder, DUMMY_DIGEST};
use crate::store::MemoryObjectStore;
use crate::{Error, Node, Tree};

#[tokio::test]
async fn unknown_commit() {
    let store = Arc::new(MemoryObjectStore::new());

    let result = diff_commits(store, DUMMY_DIGEST.clone(), DUMMY_DIGEST.clone()).await;
    assert_eq!(Err(Error::NotFound(DUMMY_DIGEST.clone())), result);
}

#[tokio::test]
async fn same_commit() {
    let store = MemoryObjectStore::new();

    let mut builder = TreeBuilder::new();
    builder.set_file("a/b/c/d/e/f.txt", "contents");
    let commit = builder.commit(&store).unwrap();

    let result = diff_commits(Arc::new(store), commit.clone(), commit)
        .await
        .unwrap();
    assert_eq!(no_entries(), result.entries);
    assert_eq!(no_errors(), result.errors);
}

#[tokio::test]
async fn basic_diff() {
    let store = MemoryObjectStore::new();

    let mut builder = TreeBuilder::new();
    builder.set_file("a/b/c/d/e/f.txt", "contents");
    builder.set_file("a/b/1.txt", "1");
    builder.set_file("a/b/2.txt", "2");
    builder.set_file("a/b/3.txt", "3");
    builder.set_file("src/main.c", "hello world");
    builder.set_file("src/lib.c", "helper code");
    builder.set_file("src/test/test.c", "testing");
    let commit1 = builder.commit(&store).unwrap();

    // Modify one file, add one file, and remove one file.
    let mut builder2 = builder.clone();
    builder2.set_file("src/main.c", "hello world v2");
    builder2.set_file("src/test/test2.c", "another test");
    builder2.remove_file("a/b/1.txt");
    let commit2 = builder2.commit(&store).unwrap();

    let result = diff_commits(Arc::new(store), commit1, commit2)
        .await
        .unwrap();
    assert_eq!(no_errors(), result.errors);
    assert_eq!(
        entries(&[
            ("src/main.c", Modified),
            ("src/test/test2.c", Added),
            ("a/b/1.txt", Removed),
        ]),
        result.entries
    );
}

#[tokio::test]
async fn directory_ordering() {
    let store = MemoryObjectStore::new();

    // Adding and removing files at the beginning and end of the sorted
    // entry list exercises both tails of the merge walk.
    let mut builder = TreeBuilder::new();
    builder.set_file("src/foo/bbb.txt", "b");
    builder.set_file("src/foo/ccc.txt", "c");
    builder.set_file("src/foo/xxx.txt", "x");
    builder.set_file("src/foo/yyy.txt", "y");
    let commit1 = builder.commit(&store).unwrap();

    let mut builder2 = builder.clone();
    builder2.set_file("src/foo/aaa.txt", "a");
    builder2.set_file("src/foo/zzz.txt", "z");
    let commit2 = builder2.commit(&store).unwrap();

    let store = Arc::new(store);
    let result = diff_commits(store.clone(), commit1.clone(), commit2.clone())
        .await
        .unwrap();
    assert_eq!(no_errors(), result.errors);
    assert_eq!(
        entries(&[("src/foo/aaa.txt", Added), ("src/foo/zzz.txt", Added)]),
        result.entries
    );

    let result2 = diff_commits(store, commit2, commit1).await.unwrap();
    assert_eq!(no_errors(), result2.errors);
    assert_eq!(
        entries(&[("src/foo/aaa.txt", Removed), ("src/foo/zzz.txt", Removed)]),
        result2.entries
    );
}

#[tokio::test]
async fn mode_change_file_to_symlink() {
    let store = MemoryObjectStore::new();

    let mut builder = TreeBuilder::new();
    builder.set_file("some_file", "contents");
    let commit1 = builder.commit(&store).unwrap();

    let mut builder2 = builder.clone();
    builder2.set_symlink("some_file", "contents");
    let commit2 = builder2.commit(&store).unwrap();

    let store = Arc::new(store);
    let result = diff_commits(store.clone(), commit1.clone(), commit2.clone())
        .await
        .unwrap();
    assert_eq!(no_errors(), result.errors);
    assert_eq!(entries(&[("some_file", Modified)]), result.entries);

    let result2 = diff_commits(store, commit2, commit1).await.unwrap();
    assert_eq!(no_errors(), result2.errors);
    assert_eq!(entries(&[("some_file", Modified)]), result2.entries);
}

#[tokio::test]
async fn mode_change_executable_bit() {
    let store = MemoryObjectStore::new();

    let mut builder = TreeBuilder::new();
    builder.set_file("a/b/1.txt", "1");
    let commit1 = builder.commit(&store).unwrap();

    // Same contents, only the executable bit flips.
    let mut builder2 = builder.clone();
    builder2.set_executable_file("a/b/1.txt", "1");
    let commit2 = builder2.commit(&store).unwrap();

    let result = diff_commits(Arc::new(store), commit1, commit2)
        .await
        .unwrap();
    assert_eq!(no_errors(), result.errors);
    assert_eq!(entries(&[("a/b/1.txt", Modified)]), result.entries);
}

#[tokio::test]
async fn new_directory() {
    let store = MemoryObjectStore::new();

    let mut builder = TreeBuilder::new();
    builder.set_file("src/foo/a.txt", "a");
    builder.set_file("src/foo/b.txt", "b");
    let commit1 = builder.commit(&store).unwrap();

    let mut builder2 = builder.clone();
    builder2.set_file("src/foo/a/b/c.txt", "c");
    builder2.set_file("src/foo/a/b/d.txt", "d");
    builder2.set_file("src/foo/a/b/e.txt", "e");
    builder2.set_file("src/foo/a/b/f/g.txt", "g");
    builder2.set_file("src/foo/z/y/x.txt", "x");
    builder2.set_file("src/foo/z/y/w.txt", "w");
    let commit2 = builder2.commit(&store).unwrap();

    let store = Arc::new(store);
    let result = diff_commits(store.clone(), commit1.clone(), commit2.clone())
        .await
        .unwrap();
    assert_eq!(no_errors(), result.errors);
    assert_eq!(
        entries(&[
            ("src/foo/a/b/c.txt", Added),
            ("src/foo/a/b/d.txt", Added),
            ("src/foo/a/b/e.txt", Added),
            ("src/foo/a/b/f/g.txt", Added),
            ("src/foo/z/y/x.txt", Added),
            ("src/foo/z/y/w.txt", Added),
        ]),
        result.entries
    );

    let result2 = diff_commits(store, commit2, commit1).await.unwrap();
    assert_eq!(no_errors(), result2.errors);
    assert_eq!(
        entries(&[
            ("src/foo/a/b/c.txt", Removed),
            ("src/foo/a/b/d.txt", Removed),
            ("src/foo/a/b/e.txt", Removed),
            ("src/foo/a/b/f/g.txt", Removed),
            ("src/foo/z/y/x.txt", Removed),
            ("src/foo/z/y/w.txt", Removed),
        ]),
        result2.entries
    );
}

#[tokio::test]
async fn file_to_directory() {
    let store = MemoryObjectStore::new();

    let mut builder = TreeBuilder::new();
    builder.set_file("src/foo/a.txt", "a");
    builder.set_executable_file("src/foo/b.txt", "b");
    builder.set_file("src/foo/a", "regular file");
    let commit1 = builder.commit(&store).unwrap();

    let mut builder2 = builder.clone();
    builder2.remove_file("src/foo/a");
    builder2.set_file("src/foo/a/b/c.txt", "c");
    builder2.set_file("src/foo/a/b/f/g.txt", "g");
    builder2.set_file("src/foo/z/y/x.txt", "x");
    let commit2 = builder2.commit(&store).unwrap();

    let store = Arc::new(store);
    let result = diff_commits(store.clone(), commit1.clone(), commit2.clone())
        .await
        .unwrap();
    assert_eq!(no_errors(), result.errors);
    assert_eq!(
        entries(&[
            ("src/foo/a", Removed),
            ("src/foo/a/b/c.txt", Added),
            ("src/foo/a/b/f/g.txt", Added),
            ("src/foo/z/y/x.txt", Added),
        ]),
        result.entries
    );

    // The mirror swaps ADDED and REMOVED exactly.
    let result2 = diff_commits(store, commit2, commit1).await.unwrap();
    assert_eq!(no_errors(), result2.errors);
    assert_eq!(
        entries(&[
            ("src/foo/a", Added),
            ("src/foo/a/b/c.txt", Removed),
            ("src/foo/a/b/f/g.txt", Removed),
            ("src/foo/z/y/x.txt", Removed),
        ]),
        result2.entries
    );
}

#[tokio::test]
async fn same_contents_under_different_ids() {
    let store = MemoryObjectStore::new();

    // Two trees referring to the same file contents under different object
    // ids: metadata resolves them as content-equal, so no entry is emitted.
    let contents = bytes::Bytes::from_static(b"same bytes");
    let id = store.put_blob(contents.clone()).unwrap();
    store
        .put_blob_alias(DUMMY_DIGEST.clone(), contents)
        .unwrap();

    let mut left_tree = Tree::new();
    left_tree
        .add(
            "file.txt".try_into().unwrap(),
            Node::File {
                digest: DUMMY_DIGEST.clone(),
                executable: false,
            },
        )
        .unwrap();
    let mut right_tree = Tree::new();
    right_tree
        .add(
            "file.txt".try_into().unwrap(),
            Node::File {
                digest: id,
                executable: false,
            },
        )
        .unwrap();

    let left = store.put_tree(left_tree).unwrap();
    let right = store.put_tree(right_tree).unwrap();

    let result = super::diff_with_ignores(Arc::new(store), left, right, "", "", "", true).await;
    assert_eq!(no_errors(), result.errors);
    assert_eq!(no_entries(), result.entries);
}

#[tokio::test]
async fn added_tree_direct() {
    let store = MemoryObjectStore::new();

    let mut builder = TreeBuilder::new();
    builder.set_file("src/bar/foo/e.txt", "e");
    builder.set_file("src/bar/foo/f.txt", "f");
    builder.finalize(&store).unwrap();

    let callback = Arc::new(ScmStatusCollector::new());
    let ctx = DiffContext::new(Arc::new(store), callback.clone());

    diff_added_tree(
        &ctx,
        "src/bar/foo".parse().unwrap(),
        builder.tree_digest("src/bar/foo"),
        None,
        false,
    )
    .await;

    let result = callback.take_status();
    assert_eq!(no_errors(), result.errors);
    assert_eq!(
        entries(&[("src/bar/foo/e.txt", Added), ("src/bar/foo/f.txt", Added)]),
        result.entries
    );
}

#[tokio::test]
async fn removed_tree_direct() {
    let store = MemoryObjectStore::new();

    let mut builder = TreeBuilder::new();
    builder.set_file("src/bar/foo/e.txt", "e");
    builder.set_file("src/bar/foo/f.txt", "f");
    builder.finalize(&store).unwrap();

    let callback = Arc::new(ScmStatusCollector::new());
    let ctx = DiffContext::new(Arc::new(store), callback.clone());

    diff_removed_tree(
        &ctx,
        "src/bar/foo".parse().unwrap(),
        builder.tree_digest("src/bar/foo"),
    )
    .await;

    let result = callback.take_status();
    assert_eq!(no_errors(), result.errors);
    assert_eq!(
        entries(&[
            ("src/bar/foo/e.txt", Removed),
            ("src/bar/foo/f.txt", Removed),
        ]),
        result.entries
    );
}

#[tokio::test]
async fn hidden_folder() {
    let store = MemoryObjectStore::new();

    let mut builder = TreeBuilder::new();
    builder.set_file("a/b.txt", "test\n");
    let commit1 = builder.commit(&store).unwrap();

    let mut builder2 = builder.clone();
    builder2.set_file("a/c.txt", "not ignored");
    // There should be no mention of this in the results.
    builder2.set_file(".hg/dirstate", "state");
    let commit2 = builder2.commit(&store).unwrap();

    let result = diff_commits(Arc::new(store), commit1, commit2)
        .await
        .unwrap();
    assert_eq!(no_errors(), result.errors);
    assert_eq!(entries(&[("a/c.txt", Added)]), result.entries);
}
