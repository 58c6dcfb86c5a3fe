//! Concurrency tests for filevault.
//!
//! These tests verify that concurrent tree operations keep the folder-name
//! uniqueness and non-empty-delete rules, using an on-disk database so the
//! pool hands out real concurrent connections.

mod common;

use common::TestContext;
use filevault::{NodeKind, UploadRequest, VaultError};

/// Two parallel createFolder calls with the same (owner, parent, name).
#[tokio::test]
async fn test_parallel_create_folder_single_winner() {
    let (ctx, _db_dir) = TestContext::on_disk().await;

    let a = ctx.service.clone();
    let b = ctx.service.clone();
    let (first, second) = tokio::join!(
        tokio::spawn(async move { a.create_folder(1, "Reports", None).await }),
        tokio::spawn(async move { b.create_folder(1, "Reports", None).await }),
    );
    let results = [first.unwrap(), second.unwrap()];

    let successes = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(VaultError::Conflict(_))))
        .count();
    assert_eq!(successes, 1, "exactly one create should succeed");
    assert_eq!(conflicts, 1, "exactly one create should conflict");

    let folders: Vec<_> = ctx
        .service
        .list_children(1, None)
        .await
        .unwrap()
        .into_iter()
        .filter(|n| n.kind == NodeKind::Folder && n.name == "Reports")
        .collect();
    assert_eq!(folders.len(), 1);
}

/// Many tasks racing on the same name under a nested parent.
#[tokio::test]
async fn test_many_parallel_creates_under_parent() {
    let (ctx, _db_dir) = TestContext::on_disk().await;
    let parent_id = ctx.service.create_folder(1, "Projects", None).await.unwrap().id;

    const NUM_TASKS: usize = 8;

    let mut handles = Vec::new();
    for _ in 0..NUM_TASKS {
        let service = ctx.service.clone();
        handles.push(tokio::spawn(async move {
            service.create_folder(1, "2024", Some(parent_id)).await
        }));
    }

    let mut success_count = 0;
    let mut conflict_count = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => success_count += 1,
            Err(VaultError::Conflict(_)) => conflict_count += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(success_count, 1);
    assert_eq!(conflict_count, NUM_TASKS - 1);
    assert_eq!(
        ctx.service
            .list_children(1, Some(parent_id))
            .await
            .unwrap()
            .len(),
        1
    );
}

/// Different owners racing on the same name never conflict with each other.
#[tokio::test]
async fn test_parallel_creates_for_different_owners() {
    let (ctx, _db_dir) = TestContext::on_disk().await;

    let mut handles = Vec::new();
    for owner_id in 1..=4 {
        let service = ctx.service.clone();
        handles.push(tokio::spawn(async move {
            service.create_folder(owner_id, "Inbox", None).await
        }));
    }

    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }
}

/// Parallel uploads of the same name all succeed with distinct blobs.
#[tokio::test]
async fn test_parallel_uploads_same_name() {
    let (ctx, _db_dir) = TestContext::on_disk().await;

    const NUM_UPLOADS: usize = 6;

    let mut handles = Vec::new();
    for i in 0..NUM_UPLOADS {
        let service = ctx.service.clone();
        handles.push(tokio::spawn(async move {
            let body = format!("version {i}").into_bytes();
            service
                .upload_file(1, UploadRequest::new("report.txt", body))
                .await
        }));
    }

    let mut refs = Vec::new();
    for handle in handles {
        let node = handle.await.unwrap().unwrap();
        refs.push(node.physical_ref.unwrap());
    }
    refs.sort();
    refs.dedup();

    assert_eq!(refs.len(), NUM_UPLOADS);
    assert_eq!(ctx.blob_count(1), NUM_UPLOADS);
}
