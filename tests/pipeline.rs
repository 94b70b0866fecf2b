// ABOUTME: Integration tests for the deploy pipeline against a real work root.
// ABOUTME: Covers idempotence, garbage collection, bad archives, and single-flight.

mod support;

use std::fs;

use bytes::Bytes;
use lander::deploy::{DeployError, DeployErrorKind, Deployment, Pipeline};
use lander::types::Digest;

use support::{entries, listing, tar_gz, work_root};

#[tokio::test]
async fn first_deploy_extracts_and_promotes() {
    support::init_tracing();
    let (_dir, store) = work_root();
    let pipeline = Pipeline::new(store.clone());
    let archive = tar_gz(&[("hello.txt", "world")]);

    let report = pipeline.deploy(Bytes::from(archive.clone())).await.unwrap();

    assert_eq!(report.digest, Digest::of(&archive));
    assert!(report.extracted);
    assert!(report.removed.is_empty());
    assert!(report.warnings.is_empty());
    assert_eq!(store.current().unwrap(), Some(report.digest.clone()));
    assert_eq!(
        fs::read_to_string(store.current_path().join("hello.txt")).unwrap(),
        "world"
    );
    assert!(!pipeline.is_deploying());
}

#[tokio::test]
async fn redeploying_same_archive_skips_extraction() {
    let (_dir, store) = work_root();
    let pipeline = Pipeline::new(store.clone());
    let archive = Bytes::from(tar_gz(&[("hello.txt", "world")]));

    let first = pipeline.deploy(archive.clone()).await.unwrap();
    let second = pipeline.deploy(archive).await.unwrap();

    assert_eq!(first.digest, second.digest);
    assert!(!second.extracted);
    assert_eq!(store.current().unwrap(), Some(first.digest.clone()));
    assert_eq!(
        entries(store.root()),
        listing(&["current", first.digest.as_str()])
    );
}

#[tokio::test]
async fn redeploying_an_older_archive_keeps_two_entries() {
    let (_dir, store) = work_root();
    let pipeline = Pipeline::new(store.clone());
    let a = Bytes::from(tar_gz(&[("version.txt", "a")]));
    let b = Bytes::from(tar_gz(&[("version.txt", "b")]));

    let first = pipeline.deploy(a.clone()).await.unwrap();
    let second = pipeline.deploy(b).await.unwrap();
    assert_eq!(second.removed, vec![first.digest.to_string()]);

    let third = pipeline.deploy(a).await.unwrap();
    assert_eq!(third.digest, first.digest);
    assert!(third.extracted, "A was collected, so it must be extracted again");
    assert_eq!(third.removed, vec![second.digest.to_string()]);

    assert_eq!(
        entries(store.root()),
        listing(&["current", first.digest.as_str()])
    );
    assert_eq!(
        fs::read_to_string(store.current_path().join("version.txt")).unwrap(),
        "a"
    );
}

#[tokio::test]
async fn garbage_collection_removes_stray_entries() {
    let (_dir, store) = work_root();
    fs::create_dir(store.root().join("leftover")).unwrap();
    fs::write(store.root().join("notes.txt"), "stale").unwrap();
    let pipeline = Pipeline::new(store.clone());

    let report = pipeline
        .deploy(Bytes::from(tar_gz(&[("index.html", "<h1>hi</h1>")])))
        .await
        .unwrap();

    let mut removed = report.removed.clone();
    removed.sort();
    assert_eq!(removed, vec!["leftover".to_string(), "notes.txt".to_string()]);
    assert_eq!(entries(store.root()).len(), 2);
}

#[tokio::test]
async fn corrupt_upload_leaves_current_untouched() {
    let (_dir, store) = work_root();
    let pipeline = Pipeline::new(store.clone());
    let good = pipeline
        .deploy(Bytes::from(tar_gz(&[("hello.txt", "world")])))
        .await
        .unwrap();

    let err = pipeline
        .deploy(Bytes::from_static(b"this is not gzip"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), DeployErrorKind::Extraction);
    assert_eq!(store.current().unwrap(), Some(good.digest.clone()));
    assert_eq!(
        entries(store.root()),
        listing(&["current", good.digest.as_str()])
    );
    assert!(!pipeline.is_deploying(), "lock must be released after failure");
}

#[tokio::test]
async fn failed_extraction_leaves_no_version_directory() {
    let (_dir, store) = work_root();
    let pipeline = Pipeline::new(store.clone());
    let mut truncated = tar_gz(&[("big.txt", &"x".repeat(64 * 1024))]);
    truncated.truncate(truncated.len() / 2);
    let digest = Digest::of(&truncated);

    assert!(pipeline.deploy(Bytes::from(truncated.clone())).await.is_err());
    assert!(!store.exists(&digest));
    assert!(entries(store.root()).is_empty(), "staging must be discarded");

    // A retry of the same bytes must not find a half-written version.
    assert!(pipeline.deploy(Bytes::from(truncated)).await.is_err());
    assert_eq!(store.current().unwrap(), None);
}

#[tokio::test]
async fn empty_upload_is_reported_missing() {
    let (_dir, store) = work_root();
    let pipeline = Pipeline::new(store);

    let err = pipeline.deploy(Bytes::new()).await.unwrap_err();

    assert!(matches!(err, DeployError::UploadMissing));
    assert_eq!(err.to_string(), "'archive' file is missing");
}

#[tokio::test]
async fn concurrent_deploy_is_rejected_while_lock_held() {
    let (_dir, store) = work_root();
    let pipeline = Pipeline::new(store.clone());
    let guard = pipeline.lock().try_acquire().unwrap();

    let err = pipeline
        .deploy(Bytes::from(tar_gz(&[("hello.txt", "world")])))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), DeployErrorKind::LockHeld);
    assert!(err.lock_holder_info().is_some());
    assert!(err.to_string().contains("already in progress"));
    assert_eq!(store.current().unwrap(), None);

    drop(guard);
    assert!(
        pipeline
            .deploy(Bytes::from(tar_gz(&[("hello.txt", "world")])))
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn transitions_can_be_driven_step_by_step() {
    let (_dir, store) = work_root();
    let lock = lander::deploy::DeployLock::new();
    let archive = tar_gz(&[("a.txt", "1")]);

    let guard = lock.try_acquire().unwrap();
    let deployment = Deployment::new(store.clone(), guard, Bytes::from(archive.clone()));
    assert_eq!(deployment.upload_len(), archive.len());

    let hashed = deployment.hash().await.unwrap();
    assert_eq!(hashed.digest(), &Digest::of(&archive));

    let checked = hashed.check_store().await.unwrap();
    assert!(!checked.state().present());

    let ready = checked.extract().await.unwrap();
    assert!(ready.state().extracted());
    assert!(store.exists(ready.digest()));
    assert_eq!(store.current().unwrap(), None, "not promoted yet");

    let promoted = ready.promote().await.unwrap();
    assert!(lock.is_held());

    let report = promoted.collect_garbage().await.finish();
    assert_eq!(store.current().unwrap(), Some(report.digest));
    assert!(!lock.is_held(), "finishing releases the lock");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn overlapping_deploys_admit_exactly_one() {
    let (_dir, store) = work_root();
    let pipeline = Pipeline::new(store.clone());

    let names: Vec<String> = (0..3000).map(|i| format!("assets/file-{i}.txt")).collect();
    let files: Vec<(&str, &str)> = names.iter().map(|n| (n.as_str(), "payload")).collect();
    let slow = Bytes::from(tar_gz(&files));
    let quick = Bytes::from(tar_gz(&[("hello.txt", "world")]));

    let first = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move { pipeline.deploy(slow).await })
    };
    while !pipeline.is_deploying() {
        assert!(!first.is_finished(), "first deploy finished before it was observed");
        tokio::task::yield_now().await;
    }

    let second = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move { pipeline.deploy(quick).await })
    };

    let first = first.await.unwrap();
    let second = second.await.unwrap();

    let report = first.expect("first deploy should win the lock");
    let err = second.expect_err("second deploy should be turned away");
    assert_eq!(err.kind(), DeployErrorKind::LockHeld);
    assert!(err.to_string().contains("already in progress"));

    assert_eq!(store.current().unwrap(), Some(report.digest.clone()));
    assert_eq!(
        entries(store.root()),
        listing(&["current", report.digest.as_str()])
    );
    assert!(!pipeline.is_deploying());
}
