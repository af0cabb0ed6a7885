//! End-to-end publish protocol tests against local bare remotes.

use async_trait::async_trait;
use flotilla_git::{publish, publish_with_retry, ChangeSet, CommitOptions, GitError, GitRemote};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicU32, Ordering};
use tempfile::TempDir;

fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .current_dir(dir)
        .args([
            "-c",
            "user.name=fixture",
            "-c",
            "user.email=fixture@localhost",
            "-c",
            "init.defaultBranch=master",
        ])
        .args(args)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Bare remote seeded with one commit on master.
fn seed_remote() -> (TempDir, PathBuf) {
    let root = TempDir::new().unwrap();
    let remote = root.path().join("remote.git");
    std::fs::create_dir(&remote).unwrap();
    git(&remote, &["init", "--bare"]);

    let seed = root.path().join("seed");
    git(root.path(), &["clone", remote.to_str().unwrap(), "seed"]);
    std::fs::write(seed.join("README.md"), "seed\n").unwrap();
    git(&seed, &["add", "-A"]);
    git(&seed, &["commit", "-m", "seed"]);
    git(&seed, &["push", "origin", "HEAD"]);

    (root, remote)
}

/// Push a competing commit so the next push from an older clone is rejected.
fn advance_remote(root: &Path, remote: &Path, marker: &str) {
    let dir = root.join(format!("competing-{marker}"));
    git(root, &[
        "clone",
        remote.to_str().unwrap(),
        dir.file_name().unwrap().to_str().unwrap(),
    ]);
    std::fs::write(dir.join(format!("{marker}.txt")), marker).unwrap();
    git(&dir, &["add", "-A"]);
    git(&dir, &["commit", "-m", marker]);
    git(&dir, &["push", "origin", "HEAD"]);
}

struct WriteFile {
    name: String,
}

#[async_trait]
impl ChangeSet for WriteFile {
    async fn apply(&self, workdir: &Path) -> Result<(), GitError> {
        std::fs::write(workdir.join(&self.name), "content\n").map_err(GitError::apply)
    }
}

/// Counts attempts and sabotages the first `rejections` of them by moving
/// the remote tip after the working copy was cloned.
struct Contended {
    root: PathBuf,
    remote: PathBuf,
    attempts: AtomicU32,
    rejections: u32,
}

#[async_trait]
impl ChangeSet for Contended {
    async fn apply(&self, workdir: &Path) -> Result<(), GitError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.rejections {
            advance_remote(&self.root, &self.remote, &format!("attempt-{attempt}"));
        }
        std::fs::write(workdir.join("published.txt"), format!("attempt {attempt}\n"))
            .map_err(GitError::apply)
    }
}

#[tokio::test]
async fn test_publish_pushes_commit_and_tag() {
    let (root, remote_path) = seed_remote();
    let remote = GitRemote::new(remote_path.to_str().unwrap(), "", "");
    let before = remote.remote_head(Some("master")).await.unwrap();

    let options = CommitOptions::new("update service carts to version 1.0")
        .with_tag("carts-1.0", "Version carts-1.0");
    let changes = WriteFile {
        name: "carts.txt".into(),
    };
    publish_with_retry(&remote, Some("master"), &options, 10, &changes)
        .await
        .unwrap();

    let after = remote.remote_head(Some("master")).await.unwrap();
    assert_ne!(before, after);

    // Fresh clone sees the file and the tag.
    let check = root.path().join("check");
    git(root.path(), &["clone", remote_path.to_str().unwrap(), "check"]);
    assert!(check.join("carts.txt").exists());
    let tags = Command::new("git")
        .current_dir(&check)
        .args(["tag", "--list"])
        .output()
        .unwrap();
    assert!(String::from_utf8_lossy(&tags.stdout).contains("carts-1.0"));
}

#[tokio::test]
async fn test_publish_stages_deletions() {
    let (root, remote_path) = seed_remote();
    let remote = GitRemote::new(remote_path.to_str().unwrap(), "", "");

    struct DeleteReadme;
    #[async_trait]
    impl ChangeSet for DeleteReadme {
        async fn apply(&self, workdir: &Path) -> Result<(), GitError> {
            std::fs::remove_file(workdir.join("README.md")).map_err(GitError::apply)
        }
    }

    let options = CommitOptions::new("remove readme");
    publish_with_retry(&remote, Some("master"), &options, 1, &DeleteReadme)
        .await
        .unwrap();

    let check = root.path().join("check");
    git(root.path(), &["clone", remote_path.to_str().unwrap(), "check"]);
    assert!(!check.join("README.md").exists());
}

#[tokio::test]
async fn test_publish_retries_until_remote_stops_moving() {
    let (root, remote_path) = seed_remote();
    let remote = GitRemote::new(remote_path.to_str().unwrap(), "", "");

    let changes = Contended {
        root: root.path().to_path_buf(),
        remote: remote_path.clone(),
        attempts: AtomicU32::new(0),
        rejections: 3,
    };
    let options = CommitOptions::new("contended publish");
    publish_with_retry(&remote, Some("master"), &options, 10, &changes)
        .await
        .unwrap();

    // Rejected on attempts 1-3, re-cloned each time, succeeded on 4.
    assert_eq!(changes.attempts.load(Ordering::SeqCst), 4);

    let check = root.path().join("check");
    git(root.path(), &["clone", remote_path.to_str().unwrap(), "check"]);
    assert!(check.join("published.txt").exists());
    assert!(check.join("attempt-3.txt").exists());
}

#[tokio::test]
async fn test_publish_gives_up_after_bounded_attempts() {
    let (root, remote_path) = seed_remote();
    let remote = GitRemote::new(remote_path.to_str().unwrap(), "", "");

    let changes = Contended {
        root: root.path().to_path_buf(),
        remote: remote_path,
        attempts: AtomicU32::new(0),
        rejections: u32::MAX,
    };
    let options = CommitOptions::new("always contended");
    let err = publish_with_retry(&remote, Some("master"), &options, 3, &changes)
        .await
        .unwrap_err();

    assert!(matches!(err, GitError::RetriesExhausted { attempts: 3 }));
    assert_eq!(changes.attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_duplicate_tag_swallowed_only_when_allowed() {
    let (root, remote_path) = seed_remote();
    let remote = GitRemote::new(remote_path.to_str().unwrap(), "", "");

    // First publish creates the tag on the remote.
    let options = CommitOptions::new("first").with_tag("carts-1.0", "Version carts-1.0");
    let changes = WriteFile {
        name: "first.txt".into(),
    };
    publish_with_retry(&remote, Some("master"), &options, 1, &changes)
        .await
        .unwrap();

    // Same tag again, duplicates not allowed: rejected.
    let workdir = root.path().join("second");
    remote.clone_into(&workdir, Some("master")).await.unwrap();
    std::fs::write(workdir.join("second.txt"), "x").unwrap();
    let options = CommitOptions::new("second").with_tag("carts-1.0", "Version carts-1.0");
    let err = publish(&workdir, &options).await.unwrap_err();
    assert!(err.is_push_rejection());

    // Same tag again with duplicates allowed: success, nothing propagated.
    let workdir = root.path().join("third");
    remote.clone_into(&workdir, Some("master")).await.unwrap();
    std::fs::write(workdir.join("third.txt"), "x").unwrap();
    let options = CommitOptions::new("third")
        .with_tag("carts-1.0", "Version carts-1.0")
        .allow_duplicate_tag(true);
    publish(&workdir, &options).await.unwrap();

    let head = remote.remote_head(Some("master")).await.unwrap();
    let local = flotilla_git::remote::head_commit(&workdir).await.unwrap();
    assert_eq!(head, local);
}

#[tokio::test]
async fn test_remote_head_probe_tracks_pushes() {
    let (root, remote_path) = seed_remote();
    let remote = GitRemote::new(remote_path.to_str().unwrap(), "", "");

    let first = remote.remote_head(Some("master")).await.unwrap();
    advance_remote(root.path(), &remote_path, "probe");
    let second = remote.remote_head(Some("master")).await.unwrap();
    assert_ne!(first, second);
}
