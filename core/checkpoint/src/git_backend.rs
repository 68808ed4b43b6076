//! `git_tree` checkpoint backend.
//!
//! A snapshot is taken by staging the entire working tree — tracked and
//! untracked files alike — into a *disposable* index (via `GIT_INDEX_FILE`,
//! so the repository's real index is never touched) and writing that index
//! as a tree object. Restoring resets the real index and working tree to
//! that tree object with `git read-tree --reset -u`.

use crate::error::CheckpointError;
use crate::error::checkpoint_error::GitCommandSnafu;
use crate::error::checkpoint_error::IoSnafu;
use runloop_protocol::CheckpointBackend;
use std::path::Path;
use tokio::process::Command;

async fn run_git(workdir: &Path, args: &[&str], index_file: Option<&Path>) -> Result<String, CheckpointError> {
    let mut command = Command::new("git");
    command.arg("-C").arg(workdir).args(args);
    if let Some(index_file) = index_file {
        command.env("GIT_INDEX_FILE", index_file);
    }
    let output = command.output().await.map_err(|source| CheckpointError::Io {
        path: workdir.to_path_buf(),
        source,
    })?;
    if !output.status.success() {
        return GitCommandSnafu {
            workdir: workdir.to_path_buf(),
            args: args.iter().map(|a| a.to_string()).collect::<Vec<_>>(),
            message: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
        .fail();
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Snapshot `workdir` into a git tree object. The returned `untracked`
/// list is informational (which paths had no tracked counterpart at
/// snapshot time) — the tree itself already contains their content.
pub async fn snapshot(workdir: &Path) -> Result<CheckpointBackend, CheckpointError> {
    let untracked_raw = run_git(workdir, &["ls-files", "--others", "--exclude-standard"], None).await?;
    let untracked: Vec<String> = untracked_raw.lines().filter(|l| !l.is_empty()).map(str::to_string).collect();

    let temp_index = tempfile::Builder::new()
        .prefix("runloop-checkpoint-index-")
        .tempfile()
        .map_err(|source| CheckpointError::Io {
            path: workdir.to_path_buf(),
            source,
        })?;
    let temp_index_path = temp_index.path().to_path_buf();
    // Close the handle; `add`/`write-tree` below manage the file via path.
    temp_index.close().map_err(|source| CheckpointError::Io {
        path: temp_index_path.clone(),
        source,
    })?;

    run_git(workdir, &["add", "-A"], Some(&temp_index_path)).await?;
    let tree_oid = run_git(workdir, &["write-tree"], Some(&temp_index_path)).await?;
    let _ = tokio::fs::remove_file(&temp_index_path).await;

    Ok(CheckpointBackend::GitTree { tree_oid, untracked })
}

/// Reset the working tree and index to `tree_oid`.
pub async fn restore(workdir: &Path, tree_oid: &str) -> Result<(), CheckpointError> {
    run_git(workdir, &["read-tree", "--reset", "-u", tree_oid], None).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn init_repo(dir: &Path) -> bool {
        let Ok(status) = Command::new("git").arg("-C").arg(dir).args(["init", "-q"]).status().await else {
            return false;
        };
        if !status.success() {
            return false;
        }
        let _ = Command::new("git")
            .arg("-C")
            .arg(dir)
            .args(["config", "user.email", "test@example.com"])
            .status()
            .await;
        let _ = Command::new("git")
            .arg("-C")
            .arg(dir)
            .args(["config", "user.name", "test"])
            .status()
            .await;
        true
    }

    #[tokio::test]
    async fn snapshot_and_restore_round_trips_tracked_and_untracked_files() {
        let workdir = tempfile::tempdir().unwrap();
        if !init_repo(workdir.path()).await {
            eprintln!("skipping: git not available");
            return;
        }

        tokio::fs::write(workdir.path().join("tracked.txt"), "v1").await.unwrap();
        tokio::fs::write(workdir.path().join("scratch.txt"), "untracked-v1").await.unwrap();

        let backend = snapshot(workdir.path()).await.unwrap();
        let CheckpointBackend::GitTree { tree_oid, untracked } = backend else {
            panic!("expected git tree backend");
        };
        assert!(untracked.iter().any(|p| p == "scratch.txt"));
        assert!(untracked.iter().any(|p| p == "tracked.txt"));

        tokio::fs::write(workdir.path().join("tracked.txt"), "v2").await.unwrap();
        tokio::fs::remove_file(workdir.path().join("scratch.txt")).await.unwrap();

        restore(workdir.path(), &tree_oid).await.unwrap();

        let tracked = tokio::fs::read_to_string(workdir.path().join("tracked.txt")).await.unwrap();
        assert_eq!(tracked, "v1");
        let scratch = tokio::fs::read_to_string(workdir.path().join("scratch.txt")).await.unwrap();
        assert_eq!(scratch, "untracked-v1");
    }
}
