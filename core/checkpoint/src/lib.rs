//! Workspace checkpointing (C10): snapshot a thread's working directory
//! before a run's first provider call, and restore it on rewind.

pub mod error;
mod git_backend;
mod tar_backend;

use error::CheckpointError;
use runloop_protocol::CheckpointBackend;
use runloop_protocol::CheckpointKind;
use runloop_protocol::WorkspaceCheckpoint;
use runloop_protocol::now_ms;
use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::debug;

/// Creates and restores [`WorkspaceCheckpoint`]s, picking `git_tree` when
/// the workspace is a git repository and falling back to `tar` otherwise.
///
/// Tracks which runs have already taken their pre-run snapshot so a
/// retried or re-entered step never creates a second one for the same
/// run — a per-run once-guard.
pub struct WorkspaceCheckpointer {
    checkpoints_root: PathBuf,
    created_for_run: Mutex<HashSet<String>>,
}

impl WorkspaceCheckpointer {
    pub fn new(checkpoints_root: impl Into<PathBuf>) -> Self {
        Self {
            checkpoints_root: checkpoints_root.into(),
            created_for_run: Mutex::new(HashSet::new()),
        }
    }

    async fn is_git_repo(workdir: &Path) -> bool {
        workdir.join(".git").exists()
    }

    /// Create the pre-run checkpoint for `run_id` if one hasn't already
    /// been created for it; otherwise return `None`.
    pub async fn create_pre_run(
        &self,
        thread_id: &str,
        run_id: &str,
        workdir: &Path,
    ) -> Result<Option<WorkspaceCheckpoint>, CheckpointError> {
        {
            let mut created = self.created_for_run.lock().await;
            if !created.insert(run_id.to_string()) {
                debug!(run_id, "pre-run checkpoint already created, skipping");
                return Ok(None);
            }
        }

        let checkpoint_id = WorkspaceCheckpoint::id_for_run(run_id);
        let backend = if Self::is_git_repo(workdir).await {
            git_backend::snapshot(workdir).await?
        } else {
            tokio::fs::create_dir_all(&self.checkpoints_root)
                .await
                .map_err(|source| CheckpointError::Io {
                    path: self.checkpoints_root.clone(),
                    source,
                })?;
            let archive_path = tar_backend::archive_path_for(&self.checkpoints_root, &checkpoint_id);
            let manifest_path = tar_backend::manifest_path_for(&self.checkpoints_root, &checkpoint_id);
            tar_backend::snapshot(workdir, &archive_path, &manifest_path).await?
        };

        Ok(Some(WorkspaceCheckpoint {
            checkpoint_id,
            thread_id: thread_id.to_string(),
            kind: CheckpointKind::PreRun,
            backend,
            created_at_ms: now_ms(),
        }))
    }

    /// Restore `workdir` to the state captured by `checkpoint`.
    pub async fn restore(&self, checkpoint: &WorkspaceCheckpoint, workdir: &Path) -> Result<(), CheckpointError> {
        match &checkpoint.backend {
            CheckpointBackend::GitTree { tree_oid, .. } => git_backend::restore(workdir, tree_oid).await,
            CheckpointBackend::Tar { archive_path, .. } => tar_backend::restore(workdir, Path::new(archive_path)).await,
        }
    }
}
