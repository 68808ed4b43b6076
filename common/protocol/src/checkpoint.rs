use serde::Deserialize;
use serde::Serialize;

/// Which snapshot mechanism a [`WorkspaceCheckpoint`] was taken with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum CheckpointBackend {
    /// A git-tree snapshot plus the list of untracked files captured
    /// alongside it (since `git stash`/tree objects don't cover those).
    GitTree { tree_oid: String, untracked: Vec<String> },
    /// A tar archive plus a manifest describing what it contains.
    Tar { archive_path: String, manifest_path: String },
}

/// A `(git_tree | tar)` snapshot of a thread's working directory,
/// referenced by a stable checkpoint id (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceCheckpoint {
    pub checkpoint_id: String,
    pub thread_id: String,
    pub kind: CheckpointKind,
    pub backend: CheckpointBackend,
    pub created_at_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointKind {
    PreRun,
}

impl WorkspaceCheckpoint {
    /// The stable checkpoint id created before a run's first provider call:
    /// `cp_<run_id>` (§8, R3).
    pub fn id_for_run(run_id: &str) -> String {
        format!("cp_{run_id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_id_format() {
        assert_eq!(WorkspaceCheckpoint::id_for_run("run-42"), "cp_run-42");
    }
}
