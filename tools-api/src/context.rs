use runloop_protocol::CapabilityContract;
use runloop_protocol::TodoSnapshot;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Everything a [`crate::Tool`] needs to execute one call (§4.7).
pub struct ToolContext {
    pub thread_id: String,
    pub run_id: String,
    /// Workspace root tools must not read or write outside of
    /// (`OUTSIDE_WORKSPACE` otherwise).
    pub workspace_root: PathBuf,
    pub capability: CapabilityContract,
    pub cancellation: CancellationToken,
    /// Latest known todo snapshot, refreshed by the executor before each
    /// step; `todo_write` hydrates missing `content` fields against it.
    pub current_todos: TodoSnapshot,
}

impl ToolContext {
    pub fn new(thread_id: impl Into<String>, run_id: impl Into<String>, workspace_root: PathBuf, capability: CapabilityContract) -> Self {
        Self {
            thread_id: thread_id.into(),
            run_id: run_id.into(),
            workspace_root,
            capability,
            cancellation: CancellationToken::new(),
            current_todos: TodoSnapshot::default(),
        }
    }

    /// Resolve `relative` against the workspace root, rejecting any path
    /// that escapes it (`OUTSIDE_WORKSPACE`, §4.7).
    pub fn resolve_in_workspace(&self, relative: &str) -> Result<PathBuf, String> {
        let candidate = self.workspace_root.join(relative);
        let normalized = normalize(&candidate);
        if !normalized.starts_with(normalize(&self.workspace_root)) {
            return Err(format!("path {relative:?} escapes the workspace"));
        }
        Ok(normalized)
    }
}

fn normalize(path: &std::path::Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            std::path::Component::ParentDir => {
                result.pop();
            }
            std::path::Component::CurDir => {}
            other => result.push(other.as_os_str()),
        }
    }
    result
}
