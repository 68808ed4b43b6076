//! Concrete tool implementations (C2) registered against
//! [`runloop_tools_api::ToolRegistry`]: `terminal_exec`, `fs_read`,
//! `fs_write`, `todo_write`, and the `ask_user`/`task_complete` signals.

mod fs_read;
mod fs_write;
mod signals;
mod terminal_exec;
mod todo_write;

pub use fs_read::FsReadTool;
pub use fs_write::FsWriteTool;
pub use signals::AskUserTool;
pub use signals::TaskCompleteTool;
pub use terminal_exec::TerminalExecTool;
pub use todo_write::TodoWriteTool;

use runloop_tools_api::ToolRegistry;
use std::sync::Arc;

/// Registry populated with every builtin tool, ready for the executor to
/// filter per run via [`ToolRegistry::definitions_for`].
pub fn default_registry() -> ToolRegistry {
    let registry = ToolRegistry::new();
    registry.register(Arc::new(TerminalExecTool::new()));
    registry.register(Arc::new(FsReadTool::new()));
    registry.register(Arc::new(FsWriteTool::new()));
    registry.register(Arc::new(TodoWriteTool::new()));
    registry.register(Arc::new(AskUserTool::new()));
    registry.register(Arc::new(TaskCompleteTool::new()));
    registry
}
