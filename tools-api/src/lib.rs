//! Uniform tool handler interface (C2, §4.7): the [`Tool`] trait every
//! concrete tool in `runloop-tools` implements, the [`ToolContext`] passed
//! to each call, and the [`ToolRegistry`] the executor queries for the
//! mode/capability-filtered definition list sent to the provider.

pub mod error;

mod context;
mod registry;
mod tool;

pub use context::ToolContext;
pub use error::ToolError;
pub use registry::ToolRegistry;
pub use tool::Tool;
