use runloop_error::ErrorExt;
use runloop_error::ErrorKind;
use runloop_protocol::ToolErrorCode;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module)]
pub enum ToolError {
    #[snafu(display("{tool_name} argument error: {message}"))]
    InvalidArgs { tool_name: String, message: String },

    #[snafu(display("{tool_name} denied: {message}"))]
    PermissionDenied { tool_name: String, message: String },

    #[snafu(display("no tool registered with name {name:?}"))]
    UnknownTool { name: String },

    #[snafu(display("{tool_name} failed: {message}"))]
    Runtime {
        tool_name: String,
        code: ToolErrorCode,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, ToolError>;

impl ToolError {
    pub fn code(&self) -> ToolErrorCode {
        match self {
            ToolError::InvalidArgs { .. } => ToolErrorCode::InvalidArgs,
            ToolError::PermissionDenied { .. } => ToolErrorCode::PermissionDenied,
            ToolError::UnknownTool { .. } => ToolErrorCode::NotFound,
            ToolError::Runtime { code, .. } => *code,
        }
    }
}

impl ErrorExt for ToolError {
    fn kind(&self) -> ErrorKind {
        match self {
            ToolError::PermissionDenied { .. } => ErrorKind::Permission,
            _ => ErrorKind::ToolRuntime,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, ToolError::Runtime { code: ToolErrorCode::Timeout, .. })
    }
}
