//! Shared error taxonomy for the run orchestrator.
//!
//! Every crate in the workspace defines its own `snafu`-derived error enum
//! local to its concerns (see each crate's `error.rs`). This crate provides
//! the cross-cutting [`ErrorKind`] classification referenced by those
//! enums so that callers on the RPC boundary (§7 of the design) can map any
//! error back to one of a small, stable set of categories without knowing
//! about every crate's internal variants.

use serde::Deserialize;
use serde::Serialize;

/// Coarse error taxonomy shared across the workspace.
///
/// This mirrors the categories from the error handling design: Config,
/// Concurrency, Permission, ToolRuntime, Provider, Policy, Lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Not configured, model not allowed, locked model mismatch, model
    /// switch requires restart.
    Config,
    /// Thread busy, run changed, waiting prompt changed, config locked.
    Concurrency,
    /// RWX denied, plan-mode guard block, dangerous-command block, tool
    /// approval denied/timed out.
    Permission,
    /// INVALID_ARGS, INVALID_PATH, OUTSIDE_WORKSPACE, NOT_FOUND,
    /// PERMISSION_DENIED, TIMEOUT, INTERNAL.
    ToolRuntime,
    /// Transport, stream parse, empty output.
    Provider,
    /// Ask-user rejected, closeout/todo version conflict.
    Policy,
    /// Timeout, canceled, loop-guard fail, recovery-budget exhausted.
    Lifecycle,
}

impl ErrorKind {
    /// Whether an error of this kind is generally safe to retry without
    /// operator intervention.
    pub fn retryable(self) -> bool {
        matches!(self, ErrorKind::Provider | ErrorKind::ToolRuntime)
    }

    /// Stable machine-readable tag, suitable for the `reason` field of a
    /// lifecycle event or RPC error payload.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Config => "config",
            ErrorKind::Concurrency => "concurrency",
            ErrorKind::Permission => "permission",
            ErrorKind::ToolRuntime => "tool_runtime",
            ErrorKind::Provider => "provider",
            ErrorKind::Policy => "policy",
            ErrorKind::Lifecycle => "lifecycle",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Implemented by every crate-local error enum so that the RPC boundary
/// can classify any failure without matching on its concrete variants.
pub trait ErrorExt: std::error::Error {
    /// The coarse category this error belongs to.
    fn kind(&self) -> ErrorKind;

    /// Whether this specific error instance should be retried.
    ///
    /// Defaults to the kind's general retryability; override when a
    /// specific variant disagrees with its kind's default (e.g. a
    /// `Provider` error that is a hard 4xx rather than a transient 5xx).
    fn is_retryable(&self) -> bool {
        self.kind().retryable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_matches_expected_kinds() {
        assert!(ErrorKind::Provider.retryable());
        assert!(ErrorKind::ToolRuntime.retryable());
        assert!(!ErrorKind::Permission.retryable());
        assert!(!ErrorKind::Lifecycle.retryable());
    }

    #[test]
    fn as_str_round_trips_through_display() {
        for kind in [
            ErrorKind::Config,
            ErrorKind::Concurrency,
            ErrorKind::Permission,
            ErrorKind::ToolRuntime,
            ErrorKind::Provider,
            ErrorKind::Policy,
            ErrorKind::Lifecycle,
        ] {
            assert_eq!(kind.to_string(), kind.as_str());
        }
    }
}
