use serde::Deserialize;
use serde::Serialize;

/// Terminal and non-terminal states of a [`Run`].
///
/// The transition graph (§4.2):
/// `accepted -> running <-> waiting_approval`, `running -> recovering ->
/// running`, `running -> waiting_user` (terminal for the run, not the
/// thread), `running -> success | failed | timed_out`, and any `running*`
/// state can transition to `canceled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Accepted,
    Running,
    WaitingApproval,
    WaitingUser,
    Recovering,
    Success,
    Canceled,
    Failed,
    TimedOut,
}

impl RunState {
    /// (I3) A run never transitions out of a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::WaitingUser
                | RunState::Success
                | RunState::Canceled
                | RunState::Failed
                | RunState::TimedOut
        )
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: RunState) -> bool {
        if self.is_terminal() {
            return false;
        }
        use RunState::*;
        matches!(
            (self, next),
            (Accepted, Running)
                | (Running, WaitingApproval)
                | (WaitingApproval, Running)
                | (Running, Recovering)
                | (Recovering, Running)
                | (Running, WaitingUser)
                | (Running, Success)
                | (Running, Failed)
                | (Running, TimedOut)
                | (Accepted, Canceled)
                | (Running, Canceled)
                | (WaitingApproval, Canceled)
                | (Recovering, Canceled)
        )
    }
}

/// One attempt to advance a thread via a bounded step loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub endpoint_id: String,
    pub thread_id: String,
    pub message_id: String,
    pub state: RunState,
    pub error: Option<String>,
}

impl Run {
    pub fn new(
        run_id: impl Into<String>,
        endpoint_id: impl Into<String>,
        thread_id: impl Into<String>,
        message_id: impl Into<String>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            endpoint_id: endpoint_id.into(),
            thread_id: thread_id.into(),
            message_id: message_id.into(),
            state: RunState::Accepted,
            error: None,
        }
    }

    /// Apply a transition, returning an error describing the illegal move
    /// rather than panicking — callers decide how to surface that.
    pub fn transition(&mut self, next: RunState) -> Result<(), IllegalTransition> {
        if !self.state.can_transition_to(next) {
            return Err(IllegalTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IllegalTransition {
    pub from: RunState,
    pub to: RunState,
}

impl std::fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "illegal run transition {:?} -> {:?}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}
