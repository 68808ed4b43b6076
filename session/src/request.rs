//! Wire-shaped inputs and results for the `send_user_turn` operation
//! (§4.1, §6).

use runloop_protocol::RunMode;

/// Attachment reference carried alongside a user turn's text. Content
/// itself is resolved by the caller before reaching the session layer;
/// only the reference is threaded through here.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub attachment_id: String,
    pub kind: String,
}

#[derive(Debug, Clone)]
pub struct UserInput {
    pub text: String,
    pub attachments: Vec<Attachment>,
    /// Caller-supplied idempotency key for this message (§3: must satisfy
    /// `is_valid_message_id` if present).
    pub client_message_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SendUserTurnOptions {
    pub max_steps: Option<u32>,
    pub max_no_tool_rounds: Option<u32>,
    pub mode: RunMode,
}

impl Default for SendUserTurnOptions {
    fn default() -> Self {
        Self {
            max_steps: None,
            max_no_tool_rounds: None,
            mode: RunMode::Act,
        }
    }
}

/// Inputs to `send_user_turn` (§4.1).
#[derive(Debug, Clone)]
pub struct SendUserTurnInput {
    pub thread_id: String,
    pub model: Option<String>,
    pub input: UserInput,
    pub options: SendUserTurnOptions,
    /// Caller's last-known run id; a mismatch with the thread's actual
    /// latest run means the caller is acting on stale state.
    pub expected_run_id: Option<String>,
    /// Set when this turn replies to a `waiting_user` prompt rather than
    /// starting a fresh turn; must match the thread's pending prompt id.
    pub reply_to_waiting_prompt_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SendUserTurnResult {
    pub run_id: String,
    pub kind: &'static str,
    pub consumed_waiting_prompt_id: Option<String>,
}

impl SendUserTurnResult {
    pub fn started(run_id: impl Into<String>, consumed_waiting_prompt_id: Option<String>) -> Self {
        Self {
            run_id: run_id.into(),
            kind: "start",
            consumed_waiting_prompt_id,
        }
    }
}
