//! The four decision functions applied, in order, after each step's tool
//! execution (§4.2 step h, §4.2.1): turn-recovery, loop guard, completion
//! gate, ask-user policy. The first to return a terminal verdict wins.

pub mod ask_user_policy;
pub mod completion_gate;
pub mod loop_guard;
pub mod synthesis;
pub mod todo_closeout;
pub mod turn_recovery;

pub use ask_user_policy::AskUserPolicy;
pub use ask_user_policy::AskUserVerdict;
pub use ask_user_policy::apply_ask_user_rules;
pub use completion_gate::CompletionGateInputs;
pub use completion_gate::CompletionRejection;
pub use completion_gate::evaluate_task_completion_gate;
pub use loop_guard::LoopGuard;
pub use loop_guard::LoopGuardReason;
pub use loop_guard::LoopGuardVerdict;
pub use loop_guard::TurnDigestInputs;
pub use synthesis::SYNTHESIS_DIRECTIVE;
pub use synthesis::needs_followup_hint;
pub use todo_closeout::CloseoutOutcome;
pub use todo_closeout::TodoStore;
pub use todo_closeout::close_out_todos_for_waiting_user;
pub use turn_recovery::RecoveryAction;
pub use turn_recovery::RecoveryState;
pub use turn_recovery::TurnRecoveryVerdict;
pub use turn_recovery::decide_turn_recovery;
