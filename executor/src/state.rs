//! Per-run mutable runtime state (§4.2): "Each run owns a cancel scope, an
//! idle watchdog, a wall-time deadline, a no-progress counter, a recovery
//! budget, a completion-attempt counter, a loop-guard signature set, and a
//! mutable assistant-message draft." The counters and signature sets live
//! in [`RecoveryState`] and [`LoopGuard`]; this struct is the remaining
//! owner: cancellation, the two deadlines, and the completion/draft state.

use crate::decisions::LoopGuard;
use crate::decisions::RecoveryState;
use std::time::Duration;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

pub struct RuntimeState {
    pub cancellation: CancellationToken,
    wall_deadline: Instant,
    last_progress_at: Instant,
    idle_timeout: Duration,
    pub recovery: RecoveryState,
    pub loop_guard: LoopGuard,
    pub completion_attempts: u32,
    pub assistant_draft: String,
    /// Whether the one-time tools-suppressed synthesis step (§4.2.2) is
    /// still available for this run.
    pub synthesis_step_available: bool,
}

impl RuntimeState {
    pub fn new(max_wall_time: Duration, idle_timeout: Duration, recovery_budget: u32) -> Self {
        let now = Instant::now();
        Self {
            cancellation: CancellationToken::new(),
            wall_deadline: now + max_wall_time,
            last_progress_at: now,
            idle_timeout,
            recovery: RecoveryState::new(recovery_budget),
            loop_guard: LoopGuard::new(),
            completion_attempts: 0,
            assistant_draft: String::new(),
            synthesis_step_available: true,
        }
    }

    /// Reset the idle watchdog; called once per completed step.
    pub fn record_progress(&mut self) {
        self.last_progress_at = Instant::now();
    }

    pub fn is_wall_time_exceeded(&self) -> bool {
        Instant::now() >= self.wall_deadline
    }

    pub fn is_idle_timed_out(&self) -> bool {
        Instant::now().duration_since(self.last_progress_at) >= self.idle_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_is_not_timed_out() {
        let state = RuntimeState::new(Duration::from_secs(60), Duration::from_secs(30), 2);
        assert!(!state.is_wall_time_exceeded());
        assert!(!state.is_idle_timed_out());
    }

    #[test]
    fn zero_duration_deadlines_are_immediately_exceeded() {
        let state = RuntimeState::new(Duration::from_secs(0), Duration::from_secs(0), 2);
        assert!(state.is_wall_time_exceeded());
        assert!(state.is_idle_timed_out());
    }

    #[test]
    fn record_progress_resets_idle_watchdog() {
        let mut state = RuntimeState::new(Duration::from_secs(60), Duration::from_secs(0), 2);
        assert!(state.is_idle_timed_out());
        state.record_progress();
        assert!(state.is_idle_timed_out(), "zero timeout is always exceeded even right after progress");
    }
}
