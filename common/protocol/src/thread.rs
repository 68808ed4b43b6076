use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::run::RunState;

/// A conversation thread rooted at `(endpoint_id, thread_id)`.
///
/// Created on the first user turn; mutated only by the thread's owning
/// actor (see `runloop-session`). Never destroyed except by explicit
/// deletion at the store layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub endpoint_id: String,
    pub thread_id: String,
    pub title: Option<String>,
    /// Working directory for tool execution. May be outside `root_dir`.
    pub working_dir: PathBuf,
    pub model_id: Option<String>,
    /// When `true`, a run requesting a different `model_id` is refused (I5).
    pub model_locked: bool,
    pub last_run_status: Option<RunState>,
    pub last_run_error: Option<String>,
    pub last_message_preview: Option<String>,
    pub last_message_at_ms: Option<i64>,
    /// Free-form digest of the thread's currently active objective, used by
    /// the classifier's `objective_mode = continue` path.
    pub open_goal: Option<String>,
}

impl Thread {
    pub fn new(endpoint_id: impl Into<String>, thread_id: impl Into<String>, working_dir: PathBuf) -> Self {
        Self {
            endpoint_id: endpoint_id.into(),
            thread_id: thread_id.into(),
            title: None,
            working_dir,
            model_id: None,
            model_locked: false,
            last_run_status: None,
            last_run_error: None,
            last_message_preview: None,
            last_message_at_ms: None,
            open_goal: None,
        }
    }

    /// Check the model-lock invariant (I5): a thread locked to a model
    /// refuses a run requesting a different one.
    pub fn accepts_model(&self, requested: Option<&str>) -> bool {
        if !self.model_locked {
            return true;
        }
        match (&self.model_id, requested) {
            (Some(locked), Some(req)) => locked == req,
            // A locked thread with no requested override keeps the lock.
            (Some(_), None) => true,
            (None, _) => true,
        }
    }

    pub fn record_last_message(&mut self, preview: impl Into<String>, at_ms: i64) {
        let mut preview = preview.into();
        const MAX_PREVIEW_CHARS: usize = 200;
        if preview.chars().count() > MAX_PREVIEW_CHARS {
            preview = preview.chars().take(MAX_PREVIEW_CHARS).collect();
        }
        self.last_message_preview = Some(preview);
        self.last_message_at_ms = Some(at_ms);
    }
}
