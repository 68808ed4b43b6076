use serde::Deserialize;
use serde::Serialize;

/// Status of a single todo item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

/// One item in a thread's todo snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: String,
    pub content: String,
    pub status: TodoStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Prefix required on a todo's note when it is cancelled by waiting-user
/// closeout (I4).
pub const BLOCKED_WAITING_USER_PREFIX: &str = "blocked_waiting_user:";

/// Per-thread, version-counted list of work items with optimistic
/// concurrency (§3).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TodoSnapshot {
    pub version: u64,
    pub items: Vec<TodoItem>,
}

/// Returned when a write's `expected_version` does not match the current
/// snapshot version.
#[derive(Debug, Clone, Copy)]
pub struct VersionConflict {
    pub expected: u64,
    pub actual: u64,
}

impl std::fmt::Display for VersionConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "todo snapshot version conflict: expected {}, actual {}",
            self.expected, self.actual
        )
    }
}

impl std::error::Error for VersionConflict {}

impl TodoSnapshot {
    pub fn open_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i.status, TodoStatus::Pending | TodoStatus::InProgress))
            .count()
    }

    /// Apply a full replacement with optimistic concurrency.
    pub fn replace(&mut self, expected_version: u64, items: Vec<TodoItem>) -> Result<(), VersionConflict> {
        if expected_version != self.version {
            return Err(VersionConflict {
                expected: expected_version,
                actual: self.version,
            });
        }
        self.items = items;
        self.version += 1;
        Ok(())
    }

    /// (I4) Transition every pending/in-progress item to `cancelled` with a
    /// note carrying the `blocked_waiting_user:` prefix, preserving recently
    /// completed items up to `keep_completed`.
    ///
    /// Returns the number of items actually cancelled.
    pub fn close_for_waiting_user(&mut self, note_suffix: &str, keep_completed: usize) -> usize {
        let mut cancelled = 0;
        for item in &mut self.items {
            if matches!(item.status, TodoStatus::Pending | TodoStatus::InProgress) {
                item.status = TodoStatus::Cancelled;
                item.note = Some(format!("{BLOCKED_WAITING_USER_PREFIX} {note_suffix}"));
                cancelled += 1;
            }
        }
        // Trim older completed items, keeping the most recent `keep_completed`.
        let mut seen_completed = 0usize;
        for item in self.items.iter_mut().rev() {
            if matches!(item.status, TodoStatus::Completed) {
                seen_completed += 1;
                if seen_completed > keep_completed {
                    item.note = item.note.clone().or(Some("archived".to_string()));
                }
            }
        }
        if cancelled > 0 {
            self.version += 1;
        }
        cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, status: TodoStatus) -> TodoItem {
        TodoItem {
            id: id.to_string(),
            content: format!("task {id}"),
            status,
            note: None,
        }
    }

    #[test]
    fn replace_requires_matching_version() {
        let mut snap = TodoSnapshot::default();
        assert!(snap.replace(1, vec![]).is_err());
        assert!(snap.replace(0, vec![item("a", TodoStatus::Pending)]).is_ok());
        assert_eq!(snap.version, 1);
    }

    #[test]
    fn close_for_waiting_user_cancels_open_items_only() {
        let mut snap = TodoSnapshot {
            version: 0,
            items: vec![
                item("a", TodoStatus::Pending),
                item("b", TodoStatus::InProgress),
                item("c", TodoStatus::Completed),
            ],
        };
        let cancelled = snap.close_for_waiting_user("source=permission_blocked; ask: need creds", 5);
        assert_eq!(cancelled, 2);
        assert_eq!(snap.open_count(), 0);
        assert!(
            snap.items[0]
                .note
                .as_ref()
                .unwrap()
                .starts_with(BLOCKED_WAITING_USER_PREFIX)
        );
        assert_eq!(snap.items[2].status, TodoStatus::Completed);
        assert_eq!(snap.version, 1);
    }

    #[test]
    fn close_for_waiting_user_is_noop_when_nothing_open() {
        let mut snap = TodoSnapshot {
            version: 3,
            items: vec![item("a", TodoStatus::Completed)],
        };
        let cancelled = snap.close_for_waiting_user("x", 5);
        assert_eq!(cancelled, 0);
        assert_eq!(snap.version, 3);
    }
}
