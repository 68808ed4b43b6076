//! Context Orchestrator (C5, §4.4): compresses raw history into a
//! provider-sized window and derives the [`RunContextPackage`] consumed by
//! `runloop-prompt`.

mod anchors;
mod budget;
mod orchestrator;
mod package;

pub use anchors::extract_anchors;
pub use budget::ANCHOR_CAP;
pub use budget::HISTORY_RECENT_MESSAGE_KEEP;
pub use budget::HISTORY_SOFT_CHAR_BUDGET;
pub use budget::HISTORY_SUMMARY_MAX_CHARS;
pub use budget::MESSAGE_PREVIEW_MAX_RUNES;
pub use orchestrator::compress_history;
pub use package::ContextStats;
pub use package::RunContextPackage;
