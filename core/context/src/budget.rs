//! Size constants governing history compression (§4.4).

/// Soft character budget for the compressed history passed to the provider.
pub const HISTORY_SOFT_CHAR_BUDGET: usize = 45_000;

/// Number of most-recent messages always kept verbatim.
pub const HISTORY_RECENT_MESSAGE_KEEP: usize = 20;

/// Maximum size of the bulleted summary produced for the older half of
/// history once it is split out.
pub const HISTORY_SUMMARY_MAX_CHARS: usize = 3_200;

/// Per-message preview length inside the summary, in Unicode scalar values.
pub const MESSAGE_PREVIEW_MAX_RUNES: usize = 180;

/// Maximum number of anchors retained per run.
pub const ANCHOR_CAP: usize = 12;
