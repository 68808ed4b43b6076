//! Fixed-regex extraction of path-like and shell-token anchors from history
//! text, so the prompt builder can remind the model what it was touching
//! without re-sending the full history (§4.4).

use crate::budget::ANCHOR_CAP;
use regex_lite::Regex;
use std::sync::OnceLock;

fn path_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?:\./|/|[A-Za-z0-9_.-]+/)[A-Za-z0-9_./-]*[A-Za-z0-9_-]").unwrap())
}

fn shell_token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"`([^`\n]{1,80})`").unwrap())
}

/// Extract candidate anchors (file paths and backtick-quoted shell tokens)
/// from `text`, deduplicated, sorted, and capped at [`ANCHOR_CAP`].
pub fn extract_anchors(text: &str) -> Vec<String> {
    let mut anchors: Vec<String> = Vec::new();

    for capture in path_pattern().find_iter(text) {
        let candidate = capture.as_str();
        if candidate.len() > 3 && candidate.contains('/') {
            anchors.push(candidate.to_string());
        }
    }
    for capture in shell_token_pattern().captures_iter(text) {
        if let Some(token) = capture.get(1) {
            anchors.push(token.as_str().to_string());
        }
    }

    anchors.sort();
    anchors.dedup();
    anchors.truncate(ANCHOR_CAP);
    anchors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_paths_and_shell_tokens() {
        let text = "Edit src/lib.rs then run `cargo test` and check docs/readme.md";
        let anchors = extract_anchors(text);
        assert!(anchors.iter().any(|a| a == "src/lib.rs"));
        assert!(anchors.iter().any(|a| a == "cargo test"));
        assert!(anchors.iter().any(|a| a == "docs/readme.md"));
    }

    #[test]
    fn caps_at_twelve_and_sorts() {
        let mut text = String::new();
        for i in 0..20 {
            text.push_str(&format!("dir/file_{i:02}.rs "));
        }
        let anchors = extract_anchors(&text);
        assert_eq!(anchors.len(), 12);
        assert!(anchors.windows(2).all(|pair| pair[0] <= pair[1]));
    }
}
