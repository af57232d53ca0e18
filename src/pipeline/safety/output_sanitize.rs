//! Post-generation normalization. Runs before the reply gate.

use std::sync::LazyLock;

use regex::Regex;

/// Replies longer than this many characters are cut.
const MAX_REPLY_CHARS: usize = 100;
/// Characters kept when a reply is cut.
const TRUNCATED_REPLY_CHARS: usize = 80;

/// Strip model artifacts from raw output and cap its length.
///
/// 1. `<think>...</think>` reasoning blocks (an unclosed block runs to the end)
/// 2. Leading/trailing whitespace
/// 3. Over-long replies become the first 80 characters plus `...`
pub fn normalize_generated_text(raw: &str) -> String {
    static THINK_BLOCK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?is)<think>.*?(?:</think>|\z)").expect("valid regex"));
    static STRAY_THINK_TAG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)</?think>").expect("valid regex"));

    let text = THINK_BLOCK_RE.replace_all(raw, "");
    let text = STRAY_THINK_TAG_RE.replace_all(&text, "");
    let text = text.trim();

    if text.chars().count() > MAX_REPLY_CHARS {
        let mut cut: String = text.chars().take(TRUNCATED_REPLY_CHARS).collect();
        cut.push_str("...");
        return cut;
    }
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_reply_is_trimmed_only() {
        assert_eq!(normalize_generated_text("  胸口疼了三个小时了。\n"), "胸口疼了三个小时了。");
    }

    #[test]
    fn think_block_removed() {
        let raw = "<think>病人应该表现得焦虑</think>\n医生，我胸口特别闷。";
        assert_eq!(normalize_generated_text(raw), "医生，我胸口特别闷。");
    }

    #[test]
    fn unclosed_think_block_dropped() {
        assert_eq!(normalize_generated_text("我很难受<think>接下来要说"), "我很难受");
    }

    #[test]
    fn long_reply_capped_at_eighty_chars() {
        let raw = "疼".repeat(120);
        let out = normalize_generated_text(&raw);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), 83);
    }

    #[test]
    fn hundred_chars_is_not_cut() {
        let raw = "痛".repeat(100);
        assert_eq!(normalize_generated_text(&raw), raw);
    }

    #[test]
    fn only_reasoning_yields_empty() {
        assert!(normalize_generated_text("<think>...</think>   ").is_empty());
    }
}
