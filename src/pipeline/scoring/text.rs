//! Keyword helpers and marker tables shared by the dimension scorers.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static PUNCTUATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));
static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("valid regex"));

const STOP_WORDS: &[&str] = &["的", "了", "是", "在", "有", "和", "与", "或"];

/// Courtesy expressions; one hit marks a message as polite.
pub const POLITENESS_MARKERS: &[&str] = &["请", "您好", "麻烦", "谢谢", "不好意思", "请问"];

/// Expressions of empathy; counted once per message.
pub const EMPATHY_MARKERS: &[&str] = &[
    "理解", "担心", "不容易", "别急", "慢慢来", "感受", "心情", "安慰",
];

/// The seven symptom dimensions and the words that show the student asked
/// about each: location, nature, severity, duration, aggravating factors,
/// relieving factors, associated symptoms.
pub const SYMPTOM_TRIGGERS: [&[&str]; 7] = [
    &["部位", "哪里", "位置"],
    &["性质", "怎么", "样", "感觉"],
    &["程度", "多", "严重", "几分"],
    &["多久", "多长时间", "持续"],
    &["诱因", "什么", "原因", "引起"],
    &["缓解", "怎么", "舒服"],
    &["还", "其他", "伴随"],
];

/// Content keywords of a key question: punctuation removed, split on
/// whitespace, stop-words and single characters dropped.
pub fn extract_keywords(question: &str) -> Vec<String> {
    PUNCTUATION_RE
        .replace_all(question, "")
        .split_whitespace()
        .filter(|w| !STOP_WORDS.contains(w) && w.chars().count() > 1)
        .map(str::to_lowercase)
        .collect()
}

/// Lowercased, trimmed, punctuation-free form used for duplicate detection.
pub fn normalize_question(text: &str) -> String {
    PUNCTUATION_RE
        .replace_all(text.trim().to_lowercase().as_str(), "")
        .into_owned()
}

/// Distinct `\w+` tokens of a lowercased string.
pub fn word_set(text: &str) -> HashSet<String> {
    WORD_RE
        .find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

pub fn contains_any(text: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| text.contains(m))
}

/// Fraction of `messages` containing at least one marker; 0 when empty.
pub fn hit_rate(messages: &[&str], markers: &[&str]) -> f64 {
    if messages.is_empty() {
        return 0.0;
    }
    count_hits(messages, markers) as f64 / messages.len() as f64
}

pub fn count_hits(messages: &[&str], markers: &[&str]) -> usize {
    messages.iter().filter(|m| contains_any(m, markers)).count()
}

/// Round half away from zero to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_drop_stop_words_and_single_chars() {
        assert_eq!(extract_keywords("疼痛 的 部位"), vec!["疼痛", "部位"]);
        assert_eq!(extract_keywords("有 无 发热？"), vec!["发热"]);
        assert!(extract_keywords("是 的").is_empty());
    }

    #[test]
    fn keywords_are_lowercased() {
        assert_eq!(extract_keywords("做过 CT 吗"), vec!["做过", "ct"]);
        assert_eq!(extract_keywords("做 MRI 吗"), vec!["mri"]);
    }

    #[test]
    fn unsplit_question_is_one_keyword() {
        assert_eq!(extract_keywords("疼痛部位在哪里？"), vec!["疼痛部位在哪里"]);
    }

    #[test]
    fn normalization_strips_punctuation() {
        assert_eq!(normalize_question("  疼了多久？ "), "疼了多久");
        assert_eq!(normalize_question("Pain, WHERE?"), "pain where");
    }

    #[test]
    fn word_sets_split_on_non_word() {
        let words = word_set("急性 心肌梗死（前壁）");
        assert!(words.contains("急性"));
        assert!(words.contains("前壁"));
        assert_eq!(words.len(), 3);
    }

    #[test]
    fn hit_rate_counts_messages_not_markers() {
        let msgs = ["请问您好", "疼吗", "谢谢"];
        assert!((hit_rate(&msgs, POLITENESS_MARKERS) - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(hit_rate(&[], POLITENESS_MARKERS), 0.0);
    }

    #[test]
    fn rounding_to_two_places() {
        assert_eq!(round2(57.125_000_1), 57.13);
        assert_eq!(round2(0.0), 0.0);
        assert_eq!(round2(100.0), 100.0);
    }
}
