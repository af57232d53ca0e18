use std::collections::HashSet;

use super::config::RubricStandards;
use super::text::{
    contains_any, extract_keywords, hit_rate, normalize_question, POLITENESS_MARKERS,
    SYMPTOM_TRIGGERS,
};
use crate::models::InquiryScore;

/// Penalty per repeated question.
const DUPLICATE_PENALTY: f64 = 2.0;
/// Normalized questions this short never count as duplicates.
const DUPLICATE_MIN_CHARS: usize = 5;

pub(crate) struct KeyQuestionCoverage {
    pub covered: Vec<String>,
    pub missed: Vec<String>,
    pub rate: f64,
}

/// A key question is covered when any student message contains one of its
/// keywords (case-insensitive). An empty key-question list yields rate 0.
pub(crate) fn key_question_coverage(key_questions: &[String], questions: &[&str]) -> KeyQuestionCoverage {
    let lowered: Vec<String> = questions.iter().map(|q| q.to_lowercase()).collect();
    let mut covered = Vec::new();
    let mut missed = Vec::new();

    for key in key_questions {
        let keywords = extract_keywords(key);
        let hit = lowered
            .iter()
            .any(|q| keywords.iter().any(|kw| q.contains(kw.as_str())));
        if hit {
            covered.push(key.clone());
        } else {
            missed.push(key.clone());
        }
    }

    let rate = if key_questions.is_empty() {
        0.0
    } else {
        covered.len() as f64 / key_questions.len() as f64
    };
    KeyQuestionCoverage {
        covered,
        missed,
        rate,
    }
}

/// Share of the seven symptom dimensions touched anywhere in the student text.
fn symptom_score(questions: &[&str], cap: f64) -> f64 {
    let all_text = questions.join(" ").to_lowercase();
    let hits = SYMPTOM_TRIGGERS
        .iter()
        .filter(|triggers| contains_any(&all_text, triggers))
        .count();
    hits as f64 / SYMPTOM_TRIGGERS.len() as f64 * cap
}

/// Starts at `cap`, minus a fixed penalty for each repeated question.
fn logic_score(questions: &[&str], cap: f64) -> f64 {
    if questions.is_empty() {
        return 0.0;
    }
    let mut seen = HashSet::new();
    let mut duplicates = 0usize;
    for q in questions {
        let normalized = normalize_question(q);
        if normalized.chars().count() > DUPLICATE_MIN_CHARS && seen.contains(&normalized) {
            duplicates += 1;
        }
        seen.insert(normalized);
    }
    (cap - duplicates as f64 * DUPLICATE_PENALTY).max(0.0)
}

pub(crate) fn score_inquiry(
    key_questions: &[String],
    questions: &[&str],
    standards: &RubricStandards,
) -> InquiryScore {
    let coverage = key_question_coverage(key_questions, questions);
    let key_question_score = coverage.rate * standards.key_question_score;
    let symptom_score = symptom_score(questions, standards.symptom_detail_score);
    let logic_score = logic_score(questions, standards.logic_score);
    let etiquette_score = hit_rate(questions, POLITENESS_MARKERS) * standards.etiquette_score;

    InquiryScore {
        covered_count: coverage.covered.len(),
        total_questions: key_questions.len(),
        coverage_rate: coverage.rate,
        covered_questions: coverage.covered,
        missed_questions: coverage.missed,
        key_question_score,
        symptom_score,
        logic_score,
        etiquette_score,
        total: key_question_score + symptom_score + logic_score + etiquette_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn coverage_matches_any_keyword() {
        let key_questions = keys(&["疼痛 部位", "持续 时间", "既往 病史"]);
        let coverage = key_question_coverage(&key_questions, &["您哪个部位疼？", "持续多久了？"]);
        assert_eq!(coverage.covered, keys(&["疼痛 部位", "持续 时间"]));
        assert_eq!(coverage.missed, keys(&["既往 病史"]));
        assert!((coverage.rate - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn full_coverage_is_exactly_one() {
        let key_questions = keys(&["疼痛 部位", "持续 时间"]);
        let coverage = key_question_coverage(&key_questions, &["部位在哪", "时间多长"]);
        assert_eq!(coverage.rate, 1.0);
    }

    #[test]
    fn empty_key_questions_give_zero_rate() {
        let coverage = key_question_coverage(&[], &["您好"]);
        assert_eq!(coverage.rate, 0.0);
        assert!(coverage.covered.is_empty());
    }

    #[test]
    fn question_without_keywords_is_never_covered() {
        let coverage = key_question_coverage(&keys(&["疼 吗"]), &["疼吗"]);
        assert_eq!(coverage.rate, 0.0);
    }

    #[test]
    fn blank_key_question_counts_as_missed() {
        let coverage = key_question_coverage(&keys(&["疼痛 部位", ""]), &["哪个部位疼？"]);
        assert_eq!(coverage.covered, keys(&["疼痛 部位"]));
        assert_eq!(coverage.missed, keys(&[""]));
        assert_eq!(coverage.rate, 0.5);
    }

    #[test]
    fn symptom_dimensions_counted_once_each() {
        // 哪里 (location) + 多久 (duration) + 其他 (associated)
        let score = symptom_score(&["哪里疼？", "疼了多久？", "其他不舒服吗"], 20.0);
        // 其他不舒服 also hits 舒服 (relieving), 多久 hits 多 (severity).
        assert!((score - 5.0 / 7.0 * 20.0).abs() < 1e-9);
    }

    #[test]
    fn duplicates_penalized_above_length_threshold() {
        let qs = ["您胸口疼了多久了？", "您胸口疼了多久了", "疼吗", "疼吗"];
        // Only the long question counts as a duplicate.
        assert_eq!(logic_score(&qs, 20.0), 18.0);
    }

    #[test]
    fn logic_floors_at_zero() {
        let qs = vec!["请问您哪里不舒服呢"; 15];
        assert_eq!(logic_score(&qs, 20.0), 0.0);
    }

    #[test]
    fn logic_zero_without_questions() {
        assert_eq!(logic_score(&[], 20.0), 0.0);
    }

    #[test]
    fn inquiry_total_sums_parts() {
        let standards = RubricStandards::default();
        let result = score_inquiry(&keys(&["疼痛 部位"]), &["请问哪个部位疼？"], &standards);
        assert_eq!(result.covered_count, 1);
        assert_eq!(result.key_question_score, 40.0);
        assert_eq!(result.etiquette_score, 20.0);
        assert_eq!(result.logic_score, 20.0);
        let sum = result.key_question_score
            + result.symptom_score
            + result.logic_score
            + result.etiquette_score;
        assert_eq!(result.total, sum);
    }
}
