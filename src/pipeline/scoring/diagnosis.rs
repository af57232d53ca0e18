use super::config::RubricStandards;
use super::text::word_set;
use crate::models::enums::DiagnosisAccuracy;
use crate::models::DiagnosisScore;

/// Hard ceiling of the diagnosis dimension.
pub const DIAGNOSIS_MAX: f64 = 35.0;

/// Minimum shared tokens for a `partial` match.
const PARTIAL_OVERLAP: usize = 2;

/// `correct` when either string contains the other (case-insensitive),
/// `partial` on two or more shared tokens, otherwise `wrong`. A blank
/// submission or a blank reference is always `wrong`.
pub fn classify_diagnosis(submitted: &str, standard: &str) -> DiagnosisAccuracy {
    let submitted = submitted.trim().to_lowercase();
    let standard = standard.trim().to_lowercase();
    if submitted.is_empty() || standard.is_empty() {
        return DiagnosisAccuracy::Wrong;
    }

    if submitted.contains(&standard) || standard.contains(&submitted) {
        return DiagnosisAccuracy::Correct;
    }

    let overlap = word_set(&submitted)
        .intersection(&word_set(&standard))
        .count();
    if overlap >= PARTIAL_OVERLAP {
        DiagnosisAccuracy::Partial
    } else {
        DiagnosisAccuracy::Wrong
    }
}

/// Differentials whose text appears anywhere in the submission plus the
/// whole transcript. Plain substring search; a name mentioned in passing
/// still counts.
pub fn count_differentials(submitted: &str, transcript: &[&str], differentials: &[String]) -> usize {
    if differentials.is_empty() {
        return 0;
    }
    let mut all_text = submitted.to_lowercase();
    for content in transcript {
        all_text.push(' ');
        all_text.push_str(&content.to_lowercase());
    }

    differentials
        .iter()
        .map(|d| d.trim().to_lowercase())
        .filter(|d| !d.is_empty() && all_text.contains(d.as_str()))
        .count()
}

/// Step function of key-question coverage.
pub fn reasoning_score(coverage_rate: f64) -> f64 {
    if coverage_rate >= 0.8 {
        10.0
    } else if coverage_rate >= 0.6 {
        7.0
    } else if coverage_rate >= 0.4 {
        5.0
    } else {
        0.0
    }
}

pub(crate) fn score_diagnosis(
    submitted: &str,
    standard: &str,
    differentials: &[String],
    transcript: &[&str],
    coverage_rate: f64,
    standards: &RubricStandards,
) -> DiagnosisScore {
    let accuracy = classify_diagnosis(submitted, standard);
    let accuracy_score = match accuracy {
        DiagnosisAccuracy::Correct => standards.correct_score,
        DiagnosisAccuracy::Partial => standards.partial_score,
        DiagnosisAccuracy::Wrong => standards.wrong_score,
    };
    let reasoning_score = reasoning_score(coverage_rate);

    DiagnosisScore {
        accuracy,
        accuracy_score,
        differential_count: count_differentials(submitted, transcript, differentials),
        reasoning_score,
        total: (accuracy_score + reasoning_score).min(DIAGNOSIS_MAX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_and_contained_matches_are_correct() {
        assert_eq!(classify_diagnosis("急性心肌梗死", "急性心肌梗死"), DiagnosisAccuracy::Correct);
        assert_eq!(classify_diagnosis("心肌梗死", "急性心肌梗死"), DiagnosisAccuracy::Correct);
        assert_eq!(
            classify_diagnosis("考虑急性心肌梗死可能", "急性心肌梗死"),
            DiagnosisAccuracy::Correct
        );
        assert_eq!(classify_diagnosis("Acute MI", "acute mi"), DiagnosisAccuracy::Correct);
    }

    #[test]
    fn two_shared_tokens_are_partial() {
        assert_eq!(
            classify_diagnosis("急性 前壁 心梗", "急性 前壁 心肌梗死"),
            DiagnosisAccuracy::Partial
        );
    }

    #[test]
    fn one_shared_token_is_wrong() {
        assert_eq!(
            classify_diagnosis("急性 胃炎", "急性 心肌梗死"),
            DiagnosisAccuracy::Wrong
        );
    }

    #[test]
    fn blank_inputs_are_wrong() {
        assert_eq!(classify_diagnosis("", "急性心肌梗死"), DiagnosisAccuracy::Wrong);
        assert_eq!(classify_diagnosis("   ", "急性心肌梗死"), DiagnosisAccuracy::Wrong);
        assert_eq!(classify_diagnosis("心绞痛", ""), DiagnosisAccuracy::Wrong);
    }

    #[test]
    fn differentials_found_across_all_text() {
        let diffs = vec!["心绞痛".to_string(), "主动脉夹层".to_string(), "肺栓塞".to_string()];
        let transcript = ["以前有过心绞痛吗？", "没有"];
        assert_eq!(count_differentials("急性心肌梗死，需排除主动脉夹层", &transcript, &diffs), 2);
    }

    #[test]
    fn blank_differential_entries_ignored() {
        let diffs = vec!["".to_string(), "  ".to_string()];
        assert_eq!(count_differentials("任何内容", &["随便"], &diffs), 0);
    }

    #[test]
    fn reasoning_bands() {
        assert_eq!(reasoning_score(1.0), 10.0);
        assert_eq!(reasoning_score(0.8), 10.0);
        assert_eq!(reasoning_score(2.0 / 3.0), 7.0);
        assert_eq!(reasoning_score(0.4), 5.0);
        assert_eq!(reasoning_score(0.39), 0.0);
    }

    #[test]
    fn total_capped_at_thirty_five() {
        let result = score_diagnosis(
            "急性心肌梗死",
            "急性心肌梗死",
            &[],
            &[],
            1.0,
            &RubricStandards::default(),
        );
        assert_eq!(result.accuracy_score, 35.0);
        assert_eq!(result.reasoning_score, 10.0);
        assert_eq!(result.total, 35.0);
    }
}
