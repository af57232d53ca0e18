use super::config::RubricStandards;
use super::text::{count_hits, hit_rate, EMPATHY_MARKERS, POLITENESS_MARKERS};
use crate::models::CommunicationScore;

pub const COMMUNICATION_MAX: f64 = 25.0;
const TURN_SCORE_MAX: f64 = 15.0;
/// Turn score at exactly `pass_turns`.
const TURN_RAMP_FLOOR: f64 = 10.0;
const TURN_DEGRADED_MIN: f64 = 5.0;
const POLITENESS_MAX: f64 = 5.0;
const EMPATHY_MAX: f64 = 5.0;

/// Linear ramp between the pass and full thresholds, saturating at 15,
/// `max(5, 2·turns)` below the pass threshold, and 0 with no turns at all.
pub fn turn_score(turns: usize, standards: &RubricStandards) -> f64 {
    if turns == 0 {
        return 0.0;
    }
    let full = standards.full_turns as usize;
    let pass = standards.pass_turns as usize;
    if turns >= full {
        TURN_SCORE_MAX
    } else if turns >= pass {
        let ratio = (turns - pass) as f64 / (full - pass) as f64;
        TURN_RAMP_FLOOR + ratio * (TURN_SCORE_MAX - TURN_RAMP_FLOOR)
    } else {
        TURN_DEGRADED_MIN.max(turns as f64 * 2.0)
    }
}

pub(crate) fn score_communication(
    questions: &[&str],
    standards: &RubricStandards,
) -> CommunicationScore {
    let turn_count = questions.len();
    let turn_score = turn_score(turn_count, standards);
    let politeness_rate = hit_rate(questions, POLITENESS_MARKERS);
    let politeness_score = politeness_rate * POLITENESS_MAX;
    let empathy_score = (count_hits(questions, EMPATHY_MARKERS) as f64).min(EMPATHY_MAX);
    let average_length = if questions.is_empty() {
        0.0
    } else {
        questions.iter().map(|q| q.chars().count()).sum::<usize>() as f64 / turn_count as f64
    };

    CommunicationScore {
        turn_count,
        turn_score,
        average_length,
        politeness_rate,
        politeness_score,
        empathy_score,
        total: (turn_score + politeness_score + empathy_score).min(COMMUNICATION_MAX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_ramp() {
        let s = RubricStandards::default();
        assert_eq!(turn_score(0, &s), 0.0);
        assert_eq!(turn_score(1, &s), 5.0);
        assert_eq!(turn_score(2, &s), 5.0);
        assert_eq!(turn_score(4, &s), 8.0);
        assert_eq!(turn_score(5, &s), 10.0);
        assert_eq!(turn_score(6, &s), 11.0);
        assert_eq!(turn_score(10, &s), 15.0);
        assert_eq!(turn_score(40, &s), 15.0);
    }

    #[test]
    fn politeness_and_empathy() {
        let qs = [
            "您好，请问哪里不舒服？",
            "我理解您很担心",
            "疼了多久",
            "别急，慢慢来",
        ];
        let result = score_communication(&qs, &RubricStandards::default());
        assert_eq!(result.turn_count, 4);
        assert_eq!(result.politeness_rate, 0.25);
        assert_eq!(result.politeness_score, 1.25);
        // Two messages carry empathy markers; each counts once.
        assert_eq!(result.empathy_score, 2.0);
        assert_eq!(result.total, 8.0 + 1.25 + 2.0);
    }

    #[test]
    fn empathy_capped_at_five() {
        let qs = vec!["我理解"; 8];
        let result = score_communication(&qs, &RubricStandards::default());
        assert_eq!(result.empathy_score, 5.0);
    }

    #[test]
    fn total_never_exceeds_cap() {
        let qs = vec!["您好，我理解您的心情"; 12];
        let result = score_communication(&qs, &RubricStandards::default());
        assert_eq!(result.total, 25.0);
    }

    #[test]
    fn average_length_in_characters() {
        let result = score_communication(&["疼吗", "哪里疼"], &RubricStandards::default());
        assert_eq!(result.average_length, 2.5);
    }

    #[test]
    fn no_messages_scores_zero() {
        let result = score_communication(&[], &RubricStandards::default());
        assert_eq!(result.total, 0.0);
        assert_eq!(result.average_length, 0.0);
    }
}
