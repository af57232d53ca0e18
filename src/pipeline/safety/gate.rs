//! The four gate operations. All are total: unmatched text takes the
//! permissive branch and nothing here returns an error.

use super::keywords::{
    danger_warning, refusal_reply, ADVISORY_OPENERS, DANGER_PATTERNS, DIAGNOSIS_ASSERTION,
    DIAGNOSIS_DEFLECTION, GENERIC_TERM, JARGON_TERMS, PERSONA_VOCABULARY, REFUSAL_PATTERNS,
    TREATMENT_ASSERTION, TREATMENT_DEFLECTION,
};
use super::types::{InputClassification, Refusal, ReplyRejection, SanitizedReply};

/// Scan a student message for crisis or violence language.
pub fn classify_student_input(text: &str) -> InputClassification {
    for sp in DANGER_PATTERNS.iter() {
        if sp.regex.is_match(text) {
            tracing::warn!(
                signal = %sp.category,
                pattern = sp.description,
                "Safety gate: danger signal in student input"
            );
            return InputClassification {
                safe: false,
                signal: Some(sp.category),
                text: text.to_string(),
            };
        }
    }

    tracing::info!(outcome = "passed", "Safety gate: student input clean");
    InputClassification {
        safe: true,
        signal: None,
        text: text.to_string(),
    }
}

impl InputClassification {
    /// Fixed supportive message for the detected signal.
    pub fn warning(&self) -> Option<&'static str> {
        self.signal.map(danger_warning)
    }
}

/// Decide whether the patient must deflect the question. First matching
/// category wins, in the order dosage, diagnosis, treatment.
pub fn should_refuse(question: &str) -> Option<Refusal> {
    let matched = REFUSAL_PATTERNS.iter().find(|sp| sp.regex.is_match(question))?;
    tracing::warn!(
        category = %matched.category,
        pattern = matched.description,
        "Safety gate: question refused"
    );
    Some(Refusal {
        category: matched.category,
        canned_reply: refusal_reply(matched.category),
    })
}

/// Gate a generated reply before the student sees it.
///
/// Jargon is rewritten first; the result is then rejected wholesale if it
/// asserts a diagnosis or recommends a treatment.
pub fn sanitize_patient_reply(text: &str) -> SanitizedReply {
    let mut reply = text.to_string();
    let mut substituted_terms = 0;
    for (term, paraphrase) in JARGON_TERMS {
        if reply.contains(term) {
            reply = reply.replace(term, paraphrase.unwrap_or(GENERIC_TERM));
            substituted_terms += 1;
        }
    }

    let rejection = if DIAGNOSIS_ASSERTION.is_match(&reply) {
        Some((ReplyRejection::DiagnosisAsserted, DIAGNOSIS_DEFLECTION))
    } else if TREATMENT_ASSERTION.is_match(&reply) {
        Some((ReplyRejection::TreatmentAsserted, TREATMENT_DEFLECTION))
    } else {
        None
    };

    match rejection {
        Some((reason, deflection)) => {
            tracing::warn!(reason = ?reason, substituted_terms, "Safety gate: reply rejected");
            SanitizedReply {
                accepted: false,
                text: deflection.to_string(),
                rejection: Some(reason),
                substituted_terms,
            }
        }
        None => {
            if substituted_terms > 0 {
                tracing::warn!(substituted_terms, "Safety gate: jargon rewritten");
            } else {
                tracing::info!(outcome = "passed", "Safety gate: reply clean");
            }
            SanitizedReply {
                accepted: true,
                text: reply,
                rejection: None,
                substituted_terms,
            }
        }
    }
}

/// False when the reply sounds like a clinician rather than a patient.
pub fn check_persona_consistency(text: &str) -> bool {
    let chart_term = PERSONA_VOCABULARY.iter().any(|term| text.contains(term));
    let advisory = ADVISORY_OPENERS
        .iter()
        .any(|opener| text.trim_start().starts_with(opener));

    if chart_term || advisory {
        tracing::warn!(chart_term, advisory, "Safety gate: persona break");
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::{RefusalCategory, SignalKind};

    // =================================================================
    // STUDENT INPUT
    // =================================================================

    #[test]
    fn self_harm_detected() {
        let result = classify_student_input("我不想活了");
        assert!(!result.safe);
        assert_eq!(result.signal, Some(SignalKind::SelfHarm));
        assert_eq!(result.text, "我不想活了");
        assert_eq!(
            result.warning(),
            Some("我注意到您提到了一些让我担心的话，如果有需要，我们可以休息一下。")
        );
    }

    #[test]
    fn hostility_detected() {
        let result = classify_student_input("我真想打人");
        assert_eq!(result.signal, Some(SignalKind::Hostility));
        assert_eq!(result.warning(), Some("请注意文明用语，这是医学教育环境。"));
    }

    #[test]
    fn self_harm_wins_over_hostility() {
        let result = classify_student_input("想死，还想伤害别人");
        assert_eq!(result.signal, Some(SignalKind::SelfHarm));
    }

    #[test]
    fn ordinary_question_is_safe() {
        let result = classify_student_input("您好，请问您哪里不舒服？");
        assert!(result.safe);
        assert!(result.signal.is_none());
        assert!(result.warning().is_none());
    }

    // =================================================================
    // REFUSALS
    // =================================================================

    #[test]
    fn dosage_question_refused() {
        let refusal = should_refuse("这个药吃几片？").unwrap();
        assert_eq!(refusal.category, RefusalCategory::Dosage);
        assert_eq!(refusal.canned_reply, "我不懂药物剂量，请听医生的。");
    }

    #[test]
    fn history_question_not_refused() {
        assert!(should_refuse("您哪里不舒服？").is_none());
    }

    #[test]
    fn diagnosis_question_refused() {
        let refusal = should_refuse("您觉得我得的是什么病？").unwrap();
        assert_eq!(refusal.category, RefusalCategory::Diagnosis);
        assert_eq!(refusal.canned_reply, "我不知道自己得了什么病，您能告诉我吗？");
    }

    #[test]
    fn treatment_question_refused() {
        let refusal = should_refuse("这个要怎么治疗？").unwrap();
        assert_eq!(refusal.category, RefusalCategory::Treatment);
    }

    #[test]
    fn dosage_precedes_treatment_when_both_match() {
        // Matches "用什么药" (treatment) and "每天.*次" (dosage).
        let refusal = should_refuse("用什么药，每天吃几次？").unwrap();
        assert_eq!(refusal.category, RefusalCategory::Dosage);
    }

    #[test]
    fn diagnosis_precedes_treatment_when_both_match() {
        let refusal = should_refuse("是什么病，需要做检查吗").unwrap();
        assert_eq!(refusal.category, RefusalCategory::Diagnosis);
    }

    // =================================================================
    // GENERATED REPLIES
    // =================================================================

    #[test]
    fn clean_reply_passes_unchanged() {
        let result = sanitize_patient_reply("胸口像压了块石头，喘不上气。");
        assert!(result.accepted);
        assert_eq!(result.text, "胸口像压了块石头，喘不上气。");
        assert_eq!(result.substituted_terms, 0);
    }

    #[test]
    fn jargon_paraphrased() {
        let result = sanitize_patient_reply("上次做了心电图和CT，都说还行。");
        assert!(result.accepted);
        assert_eq!(result.text, "上次做了心脏检查和拍片子，都说还行。");
        assert_eq!(result.substituted_terms, 2);
    }

    #[test]
    fn jargon_without_paraphrase_becomes_generic() {
        let result = sanitize_patient_reply("前两天做了超声。");
        assert_eq!(result.text, "前两天做了检查。");
    }

    #[test]
    fn diagnosis_assertion_rejected() {
        let result = sanitize_patient_reply("医生，你得了胃炎吧。");
        assert!(!result.accepted);
        assert_eq!(result.rejection, Some(ReplyRejection::DiagnosisAsserted));
        assert_eq!(result.text, "我也不太清楚具体是什么病，就是特别难受。");
    }

    #[test]
    fn paraphrase_can_reveal_diagnosis_assertion() {
        // 心绞痛 -> 心脏病, which then reads as an asserted diagnosis.
        let result = sanitize_patient_reply("可能是心绞痛");
        assert_eq!(result.rejection, Some(ReplyRejection::DiagnosisAsserted));
    }

    #[test]
    fn treatment_assertion_rejected() {
        let result = sanitize_patient_reply("我觉得你应该吃点止痛药。");
        assert!(!result.accepted);
        assert_eq!(result.rejection, Some(ReplyRejection::TreatmentAsserted));
        assert_eq!(result.text, "我不懂这些，您是医生，您说怎么办就怎么样。");
    }

    // =================================================================
    // PERSONA
    // =================================================================

    #[test]
    fn patient_voice_is_consistent() {
        assert!(check_persona_consistency("我就是胸口疼，出了好多汗。"));
    }

    #[test]
    fn chart_vocabulary_breaks_persona() {
        assert!(!check_persona_consistency("患者主诉胸痛3小时。"));
        assert!(!check_persona_consistency("我的既往史没什么特别的。"));
    }

    #[test]
    fn advisory_opener_breaks_persona() {
        assert!(!check_persona_consistency("建议您多休息。"));
        assert!(!check_persona_consistency("应该是累着了。"));
        // Only the opening counts.
        assert!(check_persona_consistency("我不知道应该怎么说。"));
    }
}
