//! Declarative pattern tables for the safety gate.
//!
//! Table order is precedence: the first matching row decides the category.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::enums::{RefusalCategory, SignalKind};

/// A compiled pattern tagged with the category it detects.
pub(crate) struct SafetyPattern<C> {
    pub regex: Regex,
    pub category: C,
    pub description: &'static str,
}

fn pattern<C>(regex_str: &str, category: C, description: &'static str) -> SafetyPattern<C> {
    SafetyPattern {
        regex: Regex::new(regex_str).expect("Invalid safety regex pattern"),
        category,
        description,
    }
}

/// Crisis and violence language. Self-harm rows come first.
pub(crate) static DANGER_PATTERNS: LazyLock<Vec<SafetyPattern<SignalKind>>> = LazyLock::new(|| {
    vec![
        pattern("不想活", SignalKind::SelfHarm, "wish to stop living"),
        pattern("活着没意思", SignalKind::SelfHarm, "life feels pointless"),
        pattern("想死", SignalKind::SelfHarm, "wish to die"),
        pattern("自杀", SignalKind::SelfHarm, "suicide"),
        pattern("想打人", SignalKind::Hostility, "wish to hit someone"),
        pattern("要报复", SignalKind::Hostility, "revenge"),
        pattern("杀死", SignalKind::Hostility, "kill"),
        pattern("伤害", SignalKind::Hostility, "harm"),
    ]
});

/// Questions the patient must not answer: dosage, then diagnosis, then treatment.
pub(crate) static REFUSAL_PATTERNS: LazyLock<Vec<SafetyPattern<RefusalCategory>>> =
    LazyLock::new(|| {
        vec![
            pattern("吃几片?", RefusalCategory::Dosage, "tablet count"),
            pattern("用多少量", RefusalCategory::Dosage, "quantity"),
            pattern("剂量", RefusalCategory::Dosage, "dose"),
            pattern("用量", RefusalCategory::Dosage, "amount"),
            pattern("一次.*粒", RefusalCategory::Dosage, "pills per dose"),
            pattern("每天.*次", RefusalCategory::Dosage, "doses per day"),
            pattern("什么病", RefusalCategory::Diagnosis, "which disease"),
            pattern("什么诊断", RefusalCategory::Diagnosis, "which diagnosis"),
            pattern("确诊", RefusalCategory::Diagnosis, "confirmed diagnosis"),
            pattern("我得.*病", RefusalCategory::Diagnosis, "what do I have"),
            pattern("是不是.*炎", RefusalCategory::Diagnosis, "is it an inflammation"),
            pattern("是不是.*症", RefusalCategory::Diagnosis, "is it a syndrome"),
            pattern("怎么治疗", RefusalCategory::Treatment, "how to treat"),
            pattern("用什么药", RefusalCategory::Treatment, "which drug"),
            pattern("怎么治", RefusalCategory::Treatment, "how to cure"),
            pattern("需要.*手术", RefusalCategory::Treatment, "surgery"),
            pattern("需要.*检查", RefusalCategory::Treatment, "further tests"),
        ]
    });

pub fn danger_warning(kind: SignalKind) -> &'static str {
    match kind {
        SignalKind::SelfHarm => "我注意到您提到了一些让我担心的话，如果有需要，我们可以休息一下。",
        SignalKind::Hostility => "请注意文明用语，这是医学教育环境。",
    }
}

pub fn refusal_reply(category: RefusalCategory) -> &'static str {
    match category {
        RefusalCategory::Dosage => "我不懂药物剂量，请听医生的。",
        RefusalCategory::Diagnosis => "我不知道自己得了什么病，您能告诉我吗？",
        RefusalCategory::Treatment => "我不懂治疗，您是医生，您说怎么办就怎么样。",
    }
}

/// Clinical terms a patient would not use, with their lay paraphrase.
/// `None` means the term is replaced by [`GENERIC_TERM`].
pub(crate) const JARGON_TERMS: &[(&str, Option<&str>)] = &[
    ("心绞痛", Some("心脏病")),
    ("心肌梗死", Some("很严重的心脏病")),
    ("冠脉", Some("心脏血管")),
    ("心电图", Some("心脏检查")),
    ("CT", Some("拍片子")),
    ("MRI", Some("拍片子")),
    ("超声", None),
    ("抗生素", None),
    ("消炎药", None),
    ("降压药", None),
];

pub(crate) const GENERIC_TERM: &str = "检查";

pub(crate) static DIAGNOSIS_ASSERTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("(你是|你得了|可能是).*(炎|症|病)").expect("valid regex")
});

pub(crate) static TREATMENT_ASSERTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("(你应该|可以|建议).*(吃|用|治)").expect("valid regex")
});

pub const DIAGNOSIS_DEFLECTION: &str = "我也不太清楚具体是什么病，就是特别难受。";
pub const TREATMENT_DEFLECTION: &str = "我不懂这些，您是医生，您说怎么办就怎么样。";

/// Chart-note vocabulary that breaks the patient persona.
pub(crate) const PERSONA_VOCABULARY: &[&str] = &["主诉", "现病史", "既往史", "家族史"];

/// Openers that sound like a clinician giving advice.
pub(crate) const ADVISORY_OPENERS: &[&str] = &["建议", "应该"];

/// Shown instead of a reply that broke character.
pub const CONFUSED_PATIENT_LINE: &str = "我...我现在不太舒服，能...能再说一遍吗？";

/// Shown when the provider fails, times out or returns nothing.
pub const THINKING_PLACEHOLDER: &str = "病人正在思考，请稍等...";
