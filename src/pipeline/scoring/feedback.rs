use crate::models::enums::{DiagnosisAccuracy, Grade, ScoreDimension};
use crate::models::{CommunicationScore, DiagnosisScore, InquiryScore, Suggestion};

/// Missed key questions listed in the first suggestion.
const MISSED_LISTED: usize = 3;
const COVERAGE_TARGET: f64 = 0.7;
const POLITENESS_TARGET: f64 = 0.5;
const EMPATHY_TARGET: f64 = 3.0;

pub fn grade_for(score: f64) -> Grade {
    if score >= 90.0 {
        Grade::A
    } else if score >= 80.0 {
        Grade::B
    } else if score >= 70.0 {
        Grade::C
    } else if score >= 60.0 {
        Grade::D
    } else {
        Grade::F
    }
}

/// Improvement hints, ordered inquiry, diagnosis, communication.
pub(crate) fn suggestions(
    inquiry: &InquiryScore,
    diagnosis: &DiagnosisScore,
    communication: &CommunicationScore,
) -> Vec<Suggestion> {
    let mut out = Vec::new();
    let mut push = |dimension, text: String| out.push(Suggestion { dimension, text });

    if !inquiry.missed_questions.is_empty() {
        let listed: Vec<&str> = inquiry
            .missed_questions
            .iter()
            .take(MISSED_LISTED)
            .map(String::as_str)
            .collect();
        push(
            ScoreDimension::Inquiry,
            format!("建议询问以下关键问题：{}", listed.join("，")),
        );
    }
    if inquiry.coverage_rate < COVERAGE_TARGET {
        push(
            ScoreDimension::Inquiry,
            "问诊覆盖面还不够，建议更全面地了解患者症状".into(),
        );
    }

    if diagnosis.accuracy == DiagnosisAccuracy::Wrong {
        push(
            ScoreDimension::Diagnosis,
            "诊断结果不够准确，建议加强相关疾病的学习".into(),
        );
    }
    if diagnosis.differential_count == 0 {
        push(
            ScoreDimension::Diagnosis,
            "建议考虑鉴别诊断，提高诊断思维的全面性".into(),
        );
    }

    if communication.politeness_rate < POLITENESS_TARGET {
        push(
            ScoreDimension::Communication,
            "建议在问诊中适当使用礼貌用语，体现医者人文关怀".into(),
        );
    }
    if communication.empathy_score < EMPATHY_TARGET {
        push(
            ScoreDimension::Communication,
            "建议多关注患者感受，适当表达共情".into(),
        );
    }

    out
}

/// One paragraph: overall verdict, coverage band, diagnosis verdict.
pub(crate) fn overall_comment(grade: Grade, coverage_rate: f64, accuracy: DiagnosisAccuracy) -> String {
    let verdict = match grade {
        Grade::A => "表现优秀！问诊全面，诊断准确，沟通规范。",
        Grade::B => "表现良好，各方面都做得不错，还有提升空间。",
        Grade::C => "表现合格，基础掌握较好，需要加强细节。",
        Grade::D => "表现及格，建议加强基础训练，提高问诊技巧。",
        Grade::F => "需要加强训练，建议系统学习问诊方法。",
    };
    let coverage = if coverage_rate >= 0.8 {
        "问诊覆盖面广，关键问题询问到位。"
    } else if coverage_rate >= 0.5 {
        "问诊覆盖一般，部分关键问题未涉及。"
    } else {
        "问诊覆盖不足，需要更系统地了解患者情况。"
    };
    let diagnosis = match accuracy {
        DiagnosisAccuracy::Correct => "诊断准确，体现了扎实的医学知识。",
        DiagnosisAccuracy::Partial => "诊断方向基本正确，需要提高准确性。",
        DiagnosisAccuracy::Wrong => "诊断结果有待提高，建议加强相关知识学习。",
    };
    [verdict, coverage, diagnosis].join(" ")
}
