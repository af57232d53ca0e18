//! Persona prompt for the simulated patient, built by template substitution
//! from the case. Absent case fields fall back to a generic chest-pain
//! patient so a placeholder case still yields a usable prompt.

use crate::models::Case;

const DEFAULT_AGE: u32 = 50;
const DEFAULT_PAIN_LEVEL: &str = "7";
const DEFAULT_PAIN_SCORE: u8 = 7;

/// Fixed role rules, identical for every case.
const CORE_INSTRUCTION: &str = "你是AI标准化病人模拟器，用于医学教育。

核心规则（必须严格遵守）：
1. 只能描述你亲身体验的症状和感受，不得推测或编造
2. 对于未经历的症状必须明确回答\"没有\"或\"不清楚\"
3. 回答问题时要体现出相应的情绪状态和疼痛反应
4. 不得主动提及诊断名称或使用医学专业术语
5. 回答长度控制在20-50字之间，口语化表达
6. 必须保持角色一致性，前后回答不得矛盾
7. 禁止回答以下问题：
   - 具体药物剂量和用法
   - 疾病诊断结果
   - 治疗方案建议

如遇禁止回答的问题，使用以下话术：
- 药物询问：\"我不懂药物剂量，请听医生的\"
- 诊断询问：\"我不知道自己得了什么病，您能告诉我吗？\"
- 治疗询问：\"我不懂治疗，您是医生，您说怎么办就怎么样\"";

/// Patient's first line: "医生您好，我今年{age}岁，{complaint}，已经很难受了。"
pub fn opening_statement(case: &Case) -> String {
    let age = case.patient_info.age.unwrap_or(DEFAULT_AGE);
    let complaint = case.chief_complaint.as_deref().unwrap_or("我不舒服");
    format!("医生您好，我今年{age}岁，{complaint}，已经很难受了。")
}

/// Pain level as written in the case: the part of `severity` before '/'
/// ("7/10分" → "7").
pub fn pain_level(case: &Case) -> String {
    case.symptoms
        .severity
        .as_deref()
        .and_then(|s| s.split('/').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_PAIN_LEVEL)
        .to_string()
}

/// Tone guidance for a 1–10 pain score.
pub fn tone_hint(level: u8) -> &'static str {
    match level {
        0..=3 => "语气正常，表达清晰自然",
        4..=6 => "略显紧张，偶尔停顿，语气带点不安",
        7..=8 => "语气急促，表达简短，可能有轻微呻吟",
        _ => "说话断断续续，频繁呻吟，表情痛苦",
    }
}

fn pain_score(level: &str) -> u8 {
    level.parse().unwrap_or(DEFAULT_PAIN_SCORE)
}

fn or_default<'a>(value: &'a Option<String>, default: &'a str) -> &'a str {
    value.as_deref().unwrap_or(default)
}

/// Core instruction block + persona block + tone hint.
pub fn build_system_prompt(case: &Case) -> String {
    let info = &case.patient_info;
    let symptoms = &case.symptoms;
    let level = pain_level(case);

    let persona = format!(
        "===== 患者角色设定 =====
年龄：{age}岁
性别：{gender}
职业：{occupation}
教育程度：{education}
性格特点：{personality}

主诉：{complaint}

当前状态：
- 情绪：焦虑
- 疼痛程度：{level}/10分
- 表现：眉头紧锁，手捂胸口

症状特征：
- 部位：{location}
- 性质：{nature}
- 持续时间：{duration}
- 诱发因素：{aggravating}
- 缓解因素：{relieving}
- 伴随症状：{associated}

===== 说话风格 =====
- 语言特点：{speech_style}
- 禁止使用医学术语
- 根据疼痛等级调整语气：
  * 1-3分：语气正常，表达清晰
  * 4-6分：略显紧张，偶尔停顿
  * 7-8分：语气急促，表达简短
  * 9-10分：说话断续，可能呻吟
- 当前语气：{tone}",
        age = info.age.unwrap_or(DEFAULT_AGE),
        gender = or_default(&info.gender, "男"),
        occupation = or_default(&info.occupation, "工人"),
        education = or_default(&info.education, "初中"),
        personality = or_default(&info.personality, "内向、焦虑"),
        complaint = or_default(&case.chief_complaint, "胸痛"),
        location = or_default(&symptoms.location, "胸骨后"),
        nature = or_default(&symptoms.nature, "压榨性疼痛"),
        duration = or_default(&symptoms.duration, "持续5-10分钟"),
        aggravating = symptoms.aggravating_factors.join(", "),
        relieving = symptoms.relieving_factors.join(", "),
        associated = symptoms.associated_symptoms.join(", "),
        speech_style = or_default(&info.speech_style, "简单直接，表达清晰"),
        tone = tone_hint(pain_score(&level)),
    );

    format!("{CORE_INSTRUCTION}\n\n{persona}")
}
