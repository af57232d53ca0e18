use crate::models::enums::Emotion;

const ANXIETY_WORDS: &[&str] = &["担心", "害怕", "紧张", "焦虑"];
const PAIN_WORDS: &[&str] = &["疼", "痛", "难受", "不舒服"];

/// Emotion band of a patient reply: one point per distinct anxiety or pain
/// word present.
pub fn infer_emotion(reply: &str) -> Emotion {
    let score = ANXIETY_WORDS
        .iter()
        .chain(PAIN_WORDS)
        .filter(|w| reply.contains(*w))
        .count();

    match score {
        0 => Emotion::Calm,
        1 => Emotion::Uneasy,
        2 => Emotion::Anxious,
        _ => Emotion::VeryAnxious,
    }
}
