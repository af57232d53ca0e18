use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// An immutable teaching scenario, as delivered by the case provider.
///
/// Every field is optional on the wire. Missing or malformed values decode
/// to empty strings, `None`, or empty lists rather than failing the case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Case {
    #[serde(default, deserialize_with = "lenient_string")]
    pub case_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub difficulty: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category: String,
    #[serde(default, deserialize_with = "lenient_struct")]
    pub patient_info: PatientPersona,
    #[serde(default, deserialize_with = "lenient_complaint")]
    pub chief_complaint: Option<String>,
    #[serde(default, deserialize_with = "lenient_struct")]
    pub symptoms: SymptomProfile,
    #[serde(default, deserialize_with = "lenient_string")]
    pub standard_diagnosis: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub differential_diagnosis: Vec<String>,
    /// Blank entries are kept: they still count toward the total, as missed.
    #[serde(default, deserialize_with = "lenient_key_questions")]
    pub key_questions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientPersona {
    #[serde(default, deserialize_with = "lenient_age")]
    pub age: Option<u32>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub occupation: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub education: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub personality: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub speech_style: Option<String>,
}

/// Structured symptom descriptors of the chief complaint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymptomProfile {
    #[serde(default, deserialize_with = "lenient_text")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub nature: Option<String>,
    /// Free text such as "7/10分"; the part before '/' is the pain level.
    #[serde(default, deserialize_with = "lenient_text")]
    pub severity: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub duration: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub aggravating_factors: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub relieving_factors: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub associated_symptoms: Vec<String>,
}

impl Case {
    /// Stand-in used when the case provider has no record for `case_id`.
    pub fn placeholder(case_id: &str) -> Self {
        Self {
            case_id: case_id.to_string(),
            title: "默认病例".to_string(),
            difficulty: "medium".to_string(),
            ..Self::default()
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(scalar_text(&value))
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(lenient_text(d)?.unwrap_or_default())
}

fn lenient_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(match value {
        Value::Array(items) => items.iter().filter_map(scalar_text).collect(),
        other => scalar_text(&other).into_iter().collect(),
    })
}

fn lenient_key_questions<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let value = Value::deserialize(d)?;
    let keep = |v: &Value| match v {
        Value::String(s) => Some(s.trim().to_string()),
        other => scalar_text(other),
    };
    Ok(match value {
        Value::Array(items) => items.iter().filter_map(keep).collect(),
        other => keep(&other).into_iter().collect(),
    })
}

fn lenient_age<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(match value {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().trim_end_matches('岁').parse().ok(),
        _ => None,
    })
}

/// The complaint arrives either as plain text or as `{"text": "..."}`.
fn lenient_complaint<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(match &value {
        Value::Object(map) => map.get("text").and_then(scalar_text),
        other => scalar_text(other),
    })
}

fn lenient_struct<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + serde::de::DeserializeOwned,
{
    let value = Value::deserialize(d)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}
