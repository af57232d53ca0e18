use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(SessionStatus {
    Active => "active",
    Completed => "completed",
    Abandoned => "abandoned",
});

impl SessionStatus {
    /// Completed and abandoned sessions never change again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

str_enum!(MessageRole {
    Student => "student",
    Patient => "patient",
    System => "system",
});

str_enum!(SignalKind {
    SelfHarm => "self_harm",
    Hostility => "hostility",
});

str_enum!(RefusalCategory {
    Dosage => "dosage",
    Diagnosis => "diagnosis",
    Treatment => "treatment",
});

str_enum!(DiagnosisAccuracy {
    Correct => "correct",
    Partial => "partial",
    Wrong => "wrong",
});

str_enum!(Grade {
    A => "A",
    B => "B",
    C => "C",
    D => "D",
    F => "F",
});

str_enum!(ScoreDimension {
    Inquiry => "inquiry",
    Diagnosis => "diagnosis",
    Communication => "communication",
});

str_enum!(Emotion {
    Calm => "calm",
    Uneasy => "uneasy",
    Anxious => "anxious",
    VeryAnxious => "very_anxious",
});

impl Emotion {
    /// Label shown next to the patient's reply.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Calm => "平静",
            Self::Uneasy => "略显不安",
            Self::Anxious => "焦虑",
            Self::VeryAnxious => "非常焦虑",
        }
    }
}

/// Why the generated reply was replaced before reaching the student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    ProviderError,
    ProviderTimeout,
    EmptyCompletion,
    DiagnosisAsserted,
    TreatmentAsserted,
    PersonaBreak,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn session_status_round_trips_through_text() {
        for status in [
            SessionStatus::Active,
            SessionStatus::Completed,
            SessionStatus::Abandoned,
        ] {
            assert_eq!(SessionStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn unknown_role_is_invalid_enum() {
        let err = MessageRole::from_str("doctor").unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidEnum { .. }));
    }

    #[test]
    fn only_active_is_non_terminal() {
        assert!(!SessionStatus::Active.is_terminal());
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Abandoned.is_terminal());
    }

    #[test]
    fn grade_serializes_as_letter() {
        assert_eq!(serde_json::to_string(&Grade::B).unwrap(), "\"B\"");
        assert_eq!(
            serde_json::to_string(&SignalKind::SelfHarm).unwrap(),
            "\"self_harm\""
        );
        assert_eq!(Grade::B.as_str(), "B");
    }

    #[test]
    fn emotion_labels() {
        assert_eq!(Emotion::Calm.label(), "平静");
        assert_eq!(Emotion::VeryAnxious.label(), "非常焦虑");
    }
}
