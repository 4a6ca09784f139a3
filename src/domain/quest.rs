//! Quests and their type-specific payloads.
//!
//! The source stores a quest's payload as free-form JSON keyed by a type
//! tag. Here the tag selects a typed payload; tags outside the known set
//! and payloads that don't fit their shape are kept as raw JSON so one bad
//! quest never takes down a whole content load.

use serde::{Deserialize, Serialize};

use crate::core::ContentError;

/// Closed set of quest types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestType {
    CulturalScenario,
    TriviaQuiz,
    HistoryLesson,
    CulturalPractice,
}

impl QuestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestType::CulturalScenario => "cultural-scenario",
            QuestType::TriviaQuiz => "trivia-quiz",
            QuestType::HistoryLesson => "history-lesson",
            QuestType::CulturalPractice => "cultural-practice",
        }
    }
}

impl std::fmt::Display for QuestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for QuestType {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cultural-scenario" => Ok(QuestType::CulturalScenario),
            "trivia-quiz" => Ok(QuestType::TriviaQuiz),
            "history-lesson" => Ok(QuestType::HistoryLesson),
            "cultural-practice" => Ok(QuestType::CulturalPractice),
            _ => Err(ContentError::UnknownQuestType(s.to_string())),
        }
    }
}

/// Difficulty tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    #[serde(other)]
    Unspecified,
}

impl Difficulty {
    /// Parse a source tag; anything unrecognised is `Unspecified`
    pub fn from_tag(tag: &str) -> Self {
        match tag.to_lowercase().as_str() {
            "easy" => Difficulty::Easy,
            "medium" => Difficulty::Medium,
            "hard" => Difficulty::Hard,
            _ => Difficulty::Unspecified,
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
            Difficulty::Unspecified => write!(f, "unspecified"),
        }
    }
}

/// A choice within a cultural scenario
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScenarioChoice {
    pub text: String,
    pub correct: bool,
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScenarioPayload {
    pub scenario: String,
    pub choices: Vec<ScenarioChoice>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuizPayload {
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LessonSection {
    pub heading: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LessonPayload {
    pub sections: Vec<LessonSection>,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PracticePayload {
    pub steps: Vec<String>,
    pub tips: Vec<String>,
}

/// Quest payload, typed by the quest's type tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "kebab-case")]
pub enum QuestPayload {
    CulturalScenario(ScenarioPayload),
    TriviaQuiz(QuizPayload),
    HistoryLesson(LessonPayload),
    CulturalPractice(PracticePayload),

    /// Type tag outside the known set
    Unknown {
        type_tag: String,
        raw: serde_json::Value,
    },

    /// Known tag, but the payload doesn't fit its shape
    Malformed {
        type_tag: String,
        raw: serde_json::Value,
        reason: String,
    },
}

impl QuestPayload {
    /// Type a raw payload by its tag. Never fails.
    pub fn from_raw(type_tag: &str, raw: serde_json::Value) -> Self {
        let quest_type = match type_tag.parse::<QuestType>() {
            Ok(quest_type) => quest_type,
            Err(_) => {
                return QuestPayload::Unknown {
                    type_tag: type_tag.to_string(),
                    raw,
                }
            }
        };

        // A null payload is an empty one
        let value = if raw.is_null() {
            serde_json::Value::Object(Default::default())
        } else {
            raw.clone()
        };

        let typed = match quest_type {
            QuestType::CulturalScenario => {
                serde_json::from_value(value).map(QuestPayload::CulturalScenario)
            }
            QuestType::TriviaQuiz => serde_json::from_value(value).map(QuestPayload::TriviaQuiz),
            QuestType::HistoryLesson => {
                serde_json::from_value(value).map(QuestPayload::HistoryLesson)
            }
            QuestType::CulturalPractice => {
                serde_json::from_value(value).map(QuestPayload::CulturalPractice)
            }
        };

        typed.unwrap_or_else(|e| QuestPayload::Malformed {
            type_tag: type_tag.to_string(),
            raw,
            reason: e.to_string(),
        })
    }

    /// The known quest type, if the payload was typed successfully
    pub fn quest_type(&self) -> Option<QuestType> {
        match self {
            QuestPayload::CulturalScenario(_) => Some(QuestType::CulturalScenario),
            QuestPayload::TriviaQuiz(_) => Some(QuestType::TriviaQuiz),
            QuestPayload::HistoryLesson(_) => Some(QuestType::HistoryLesson),
            QuestPayload::CulturalPractice(_) => Some(QuestType::CulturalPractice),
            QuestPayload::Unknown { .. } | QuestPayload::Malformed { .. } => None,
        }
    }
}

/// A quest nested inside its country
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quest {
    pub id: String,

    /// Parent country id
    pub country_id: String,

    /// Type tag as stored in the source
    pub type_tag: String,

    pub difficulty: Difficulty,

    pub points: u32,

    /// Resolved title
    pub title: String,

    /// Resolved description
    #[serde(default)]
    pub description: String,

    pub payload: QuestPayload,
}

impl Quest {
    /// The typed payload, or the recoverable condition that prevented typing it
    pub fn typed_payload(&self) -> Result<&QuestPayload, ContentError> {
        match &self.payload {
            QuestPayload::Unknown { type_tag, .. } => {
                Err(ContentError::UnknownQuestType(type_tag.clone()))
            }
            QuestPayload::Malformed { reason, .. } => Err(ContentError::MalformedQuestPayload {
                quest_id: self.id.clone(),
                reason: reason.clone(),
            }),
            payload => Ok(payload),
        }
    }
}
