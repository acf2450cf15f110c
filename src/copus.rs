//! The fixed COPUS category vocabulary.
//!
//! Codes are the short labels observers tick on the interval sheet. Parsing
//! accepts the canonical code first and falls back to an ASCII
//! case-insensitive match, so `lec` and `Lec` land on the same category.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StudentAction {
    #[serde(rename = "L")]
    Listening,
    #[serde(rename = "Ind")]
    IndividualWork,
    #[serde(rename = "Grp")]
    GroupWork,
    #[serde(rename = "AnQ")]
    AnsweringQuestion,
    #[serde(rename = "SQ")]
    AskingQuestion,
    #[serde(rename = "WC")]
    WholeClassDiscussion,
    #[serde(rename = "Prd")]
    Prediction,
    #[serde(rename = "SP")]
    Presentation,
    #[serde(rename = "TQ")]
    TestOrQuiz,
    #[serde(rename = "W")]
    Waiting,
    #[serde(rename = "O")]
    Other,
}

impl StudentAction {
    pub const ALL: [StudentAction; 11] = [
        Self::Listening,
        Self::IndividualWork,
        Self::GroupWork,
        Self::AnsweringQuestion,
        Self::AskingQuestion,
        Self::WholeClassDiscussion,
        Self::Prediction,
        Self::Presentation,
        Self::TestOrQuiz,
        Self::Waiting,
        Self::Other,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Self::Listening => "L",
            Self::IndividualWork => "Ind",
            Self::GroupWork => "Grp",
            Self::AnsweringQuestion => "AnQ",
            Self::AskingQuestion => "SQ",
            Self::WholeClassDiscussion => "WC",
            Self::Prediction => "Prd",
            Self::Presentation => "SP",
            Self::TestOrQuiz => "TQ",
            Self::Waiting => "W",
            Self::Other => "O",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Listening => "Listening",
            Self::IndividualWork => "Individual thinking/work",
            Self::GroupWork => "Group work",
            Self::AnsweringQuestion => "Answering a question",
            Self::AskingQuestion => "Asking a question",
            Self::WholeClassDiscussion => "Whole-class discussion",
            Self::Prediction => "Making a prediction",
            Self::Presentation => "Student presentation",
            Self::TestOrQuiz => "Test or quiz",
            Self::Waiting => "Waiting",
            Self::Other => "Other",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL
            .into_iter()
            .find(|action| action.code() == code)
            .or_else(|| {
                Self::ALL
                    .into_iter()
                    .find(|action| action.code().eq_ignore_ascii_case(code))
            })
    }

    /// Students doing something other than receiving or idling.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            Self::IndividualWork
                | Self::GroupWork
                | Self::AnsweringQuestion
                | Self::AskingQuestion
                | Self::WholeClassDiscussion
                | Self::Prediction
                | Self::Presentation
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TeacherAction {
    #[serde(rename = "Lec")]
    Lecturing,
    #[serde(rename = "RtW")]
    RealTimeWriting,
    #[serde(rename = "FUp")]
    FollowUp,
    #[serde(rename = "PQ")]
    PosingQuestion,
    #[serde(rename = "CQ")]
    ClickerQuestion,
    #[serde(rename = "AnQ")]
    AnsweringQuestion,
    #[serde(rename = "MG")]
    MovingAndGuiding,
    #[serde(rename = "1o1")]
    OneOnOne,
    #[serde(rename = "DV")]
    DemoOrVideo,
    #[serde(rename = "Adm")]
    Administration,
    #[serde(rename = "W")]
    Waiting,
    #[serde(rename = "O")]
    Other,
}

impl TeacherAction {
    pub const ALL: [TeacherAction; 12] = [
        Self::Lecturing,
        Self::RealTimeWriting,
        Self::FollowUp,
        Self::PosingQuestion,
        Self::ClickerQuestion,
        Self::AnsweringQuestion,
        Self::MovingAndGuiding,
        Self::OneOnOne,
        Self::DemoOrVideo,
        Self::Administration,
        Self::Waiting,
        Self::Other,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Self::Lecturing => "Lec",
            Self::RealTimeWriting => "RtW",
            Self::FollowUp => "FUp",
            Self::PosingQuestion => "PQ",
            Self::ClickerQuestion => "CQ",
            Self::AnsweringQuestion => "AnQ",
            Self::MovingAndGuiding => "MG",
            Self::OneOnOne => "1o1",
            Self::DemoOrVideo => "DV",
            Self::Administration => "Adm",
            Self::Waiting => "W",
            Self::Other => "O",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Lecturing => "Lecturing",
            Self::RealTimeWriting => "Real-time writing",
            Self::FollowUp => "Follow-up/feedback",
            Self::PosingQuestion => "Posing a question",
            Self::ClickerQuestion => "Clicker question",
            Self::AnsweringQuestion => "Answering student questions",
            Self::MovingAndGuiding => "Moving and guiding",
            Self::OneOnOne => "One-on-one discussion",
            Self::DemoOrVideo => "Demo or video",
            Self::Administration => "Administration",
            Self::Waiting => "Waiting",
            Self::Other => "Other",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL
            .into_iter()
            .find(|action| action.code() == code)
            .or_else(|| {
                Self::ALL
                    .into_iter()
                    .find(|action| action.code().eq_ignore_ascii_case(code))
            })
    }

    /// Instructor is engaging students rather than presenting or idling.
    pub fn is_interactive(self) -> bool {
        matches!(
            self,
            Self::FollowUp
                | Self::PosingQuestion
                | Self::ClickerQuestion
                | Self::AnsweringQuestion
                | Self::MovingAndGuiding
                | Self::OneOnOne
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EngagementLevel {
    High,
    Med,
    Low,
}

impl EngagementLevel {
    pub const ALL: [EngagementLevel; 3] = [Self::High, Self::Med, Self::Low];

    pub fn label(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Med => "Med",
            Self::Low => "Low",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "high" | "h" => Some(Self::High),
            "med" | "medium" | "m" => Some(Self::Med),
            "low" | "l" => Some(Self::Low),
            _ => None,
        }
    }
}
