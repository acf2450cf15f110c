use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::copus::{EngagementLevel, StudentAction, TeacherAction};
use crate::error::ObservationError;

/// One observation tick as handed over by the recorder.
///
/// Action codes stay raw so the aggregator can decide what it recognises.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntervalRecord {
    pub student_actions: Vec<String>,
    pub teacher_actions: Vec<String>,
    pub engagement: Option<EngagementLevel>,
    pub comment: Option<String>,
}

impl IntervalRecord {
    /// Selecting a level replaces whatever was selected before.
    pub fn set_engagement(&mut self, level: EngagementLevel) {
        self.engagement = Some(level);
    }

    pub fn clear_engagement(&mut self) {
        self.engagement = None;
    }

    /// True when any action flag is set. Codes are not checked against the
    /// vocabulary here, so an interval flagged only with unknown codes is
    /// complete even though `aggregate` counts nothing for it.
    pub fn is_complete(&self) -> bool {
        !self.student_actions.is_empty() || !self.teacher_actions.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementCounts {
    pub high: u32,
    pub med: u32,
    pub low: u32,
}

impl EngagementCounts {
    pub fn get(&self, level: EngagementLevel) -> u32 {
        match level {
            EngagementLevel::High => self.high,
            EngagementLevel::Med => self.med,
            EngagementLevel::Low => self.low,
        }
    }

    pub fn increment(&mut self, level: EngagementLevel) {
        match level {
            EngagementLevel::High => self.high += 1,
            EngagementLevel::Med => self.med += 1,
            EngagementLevel::Low => self.low += 1,
        }
    }
}

/// Occurrence counts over one or more intervals.
///
/// `total_intervals` is the sum of the student-action counts and is the only
/// denominator used for percentages, teacher and engagement ones included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallySet {
    pub student_action_counts: BTreeMap<StudentAction, u32>,
    pub teacher_action_counts: BTreeMap<TeacherAction, u32>,
    pub engagement_counts: EngagementCounts,
    pub total_intervals: u32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ignored_codes: BTreeMap<String, u32>,
}

impl TallySet {
    pub fn student_count(&self, action: StudentAction) -> u32 {
        self.student_action_counts.get(&action).copied().unwrap_or(0)
    }

    pub fn teacher_count(&self, action: TeacherAction) -> u32 {
        self.teacher_action_counts.get(&action).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionNumber(u8);

impl SessionNumber {
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for SessionNumber {
    type Error = ObservationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1..=3 => Ok(Self(value as u8)),
            _ => Err(ObservationError::InvalidSessionNumber(value)),
        }
    }
}

/// One completed COPUS pass over a class.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationSession {
    pub schedule_id: Uuid,
    pub session_number: SessionNumber,
    pub observer: String,
    pub tally: TallySet,
    pub comments: String,
}

/// All sessions of one schedule folded together.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedResult {
    pub schedule_id: Uuid,
    pub session_count: usize,
    pub combined: TallySet,
}

impl AggregatedResult {
    pub fn combined_total_intervals(&self) -> u32 {
        self.combined.total_intervals
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EngagementPercentages {
    pub high: f64,
    pub med: f64,
    pub low: f64,
}

impl EngagementPercentages {
    pub fn get(&self, level: EngagementLevel) -> f64 {
        match level {
            EngagementLevel::High => self.high,
            EngagementLevel::Med => self.med,
            EngagementLevel::Low => self.low,
        }
    }
}

/// The figures persisted per schedule and later read back for ranking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ResultMetrics {
    pub engagement: EngagementPercentages,
    pub student_action_percentage: f64,
    pub teacher_action_percentage: f64,
    pub overall_percentage: f64,
    pub total_intervals: u32,
}

/// A stored result joined with its faculty, subject and term.
#[derive(Debug, Clone)]
pub struct ScoreRow {
    pub faculty_id: Option<Uuid>,
    pub faculty_name: String,
    pub subject: String,
    pub student_action_percentage: Option<f64>,
    pub teacher_action_percentage: Option<f64>,
    pub overall_percentage: Option<f64>,
    pub semester: String,
    pub year: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacultySubjectScore {
    pub faculty_id: Option<Uuid>,
    pub faculty_name: String,
    pub subject: String,
    pub student_action_average: f64,
    pub teacher_action_average: f64,
    pub overall_average: f64,
    pub combined_score: f64,
    pub observation_count: usize,
    pub latest_semester: String,
    pub latest_year: String,
}
