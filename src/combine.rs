use uuid::Uuid;

use crate::models::{
    AggregatedResult, EngagementPercentages, ObservationSession, ResultMetrics, TallySet,
};
use crate::ranking::round2;
use crate::tally::{derive_percentages, percentage};

impl TallySet {
    /// Element-wise sum over the union of keys. `TallySet::default()` is the
    /// identity, and the operation is associative and commutative.
    pub fn merge(&self, other: &TallySet) -> TallySet {
        let mut merged = self.clone();

        for (action, count) in &other.student_action_counts {
            let slot = merged.student_action_counts.entry(*action).or_insert(0);
            *slot = slot.saturating_add(*count);
        }
        for (action, count) in &other.teacher_action_counts {
            let slot = merged.teacher_action_counts.entry(*action).or_insert(0);
            *slot = slot.saturating_add(*count);
        }
        for (code, count) in &other.ignored_codes {
            let slot = merged.ignored_codes.entry(code.clone()).or_insert(0);
            *slot = slot.saturating_add(*count);
        }

        let engagement = &mut merged.engagement_counts;
        engagement.high = engagement.high.saturating_add(other.engagement_counts.high);
        engagement.med = engagement.med.saturating_add(other.engagement_counts.med);
        engagement.low = engagement.low.saturating_add(other.engagement_counts.low);
        merged.total_intervals = merged.total_intervals.saturating_add(other.total_intervals);
        merged
    }
}

pub fn combine(schedule_id: Uuid, sessions: &[ObservationSession]) -> AggregatedResult {
    let combined = sessions
        .iter()
        .fold(TallySet::default(), |acc, session| acc.merge(&session.tally));

    AggregatedResult {
        schedule_id,
        session_count: sessions.len(),
        combined,
    }
}

/// Figures stored for ranking, all against the combined student-action total.
pub fn result_metrics(result: &AggregatedResult) -> ResultMetrics {
    let tally = &result.combined;
    let total = tally.total_intervals;

    let active_students: u32 = tally
        .student_action_counts
        .iter()
        .filter(|(action, _)| action.is_active())
        .map(|(_, count)| count)
        .sum();
    let interactive_teaching: u32 = tally
        .teacher_action_counts
        .iter()
        .filter(|(action, _)| action.is_interactive())
        .map(|(_, count)| count)
        .sum();

    let engagement = derive_percentages(tally);

    ResultMetrics {
        engagement: EngagementPercentages {
            high: round2(engagement.high),
            med: round2(engagement.med),
            low: round2(engagement.low),
        },
        student_action_percentage: round2(percentage(active_students, total)),
        teacher_action_percentage: round2(percentage(interactive_teaching, total)),
        overall_percentage: round2(engagement.high + engagement.med),
        total_intervals: total,
    }
}
