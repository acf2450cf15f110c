use std::collections::BTreeMap;

use uuid::Uuid;

use crate::copus::{EngagementLevel, StudentAction, TeacherAction};
use crate::models::{
    EngagementPercentages, IntervalRecord, ObservationSession, SessionNumber, TallySet,
};

pub const NO_COMMENTS: &str = "No comments recorded.";

/// Counts action and engagement occurrences across intervals.
///
/// An interval with three student flags adds three to `total_intervals`.
/// Codes outside the vocabulary are left out of every count and kept in
/// `ignored_codes`.
pub fn aggregate(intervals: &[IntervalRecord]) -> TallySet {
    let mut tally = TallySet::default();

    for interval in intervals {
        for code in &interval.student_actions {
            match StudentAction::from_code(code) {
                Some(action) => *tally.student_action_counts.entry(action).or_insert(0) += 1,
                None => ignore(&mut tally.ignored_codes, code, "student"),
            }
        }

        for code in &interval.teacher_actions {
            match TeacherAction::from_code(code) {
                Some(action) => *tally.teacher_action_counts.entry(action).or_insert(0) += 1,
                None => ignore(&mut tally.ignored_codes, code, "teacher"),
            }
        }

        if let Some(level) = interval.engagement {
            tally.engagement_counts.increment(level);
        }
    }

    tally.total_intervals = tally.student_action_counts.values().sum();
    tally
}

fn ignore(bucket: &mut BTreeMap<String, u32>, code: &str, kind: &str) {
    tracing::debug!(code, kind, "ignoring unknown COPUS code");
    *bucket.entry(code.trim().to_string()).or_insert(0) += 1;
}

pub fn percentage(count: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

pub fn derive_percentages(tally: &TallySet) -> EngagementPercentages {
    let total = tally.total_intervals;
    EngagementPercentages {
        high: percentage(tally.engagement_counts.get(EngagementLevel::High), total),
        med: percentage(tally.engagement_counts.get(EngagementLevel::Med), total),
        low: percentage(tally.engagement_counts.get(EngagementLevel::Low), total),
    }
}

pub fn student_action_percentages(tally: &TallySet) -> Vec<(StudentAction, f64)> {
    StudentAction::ALL
        .into_iter()
        .map(|action| {
            (
                action,
                percentage(tally.student_count(action), tally.total_intervals),
            )
        })
        .collect()
}

/// Teacher categories share the student-action denominator.
pub fn teacher_action_percentages(tally: &TallySet) -> Vec<(TeacherAction, f64)> {
    TeacherAction::ALL
        .into_iter()
        .map(|action| {
            (
                action,
                percentage(tally.teacher_count(action), tally.total_intervals),
            )
        })
        .collect()
}

pub fn join_comments(intervals: &[IntervalRecord]) -> String {
    let joined = intervals
        .iter()
        .filter_map(|interval| interval.comment.as_deref())
        .map(str::trim)
        .filter(|comment| !comment.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if joined.is_empty() {
        NO_COMMENTS.to_string()
    } else {
        joined
    }
}

pub fn build_session(
    schedule_id: Uuid,
    session_number: SessionNumber,
    observer: &str,
    intervals: &[IntervalRecord],
) -> ObservationSession {
    let tally = aggregate(intervals);
    let incomplete = intervals.iter().filter(|i| !i.is_complete()).count();
    if incomplete > 0 {
        tracing::debug!(
            %schedule_id,
            session = session_number.get(),
            incomplete,
            "intervals without any action flag"
        );
    }
    if !tally.ignored_codes.is_empty() {
        tracing::warn!(
            %schedule_id,
            session = session_number.get(),
            ignored = ?tally.ignored_codes,
            "session contains unknown COPUS codes"
        );
    }

    ObservationSession {
        schedule_id,
        session_number,
        observer: observer.to_string(),
        tally,
        comments: join_comments(intervals),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interval(
        student: &[&str],
        teacher: &[&str],
        engagement: Option<EngagementLevel>,
    ) -> IntervalRecord {
        IntervalRecord {
            student_actions: student.iter().map(|code| code.to_string()).collect(),
            teacher_actions: teacher.iter().map(|code| code.to_string()).collect(),
            engagement,
            comment: None,
        }
    }

    fn sample_intervals() -> Vec<IntervalRecord> {
        vec![
            interval(&["L", "Ind"], &[], Some(EngagementLevel::High)),
            interval(&[], &["Lec"], None),
            interval(&["Grp"], &[], Some(EngagementLevel::Med)),
        ]
    }

    #[test]
    fn counts_three_interval_sample() {
        let tally = aggregate(&sample_intervals());

        assert_eq!(tally.student_count(StudentAction::Listening), 1);
        assert_eq!(tally.student_count(StudentAction::IndividualWork), 1);
        assert_eq!(tally.student_count(StudentAction::GroupWork), 1);
        assert_eq!(tally.student_action_counts.len(), 3);
        assert_eq!(tally.teacher_count(TeacherAction::Lecturing), 1);
        assert_eq!(tally.teacher_action_counts.len(), 1);
        assert_eq!(tally.engagement_counts.high, 1);
        assert_eq!(tally.engagement_counts.med, 1);
        assert_eq!(tally.engagement_counts.low, 0);
        assert_eq!(tally.total_intervals, 3);

        let percentages = derive_percentages(&tally);
        assert!((percentages.high - 33.333).abs() < 0.01);
        assert!((percentages.med - 33.333).abs() < 0.01);
        assert_eq!(percentages.low, 0.0);
    }

    #[test]
    fn empty_input_gives_empty_tally() {
        let tally = aggregate(&[]);
        assert!(tally.student_action_counts.is_empty());
        assert!(tally.teacher_action_counts.is_empty());
        assert_eq!(tally.engagement_counts, Default::default());
        assert_eq!(tally.total_intervals, 0);

        let percentages = derive_percentages(&tally);
        assert_eq!(percentages, EngagementPercentages::default());
    }

    #[test]
    fn zero_denominator_ignores_engagement_counts() {
        let intervals = vec![
            interval(&[], &["Lec"], Some(EngagementLevel::High)),
            interval(&[], &["RtW"], Some(EngagementLevel::Low)),
        ];
        let tally = aggregate(&intervals);
        assert_eq!(tally.total_intervals, 0);
        assert_eq!(tally.engagement_counts.high, 1);

        let percentages = derive_percentages(&tally);
        assert_eq!(percentages.high, 0.0);
        assert_eq!(percentages.med, 0.0);
        assert_eq!(percentages.low, 0.0);
        assert!(teacher_action_percentages(&tally)
            .iter()
            .all(|(_, value)| *value == 0.0));
    }

    #[test]
    fn unknown_codes_are_not_counted() {
        let intervals = vec![interval(&["L", "Dance"], &["Juggle", "Lec"], None)];
        let tally = aggregate(&intervals);

        assert_eq!(tally.total_intervals, 1);
        assert_eq!(tally.teacher_action_counts.len(), 1);
        assert_eq!(tally.ignored_codes.get("Dance"), Some(&1));
        assert_eq!(tally.ignored_codes.get("Juggle"), Some(&1));
    }

    #[test]
    fn aggregation_is_additive_over_concatenation() {
        let first = sample_intervals();
        let second = vec![
            interval(&["L"], &["Lec", "PQ"], Some(EngagementLevel::Low)),
            interval(&["Grp", "SQ"], &["MG"], Some(EngagementLevel::High)),
        ];
        let mut both = first.clone();
        both.extend(second.clone());

        let whole = aggregate(&both);
        let summed = aggregate(&first).merge(&aggregate(&second));
        assert_eq!(whole, summed);
    }

    #[test]
    fn teacher_percentages_use_student_denominator() {
        let intervals = vec![
            interval(&["L"], &["Lec"], None),
            interval(&["L"], &["Lec"], None),
            interval(&["Grp", "SQ"], &["MG"], None),
            interval(&["Ind"], &[], None),
        ];
        let tally = aggregate(&intervals);
        assert_eq!(tally.total_intervals, 5);

        let lecturing = teacher_action_percentages(&tally)
            .into_iter()
            .find(|(action, _)| *action == TeacherAction::Lecturing)
            .map(|(_, value)| value)
            .unwrap();
        assert!((lecturing - 40.0).abs() < 1e-9);

        let listening = student_action_percentages(&tally)
            .into_iter()
            .find(|(action, _)| *action == StudentAction::Listening)
            .map(|(_, value)| value)
            .unwrap();
        assert!((listening - 40.0).abs() < 1e-9);
    }

    #[test]
    fn comments_are_space_joined_or_placeholder() {
        let mut intervals = sample_intervals();
        assert_eq!(join_comments(&intervals), NO_COMMENTS);

        intervals[0].comment = Some("Strong opener.".to_string());
        intervals[1].comment = Some("   ".to_string());
        intervals[2].comment = Some(" Groups stayed on task. ".to_string());
        assert_eq!(
            join_comments(&intervals),
            "Strong opener. Groups stayed on task."
        );
    }

    #[test]
    fn build_session_carries_tally_and_comments() {
        let schedule_id = Uuid::new_v4();
        let number = SessionNumber::try_from(2_i64).unwrap();
        let session = build_session(schedule_id, number, "R. Santos", &sample_intervals());

        assert_eq!(session.schedule_id, schedule_id);
        assert_eq!(session.session_number.get(), 2);
        assert_eq!(session.observer, "R. Santos");
        assert_eq!(session.tally.total_intervals, 3);
        assert_eq!(session.comments, NO_COMMENTS);
    }
}
