use std::fmt::Write;

use crate::combine;
use crate::copus::EngagementLevel;
use crate::models::{AggregatedResult, ObservationSession, ScoreRow, TallySet};
use crate::ranking;
use crate::tally;

fn write_tally(output: &mut String, tally: &TallySet) {
    let engagement = tally::derive_percentages(tally);
    let levels: Vec<String> = EngagementLevel::ALL
        .into_iter()
        .map(|level| {
            format!(
                "{} {:.2}% ({})",
                level.label(),
                engagement.get(level),
                tally.engagement_counts.get(level)
            )
        })
        .collect();
    let _ = writeln!(output, "Engagement: {}", levels.join(", "));
    let _ = writeln!(output);

    let _ = writeln!(output, "| Student action | Count | Share |");
    let _ = writeln!(output, "|---|---|---|");
    for (action, share) in tally::student_action_percentages(tally) {
        let count = tally.student_count(action);
        if count > 0 {
            let _ = writeln!(
                output,
                "| {} ({}) | {} | {:.2}% |",
                action.label(),
                action.code(),
                count,
                share
            );
        }
    }
    let _ = writeln!(output);

    let _ = writeln!(output, "| Teacher action | Count | Share |");
    let _ = writeln!(output, "|---|---|---|");
    for (action, share) in tally::teacher_action_percentages(tally) {
        let count = tally.teacher_count(action);
        if count > 0 {
            let _ = writeln!(
                output,
                "| {} ({}) | {} | {:.2}% |",
                action.label(),
                action.code(),
                count,
                share
            );
        }
    }

    if !tally.ignored_codes.is_empty() {
        let codes: Vec<String> = tally
            .ignored_codes
            .iter()
            .map(|(code, count)| format!("{code} x{count}"))
            .collect();
        let _ = writeln!(output);
        let _ = writeln!(output, "Unrecognised codes (not counted): {}", codes.join(", "));
    }
}

pub fn build_report(
    label: Option<&str>,
    sessions: &[ObservationSession],
    result: &AggregatedResult,
) -> String {
    let mut output = String::new();
    let class_label = label.unwrap_or("unknown class");

    let _ = writeln!(output, "# COPUS Observation Report");
    let _ = writeln!(
        output,
        "Generated for {} ({} of 3 sessions recorded)",
        class_label, result.session_count
    );

    if sessions.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "No observation sessions recorded for this class.");
        return output;
    }

    for session in sessions {
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "## Session {} (observer: {})",
            session.session_number.get(),
            session.observer
        );
        let _ = writeln!(
            output,
            "{} action occurrences recorded.",
            session.tally.total_intervals
        );
        write_tally(&mut output, &session.tally);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Combined Result");
    let _ = writeln!(
        output,
        "{} action occurrences across {} sessions.",
        result.combined_total_intervals(),
        result.session_count
    );
    write_tally(&mut output, &result.combined);

    let metrics = combine::result_metrics(result);
    let _ = writeln!(output);
    let _ = writeln!(output, "- Active student share: {:.2}%", metrics.student_action_percentage);
    let _ = writeln!(output, "- Interactive teaching share: {:.2}%", metrics.teacher_action_percentage);
    let _ = writeln!(output, "- Engaged (High + Med): {:.2}%", metrics.overall_percentage);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Observer Comments");
    for session in sessions {
        let _ = writeln!(
            output,
            "- Session {}: {}",
            session.session_number.get(),
            session.comments
        );
    }

    output
}

pub fn build_leaderboard(rows: &[ScoreRow], limit: usize) -> String {
    let scores = ranking::rank_top(rows, limit);
    let mut output = String::new();

    let _ = writeln!(output, "# COPUS Leaderboard");
    let _ = writeln!(output);

    if scores.is_empty() {
        let _ = writeln!(output, "No computed results available yet.");
        return output;
    }

    let _ = writeln!(
        output,
        "| Rank | Faculty | Subject | Student | Teacher | Overall | Score | Observations | Latest term |"
    );
    let _ = writeln!(output, "|---|---|---|---|---|---|---|---|---|");
    for (position, score) in scores.iter().enumerate() {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {:.2} | {:.2} | {:.2} | {:.2} | {} | {} {} |",
            position + 1,
            score.faculty_name,
            score.subject,
            score.student_action_average,
            score.teacher_action_average,
            score.overall_average,
            score.combined_score,
            score.observation_count,
            score.latest_semester,
            score.latest_year
        );
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IntervalRecord, SessionNumber};
    use uuid::Uuid;

    fn sample_session(number: i64, comment: Option<&str>) -> ObservationSession {
        let intervals = vec![
            IntervalRecord {
                student_actions: vec!["L".to_string(), "Ind".to_string()],
                teacher_actions: vec!["Lec".to_string()],
                engagement: Some(EngagementLevel::High),
                comment: comment.map(str::to_string),
            },
            IntervalRecord {
                student_actions: vec!["Grp".to_string(), "Huh".to_string()],
                teacher_actions: vec!["MG".to_string()],
                engagement: Some(EngagementLevel::Med),
                comment: None,
            },
        ];
        tally::build_session(
            Uuid::nil(),
            SessionNumber::try_from(number).unwrap(),
            "Observer One",
            &intervals,
        )
    }

    #[test]
    fn report_lists_sessions_and_combined_result() {
        let sessions = vec![sample_session(1, Some("Lively.")), sample_session(2, None)];
        let result = combine::combine(Uuid::nil(), &sessions);
        let report = build_report(Some("Ana Reyes, Calculus I"), &sessions, &result);

        assert!(report.contains("Generated for Ana Reyes, Calculus I (2 of 3 sessions recorded)"));
        assert!(report.contains("## Session 1 (observer: Observer One)"));
        assert!(report.contains("## Session 2 (observer: Observer One)"));
        assert!(report.contains("6 action occurrences across 2 sessions."));
        assert!(report.contains("| Group work (Grp) | 2 | 33.33% |"));
        assert!(report.contains("Unrecognised codes (not counted): Huh x2"));
        assert!(report.contains("- Session 1: Lively."));
        assert!(report.contains(&format!("- Session 2: {}", tally::NO_COMMENTS)));
    }

    #[test]
    fn report_handles_missing_sessions() {
        let result = combine::combine(Uuid::nil(), &[]);
        let report = build_report(None, &[], &result);
        assert!(report.contains("unknown class (0 of 3 sessions recorded)"));
        assert!(report.contains("No observation sessions recorded for this class."));
    }

    #[test]
    fn leaderboard_renders_ranked_rows() {
        let rows = vec![
            ScoreRow {
                faculty_id: None,
                faculty_name: "Ana Reyes".to_string(),
                subject: "Calculus I".to_string(),
                student_action_percentage: Some(60.0),
                teacher_action_percentage: Some(40.0),
                overall_percentage: Some(75.0),
                semester: "1st Semester".to_string(),
                year: "2025-2026".to_string(),
            },
            ScoreRow {
                faculty_id: None,
                faculty_name: "Ben Santos".to_string(),
                subject: "General Chemistry".to_string(),
                student_action_percentage: Some(20.0),
                teacher_action_percentage: None,
                overall_percentage: Some(30.0),
                semester: "1st Semester".to_string(),
                year: "2025-2026".to_string(),
            },
        ];

        let board = build_leaderboard(&rows, 10);
        assert!(board.contains(
            "| 1 | Ana Reyes | Calculus I | 60.00 | 40.00 | 75.00 | 50.00 | 1 | 1st Semester 2025-2026 |"
        ));
        assert!(!board.contains("Ben Santos"));
        assert!(build_leaderboard(&[], 10).contains("No computed results available yet."));
    }
}
