use std::collections::HashMap;
use std::io::Read;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::copus::EngagementLevel;
use crate::error::ObservationError;
use crate::models::{IntervalRecord, SessionNumber};

#[derive(Debug, Deserialize)]
struct IntervalRow {
    faculty_email: String,
    faculty_name: String,
    subject_code: String,
    subject_name: String,
    semester: String,
    year: String,
    observed_on: NaiveDate,
    session_number: i64,
    observer: String,
    interval: u32,
    #[serde(default)]
    student_actions: String,
    #[serde(default)]
    teacher_actions: String,
    #[serde(default)]
    engagement: String,
    #[serde(default)]
    comment: String,
}

/// Intervals of one COPUS pass, together with the class it belongs to.
#[derive(Debug, Clone)]
pub struct ImportedSession {
    pub faculty_email: String,
    pub faculty_name: String,
    pub subject_code: String,
    pub subject_name: String,
    pub semester: String,
    pub year: String,
    pub observed_on: NaiveDate,
    pub session_number: SessionNumber,
    pub observer: String,
    pub intervals: Vec<IntervalRecord>,
}

fn split_codes(value: &str) -> Vec<String> {
    value
        .split(';')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_engagement(value: &str, interval: u32) -> Result<Option<EngagementLevel>, ObservationError> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    EngagementLevel::from_label(value)
        .map(Some)
        .ok_or_else(|| ObservationError::InvalidEngagement {
            value: value.to_string(),
            interval,
        })
}

/// The first row of a session decides its labels; later rows that disagree
/// are logged.
fn warn_on_mismatch(session: &ImportedSession, row: &IntervalRow) {
    let fields = [
        ("faculty_name", session.faculty_name.as_str(), row.faculty_name.trim()),
        ("subject_name", session.subject_name.as_str(), row.subject_name.trim()),
        ("observer", session.observer.as_str(), row.observer.trim()),
    ];
    for (field, kept, found) in fields {
        if kept != found {
            tracing::warn!(
                field,
                kept,
                found,
                interval = row.interval,
                session = session.session_number.get(),
                "interval row disagrees with its session, keeping the first value"
            );
        }
    }
    if session.observed_on != row.observed_on {
        tracing::warn!(
            kept = %session.observed_on,
            found = %row.observed_on,
            interval = row.interval,
            session = session.session_number.get(),
            "interval row has a different observation date, keeping the first value"
        );
    }
}

/// Reads interval rows and groups them into sessions.
///
/// Sessions come back in the order their first row appears; intervals inside
/// a session are ordered by their interval index.
pub fn read_intervals<R: Read>(reader: R) -> Result<Vec<ImportedSession>, ObservationError> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut sessions: Vec<(Vec<u32>, ImportedSession)> = Vec::new();
    let mut index: HashMap<(String, String, String, String, SessionNumber), usize> =
        HashMap::new();

    for (row_number, result) in reader.deserialize::<IntervalRow>().enumerate() {
        let row = result.map_err(|source| ObservationError::Csv {
            row: row_number + 1,
            source,
        })?;
        let session_number = SessionNumber::try_from(row.session_number)?;
        let engagement = parse_engagement(&row.engagement, row.interval)?;

        let key = (
            row.faculty_email.trim().to_lowercase(),
            row.subject_code.trim().to_string(),
            row.semester.trim().to_string(),
            row.year.trim().to_string(),
            session_number,
        );
        let slot = match index.get(&key) {
            Some(slot) => *slot,
            None => {
                sessions.push((
                    Vec::new(),
                    ImportedSession {
                        faculty_email: key.0.clone(),
                        faculty_name: row.faculty_name.trim().to_string(),
                        subject_code: key.1.clone(),
                        subject_name: row.subject_name.trim().to_string(),
                        semester: key.2.clone(),
                        year: key.3.clone(),
                        observed_on: row.observed_on,
                        session_number,
                        observer: row.observer.trim().to_string(),
                        intervals: Vec::new(),
                    },
                ));
                index.insert(key, sessions.len() - 1);
                sessions.len() - 1
            }
        };

        let comment = Some(row.comment.trim().to_string()).filter(|c| !c.is_empty());
        let (order, session) = &mut sessions[slot];
        if order.contains(&row.interval) {
            return Err(ObservationError::DuplicateInterval {
                interval: row.interval,
                session: session_number.get(),
            });
        }
        warn_on_mismatch(session, &row);
        order.push(row.interval);
        let mut record = IntervalRecord {
            student_actions: split_codes(&row.student_actions),
            teacher_actions: split_codes(&row.teacher_actions),
            engagement: None,
            comment,
        };
        if let Some(level) = engagement {
            record.set_engagement(level);
        }
        session.intervals.push(record);
    }

    Ok(sessions
        .into_iter()
        .map(|(order, mut session)| {
            let mut indexed: Vec<(u32, IntervalRecord)> =
                order.into_iter().zip(session.intervals).collect();
            indexed.sort_by_key(|(interval, _)| *interval);
            session.intervals = indexed.into_iter().map(|(_, record)| record).collect();
            session
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const HEADER: &str = "faculty_email,faculty_name,subject_code,subject_name,semester,year,observed_on,session_number,observer,interval,student_actions,teacher_actions,engagement,comment\n";

    #[test]
    fn groups_rows_into_sessions() {
        let data = format!(
            "{HEADER}\
             ana@school.edu,Ana Reyes,MATH101,Calculus,1st Semester,2025-2026,2025-09-15,1,Observer One,2,Grp,MG,Med,\n\
             ana@school.edu,Ana Reyes,MATH101,Calculus,1st Semester,2025-2026,2025-09-15,1,Observer One,1,L;Ind,Lec,High,Good pace\n\
             ana@school.edu,Ana Reyes,MATH101,Calculus,1st Semester,2025-2026,2025-09-15,2,Observer Two,1,L,Lec;RtW,,\n"
        );

        let sessions = read_intervals(data.as_bytes()).unwrap();
        assert_eq!(sessions.len(), 2);

        let first = &sessions[0];
        assert_eq!(first.session_number.get(), 1);
        assert_eq!(first.intervals.len(), 2);
        assert_eq!(first.intervals[0].student_actions, vec!["L", "Ind"]);
        assert_eq!(first.intervals[0].engagement, Some(EngagementLevel::High));
        assert_eq!(first.intervals[0].comment.as_deref(), Some("Good pace"));
        assert_eq!(first.intervals[1].teacher_actions, vec!["MG"]);
        assert_eq!(first.intervals[1].comment, None);

        let second = &sessions[1];
        assert_eq!(second.session_number.get(), 2);
        assert_eq!(second.observer, "Observer Two");
        assert_eq!(second.intervals[0].teacher_actions, vec!["Lec", "RtW"]);
        assert_eq!(second.intervals[0].engagement, None);
    }

    #[test]
    fn rejects_out_of_range_session_number() {
        let data = format!(
            "{HEADER}ana@school.edu,Ana Reyes,MATH101,Calculus,1st Semester,2025-2026,2025-09-15,4,Observer,1,L,Lec,High,\n"
        );
        assert_matches!(
            read_intervals(data.as_bytes()),
            Err(ObservationError::InvalidSessionNumber(4))
        );
    }

    #[test]
    fn rejects_repeated_interval_in_a_session() {
        let data = format!(
            "{HEADER}\
             ana@school.edu,Ana Reyes,MATH101,Calculus,1st Semester,2025-2026,2025-09-15,1,Observer,1,L,Lec,High,\n\
             ana@school.edu,Ana Reyes,MATH101,Calculus,1st Semester,2025-2026,2025-09-15,1,Observer,1,L,Lec,High,\n"
        );
        assert_matches!(
            read_intervals(data.as_bytes()),
            Err(ObservationError::DuplicateInterval { interval: 1, session: 1 })
        );
    }

    #[test]
    fn same_interval_index_in_different_sessions_is_fine() {
        let data = format!(
            "{HEADER}\
             ana@school.edu,Ana Reyes,MATH101,Calculus,1st Semester,2025-2026,2025-09-15,1,Observer,1,L,Lec,High,\n\
             ana@school.edu,Ana Reyes,MATH101,Calculus,1st Semester,2025-2026,2025-09-15,2,Observer,1,L,Lec,High,\n"
        );
        let sessions = read_intervals(data.as_bytes()).unwrap();
        assert_eq!(sessions.len(), 2);
    }

    #[test]
    fn first_row_labels_win_when_rows_disagree() {
        let data = format!(
            "{HEADER}\
             ana@school.edu,Ana Reyes,MATH101,Calculus,1st Semester,2025-2026,2025-09-15,1,Observer One,1,L,Lec,High,\n\
             ana@school.edu,A. Reyes,MATH101,Calculus,1st Semester,2025-2026,2025-09-16,1,Observer Two,2,L,Lec,High,\n"
        );
        let sessions = read_intervals(data.as_bytes()).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].faculty_name, "Ana Reyes");
        assert_eq!(sessions[0].observer, "Observer One");
        assert_eq!(sessions[0].intervals.len(), 2);
    }

    #[test]
    fn rejects_unknown_engagement_label() {
        let data = format!(
            "{HEADER}ana@school.edu,Ana Reyes,MATH101,Calculus,1st Semester,2025-2026,2025-09-15,1,Observer,3,L,Lec,Bored,\n"
        );
        assert_matches!(
            read_intervals(data.as_bytes()),
            Err(ObservationError::InvalidEngagement { interval: 3, .. })
        );
    }

    #[test]
    fn reports_malformed_rows() {
        let data = format!(
            "{HEADER}ana@school.edu,Ana Reyes,MATH101,Calculus,1st Semester,2025-2026,not-a-date,1,Observer,1,L,Lec,High,\n"
        );
        assert_matches!(
            read_intervals(data.as_bytes()),
            Err(ObservationError::Csv { row: 1, .. })
        );
    }

    #[test]
    fn unknown_action_codes_pass_through_to_aggregation() {
        let data = format!(
            "{HEADER}ana@school.edu,Ana Reyes,MATH101,Calculus,1st Semester,2025-2026,2025-09-15,1,Observer,1,L;Nap,Lec,,\n"
        );
        let sessions = read_intervals(data.as_bytes()).unwrap();
        let tally = crate::tally::aggregate(&sessions[0].intervals);
        assert_eq!(tally.total_intervals, 1);
        assert_eq!(tally.ignored_codes.get("Nap"), Some(&1));
    }
}
