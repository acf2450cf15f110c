use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::models::{FacultySubjectScore, ScoreRow};

/// Faculty are told apart by their stable id, or by display name when a row
/// carries no id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum FacultyKey {
    Id(Uuid),
    Name(String),
}

impl FacultyKey {
    fn of(row: &ScoreRow) -> Self {
        match row.faculty_id {
            Some(id) => Self::Id(id),
            None => Self::Name(row.faculty_name.clone()),
        }
    }
}

struct Group {
    faculty: FacultyKey,
    faculty_id: Option<Uuid>,
    faculty_name: String,
    subject: String,
    student_total: f64,
    teacher_total: f64,
    overall_total: f64,
    overall_count: usize,
    count: usize,
    latest_semester: String,
    latest_year: String,
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn mean(total: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

/// Best-scoring faculty/subject pairs, at most one per faculty member.
///
/// Rows without both action percentages are skipped. Ties keep the order in
/// which their groups were first seen.
pub fn rank_top(rows: &[ScoreRow], limit: usize) -> Vec<FacultySubjectScore> {
    let mut groups: Vec<Group> = Vec::new();
    let mut index: HashMap<(FacultyKey, String), usize> = HashMap::new();
    let mut skipped = 0usize;

    for row in rows {
        let (Some(student), Some(teacher)) =
            (row.student_action_percentage, row.teacher_action_percentage)
        else {
            skipped += 1;
            continue;
        };

        let faculty = FacultyKey::of(row);
        let slot = *index
            .entry((faculty.clone(), row.subject.clone()))
            .or_insert_with(|| {
                groups.push(Group {
                    faculty,
                    faculty_id: row.faculty_id,
                    faculty_name: row.faculty_name.clone(),
                    subject: row.subject.clone(),
                    student_total: 0.0,
                    teacher_total: 0.0,
                    overall_total: 0.0,
                    overall_count: 0,
                    count: 0,
                    latest_semester: String::new(),
                    latest_year: String::new(),
                });
                groups.len() - 1
            });

        let group = &mut groups[slot];
        group.student_total += student;
        group.teacher_total += teacher;
        if let Some(overall) = row.overall_percentage {
            group.overall_total += overall;
            group.overall_count += 1;
        }
        group.count += 1;
        if row.semester > group.latest_semester {
            group.latest_semester = row.semester.clone();
        }
        if row.year > group.latest_year {
            group.latest_year = row.year.clone();
        }
    }

    if skipped > 0 {
        tracing::debug!(skipped, "score rows without action percentages left out of ranking");
    }

    let mut scored: Vec<(FacultyKey, FacultySubjectScore)> = groups
        .into_iter()
        .map(|group| {
            let student_action_average = round2(mean(group.student_total, group.count));
            let teacher_action_average = round2(mean(group.teacher_total, group.count));
            let score = FacultySubjectScore {
                faculty_id: group.faculty_id,
                faculty_name: group.faculty_name,
                subject: group.subject,
                student_action_average,
                teacher_action_average,
                overall_average: round2(mean(group.overall_total, group.overall_count)),
                combined_score: round2((student_action_average + teacher_action_average) / 2.0),
                observation_count: group.count,
                latest_semester: group.latest_semester,
                latest_year: group.latest_year,
            };
            (group.faculty, score)
        })
        .collect();

    scored.sort_by(|a, b| {
        b.1.combined_score
            .partial_cmp(&a.1.combined_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut seen: HashSet<FacultyKey> = HashSet::new();
    let mut ranking = Vec::new();
    for (faculty, score) in scored {
        if ranking.len() >= limit {
            break;
        }
        if seen.insert(faculty) {
            ranking.push(score);
        }
    }

    ranking
}
