use anyhow::Context;
use chrono::NaiveDate;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::copus::EngagementLevel;
use crate::import::{self, ImportedSession};
use crate::models::{
    AggregatedResult, IntervalRecord, ObservationSession, ResultMetrics, ScoreRow,
    SessionNumber, TallySet,
};
use crate::tally;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn seed_interval(
    student: &[&str],
    teacher: &[&str],
    engagement: Option<EngagementLevel>,
    comment: Option<&str>,
) -> IntervalRecord {
    IntervalRecord {
        student_actions: student.iter().map(|code| code.to_string()).collect(),
        teacher_actions: teacher.iter().map(|code| code.to_string()).collect(),
        engagement,
        comment: comment.map(str::to_string),
    }
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    use EngagementLevel::{High, Low, Med};

    let observed_on = NaiveDate::from_ymd_opt(2025, 9, 15).context("invalid date")?;
    let classes = vec![
        (
            "ana.reyes@copus.edu",
            "Ana Reyes",
            "MATH101",
            "Calculus I",
            vec![
                (
                    1,
                    "Observer One",
                    vec![
                        seed_interval(&["L"], &["Lec"], Some(Med), None),
                        seed_interval(&["L", "AnQ"], &["PQ"], Some(High), Some("Quick warm-up quiz.")),
                        seed_interval(&["Grp"], &["MG"], Some(High), None),
                    ],
                ),
                (
                    2,
                    "Observer Two",
                    vec![
                        seed_interval(&["L"], &["Lec", "RtW"], Some(Low), None),
                        seed_interval(&["Ind"], &["MG"], Some(Med), Some("Worksheet time.")),
                    ],
                ),
            ],
        ),
        (
            "ben.santos@copus.edu",
            "Ben Santos",
            "CHEM110",
            "General Chemistry",
            vec![(
                1,
                "Observer One",
                vec![
                    seed_interval(&["L"], &["Lec"], Some(Low), None),
                    seed_interval(&["L"], &["Lec"], Some(Low), Some("Mostly lecture.")),
                    seed_interval(&["SQ"], &["AnQ"], Some(Med), None),
                ],
            )],
        ),
    ];

    for (email, name, code, subject, sessions) in classes {
        for (number, observer, intervals) in sessions {
            let imported = ImportedSession {
                faculty_email: email.to_string(),
                faculty_name: name.to_string(),
                subject_code: code.to_string(),
                subject_name: subject.to_string(),
                semester: "1st Semester".to_string(),
                year: "2025-2026".to_string(),
                observed_on,
                session_number: SessionNumber::try_from(number as i64)?,
                observer: observer.to_string(),
                intervals,
            };
            let schedule_id = upsert_schedule(pool, &imported).await?;
            let session = tally::build_session(
                schedule_id,
                imported.session_number,
                &imported.observer,
                &imported.intervals,
            );
            insert_session(pool, &session).await?;
        }
    }

    Ok(())
}

/// Finds or creates the faculty, subject and schedule rows for a session.
pub async fn upsert_schedule(pool: &PgPool, imported: &ImportedSession) -> anyhow::Result<Uuid> {
    let faculty_id: Uuid = sqlx::query(
        r#"
        INSERT INTO copus_observation.faculty (id, full_name, email)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO UPDATE
        SET full_name = EXCLUDED.full_name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&imported.faculty_name)
    .bind(&imported.faculty_email)
    .fetch_one(pool)
    .await?
    .get("id");

    let subject_id: Uuid = sqlx::query(
        r#"
        INSERT INTO copus_observation.subjects (id, code, name)
        VALUES ($1, $2, $3)
        ON CONFLICT (code) DO UPDATE
        SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&imported.subject_code)
    .bind(&imported.subject_name)
    .fetch_one(pool)
    .await?
    .get("id");

    let schedule_id: Uuid = sqlx::query(
        r#"
        INSERT INTO copus_observation.schedules
        (id, faculty_id, subject_id, semester, year, observed_on)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (faculty_id, subject_id, semester, year) DO UPDATE
        SET observed_on = LEAST(copus_observation.schedules.observed_on, EXCLUDED.observed_on)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(faculty_id)
    .bind(subject_id)
    .bind(&imported.semester)
    .bind(&imported.year)
    .bind(imported.observed_on)
    .fetch_one(pool)
    .await?
    .get("id");

    Ok(schedule_id)
}

/// Stores a finished session. Returns false when that pass already exists;
/// recorded sessions are never overwritten.
pub async fn insert_session(pool: &PgPool, session: &ObservationSession) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO copus_observation.observation_sessions
        (id, schedule_id, session_number, observer, tally, total_intervals, comments)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (schedule_id, session_number) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(session.schedule_id)
    .bind(session.session_number.get() as i16)
    .bind(&session.observer)
    .bind(Json(&session.tally))
    .bind(i32::try_from(session.tally.total_intervals).context("interval total out of range")?)
    .bind(&session.comments)
    .execute(pool)
    .await?;

    let inserted = result.rows_affected() > 0;
    if !inserted {
        tracing::info!(
            schedule_id = %session.schedule_id,
            session = session.session_number.get(),
            "session already recorded, skipping"
        );
    }
    Ok(inserted)
}

pub async fn import_sessions(
    pool: &PgPool,
    csv_path: &std::path::Path,
) -> anyhow::Result<(usize, usize)> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let sessions = import::read_intervals(file)?;
    let mut inserted = 0usize;
    let mut skipped = 0usize;

    for imported in sessions {
        let schedule_id = upsert_schedule(pool, &imported).await?;
        let session = tally::build_session(
            schedule_id,
            imported.session_number,
            &imported.observer,
            &imported.intervals,
        );
        if insert_session(pool, &session).await? {
            inserted += 1;
        } else {
            skipped += 1;
        }
    }

    Ok((inserted, skipped))
}

pub async fn fetch_sessions(
    pool: &PgPool,
    schedule_id: Uuid,
) -> anyhow::Result<Vec<ObservationSession>> {
    let records = sqlx::query(
        r#"
        SELECT session_number, observer, tally, total_intervals, comments
        FROM copus_observation.observation_sessions
        WHERE schedule_id = $1
        ORDER BY session_number
        "#,
    )
    .bind(schedule_id)
    .fetch_all(pool)
    .await?;

    let mut sessions = Vec::new();
    for row in records {
        let number: i16 = row.get("session_number");
        let Json(mut tally): Json<TallySet> = row.get("tally");
        let total_intervals: i32 = row.get("total_intervals");
        tally.total_intervals = u32::try_from(total_intervals)
            .context("negative interval total stored for session")?;

        sessions.push(ObservationSession {
            schedule_id,
            session_number: SessionNumber::try_from(number as i64)?,
            observer: row.get("observer"),
            tally,
            comments: row.get("comments"),
        });
    }

    Ok(sessions)
}

pub async fn fetch_schedule_ids(pool: &PgPool) -> anyhow::Result<Vec<Uuid>> {
    let records = sqlx::query(
        r#"
        SELECT DISTINCT schedule_id
        FROM copus_observation.observation_sessions
        ORDER BY schedule_id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(records.iter().map(|row| row.get("schedule_id")).collect())
}

pub async fn fetch_schedule_label(pool: &PgPool, schedule_id: Uuid) -> anyhow::Result<Option<String>> {
    let row = sqlx::query(
        r#"
        SELECT f.full_name, s.name AS subject, sc.semester, sc.year, sc.observed_on
        FROM copus_observation.schedules sc
        JOIN copus_observation.faculty f ON f.id = sc.faculty_id
        JOIN copus_observation.subjects s ON s.id = sc.subject_id
        WHERE sc.id = $1
        "#,
    )
    .bind(schedule_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| {
        let name: String = row.get("full_name");
        let subject: String = row.get("subject");
        let semester: String = row.get("semester");
        let year: String = row.get("year");
        let observed_on: NaiveDate = row.get("observed_on");
        format!("{name}, {subject} ({semester} {year}, observed {observed_on})")
    }))
}

pub async fn store_result(
    pool: &PgPool,
    result: &AggregatedResult,
    metrics: &ResultMetrics,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO copus_observation.copus_results
        (schedule_id, session_count, total_intervals, high_percentage, med_percentage,
         low_percentage, student_action_percentage, teacher_action_percentage,
         overall_percentage, computed_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now())
        ON CONFLICT (schedule_id) DO UPDATE
        SET session_count = EXCLUDED.session_count,
            total_intervals = EXCLUDED.total_intervals,
            high_percentage = EXCLUDED.high_percentage,
            med_percentage = EXCLUDED.med_percentage,
            low_percentage = EXCLUDED.low_percentage,
            student_action_percentage = EXCLUDED.student_action_percentage,
            teacher_action_percentage = EXCLUDED.teacher_action_percentage,
            overall_percentage = EXCLUDED.overall_percentage,
            computed_at = EXCLUDED.computed_at
        "#,
    )
    .bind(result.schedule_id)
    .bind(i32::try_from(result.session_count).context("session count out of range")?)
    .bind(i32::try_from(metrics.total_intervals).context("interval total out of range")?)
    .bind(metrics.engagement.high)
    .bind(metrics.engagement.med)
    .bind(metrics.engagement.low)
    .bind(metrics.student_action_percentage)
    .bind(metrics.teacher_action_percentage)
    .bind(metrics.overall_percentage)
    .execute(pool)
    .await?;

    tracing::debug!(schedule_id = %result.schedule_id, "stored combined result");
    Ok(())
}

pub async fn fetch_score_rows(
    pool: &PgPool,
    semester: Option<&str>,
    year: Option<&str>,
) -> anyhow::Result<Vec<ScoreRow>> {
    let mut query = String::from(
        "SELECT f.id AS faculty_id, f.full_name, s.name AS subject, sc.semester, sc.year, \
         r.student_action_percentage, r.teacher_action_percentage, r.overall_percentage \
         FROM copus_observation.copus_results r \
         JOIN copus_observation.schedules sc ON sc.id = r.schedule_id \
         JOIN copus_observation.faculty f ON f.id = sc.faculty_id \
         JOIN copus_observation.subjects s ON s.id = sc.subject_id \
         WHERE TRUE",
    );

    let mut position = 0;
    if semester.is_some() {
        position += 1;
        query.push_str(&format!(" AND sc.semester = ${position}"));
    }
    if year.is_some() {
        position += 1;
        query.push_str(&format!(" AND sc.year = ${position}"));
    }
    query.push_str(" ORDER BY sc.year, sc.semester, f.full_name, s.name");

    let mut rows = sqlx::query(&query);
    if let Some(value) = semester {
        rows = rows.bind(value);
    }
    if let Some(value) = year {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut scores = Vec::new();

    for row in records {
        scores.push(ScoreRow {
            faculty_id: Some(row.get("faculty_id")),
            faculty_name: row.get("full_name"),
            subject: row.get("subject"),
            student_action_percentage: row.get("student_action_percentage"),
            teacher_action_percentage: row.get("teacher_action_percentage"),
            overall_percentage: row.get("overall_percentage"),
            semester: row.get("semester"),
            year: row.get("year"),
        });
    }

    Ok(scores)
}
