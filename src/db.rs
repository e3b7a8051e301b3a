use anyhow::Context;
use chrono::{Duration, NaiveDate, NaiveTime};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};
use uuid::Uuid;

use crate::error::TrackerError;
use crate::models::{
    AttendanceEntry, AttendanceRecord, NewSemester, NewSlot, NewSubject, ScheduledSlot, Semester,
    Subject, SubjectChanges, TimetableSlot,
};
use crate::timetable;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn semester_from_row(row: &PgRow) -> Semester {
    Semester {
        id: row.get("id"),
        name: row.get("name"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
    }
}

fn subject_from_row(row: &PgRow) -> Subject {
    Subject {
        id: row.get("id"),
        semester_id: row.get("semester_id"),
        name: row.get("name"),
        code: row.get("code"),
        credits: row.get("credits"),
        total_lectures: row.get("total_lectures"),
        created_at: row.get("created_at"),
    }
}

fn slot_from_row(row: &PgRow) -> TimetableSlot {
    TimetableSlot {
        id: row.get("id"),
        subject_id: row.get("subject_id"),
        day_of_week: row.get("day_of_week"),
        start_time: row.get("start_time"),
        end_time: row.get("end_time"),
        room: row.get("room"),
    }
}

fn record_from_row(row: &PgRow) -> AttendanceRecord {
    AttendanceRecord {
        id: row.get("id"),
        subject_id: row.get("subject_id"),
        date: row.get("date"),
        attended: row.get("attended"),
        notes: row.get("notes"),
        created_at: row.get("created_at"),
    }
}

pub async fn list_semesters(pool: &PgPool) -> anyhow::Result<Vec<Semester>> {
    let rows = sqlx::query(
        "SELECT id, name, start_date, end_date, is_active, created_at \
         FROM attendance_tracker.semesters \
         ORDER BY start_date DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(semester_from_row).collect())
}

pub async fn active_semester(pool: &PgPool) -> anyhow::Result<Option<Semester>> {
    let row = sqlx::query(
        "SELECT id, name, start_date, end_date, is_active, created_at \
         FROM attendance_tracker.semesters \
         WHERE is_active \
         ORDER BY start_date DESC \
         LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(semester_from_row))
}

pub async fn require_active_semester(pool: &PgPool) -> anyhow::Result<Semester> {
    match active_semester(pool).await? {
        Some(semester) => Ok(semester),
        None => {
            tracing::warn!("no active semester");
            Err(TrackerError::NoActiveSemester.into())
        }
    }
}

pub async fn create_semester(pool: &PgPool, new: &NewSemester) -> anyhow::Result<Semester> {
    if new.end_date < new.start_date {
        return Err(TrackerError::Validation(format!(
            "semester ends ({}) before it starts ({})",
            new.end_date, new.start_date
        ))
        .into());
    }

    let mut tx = pool.begin().await?;

    if new.is_active {
        sqlx::query("UPDATE attendance_tracker.semesters SET is_active = FALSE")
            .execute(&mut *tx)
            .await?;
    }

    let row = sqlx::query(
        r#"
        INSERT INTO attendance_tracker.semesters (id, name, start_date, end_date, is_active)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, name, start_date, end_date, is_active, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&new.name)
    .bind(new.start_date)
    .bind(new.end_date)
    .bind(new.is_active)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    let semester = semester_from_row(&row);
    tracing::info!(semester_id = %semester.id, active = semester.is_active, "semester created");
    Ok(semester)
}

/// Makes `semester_id` the only active semester.
pub async fn activate_semester(pool: &PgPool, semester_id: Uuid) -> anyhow::Result<Semester> {
    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE attendance_tracker.semesters SET is_active = FALSE")
        .execute(&mut *tx)
        .await?;

    let row = sqlx::query(
        r#"
        UPDATE attendance_tracker.semesters
        SET is_active = TRUE
        WHERE id = $1
        RETURNING id, name, start_date, end_date, is_active, created_at
        "#,
    )
    .bind(semester_id)
    .fetch_optional(&mut *tx)
    .await?;

    // Dropping the transaction rolls back the deactivation.
    let row = row.ok_or(TrackerError::NotFound {
        entity: "semester",
        id: semester_id,
    })?;

    tx.commit().await?;

    let semester = semester_from_row(&row);
    tracing::info!(semester_id = %semester.id, "semester activated");
    Ok(semester)
}

pub async fn list_subjects(pool: &PgPool, semester_id: Uuid) -> anyhow::Result<Vec<Subject>> {
    let rows = sqlx::query(
        "SELECT id, semester_id, name, code, credits, total_lectures, created_at \
         FROM attendance_tracker.subjects \
         WHERE semester_id = $1 \
         ORDER BY code, name",
    )
    .bind(semester_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(subject_from_row).collect())
}

pub async fn get_subject(pool: &PgPool, subject_id: Uuid) -> anyhow::Result<Subject> {
    let row = sqlx::query(
        "SELECT id, semester_id, name, code, credits, total_lectures, created_at \
         FROM attendance_tracker.subjects \
         WHERE id = $1",
    )
    .bind(subject_id)
    .fetch_optional(pool)
    .await?
    .ok_or(TrackerError::NotFound {
        entity: "subject",
        id: subject_id,
    })?;

    Ok(subject_from_row(&row))
}

fn validate_subject_numbers(credits: i32, total_lectures: i32) -> Result<(), TrackerError> {
    if credits < 0 || total_lectures < 0 {
        return Err(TrackerError::Validation(
            "credits and total lectures must not be negative".to_string(),
        ));
    }
    Ok(())
}

pub async fn create_subject(
    pool: &PgPool,
    semester_id: Uuid,
    new: &NewSubject,
) -> anyhow::Result<Subject> {
    validate_subject_numbers(new.credits, new.total_lectures)?;

    let row = sqlx::query(
        r#"
        INSERT INTO attendance_tracker.subjects
        (id, semester_id, name, code, credits, total_lectures)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, semester_id, name, code, credits, total_lectures, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(semester_id)
    .bind(&new.name)
    .bind(&new.code)
    .bind(new.credits)
    .bind(new.total_lectures)
    .fetch_one(pool)
    .await?;

    let subject = subject_from_row(&row);
    tracing::info!(subject_id = %subject.id, code = %subject.code, "subject created");
    Ok(subject)
}

pub async fn update_subject(
    pool: &PgPool,
    subject_id: Uuid,
    changes: &SubjectChanges,
) -> anyhow::Result<Subject> {
    let current = get_subject(pool, subject_id).await?;
    let credits = changes.credits.unwrap_or(current.credits);
    let total_lectures = changes.total_lectures.unwrap_or(current.total_lectures);
    validate_subject_numbers(credits, total_lectures)?;

    let row = sqlx::query(
        r#"
        UPDATE attendance_tracker.subjects
        SET name = $2, code = $3, credits = $4, total_lectures = $5
        WHERE id = $1
        RETURNING id, semester_id, name, code, credits, total_lectures, created_at
        "#,
    )
    .bind(subject_id)
    .bind(changes.name.as_deref().unwrap_or(&current.name))
    .bind(changes.code.as_deref().unwrap_or(&current.code))
    .bind(credits)
    .bind(total_lectures)
    .fetch_one(pool)
    .await?;

    tracing::info!(subject_id = %subject_id, "subject updated");
    Ok(subject_from_row(&row))
}

/// Removes the subject along with its timetable slots and attendance records.
pub async fn delete_subject(pool: &PgPool, subject_id: Uuid) -> anyhow::Result<()> {
    let result = sqlx::query("DELETE FROM attendance_tracker.subjects WHERE id = $1")
        .bind(subject_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(TrackerError::NotFound {
            entity: "subject",
            id: subject_id,
        }
        .into());
    }

    tracing::info!(subject_id = %subject_id, "subject deleted");
    Ok(())
}

pub async fn list_slots(pool: &PgPool, semester_id: Uuid) -> anyhow::Result<Vec<ScheduledSlot>> {
    let rows = sqlx::query(
        "SELECT t.id, t.subject_id, t.day_of_week, t.start_time, t.end_time, t.room, \
         s.code, s.name \
         FROM attendance_tracker.timetable_slots t \
         JOIN attendance_tracker.subjects s ON s.id = t.subject_id \
         WHERE s.semester_id = $1 \
         ORDER BY t.day_of_week, t.start_time",
    )
    .bind(semester_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| ScheduledSlot {
            slot: slot_from_row(row),
            subject_code: row.get("code"),
            subject_name: row.get("name"),
        })
        .collect())
}

pub async fn create_slot(pool: &PgPool, new: &NewSlot) -> anyhow::Result<TimetableSlot> {
    timetable::validate_slot(new.day_of_week, new.start_time, new.end_time)?;
    // Surfaces a NotFound instead of a foreign key violation.
    get_subject(pool, new.subject_id).await?;

    let row = sqlx::query(
        r#"
        INSERT INTO attendance_tracker.timetable_slots
        (id, subject_id, day_of_week, start_time, end_time, room)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, subject_id, day_of_week, start_time, end_time, room
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.subject_id)
    .bind(new.day_of_week)
    .bind(new.start_time)
    .bind(new.end_time)
    .bind(new.room.as_deref())
    .fetch_one(pool)
    .await?;

    let slot = slot_from_row(&row);
    tracing::info!(slot_id = %slot.id, subject_id = %slot.subject_id, "timetable slot created");
    Ok(slot)
}

pub async fn delete_slot(pool: &PgPool, slot_id: Uuid) -> anyhow::Result<()> {
    let result = sqlx::query("DELETE FROM attendance_tracker.timetable_slots WHERE id = $1")
        .bind(slot_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(TrackerError::NotFound {
            entity: "timetable slot",
            id: slot_id,
        }
        .into());
    }

    tracing::info!(slot_id = %slot_id, "timetable slot deleted");
    Ok(())
}

/// All records for one subject, newest date first.
pub async fn records_for_subject(
    pool: &PgPool,
    subject_id: Uuid,
) -> anyhow::Result<Vec<AttendanceRecord>> {
    let rows = sqlx::query(
        "SELECT id, subject_id, date, attended, notes, created_at \
         FROM attendance_tracker.attendance_records \
         WHERE subject_id = $1 \
         ORDER BY date DESC",
    )
    .bind(subject_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(record_from_row).collect())
}

/// Every subject of a semester paired with its records.
pub async fn records_by_subject(
    pool: &PgPool,
    semester_id: Uuid,
) -> anyhow::Result<Vec<(Subject, Vec<AttendanceRecord>)>> {
    let subjects = list_subjects(pool, semester_id).await?;
    let mut grouped = Vec::with_capacity(subjects.len());

    for subject in subjects {
        let records = records_for_subject(pool, subject.id).await?;
        grouped.push((subject, records));
    }

    tracing::debug!(semester_id = %semester_id, subjects = grouped.len(), "loaded attendance");
    Ok(grouped)
}

/// Records already stored for `date`, one per subject at most.
pub async fn records_on(
    pool: &PgPool,
    semester_id: Uuid,
    date: NaiveDate,
) -> anyhow::Result<Vec<AttendanceRecord>> {
    let rows = sqlx::query(
        "SELECT r.id, r.subject_id, r.date, r.attended, r.notes, r.created_at \
         FROM attendance_tracker.attendance_records r \
         JOIN attendance_tracker.subjects s ON s.id = r.subject_id \
         WHERE s.semester_id = $1 AND r.date = $2",
    )
    .bind(semester_id)
    .bind(date)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(record_from_row).collect())
}

const UPSERT_ATTENDANCE: &str = r#"
    INSERT INTO attendance_tracker.attendance_records
    (id, subject_id, date, attended, notes)
    VALUES ($1, $2, $3, $4, $5)
    ON CONFLICT (subject_id, date) DO UPDATE
    SET attended = EXCLUDED.attended, notes = EXCLUDED.notes
"#;

/// Writes the record for (`subject_id`, `date`), replacing an existing one.
pub async fn upsert_attendance(
    conn: &mut PgConnection,
    subject_id: Uuid,
    date: NaiveDate,
    attended: bool,
    notes: Option<&str>,
) -> anyhow::Result<()> {
    sqlx::query(UPSERT_ATTENDANCE)
        .bind(Uuid::new_v4())
        .bind(subject_id)
        .bind(date)
        .bind(attended)
        .bind(notes)
        .execute(conn)
        .await?;
    Ok(())
}

/// Stores the daily form for `date`: one record per entry, replacing any
/// record the subject already has on that day.
pub async fn save_attendance(
    pool: &PgPool,
    date: NaiveDate,
    entries: &[AttendanceEntry],
) -> anyhow::Result<usize> {
    let mut tx = pool.begin().await?;

    for entry in entries {
        upsert_attendance(
            &mut *tx,
            entry.subject_id,
            date,
            entry.attended,
            entry.notes.as_deref(),
        )
        .await?;
    }

    tx.commit().await?;

    tracing::info!(%date, subjects = entries.len(), "attendance saved");
    Ok(entries.len())
}

/// Imports every row or none: the rows are written in one transaction that
/// only commits once the whole file has been read and matched.
pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        subject_code: String,
        date: NaiveDate,
        attended: bool,
        notes: Option<String>,
    }

    let semester = require_active_semester(pool).await?;
    let subjects = list_subjects(pool, semester.id).await?;

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut tx = pool.begin().await?;
    let mut written = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid CSV row {}", line + 1))?;
        let subject = subjects
            .iter()
            .find(|subject| subject.code.eq_ignore_ascii_case(row.subject_code.trim()))
            .ok_or_else(|| {
                TrackerError::Validation(format!(
                    "unknown subject code {} in semester {}",
                    row.subject_code, semester.name
                ))
            })?;

        let notes = row.notes.filter(|value| !value.trim().is_empty());
        upsert_attendance(&mut *tx, subject.id, row.date, row.attended, notes.as_deref()).await?;
        written += 1;
    }

    tx.commit().await?;

    tracing::info!(path = %csv_path.display(), rows = written, "attendance imported");
    Ok(written)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let semester_id = Uuid::parse_str("6b1f3c52-8f0e-4c1a-9a43-2f2d7f0c1e01")?;
    let start = NaiveDate::from_ymd_opt(2026, 1, 12).context("invalid date")?;
    let end = NaiveDate::from_ymd_opt(2026, 5, 8).context("invalid date")?;

    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE attendance_tracker.semesters SET is_active = FALSE WHERE id <> $1")
        .bind(semester_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO attendance_tracker.semesters (id, name, start_date, end_date, is_active)
        VALUES ($1, $2, $3, $4, TRUE)
        ON CONFLICT (id) DO UPDATE
        SET name = EXCLUDED.name, start_date = EXCLUDED.start_date,
            end_date = EXCLUDED.end_date, is_active = TRUE
        "#,
    )
    .bind(semester_id)
    .bind("Spring 2026")
    .bind(start)
    .bind(end)
    .execute(&mut *tx)
    .await?;

    let subjects = vec![
        (
            Uuid::parse_str("a3c1e0d4-5b7f-4e21-8d3a-0f6b2c9e7a11")?,
            "Data Structures",
            "CS201",
            4,
            48,
        ),
        (
            Uuid::parse_str("b7d2f1e5-6c80-4f32-9e4b-1a7c3d0f8b22")?,
            "Linear Algebra",
            "MA202",
            3,
            42,
        ),
        (
            Uuid::parse_str("c9e3a2f6-7d91-4a43-af5c-2b8d4e1a9c33")?,
            "Physics I",
            "PH101",
            3,
            36,
        ),
    ];

    for (id, name, code, credits, total_lectures) in &subjects {
        sqlx::query(
            r#"
            INSERT INTO attendance_tracker.subjects
            (id, semester_id, name, code, credits, total_lectures)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name, code = EXCLUDED.code,
                credits = EXCLUDED.credits, total_lectures = EXCLUDED.total_lectures
            "#,
        )
        .bind(id)
        .bind(semester_id)
        .bind(name)
        .bind(code)
        .bind(credits)
        .bind(total_lectures)
        .execute(&mut *tx)
        .await?;
    }

    // (subject index, day of week, start, end, room)
    let slots = vec![
        (0usize, 0i16, (9, 0), (10, 30), "CS-Lab 2"),
        (0, 3, (9, 0), (10, 30), "CS-Lab 2"),
        (1, 1, (11, 0), (12, 0), "Room 114"),
        (1, 4, (11, 0), (12, 0), "Room 114"),
        (2, 2, (14, 0), (15, 30), "Hall B"),
    ];

    for (index, (subject, day, (start_h, start_m), (end_h, end_m), room)) in
        slots.into_iter().enumerate()
    {
        let start_time = NaiveTime::from_hms_opt(start_h, start_m, 0).context("invalid time")?;
        let end_time = NaiveTime::from_hms_opt(end_h, end_m, 0).context("invalid time")?;
        let slot_id = Uuid::from_u128(0x5eed_0000_0000_4000_8000_0000_0000_0000 + index as u128);

        sqlx::query(
            r#"
            INSERT INTO attendance_tracker.timetable_slots
            (id, subject_id, day_of_week, start_time, end_time, room)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(slot_id)
        .bind(subjects[subject].0)
        .bind(day)
        .bind(start_time)
        .bind(end_time)
        .bind(room)
        .execute(&mut *tx)
        .await?;
    }

    // Two weeks of lectures; every third CS201 session and every other
    // PH101 session missed.
    let first_day = NaiveDate::from_ymd_opt(2026, 2, 2).context("invalid date")?;
    for offset in 0..14 {
        let date = first_day + Duration::days(offset);
        for (index, (subject_id, _, code, _, _)) in subjects.iter().enumerate() {
            let attended = match index {
                0 => offset % 3 != 2,
                1 => true,
                _ => offset % 2 == 0,
            };
            let notes = (!attended).then(|| format!("Missed {code}"));

            upsert_attendance(&mut *tx, *subject_id, date, attended, notes.as_deref()).await?;
        }
    }

    tx.commit().await?;

    tracing::info!(semester_id = %semester_id, "seed data written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, day).unwrap()
    }

    async fn semester(pool: &PgPool, name: &str, active: bool) -> Semester {
        create_semester(
            pool,
            &NewSemester {
                name: name.to_string(),
                start_date: NaiveDate::from_ymd_opt(2026, 1, 12).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2026, 5, 8).unwrap(),
                is_active: active,
            },
        )
        .await
        .unwrap()
    }

    async fn subject(pool: &PgPool, semester_id: Uuid, code: &str) -> Subject {
        create_subject(
            pool,
            semester_id,
            &NewSubject {
                name: format!("{code} lecture"),
                code: code.to_string(),
                credits: 3,
                total_lectures: 60,
            },
        )
        .await
        .unwrap()
    }

    async fn active_ids(pool: &PgPool) -> Vec<Uuid> {
        list_semesters(pool)
            .await
            .unwrap()
            .into_iter()
            .filter(|semester| semester.is_active)
            .map(|semester| semester.id)
            .collect()
    }

    fn write_csv(contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("attendance-{}.csv", Uuid::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn second_upsert_replaces_the_days_record(pool: PgPool) {
        let spring = semester(&pool, "Spring 2026", true).await;
        let cs = subject(&pool, spring.id, "CS201").await;

        let mut conn = pool.acquire().await.unwrap();
        upsert_attendance(&mut conn, cs.id, date(2), true, None).await.unwrap();
        upsert_attendance(&mut conn, cs.id, date(2), false, Some("sick")).await.unwrap();
        drop(conn);

        let records = records_for_subject(&pool, cs.id).await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(!records[0].attended);
        assert_eq!(records[0].notes.as_deref(), Some("sick"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn saving_a_day_twice_keeps_one_record_per_subject(pool: PgPool) {
        let spring = semester(&pool, "Spring 2026", true).await;
        let cs = subject(&pool, spring.id, "CS201").await;
        let ma = subject(&pool, spring.id, "MA202").await;

        let first = vec![
            AttendanceEntry { subject_id: cs.id, attended: true, notes: None },
            AttendanceEntry { subject_id: ma.id, attended: false, notes: None },
        ];
        save_attendance(&pool, date(3), &first).await.unwrap();

        let second = vec![
            AttendanceEntry { subject_id: cs.id, attended: false, notes: Some("bus strike".to_string()) },
            AttendanceEntry { subject_id: ma.id, attended: true, notes: None },
        ];
        assert_eq!(save_attendance(&pool, date(3), &second).await.unwrap(), 2);

        let records = records_on(&pool, spring.id, date(3)).await.unwrap();
        assert_eq!(records.len(), 2);
        let cs_record = records.iter().find(|record| record.subject_id == cs.id).unwrap();
        assert!(!cs_record.attended);
        assert_eq!(cs_record.notes.as_deref(), Some("bus strike"));
        let ma_record = records.iter().find(|record| record.subject_id == ma.id).unwrap();
        assert!(ma_record.attended);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn only_one_semester_stays_active(pool: PgPool) {
        let fall = semester(&pool, "Fall 2025", true).await;
        let spring = semester(&pool, "Spring 2026", true).await;
        assert_eq!(active_ids(&pool).await, vec![spring.id]);

        let summer = semester(&pool, "Summer 2026", false).await;
        assert_eq!(active_ids(&pool).await, vec![spring.id]);

        activate_semester(&pool, fall.id).await.unwrap();
        assert_eq!(active_ids(&pool).await, vec![fall.id]);

        let activated = activate_semester(&pool, summer.id).await.unwrap();
        assert!(activated.is_active);
        assert_eq!(active_ids(&pool).await, vec![summer.id]);
        assert_eq!(active_semester(&pool).await.unwrap().unwrap().id, summer.id);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn activating_unknown_semester_keeps_current_one(pool: PgPool) {
        let spring = semester(&pool, "Spring 2026", true).await;
        let missing = Uuid::new_v4();

        let err = activate_semester(&pool, missing).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TrackerError>(),
            Some(TrackerError::NotFound { entity: "semester", id }) if *id == missing
        ));
        assert_eq!(active_ids(&pool).await, vec![spring.id]);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn import_writes_nothing_when_a_row_is_rejected(pool: PgPool) {
        let spring = semester(&pool, "Spring 2026", true).await;
        let cs = subject(&pool, spring.id, "CS201").await;

        let path = write_csv(
            "subject_code,date,attended,notes\n\
             CS201,2026-02-02,true,\n\
             XX999,2026-02-02,false,unknown\n",
        );
        let result = import_csv(&pool, &path).await;
        std::fs::remove_file(&path).ok();

        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TrackerError>(),
            Some(TrackerError::Validation(_))
        ));
        assert!(records_for_subject(&pool, cs.id).await.unwrap().is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn import_upserts_repeated_days(pool: PgPool) {
        let spring = semester(&pool, "Spring 2026", true).await;
        let cs = subject(&pool, spring.id, "CS201").await;

        let path = write_csv(
            "subject_code,date,attended,notes\n\
             cs201,2026-02-02,true,\n\
             CS201,2026-02-02,false,left early\n\
             CS201,2026-02-03,true,\n",
        );
        let written = import_csv(&pool, &path).await;
        std::fs::remove_file(&path).ok();
        assert_eq!(written.unwrap(), 3);

        let records = records_for_subject(&pool, cs.id).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date, date(3));
        assert_eq!(records[1].date, date(2));
        assert!(!records[1].attended);
        assert_eq!(records[1].notes.as_deref(), Some("left early"));
    }
}
