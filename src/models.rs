use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Semester {
    pub id: Uuid,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Subject {
    pub id: Uuid,
    pub semester_id: Uuid,
    pub name: String,
    pub code: String,
    pub credits: i32,
    /// Planned lecture count for the semester. Informational only.
    pub total_lectures: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TimetableSlot {
    pub id: Uuid,
    pub subject_id: Uuid,
    /// 0 = Monday .. 6 = Sunday.
    pub day_of_week: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub room: Option<String>,
}

/// A timetable slot joined with the subject it belongs to.
#[derive(Debug, Clone)]
pub struct ScheduledSlot {
    pub slot: TimetableSlot,
    pub subject_code: String,
    pub subject_name: String,
}

#[derive(Debug, Clone)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub date: NaiveDate,
    pub attended: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Guidance {
    pub lectures_to_attend: u64,
    pub lectures_can_miss: u64,
    pub current_percentage: f64,
}

#[derive(Debug, Clone)]
pub struct SubjectSummary {
    pub subject: Subject,
    pub attended: u64,
    pub total: u64,
    pub percentage: f64,
    pub guidance: Guidance,
}

#[derive(Debug, Clone)]
pub struct NewSemester {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct NewSubject {
    pub name: String,
    pub code: String,
    pub credits: i32,
    pub total_lectures: i32,
}

#[derive(Debug, Clone, Default)]
pub struct SubjectChanges {
    pub name: Option<String>,
    pub code: Option<String>,
    pub credits: Option<i32>,
    pub total_lectures: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct NewSlot {
    pub subject_id: Uuid,
    pub day_of_week: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub room: Option<String>,
}

/// One subject's row of the daily attendance form.
#[derive(Debug, Clone)]
pub struct AttendanceEntry {
    pub subject_id: Uuid,
    pub attended: bool,
    pub notes: Option<String>,
}
