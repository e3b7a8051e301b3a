use std::fmt::Write;

use serde::Serialize;

use crate::attendance::{self, round2};
use crate::models::{AttendanceRecord, Guidance, Semester, Subject, SubjectSummary};

pub fn summarize_all(
    subjects: &[(Subject, Vec<AttendanceRecord>)],
    target: f64,
) -> (Vec<SubjectSummary>, f64) {
    let summaries = subjects
        .iter()
        .map(|(subject, records)| attendance::summarize_subject(subject, records, target))
        .collect();
    let aggregate = attendance::aggregate_percentage(subjects.iter().map(|(_, records)| records.as_slice()));
    (summaries, round2(aggregate))
}

pub fn describe_guidance(guidance: &Guidance, target: f64) -> String {
    if guidance.lectures_to_attend > 0 {
        format!(
            "attend the next {} lectures to reach {:.0}%",
            guidance.lectures_to_attend, target
        )
    } else if guidance.lectures_can_miss > 0 {
        format!(
            "can miss {} lectures and stay at {:.0}%",
            guidance.lectures_can_miss, target
        )
    } else if target <= 0.0 {
        format!("at or above {:.0}%", target)
    } else if guidance.current_percentage >= target {
        format!("on the edge of {:.0}%, attend the next lecture", target)
    } else {
        format!("below {:.0}%", target)
    }
}

pub fn render_dashboard(
    semester: &Semester,
    summaries: &[SubjectSummary],
    aggregate: f64,
    target: f64,
) -> String {
    let mut output = String::new();

    let _ = writeln!(
        output,
        "{} ({} to {})",
        semester.name, semester.start_date, semester.end_date
    );
    let _ = writeln!(output, "Overall attendance: {:.2}%", aggregate);
    let _ = writeln!(output);

    if summaries.is_empty() {
        let _ = writeln!(output, "No subjects in this semester yet.");
        return output;
    }

    for summary in summaries {
        let _ = writeln!(
            output,
            "- {} {}: {:.2}% ({}/{}), {}",
            summary.subject.code,
            summary.subject.name,
            summary.percentage,
            summary.attended,
            summary.total,
            describe_guidance(&summary.guidance, target)
        );
    }

    output
}

pub fn build_report(
    semester: &Semester,
    target: f64,
    subjects: &[(Subject, Vec<AttendanceRecord>)],
) -> String {
    let (summaries, aggregate) = summarize_all(subjects, target);

    let mut output = String::new();

    let _ = writeln!(output, "# Attendance Report");
    let _ = writeln!(
        output,
        "Generated for {} ({} to {}), target {:.0}%",
        semester.name, semester.start_date, semester.end_date, target
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "Aggregate attendance: {:.2}%", aggregate);

    if subjects.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "No subjects recorded for this semester.");
        return output;
    }

    for (summary, (_, records)) in summaries.iter().zip(subjects) {
        let _ = writeln!(output);
        let _ = writeln!(output, "## {} {}", summary.subject.code, summary.subject.name);
        let _ = writeln!(
            output,
            "- Attended {} of {} lectures ({:.2}%)",
            summary.attended, summary.total, summary.percentage
        );
        let _ = writeln!(
            output,
            "- Credits {}, planned lectures {}",
            summary.subject.credits, summary.subject.total_lectures
        );
        let _ = writeln!(output, "- Guidance: {}", describe_guidance(&summary.guidance, target));

        if records.is_empty() {
            let _ = writeln!(output, "- No attendance recorded yet.");
            continue;
        }

        let mut ordered: Vec<&AttendanceRecord> = records.iter().collect();
        ordered.sort_by(|a, b| b.date.cmp(&a.date));
        let _ = writeln!(output);
        let _ = writeln!(output, "| Date | Status | Notes |");
        let _ = writeln!(output, "|------|--------|-------|");
        for record in ordered {
            let _ = writeln!(
                output,
                "| {} | {} | {} |",
                record.date,
                if record.attended { "present" } else { "absent" },
                record.notes.as_deref().unwrap_or("")
            );
        }
    }

    output
}

#[derive(Debug, Serialize)]
pub struct SubjectExport {
    pub subject_name: String,
    pub subject_code: String,
    pub attendance_percentage: f64,
}

/// Chart feed for the active semester.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AttendanceExport {
    Data {
        subjects: Vec<SubjectExport>,
        aggregate_attendance: f64,
    },
    Error {
        error: String,
    },
}

pub fn attendance_export(summaries: &[SubjectSummary], aggregate: f64) -> AttendanceExport {
    AttendanceExport::Data {
        subjects: summaries
            .iter()
            .map(|summary| SubjectExport {
                subject_name: summary.subject.name.clone(),
                subject_code: summary.subject.code.clone(),
                attendance_percentage: summary.percentage,
            })
            .collect(),
        aggregate_attendance: round2(aggregate),
    }
}

pub fn no_active_semester_export() -> AttendanceExport {
    AttendanceExport::Error {
        error: "No active semester".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, Utc};
    use uuid::Uuid;

    fn semester() -> Semester {
        Semester {
            id: Uuid::new_v4(),
            name: "Spring 2026".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 1, 12).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 5, 8).unwrap(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn subject_with(code: &str, name: &str, pattern: &[bool]) -> (Subject, Vec<AttendanceRecord>) {
        let subject = Subject {
            id: Uuid::new_v4(),
            semester_id: Uuid::new_v4(),
            name: name.to_string(),
            code: code.to_string(),
            credits: 3,
            total_lectures: 40,
            created_at: Utc::now(),
        };
        let first = NaiveDate::from_ymd_opt(2026, 2, 2).unwrap();
        let records = pattern
            .iter()
            .enumerate()
            .map(|(offset, attended)| AttendanceRecord {
                id: Uuid::new_v4(),
                subject_id: subject.id,
                date: first + Duration::days(offset as i64),
                attended: *attended,
                notes: (!attended).then(|| "overslept".to_string()),
                created_at: Utc::now(),
            })
            .collect();
        (subject, records)
    }

    #[test]
    fn summaries_use_weighted_aggregate() {
        let subjects = vec![
            subject_with("CS201", "Data Structures", &[true]),
            subject_with("MA202", "Linear Algebra", &[false; 9]),
        ];
        let (summaries, aggregate) = summarize_all(&subjects, 75.0);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].percentage, 100.0);
        assert_eq!(summaries[1].percentage, 0.0);
        assert_eq!(aggregate, 10.0);
    }

    #[test]
    fn guidance_text_follows_branch() {
        let below = Guidance {
            lectures_to_attend: 4,
            lectures_can_miss: 0,
            current_percentage: 50.0,
        };
        assert_eq!(describe_guidance(&below, 75.0), "attend the next 4 lectures to reach 75%");

        let above = Guidance {
            lectures_to_attend: 0,
            lectures_can_miss: 3,
            current_percentage: 100.0,
        };
        assert_eq!(describe_guidance(&above, 75.0), "can miss 3 lectures and stay at 75%");

        let edge = Guidance {
            lectures_to_attend: 0,
            lectures_can_miss: 0,
            current_percentage: 75.0,
        };
        assert!(describe_guidance(&edge, 75.0).starts_with("on the edge"));
    }

    #[test]
    fn zero_target_never_asks_for_the_next_lecture() {
        let subjects = vec![subject_with("PH101", "Physics I", &[false, false, true])];
        let (summaries, _) = summarize_all(&subjects, 0.0);
        assert_eq!(describe_guidance(&summaries[0].guidance, 0.0), "at or above 0%");
    }

    #[test]
    fn dashboard_lists_each_subject() {
        let subjects = vec![
            subject_with("CS201", "Data Structures", &[true, true, false, false]),
            subject_with("PH101", "Physics I", &[true; 10]),
        ];
        let (summaries, aggregate) = summarize_all(&subjects, 75.0);
        let output = render_dashboard(&semester(), &summaries, aggregate, 75.0);

        assert!(output.contains("Overall attendance: 85.71%"));
        assert!(output.contains("- CS201 Data Structures: 50.00% (2/4), attend the next 4 lectures"));
        assert!(output.contains("- PH101 Physics I: 100.00% (10/10), can miss 3 lectures"));
    }

    #[test]
    fn dashboard_without_subjects_says_so() {
        let output = render_dashboard(&semester(), &[], 0.0, 75.0);
        assert!(output.contains("No subjects in this semester yet."));
    }

    #[test]
    fn report_lists_records_newest_first() {
        let subjects = vec![subject_with("CS201", "Data Structures", &[true, false, true])];
        let report = build_report(&semester(), 75.0, &subjects);

        assert!(report.starts_with("# Attendance Report"));
        assert!(report.contains("## CS201 Data Structures"));
        assert!(report.contains("- Attended 2 of 3 lectures (66.67%)"));

        let newest = report.find("| 2026-02-04 | present |").unwrap();
        let middle = report.find("| 2026-02-03 | absent | overslept |").unwrap();
        let oldest = report.find("| 2026-02-02 | present |").unwrap();
        assert!(newest < middle && middle < oldest);
    }

    #[test]
    fn report_notes_subjects_without_records() {
        let subjects = vec![subject_with("MA202", "Linear Algebra", &[])];
        let report = build_report(&semester(), 75.0, &subjects);
        assert!(report.contains("- No attendance recorded yet."));
        assert!(report.contains("Aggregate attendance: 0.00%"));
    }

    #[test]
    fn export_uses_chart_field_names() {
        let subjects = vec![subject_with("CS201", "Data Structures", &[true, false, true])];
        let (summaries, aggregate) = summarize_all(&subjects, 75.0);
        let value = serde_json::to_value(attendance_export(&summaries, aggregate)).unwrap();

        assert_eq!(value["aggregate_attendance"], 66.67);
        assert_eq!(value["subjects"][0]["subject_code"], "CS201");
        assert_eq!(value["subjects"][0]["subject_name"], "Data Structures");
        assert_eq!(value["subjects"][0]["attendance_percentage"], 66.67);
    }

    #[test]
    fn export_without_semester_reports_error() {
        let value = serde_json::to_value(no_active_semester_export()).unwrap();
        assert_eq!(value, serde_json::json!({ "error": "No active semester" }));
    }
}
