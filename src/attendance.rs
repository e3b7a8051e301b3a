use std::ops::Add;

use crate::models::{AttendanceRecord, Guidance, Subject, SubjectSummary};

/// Attendance percentage students are expected to hold.
pub const DEFAULT_TARGET: f64 = 75.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttendanceCounts {
    pub attended: u64,
    pub total: u64,
}

impl AttendanceCounts {
    pub fn from_records(records: &[AttendanceRecord]) -> Self {
        Self {
            attended: records.iter().filter(|record| record.attended).count() as u64,
            total: records.len() as u64,
        }
    }

    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.attended as f64 / self.total as f64 * 100.0
    }
}

impl Add for AttendanceCounts {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            attended: self.attended + other.attended,
            total: self.total + other.total,
        }
    }
}

pub fn percentage(records: &[AttendanceRecord]) -> f64 {
    AttendanceCounts::from_records(records).percentage()
}

/// Weighted attendance across subjects: summed attended over summed total,
/// so subjects with more recorded lectures pull harder than a plain mean.
pub fn aggregate_percentage<'a, I>(groups: I) -> f64
where
    I: IntoIterator<Item = &'a [AttendanceRecord]>,
{
    groups
        .into_iter()
        .map(AttendanceCounts::from_records)
        .fold(AttendanceCounts::default(), |acc, counts| acc + counts)
        .percentage()
}

pub fn guidance(records: &[AttendanceRecord], target: f64) -> Guidance {
    guidance_for(AttendanceCounts::from_records(records), target)
}

/// Lectures still to attend while below `target`, or lectures that may be
/// missed while at or above it. Only one of the two counters is ever nonzero.
///
/// The shortfall assumes every further lecture is held and attended; the
/// surplus assumes every further lecture is held and missed.
pub fn guidance_for(counts: AttendanceCounts, target: f64) -> Guidance {
    if counts.total == 0 {
        return Guidance {
            lectures_to_attend: 0,
            lectures_can_miss: 0,
            current_percentage: 0.0,
        };
    }

    let attended = counts.attended as f64;
    let total = counts.total as f64;
    let current = counts.percentage();

    let mut lectures_to_attend = 0;
    let mut lectures_can_miss = 0;

    if current < target {
        // (A + x) / (T + x) >= target / 100
        if target < 100.0 {
            lectures_to_attend = truncate((target * total - 100.0 * attended) / (100.0 - target));
        }
    } else if target > 0.0 {
        // A / (T + x) >= target / 100
        lectures_can_miss = truncate((100.0 * attended - target * total) / target);
    }

    Guidance {
        lectures_to_attend,
        lectures_can_miss,
        current_percentage: round2(current),
    }
}

pub fn summarize_subject(
    subject: &Subject,
    records: &[AttendanceRecord],
    target: f64,
) -> SubjectSummary {
    let counts = AttendanceCounts::from_records(records);
    SubjectSummary {
        subject: subject.clone(),
        attended: counts.attended,
        total: counts.total,
        percentage: round2(percentage(records)),
        guidance: guidance(records, target),
    }
}

/// Two-decimal rounding with ties to even, so 3.125 shows as 3.12.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

fn truncate(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.trunc() as u64
    } else {
        0
    }
}
