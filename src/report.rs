//! Attendance reporting projections.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Rounded percentage of present students; 0 for an empty roster.
pub fn attendance_rate(present: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (100.0 * present as f64 / total as f64).round() as u32
}

/// One class-day attendance figure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyClassAttendance {
    pub class_name: String,
    pub date: NaiveDate,
    pub present: usize,
    pub total: usize,
}

impl DailyClassAttendance {
    pub fn new(class_name: impl Into<String>, date: NaiveDate, present: usize, total: usize) -> Self {
        Self {
            class_name: class_name.into(),
            date,
            present,
            total,
        }
    }

    pub fn absent(&self) -> usize {
        self.total.saturating_sub(self.present)
    }

    pub fn rate(&self) -> u32 {
        attendance_rate(self.present, self.total)
    }
}

/// Aggregate view over a series of class days.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_sessions: usize,
    pub average_rate: u32,
    pub best_day: Option<NaiveDate>,
    pub worst_day: Option<NaiveDate>,
}

/// Summarize a series of daily figures.
pub fn summarize(days: &[DailyClassAttendance]) -> ReportSummary {
    if days.is_empty() {
        return ReportSummary {
            total_sessions: 0,
            average_rate: 0,
            best_day: None,
            worst_day: None,
        };
    }

    let sum: u32 = days.iter().map(|d| d.rate()).sum();
    let best = days.iter().max_by_key(|d| d.rate());
    let worst = days.iter().min_by_key(|d| d.rate());

    ReportSummary {
        total_sessions: days.len(),
        average_rate: (f64::from(sum) / days.len() as f64).round() as u32,
        best_day: best.map(|d| d.date),
        worst_day: worst.map(|d| d.date),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32, present: usize, total: usize) -> DailyClassAttendance {
        DailyClassAttendance::new("Class 10A", NaiveDate::from_ymd_opt(2024, 3, d).unwrap(), present, total)
    }

    #[test]
    fn test_rate_rounds_to_nearest() {
        assert_eq!(attendance_rate(4, 6), 67);
        assert_eq!(attendance_rate(1, 3), 33);
        assert_eq!(attendance_rate(30, 30), 100);
        assert_eq!(attendance_rate(0, 30), 0);
    }

    #[test]
    fn test_rate_defined_for_empty_roster() {
        assert_eq!(attendance_rate(0, 0), 0);
    }

    #[test]
    fn test_summary_over_week() {
        let days = vec![day(1, 28, 30), day(2, 25, 30), day(3, 22, 30), day(4, 29, 30)];
        let summary = summarize(&days);
        assert_eq!(summary.total_sessions, 4);
        // Rates: 93, 83, 73, 97 -> average 86.5 -> 87.
        assert_eq!(summary.average_rate, 87);
        assert_eq!(summary.best_day, Some(NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()));
        assert_eq!(summary.worst_day, Some(NaiveDate::from_ymd_opt(2024, 3, 3).unwrap()));
    }

    #[test]
    fn test_summary_empty_series() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_sessions, 0);
        assert_eq!(summary.average_rate, 0);
        assert!(summary.best_day.is_none());
    }
}
