//! Excel export functionality.

use chrono::{Local, NaiveDate};
use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook, XlsxError};
use std::path::Path;

use crate::models::{AttendanceRecord, AttendanceStatus, Roster};
use crate::report::DailyClassAttendance;

/// Export a series of daily class attendance figures to an Excel file.
pub fn export_attendance_summary_to_excel(data: &[DailyClassAttendance], path: &Path) -> Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    worksheet.set_name("Attendance Report")?;

    // Header format
    let header_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0x4472C4))
        .set_font_color(Color::White)
        .set_border(FormatBorder::Thin);

    // Headers
    let headers = ["Class", "Date", "Present", "Absent", "Total", "Rate %"];

    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }

    // Column widths
    worksheet.set_column_width(0, 18)?; // Class
    worksheet.set_column_width(1, 12)?; // Date
    worksheet.set_column_width(2, 10)?; // Present
    worksheet.set_column_width(3, 10)?; // Absent
    worksheet.set_column_width(4, 10)?; // Total
    worksheet.set_column_width(5, 8)?; // Rate

    // Data rows
    for (idx, record) in data.iter().enumerate() {
        let row = (idx + 1) as u32;

        worksheet.write_string(row, 0, &record.class_name)?;
        worksheet.write_string(row, 1, record.date.to_string())?;
        worksheet.write_number(row, 2, record.present as f64)?;
        worksheet.write_number(row, 3, record.absent() as f64)?;
        worksheet.write_number(row, 4, record.total as f64)?;
        worksheet.write_number(row, 5, f64::from(record.rate()))?;
    }

    // Autofilter
    if !data.is_empty() {
        let last_row = data.len() as u32;
        worksheet.autofilter(0, 0, last_row, 5)?;
    }

    // Freeze top row
    worksheet.set_freeze_panes(1, 0)?;

    workbook.save(path)?;
    Ok(())
}

/// Export one saved session's per-student records to an Excel file.
pub fn export_session_to_excel(
    class_name: &str,
    date: NaiveDate,
    records: &[AttendanceRecord],
    roster: &Roster,
    path: &Path,
) -> Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    worksheet.set_name("Session")?;

    // Header format
    let header_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0x4472C4))
        .set_font_color(Color::White)
        .set_border(FormatBorder::Thin);

    // Headers
    let headers = ["Roll Number", "Name", "Status", "Class", "Date"];

    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }

    // Column widths
    worksheet.set_column_width(0, 12)?; // Roll Number
    worksheet.set_column_width(1, 30)?; // Name
    worksheet.set_column_width(2, 10)?; // Status
    worksheet.set_column_width(3, 18)?; // Class
    worksheet.set_column_width(4, 12)?; // Date

    // Data rows
    for (idx, record) in records.iter().enumerate() {
        let row = (idx + 1) as u32;
        let student = roster.get(&record.student_id);

        worksheet.write_string(row, 0, student.map(|s| s.roll_number.as_str()).unwrap_or(""))?;
        worksheet.write_string(row, 1, student.map(|s| s.name.as_str()).unwrap_or(&record.student_id))?;
        worksheet.write_string(row, 2, record.status.as_str())?;
        worksheet.write_string(row, 3, class_name)?;
        worksheet.write_string(row, 4, date.to_string())?;
    }

    // Present/absent tally below the list
    let present = records.iter().filter(|r| r.status == AttendanceStatus::Present).count();
    let tally_row = (records.len() + 2) as u32;
    worksheet.write_string(tally_row, 0, "Present")?;
    worksheet.write_number(tally_row, 1, present as f64)?;
    worksheet.write_string(tally_row + 1, 0, "Absent")?;
    worksheet.write_number(tally_row + 1, 1, (records.len() - present) as f64)?;

    // Freeze top row
    worksheet.set_freeze_panes(1, 0)?;

    workbook.save(path)?;
    Ok(())
}

/// Generate default filename for export.
pub fn generate_export_filename(prefix: &str) -> String {
    let now = Local::now();
    format!("{prefix}_{ts}.xlsx", ts = now.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_filename_has_prefix_and_extension() {
        let name = generate_export_filename("attendance");
        assert!(name.starts_with("attendance_"));
        assert!(name.ends_with(".xlsx"));
    }

    #[test]
    fn test_export_summary_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        let data = vec![DailyClassAttendance::new(
            "Class 10A",
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            28,
            30,
        )];
        export_attendance_summary_to_excel(&data, &path).unwrap();
        assert!(path.exists());
    }
}
