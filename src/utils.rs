use crate::workbook::CellValue;
use chrono::{Datelike, Days, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;

/// Coerces a cell into a number.
///
/// Strings have `$`, `,` and `%` stripped and are trimmed first. Blank
/// strings, `NA` in any case, and anything that still fails to parse are
/// treated as missing.
pub fn numeric_value(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Number(_) | CellValue::Empty => None,
        CellValue::Text(s) => {
            let cleaned: String = s.chars().filter(|c| !matches!(c, '$' | ',' | '%')).collect();
            let cleaned = cleaned.trim();
            if cleaned.is_empty() || cleaned.eq_ignore_ascii_case("NA") {
                return None;
            }
            cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
        }
    }
}

/// A value counts as present data when it is non-empty and not an `NA` marker.
pub fn is_present(value: &CellValue) -> bool {
    match value {
        CellValue::Empty => false,
        CellValue::Number(_) => true,
        CellValue::Text(s) => !s.is_empty() && !s.eq_ignore_ascii_case("NA"),
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Converts a 1900-system spreadsheet date serial to a calendar date.
///
/// Serials below 61 sit before the phantom 1900-02-29, so they count from
/// 1899-12-31; later serials count from 1899-12-30. Time-of-day fractions are
/// dropped.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial >= 2_958_466.0 {
        return None;
    }
    let days = serial.floor() as u64;
    let epoch = if days < 61 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    epoch.checked_add_days(Days::new(days))
}

pub fn month_from_abbrev(abbrev: &str) -> Option<u32> {
    let month = match abbrev.to_ascii_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn day_month_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(\d{1,2})-([A-Za-z]{3})(?:-(\d{4}|\d{2}))?").ok())
        .as_ref()
}

/// Parses header text such as `5-Jan`, `05-Jan-24` or `5-Jan-2024`.
///
/// Headers without a year use `default_year`. Impossible dates (`31-Feb`)
/// and unknown month abbreviations yield `None`.
pub fn parse_day_month_header(text: &str, default_year: i32) -> Option<NaiveDate> {
    let caps = day_month_pattern()?.captures(text)?;
    let day: u32 = caps.get(1)?.as_str().parse().ok()?;
    let month = month_from_abbrev(caps.get(2)?.as_str())?;
    let year = match caps.get(3) {
        Some(y) if y.as_str().len() == 4 => y.as_str().parse().ok()?,
        Some(y) => 2000 + y.as_str().parse::<i32>().ok()?,
        None => default_year,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Year implied by a ledger sheet name ending in a 2-digit year (`Jan-24`).
pub fn sheet_name_year(name: &str) -> Option<i32> {
    let tail = name.get(name.len().checked_sub(2)?..)?;
    if !tail.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    tail.parse::<i32>().ok().map(|yy| 2000 + yy)
}

/// Inclusive trailing window of calendar days ending yesterday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrailingWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TrailingWindow {
    /// `days` days ending the day before `as_of`.
    pub fn ending_before(as_of: NaiveDate, days: u32) -> Self {
        let end = as_of.pred_opt().unwrap_or(as_of);
        let back = u64::from(days.saturating_sub(1));
        let start = end.checked_sub_days(Days::new(back)).unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// `DD Mon YY`, e.g. `05 Oct 26`.
pub fn format_header_date(date: NaiveDate) -> String {
    date.format("%d %b %y").to_string()
}

/// `DD/MM/YYYY`, used in alert subjects.
pub fn format_subject_date(date: NaiveDate) -> String {
    format!("{:02}/{:02}/{:04}", date.day(), date.month(), date.year())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(numeric_value(&CellValue::Number(42.5)), Some(42.5));
        assert_eq!(numeric_value(&CellValue::text("$1,234.00")), Some(1234.0));
        assert_eq!(numeric_value(&CellValue::text(" 12% ")), Some(12.0));
        assert_eq!(numeric_value(&CellValue::text("NA")), None);
        assert_eq!(numeric_value(&CellValue::text("na")), None);
        assert_eq!(numeric_value(&CellValue::text("")), None);
        assert_eq!(numeric_value(&CellValue::text("$")), None);
        assert_eq!(numeric_value(&CellValue::text("closed")), None);
        assert_eq!(numeric_value(&CellValue::Empty), None);
    }

    #[test]
    fn test_numeric_coercion_is_idempotent() {
        for raw in ["$1,234.00", "17", "0.5%"] {
            let once = numeric_value(&CellValue::text(raw)).unwrap();
            assert_eq!(numeric_value(&CellValue::Number(once)), Some(once));
        }
    }

    #[test]
    fn test_presence() {
        assert!(is_present(&CellValue::Number(0.0)));
        assert!(is_present(&CellValue::text("closed")));
        assert!(!is_present(&CellValue::text("Na")));
        assert!(!is_present(&CellValue::text("")));
        assert!(!is_present(&CellValue::Empty));
    }

    #[test]
    fn test_excel_serials() {
        assert_eq!(excel_serial_to_date(1.0), Some(date(1900, 1, 1)));
        assert_eq!(excel_serial_to_date(59.0), Some(date(1900, 2, 28)));
        assert_eq!(excel_serial_to_date(61.0), Some(date(1900, 3, 1)));
        assert_eq!(excel_serial_to_date(45292.0), Some(date(2024, 1, 1)));
        assert_eq!(excel_serial_to_date(45292.75), Some(date(2024, 1, 1)));
        assert_eq!(excel_serial_to_date(0.0), None);
        assert_eq!(excel_serial_to_date(f64::NAN), None);
    }

    #[test]
    fn test_day_month_headers() {
        assert_eq!(parse_day_month_header("5-Jan", 2024), Some(date(2024, 1, 5)));
        assert_eq!(parse_day_month_header("05-jan-23", 2024), Some(date(2023, 1, 5)));
        assert_eq!(parse_day_month_header("5-Jan-2025", 2024), Some(date(2025, 1, 5)));
        assert_eq!(parse_day_month_header("Total", 2024), None);
        assert_eq!(parse_day_month_header("31-Feb", 2024), None);
        assert_eq!(parse_day_month_header("3-Foo", 2024), None);
    }

    #[test]
    fn test_sheet_name_year() {
        assert_eq!(sheet_name_year("Jan-24"), Some(2024));
        assert_eq!(sheet_name_year("March-25"), Some(2025));
        assert_eq!(sheet_name_year("Summary"), None);
        assert_eq!(sheet_name_year("x"), None);
    }

    #[test]
    fn test_trailing_window_is_inclusive() {
        let window = TrailingWindow::ending_before(date(2024, 3, 1), 30);
        assert_eq!(window.end, date(2024, 2, 29));
        assert_eq!(window.start, date(2024, 1, 31));
        assert!(window.contains(date(2024, 1, 31)));
        assert!(window.contains(date(2024, 2, 29)));
        assert!(!window.contains(date(2024, 1, 30)));
        assert!(!window.contains(date(2024, 3, 1)));
    }

    #[test]
    fn test_header_formats() {
        assert_eq!(format_header_date(date(2026, 10, 5)), "05 Oct 26");
        assert_eq!(format_subject_date(date(2026, 10, 5)), "05/10/2026");
    }
}
