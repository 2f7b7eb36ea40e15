//! Workbook scanning: picks the ledger sheets, resolves their date headers
//! inside the trailing window, and maps client names to rows.

use crate::config::ReportConfig;
use crate::error::{ReportError, Result};
use crate::utils::{excel_serial_to_date, parse_day_month_header, sheet_name_year, TrailingWindow};
use crate::workbook::{CellValue, Sheet, Workbook};
use chrono::{Datelike, NaiveDate};
use log::{debug, info, warn};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

/// A header column that resolved to a calendar date inside the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateColumn {
    pub column: usize,
    pub date: NaiveDate,
}

/// One qualifying sheet after scanning. `priority` is the sheet's position
/// among qualifying sheets; lower wins when two sheets hold the same date.
#[derive(Debug, Clone)]
pub struct ScannedSheet<'wb> {
    pub priority: usize,
    pub sheet: &'wb Sheet,
    pub date_columns: Vec<DateColumn>,
    pub client_rows: BTreeMap<String, usize>,
    date_lookup: BTreeMap<NaiveDate, usize>,
}

impl<'wb> ScannedSheet<'wb> {
    pub fn name(&self) -> &str {
        &self.sheet.name
    }

    /// Column whose own header resolves to `date`. The leftmost column wins
    /// if the sheet repeats a date.
    pub fn column_for(&self, date: NaiveDate) -> Option<usize> {
        self.date_lookup.get(&date).copied()
    }

    pub fn row_for(&self, client: &str) -> Option<usize> {
        self.client_rows.get(client).copied()
    }

    /// Value at a client/date intersection, `None` when this sheet holds no
    /// row for the client or no column for the date.
    pub fn value_at(&self, client: &str, date: NaiveDate) -> Option<CellValue> {
        let row = self.row_for(client)?;
        let column = self.column_for(date)?;
        Some(self.sheet.value(row, column))
    }
}

#[derive(Debug, Clone)]
pub struct ScanResult<'wb> {
    pub sheets: Vec<ScannedSheet<'wb>>,
    pub window: TrailingWindow,
}

impl<'wb> ScanResult<'wb> {
    /// Union of client names across all qualifying sheets, lexicographically ordered.
    pub fn clients(&self) -> BTreeSet<String> {
        self.sheets
            .iter()
            .flat_map(|s| s.client_rows.keys().cloned())
            .collect()
    }

    pub fn date_columns_by_sheet(&self) -> Vec<&[DateColumn]> {
        self.sheets.iter().map(|s| s.date_columns.as_slice()).collect()
    }
}

pub struct WorkbookScanner<'a> {
    config: &'a ReportConfig,
    pattern: Regex,
    window: TrailingWindow,
    as_of: NaiveDate,
}

impl<'a> WorkbookScanner<'a> {
    pub fn new(config: &'a ReportConfig, as_of: NaiveDate) -> Result<Self> {
        Ok(Self {
            config,
            pattern: config.compile_sheet_pattern()?,
            window: TrailingWindow::ending_before(as_of, config.window_days),
            as_of,
        })
    }

    pub fn window(&self) -> TrailingWindow {
        self.window
    }

    pub fn is_qualifying(&self, sheet_name: &str) -> bool {
        self.pattern.is_match(sheet_name)
    }

    pub fn scan<'wb>(&self, workbook: &'wb Workbook) -> Result<ScanResult<'wb>> {
        info!("Workbook sheets: {:?}", workbook.sheet_names());

        let qualifying: Vec<&Sheet> = workbook
            .sheets()
            .iter()
            .filter(|s| self.is_qualifying(&s.name))
            .collect();

        info!(
            "Qualifying sheets: {:?}",
            qualifying.iter().map(|s| s.name.as_str()).collect::<Vec<_>>()
        );

        if qualifying.is_empty() {
            warn!(
                "No sheets match '{}'; nothing to report",
                self.config.sheet_pattern
            );
            return Err(ReportError::NoMatchingSheets {
                pattern: self.config.sheet_pattern.clone(),
                checked: workbook.sheets().len(),
            });
        }

        let sheets = qualifying
            .into_iter()
            .enumerate()
            .map(|(priority, sheet)| self.scan_sheet(priority, sheet))
            .collect();

        Ok(ScanResult {
            sheets,
            window: self.window,
        })
    }

    fn scan_sheet<'wb>(&self, priority: usize, sheet: &'wb Sheet) -> ScannedSheet<'wb> {
        if sheet.is_blank() {
            warn!("Sheet '{}' is empty", sheet.name);
        }

        let date_columns = self.scan_date_columns(sheet);
        let client_rows = self.scan_client_rows(sheet);

        let mut date_lookup = BTreeMap::new();
        for dc in &date_columns {
            date_lookup.entry(dc.date).or_insert(dc.column);
        }

        debug!(
            "Sheet '{}': {} date columns in window, {} clients",
            sheet.name,
            date_columns.len(),
            client_rows.len()
        );

        ScannedSheet {
            priority,
            sheet,
            date_columns,
            client_rows,
            date_lookup,
        }
    }

    fn scan_date_columns(&self, sheet: &Sheet) -> Vec<DateColumn> {
        let Some(last_column) = sheet.last_column() else {
            return Vec::new();
        };
        let default_year = sheet_name_year(&sheet.name).unwrap_or_else(|| self.as_of.year());

        (self.config.first_date_column..=last_column)
            .filter_map(|column| {
                let header = sheet.cell(self.config.header_row, column)?;
                let date = resolve_header_date(header, default_year)?;
                self.window
                    .contains(date)
                    .then_some(DateColumn { column, date })
            })
            .collect()
    }

    fn scan_client_rows(&self, sheet: &Sheet) -> BTreeMap<String, usize> {
        let mut rows = BTreeMap::new();
        let Some(last_row) = sheet.last_row() else {
            return rows;
        };
        for row in self.config.first_client_row..=last_row {
            if let Some(name) = sheet
                .cell(row, self.config.client_column)
                .and_then(CellValue::as_label)
            {
                // A name repeated within one sheet maps to its last row.
                rows.insert(name, row);
            }
        }
        rows
    }
}

/// Resolves a header cell to a date: numeric cells as date serials, text as
/// `D-MMM[-YY]`. Anything else is not a date column.
pub fn resolve_header_date(cell: &CellValue, default_year: i32) -> Option<NaiveDate> {
    match cell {
        CellValue::Number(serial) => excel_serial_to_date(*serial),
        CellValue::Text(text) => parse_day_month_header(text, default_year),
        CellValue::Empty => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ledger(name: &str) -> Sheet {
        Sheet::new(name)
            .with_cell(0, 1, "Client")
            .with_cell(0, 5, "Notes")
    }

    #[test]
    fn test_sheet_qualification() {
        let config = ReportConfig::default();
        let scanner = WorkbookScanner::new(&config, date(2024, 2, 10)).unwrap();
        assert!(scanner.is_qualifying("Jan-24"));
        assert!(scanner.is_qualifying("Sept-23"));
        assert!(scanner.is_qualifying("Sheet1"));
        assert!(!scanner.is_qualifying("Summary"));
        assert!(!scanner.is_qualifying("Jan-2024"));
        assert!(!scanner.is_qualifying("Ja-24"));
    }

    #[test]
    fn test_no_matching_sheets_is_fatal() {
        let config = ReportConfig::default();
        let scanner = WorkbookScanner::new(&config, date(2024, 2, 10)).unwrap();
        let workbook = Workbook::from_sheets(vec![Sheet::new("Summary"), Sheet::new("Notes")]);
        let err = scanner.scan(&workbook).unwrap_err();
        assert!(matches!(err, ReportError::NoMatchingSheets { checked: 2, .. }));
    }

    #[test]
    fn test_header_scan_respects_offset_and_window() {
        let config = ReportConfig::default();
        // Window is 2024-01-11 ..= 2024-02-09.
        let scanner = WorkbookScanner::new(&config, date(2024, 2, 10)).unwrap();
        let sheet = ledger("Jan-24")
            .with_cell(0, 4, "20-Jan") // metadata column, ignored
            .with_cell(0, 6, "10-Jan") // one day before the window
            .with_cell(0, 7, "11-Jan")
            .with_cell(0, 8, 45322.0) // 2024-01-31 as a serial
            .with_cell(0, 9, "Total")
            .with_cell(0, 10, "9-Feb-24")
            .with_cell(0, 11, "10-Feb-24"); // today, outside
        let workbook = Workbook::from_sheets(vec![sheet]);

        let scan = scanner.scan(&workbook).unwrap();
        let columns = &scan.sheets[0].date_columns;
        assert_eq!(
            columns,
            &vec![
                DateColumn { column: 7, date: date(2024, 1, 11) },
                DateColumn { column: 8, date: date(2024, 1, 31) },
                DateColumn { column: 10, date: date(2024, 2, 9) },
            ]
        );
        assert!(columns.iter().all(|c| scan.window.contains(c.date)));
    }

    #[test]
    fn test_header_without_year_uses_sheet_year() {
        let config = ReportConfig::default();
        let scanner = WorkbookScanner::new(&config, date(2024, 1, 3)).unwrap();
        let workbook = Workbook::from_sheets(vec![ledger("Dec-23").with_cell(0, 6, "30-Dec")]);

        let scan = scanner.scan(&workbook).unwrap();
        assert_eq!(scan.sheets[0].date_columns[0].date, date(2023, 12, 30));
    }

    #[test]
    fn test_client_rows() {
        let config = ReportConfig::default();
        let scanner = WorkbookScanner::new(&config, date(2024, 2, 10)).unwrap();
        let sheet = ledger("Feb-24")
            .with_cell(1, 1, " Acme ")
            .with_cell(2, 1, "   ")
            .with_cell(3, 1, "Globex")
            .with_cell(5, 1, "Acme");
        let other = ledger("Jan-24").with_cell(1, 1, "Initech");
        let workbook = Workbook::from_sheets(vec![sheet, other]);

        let scan = scanner.scan(&workbook).unwrap();
        let rows = &scan.sheets[0].client_rows;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.get("Acme"), Some(&5));
        assert_eq!(rows.get("Globex"), Some(&3));
        assert!(!rows.contains_key("Client"));

        let clients: Vec<String> = scan.clients().into_iter().collect();
        assert_eq!(clients, vec!["Acme", "Globex", "Initech"]);
        assert_eq!(scan.sheets[1].priority, 1);
        assert_eq!(scan.sheets[1].name(), "Jan-24");
        assert_eq!(scan.sheets[1].row_for("Initech"), Some(1));
    }

    #[test]
    fn test_value_lookup_uses_own_header() {
        let config = ReportConfig::default();
        let scanner = WorkbookScanner::new(&config, date(2024, 2, 10)).unwrap();
        let sheet = ledger("Feb-24")
            .with_cell(0, 6, "1-Feb")
            .with_cell(0, 7, "1-Feb")
            .with_cell(1, 1, "Acme")
            .with_cell(1, 6, 10.0)
            .with_cell(1, 7, 99.0);
        let workbook = Workbook::from_sheets(vec![sheet]);

        let scan = scanner.scan(&workbook).unwrap();
        let scanned = &scan.sheets[0];
        assert_eq!(scanned.value_at("Acme", date(2024, 2, 1)), Some(CellValue::Number(10.0)));
        assert_eq!(scanned.value_at("Acme", date(2024, 2, 2)), None);
        assert_eq!(scanned.value_at("Nobody", date(2024, 2, 1)), None);
    }
}
