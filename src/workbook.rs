//! In-memory workbook model and `.xlsx` parsing.
//!
//! Sheets keep absolute (row, column) addressing, 0-based, so that a header
//! at `G1` is always `(0, 6)` no matter where the first populated cell is.

use crate::error::{ReportError, Result};
use calamine::{Data, Reader, Xlsx};
use log::debug;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::io::Cursor;

/// A single cell as the pipeline sees it.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    Number(f64),
    Text(String),
    #[default]
    Empty,
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Trimmed label for identifier columns. Whole numbers render without a
    /// fractional part; blank and whitespace-only cells yield `None`.
    pub fn as_label(&self) -> Option<String> {
        let label = match self {
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            CellValue::Number(n) => n.to_string(),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Empty => return None,
        };
        if label.is_empty() {
            None
        } else {
            Some(label)
        }
    }

    /// Text a table renderer shows for this cell: numeric values rounded to
    /// whole units (halves toward positive infinity), other strings verbatim,
    /// `NA` and blanks as empty.
    pub fn display_text(&self) -> String {
        if let Some(n) = crate::utils::numeric_value(self) {
            let rounded = (n + 0.5).floor();
            // `-0` prints with its sign.
            let rounded = if rounded == 0.0 { 0.0 } else { rounded };
            return format!("{}", rounded);
        }
        match self {
            CellValue::Text(s) if crate::utils::is_present(self) => s.clone(),
            _ => String::new(),
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<&Data> for CellValue {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => CellValue::Empty,
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Float(f) => CellValue::Number(*f),
            Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
                CellValue::Text(s.clone())
            }
            Data::Bool(b) => CellValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
            Data::Error(e) => CellValue::Text(e.to_string()),
        }
    }
}

// Serialized as a bare JSON number, string, or `""` for a missing value.
impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            CellValue::Number(n) => serializer.serialize_f64(*n),
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Empty => serializer.serialize_str(""),
        }
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
            Null(()),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => CellValue::Number(n),
            Raw::Text(s) if s.is_empty() => CellValue::Empty,
            Raw::Text(s) => CellValue::Text(s),
            Raw::Null(()) => CellValue::Empty,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub name: String,
    cells: BTreeMap<(usize, usize), CellValue>,
    last_row: Option<usize>,
    last_column: Option<usize>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Stores a cell. Empty values are not stored and do not extend the used range.
    pub fn set_cell(&mut self, row: usize, column: usize, value: impl Into<CellValue>) {
        let value = value.into();
        if value.is_empty() {
            self.cells.remove(&(row, column));
            return;
        }
        self.last_row = Some(self.last_row.map_or(row, |r| r.max(row)));
        self.last_column = Some(self.last_column.map_or(column, |c| c.max(column)));
        self.cells.insert((row, column), value);
    }

    pub fn with_cell(mut self, row: usize, column: usize, value: impl Into<CellValue>) -> Self {
        self.set_cell(row, column, value);
        self
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&CellValue> {
        self.cells.get(&(row, column))
    }

    /// Owned copy of a cell, `Empty` when nothing is stored there.
    pub fn value(&self, row: usize, column: usize) -> CellValue {
        self.cell(row, column).cloned().unwrap_or_default()
    }

    pub fn last_row(&self) -> Option<usize> {
        self.last_row
    }

    pub fn last_column(&self) -> Option<usize> {
        self.last_column
    }

    pub fn is_blank(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Ordered collection of sheets, immutable once built.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn from_sheets(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }

    /// Parses a complete `.xlsx` container.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut xlsx: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
            .map_err(|e| ReportError::MalformedInput(e.to_string()))?;

        let sheet_names = xlsx.sheet_names().to_owned();
        let mut sheets = Vec::with_capacity(sheet_names.len());

        for name in sheet_names {
            let range = xlsx.worksheet_range(&name).map_err(|e| {
                ReportError::MalformedInput(format!("sheet '{}': {}", name, e))
            })?;

            let (row_offset, col_offset) = range.start().unwrap_or((0, 0));
            let mut sheet = Sheet::new(name.clone());
            for (row, col, data) in range.cells() {
                sheet.set_cell(
                    row_offset as usize + row,
                    col_offset as usize + col,
                    CellValue::from(data),
                );
            }
            debug!(
                "Parsed sheet '{}' (last row {:?}, last column {:?})",
                name,
                sheet.last_row(),
                sheet.last_column()
            );
            sheets.push(sheet);
        }

        Ok(Self { sheets })
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }
}
