use crate::scanner::{DateColumn, ScanResult};
use crate::utils::format_header_date;
use chrono::NaiveDate;
use log::debug;
use std::collections::BTreeMap;

/// A canonical date together with the sheet and column that first reported it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineEntry {
    pub date: NaiveDate,
    pub sheet_priority: usize,
    pub column: usize,
}

/// Ascending, de-duplicated union of every qualifying sheet's date columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalTimeline {
    entries: Vec<TimelineEntry>,
}

impl CanonicalTimeline {
    /// Merges per-sheet date columns given in sheet priority order. The first
    /// sheet to report a date keeps it; later duplicates are dropped.
    pub fn merge<'c, I>(columns_by_sheet: I) -> Self
    where
        I: IntoIterator<Item = &'c [DateColumn]>,
    {
        let mut by_date: BTreeMap<NaiveDate, TimelineEntry> = BTreeMap::new();
        for (priority, columns) in columns_by_sheet.into_iter().enumerate() {
            for dc in columns {
                by_date.entry(dc.date).or_insert(TimelineEntry {
                    date: dc.date,
                    sheet_priority: priority,
                    column: dc.column,
                });
            }
        }

        let entries: Vec<TimelineEntry> = by_date.into_values().collect();
        debug!("Canonical timeline holds {} dates", entries.len());
        Self { entries }
    }

    pub fn from_scan(scan: &ScanResult<'_>) -> Self {
        Self::merge(scan.date_columns_by_sheet())
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.entries.iter().map(|e| e.date)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Display headers, `DD Mon YY`.
    pub fn headers(&self) -> Vec<String> {
        self.dates().map(format_header_date).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn col(column: usize, d: NaiveDate) -> DateColumn {
        DateColumn { column, date: d }
    }

    #[test]
    fn test_merge_dedups_and_sorts() {
        let jan = vec![
            col(6, date(2024, 1, 30)),
            col(7, date(2024, 1, 31)),
            col(8, date(2024, 2, 1)),
        ];
        let feb = vec![col(6, date(2024, 2, 1)), col(7, date(2024, 1, 29))];

        let timeline = CanonicalTimeline::merge([jan.as_slice(), feb.as_slice()]);
        let dates: Vec<NaiveDate> = timeline.dates().collect();
        assert_eq!(
            dates,
            vec![
                date(2024, 1, 29),
                date(2024, 1, 30),
                date(2024, 1, 31),
                date(2024, 2, 1)
            ]
        );
        assert!(dates.windows(2).all(|w| w[0] < w[1]));

        let feb_first = timeline.entries()[3];
        assert_eq!(feb_first.sheet_priority, 0);
        assert_eq!(feb_first.column, 8);
    }

    #[test]
    fn test_empty_input_gives_empty_timeline() {
        let timeline = CanonicalTimeline::merge(Vec::<&[DateColumn]>::new());
        assert!(timeline.is_empty());
        assert!(timeline.headers().is_empty());
    }

    #[test]
    fn test_headers_are_formatted() {
        let only = vec![col(6, date(2026, 10, 5))];
        let timeline = CanonicalTimeline::merge([only.as_slice()]);
        assert_eq!(timeline.headers(), vec!["05 Oct 26".to_string()]);
    }
}
