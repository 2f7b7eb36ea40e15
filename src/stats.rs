use crate::config::RollingWindows;
use crate::utils::{numeric_value, round2};
use crate::workbook::CellValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    Monthly,
    Fortnightly,
    Weekly,
}

impl Period {
    /// Comparison order used for comments.
    pub const ALL: [Period; 3] = [Period::Monthly, Period::Fortnightly, Period::Weekly];

    pub fn label(&self) -> &'static str {
        match self {
            Period::Monthly => "Monthly",
            Period::Fortnightly => "Fortnightly",
            Period::Weekly => "Weekly",
        }
    }
}

/// Count and mean of the numeric entries in a trailing slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub count: usize,
    /// Mean rounded to two decimals; `None` when the slice has no numeric entry.
    pub average: Option<f64>,
}

impl WindowStats {
    /// Stats over the last `size` entries, or all of them when fewer exist.
    pub fn trailing(values: &[CellValue], size: usize) -> Self {
        let start = values.len().saturating_sub(size);
        let numbers: Vec<f64> = values[start..].iter().filter_map(numeric_value).collect();

        let average = if numbers.is_empty() {
            None
        } else {
            Some(round2(numbers.iter().sum::<f64>() / numbers.len() as f64))
        };

        Self {
            count: numbers.len(),
            average,
        }
    }

    /// `"12.34"` or `"N/A"`.
    pub fn average_label(&self) -> String {
        match self.average {
            Some(avg) => format!("{:.2}", avg),
            None => "N/A".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollingStats {
    pub monthly: WindowStats,
    pub fortnightly: WindowStats,
    pub weekly: WindowStats,
}

impl RollingStats {
    pub fn compute(values: &[CellValue], windows: &RollingWindows) -> Self {
        Self {
            monthly: WindowStats::trailing(values, windows.monthly),
            fortnightly: WindowStats::trailing(values, windows.fortnightly),
            weekly: WindowStats::trailing(values, windows.weekly),
        }
    }

    pub fn get(&self, period: Period) -> &WindowStats {
        match period {
            Period::Monthly => &self.monthly,
            Period::Fortnightly => &self.fortnightly,
            Period::Weekly => &self.weekly,
        }
    }
}
