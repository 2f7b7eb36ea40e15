use crate::error::{ReportError, Result};
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_SHEET_PATTERN: &str = r"^(Sheet1|[A-Za-z]{3,}-\d{2})$";

/// Entry counts for the three rolling windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RollingWindows {
    pub monthly: usize,
    pub fortnightly: usize,
    pub weekly: usize,
}

impl Default for RollingWindows {
    fn default() -> Self {
        Self {
            monthly: 30,
            fortnightly: 15,
            weekly: 7,
        }
    }
}

/// Layout of the consumption ledger and the anomaly threshold.
///
/// Row and column indices are 0-based (`client_column = 1` is column B).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ReportConfig {
    #[schemars(description = "Regex a sheet name must match to be treated as a client ledger.")]
    pub sheet_pattern: String,

    #[schemars(description = "Row holding the date headers.")]
    pub header_row: usize,

    #[schemars(description = "First column scanned for date headers; earlier columns hold metadata.")]
    pub first_date_column: usize,

    #[schemars(description = "Column holding client names.")]
    pub client_column: usize,

    #[schemars(description = "First row scanned for client names.")]
    pub first_client_row: usize,

    #[schemars(description = "Length of the trailing calendar window ending yesterday.")]
    pub window_days: u32,

    pub windows: RollingWindows,

    #[schemars(description = "Percent deviation from a rolling average that flags a client.")]
    pub diff_threshold_pct: f64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            sheet_pattern: DEFAULT_SHEET_PATTERN.to_string(),
            header_row: 0,
            first_date_column: 6,
            client_column: 1,
            first_client_row: 1,
            window_days: 30,
            windows: RollingWindows::default(),
            diff_threshold_pct: 5.0,
        }
    }
}

impl ReportConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        self.compile_sheet_pattern()?;

        if self.window_days == 0 {
            return Err(ReportError::InvalidConfig(
                "window_days must be at least 1".to_string(),
            ));
        }

        let w = &self.windows;
        if w.monthly == 0 || w.fortnightly == 0 || w.weekly == 0 {
            return Err(ReportError::InvalidConfig(format!(
                "rolling windows must be non-empty (monthly {}, fortnightly {}, weekly {})",
                w.monthly, w.fortnightly, w.weekly
            )));
        }

        if !self.diff_threshold_pct.is_finite() || self.diff_threshold_pct < 0.0 {
            return Err(ReportError::InvalidConfig(format!(
                "diff_threshold_pct must be a non-negative number, got {}",
                self.diff_threshold_pct
            )));
        }

        Ok(())
    }

    pub fn compile_sheet_pattern(&self) -> Result<Regex> {
        Regex::new(&self.sheet_pattern).map_err(|e| {
            ReportError::InvalidConfig(format!(
                "sheet_pattern '{}' is not a valid regex: {}",
                self.sheet_pattern, e
            ))
        })
    }

    /// Threshold as shown in reports and comments, e.g. `5%` or `2.5%`.
    pub fn threshold_label(&self) -> String {
        format!("{}%", self.diff_threshold_pct)
    }
}
