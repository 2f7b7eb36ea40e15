//! # Consumption Monitor
//!
//! A library for turning a periodically-updated consumption workbook (one
//! sheet per month, one row per client, one column per day) into a single
//! chronological series per client, with rolling statistics and anomaly
//! comments ready for a dashboard or an alert email.
//!
//! ## Core Concepts
//!
//! - **Qualifying Sheets**: Sheets whose names match the ledger convention (`Jan-24`, `Sheet1`)
//! - **Trailing Window**: Date columns are kept only if they fall in the 30 days ending yesterday
//! - **Canonical Timeline**: Same-date columns from different sheets collapse into one entry
//! - **Rolling Windows**: The last 30 / 15 / 7 entries of a client's series, not calendar days
//! - **Anomaly Comments**: Yesterday's value compared to each rolling average against a threshold
//!
//! ## Example
//!
//! ```rust,ignore
//! use consumption_monitor::*;
//!
//! let bytes = std::fs::read("consumption.xlsx")?;
//! let report = process_workbook_bytes(&bytes, &ReportConfig::default())?;
//!
//! for row in &report.client_data_for_display {
//!     println!("{}: {} ({})", row.client, row.comments, row.comment_class.as_str());
//! }
//! ```

pub mod aggregator;
pub mod anomaly;
pub mod config;
pub mod error;
pub mod notify;
pub mod scanner;
pub mod schema;
pub mod source;
pub mod stats;
pub mod timeline;
pub mod utils;
pub mod workbook;

#[cfg(feature = "sharepoint")]
pub mod sharepoint;

pub use aggregator::ClientAggregator;
pub use anomaly::{assess, AnomalyAssessment, BLANK_COMMENT, NO_ACTION_COMMENT};
pub use config::{ReportConfig, RollingWindows};
pub use error::{ReportError, Result};
pub use notify::{
    dispatch_alerts, Alert, AlertDigest, AlertKind, AlertMessage, AlertOptions, Notifier,
};
#[cfg(feature = "email")]
pub use notify::{SmtpNotifier, SmtpSettings};
pub use scanner::{DateColumn, ScanResult, ScannedSheet, WorkbookScanner};
pub use schema::*;
pub use source::{FileSource, WorkbookSource};
pub use stats::{Period, RollingStats, WindowStats};
pub use timeline::{CanonicalTimeline, TimelineEntry};
pub use utils::{is_present, numeric_value};
pub use workbook::{CellValue, Sheet, Workbook};

use chrono::{Local, NaiveDate};
use log::{debug, info};

pub struct ReportProcessor {
    config: ReportConfig,
}

impl ReportProcessor {
    pub fn new(config: ReportConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Runs the pipeline against today's local date.
    pub fn process_bytes(&self, bytes: &[u8]) -> Result<ConsumptionReport> {
        self.process_bytes_as_of(bytes, Local::now().date_naive())
    }

    pub fn process_bytes_as_of(&self, bytes: &[u8], as_of: NaiveDate) -> Result<ConsumptionReport> {
        debug!("Parsing workbook ({} bytes)", bytes.len());
        let workbook = Workbook::from_bytes(bytes)?;
        self.process_workbook(&workbook, as_of)
    }

    /// Scan, merge and aggregate. `as_of` is "today"; the window ends the day before.
    pub fn process_workbook(&self, workbook: &Workbook, as_of: NaiveDate) -> Result<ConsumptionReport> {
        let scanner = WorkbookScanner::new(&self.config, as_of)?;
        let window = scanner.window();
        info!(
            "Building consumption report for {} to {}",
            window.start, window.end
        );

        let scan = scanner.scan(workbook)?;
        let timeline = CanonicalTimeline::from_scan(&scan);
        ClientAggregator::new(&self.config).aggregate(&scan, &timeline)
    }

    pub fn process_source(&self, source: &dyn WorkbookSource) -> Result<ConsumptionReport> {
        let bytes = source.fetch_workbook_bytes()?;
        self.process_bytes(&bytes)
    }
}

pub fn process_workbook_bytes(bytes: &[u8], config: &ReportConfig) -> Result<ConsumptionReport> {
    ReportProcessor::new(config.clone())?.process_bytes(bytes)
}

pub fn process_workbook_bytes_as_of(
    bytes: &[u8],
    config: &ReportConfig,
    as_of: NaiveDate,
) -> Result<ConsumptionReport> {
    ReportProcessor::new(config.clone())?.process_bytes_as_of(bytes, as_of)
}
