//! Per-client aggregation over the canonical timeline.

use crate::anomaly::assess;
use crate::config::ReportConfig;
use crate::error::{ReportError, Result};
use crate::scanner::ScanResult;
use crate::schema::{ClientReport, ConsumptionReport};
use crate::stats::RollingStats;
use crate::timeline::CanonicalTimeline;
use crate::utils::is_present;
use crate::workbook::CellValue;
use log::{debug, info, warn};

pub struct ClientAggregator<'a> {
    config: &'a ReportConfig,
}

impl<'a> ClientAggregator<'a> {
    pub fn new(config: &'a ReportConfig) -> Self {
        Self { config }
    }

    /// One value per canonical date. For each date the qualifying sheets are
    /// tried in priority order; the first one holding both a row for the
    /// client and a column for the date supplies the cell, even if that cell
    /// is blank.
    pub fn daily_values(
        &self,
        client: &str,
        scan: &ScanResult<'_>,
        timeline: &CanonicalTimeline,
    ) -> Vec<CellValue> {
        timeline
            .dates()
            .map(|date| {
                scan.sheets
                    .iter()
                    .find_map(|sheet| sheet.value_at(client, date))
                    .unwrap_or_default()
            })
            .collect()
    }

    pub fn client_report(&self, client: &str, daily_values: Vec<CellValue>) -> ClientReport {
        let stats = RollingStats::compute(&daily_values, &self.config.windows);
        let yesterday = daily_values.last().cloned().unwrap_or_default();
        let assessment = assess(&yesterday, &stats, self.config.diff_threshold_pct);

        if assessment.is_anomalous() {
            debug!("{}: {}", client, assessment.joined_comments());
        }

        ClientReport {
            client: client.to_string(),
            monthly_count: stats.monthly.count,
            fortnightly_count: stats.fortnightly.count,
            weekly_count: stats.weekly.count,
            diff_pct: self.config.threshold_label(),
            monthly_avg: stats.monthly.average_label(),
            fortnightly_avg: stats.fortnightly.average_label(),
            weekly_avg: stats.weekly.average_label(),
            yesterday_data: yesterday,
            comments: assessment.joined_comments(),
            comment_class: assessment.class,
            daily_values,
        }
    }

    pub fn aggregate(
        &self,
        scan: &ScanResult<'_>,
        timeline: &CanonicalTimeline,
    ) -> Result<ConsumptionReport> {
        let clients = scan.clients();
        let mut rows = Vec::with_capacity(clients.len());
        let mut skipped = 0usize;

        for client in &clients {
            let values = self.daily_values(client, scan, timeline);
            if !values.iter().any(is_present) {
                skipped += 1;
                debug!("Skipping '{}': no data in the window", client);
                continue;
            }
            rows.push(self.client_report(client, values));
        }

        info!(
            "Aggregated {} of {} clients over {} dates ({} without data)",
            rows.len(),
            clients.len(),
            timeline.len(),
            skipped
        );

        if rows.is_empty() {
            warn!("No client data found for display after processing");
            return Err(ReportError::NoClientData);
        }

        Ok(ConsumptionReport {
            has_non_zero_monthly_count: rows.iter().any(|r| r.monthly_count > 0),
            has_non_zero_fortnightly_count: rows.iter().any(|r| r.fortnightly_count > 0),
            has_non_zero_weekly_count: rows.iter().any(|r| r.weekly_count > 0),
            combined_date_headers: timeline.headers(),
            client_data_for_display: rows,
        })
    }
}
