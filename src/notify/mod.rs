//! Alert selection for a finished report, and the seam to whatever delivers it.
//!
//! The report's comments are the contract: a record triggers an alert when its
//! comments contain a deviation comment for its own `diffPct`, or report
//! yesterday's value as blank without any deviation.

#[cfg(feature = "email")]
pub mod smtp;

#[cfg(feature = "email")]
pub use smtp::{SmtpNotifier, SmtpSettings};

use crate::anomaly::{deviation_comment, BLANK_COMMENT};
use crate::error::Result;
use crate::schema::ConsumptionReport;
use crate::stats::Period;
use crate::utils::format_subject_date;
use chrono::NaiveDate;
use log::{info, warn};

const DIFFERENCE_MARKER: &str = "difference more than";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Deviation(Period),
    BlankYesterday,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub client: String,
    pub kind: AlertKind,
    pub threshold: String,
}

impl Alert {
    pub fn line(&self) -> String {
        match self.kind {
            AlertKind::Deviation(period) => format!(
                "{}: {} difference > {}",
                self.client,
                period.label(),
                self.threshold
            ),
            AlertKind::BlankYesterday => {
                format!("{}: Yesterday Data Blank (No other diff)", self.client)
            }
        }
    }
}

/// Rendered email content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertDigest {
    alerts: Vec<Alert>,
}

impl AlertDigest {
    pub fn from_report(report: &ConsumptionReport) -> Self {
        let mut alerts = Vec::new();
        for record in &report.client_data_for_display {
            let comments = record.comments.as_str();

            for period in Period::ALL {
                if comments.contains(&deviation_comment(period, &record.diff_pct)) {
                    alerts.push(Alert {
                        client: record.client.clone(),
                        kind: AlertKind::Deviation(period),
                        threshold: record.diff_pct.clone(),
                    });
                }
            }

            if comments.contains(BLANK_COMMENT) && !comments.contains(DIFFERENCE_MARKER) {
                alerts.push(Alert {
                    client: record.client.clone(),
                    kind: AlertKind::BlankYesterday,
                    threshold: record.diff_pct.clone(),
                });
            }
        }
        Self { alerts }
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    /// Builds the message, or `None` when there is nothing to report.
    pub fn message(&self, on: NaiveDate, dashboard_url: Option<&str>) -> Option<AlertMessage> {
        if self.alerts.is_empty() {
            return None;
        }

        let lines: Vec<String> = self.alerts.iter().map(Alert::line).collect();
        let subject = format!(
            "ACTION REQUIRED: Consumption Alerts - {}",
            format_subject_date(on)
        );
        let text_body = format!(
            "The following alerts were detected:\n\n{}\n\nPlease check the consumption dashboard for details.",
            lines.join("\n")
        );

        let items: String = lines
            .iter()
            .map(|l| format!("<li>{}</li>", escape_html(l)))
            .collect();
        let mut html_body = format!(
            "<p>The following alerts were detected:</p>\n<ul>{}</ul>\n<p>Please check the consumption dashboard for details.</p>\n",
            items
        );
        if let Some(url) = dashboard_url {
            let url = escape_html(url);
            html_body.push_str(&format!(
                "<p>Access the dashboard here: <a href=\"{url}\">{url}</a></p>\n"
            ));
        }
        html_body.push_str("<br>\n<p>This is an automated notification. Please do not reply.</p>");

        Some(AlertMessage {
            subject,
            text_body,
            html_body,
        })
    }
}

/// Delivers an alert message, e.g. over SMTP.
pub trait Notifier {
    fn send(&self, recipients: &[String], message: &AlertMessage) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct AlertOptions {
    pub recipients: Vec<String>,
    pub dashboard_url: Option<String>,
}

impl AlertOptions {
    /// Parses a comma-separated recipient list, dropping blanks.
    pub fn with_recipient_list(mut self, list: &str) -> Self {
        self.recipients = list
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect();
        self
    }
}

/// Sends one digest for `report` if it has alerts and anyone to send them to.
/// Returns whether a message went out.
pub fn dispatch_alerts(
    report: &ConsumptionReport,
    notifier: &dyn Notifier,
    options: &AlertOptions,
    on: NaiveDate,
) -> Result<bool> {
    if options.recipients.is_empty() {
        warn!("No alert recipients configured; skipping notification");
        return Ok(false);
    }

    let digest = AlertDigest::from_report(report);
    let Some(message) = digest.message(on, options.dashboard_url.as_deref()) else {
        info!("No actionable comments found; no alert sent");
        return Ok(false);
    };

    info!(
        "Sending {} alerts to {}",
        digest.len(),
        options.recipients.join(", ")
    );
    notifier.send(&options.recipients, &message)?;
    Ok(true)
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReportError;
    use crate::schema::{ClientReport, CommentClass};
    use crate::workbook::CellValue;
    use std::cell::RefCell;

    fn record(client: &str, comments: &str, class: CommentClass) -> ClientReport {
        ClientReport {
            client: client.to_string(),
            daily_values: vec![CellValue::Number(1.0)],
            monthly_count: 1,
            fortnightly_count: 1,
            weekly_count: 1,
            diff_pct: "5%".to_string(),
            monthly_avg: "1.00".to_string(),
            fortnightly_avg: "1.00".to_string(),
            weekly_avg: "1.00".to_string(),
            yesterday_data: CellValue::Number(1.0),
            comments: comments.to_string(),
            comment_class: class,
        }
    }

    fn report(records: Vec<ClientReport>) -> ConsumptionReport {
        ConsumptionReport {
            client_data_for_display: records,
            combined_date_headers: vec!["01 Feb 24".to_string()],
            has_non_zero_monthly_count: true,
            has_non_zero_fortnightly_count: true,
            has_non_zero_weekly_count: true,
        }
    }

    fn on() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 2).unwrap()
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: RefCell<Vec<(Vec<String>, AlertMessage)>>,
    }

    impl Notifier for RecordingNotifier {
        fn send(&self, recipients: &[String], message: &AlertMessage) -> Result<()> {
            self.sent
                .borrow_mut()
                .push((recipients.to_vec(), message.clone()));
            Ok(())
        }
    }

    struct FailingNotifier;

    impl Notifier for FailingNotifier {
        fn send(&self, _recipients: &[String], _message: &AlertMessage) -> Result<()> {
            Err(ReportError::Notification("relay refused".to_string()))
        }
    }

    #[test]
    fn test_digest_collects_triggers() {
        let report = report(vec![
            record(
                "Acme",
                "Monthly difference more than 5%, Weekly difference more than 5%",
                CommentClass::Anomalous,
            ),
            record("BlankCo", "Yesterday Data Blank", CommentClass::Blank),
            record("Globex", "No Action required", CommentClass::Normal),
        ]);

        let digest = AlertDigest::from_report(&report);
        let lines: Vec<String> = digest.alerts().iter().map(Alert::line).collect();
        assert_eq!(
            lines,
            vec![
                "Acme: Monthly difference > 5%",
                "Acme: Weekly difference > 5%",
                "BlankCo: Yesterday Data Blank (No other diff)",
            ]
        );
    }

    #[test]
    fn test_message_rendering() {
        let report = report(vec![record(
            "R&D <Lab>",
            "Fortnightly difference more than 5%",
            CommentClass::Anomalous,
        )]);
        let message = AlertDigest::from_report(&report)
            .message(on(), Some("http://localhost:3032"))
            .unwrap();

        assert_eq!(message.subject, "ACTION REQUIRED: Consumption Alerts - 02/02/2024");
        assert!(message
            .text_body
            .contains("R&D <Lab>: Fortnightly difference > 5%"));
        assert!(message
            .html_body
            .contains("<li>R&amp;D &lt;Lab&gt;: Fortnightly difference &gt; 5%</li>"));
        assert!(message.html_body.contains("href=\"http://localhost:3032\""));
    }

    #[test]
    fn test_empty_digest_has_no_message() {
        let report = report(vec![record("Globex", "No Action required", CommentClass::Normal)]);
        let digest = AlertDigest::from_report(&report);
        assert!(digest.is_empty());
        assert!(digest.message(on(), None).is_none());
    }

    #[test]
    fn test_dispatch_sends_once_with_alerts() {
        let report = report(vec![record(
            "Acme",
            "Monthly difference more than 5%",
            CommentClass::Anomalous,
        )]);
        let notifier = RecordingNotifier::default();
        let options = AlertOptions::default().with_recipient_list("ops@example.com, ,lead@example.com");

        let sent = dispatch_alerts(&report, &notifier, &options, on()).unwrap();
        assert!(sent);

        let calls = notifier.sent.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, vec!["ops@example.com", "lead@example.com"]);
    }

    #[test]
    fn test_dispatch_skips_without_recipients_or_alerts() {
        let notifier = RecordingNotifier::default();
        let anomalous = report(vec![record(
            "Acme",
            "Monthly difference more than 5%",
            CommentClass::Anomalous,
        )]);
        assert!(!dispatch_alerts(&anomalous, &notifier, &AlertOptions::default(), on()).unwrap());

        let quiet = report(vec![record("Globex", "No Action required", CommentClass::Normal)]);
        let options = AlertOptions::default().with_recipient_list("ops@example.com");
        assert!(!dispatch_alerts(&quiet, &notifier, &options, on()).unwrap());
        assert!(notifier.sent.borrow().is_empty());
    }

    #[test]
    fn test_dispatch_propagates_send_failure() {
        let report = report(vec![record("BlankCo", "Yesterday Data Blank", CommentClass::Blank)]);
        let options = AlertOptions::default().with_recipient_list("ops@example.com");
        let err = dispatch_alerts(&report, &FailingNotifier, &options, on()).unwrap_err();
        assert!(matches!(err, ReportError::Notification(_)));
    }
}
