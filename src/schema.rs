use crate::workbook::CellValue;
use schemars::schema::RootSchema;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub enum CommentClass {
    #[serde(rename = "comment-grey")]
    #[schemars(description = "Yesterday's value is missing; no comparison was made.")]
    Blank,

    #[serde(rename = "comment-red")]
    #[schemars(description = "Yesterday's value deviates from at least one rolling average.")]
    Anomalous,

    #[serde(rename = "comment-green")]
    #[schemars(description = "Yesterday's value is within the threshold of every rolling average.")]
    Normal,
}

impl CommentClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentClass::Blank => "comment-grey",
            CommentClass::Anomalous => "comment-red",
            CommentClass::Normal => "comment-green",
        }
    }
}

/// One display row: a client's aligned daily values plus its rolling
/// statistics and anomaly comment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientReport {
    pub client: String,

    #[schemars(
        with = "Vec<serde_json::Value>",
        description = "Number, string, or \"\" per date, aligned with combinedDateHeaders."
    )]
    pub daily_values: Vec<CellValue>,

    pub monthly_count: usize,
    pub fortnightly_count: usize,
    pub weekly_count: usize,

    #[schemars(description = "Threshold used for the comparison, e.g. \"5%\".")]
    pub diff_pct: String,

    #[schemars(description = "Two-decimal average or \"N/A\".")]
    pub monthly_avg: String,
    pub fortnightly_avg: String,
    pub weekly_avg: String,

    #[schemars(with = "serde_json::Value")]
    pub yesterday_data: CellValue,

    #[schemars(description = "Comma-joined comments.")]
    pub comments: String,

    pub comment_class: CommentClass,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionReport {
    pub client_data_for_display: Vec<ClientReport>,

    #[schemars(description = "Canonical dates formatted \"DD Mon YY\", ascending.")]
    pub combined_date_headers: Vec<String>,

    pub has_non_zero_monthly_count: bool,
    pub has_non_zero_fortnightly_count: bool,
    pub has_non_zero_weekly_count: bool,
}

impl ConsumptionReport {
    pub fn client(&self, name: &str) -> Option<&ClientReport> {
        self.client_data_for_display.iter().find(|c| c.client == name)
    }

    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// JSON Schema of the report, for renderers and notifiers written elsewhere.
pub fn report_json_schema() -> RootSchema {
    schema_for!(ConsumptionReport)
}
