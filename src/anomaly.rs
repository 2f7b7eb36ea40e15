//! Comments comparing yesterday's value against each rolling average.

use crate::schema::CommentClass;
use crate::stats::{Period, RollingStats};
use crate::utils::numeric_value;
use crate::workbook::CellValue;

pub const BLANK_COMMENT: &str = "Yesterday Data Blank";
pub const NO_ACTION_COMMENT: &str = "No Action required";

#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyAssessment {
    pub comments: Vec<String>,
    pub class: CommentClass,
    pub triggered: Vec<Period>,
}

impl AnomalyAssessment {
    pub fn joined_comments(&self) -> String {
        self.comments.join(", ")
    }

    pub fn is_anomalous(&self) -> bool {
        self.class == CommentClass::Anomalous
    }
}

/// `"<Period> difference more than <threshold>"`, threshold already formatted (`5%`).
pub fn deviation_comment(period: Period, threshold_label: &str) -> String {
    format!("{} difference more than {}", period.label(), threshold_label)
}

/// Percent deviation of `value` from `average`. A zero average never deviates.
pub fn deviation_pct(average: f64, value: f64) -> Option<f64> {
    if average == 0.0 {
        return None;
    }
    Some((average - value).abs() / average * 100.0)
}

pub fn assess(most_recent: &CellValue, stats: &RollingStats, threshold_pct: f64) -> AnomalyAssessment {
    let Some(latest) = numeric_value(most_recent) else {
        return AnomalyAssessment {
            comments: vec![BLANK_COMMENT.to_string()],
            class: CommentClass::Blank,
            triggered: Vec::new(),
        };
    };

    let threshold_label = format!("{}%", threshold_pct);
    let triggered: Vec<Period> = Period::ALL
        .into_iter()
        .filter(|period| {
            stats
                .get(*period)
                .average
                .and_then(|avg| deviation_pct(avg, latest))
                .is_some_and(|pct| pct > threshold_pct)
        })
        .collect();

    if triggered.is_empty() {
        AnomalyAssessment {
            comments: vec![NO_ACTION_COMMENT.to_string()],
            class: CommentClass::Normal,
            triggered,
        }
    } else {
        AnomalyAssessment {
            comments: triggered
                .iter()
                .map(|p| deviation_comment(*p, &threshold_label))
                .collect(),
            class: CommentClass::Anomalous,
            triggered,
        }
    }
}
