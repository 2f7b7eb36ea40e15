use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Could not read the workbook. Please ensure it's a valid .xlsx file: {0}")]
    MalformedInput(String),

    #[error("No relevant data sheets found in the workbook (checked {checked} sheets against '{pattern}')")]
    NoMatchingSheets { pattern: String, checked: usize },

    #[error("No relevant client data found to display")]
    NoClientData,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Workbook source error: {0}")]
    Source(String),

    #[error("Notification failed: {0}")]
    Notification(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[cfg(feature = "sharepoint")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ReportError {
    /// True for the errors that abort a run because the workbook itself cannot
    /// produce a report.
    pub fn is_fatal_input(&self) -> bool {
        matches!(
            self,
            ReportError::MalformedInput(_)
                | ReportError::NoMatchingSheets { .. }
                | ReportError::NoClientData
        )
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
