use crate::error::{ReportError, Result};
use log::debug;
use std::path::{Path, PathBuf};

/// Anything that can hand over a complete workbook as raw bytes.
pub trait WorkbookSource {
    fn fetch_workbook_bytes(&self) -> Result<Vec<u8>>;
}

/// Reads the workbook from a local file.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl WorkbookSource for FileSource {
    fn fetch_workbook_bytes(&self) -> Result<Vec<u8>> {
        let bytes = std::fs::read(&self.path).map_err(|e| {
            ReportError::Source(format!("failed to read {}: {}", self.path.display(), e))
        })?;
        debug!("Read {} bytes from {}", bytes.len(), self.path.display());
        Ok(bytes)
    }
}

impl WorkbookSource for Vec<u8> {
    fn fetch_workbook_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_is_a_source_error() {
        let source = FileSource::new("/nonexistent/consumption.xlsx");
        let err = source.fetch_workbook_bytes().unwrap_err();
        assert!(matches!(err, ReportError::Source(_)));
        assert!(!err.is_fatal_input());
    }

    #[test]
    fn test_file_source_reads_bytes() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"xlsx bytes").unwrap();

        let source = FileSource::new(file.path());
        assert_eq!(source.path(), file.path());
        assert_eq!(source.fetch_workbook_bytes().unwrap(), b"xlsx bytes".to_vec());
    }

    #[test]
    fn test_in_memory_source() {
        let bytes = vec![1u8, 2, 3];
        assert_eq!(bytes.fetch_workbook_bytes().unwrap(), vec![1, 2, 3]);
    }
}
