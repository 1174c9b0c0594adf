//! Domain error types.

/// Top-level error type for sigtrader.
#[derive(Debug, thiserror::Error)]
pub enum BacktestError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid configuration {key}: {reason}")]
    InvalidConfiguration { key: String, reason: String },

    #[error("shape mismatch: {field} has {actual} bars, expected {expected}")]
    ShapeMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("empty series: at least one bar is required")]
    EmptySeries,

    #[error("bad data at bar {index} ({field}): {reason}")]
    DataQuality {
        index: usize,
        field: String,
        reason: String,
    },

    #[error("feed error: {reason}")]
    Feed { reason: String },

    #[error("report {field} mismatch: run has {actual}, caller expected {expected}")]
    ReportMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("failed to write report {path}: {reason}")]
    ReportWrite { path: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BacktestError {
    pub(crate) fn invalid(key: &str, reason: impl Into<String>) -> Self {
        BacktestError::InvalidConfiguration {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn data(index: usize, field: &str, reason: impl Into<String>) -> Self {
        BacktestError::DataQuality {
            index,
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// True for failures that happen after a run completed and leave its result usable.
    pub fn is_export_error(&self) -> bool {
        matches!(
            self,
            BacktestError::ReportMismatch { .. }
                | BacktestError::ReportWrite { .. }
                | BacktestError::Io(_)
        )
    }
}

impl From<&BacktestError> for std::process::ExitCode {
    fn from(err: &BacktestError) -> Self {
        let code: u8 = match err {
            BacktestError::Io(_) | BacktestError::ReportWrite { .. } => 1,
            BacktestError::ConfigParse { .. } | BacktestError::InvalidConfiguration { .. } => 2,
            BacktestError::Feed { .. } => 3,
            BacktestError::ShapeMismatch { .. }
            | BacktestError::EmptySeries
            | BacktestError::DataQuality { .. } => 4,
            BacktestError::ReportMismatch { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
