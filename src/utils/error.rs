use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComplianceError {
    #[error("Reference dataset '{dataset}' unavailable: {reason}")]
    CacheUnavailable { dataset: String, reason: String },

    #[error("{checker} checker failed: {reason}")]
    CheckerFailure { checker: String, reason: String },

    #[error("All compliance checkers failed: {}", failures.join("; "))]
    AllCheckersFailed { failures: Vec<String> },

    #[error("Reference store request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Reference store error for '{dataset}': {message}")]
    StoreError { dataset: String, message: String },

    #[error("Page fetch for '{dataset}' at offset {offset} timed out after {timeout_ms}ms")]
    FetchTimeout {
        dataset: String,
        offset: usize,
        timeout_ms: u64,
    },

    #[error("Dataset '{dataset}' exceeded {max_pages} pages without a short page")]
    PaginationLimitExceeded { dataset: String, max_pages: usize },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    ReferenceData,
    Checker,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl ComplianceError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ComplianceError::ConfigError { .. }
            | ComplianceError::ConfigValidationError { .. }
            | ComplianceError::InvalidConfigValueError { .. }
            | ComplianceError::MissingConfigError { .. } => ErrorCategory::Configuration,
            ComplianceError::CacheUnavailable { .. }
            | ComplianceError::ApiError(_)
            | ComplianceError::StoreError { .. }
            | ComplianceError::FetchTimeout { .. }
            | ComplianceError::PaginationLimitExceeded { .. } => ErrorCategory::ReferenceData,
            ComplianceError::CheckerFailure { .. } | ComplianceError::AllCheckersFailed { .. } => {
                ErrorCategory::Checker
            }
            ComplianceError::CsvError(_)
            | ComplianceError::IoError(_)
            | ComplianceError::SerializationError(_) => ErrorCategory::Io,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 單一頁面失敗可重試
            ComplianceError::FetchTimeout { .. } | ComplianceError::ApiError(_) => {
                ErrorSeverity::Medium
            }
            ComplianceError::StoreError { .. }
            | ComplianceError::PaginationLimitExceeded { .. }
            | ComplianceError::CheckerFailure { .. }
            | ComplianceError::CsvError(_)
            | ComplianceError::SerializationError(_) => ErrorSeverity::High,
            ComplianceError::ConfigError { .. }
            | ComplianceError::ConfigValidationError { .. }
            | ComplianceError::InvalidConfigValueError { .. }
            | ComplianceError::MissingConfigError { .. }
            | ComplianceError::IoError(_) => ErrorSeverity::High,
            ComplianceError::CacheUnavailable { .. } | ComplianceError::AllCheckersFailed { .. } => {
                ErrorSeverity::Critical
            }
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the configuration file and environment variables".to_string()
            }
            ErrorCategory::ReferenceData => match self {
                ComplianceError::FetchTimeout { .. } => {
                    "Increase cache.fetch_timeout_seconds or retry once the store is reachable"
                        .to_string()
                }
                ComplianceError::PaginationLimitExceeded { .. } => {
                    "Raise cache.max_pages or verify the store honours limit/offset".to_string()
                }
                _ => "Verify the reference store endpoint, credentials and dataset names"
                    .to_string(),
            },
            ErrorCategory::Checker => {
                "Retry the run; inspect the per-checker errors in the log".to_string()
            }
            ErrorCategory::Io => "Check file paths, permissions and file formats".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ComplianceError::CacheUnavailable { dataset, .. } => format!(
                "Reference data '{}' could not be loaded, so no compliance verdict was produced",
                dataset
            ),
            ComplianceError::AllCheckersFailed { .. } => {
                "None of the compliance checks could be completed".to_string()
            }
            ComplianceError::MissingConfigError { field } => {
                format!("Missing required setting: {}", field)
            }
            ComplianceError::InvalidConfigValueError { field, reason, .. } => {
                format!("Invalid setting {}: {}", field, reason)
            }
            other => other.to_string(),
        }
    }

    /// 將任意錯誤包裝為檢查器失敗
    pub fn checker_failure(checker: impl Into<String>, source: &ComplianceError) -> Self {
        ComplianceError::CheckerFailure {
            checker: checker.into(),
            reason: source.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ComplianceError>;
