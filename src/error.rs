use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Store errors. StoreUnavailable is for store adapters to report
    // connection-level failures, as opposed to a query that executed
    // and failed.
    StoreQueryFailed,
    StoreUnavailable,

    // Configuration errors
    ConfigInvalidRefreshRate,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::StoreQueryFailed => "STORE_QUERY_FAILED",
            ErrorCode::StoreUnavailable => "STORE_UNAVAILABLE",
            ErrorCode::ConfigInvalidRefreshRate => "CONFIG_INVALID_REFRESH_RATE",
        }
    }

    /// Recoverable errors are transient: a later load or refresh cycle
    /// may succeed without any configuration change.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ErrorCode::StoreQueryFailed | ErrorCode::StoreUnavailable
        )
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug)]
#[error("[{code}] {message}")]
pub struct FlagCacheError {
    pub code: ErrorCode,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl FlagCacheError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn store_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StoreQueryFailed, message)
    }

    pub fn config_error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, message)
    }

    pub fn is_recoverable(&self) -> bool {
        self.code.is_recoverable()
    }
}

pub type Result<T> = std::result::Result<T, FlagCacheError>;
