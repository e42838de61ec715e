//! Domain error types.

/// A container's index does not satisfy its construction invariant.
///
/// Raised once, at construction; no partially-valid container is ever
/// observable.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid index: expected {expected}, found {found}")]
pub struct InvalidIndexError {
    pub expected: String,
    pub found: String,
}

impl InvalidIndexError {
    pub fn new(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Errors from parsing a comma-separated code list.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CodeListError {
    #[error("empty token in code list")]
    EmptyToken,

    #[error("duplicate code: {0}")]
    DuplicateCode(String),
}

/// Top-level error type for marketpanel.
#[derive(Debug, thiserror::Error)]
pub enum MarketPanelError {
    #[error(transparent)]
    InvalidIndex(#[from] InvalidIndexError),

    #[error("no rows for {kind} {key}")]
    NotFound { kind: &'static str, key: String },

    #[error("{operation} is not available for the {market} market")]
    UnsupportedMarket { market: String, operation: String },

    #[error("malformed table: {reason}")]
    Shape { reason: String },

    #[error(transparent)]
    CodeList(#[from] CodeListError),

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&MarketPanelError> for std::process::ExitCode {
    fn from(err: &MarketPanelError) -> Self {
        let code: u8 = match err {
            MarketPanelError::Io(_) => 1,
            MarketPanelError::ConfigParse { .. }
            | MarketPanelError::ConfigMissing { .. }
            | MarketPanelError::ConfigInvalid { .. } => 2,
            MarketPanelError::Database { .. } | MarketPanelError::DatabaseQuery { .. } => 3,
            MarketPanelError::InvalidIndex(_)
            | MarketPanelError::Shape { .. }
            | MarketPanelError::CodeList(_)
            | MarketPanelError::InvalidArgument { .. } => 4,
            MarketPanelError::NotFound { .. } | MarketPanelError::UnsupportedMarket { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
