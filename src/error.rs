use chromiumoxide::error::CdpError;
use thiserror::Error;

/// Messages chromiumoxide surfaces once the CDP connection is gone
const SESSION_LOST_MARKERS: &[&str] = &[
    "receiver is gone",
    "channel closed",
    "connection reset",
    "broken pipe",
    "invalid session",
    "not reachable",
    "websocket",
];

/// Browser / portal driver errors
///
/// Expected portal outcomes (record missing, form rejected) are NOT errors: the
/// driver reports them as `false` / `Lookup::NotFound`. Only failures of the
/// automation channel itself end up here.
#[derive(Debug, Error)]
pub enum PortalError {
    /// The browser went away; nothing else in this run can succeed
    #[error("browser session lost: {0}")]
    SessionLost(String),

    #[error("failed to start browser: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {details}")]
    Navigation { url: String, details: String },

    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("element interaction failed: {0}")]
    Element(String),
}

impl PortalError {
    pub fn is_session_lost(&self) -> bool {
        matches!(self, PortalError::SessionLost(_))
    }

    /// Classify a raw driver message
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if SESSION_LOST_MARKERS.iter().any(|m| lower.contains(m)) {
            PortalError::SessionLost(message)
        } else {
            PortalError::Script(message)
        }
    }
}

impl From<CdpError> for PortalError {
    fn from(err: CdpError) -> Self {
        PortalError::classify(err.to_string())
    }
}

impl From<serde_json::Error> for PortalError {
    fn from(err: serde_json::Error) -> Self {
        PortalError::Script(format!("unexpected script result: {}", err))
    }
}

/// Dataset, checkpoint and report I/O errors
#[derive(Debug, Error)]
pub enum DataError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error on {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("JSON error on {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("column '{column}' not found in {path}")]
    MissingColumn { path: String, column: String },

    #[error("sheet '{sheet}' not found under {path}")]
    SheetNotFound { path: String, sheet: String },
}

impl DataError {
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        DataError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub fn csv(path: impl AsRef<std::path::Path>, source: csv::Error) -> Self {
        DataError::Csv {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub fn json(path: impl AsRef<std::path::Path>, source: serde_json::Error) -> Self {
        DataError::Json {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("environment variable {var_name}: value '{value}' is not a valid {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },

    #[error("unknown program type '{0}' (expected pnf or pnfa)")]
    UnknownProgram(String),
}

pub type PortalResult<T> = Result<T, PortalError>;
pub type DataResult<T> = Result<T, DataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_connection_messages() {
        assert!(PortalError::classify("Receiver is gone").is_session_lost());
        assert!(PortalError::classify("chrome not reachable").is_session_lost());
        assert!(PortalError::classify("invalid session id").is_session_lost());
        assert!(!PortalError::classify("ReferenceError: jQuery is not defined").is_session_lost());
    }
}
