use crate::types::{LabelChain, Visibility};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PomError {
    #[error("Invalid model declaration: {0}")]
    Construction(#[from] ConstructionError),

    #[error("{chain}: locator matched {count} elements, expected exactly one")]
    Ambiguous { chain: LabelChain, count: usize },

    #[error("{chain}: not found ({reason})")]
    NotFound {
        chain: LabelChain,
        reason: Visibility,
    },

    #[error("{chain}: not visible ({reason})")]
    NotVisible {
        chain: LabelChain,
        reason: Visibility,
    },

    #[error("Timed out after {timeout_ms}ms waiting for {chain} to be {state} (last: {last})")]
    Timeout {
        chain: LabelChain,
        state: &'static str,
        timeout_ms: u64,
        last: Visibility,
    },

    #[error("{chain}: driver error: {message}")]
    Driver { chain: LabelChain, message: String },

    #[error("Stale element reference: {0}")]
    StaleElement(String),

    #[error("Unsupported by driver: {0}")]
    Unsupported(String),

    #[error("Unknown locator strategy: {0}")]
    UnknownStrategy(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Anyhow error: {0}")]
    AnyhowError(String),
}

/// Raised while a model type is being turned into a graph. Never recoverable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    #[error("'{node}' declares parent '{parent}', which is not part of the same model graph")]
    ForeignParent { node: String, parent: String },

    #[error("label '{label}' is declared twice in {model}")]
    DuplicateLabel { model: String, label: String },

    #[error("'{parent}' already has a child labelled '{label}'")]
    DuplicateChild { parent: String, label: String },

    #[error("'{node}' is malformed: {reason}")]
    Malformed { node: String, reason: String },
}

pub type Result<T> = std::result::Result<T, PomError>;

// Convert anyhow::Error to PomError
impl From<anyhow::Error> for PomError {
    fn from(err: anyhow::Error) -> Self {
        PomError::AnyhowError(err.to_string())
    }
}

impl PomError {
    pub fn from_any_error<E: std::fmt::Display>(err: E) -> Self {
        PomError::Browser(err.to_string())
    }

    /// Attaches a label chain to a bare driver failure so it names the model
    /// node being worked on. Errors that already carry a chain pass through.
    pub(crate) fn at(self, chain: &LabelChain) -> Self {
        match self {
            PomError::Browser(message) | PomError::AnyhowError(message) => PomError::Driver {
                chain: chain.clone(),
                message,
            },
            PomError::StaleElement(message) => PomError::Driver {
                chain: chain.clone(),
                message: format!("stale element reference: {}", message),
            },
            other => other,
        }
    }

    pub fn is_stale(&self) -> bool {
        match self {
            PomError::StaleElement(_) => true,
            PomError::Driver { message, .. } => message.starts_with("stale element reference"),
            _ => false,
        }
    }
}
