use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Template for {target} did not parse: {reason}")]
    TemplateParse { target: String, reason: String },

    #[error("Blueprint '{name}' cannot be installed: {reason}")]
    InvalidBlueprint { name: String, reason: String },

    #[error("Blueprint not installed: {0}")]
    UnknownBlueprint(String),

    #[error("Blueprint '{name}' has type {actual}, which cannot be used for {expected}")]
    BlueprintTypeMismatch {
        name: String,
        actual: String,
        expected: String,
    },

    #[error("Unknown target: {0}")]
    UnknownTarget(String),

    #[error("Invalid reorder gesture: {0}")]
    InvalidGesture(String),

    #[error("Persistence failed: {0}")]
    Persistence(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
