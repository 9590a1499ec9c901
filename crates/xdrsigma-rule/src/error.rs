use thiserror::Error;

/// Errors that can occur while parsing Sigma rules.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Condition parse error: {0}")]
    Condition(String),

    #[error("Unknown modifier '{0}'")]
    UnknownModifier(String),

    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    #[error("Missing required field '{0}'")]
    MissingField(String),

    #[error("Invalid detection: {0}")]
    InvalidDetection(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RuleError>;
