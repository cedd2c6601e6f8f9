use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreError {
    /// A sub-score or date that cannot feed the composite.
    #[error("invalid input for `{field}`: {reason}")]
    InvalidInput {
        field: &'static str,
        reason: String,
    },
    /// Weight table or vocabulary that breaks a startup invariant.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ScoreError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ScoreError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScoreError>;
