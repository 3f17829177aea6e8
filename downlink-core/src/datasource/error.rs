use std::fmt::Debug;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    #[error("Key `{key:?}` was not found.  Reason: `{reason:?}`")]
    NotFound { key: String, reason: String },
    #[error("Cannot compose components: `{0}`")]
    Composition(String),
    #[error("Invalid configuration: `{0}`")]
    Configuration(String),
    #[error("Key cannot be bound to query criteria: `{0}`")]
    InvalidKey(String),
    #[error(
        "There was a problem deserializing: `{message:?}`, the input: `{attempted_input:?}`"
    )]
    Deserialize {
        message: String,
        attempted_input: String,
    },
    #[error("I/O problem due to: `{0}`")]
    FatalIO(String),
    #[error("JoinError: `{0}`")]
    JoinError(String),
    #[error("Error: `{0}`")]
    Generic(String),
}

impl PipelineError {
    pub fn not_found<K, R>(key: &K, reason: R) -> Self
    where
        K: Debug + ?Sized,
        R: Into<String>,
    {
        PipelineError::NotFound {
            key: format!("{:?}", key),
            reason: reason.into(),
        }
    }

    pub fn composition<M: ToString>(message: M) -> Self {
        PipelineError::Composition(message.to_string())
    }

    pub fn configuration<M: ToString>(message: M) -> Self {
        PipelineError::Configuration(message.to_string())
    }

    pub fn deserialize<M, A>(message: M, attempted_input: A) -> Self
    where
        M: ToString,
        A: ToString,
    {
        PipelineError::Deserialize {
            message: message.to_string(),
            attempted_input: attempted_input.to_string(),
        }
    }
}

use tokio::task::JoinError;
impl From<JoinError> for PipelineError {
    fn from(er: JoinError) -> Self {
        PipelineError::JoinError(er.to_string())
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(er: std::io::Error) -> Self {
        PipelineError::FatalIO(er.to_string())
    }
}

impl From<anyhow::Error> for PipelineError {
    fn from(er: anyhow::Error) -> Self {
        PipelineError::Generic(er.to_string())
    }
}

impl From<&str> for PipelineError {
    fn from(er: &str) -> Self {
        PipelineError::Generic(er.to_string())
    }
}
