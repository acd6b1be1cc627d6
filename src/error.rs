use std::path::PathBuf;

use thiserror::Error;

use crate::types::EmotionLabel;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to load model {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: LoadError,
    },

    #[error("Model file {0:?} does not start with a known emotion label")]
    UnrecognizedLabel(String),

    #[error("Invalid input image: {0}")]
    InvalidInput(String),

    #[error("Feature vector has {actual} components, model expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("No face detected")]
    NoFaceDetected,

    #[error("A classifier for {0} is already registered")]
    DuplicateLabel(EmotionLabel),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Model serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why a persisted model could not be turned into a classifier.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Model deserialization error: {0}")]
    Deserialization(#[from] bincode::Error),

    #[error("JSON model error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid model: {0}")]
    InvalidModel(String),
}

/// Coarse classification of [`Error`], for callers that branch on the
/// failure mode rather than its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Config,
    Load,
    UnrecognizedLabel,
    InvalidInput,
    DimensionMismatch,
    NoFaceDetected,
    DuplicateLabel,
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) => ErrorKind::Config,
            Error::Load { .. } => ErrorKind::Load,
            Error::UnrecognizedLabel(_) => ErrorKind::UnrecognizedLabel,
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            Error::NoFaceDetected => ErrorKind::NoFaceDetected,
            Error::DuplicateLabel(_) => ErrorKind::DuplicateLabel,
            Error::Io(_) | Error::Serialization(_) | Error::Json(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn load(path: impl Into<PathBuf>, source: impl Into<LoadError>) -> Self {
        Error::Load {
            path: path.into(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
