use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the similarity engine and its stores
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_cbor::Error),
    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed word vectors in {path} at line {line}: {reason}")]
    MalformedEmbeddings {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    #[error("unsupported combination: space={space}, weights={weights}, measure={measure}")]
    UnsupportedCombination {
        space: String,
        weights: String,
        measure: String,
    },
    #[error("no embeddings loaded for num_bits={0}")]
    MissingEmbeddings(u32),
    #[error("collection {0} has no class labels")]
    MissingLabels(String),
    #[error("collection {0} has no documents")]
    EmptyCollection(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("worker pool filled {filled} of {expected} similarities")]
    IncompleteResults { expected: usize, filled: usize },
}

impl Error {
    /// wrap an io error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
