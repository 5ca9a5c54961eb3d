/// This crate evaluates document similarity models by k-nearest-neighbor classification.
pub mod config;
pub mod error;
pub mod utils;
pub mod vectorizer;

/// Error type of the crate
/// Every fallible operation returns `soft_vsm_eval::Result<T>`.
/// Store misses are not errors: loaders return `Ok(None)` instead.
pub use error::{Error, Result};

/// Harness configuration
/// Store directories, word-vector files, worker count, neighbor counts and
/// the hyperparameter grid, read from TOML. Every field has a default.
pub use config::{EmbeddingSource, GridConfig, HarnessConfig};

/// Collection
/// A named, tokenized document collection with its local vocabulary, average
/// document length (in token characters) and optional class labels.
///
/// # Serialization
/// Supported. Collections are stored as gzip-compressed CBOR keyed by name,
/// see `Collection::load_or_build`.
pub use vectorizer::corpus::Collection;

/// Shared Context
/// The shared vocabulary, its TF-IDF model and one embedding table per
/// quantization level. Built once per run and only ever borrowed.
pub use vectorizer::context::SharedContext;

/// Vocabulary and SMART `dtn` TF-IDF model
pub use vectorizer::tfidf::{SmartDtn, TfidfEngine, TfidfModel};
pub use vectorizer::vocab::Vocabulary;

/// Word vectors and the dense embedding table indexed by vocabulary id
pub use vectorizer::embedding::{EmbeddingMatrix, KeyedVectors};

/// Term Similarity Matrix Store
/// Builds sparse term similarity matrices from word embeddings and keeps them
/// on disk, building each parameter combination at most once.
pub use vectorizer::termsim::cache::TermSimilarityCache;
pub use vectorizer::termsim::TermSimilarityParams;

/// Similarity configuration
/// `SpaceKind`, `WeightsKind` and `MeasureKind` name a model; only the
/// combinations with a defined model are accepted by `SimilarityConfig::new`.
pub use vectorizer::evaluate::config::{
    Hyperparams, Measure, MeasureKind, ModelConfig, SimilarityConfig, Space, SpaceKind, Weights, WeightsKind,
};

/// Similarity Engine
/// Computes `(queries x collection)` similarity matrices under exact VSM,
/// dense soft VSM, sparse soft VSM and word mover's similarity.
pub use vectorizer::evaluate::similarity::SimilarityEngine;

/// Document encoder, caching bag-of-words vectors for one evaluation
pub use vectorizer::encoder::{Document, DocumentEncoder};

/// Classification
/// `Evaluator` grid-searches a model on a validation collection and reports
/// the k-NN accuracy on a test collection as a `ClassificationResult`.
pub use vectorizer::evaluate::classify::{ClassificationResult, Evaluator};

/// Sparse vector used for documents and matrix rows
pub use utils::math::vector::SparseVec;
