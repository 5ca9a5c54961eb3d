use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::config::DEFAULT_RANDOM_SEED;
use crate::error::Result;
use crate::utils::math::matrix::RowSparseMatrix;
use crate::utils::math::vector::SparseVec;
use crate::utils::speed::SpeedLogs;
use crate::vectorizer::context::SharedContext;
use crate::vectorizer::corpus::Collection;
use crate::vectorizer::encoder::{Document, DocumentEncoder};
use crate::vectorizer::termsim::cache::TermSimilarityCache;

use super::config::{Measure, ModelConfig, SimilarityConfig, Space};
use super::wmd::inverse_wmd_matrix;

/// Computes document similarity matrices between a collection and its queries.
///
/// Borrows the immutable shared context and the term similarity matrix store;
/// the word mover's worker pool is sized by `num_workers`.
pub struct SimilarityEngine<'a> {
    context: &'a SharedContext,
    term_matrices: &'a TermSimilarityCache,
    num_workers: usize,
    random_seed: u64,
}

impl<'a> SimilarityEngine<'a> {
    pub fn new(context: &'a SharedContext, term_matrices: &'a TermSimilarityCache, num_workers: usize) -> Self {
        Self {
            context,
            term_matrices,
            num_workers,
            random_seed: DEFAULT_RANDOM_SEED,
        }
    }

    /// seed of the content-blind scores
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    pub fn context(&self) -> &'a SharedContext {
        self.context
    }

    /// Similarity of every query to every collection document.
    ///
    /// # Arguments
    /// * `collection` - documents compared against; also supplies TF-IDF statistics
    /// * `queries` - query documents
    /// * `config` - validated model configuration
    /// * `encoder` - encoder of the current evaluation, caching bag-of-words vectors
    /// * `speed_logs` - receives timing of the computation
    ///
    /// # Returns
    /// * `Array2<f64>` - shape `(queries.len(), collection.len())`
    pub fn similarities(
        &self,
        collection: &Collection,
        queries: &Collection,
        config: &SimilarityConfig,
        encoder: &mut DocumentEncoder<'_>,
        speed_logs: &mut SpeedLogs,
    ) -> Result<Array2<f64>> {
        let pairs = collection.len() * queries.len();
        speed_logs.measure(
            |s| format!("Processed {pairs} document pairs / {s:.3} seconds"),
            |speed_logs| match config {
                SimilarityConfig::Random => Ok(self.random(collection.len(), queries.len())),
                SimilarityConfig::Model(model) => self.model(collection, queries, model, encoder, speed_logs),
            },
        )
    }

    fn random(&self, collection_len: usize, queries_len: usize) -> Array2<f64> {
        let mut rng = StdRng::seed_from_u64(self.random_seed);
        Array2::from_shape_fn((queries_len, collection_len), |_| rng.random::<f64>())
    }

    fn model(
        &self,
        collection: &Collection,
        queries: &Collection,
        model: &ModelConfig,
        encoder: &mut DocumentEncoder<'_>,
        speed_logs: &mut SpeedLogs,
    ) -> Result<Array2<f64>> {
        let collection_docs = encoder.encode(collection, collection, &model.weights, &model.measure);
        let query_docs = encoder.encode(queries, collection, &model.weights, &model.measure);
        debug!(
            "Encoded {} collection and {} query documents for {:?}.",
            collection_docs.len(),
            query_docs.len(),
            model.space
        );

        match (&model.space, model.measure) {
            (_, Measure::Wmd) => {
                let embeddings = self.context.embedding(model.num_bits)?;
                inverse_wmd_matrix(&query_docs, &collection_docs, embeddings, self.num_workers)
            }
            (Space::Vsm, Measure::InnerProduct) => Ok(exact(&collection_docs, &query_docs)),
            (Space::DenseSoftVsm, Measure::InnerProduct) => {
                let normalized = self.context.embedding(model.num_bits)?.l2_normalized();
                let collection_dense = project(&collection_docs, &normalized);
                let query_dense = project(&query_docs, &normalized);
                Ok(query_dense.dot(&collection_dense.t()))
            }
            (Space::SparseSoftVsm(params), Measure::InnerProduct) => {
                let term_matrix = self
                    .term_matrices
                    .matrix(self.context, model.num_bits, params, speed_logs)?;
                Ok(soft(&collection_docs, &query_docs, &term_matrix))
            }
        }
    }
}

/// inner products of sparse documents, rows are queries
fn exact(collection: &[Document], queries: &[Document]) -> Array2<f64> {
    Array2::from_shape_fn((queries.len(), collection.len()), |(q, c)| queries[q].dot(&collection[c]))
}

/// Dense document vectors in embedding space, each L2-normalized.
/// Documents without any embedded term stay zero.
fn project(documents: &[Document], embeddings: &Array2<f32>) -> Array2<f64> {
    let mut dense = Array2::<f64>::zeros((documents.len(), embeddings.ncols()));
    for (mut row, document) in dense.rows_mut().into_iter().zip(documents) {
        for (id, weight) in document.raw_iter() {
            for (d, &e) in row.iter_mut().zip(embeddings.row(id).iter()) {
                *d += weight * f64::from(e);
            }
        }
        let norm = row.dot(&row).sqrt();
        if norm > 0.0 {
            row.mapv_inplace(|v| v / norm);
        }
    }
    dense
}

/// Scale a document to unit soft norm `sqrt(xᵀ·M·x)`.
/// A document whose self-similarity is not positive becomes the zero vector.
fn soft_normalize(document: &Document, term_matrix: &RowSparseMatrix) -> Document {
    let self_similarity = term_matrix.inner(document, document);
    if self_similarity > 0.0 && self_similarity.is_finite() {
        let mut normalized = document.clone();
        normalized.scale(self_similarity.sqrt().recip());
        normalized
    } else {
        SparseVec::new(document.len())
    }
}

/// soft cosine similarities `cᵀ·M·q`, rows are queries
fn soft(collection: &[Document], queries: &[Document], term_matrix: &RowSparseMatrix) -> Array2<f64> {
    let queries: Vec<Document> = queries.iter().map(|q| soft_normalize(q, term_matrix)).collect();
    let mut similarities = Array2::<f64>::zeros((queries.len(), collection.len()));
    for (c, document) in collection.iter().enumerate() {
        let projected = term_matrix.left_mul(&soft_normalize(document, term_matrix));
        for (q, query) in queries.iter().enumerate() {
            similarities[[q, c]] = projected.dot(query);
        }
    }
    similarities
}
