pub mod cache;

use std::cmp::Ordering;
use std::collections::BTreeMap;

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::utils::math::matrix::RowSparseMatrix;
use crate::utils::math::vector::SparseVec;
use crate::vectorizer::embedding::EmbeddingMatrix;
use crate::vectorizer::tfidf::TfidfModel;

/// Parameters of a term similarity matrix (besides the quantization level)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermSimilarityParams {
    /// visit and rank terms by decreasing IDF of the shared TF-IDF model
    pub tfidf: bool,
    /// mirror every accepted entry
    pub symmetric: bool,
    /// stop filling a row once its absolute sum would reach 1
    pub dominant: bool,
    /// maximum off-diagonal entries per row
    pub nonzero_limit: usize,
    /// only cosine similarities strictly above this are kept
    pub threshold: f64,
    /// kept similarities are raised to this power
    pub exponent: i32,
}

impl TermSimilarityParams {
    /// Stable store key: quantization level, tfidf, symmetric, dominant,
    /// nonzero limit, threshold and exponent, in that order.
    pub fn cache_key(&self, num_bits: u32) -> String {
        format!(
            "{}-{}-{}-{}-{}-{:?}-{}",
            num_bits, self.tfidf, self.symmetric, self.dominant, self.nonzero_limit, self.threshold, self.exponent
        )
    }
}

/// Nearest terms in embedding space, by cosine similarity.
pub struct TermSimilarityIndex {
    normalized: Array2<f32>,
    has_vector: Vec<bool>,
    threshold: f64,
    exponent: i32,
}

impl TermSimilarityIndex {
    pub fn new(embeddings: &EmbeddingMatrix, threshold: f64, exponent: i32) -> Self {
        let has_vector = (0..embeddings.len()).map(|id| embeddings.has_vector(id)).collect();
        Self {
            normalized: embeddings.l2_normalized(),
            has_vector,
            threshold,
            exponent,
        }
    }

    /// Up to `topn` most similar terms to `id`, most similar first.
    /// Terms without an embedding neither have nor are neighbors.
    ///
    /// # Returns
    /// * `Vec<(usize, f32)>` - (term id, similarity raised to the exponent)
    pub fn most_similar(&self, id: usize, topn: usize) -> Vec<(usize, f32)> {
        if topn == 0 || !self.has_vector.get(id).copied().unwrap_or(false) {
            return Vec::new();
        }
        let query: ArrayView1<f32> = self.normalized.row(id);
        let mut candidates: Vec<(usize, f32)> = self
            .normalized
            .rows()
            .into_iter()
            .enumerate()
            .filter(|(other, _)| *other != id && self.has_vector[*other])
            .map(|(other, row)| (other, query.dot(&row)))
            .filter(|(_, cos)| f64::from(*cos) > self.threshold)
            .collect();
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        candidates.truncate(topn);
        candidates
            .into_iter()
            .map(|(other, cos)| (other, cos.powi(self.exponent)))
            .collect()
    }
}

/// order by decreasing idf, then increasing id
fn idf_order(tfidf: &TfidfModel, a: usize, b: usize) -> Ordering {
    tfidf.idf(b).total_cmp(&tfidf.idf(a)).then(a.cmp(&b))
}

/// Build a sparse term similarity matrix.
///
/// Starts from the identity. Terms are visited in id order (or by decreasing
/// IDF when `tfidf` is given); each visited term asks the index for as many
/// neighbors as its row still has room for and accepts them in the same order.
///
/// # Arguments
/// * `index` - nearest-term index over the shared vocabulary
/// * `dim` - shared vocabulary size
/// * `tfidf` - shared TF-IDF model, when `params.tfidf` is set
/// * `params` - symmetry, dominance and sparsity settings
pub fn build_term_similarity_matrix(
    index: &TermSimilarityIndex,
    dim: usize,
    tfidf: Option<&TfidfModel>,
    params: &TermSimilarityParams,
) -> RowSparseMatrix {
    let limit = params.nonzero_limit;
    let mut rows: Vec<BTreeMap<usize, f32>> = (0..dim).map(|i| BTreeMap::from([(i, 1.0_f32)])).collect();
    let mut row_nonzero = vec![0usize; dim];
    let mut row_sum = vec![0.0_f64; dim];

    let mut order: Vec<usize> = (0..dim).collect();
    if let Some(tfidf) = tfidf {
        order.sort_by(|&a, &b| idf_order(tfidf, a, b));
    }

    for (visited, &t1) in order.iter().enumerate() {
        if visited % 10_000 == 0 && visited > 0 {
            debug!("Term similarity matrix: visited {} of {} terms.", visited, dim);
        }
        let room = limit.saturating_sub(row_nonzero[t1]);
        if room == 0 {
            continue;
        }
        let mut neighbors = index.most_similar(t1, room);
        match tfidf {
            Some(tfidf) => neighbors.sort_by(|a, b| idf_order(tfidf, a.0, b.0)),
            None => neighbors.sort_by(|a, b| a.0.cmp(&b.0)),
        }
        for (t2, similarity) in neighbors.into_iter().take(room) {
            let weight = f64::from(similarity.abs());
            if params.dominant && row_sum[t1] + weight >= 1.0 {
                break;
            }
            if params.symmetric {
                let mirrored_fits = row_nonzero[t2] < limit
                    && (!params.dominant || row_sum[t2] + weight < 1.0)
                    && !rows[t2].contains_key(&t1);
                if mirrored_fits {
                    rows[t1].insert(t2, similarity);
                    row_nonzero[t1] += 1;
                    row_sum[t1] += weight;
                    rows[t2].insert(t1, similarity);
                    row_nonzero[t2] += 1;
                    row_sum[t2] += weight;
                }
            } else {
                rows[t1].insert(t2, similarity);
                row_nonzero[t1] += 1;
                row_sum[t1] += weight;
            }
        }
    }

    let rows: Vec<SparseVec<f32>> = rows
        .into_iter()
        .map(|row| SparseVec::from_pairs(dim, row))
        .collect();
    let matrix = RowSparseMatrix::from_rows(dim, rows);
    info!(
        "Constructed term similarity matrix with {} nonzero entries ({} terms).",
        matrix.nnz(),
        dim
    );
    matrix
}
