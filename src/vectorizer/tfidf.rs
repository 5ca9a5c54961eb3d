use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::utils::math::vector::SparseVec;
use crate::vectorizer::vocab::Vocabulary;

/// Weights below this magnitude are dropped from transformed vectors
const WEIGHT_EPS: f64 = 1e-12;

pub trait TfidfEngine {
    /// 局所重み (term frequency component)
    fn wlocal(tf: f64) -> f64;
    /// 大域重み (document frequency component)
    /// # Arguments
    /// * `df` - number of documents containing the term
    /// * `num_docs` - number of documents in the corpus
    fn wglobal(df: u64, num_docs: u64) -> f64;
}

/// SMART `dtn`: double-logarithm tf, `log2(N/df)` idf, no normalization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartDtn;

impl TfidfEngine for SmartDtn {
    #[inline]
    fn wlocal(tf: f64) -> f64 {
        1.0 + (1.0 + tf.ln()).ln()
    }

    #[inline]
    fn wglobal(df: u64, num_docs: u64) -> f64 {
        if df == 0 {
            return 0.0;
        }
        (num_docs as f64 / df as f64).log2()
    }
}

/// TF-IDF model over a vocabulary.
/// Holds one IDF value per vocabulary id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfModel<E = SmartDtn>
where
    E: TfidfEngine,
{
    idfs: Vec<f64>,
    num_docs: u64,
    _marker: PhantomData<E>,
}

impl<E> TfidfModel<E>
where
    E: TfidfEngine,
{
    /// IDFを語彙の文書頻度から計算する
    pub fn from_vocabulary(vocab: &Vocabulary) -> Self {
        let num_docs = vocab.num_docs();
        let idfs = (0..vocab.len())
            .map(|id| E::wglobal(vocab.doc_freq(id), num_docs))
            .collect();
        Self {
            idfs,
            num_docs,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn idf(&self, id: usize) -> f64 {
        self.idfs.get(id).copied().unwrap_or(0.0)
    }

    #[inline]
    pub fn num_docs(&self) -> u64 {
        self.num_docs
    }

    /// Weight a bag-of-words vector. Zero weights vanish.
    pub fn transform(&self, bow: &SparseVec<f64>) -> SparseVec<f64> {
        let mut weighted = bow.clone();
        weighted.map_values(|id, tf| {
            let w = E::wlocal(tf) * self.idf(id);
            if w.abs() <= WEIGHT_EPS { 0.0 } else { w }
        });
        weighted
    }
}
