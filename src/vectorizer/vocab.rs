use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::utils::math::vector::SparseVec;
use crate::vectorizer::token::TokenFrequency;

/// Bidirectional mapping between tokens and integer ids.
///
/// Ids are dense (`0..len`) and stable once assigned. Alongside the mapping the
/// vocabulary keeps, per id, the number of documents the token appeared in,
/// which is what TF-IDF needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    token2id: IndexSet<String>,
    /// document frequency per id
    dfs: Vec<u64>,
    /// number of documents seen
    num_docs: u64,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a vocabulary from a tokenized corpus.
    pub fn from_documents<T: AsRef<str>>(corpus: &[Vec<T>]) -> Self {
        let mut vocab = Self::new();
        for document in corpus {
            vocab.add_document(document);
        }
        vocab
    }

    /// Add one tokenized document.
    /// Tokens new to the vocabulary get ids in sorted token order.
    pub fn add_document<T: AsRef<str>>(&mut self, document: &[T]) {
        let freq = TokenFrequency::from(document);
        let mut new_tokens: Vec<&str> = freq
            .iter()
            .map(|(token, _)| token)
            .filter(|token| !self.token2id.contains(*token))
            .collect();
        new_tokens.sort_unstable();
        for token in new_tokens {
            self.token2id.insert(token.to_string());
            self.dfs.push(0);
        }
        for (token, _) in freq.iter() {
            if let Some(id) = self.token2id.get_index_of(token) {
                self.dfs[id] += 1;
            }
        }
        self.num_docs += 1;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.token2id.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.token2id.is_empty()
    }

    #[inline]
    pub fn id(&self, token: &str) -> Option<usize> {
        self.token2id.get_index_of(token)
    }

    #[inline]
    pub fn token(&self, id: usize) -> Option<&str> {
        self.token2id.get_index(id).map(|t| t.as_str())
    }

    #[inline]
    pub fn contains(&self, token: &str) -> bool {
        self.token2id.contains(token)
    }

    #[inline]
    pub fn doc_freq(&self, id: usize) -> u64 {
        self.dfs.get(id).copied().unwrap_or(0)
    }

    #[inline]
    pub fn num_docs(&self) -> u64 {
        self.num_docs
    }

    /// tokens in id order
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.token2id.iter().map(|t| t.as_str())
    }

    /// Bag-of-words vector: `(id, count)` for every known token, sorted by id.
    /// Unknown tokens are dropped.
    pub fn doc2bow<T: AsRef<str>>(&self, document: &[T]) -> SparseVec<f64> {
        let freq = TokenFrequency::from(document);
        SparseVec::from_pairs(
            self.len(),
            freq.iter()
                .filter_map(|(token, count)| self.id(token).map(|id| (id, count as f64))),
        )
    }
}
