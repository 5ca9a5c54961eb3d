use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::utils::math::vector::{math::Norm, SparseVec};
use crate::vectorizer::context::SharedContext;
use crate::vectorizer::corpus::Collection;
use crate::vectorizer::evaluate::config::{Measure, Weights};
use crate::vectorizer::tfidf::TfidfModel;
use crate::vectorizer::token::char_length;
use crate::vectorizer::vocab::Vocabulary;

/// Sparse weighted-term vector; ids strictly increasing, weights real.
pub type Document = SparseVec<f64>;

/// every present term gets weight one
pub fn binarize(document: &Document) -> Document {
    let mut binary = document.clone();
    binary.map_values(|_, _| 1.0);
    binary
}

/// Pivoted length normalization.
/// Every weight is divided by `(1 - slope) * avgdl + slope * doclen`.
///
/// # Arguments
/// * `document` - weighted document
/// * `slope` - pivoting slope in `[0, 1]`
/// * `avgdl` - average document length of the collection the weights come from
/// * `doclen` - summed token character length of this document
pub fn pivot(document: &Document, slope: f64, avgdl: f64, doclen: f64) -> Document {
    let pivot = (1.0 - slope) * avgdl + slope * doclen;
    let mut pivoted = document.clone();
    if pivot <= 0.0 {
        return pivoted;
    }
    pivoted.map_values(|_, w| w / pivot);
    pivoted
}

/// Move a document from `source` ids to `target` ids.
/// Terms unknown to `target` are dropped together with their weight.
pub fn translate_document(document: &Document, source: &Vocabulary, target: &Vocabulary) -> Document {
    SparseVec::from_pairs(
        target.len(),
        document.raw_iter().filter_map(|(id, weight)| {
            source
                .token(id)
                .and_then(|token| target.id(token))
                .map(|target_id| (target_id, weight))
        }),
    )
}

/// Which id space a cached bag-of-words lives in
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum BowSpace {
    Shared,
    /// local vocabulary of the named collection
    Local(String),
}

/// Turns collections into weighted document vectors in the shared id space.
///
/// Raw bag-of-words vectors are cached per collection for the lifetime of the
/// encoder; one encoder lives for one evaluation call.
pub struct DocumentEncoder<'a> {
    context: &'a SharedContext,
    bow_cache: HashMap<(String, BowSpace), Arc<Vec<Document>>>,
}

impl<'a> DocumentEncoder<'a> {
    pub fn new(context: &'a SharedContext) -> Self {
        Self {
            context,
            bow_cache: HashMap::new(),
        }
    }

    /// Bag-of-words of `documents` against `vocab`, cached under `space`.
    fn bow(&mut self, documents: &Collection, space: BowSpace, vocab: &Vocabulary) -> Arc<Vec<Document>> {
        let key = (documents.name.clone(), space);
        if let Some(cached) = self.bow_cache.get(&key) {
            return Arc::clone(cached);
        }
        debug!("Building bag-of-words for {} ({:?}).", documents.name, key.1);
        let bows: Vec<Document> = documents.corpus.iter().map(|doc| vocab.doc2bow(doc)).collect();
        let bows = Arc::new(bows);
        self.bow_cache.insert(key, Arc::clone(&bows));
        bows
    }

    /// Encode `documents` for comparison against `reference`.
    ///
    /// TF-IDF statistics, the local vocabulary and `avgdl` come from `reference`
    /// (the training collection); the result is always in the shared id space.
    ///
    /// # Arguments
    /// * `documents` - collection to encode
    /// * `reference` - collection whose statistics weight the terms
    /// * `weights` - weighting scheme
    /// * `measure` - decides the unit norm of bag-of-words weights (L1 for word mover's)
    pub fn encode(
        &mut self,
        documents: &Collection,
        reference: &Collection,
        weights: &Weights,
        measure: &Measure,
    ) -> Vec<Document> {
        let context = self.context;
        let norm = match measure {
            Measure::Wmd => Norm::L1,
            Measure::InnerProduct => Norm::L2,
        };
        match weights {
            Weights::Bow => {
                let vocab = &context.vocabulary;
                self.bow(documents, BowSpace::Shared, vocab)
                    .iter()
                    .map(|doc| doc.clone().unit(norm))
                    .collect()
            }
            Weights::Binary => {
                let vocab = &context.vocabulary;
                self.bow(documents, BowSpace::Shared, vocab)
                    .iter()
                    .map(|doc| binarize(doc).unit(norm))
                    .collect()
            }
            Weights::Tfidf { slope } => {
                let local = &reference.vocabulary;
                let bows = self.bow(documents, BowSpace::Local(reference.name.clone()), local);
                let tfidf: TfidfModel = TfidfModel::from_vocabulary(local);
                bows.iter()
                    .zip(documents.corpus.iter())
                    .map(|(bow, tokens)| {
                        let weighted = tfidf.transform(bow);
                        let doclen = char_length(tokens) as f64;
                        let pivoted = pivot(&weighted, *slope, reference.avgdl, doclen);
                        translate_document(&pivoted, local, &context.vocabulary)
                    })
                    .collect()
            }
        }
    }
}
