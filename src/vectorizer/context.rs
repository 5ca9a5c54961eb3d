use std::collections::BTreeMap;
use std::fs;

use tracing::info;

use crate::config::HarnessConfig;
use crate::error::{Error, Result};
use crate::vectorizer::corpus::Collection;
use crate::vectorizer::embedding::{EmbeddingMatrix, KeyedVectors};
use crate::vectorizer::tfidf::TfidfModel;
use crate::vectorizer::vocab::Vocabulary;

/// Read-only state shared by every similarity computation of a run.
///
/// Holds the shared vocabulary (the id space all similarities are computed in),
/// a TF-IDF model over it, and one embedding table per quantization level.
/// Built once and passed by reference; nothing mutates it afterwards.
#[derive(Debug)]
pub struct SharedContext {
    pub vocabulary: Vocabulary,
    pub tfidf: TfidfModel,
    embeddings: BTreeMap<u32, EmbeddingMatrix>,
}

impl SharedContext {
    /// # Arguments
    /// * `vocabulary` - shared vocabulary
    /// * `embeddings` - word vectors keyed by quantization level (`num_bits`)
    pub fn new(vocabulary: Vocabulary, embeddings: &BTreeMap<u32, KeyedVectors>) -> Self {
        let tables = embeddings
            .iter()
            .map(|(&num_bits, kv)| (num_bits, EmbeddingMatrix::translate(kv, &vocabulary)))
            .collect();
        Self::from_tables(vocabulary, tables)
    }

    /// Use prebuilt embedding tables; each must have one row per vocabulary term.
    pub fn from_tables(vocabulary: Vocabulary, embeddings: BTreeMap<u32, EmbeddingMatrix>) -> Self {
        debug_assert!(embeddings.values().all(|t| t.len() == vocabulary.len()));
        let tfidf = TfidfModel::from_vocabulary(&vocabulary);
        Self {
            vocabulary,
            tfidf,
            embeddings,
        }
    }

    /// Build from the harness configuration: the reference corpus (one document
    /// per line, cached in the collection store) and the word-vector files.
    pub fn load(config: &HarnessConfig) -> Result<Self> {
        let reference_path = config
            .reference_corpus
            .as_deref()
            .ok_or_else(|| Error::Config("reference_corpus is not set".to_string()))?;
        let name = reference_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("reference")
            .to_string();
        let reference = Collection::load_or_build(&config.corpora_dir, &name, || {
            let text = fs::read_to_string(reference_path).map_err(|e| Error::io(reference_path, e))?;
            Collection::from_documents(text.lines(), &name, None)
        })?;
        info!(
            "Shared vocabulary from {} has {} terms.",
            reference.name,
            reference.vocabulary.len()
        );

        let mut embeddings = BTreeMap::new();
        for source in &config.embeddings {
            let kv = KeyedVectors::load_word2vec_format(&source.path)?;
            embeddings.insert(source.num_bits, kv);
        }
        Ok(Self::new(reference.vocabulary, &embeddings))
    }

    /// embedding table of a quantization level
    pub fn embedding(&self, num_bits: u32) -> Result<&EmbeddingMatrix> {
        self.embeddings
            .get(&num_bits)
            .ok_or(Error::MissingEmbeddings(num_bits))
    }

    pub fn quantization_levels(&self) -> impl Iterator<Item = u32> + '_ {
        self.embeddings.keys().copied()
    }
}
