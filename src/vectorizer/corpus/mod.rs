use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::utils::store::{read_cached, write_compressed};
use crate::vectorizer::token::{char_length, tokenize};
use crate::vectorizer::vocab::Vocabulary;

/// A named, tokenized document collection with optional class labels.
///
/// Created once from raw text and persisted; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    /// unique name, also the persistence key
    pub name: String,
    /// tokenized documents
    pub corpus: Vec<Vec<String>>,
    /// average summed token character length of a document
    pub avgdl: f64,
    /// collection-local vocabulary
    pub vocabulary: Vocabulary,
    /// one class label per document
    pub target: Option<Vec<u32>>,
}

impl Collection {
    /// Tokenize raw documents into a collection.
    ///
    /// # Arguments
    /// * `documents` - untokenized texts
    /// * `name` - unique name
    /// * `target` - class labels, one per document
    pub fn from_documents<I, S>(documents: I, name: &str, target: Option<Vec<u32>>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        info!("Reading collection {} from untokenized corpus.", name);
        let corpus: Vec<Vec<String>> = documents
            .into_iter()
            .map(|doc| tokenize(doc.as_ref()))
            .collect();
        Self::from_tokenized(corpus, name, target)
    }

    /// Build a collection from an already tokenized corpus.
    pub fn from_tokenized(corpus: Vec<Vec<String>>, name: &str, target: Option<Vec<u32>>) -> Result<Self> {
        if corpus.is_empty() {
            return Err(Error::EmptyCollection(name.to_string()));
        }
        if let Some(labels) = &target {
            if labels.len() != corpus.len() {
                return Err(Error::Config(format!(
                    "collection {} has {} documents but {} labels",
                    name,
                    corpus.len(),
                    labels.len()
                )));
            }
        }
        let total: usize = corpus.iter().map(|doc| char_length(doc)).sum();
        let avgdl = total as f64 / corpus.len() as f64;
        let vocabulary = Vocabulary::from_documents(&corpus);
        Ok(Self {
            name: name.to_string(),
            corpus,
            avgdl,
            vocabulary,
            target,
        })
    }

    /// Parse a labeled collection from `label<TAB>text` lines.
    /// Blank lines are skipped; the label must be an unsigned integer.
    pub fn from_labeled_lines(text: &str, name: &str) -> Result<Self> {
        let mut documents = Vec::new();
        let mut target = Vec::new();
        for (number, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let (label, document) = line.split_once('\t').ok_or_else(|| {
                Error::Config(format!("{name}: line {} has no tab-separated label", number + 1))
            })?;
            let label = label.trim().parse::<u32>().map_err(|e| {
                Error::Config(format!("{name}: line {} has invalid label {label:?}: {e}", number + 1))
            })?;
            target.push(label);
            documents.push(document);
        }
        Self::from_documents(documents, name, Some(target))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.corpus.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.corpus.is_empty()
    }

    /// labels, or an error naming the collection
    pub fn labels(&self) -> Result<&[u32]> {
        self.target
            .as_deref()
            .ok_or_else(|| Error::MissingLabels(self.name.clone()))
    }

    pub fn path(dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{name}.cbor.gz"))
    }

    /// Load a collection from the store.
    /// `None` when it was never built or its entry cannot be read.
    pub fn from_file(dir: &Path, name: &str) -> Option<Self> {
        let path = Self::path(dir, name);
        let loaded: Option<Collection> = read_cached(&path);
        if loaded.is_some() {
            info!("Loading collection from file {}.", path.display());
        }
        loaded.map(|mut c| {
            c.name = name.to_string();
            c
        })
    }

    pub fn to_file(&self, dir: &Path) -> Result<PathBuf> {
        let path = Self::path(dir, &self.name);
        info!("Saving collection to file {}.", path.display());
        write_compressed(&path, self)?;
        Ok(path)
    }

    /// Load from the store, or build with `build` and save on a miss.
    pub fn load_or_build<F>(dir: &Path, name: &str, build: F) -> Result<Self>
    where
        F: FnOnce() -> Result<Collection>,
    {
        if let Some(collection) = Self::from_file(dir, name) {
            return Ok(collection);
        }
        let collection = build()?;
        collection.to_file(dir)?;
        Ok(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avgdl_is_mean_character_length() {
        let c = Collection::from_documents(["ab cd", "efg"], "t", None).unwrap();
        assert_eq!(c.len(), 2);
        assert_eq!(c.avgdl, 3.5);
        assert_eq!(c.vocabulary.len(), 3);
    }

    #[test]
    fn empty_collection_is_rejected() {
        let docs: Vec<&str> = Vec::new();
        assert!(matches!(
            Collection::from_documents(docs, "empty", None),
            Err(Error::EmptyCollection(_))
        ));
    }

    #[test]
    fn label_count_must_match() {
        let res = Collection::from_documents(["a", "b"], "t", Some(vec![1]));
        assert!(matches!(res, Err(Error::Config(_))));
    }

    #[test]
    fn labeled_lines_are_split_on_tab() {
        let c = Collection::from_labeled_lines("1\tThe cat\n\n0\ta dog barks\n", "pets").unwrap();
        assert_eq!(c.labels().unwrap(), &[1, 0]);
        assert_eq!(c.corpus[1], vec!["a", "dog", "barks"]);
        assert!(matches!(
            Collection::from_labeled_lines("x\tcat", "bad"),
            Err(Error::Config(_))
        ));
        assert!(Collection::from_labeled_lines("no label here", "bad").is_err());
    }

    #[test]
    fn saved_collection_loads_identically() {
        let dir = tempfile::tempdir().unwrap();
        let c = Collection::from_documents(["the cat", "a dog"], "pets", Some(vec![0, 1])).unwrap();
        c.to_file(dir.path()).unwrap();
        let loaded = Collection::from_file(dir.path(), "pets");
        assert_eq!(loaded, Some(c));
    }

    #[test]
    fn load_or_build_only_builds_on_miss() {
        let dir = tempfile::tempdir().unwrap();
        let mut calls = 0;
        for _ in 0..2 {
            let c = Collection::load_or_build(dir.path(), "once", || {
                calls += 1;
                Collection::from_documents(["x y"], "once", None)
            })
            .unwrap();
            assert_eq!(c.name, "once");
        }
        assert_eq!(calls, 1);
        assert!(Collection::from_file(dir.path(), "missing").is_none());
    }

    #[test]
    fn corrupt_entry_is_rebuilt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(Collection::path(dir.path(), "c"), b"").unwrap();
        let mut calls = 0;
        let c = Collection::load_or_build(dir.path(), "c", || {
            calls += 1;
            Collection::from_documents(["x y"], "c", None)
        })
        .unwrap();
        assert_eq!(calls, 1);
        assert_eq!(Collection::from_file(dir.path(), "c"), Some(c));
    }
}
