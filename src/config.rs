use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// seed of the random baseline and of content-blind scores unless configured
pub const DEFAULT_RANDOM_SEED: u64 = 42;

/// One word-vector file and the quantization level it provides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingSource {
    pub num_bits: u32,
    pub path: PathBuf,
}

/// Hyperparameter values searched by the evaluator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// pivoting slopes for TF-IDF weighting
    pub slopes: Vec<f64>,
    pub symmetric: Vec<bool>,
    pub dominant: Vec<bool>,
    pub tfidf: Vec<bool>,
    pub nonzero_limit: Vec<usize>,
    pub threshold: Vec<f64>,
    pub exponent: Vec<i32>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            slopes: (0..=10).map(|i| i as f64 / 10.0).collect(),
            symmetric: vec![true, false],
            dominant: vec![true, false],
            tfidf: vec![true, false],
            nonzero_limit: vec![100, 200, 400, 800],
            threshold: vec![-1.0, -0.5, 0.0, 0.5],
            exponent: vec![1, 2, 3, 4],
        }
    }
}

/// Harness configuration, read from TOML. Every field has a default.
///
/// ```toml
/// corpora_dir = "corpora"
/// matrices_dir = "matrices"
/// reference_corpus = "corpora/fil8"
///
/// [[embeddings]]
/// num_bits = 32
/// path = "vectors/32b_200d_vectors.txt.gz"
///
/// [grid]
/// nonzero_limit = [100, 200]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// collection store
    pub corpora_dir: PathBuf,
    /// term similarity matrix store
    pub matrices_dir: PathBuf,
    /// raw text (one document per line) the shared vocabulary is built from
    pub reference_corpus: Option<PathBuf>,
    pub embeddings: Vec<EmbeddingSource>,
    /// word mover's worker threads; 0 means one per hardware thread
    pub num_workers: usize,
    /// neighbor counts tried by k-NN classification
    pub k_values: Vec<usize>,
    /// seed of the random baseline
    pub random_seed: u64,
    pub grid: GridConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            corpora_dir: PathBuf::from("corpora"),
            matrices_dir: PathBuf::from("matrices"),
            reference_corpus: None,
            embeddings: Vec::new(),
            num_workers: 0,
            k_values: (1..=19).step_by(2).collect(),
            random_seed: DEFAULT_RANDOM_SEED,
            grid: GridConfig::default(),
        }
    }
}

impl HarnessConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: HarnessConfig = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.k_values.is_empty() || self.k_values.contains(&0) {
            return Err(Error::Config("k_values must be non-empty and positive".to_string()));
        }
        let grid = &self.grid;
        let empty = [
            ("slopes", grid.slopes.is_empty()),
            ("symmetric", grid.symmetric.is_empty()),
            ("dominant", grid.dominant.is_empty()),
            ("tfidf", grid.tfidf.is_empty()),
            ("nonzero_limit", grid.nonzero_limit.is_empty()),
            ("threshold", grid.threshold.is_empty()),
            ("exponent", grid.exponent.is_empty()),
        ];
        if let Some((name, _)) = empty.iter().find(|(_, is_empty)| *is_empty) {
            return Err(Error::Config(format!("grid.{name} must not be empty")));
        }
        if grid.slopes.iter().any(|s| !(0.0..=1.0).contains(s)) {
            return Err(Error::Config("slopes must lie in [0, 1]".to_string()));
        }
        Ok(())
    }

    /// worker pool size for word mover's similarity
    pub fn worker_count(&self) -> usize {
        if self.num_workers > 0 {
            self.num_workers
        } else {
            std::thread::available_parallelism().map_or(1, |n| n.get())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_standard_grid() {
        let config = HarnessConfig::default();
        assert_eq!(config.k_values, vec![1, 3, 5, 7, 9, 11, 13, 15, 17, 19]);
        assert_eq!(config.grid.slopes.len(), 11);
        assert_eq!(config.grid.slopes[10], 1.0);
        assert_eq!(config.random_seed, DEFAULT_RANDOM_SEED);
        assert!(config.worker_count() >= 1);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = HarnessConfig::from_toml(
            r#"
            matrices_dir = "/tmp/m"
            num_workers = 3

            [[embeddings]]
            num_bits = 1
            path = "v1.txt"

            [grid]
            exponent = [2]
            "#,
        )
        .unwrap();
        assert_eq!(config.matrices_dir, PathBuf::from("/tmp/m"));
        assert_eq!(config.worker_count(), 3);
        assert_eq!(config.embeddings[0].num_bits, 1);
        assert_eq!(config.grid.exponent, vec![2]);
        assert_eq!(config.grid.nonzero_limit, vec![100, 200, 400, 800]);
        assert_eq!(config.corpora_dir, PathBuf::from("corpora"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(HarnessConfig::from_toml("k_values = []"), Err(Error::Config(_))));
        assert!(matches!(
            HarnessConfig::from_toml("[grid]\nslopes = [1.5]"),
            Err(Error::Config(_))
        ));
        assert!(matches!(HarnessConfig::from_toml("num_workers = \"x\""), Err(Error::Config(_))));
        let err = HarnessConfig::from_toml("[grid]\nexponent = []").unwrap_err();
        assert_eq!(err.to_string(), "invalid configuration: grid.exponent must not be empty");
    }
}
