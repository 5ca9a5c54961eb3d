use std::collections::{BTreeSet, HashMap};

use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{GridConfig, HarnessConfig};
use crate::error::{Error, Result};
use crate::utils::speed::SpeedLogs;
use crate::vectorizer::corpus::Collection;
use crate::vectorizer::encoder::DocumentEncoder;

use super::config::{MeasureKind, SimilarityConfig, SpaceKind, WeightsKind};
use super::grid::grid_points;
use super::similarity::SimilarityEngine;

/// Outcome of classifying one collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// share of correctly predicted labels
    pub accuracy: f64,
    pub y_true: Vec<u32>,
    pub y_pred: Vec<u32>,
    pub config: SimilarityConfig,
    /// neighbor count; `None` for the random baseline
    pub k: Option<usize>,
    pub speed_logs: SpeedLogs,
}

impl ClassificationResult {
    pub fn from_predictions(
        y_true: Vec<u32>,
        y_pred: Vec<u32>,
        config: SimilarityConfig,
        k: Option<usize>,
        speed_logs: SpeedLogs,
    ) -> Self {
        debug_assert_eq!(y_true.len(), y_pred.len());
        let correct = y_true.iter().zip(&y_pred).filter(|(t, p)| t == p).count();
        let accuracy = if y_true.is_empty() {
            0.0
        } else {
            correct as f64 / y_true.len() as f64
        };
        Self {
            accuracy,
            y_true,
            y_pred,
            config,
            k,
            speed_logs,
        }
    }

    /// k-NN classification of every query row of a similarity matrix.
    ///
    /// # Arguments
    /// * `similarities` - `(queries, train)` similarity matrix
    /// * `train_labels` - label of every train document (matrix column)
    /// * `query_labels` - true label of every query (matrix row)
    /// * `k` - neighbor count
    pub fn from_similarities(
        similarities: &Array2<f64>,
        train_labels: &[u32],
        query_labels: &[u32],
        k: usize,
        config: SimilarityConfig,
        speed_logs: SpeedLogs,
    ) -> Self {
        debug_assert_eq!(similarities.dim(), (query_labels.len(), train_labels.len()));
        let y_pred = similarities
            .rows()
            .into_iter()
            .map(|row| knn_predict(row, train_labels, k))
            .collect();
        Self::from_predictions(query_labels.to_vec(), y_pred, config, Some(k), speed_logs)
    }
}

/// Majority label among the `k` most similar train documents.
///
/// Neighbors are ranked by decreasing similarity, ties by column order.
/// A tied vote goes to the label whose best neighbor ranks highest.
///
/// # Arguments
/// * `similarities` - similarity of one query to every train document
/// * `labels` - label of every train document
/// * `k` - neighbor count, clamped to the number of train documents
pub fn knn_predict(similarities: ArrayView1<'_, f64>, labels: &[u32], k: usize) -> u32 {
    let mut ranked: Vec<usize> = (0..labels.len()).collect();
    ranked.sort_by(|&a, &b| similarities[b].total_cmp(&similarities[a]));

    // label -> (votes, rank of its best neighbor)
    let mut votes: HashMap<u32, (usize, usize)> = HashMap::new();
    for (rank, &neighbor) in ranked.iter().take(k).enumerate() {
        let entry = votes.entry(labels[neighbor]).or_insert((0, rank));
        entry.0 += 1;
    }
    votes
        .into_iter()
        .max_by(|(_, (va, ra)), (_, (vb, rb))| va.cmp(vb).then(rb.cmp(ra)))
        .map_or(0, |(label, _)| label)
}

/// Grid-searching k-NN evaluator.
///
/// Every model is tuned on a validation collection over its grid points and
/// neighbor counts, then scored once on the test collection.
pub struct Evaluator<'a> {
    engine: SimilarityEngine<'a>,
    k_values: Vec<usize>,
    grid: GridConfig,
    random_seed: u64,
}

impl<'a> Evaluator<'a> {
    pub fn new(engine: SimilarityEngine<'a>, config: &HarnessConfig) -> Self {
        Self {
            engine: engine.with_random_seed(config.random_seed),
            k_values: config.k_values.clone(),
            grid: config.grid.clone(),
            random_seed: config.random_seed,
        }
    }

    /// Tune a model on `validation` and report its accuracy on `test`.
    ///
    /// # Arguments
    /// * `train` - labeled collection the neighbors come from
    /// * `validation` - labeled collection the grid search is scored on
    /// * `test` - labeled collection of the final result
    /// * `space`, `weights`, `measure` - model
    /// * `num_bits` - embedding quantization level
    ///
    /// # Returns
    /// * `ClassificationResult` - test-set result of the best grid point and k
    #[allow(clippy::too_many_arguments)]
    pub fn evaluate(
        &self,
        train: &Collection,
        validation: &Collection,
        test: &Collection,
        space: SpaceKind,
        weights: WeightsKind,
        measure: MeasureKind,
        num_bits: u32,
    ) -> Result<ClassificationResult> {
        if space == SpaceKind::Random {
            return self.random_baseline(test);
        }
        let points = grid_points(space, weights, &self.grid);
        let first = points
            .first()
            .ok_or_else(|| Error::Config("empty hyperparameter grid".to_string()))?;
        // reject unsupported combinations before any similarity is computed
        SimilarityConfig::new(space, weights, measure, num_bits, first)?;

        let train_labels = train.labels()?;
        let validation_labels = validation.labels()?;
        let test_labels = test.labels()?;

        info!(
            "Grid searching on dataset {} with space={}, weights={}, measure={}, num_bits={} ({} grid points).",
            train.name,
            space,
            weights,
            measure,
            num_bits,
            points.len()
        );
        let mut encoder = DocumentEncoder::new(self.engine.context());
        let mut speed_logs = SpeedLogs::new();
        let mut best: Option<(f64, SimilarityConfig, usize)> = None;

        for hyper in &points {
            let config = SimilarityConfig::new(space, weights, measure, num_bits, hyper)?;
            let similarities =
                self.engine
                    .similarities(train, validation, &config, &mut encoder, &mut speed_logs)?;
            for &k in &self.k_values {
                debug!("Finding k={} nearest neighbors.", k);
                let result = ClassificationResult::from_similarities(
                    &similarities,
                    train_labels,
                    validation_labels,
                    k,
                    config.clone(),
                    SpeedLogs::new(),
                );
                if best.as_ref().map_or(true, |(accuracy, _, _)| result.accuracy > *accuracy) {
                    best = Some((result.accuracy, config.clone(), k));
                }
            }
        }

        let (accuracy, config, k) =
            best.ok_or_else(|| Error::Config("no neighbor counts to evaluate".to_string()))?;
        info!("Best validation accuracy {:.4} with k={} and {:?}.", accuracy, k, config);

        let similarities = self
            .engine
            .similarities(train, test, &config, &mut encoder, &mut speed_logs)?;
        let result =
            ClassificationResult::from_similarities(&similarities, train_labels, test_labels, k, config, speed_logs);
        info!("Test accuracy on {}: {:.4}.", test.name, result.accuracy);
        Ok(result)
    }

    /// Labels drawn uniformly from the test labels with a fixed seed.
    pub fn random_baseline(&self, test: &Collection) -> Result<ClassificationResult> {
        let y_true = test.labels()?.to_vec();
        let classes: Vec<u32> = y_true.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        let mut rng = StdRng::seed_from_u64(self.random_seed);
        let y_pred = y_true
            .iter()
            .map(|_| classes[rng.random_range(0..classes.len())])
            .collect();
        Ok(ClassificationResult::from_predictions(
            y_true,
            y_pred,
            SimilarityConfig::Random,
            None,
            SpeedLogs::new(),
        ))
    }
}
