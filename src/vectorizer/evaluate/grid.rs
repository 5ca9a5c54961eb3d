use crate::config::GridConfig;
use crate::vectorizer::termsim::TermSimilarityParams;

use super::config::{Hyperparams, SpaceKind, WeightsKind};

/// Every grid point relevant to a model, in search order.
///
/// The pivoting slope is searched for TF-IDF weights and the six term
/// similarity parameters for sparse soft VSM; other models get a single
/// empty point. Later dimensions vary fastest, so the order is slope,
/// symmetric, dominant, tfidf, nonzero limit, threshold, exponent.
///
/// # Arguments
/// * `space` - document representation
/// * `weights` - term weighting
/// * `grid` - searched values per dimension
pub fn grid_points(space: SpaceKind, weights: WeightsKind, grid: &GridConfig) -> Vec<Hyperparams> {
    let slopes: Vec<Option<f64>> = match weights {
        WeightsKind::Tfidf => grid.slopes.iter().copied().map(Some).collect(),
        _ => vec![None],
    };
    let term_similarity: Vec<Option<TermSimilarityParams>> = match space {
        SpaceKind::SparseSoftVsm => term_similarity_points(grid).into_iter().map(Some).collect(),
        _ => vec![None],
    };

    let mut points = Vec::with_capacity(slopes.len() * term_similarity.len());
    for slope in &slopes {
        for params in &term_similarity {
            points.push(Hyperparams {
                slope: *slope,
                term_similarity: params.clone(),
            });
        }
    }
    points
}

fn term_similarity_points(grid: &GridConfig) -> Vec<TermSimilarityParams> {
    let mut points = Vec::new();
    for &symmetric in &grid.symmetric {
        for &dominant in &grid.dominant {
            for &tfidf in &grid.tfidf {
                for &nonzero_limit in &grid.nonzero_limit {
                    for &threshold in &grid.threshold {
                        for &exponent in &grid.exponent {
                            points.push(TermSimilarityParams {
                                tfidf,
                                symmetric,
                                dominant,
                                nonzero_limit,
                                threshold,
                                exponent,
                            });
                        }
                    }
                }
            }
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_models_have_one_empty_point() {
        let points = grid_points(SpaceKind::Vsm, WeightsKind::Bow, &GridConfig::default());
        assert_eq!(points, vec![Hyperparams::default()]);
    }

    #[test]
    fn tfidf_searches_slopes_in_order() {
        let points = grid_points(SpaceKind::DenseSoftVsm, WeightsKind::Tfidf, &GridConfig::default());
        assert_eq!(points.len(), 11);
        assert_eq!(points[0].slope, Some(0.0));
        assert_eq!(points[10].slope, Some(1.0));
        assert!(points.iter().all(|p| p.term_similarity.is_none()));
    }

    #[test]
    fn sparse_soft_with_tfidf_is_the_full_product() {
        let grid = GridConfig::default();
        let points = grid_points(SpaceKind::SparseSoftVsm, WeightsKind::Tfidf, &grid);
        assert_eq!(points.len(), 11 * 2 * 2 * 2 * 4 * 4 * 4);
        // exponent varies fastest
        let first = points[0].term_similarity.as_ref().unwrap();
        let second = points[1].term_similarity.as_ref().unwrap();
        assert_eq!((first.exponent, second.exponent), (1, 2));
        assert_eq!(first.threshold, second.threshold);
        assert!(first.symmetric && first.dominant && first.tfidf);
        assert_eq!(first.nonzero_limit, 100);
    }
}
