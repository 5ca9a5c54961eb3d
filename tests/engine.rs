use std::collections::BTreeMap;

use indexmap::IndexSet;
use ndarray::Array2;
use soft_vsm_eval::utils::speed::SpeedLogs;
use soft_vsm_eval::{
    Collection, DocumentEncoder, Error, Evaluator, HarnessConfig, Hyperparams, KeyedVectors, MeasureKind,
    SharedContext, SimilarityConfig, SimilarityEngine, SpaceKind, TermSimilarityCache, TermSimilarityParams,
    Vocabulary, WeightsKind,
};

const REFERENCE: &[&str] = &[
    "the cat sat on the mat",
    "a dog sat on the log",
    "alpha beta",
    "gamma delta",
];

fn context() -> SharedContext {
    let corpus: Vec<Vec<String>> = REFERENCE
        .iter()
        .map(|text| soft_vsm_eval::vectorizer::token::tokenize(text))
        .collect();
    let vocabulary = Vocabulary::from_documents(&corpus);
    // "delta" and "log" have no vector
    let vectors: &[(&str, [f32; 3])] = &[
        ("the", [0.0, 0.0, 1.0]),
        ("cat", [1.0, 0.1, 0.0]),
        ("dog", [0.9, 0.2, 0.0]),
        ("sat", [0.2, 1.0, 0.1]),
        ("on", [0.0, 0.3, 0.9]),
        ("mat", [0.7, 0.0, 0.7]),
        ("a", [0.1, 0.1, 0.9]),
        ("alpha", [0.0, 1.0, 0.0]),
        ("beta", [0.1, 0.9, 0.0]),
        ("gamma", [0.5, 0.5, 0.5]),
    ];
    let tokens: IndexSet<String> = vectors.iter().map(|(t, _)| t.to_string()).collect();
    let flat: Vec<f32> = vectors.iter().flat_map(|(_, v)| v.iter().copied()).collect();
    let kv = KeyedVectors::new(tokens, Array2::from_shape_vec((vectors.len(), 3), flat).unwrap());
    SharedContext::new(vocabulary, &BTreeMap::from([(32, kv)]))
}

fn collection(name: &str, texts: &[&str], labels: Option<Vec<u32>>) -> Collection {
    Collection::from_documents(texts, name, labels).unwrap()
}

fn config(space: SpaceKind, weights: WeightsKind, measure: MeasureKind) -> SimilarityConfig {
    let hyper = Hyperparams {
        slope: Some(0.2),
        term_similarity: Some(TermSimilarityParams {
            tfidf: true,
            symmetric: true,
            dominant: false,
            nonzero_limit: 100,
            threshold: 0.0,
            exponent: 1,
        }),
    };
    SimilarityConfig::new(space, weights, measure, 32, &hyper).unwrap()
}

fn similarities(
    context: &SharedContext,
    cache: &TermSimilarityCache,
    collection: &Collection,
    queries: &Collection,
    config: &SimilarityConfig,
) -> Array2<f64> {
    let engine = SimilarityEngine::new(context, cache, 2);
    let mut encoder = DocumentEncoder::new(context);
    let mut logs = SpeedLogs::new();
    engine
        .similarities(collection, queries, config, &mut encoder, &mut logs)
        .unwrap()
}

#[test]
fn exact_vsm_of_identical_documents_is_one() {
    let ctx = context();
    let dir = tempfile::tempdir().unwrap();
    let cache = TermSimilarityCache::new(dir.path());
    let a = collection("a", &["the cat sat on the mat"], None);
    let b = collection("b", &["the cat sat on the mat"], None);
    let sims = similarities(
        &ctx,
        &cache,
        &a,
        &b,
        &config(SpaceKind::Vsm, WeightsKind::Bow, MeasureKind::InnerProduct),
    );
    assert_eq!(sims.dim(), (1, 1));
    assert!((sims[[0, 0]] - 1.0).abs() < 1e-12);
}

#[test]
fn disjoint_documents_score_zero_under_vsm_and_wmd() {
    let ctx = context();
    let dir = tempfile::tempdir().unwrap();
    let cache = TermSimilarityCache::new(dir.path());
    let a = collection("a", &["alpha beta"], None);
    let b = collection("b", &["gamma delta"], None);
    for measure in [MeasureKind::InnerProduct, MeasureKind::Wmd] {
        let sims = similarities(&ctx, &cache, &a, &b, &config(SpaceKind::Vsm, WeightsKind::Bow, measure));
        assert_eq!(sims[[0, 0]], 0.0, "measure {measure}");
    }
}

#[test]
fn word_movers_similarity_of_a_copy_is_infinite() {
    let ctx = context();
    let dir = tempfile::tempdir().unwrap();
    let cache = TermSimilarityCache::new(dir.path());
    let a = collection("a", &["the cat sat on the mat", "a dog sat on the log"], None);
    let b = collection("b", &["a dog sat on the log", "the cat sat on the mat", "the cat"], None);
    for weights in [WeightsKind::Bow, WeightsKind::Binary, WeightsKind::Tfidf] {
        let sims = similarities(&ctx, &cache, &a, &b, &config(SpaceKind::Vsm, weights, MeasureKind::Wmd));
        assert_eq!(sims.dim(), (3, 2));
        assert_eq!(sims[[0, 1]], f64::INFINITY, "weights {weights}");
        assert_eq!(sims[[1, 0]], f64::INFINITY, "weights {weights}");
        assert!(sims[[2, 0]].is_finite() && sims[[2, 0]] > 0.0, "weights {weights}");
    }
}

#[test]
fn soft_models_are_finite_and_credit_related_terms() {
    let ctx = context();
    let dir = tempfile::tempdir().unwrap();
    let cache = TermSimilarityCache::new(dir.path());
    let a = collection("a", &["the cat sat", "delta log", "alpha beta"], None);
    let b = collection("b", &["dog", "delta", "zebra"], None);
    for space in [SpaceKind::SparseSoftVsm, SpaceKind::DenseSoftVsm] {
        for weights in [WeightsKind::Bow, WeightsKind::Binary, WeightsKind::Tfidf] {
            let sims = similarities(&ctx, &cache, &a, &b, &config(space, weights, MeasureKind::InnerProduct));
            assert_eq!(sims.dim(), (3, 3));
            assert!(sims.iter().all(|v| v.is_finite()), "{space}/{weights}: {sims:?}");
            // "zebra" is unknown to the shared vocabulary
            assert!(sims.row(2).iter().all(|&v| v == 0.0));
        }
    }
    let sims = similarities(
        &ctx,
        &cache,
        &a,
        &b,
        &config(SpaceKind::SparseSoftVsm, WeightsKind::Bow, MeasureKind::InnerProduct),
    );
    // "dog" shares no term with "the cat sat" but is close to "cat"
    assert!(sims[[0, 0]] > 0.0);
    assert!(sims[[0, 0]] > sims[[0, 2]]);
}

#[test]
fn term_matrices_are_built_once_per_parameters() {
    let ctx = context();
    let dir = tempfile::tempdir().unwrap();
    let cache = TermSimilarityCache::new(dir.path());
    let a = collection("a", &["the cat sat"], None);
    let b = collection("b", &["a dog"], None);
    let soft = config(SpaceKind::SparseSoftVsm, WeightsKind::Bow, MeasureKind::InnerProduct);
    let first = similarities(&ctx, &cache, &a, &b, &soft);
    let second = similarities(&ctx, &cache, &a, &b, &soft);
    assert_eq!(first, second);
    assert_eq!(cache.builds(), 1);
}

#[test]
fn nearest_training_document_decides_with_k_one() {
    let ctx = context();
    let dir = tempfile::tempdir().unwrap();
    let cache = TermSimilarityCache::new(dir.path());
    let train = collection("train", &["the cat sat on the mat", "alpha beta"], Some(vec![7, 3]));
    let validation = collection("validation", &["the mat", "beta"], Some(vec![7, 3]));
    let test = collection("test", &["cat sat", "alpha"], Some(vec![7, 3]));

    let harness = HarnessConfig {
        k_values: vec![1],
        ..HarnessConfig::default()
    };
    let evaluator = Evaluator::new(SimilarityEngine::new(&ctx, &cache, 2), &harness);
    let result = evaluator
        .evaluate(
            &train,
            &validation,
            &test,
            SpaceKind::Vsm,
            WeightsKind::Bow,
            MeasureKind::InnerProduct,
            32,
        )
        .unwrap();
    assert_eq!(result.y_pred, vec![7, 3]);
    assert_eq!(result.accuracy, 1.0);
    assert_eq!(result.k, Some(1));
    assert!(!result.speed_logs.is_empty());
}

#[test]
fn tfidf_grid_search_picks_a_slope() {
    let ctx = context();
    let dir = tempfile::tempdir().unwrap();
    let cache = TermSimilarityCache::new(dir.path());
    let train = collection("train", &["the cat sat on the mat", "alpha beta"], Some(vec![0, 1]));
    let validation = collection("validation", &["cat mat", "alpha"], Some(vec![0, 1]));
    let test = collection("test", &["the cat", "beta beta"], Some(vec![0, 1]));
    let mut harness = HarnessConfig::default();
    harness.grid.slopes = vec![0.0, 0.5, 1.0];
    let evaluator = Evaluator::new(SimilarityEngine::new(&ctx, &cache, 2), &harness);
    let result = evaluator
        .evaluate(
            &train,
            &validation,
            &test,
            SpaceKind::DenseSoftVsm,
            WeightsKind::Tfidf,
            MeasureKind::InnerProduct,
            32,
        )
        .unwrap();
    assert_eq!(result.y_true, vec![0, 1]);
    match result.config {
        SimilarityConfig::Model(model) => assert!(matches!(
            model.weights,
            soft_vsm_eval::Weights::Tfidf { slope } if slope == 0.0
        )),
        SimilarityConfig::Random => panic!("expected a model"),
    }
}

#[test]
fn random_baseline_is_reproducible() {
    let ctx = context();
    let dir = tempfile::tempdir().unwrap();
    let cache = TermSimilarityCache::new(dir.path());
    let train = collection("train", &["cat"], Some(vec![1]));
    let test = collection("test", &["a", "b", "c", "d", "e", "f"], Some(vec![4, 9, 4, 9, 4, 2]));
    let evaluator = Evaluator::new(SimilarityEngine::new(&ctx, &cache, 1), &HarnessConfig::default());
    let run = || {
        evaluator
            .evaluate(
                &train,
                &train,
                &test,
                SpaceKind::Random,
                WeightsKind::Random,
                MeasureKind::Random,
                32,
            )
            .unwrap()
    };
    let first = run();
    assert_eq!(first, run());
    assert!(first.config.is_random());
    assert_eq!(first.k, None);
    assert!(first.y_pred.iter().all(|label| [2, 4, 9].contains(label)));
}

#[test]
fn random_space_is_the_baseline_for_any_weights_and_measure() {
    let ctx = context();
    let dir = tempfile::tempdir().unwrap();
    let cache = TermSimilarityCache::new(dir.path());
    let train = collection("train", &["cat"], Some(vec![1]));
    let test = collection("test", &["a", "b", "c"], Some(vec![4, 9, 4]));
    let evaluator = Evaluator::new(SimilarityEngine::new(&ctx, &cache, 1), &HarnessConfig::default());
    let baseline = evaluator.random_baseline(&test).unwrap();
    let result = evaluator
        .evaluate(
            &train,
            &train,
            &test,
            SpaceKind::Random,
            WeightsKind::Bow,
            MeasureKind::InnerProduct,
            32,
        )
        .unwrap();
    assert_eq!(result, baseline);
    let result = evaluator
        .evaluate(&train, &train, &test, SpaceKind::Random, WeightsKind::Tfidf, MeasureKind::Wmd, 32)
        .unwrap();
    assert_eq!(result, baseline);
    assert_eq!(cache.builds(), 0);
}

#[test]
fn unsupported_combinations_fail_before_any_work() {
    let ctx = context();
    let dir = tempfile::tempdir().unwrap();
    let cache = TermSimilarityCache::new(dir.path());
    let train = collection("train", &["cat"], Some(vec![1]));
    let evaluator = Evaluator::new(SimilarityEngine::new(&ctx, &cache, 1), &HarnessConfig::default());
    let err = evaluator
        .evaluate(
            &train,
            &train,
            &train,
            SpaceKind::SparseSoftVsm,
            WeightsKind::Bow,
            MeasureKind::Wmd,
            32,
        )
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedCombination { .. }));
    assert_eq!(cache.builds(), 0);
}

#[test]
fn unlabeled_collections_cannot_be_classified() {
    let ctx = context();
    let dir = tempfile::tempdir().unwrap();
    let cache = TermSimilarityCache::new(dir.path());
    let train = collection("train", &["cat"], None);
    let evaluator = Evaluator::new(SimilarityEngine::new(&ctx, &cache, 1), &HarnessConfig::default());
    let err = evaluator
        .evaluate(
            &train,
            &train,
            &train,
            SpaceKind::Vsm,
            WeightsKind::Bow,
            MeasureKind::InnerProduct,
            32,
        )
        .unwrap_err();
    assert!(matches!(err, Error::MissingLabels(name) if name == "train"));
}
