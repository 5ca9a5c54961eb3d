use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::vectorizer::termsim::TermSimilarityParams;

macro_rules! kind_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!(
                        "unknown {} {:?}, expected one of: {}",
                        stringify!($name),
                        other,
                        [$($text),+].join(", ")
                    )),
                }
            }
        }
    };
}

kind_enum! {
    /// document representation
    SpaceKind {
        Vsm => "vsm",
        SparseSoftVsm => "sparse_soft_vsm",
        DenseSoftVsm => "dense_soft_vsm",
        Random => "random",
    }
}

kind_enum! {
    /// term weighting scheme
    WeightsKind {
        Bow => "bow",
        Binary => "binary",
        Tfidf => "tfidf",
        Random => "random",
    }
}

kind_enum! {
    /// similarity measure
    MeasureKind {
        InnerProduct => "inner_product",
        Wmd => "wmd",
        Random => "random",
    }
}

/// Document representation with its own parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "space", rename_all = "snake_case")]
pub enum Space {
    Vsm,
    DenseSoftVsm,
    SparseSoftVsm(TermSimilarityParams),
}

/// Term weighting with its own parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "weights", rename_all = "snake_case")]
pub enum Weights {
    Bow,
    Binary,
    /// SMART dtn TF-IDF with pivoted length normalization
    Tfidf { slope: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    InnerProduct,
    Wmd,
}

/// A fully specified, valid model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub space: Space,
    pub weights: Weights,
    pub measure: Measure,
    /// quantization level of the embeddings used by soft and word mover's models
    pub num_bits: u32,
}

/// Hyperparameters of one grid point. Only those relevant to the chosen
/// weights and space need to be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hyperparams {
    pub slope: Option<f64>,
    pub term_similarity: Option<TermSimilarityParams>,
}

/// Similarity request configuration.
///
/// Only constructible through [`SimilarityConfig::new`], which rejects every
/// space/weights/measure combination the engine has no model for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityConfig {
    /// content-blind baseline
    Random,
    Model(ModelConfig),
}

impl SimilarityConfig {
    /// Validate a configuration triple and attach its hyperparameters.
    ///
    /// # Arguments
    /// * `space`, `weights`, `measure` - requested model
    /// * `num_bits` - embedding quantization level
    /// * `hyper` - grid point; must carry the slope for TF-IDF and the term
    ///   similarity parameters for sparse soft VSM
    pub fn new(
        space: SpaceKind,
        weights: WeightsKind,
        measure: MeasureKind,
        num_bits: u32,
        hyper: &Hyperparams,
    ) -> Result<Self> {
        use MeasureKind as M;
        use SpaceKind as S;
        use WeightsKind as W;

        let unsupported = || Error::UnsupportedCombination {
            space: space.to_string(),
            weights: weights.to_string(),
            measure: measure.to_string(),
        };

        let measure = match (space, weights, measure) {
            // a random space ignores content, so weights and measure do not matter
            (S::Random, _, _) => return Ok(SimilarityConfig::Random),
            (_, W::Random, _) | (_, _, M::Random) => return Err(unsupported()),
            (S::Vsm, _, M::Wmd) => Measure::Wmd,
            (S::DenseSoftVsm | S::SparseSoftVsm, _, M::Wmd) => return Err(unsupported()),
            (_, _, M::InnerProduct) => Measure::InnerProduct,
        };

        let weights = match weights {
            W::Bow => Weights::Bow,
            W::Binary => Weights::Binary,
            W::Tfidf => {
                let slope = hyper
                    .slope
                    .ok_or_else(|| Error::Config("tfidf weights need a pivoting slope".to_string()))?;
                Weights::Tfidf { slope }
            }
            W::Random => return Err(unsupported()),
        };

        let space = match space {
            S::Vsm => Space::Vsm,
            S::DenseSoftVsm => Space::DenseSoftVsm,
            S::SparseSoftVsm => {
                let params = hyper.term_similarity.clone().ok_or_else(|| {
                    Error::Config("sparse_soft_vsm needs term similarity parameters".to_string())
                })?;
                Space::SparseSoftVsm(params)
            }
            S::Random => return Err(unsupported()),
        };

        Ok(SimilarityConfig::Model(ModelConfig {
            space,
            weights,
            measure,
            num_bits,
        }))
    }

    pub fn is_random(&self) -> bool {
        matches!(self, SimilarityConfig::Random)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sparse_params() -> TermSimilarityParams {
        TermSimilarityParams {
            tfidf: false,
            symmetric: true,
            dominant: false,
            nonzero_limit: 100,
            threshold: 0.0,
            exponent: 1,
        }
    }

    #[test]
    fn kinds_parse_from_their_names() {
        for kind in SpaceKind::ALL {
            assert_eq!(kind.as_str().parse::<SpaceKind>().unwrap(), *kind);
        }
        assert_eq!("inner_product".parse::<MeasureKind>().unwrap(), MeasureKind::InnerProduct);
        assert!("cosine".parse::<MeasureKind>().is_err());
    }

    #[test]
    fn every_valid_triple_builds() {
        let hyper = Hyperparams {
            slope: Some(0.2),
            term_similarity: Some(sparse_params()),
        };
        let mut valid = 0;
        for &s in SpaceKind::ALL {
            for &w in WeightsKind::ALL {
                for &m in MeasureKind::ALL {
                    if SimilarityConfig::new(s, w, m, 32, &hyper).is_ok() {
                        valid += 1;
                    }
                }
            }
        }
        // every random space + 3 spaces x 3 weights with inner product + 3 weights with wmd on vsm
        assert_eq!(valid, WeightsKind::ALL.len() * MeasureKind::ALL.len() + 9 + 3);
    }

    #[test]
    fn soft_spaces_reject_word_movers() {
        let err = SimilarityConfig::new(
            SpaceKind::DenseSoftVsm,
            WeightsKind::Bow,
            MeasureKind::Wmd,
            32,
            &Hyperparams::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnsupportedCombination { .. }));
        assert_eq!(
            err.to_string(),
            "unsupported combination: space=dense_soft_vsm, weights=bow, measure=wmd"
        );
    }

    #[test]
    fn random_space_ignores_weights_and_measure() {
        let config = SimilarityConfig::new(
            SpaceKind::Random,
            WeightsKind::Bow,
            MeasureKind::InnerProduct,
            32,
            &Hyperparams::default(),
        )
        .unwrap();
        assert!(config.is_random());
        // tfidf without a slope is still fine, nothing gets weighted
        let config = SimilarityConfig::new(
            SpaceKind::Random,
            WeightsKind::Tfidf,
            MeasureKind::Wmd,
            32,
            &Hyperparams::default(),
        )
        .unwrap();
        assert!(config.is_random());
    }

    #[test]
    fn random_weights_need_a_random_space() {
        let res = SimilarityConfig::new(
            SpaceKind::Vsm,
            WeightsKind::Random,
            MeasureKind::InnerProduct,
            32,
            &Hyperparams::default(),
        );
        assert!(matches!(res, Err(Error::UnsupportedCombination { .. })));
    }

    #[test]
    fn missing_hyperparameters_are_reported() {
        let res = SimilarityConfig::new(
            SpaceKind::Vsm,
            WeightsKind::Tfidf,
            MeasureKind::InnerProduct,
            32,
            &Hyperparams::default(),
        );
        assert!(matches!(res, Err(Error::Config(_))));
        let res = SimilarityConfig::new(
            SpaceKind::SparseSoftVsm,
            WeightsKind::Bow,
            MeasureKind::InnerProduct,
            32,
            &Hyperparams::default(),
        );
        assert!(matches!(res, Err(Error::Config(_))));
    }
}
