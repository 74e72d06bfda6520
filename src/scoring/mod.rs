//! Anomaly scoring for trades.

pub mod forest;

use tracing::info;

use crate::config::ModelConfig;
use crate::constants::model::BOOTSTRAP_TRADES;
use crate::error::ScorerError;

use forest::{ForestParams, IsolationForest, Sample};

/// Result of scoring one trade
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnomalyScore {
    /// Decision value; negative means anomalous
    pub score: f64,
    pub is_anomaly: bool,
}

/// Wraps a fitted forest over `[price, quantity]`. Read-only after fitting,
/// share it behind an `Arc`.
#[derive(Clone, Debug)]
pub struct Scorer {
    forest: IsolationForest,
}

impl Scorer {
    /// Fits the model on the built-in bootstrap sample.
    pub fn bootstrap(config: &ModelConfig) -> Result<Self, ScorerError> {
        Self::fit(&BOOTSTRAP_TRADES, config)
    }

    pub fn fit(training: &[Sample], config: &ModelConfig) -> Result<Self, ScorerError> {
        let params = ForestParams {
            n_estimators: config.n_estimators,
            max_samples: config.max_samples,
            contamination: config.contamination,
            seed: config.seed,
        };
        let forest = IsolationForest::fit(training, &params)?;
        info!(
            "Anomaly detection model has been trained ({} trees, {} samples, offset {:.4})",
            forest.n_trees(),
            training.len(),
            forest.offset()
        );
        Ok(Self { forest })
    }

    pub fn score(&self, price: f64, quantity: f64) -> AnomalyScore {
        let x = [price, quantity];
        let score = self.forest.decision_function(&x);
        AnomalyScore {
            score,
            is_anomaly: score < 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_score_is_deterministic() {
        let scorer = Scorer::bootstrap(&ModelConfig::default()).unwrap();
        let first = scorer.score(70000.0, 0.1);
        for _ in 0..10 {
            assert_eq!(scorer.score(70000.0, 0.1), first);
        }
    }

    #[test]
    fn test_refit_with_same_seed_matches() {
        let a = Scorer::bootstrap(&ModelConfig::default()).unwrap();
        let b = Scorer::bootstrap(&ModelConfig::default()).unwrap();
        assert_eq!(a.score(70000.0, 0.1), b.score(70000.0, 0.1));
        assert_eq!(a.score(95000.0, 12.0), b.score(95000.0, 12.0));
    }

    #[test]
    fn test_flag_follows_sign_of_score() {
        let scorer = Scorer::bootstrap(&ModelConfig::default()).unwrap();
        for (p, q) in [(70000.0, 0.1), (69000.0, 5.0), (71000.0, 0.001), (70120.0, 0.2)] {
            let s = scorer.score(p, q);
            assert_eq!(s.is_anomaly, s.score < 0.0);
        }
    }

    #[test]
    fn test_concurrent_scoring_agrees() {
        let scorer = Arc::new(Scorer::bootstrap(&ModelConfig::default()).unwrap());
        let expected = scorer.score(70000.0, 0.1);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let scorer = scorer.clone();
                std::thread::spawn(move || scorer.score(70000.0, 0.1))
            })
            .collect();

        for h in handles {
            assert_eq!(h.join().unwrap(), expected);
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ModelConfig {
            contamination: 0.9,
            ..ModelConfig::default()
        };
        assert!(matches!(
            Scorer::bootstrap(&config),
            Err(ScorerError::InvalidContamination(_))
        ));
    }
}
