//! Isolation Forest over 2-dimensional `[price, quantity]` samples.
//!
//! Trees are built from random subsamples with random axis-aligned splits;
//! points that get isolated after few splits are anomalous. The fit is fully
//! determined by the seed, so the same training data and seed always produce
//! the same scores.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};

use crate::constants::model::EULER_GAMMA;
use crate::error::ScorerError;

pub const N_FEATURES: usize = 2;

pub type Sample = [f64; N_FEATURES];

#[derive(Clone, Debug)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_samples: usize,
    pub contamination: f64,
    pub seed: u64,
}

#[derive(Clone, Debug)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// One isolation tree. Nodes live in a flat arena; index 0 is the root.
#[derive(Clone, Debug)]
struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    fn fit(data: &[Sample], rows: &mut [usize], max_depth: usize, rng: &mut StdRng) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(data, rows, 0, max_depth, rng);
        tree
    }

    fn grow(
        &mut self,
        data: &[Sample],
        rows: &mut [usize],
        depth: usize,
        max_depth: usize,
        rng: &mut StdRng,
    ) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { size: rows.len() });

        if depth >= max_depth || rows.len() <= 1 {
            return id;
        }

        // Only features that still vary inside this node can split it.
        let mut candidates: Vec<(usize, f64, f64)> = Vec::with_capacity(N_FEATURES);
        for feature in 0..N_FEATURES {
            let (lo, hi) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| {
                let v = data[r][feature];
                (lo.min(v), hi.max(v))
            });
            if lo < hi {
                candidates.push((feature, lo, hi));
            }
        }
        if candidates.is_empty() {
            return id;
        }

        let (feature, lo, hi) = candidates[rng.gen_range(0..candidates.len())];
        let threshold = rng.gen_range(lo..hi);

        // Partition in place: `<= threshold` goes left.
        let mut mid = 0;
        for i in 0..rows.len() {
            if data[rows[i]][feature] <= threshold {
                rows.swap(i, mid);
                mid += 1;
            }
        }

        let (left_rows, right_rows) = rows.split_at_mut(mid);
        let left = self.grow(data, left_rows, depth + 1, max_depth, rng);
        let right = self.grow(data, right_rows, depth + 1, max_depth, rng);
        self.nodes[id] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        id
    }

    fn path_length(&self, x: &Sample) -> f64 {
        let mut id = 0;
        let mut depth = 0usize;
        loop {
            match &self.nodes[id] {
                Node::Leaf { size } => return depth as f64 + average_path_length(*size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if x[*feature] <= *threshold { *left } else { *right };
                    depth += 1;
                }
            }
        }
    }
}

/// A fitted forest. Immutable after `fit`, so `&self` scoring is safe from
/// any number of threads.
#[derive(Clone, Debug)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    subsample_size: usize,
    offset: f64,
}

impl IsolationForest {
    pub fn fit(data: &[Sample], params: &ForestParams) -> Result<Self, ScorerError> {
        if data.is_empty() {
            return Err(ScorerError::EmptyTrainingSet);
        }
        if !(params.contamination > 0.0 && params.contamination <= 0.5) {
            return Err(ScorerError::InvalidContamination(params.contamination));
        }
        if params.n_estimators == 0 {
            return Err(ScorerError::NoEstimators);
        }
        if params.max_samples < 2 {
            return Err(ScorerError::InvalidMaxSamples(params.max_samples));
        }
        if let Some(index) = data.iter().position(|s| s.iter().any(|v| !v.is_finite())) {
            return Err(ScorerError::NonFiniteSample { index });
        }

        let subsample_size = params.max_samples.min(data.len());
        let max_depth = (subsample_size.max(2) as f64).log2().ceil() as usize;

        let mut rng = StdRng::seed_from_u64(params.seed);
        let trees = (0..params.n_estimators)
            .map(|_| {
                let mut tree_rng = StdRng::seed_from_u64(rng.gen());
                let mut rows = sample(&mut tree_rng, data.len(), subsample_size).into_vec();
                IsolationTree::fit(data, &mut rows, max_depth, &mut tree_rng)
            })
            .collect();

        let mut forest = Self {
            trees,
            subsample_size,
            offset: 0.0,
        };

        let mut training_scores: Vec<f64> = data.iter().map(|s| forest.score_samples(s)).collect();
        forest.offset = percentile(&mut training_scores, params.contamination * 100.0);
        Ok(forest)
    }

    /// Raw anomaly measure in [-1, 0); lower is more anomalous.
    pub fn score_samples(&self, x: &Sample) -> f64 {
        let mean_depth = self.trees.iter().map(|t| t.path_length(x)).sum::<f64>() / self.trees.len() as f64;
        let norm = average_path_length(self.subsample_size);
        if norm <= 0.0 {
            return -1.0;
        }
        -(2f64).powf(-mean_depth / norm)
    }

    /// Score shifted by the contamination threshold; negative means outlier.
    pub fn decision_function(&self, x: &Sample) -> f64 {
        self.score_samples(x) - self.offset
    }

    pub fn is_outlier(&self, x: &Sample) -> bool {
        self.decision_function(x) < 0.0
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

/// Average path length of an unsuccessful BST search over `n` points.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Percentile with linear interpolation between closest ranks.
fn percentile(values: &mut [f64], q: f64) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let pos = (q / 100.0) * (values.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    values[lo] + (values[hi] - values[lo]) * (pos - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(seed: u64) -> ForestParams {
        ForestParams {
            n_estimators: 100,
            max_samples: 256,
            contamination: 0.02,
            seed,
        }
    }

    /// Deterministic 16x16 grid around (100, 10).
    fn cluster() -> Vec<Sample> {
        let mut data = Vec::new();
        for i in 0..16 {
            for j in 0..16 {
                data.push([100.0 + i as f64 * 0.1, 10.0 + j as f64 * 0.01]);
            }
        }
        data
    }

    #[test]
    fn test_average_path_length_small_cases() {
        assert_eq!(average_path_length(0), 0.0);
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        let c256 = average_path_length(256);
        assert!(c256 > 10.0 && c256 < 11.0, "c(256) = {c256}");
    }

    #[test]
    fn test_percentile_interpolates() {
        let mut v = vec![4.0, 1.0, 3.0, 2.0, 5.0];
        assert_eq!(percentile(&mut v, 0.0), 1.0);
        assert_eq!(percentile(&mut v, 50.0), 3.0);
        assert_eq!(percentile(&mut v, 100.0), 5.0);
        assert!((percentile(&mut v, 10.0) - 1.4).abs() < 1e-12);
    }

    #[test]
    fn test_fit_is_deterministic_for_seed() {
        let data = cluster();
        let a = IsolationForest::fit(&data, &params(42)).unwrap();
        let b = IsolationForest::fit(&data, &params(42)).unwrap();

        for x in [[100.5, 10.05], [250.0, 3.0], [99.0, 10.2]] {
            assert_eq!(a.score_samples(&x), b.score_samples(&x));
            assert_eq!(a.is_outlier(&x), b.is_outlier(&x));
        }
        assert_eq!(a.offset(), b.offset());
    }

    #[test]
    fn test_far_point_scores_lower_than_center() {
        let forest = IsolationForest::fit(&cluster(), &params(7)).unwrap();
        let center = forest.score_samples(&[100.8, 10.08]);
        let far = forest.score_samples(&[1_000.0, 500.0]);
        assert!(far < center, "far={far} center={center}");
    }

    #[test]
    fn test_scores_are_in_range() {
        let forest = IsolationForest::fit(&cluster(), &params(1)).unwrap();
        for x in [[100.0, 10.0], [0.0, 0.0], [1e9, 1e9]] {
            let s = forest.score_samples(&x);
            assert!((-1.0..0.0).contains(&s), "score {s} out of range");
        }
    }

    #[test]
    fn test_training_outlier_share_bounded_by_contamination() {
        let data = cluster();
        let forest = IsolationForest::fit(&data, &params(42)).unwrap();
        let flagged = data.iter().filter(|x| forest.is_outlier(x)).count();
        let bound = (data.len() as f64 * 0.02).ceil() as usize;
        assert!(flagged <= bound, "flagged {flagged} > {bound}");
    }

    #[test]
    fn test_subsample_capped_by_training_size() {
        let data = vec![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0]];
        let forest = IsolationForest::fit(&data, &params(42)).unwrap();
        assert_eq!(forest.subsample_size, 3);
        assert_eq!(forest.n_trees(), 100);
    }

    #[test]
    fn test_constant_data_yields_single_leaf_trees() {
        let data = vec![[5.0, 5.0]; 10];
        let forest = IsolationForest::fit(&data, &params(42)).unwrap();
        assert!(forest.trees.iter().all(|t| t.nodes.len() == 1));
    }

    #[test]
    fn test_fit_rejects_bad_params() {
        let data = cluster();
        assert_eq!(
            IsolationForest::fit(&[], &params(1)).unwrap_err(),
            ScorerError::EmptyTrainingSet
        );

        let mut p = params(1);
        p.contamination = 0.0;
        assert_eq!(
            IsolationForest::fit(&data, &p).unwrap_err(),
            ScorerError::InvalidContamination(0.0)
        );

        let mut p = params(1);
        p.n_estimators = 0;
        assert_eq!(IsolationForest::fit(&data, &p).unwrap_err(), ScorerError::NoEstimators);

        let mut p = params(1);
        p.max_samples = 1;
        assert_eq!(
            IsolationForest::fit(&data, &p).unwrap_err(),
            ScorerError::InvalidMaxSamples(1)
        );

        let bad = vec![[1.0, f64::NAN]];
        assert_eq!(
            IsolationForest::fit(&bad, &params(1)).unwrap_err(),
            ScorerError::NonFiniteSample { index: 0 }
        );
    }
}
