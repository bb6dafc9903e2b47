//! Gradient-boosted regression trees, the baseline learner
//!
//! Squared-loss boosting over best-first regression trees. Defaults follow
//! the small-dataset tuning of the reference stack: few leaves, slow learning
//! rate, aggressive early stopping. All row and feature subsampling is drawn
//! from a fixed-seed generator, so a fit is reproducible bit-for-bit.

use crate::error::{ForecastError, Result};
use crate::features::Dataset;
use crate::models::{
    chronological_split, check_trainable, validation_metrics, FittedModel, Learner, ModelKind,
    ValidationMetrics, VALIDATION_RATIO,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

/// Hyperparameters for the gradient boosting fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostConfig {
    /// Maximum leaves per tree
    pub num_leaves: usize,
    pub learning_rate: f64,
    /// Maximum boosting rounds
    pub rounds: usize,
    /// Minimum samples per leaf
    pub min_leaf: usize,
    /// Minimum gain for a split to be kept
    pub min_gain: f64,
    /// Fraction of features considered per tree
    pub feature_fraction: f64,
    /// Fraction of rows sampled per tree
    pub bagging_fraction: f64,
    /// L2 regularization on leaf values
    pub lambda_l2: f64,
    /// Stop after this many rounds without validation improvement
    pub early_stopping: usize,
    /// Seed for row and feature subsampling
    pub seed: u64,
}

impl Default for GradientBoostConfig {
    fn default() -> Self {
        Self {
            num_leaves: 15,
            learning_rate: 0.05,
            rounds: 200,
            min_leaf: 5,
            min_gain: 0.01,
            feature_fraction: 0.8,
            bagging_fraction: 0.8,
            lambda_l2: 0.1,
            early_stopping: 20,
            seed: 42,
        }
    }
}

impl GradientBoostConfig {
    fn validate(&self) -> Result<()> {
        if self.num_leaves < 2 {
            return Err(ForecastError::InvalidParameter(
                "num_leaves must be at least 2".to_string(),
            ));
        }
        if self.learning_rate <= 0.0 || self.learning_rate > 1.0 {
            return Err(ForecastError::InvalidParameter(
                "learning_rate must be in (0, 1]".to_string(),
            ));
        }
        if self.rounds == 0 || self.min_leaf == 0 {
            return Err(ForecastError::InvalidParameter(
                "rounds and min_leaf must be positive".to_string(),
            ));
        }
        for (name, value) in [
            ("feature_fraction", self.feature_fraction),
            ("bagging_fraction", self.bagging_fraction),
        ] {
            if value <= 0.0 || value > 1.0 {
                return Err(ForecastError::InvalidParameter(format!(
                    "{} must be in (0, 1]",
                    name
                )));
            }
        }
        if self.lambda_l2 < 0.0 {
            return Err(ForecastError::InvalidParameter(
                "lambda_l2 must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Gradient boosting learner
#[derive(Debug, Clone)]
pub struct GradientBoost {
    config: GradientBoostConfig,
}

impl GradientBoost {
    pub fn new(config: GradientBoostConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn with_defaults() -> Self {
        Self {
            config: GradientBoostConfig::default(),
        }
    }

    pub fn config(&self) -> &GradientBoostConfig {
        &self.config
    }
}

impl Learner for GradientBoost {
    fn kind(&self) -> ModelKind {
        ModelKind::GradientBoost
    }

    fn fit(&self, data: &Dataset) -> Result<Box<dyn FittedModel>> {
        check_trainable(data)?;
        let (train, valid) = chronological_split(data, VALIDATION_RATIO)?;
        let cfg = &self.config;

        let n = train.len();
        let n_features = train.schema.len();
        let mut rng = StdRng::seed_from_u64(cfg.seed);

        let base = series_math::rolling::mean(&train.target);
        let mut train_pred = vec![base; n];
        let mut valid_pred = vec![base; valid.len()];

        let mut trees: Vec<Tree> = Vec::new();
        let mut tree_gains: Vec<Vec<f64>> = Vec::new();

        let mut best_mae = series_math::metrics::mean_absolute_error(&valid_pred, &valid.target)?;
        let mut best_rounds = 0usize;
        let mut best_valid_pred = valid_pred.clone();
        let mut stale = 0usize;

        for round in 0..cfg.rounds {
            let residuals: Vec<f64> = train
                .target
                .iter()
                .zip(train_pred.iter())
                .map(|(y, p)| y - p)
                .collect();

            let bag = sample_sorted(&mut rng, n, cfg.bagging_fraction);
            let features = sample_sorted(&mut rng, n_features, cfg.feature_fraction);

            let (tree, gains) = grow_tree(&train.rows, &residuals, bag, &features, cfg);

            for (i, row) in train.rows.iter().enumerate() {
                train_pred[i] += cfg.learning_rate * tree.predict(row);
            }
            for (i, row) in valid.rows.iter().enumerate() {
                valid_pred[i] += cfg.learning_rate * tree.predict(row);
            }

            trees.push(tree);
            tree_gains.push(gains);

            let mae = series_math::metrics::mean_absolute_error(&valid_pred, &valid.target)?;
            if mae + 1e-10 < best_mae {
                best_mae = mae;
                best_rounds = round + 1;
                best_valid_pred = valid_pred.clone();
                stale = 0;
            } else {
                stale += 1;
                if stale >= cfg.early_stopping {
                    break;
                }
            }
        }

        trees.truncate(best_rounds);
        tree_gains.truncate(best_rounds);

        let metrics = validation_metrics(&best_valid_pred, &valid.target, train.len())?;

        let mut total_gain = vec![0.0; n_features];
        for gains in &tree_gains {
            for (f, g) in gains.iter().enumerate() {
                total_gain[f] += g;
            }
        }
        let mut importance: Vec<(String, f64)> = train
            .schema
            .columns()
            .iter()
            .zip(total_gain.iter())
            .filter(|(_, &g)| g > 0.0)
            .map(|(name, &g)| (name.clone(), g))
            .collect();
        importance.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        debug!(
            rounds = best_rounds,
            mae = metrics.mae,
            "gradient boosting fit complete"
        );

        Ok(Box::new(FittedGradientBoost {
            base,
            learning_rate: cfg.learning_rate,
            trees,
            metrics,
            importance,
        }))
    }
}

/// A fitted boosting ensemble
#[derive(Debug)]
pub struct FittedGradientBoost {
    base: f64,
    learning_rate: f64,
    trees: Vec<Tree>,
    metrics: ValidationMetrics,
    importance: Vec<(String, f64)>,
}

impl FittedGradientBoost {
    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

impl FittedModel for FittedGradientBoost {
    fn kind(&self) -> ModelKind {
        ModelKind::GradientBoost
    }

    fn predict(&self, row: &[f64]) -> Result<f64> {
        let boosted: f64 = self.trees.iter().map(|t| t.predict(row)).sum();
        Ok(self.base + self.learning_rate * boosted)
    }

    fn metrics(&self) -> &ValidationMetrics {
        &self.metrics
    }

    fn feature_importance(&self) -> Vec<(String, f64)> {
        self.importance.clone()
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn predict(&self, row: &[f64]) -> f64 {
        let mut node = 0;
        loop {
            match &self.nodes[node] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

struct SplitPlan {
    feature: usize,
    threshold: f64,
    gain: f64,
    left: Vec<usize>,
    right: Vec<usize>,
    left_value: f64,
    right_value: f64,
}

struct Candidate {
    node: usize,
    plan: Option<SplitPlan>,
}

/// Grow one regression tree best-first: repeatedly split the leaf with the
/// highest gain until the leaf budget is spent or no split clears the gain
/// floor. Returns the tree and the gain attributed to each feature.
fn grow_tree(
    rows: &[Vec<f64>],
    residuals: &[f64],
    root_indices: Vec<usize>,
    features: &[usize],
    cfg: &GradientBoostConfig,
) -> (Tree, Vec<f64>) {
    let n_features = rows.first().map(|r| r.len()).unwrap_or(0);
    let mut gains = vec![0.0; n_features];

    let root_value = leaf_value(&root_indices, residuals, cfg.lambda_l2);
    let mut nodes = vec![Node::Leaf { value: root_value }];

    let root_plan = best_split(rows, residuals, &root_indices, features, cfg);
    let mut candidates = vec![Candidate {
        node: 0,
        plan: root_plan,
    }];
    let mut leaves = 1;

    while leaves < cfg.num_leaves {
        // Pick the candidate with the best gain; ties resolve to the oldest
        // node so growth order is deterministic.
        let mut best: Option<usize> = None;
        for (i, c) in candidates.iter().enumerate() {
            if let Some(plan) = &c.plan {
                let better = match best {
                    None => true,
                    Some(j) => {
                        let current = candidates[j].plan.as_ref().map(|p| p.gain).unwrap_or(0.0);
                        plan.gain > current
                    }
                };
                if better {
                    best = Some(i);
                }
            }
        }
        let Some(chosen) = best else { break };

        let Candidate { node, plan } = candidates.swap_remove(chosen);
        let plan = match plan {
            Some(p) => p,
            None => break,
        };
        gains[plan.feature] += plan.gain;

        let left_slot = nodes.len();
        let right_slot = nodes.len() + 1;
        nodes.push(Node::Leaf {
            value: plan.left_value,
        });
        nodes.push(Node::Leaf {
            value: plan.right_value,
        });
        nodes[node] = Node::Split {
            feature: plan.feature,
            threshold: plan.threshold,
            left: left_slot,
            right: right_slot,
        };
        leaves += 1;

        let left_plan = best_split(rows, residuals, &plan.left, features, cfg);
        let right_plan = best_split(rows, residuals, &plan.right, features, cfg);
        candidates.push(Candidate {
            node: left_slot,
            plan: left_plan,
        });
        candidates.push(Candidate {
            node: right_slot,
            plan: right_plan,
        });
    }

    (Tree { nodes }, gains)
}

/// Find the best threshold over the feature subset for one node.
///
/// Gain is the regularized variance-reduction objective
/// `S_l²/(n_l+λ) + S_r²/(n_r+λ) − S_p²/(n_p+λ)`.
fn best_split(
    rows: &[Vec<f64>],
    residuals: &[f64],
    indices: &[usize],
    features: &[usize],
    cfg: &GradientBoostConfig,
) -> Option<SplitPlan> {
    let n = indices.len();
    if n < 2 * cfg.min_leaf {
        return None;
    }

    let total: f64 = indices.iter().map(|&i| residuals[i]).sum();
    let parent_score = total * total / (n as f64 + cfg.lambda_l2);

    let mut best: Option<SplitPlan> = None;

    for &feature in features {
        let mut order: Vec<usize> = indices.to_vec();
        order.sort_by(|&a, &b| {
            rows[a][feature]
                .partial_cmp(&rows[b][feature])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });

        let mut left_sum = 0.0;
        for k in 1..n {
            left_sum += residuals[order[k - 1]];

            // Thresholds fall only between distinct feature values.
            if rows[order[k - 1]][feature] == rows[order[k]][feature] {
                continue;
            }
            if k < cfg.min_leaf || n - k < cfg.min_leaf {
                continue;
            }

            let right_sum = total - left_sum;
            let gain = left_sum * left_sum / (k as f64 + cfg.lambda_l2)
                + right_sum * right_sum / ((n - k) as f64 + cfg.lambda_l2)
                - parent_score;

            if gain <= cfg.min_gain {
                continue;
            }
            let current_best = best.as_ref().map(|p| p.gain).unwrap_or(f64::NEG_INFINITY);
            if gain > current_best {
                let threshold = (rows[order[k - 1]][feature] + rows[order[k]][feature]) / 2.0;
                let left = order[..k].to_vec();
                let right = order[k..].to_vec();
                let left_value = left_sum / (k as f64 + cfg.lambda_l2);
                let right_value = right_sum / ((n - k) as f64 + cfg.lambda_l2);
                best = Some(SplitPlan {
                    feature,
                    threshold,
                    gain,
                    left,
                    right,
                    left_value,
                    right_value,
                });
            }
        }
    }

    best
}

fn leaf_value(indices: &[usize], residuals: &[f64], lambda: f64) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    let sum: f64 = indices.iter().map(|&i| residuals[i]).sum();
    sum / (indices.len() as f64 + lambda)
}

/// Draw `fraction` of `n` indices without replacement, sorted for
/// deterministic downstream iteration
fn sample_sorted(rng: &mut StdRng, n: usize, fraction: f64) -> Vec<usize> {
    let k = ((n as f64 * fraction).floor() as usize).clamp(1, n);
    if k == n {
        return (0..n).collect();
    }
    let mut picked = rand::seq::index::sample(rng, n, k).into_vec();
    picked.sort_unstable();
    picked
}

/// Bounded hyperparameter search space for the tuning pass
#[derive(Debug, Clone)]
pub struct TuningGrid {
    pub num_leaves: Vec<usize>,
    pub learning_rate: Vec<f64>,
    pub lambda_l2: Vec<f64>,
    pub bagging_fraction: Vec<f64>,
}

impl Default for TuningGrid {
    fn default() -> Self {
        Self {
            num_leaves: vec![7, 15, 31],
            learning_rate: vec![0.05, 0.1],
            lambda_l2: vec![0.1, 1.0],
            bagging_fraction: vec![0.8, 1.0],
        }
    }
}

/// Search the grid for the configuration with the lowest validation MAE.
///
/// The search is time-bounded: once `deadline` passes, remaining
/// combinations are abandoned and the best configuration found so far (or
/// the defaults, if nothing finished) is returned instead of blocking.
pub fn tune(
    data: &Dataset,
    grid: &TuningGrid,
    deadline: Option<Instant>,
) -> Result<GradientBoostConfig> {
    let mut best_config = GradientBoostConfig::default();
    let mut best_mae = f64::INFINITY;
    let mut evaluated = 0usize;
    let mut abandoned = false;

    'search: for &num_leaves in &grid.num_leaves {
        for &learning_rate in &grid.learning_rate {
            for &lambda_l2 in &grid.lambda_l2 {
                for &bagging_fraction in &grid.bagging_fraction {
                    if let Some(limit) = deadline {
                        if Instant::now() >= limit {
                            abandoned = true;
                            break 'search;
                        }
                    }

                    let config = GradientBoostConfig {
                        num_leaves,
                        learning_rate,
                        lambda_l2,
                        bagging_fraction,
                        ..GradientBoostConfig::default()
                    };
                    let fitted = GradientBoost::new(config.clone())?.fit(data)?;
                    evaluated += 1;

                    let mae = fitted.metrics().mae;
                    if mae < best_mae {
                        best_mae = mae;
                        best_config = config;
                    }
                }
            }
        }
    }

    if abandoned {
        warn!(
            evaluated,
            "tuning deadline reached, falling back to best configuration so far"
        );
    } else {
        debug!(evaluated, mae = best_mae, "tuning search complete");
    }

    if evaluated == 0 {
        return Ok(GradientBoostConfig::default());
    }
    Ok(best_config)
}
