//! Estimators
//!
//! Fitted classifiers behind the algorithm keys: multinomial logistic
//! regression from `linfa-logistic`, and a random forest assembled from
//! seeded bootstrap-bagged `linfa-trees` decision trees (linfa has no
//! built-in forest). Both variants serialize into the model artifact.

use std::collections::HashMap;

use linfa::prelude::*;
use linfa_logistic::{MultiFittedLogisticRegression, MultiLogisticRegression};
use linfa_trees::DecisionTree;
use ndarray::{Array1, Array2};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::CoreError;

/// A fitted classifier
#[derive(Serialize, Deserialize)]
pub enum Estimator {
    LogisticRegression(MultiFittedLogisticRegression<f64, usize>),
    RandomForest(RandomForest),
}

impl Estimator {
    /// Train an estimator for an algorithm key with resolved
    /// hyperparameters.
    pub fn fit(
        key: &str,
        features: &Array2<f64>,
        targets: &Array1<usize>,
        n_classes: usize,
        hyperparameters: &HashMap<String, Value>,
    ) -> Result<Self, CoreError> {
        if features.nrows() != targets.len() {
            return Err(CoreError::Training(format!(
                "features and targets must have the same number of samples: {} vs {}",
                features.nrows(),
                targets.len()
            )));
        }
        if features.nrows() == 0 || features.ncols() == 0 {
            return Err(CoreError::Training(
                "features and targets cannot be empty".to_string(),
            ));
        }
        if n_classes < 2 {
            return Err(CoreError::Training(
                "training requires at least two target classes".to_string(),
            ));
        }

        match key {
            "logistic_regression" => Self::fit_logistic_regression(features, targets, hyperparameters),
            "random_forest" => Self::fit_random_forest(features, targets, n_classes, hyperparameters),
            other => Err(CoreError::UnknownModelKey(other.to_string())),
        }
    }

    fn fit_logistic_regression(
        features: &Array2<f64>,
        targets: &Array1<usize>,
        hyperparameters: &HashMap<String, Value>,
    ) -> Result<Self, CoreError> {
        info!(
            "Starting logistic regression training with {} samples and {} features",
            features.nrows(),
            features.ncols()
        );

        let alpha = hyperparameters
            .get("alpha")
            .and_then(|v| v.as_f64())
            .unwrap_or(1.0);
        let max_iterations = hyperparameters
            .get("max_iterations")
            .and_then(|v| v.as_u64())
            .unwrap_or(200);
        let gradient_tolerance = hyperparameters
            .get("gradient_tolerance")
            .and_then(|v| v.as_f64())
            .unwrap_or(1e-4);

        let dataset = Dataset::new(features.clone(), targets.clone());

        let model = MultiLogisticRegression::default()
            .alpha(alpha)
            .max_iterations(max_iterations)
            .gradient_tolerance(gradient_tolerance)
            .fit(&dataset)
            .map_err(|e| CoreError::Training(format!("logistic regression training failed: {}", e)))?;

        Ok(Estimator::LogisticRegression(model))
    }

    fn fit_random_forest(
        features: &Array2<f64>,
        targets: &Array1<usize>,
        n_classes: usize,
        hyperparameters: &HashMap<String, Value>,
    ) -> Result<Self, CoreError> {
        info!(
            "Starting random forest training with {} samples and {} features",
            features.nrows(),
            features.ncols()
        );

        let n_trees = hyperparameters
            .get("n_trees")
            .and_then(|v| v.as_u64())
            .unwrap_or(200) as usize;
        let max_depth = hyperparameters
            .get("max_depth")
            .and_then(|v| v.as_u64())
            .map(|d| d as usize);
        let bootstrap_ratio = hyperparameters
            .get("bootstrap_ratio")
            .and_then(|v| v.as_f64())
            .unwrap_or(1.0);
        let seed = hyperparameters
            .get("random_state")
            .and_then(|v| v.as_u64())
            .unwrap_or(42);

        if n_trees == 0 {
            return Err(CoreError::Training("n_trees must be greater than 0".to_string()));
        }
        if bootstrap_ratio <= 0.0 {
            return Err(CoreError::Training(
                "bootstrap_ratio must be greater than 0".to_string(),
            ));
        }

        let forest = RandomForest::fit(
            features,
            targets,
            n_classes,
            n_trees,
            max_depth,
            bootstrap_ratio,
            seed,
        )?;
        Ok(Estimator::RandomForest(forest))
    }

    /// Predict class indices for a feature matrix.
    pub fn predict(&self, features: &Array2<f64>) -> Array1<usize> {
        match self {
            Estimator::LogisticRegression(model) => model.predict(features),
            Estimator::RandomForest(forest) => forest.predict(features),
        }
    }

    /// Per-class probabilities, when the estimator supports them.
    pub fn predict_probabilities(&self, features: &Array2<f64>) -> Option<Array2<f64>> {
        match self {
            Estimator::LogisticRegression(model) => Some(model.predict_probabilities(features)),
            Estimator::RandomForest(forest) => Some(forest.vote_fractions(features)),
        }
    }

    pub fn algorithm_key(&self) -> &'static str {
        match self {
            Estimator::LogisticRegression(_) => "logistic_regression",
            Estimator::RandomForest(_) => "random_forest",
        }
    }
}

/// Bootstrap-bagged decision trees with majority voting
#[derive(Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree<f64, usize>>,
    n_classes: usize,
}

impl RandomForest {
    #[allow(clippy::too_many_arguments)]
    fn fit(
        features: &Array2<f64>,
        targets: &Array1<usize>,
        n_classes: usize,
        n_trees: usize,
        max_depth: Option<usize>,
        bootstrap_ratio: f64,
        seed: u64,
    ) -> Result<Self, CoreError> {
        let n_rows = features.nrows();
        let sample_size = ((n_rows as f64 * bootstrap_ratio).round() as usize).max(1);
        let mut rng = StdRng::seed_from_u64(seed);

        let mut trees = Vec::with_capacity(n_trees);
        for _ in 0..n_trees {
            let indices: Vec<usize> = (0..sample_size).map(|_| rng.gen_range(0..n_rows)).collect();

            let sample_features = features.select(ndarray::Axis(0), &indices);
            let sample_targets: Array1<usize> =
                indices.iter().map(|&i| targets[i]).collect::<Vec<_>>().into();

            let dataset = Dataset::new(sample_features, sample_targets);
            let tree = DecisionTree::params()
                .max_depth(max_depth)
                .fit(&dataset)
                .map_err(|e| CoreError::Training(format!("decision tree training failed: {}", e)))?;
            trees.push(tree);
        }

        Ok(Self { trees, n_classes })
    }

    /// Majority vote across the trees; ties resolve to the lowest class
    /// index.
    pub fn predict(&self, features: &Array2<f64>) -> Array1<usize> {
        let votes = self.count_votes(features);
        let predictions: Vec<usize> = votes
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))
                    .map(|(class, _)| class)
                    .unwrap_or(0)
            })
            .collect();
        Array1::from_vec(predictions)
    }

    /// Fraction of trees voting for each class.
    pub fn vote_fractions(&self, features: &Array2<f64>) -> Array2<f64> {
        let votes = self.count_votes(features);
        let n_trees = self.trees.len().max(1) as f64;
        let mut fractions = Array2::zeros((votes.len(), self.n_classes));
        for (row, counts) in votes.iter().enumerate() {
            for (class, &count) in counts.iter().enumerate() {
                fractions[[row, class]] = count as f64 / n_trees;
            }
        }
        fractions
    }

    fn count_votes(&self, features: &Array2<f64>) -> Vec<Vec<usize>> {
        let mut votes = vec![vec![0usize; self.n_classes]; features.nrows()];
        for tree in &self.trees {
            let predictions = tree.predict(features);
            for (row, &class) in predictions.iter().enumerate() {
                if class < self.n_classes {
                    votes[row][class] += 1;
                }
            }
        }
        votes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use serde_json::json;

    fn separable_data() -> (Array2<f64>, Array1<usize>) {
        let features = array![
            [0.0, 0.1],
            [0.2, 0.0],
            [0.1, 0.2],
            [0.3, 0.1],
            [5.0, 5.1],
            [5.2, 4.9],
            [4.8, 5.0],
            [5.1, 5.3],
        ];
        let targets = array![0, 0, 0, 0, 1, 1, 1, 1];
        (features, targets)
    }

    #[test]
    fn test_logistic_regression_fit_predict() {
        let (features, targets) = separable_data();
        let model = Estimator::fit(
            "logistic_regression",
            &features,
            &targets,
            2,
            &HashMap::from([("max_iterations".to_string(), json!(100))]),
        )
        .unwrap();

        let predictions = model.predict(&features);
        assert_eq!(predictions.len(), 8);
        assert_eq!(predictions[0], 0);
        assert_eq!(predictions[7], 1);

        let probabilities = model.predict_probabilities(&features).unwrap();
        assert_eq!(probabilities.dim(), (8, 2));
        let row: f64 = probabilities.row(0).sum();
        assert!((row - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_random_forest_fit_predict() {
        let (features, targets) = separable_data();
        let model = Estimator::fit(
            "random_forest",
            &features,
            &targets,
            2,
            &HashMap::from([
                ("n_trees".to_string(), json!(5)),
                ("random_state".to_string(), json!(7)),
            ]),
        )
        .unwrap();

        let predictions = model.predict(&features);
        assert_eq!(predictions[0], 0);
        assert_eq!(predictions[4], 1);

        let fractions = model.predict_probabilities(&features).unwrap();
        assert_eq!(fractions.dim(), (8, 2));
        assert!((fractions.row(0).sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_forest_is_deterministic_for_a_seed() {
        let (features, targets) = separable_data();
        let params = HashMap::from([
            ("n_trees".to_string(), json!(3)),
            ("random_state".to_string(), json!(11)),
        ]);

        let a = Estimator::fit("random_forest", &features, &targets, 2, &params).unwrap();
        let b = Estimator::fit("random_forest", &features, &targets, 2, &params).unwrap();
        assert_eq!(
            a.predict(&features).to_vec(),
            b.predict(&features).to_vec()
        );
    }

    #[test]
    fn test_fit_rejects_unknown_key() {
        let (features, targets) = separable_data();
        assert!(matches!(
            Estimator::fit("svm", &features, &targets, 2, &HashMap::new()),
            Err(CoreError::UnknownModelKey(_))
        ));
    }

    #[test]
    fn test_fit_rejects_single_class() {
        let features = array![[1.0], [2.0]];
        let targets = array![0, 0];
        assert!(matches!(
            Estimator::fit("logistic_regression", &features, &targets, 1, &HashMap::new()),
            Err(CoreError::Training(_))
        ));
    }
}
