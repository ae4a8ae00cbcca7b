//! Evaluation metrics
//!
//! Classification metrics computed on the held-out partition after
//! training.

use std::collections::HashMap;

use ndarray::Array1;

/// Fraction of predictions matching the actual labels.
pub fn accuracy(predictions: &Array1<usize>, actual: &Array1<usize>) -> f64 {
    if predictions.is_empty() {
        return 0.0;
    }
    let correct = predictions
        .iter()
        .zip(actual.iter())
        .filter(|(p, a)| p == a)
        .count();
    correct as f64 / predictions.len() as f64
}

/// Macro-averaged F1 over the classes present in the actual labels.
pub fn f1_macro(predictions: &Array1<usize>, actual: &Array1<usize>, n_classes: usize) -> f64 {
    if predictions.is_empty() || n_classes == 0 {
        return 0.0;
    }

    let mut f1_sum = 0.0;
    let mut counted = 0usize;
    for class in 0..n_classes {
        let tp = predictions
            .iter()
            .zip(actual.iter())
            .filter(|(p, a)| **p == class && **a == class)
            .count() as f64;
        let fp = predictions
            .iter()
            .zip(actual.iter())
            .filter(|(p, a)| **p == class && **a != class)
            .count() as f64;
        let fn_ = predictions
            .iter()
            .zip(actual.iter())
            .filter(|(p, a)| **p != class && **a == class)
            .count() as f64;

        if tp + fn_ == 0.0 {
            // Class absent from the held-out labels.
            continue;
        }
        counted += 1;

        let precision = if tp + fp > 0.0 { tp / (tp + fp) } else { 0.0 };
        let recall = tp / (tp + fn_);
        if precision + recall > 0.0 {
            f1_sum += 2.0 * precision * recall / (precision + recall);
        }
    }

    if counted == 0 {
        0.0
    } else {
        f1_sum / counted as f64
    }
}

/// Metric map reported for a trained model.
pub fn classification_metrics(
    predictions: &Array1<usize>,
    actual: &Array1<usize>,
    n_classes: usize,
) -> HashMap<String, f64> {
    HashMap::from([
        ("accuracy".to_string(), accuracy(predictions, actual)),
        (
            "f1_macro".to_string(),
            f1_macro(predictions, actual, n_classes),
        ),
    ])
}
