//! Algorithm Registry
//!
//! The set of trainable algorithms, keyed by the identifiers the API
//! accepts, together with their default hyperparameters. Caller-supplied
//! hyperparameters are merged over the defaults; keys the algorithm does
//! not declare are dropped.

use std::collections::HashMap;

use serde_json::{json, Value};

use crate::error::CoreError;

/// Description of a trainable algorithm and its default hyperparameters
#[derive(Debug, Clone)]
pub struct AlgorithmSpec {
    pub key: String,
    pub defaults: HashMap<String, Value>,
}

impl AlgorithmSpec {
    /// Merge caller overrides over the defaults, dropping unknown keys.
    pub fn resolve(&self, overrides: &HashMap<String, Value>) -> HashMap<String, Value> {
        let mut merged = self.defaults.clone();
        for (key, value) in overrides {
            if merged.contains_key(key) {
                merged.insert(key.clone(), value.clone());
            }
        }
        merged
    }
}

/// Supported algorithm registry
#[derive(Debug, Clone)]
pub struct AlgorithmRegistry {
    specs: HashMap<String, AlgorithmSpec>,
}

impl AlgorithmRegistry {
    pub fn new() -> Self {
        Self {
            specs: HashMap::new(),
        }
    }

    pub fn register(&mut self, spec: AlgorithmSpec) {
        self.specs.insert(spec.key.clone(), spec);
    }

    /// Registry with the built-in algorithms.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(AlgorithmSpec {
            key: "logistic_regression".to_string(),
            defaults: HashMap::from([
                ("alpha".to_string(), json!(1.0)),
                ("max_iterations".to_string(), json!(200)),
                ("gradient_tolerance".to_string(), json!(1e-4)),
            ]),
        });
        registry.register(AlgorithmSpec {
            key: "random_forest".to_string(),
            defaults: HashMap::from([
                ("n_trees".to_string(), json!(200)),
                ("max_depth".to_string(), Value::Null),
                ("bootstrap_ratio".to_string(), json!(1.0)),
                ("random_state".to_string(), json!(42)),
            ]),
        });
        registry
    }

    /// Sorted list of algorithm keys.
    pub fn list_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.specs.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn get(&self, key: &str) -> Result<&AlgorithmSpec, CoreError> {
        self.specs
            .get(key)
            .ok_or_else(|| CoreError::UnknownModelKey(key.to_string()))
    }

    /// Default hyperparameters for a key.
    pub fn defaults(&self, key: &str) -> Result<HashMap<String, Value>, CoreError> {
        Ok(self.get(key)?.defaults.clone())
    }

    /// Merged hyperparameters for a key.
    pub fn resolve(
        &self,
        key: &str,
        overrides: &HashMap<String, Value>,
    ) -> Result<HashMap<String, Value>, CoreError> {
        Ok(self.get(key)?.resolve(overrides))
    }
}

impl Default for AlgorithmRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_keys_sorted() {
        let registry = AlgorithmRegistry::builtin();
        assert_eq!(
            registry.list_keys(),
            vec!["logistic_regression", "random_forest"]
        );
    }

    #[test]
    fn test_unknown_key() {
        let registry = AlgorithmRegistry::builtin();
        assert!(matches!(
            registry.get("gradient_boosting"),
            Err(CoreError::UnknownModelKey(_))
        ));
    }

    #[test]
    fn test_resolve_merges_and_drops_unknown_keys() {
        let registry = AlgorithmRegistry::builtin();
        let overrides = HashMap::from([
            ("n_trees".to_string(), json!(10)),
            ("learning_rate".to_string(), json!(0.1)),
        ]);

        let merged = registry.resolve("random_forest", &overrides).unwrap();
        assert_eq!(merged.get("n_trees"), Some(&json!(10)));
        assert_eq!(merged.get("random_state"), Some(&json!(42)));
        assert!(!merged.contains_key("learning_rate"));
    }

    #[test]
    fn test_defaults_are_copies() {
        let registry = AlgorithmRegistry::builtin();
        let mut defaults = registry.defaults("logistic_regression").unwrap();
        defaults.insert("alpha".to_string(), json!(9.0));

        let fresh = registry.defaults("logistic_regression").unwrap();
        assert_eq!(fresh.get("alpha"), Some(&json!(1.0)));
    }
}
