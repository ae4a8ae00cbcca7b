//! Models Module
//!
//! Everything between an uploaded dataset and a served prediction: the
//! algorithm registry, feature preprocessing, the estimators, evaluation
//! metrics, the model store, and the training and inference services.

pub mod estimator;
pub mod inference;
pub mod metrics;
pub mod preprocess;
pub mod registry;
pub mod store;
pub mod training;

pub use estimator::Estimator;
pub use inference::{InferenceService, Prediction};
pub use preprocess::{FeatureSchema, TargetEncoder};
pub use registry::{AlgorithmRegistry, AlgorithmSpec};
pub use store::{ModelArtifact, ModelRecord, ModelStore};
pub use training::{TrainOutcome, TrainSpec, TrainingService};
