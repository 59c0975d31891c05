#![deny(dead_code)]
#![deny(unused_imports)]
//! # dreval
//!
//! The dataset and cross-validation core of a drug-response prediction
//! benchmark. Response measurements (cell line × drug → value) live in a
//! [`DrugResponseDataset`]; per-entity feature vectors keyed by view name live
//! in a [`FeatureDataset`]. The response dataset is split into folds, and each
//! fold's records are turned into flat design matrices for an external model.

pub mod assemble;
pub mod error;
pub mod features;
pub mod persist;
pub mod randomize;
pub mod response;

#[path = "../split/mod.rs"]
pub mod split;

pub use assemble::{
    FeatureSources, FoldInputs, ModelInput, assemble_fold_inputs, assemble_model_input,
};
pub use error::DatasetError;
pub use features::{FeatureDataset, NormalizationParameters, ViewStatistics};
pub use persist::{Persist, ResponseColumns};
pub use randomize::RandomizationMode;
pub use response::{DrugResponseDataset, TargetType};
pub use split::{Fold, SplitConfig, SplitMode};
