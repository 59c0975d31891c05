//! # Cross-Validation Splitting
//!
//! Turns the records of a drug response dataset into folds. A fold lists record
//! indices only; callers look the records and their features up themselves.

mod lpo;

pub use lpo::leave_pair_out_cv;

use crate::error::DatasetError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Which unit of data a fold holds out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitMode {
    /// Leave-pair-out: individual (cell line, drug) records are held out.
    #[serde(rename = "LPO")]
    Lpo,
    /// Leave-cell-line-out: every record of a cell line is held out together.
    #[serde(rename = "LCO")]
    Lco,
    /// Leave-drug-out: every record of a drug is held out together.
    #[serde(rename = "LDO")]
    Ldo,
}

impl SplitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitMode::Lpo => "LPO",
            SplitMode::Lco => "LCO",
            SplitMode::Ldo => "LDO",
        }
    }
}

impl fmt::Display for SplitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitMode {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LPO" => Ok(SplitMode::Lpo),
            "LCO" => Ok(SplitMode::Lco),
            "LDO" => Ok(SplitMode::Ldo),
            _ => Err(DatasetError::InvalidArgument(format!(
                "Unknown split mode '{s}'. Choose from 'LPO', 'LCO', 'LDO'."
            ))),
        }
    }
}

/// Parameters of a cross-validation run.
///
/// Every field has a default, so a TOML file only needs the values it wants to
/// override:
///
/// ```toml
/// n_cv_splits = 10
/// mode = "LPO"
/// validation_ratio = 0.2
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SplitConfig {
    pub n_cv_splits: usize,
    pub mode: SplitMode,
    /// Carve a validation set out of each fold's training pool.
    pub split_validation: bool,
    /// Fraction of the training pool moved to validation.
    pub validation_ratio: f64,
    /// Seed of the generator used for shuffling and validation sampling.
    pub random_state: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            n_cv_splits: 5,
            mode: SplitMode::Lpo,
            split_validation: true,
            validation_ratio: 0.1,
            random_state: 42,
        }
    }
}

impl SplitConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, DatasetError> {
        Ok(toml::from_str(contents)?)
    }

    /// Reads a configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> Result<String, DatasetError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// One train/validation/test partition. All index lists are sorted ascending
/// and pairwise disjoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fold {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
    pub test: Vec<usize>,
}

impl Fold {
    /// Every record that is not in the test set, i.e. train plus validation.
    pub fn training_pool(&self) -> Vec<usize> {
        let mut pool: Vec<usize> = self.train.iter().chain(&self.validation).copied().collect();
        pool.sort_unstable();
        pool
    }
}

/// Splits `n_records` records according to `config`.
pub fn split_records(n_records: usize, config: &SplitConfig) -> Result<Vec<Fold>, DatasetError> {
    match config.mode {
        SplitMode::Lpo => leave_pair_out_cv(
            n_records,
            config.n_cv_splits,
            config.split_validation,
            config.validation_ratio,
            config.random_state,
        ),
        SplitMode::Lco => Err(DatasetError::NotImplemented(
            "LCO split mode (leave-cell-line-out)".to_string(),
        )),
        SplitMode::Ldo => Err(DatasetError::NotImplemented(
            "LDO split mode (leave-drug-out)".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_mode_parsing() {
        assert_eq!("LPO".parse::<SplitMode>().unwrap(), SplitMode::Lpo);
        assert_eq!("lco".parse::<SplitMode>().unwrap(), SplitMode::Lco);
        assert_eq!("Ldo".parse::<SplitMode>().unwrap(), SplitMode::Ldo);
        match "LTO".parse::<SplitMode>() {
            Err(DatasetError::InvalidArgument(message)) => assert!(message.contains("LTO")),
            other => panic!("Expected InvalidArgument, got {other:?}"),
        }
    }

    #[test]
    fn test_config_defaults_fill_missing_toml_fields() {
        let config = SplitConfig::from_toml_str("n_cv_splits = 10\nmode = \"LPO\"\n").unwrap();
        assert_eq!(config.n_cv_splits, 10);
        assert_eq!(config.mode, SplitMode::Lpo);
        assert!(config.split_validation);
        assert_eq!(config.validation_ratio, 0.1);
        assert_eq!(config.random_state, 42);

        let empty = SplitConfig::from_toml_str("").unwrap();
        assert_eq!(empty, SplitConfig::default());
    }

    #[test]
    fn test_config_rejects_unknown_fields_and_modes() {
        assert!(matches!(
            SplitConfig::from_toml_str("n_folds = 3"),
            Err(DatasetError::TomlParse(_))
        ));
        assert!(matches!(
            SplitConfig::from_toml_str("mode = \"LXO\""),
            Err(DatasetError::TomlParse(_))
        ));
    }

    #[test]
    fn test_config_survives_a_toml_round_trip() {
        let config = SplitConfig {
            n_cv_splits: 7,
            mode: SplitMode::Ldo,
            split_validation: false,
            validation_ratio: 0.25,
            random_state: 9,
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(SplitConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_training_pool_merges_train_and_validation() {
        let fold = Fold {
            train: vec![0, 4, 5],
            validation: vec![2],
            test: vec![1, 3],
        };
        assert_eq!(fold.training_pool(), vec![0, 2, 4, 5]);
    }
}
