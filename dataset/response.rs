//! # Drug Response Datasets
//!
//! A [`DrugResponseDataset`] is three index-aligned columns: the measured
//! response, the cell line it was measured on and the drug that was applied.
//! Record `i` is `(cell_line_ids[i], drug_ids[i], response[i])`.
//!
//! The core columns never change after construction. Only two pieces of state
//! are mutable: predictions emitted by an external model and the cached
//! cross-validation folds.

use crate::error::DatasetError;
use crate::split::{self, Fold, SplitConfig};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of value stored in the response column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetType {
    #[serde(rename = "IC50")]
    Ic50,
    #[serde(rename = "EC50")]
    Ec50,
    #[serde(rename = "AUC")]
    Auc,
    #[serde(rename = "classification")]
    Classification,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Ic50 => "IC50",
            TargetType::Ec50 => "EC50",
            TargetType::Auc => "AUC",
            TargetType::Classification => "classification",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ic50" => Ok(TargetType::Ic50),
            "ec50" => Ok(TargetType::Ec50),
            "auc" => Ok(TargetType::Auc),
            "classification" => Ok(TargetType::Classification),
            _ => Err(DatasetError::InvalidArgument(format!(
                "Unknown target type '{s}'. Choose from 'IC50', 'EC50', 'AUC', 'classification'."
            ))),
        }
    }
}

/// Drug response measurements, one record per (cell line, drug) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct DrugResponseDataset {
    target_type: TargetType,
    response: Array1<f64>,
    cell_line_ids: Vec<String>,
    drug_ids: Vec<String>,
    predictions: Option<Array1<f64>>,
    cv_splits: Option<Vec<Fold>>,
}

impl DrugResponseDataset {
    /// Creates a dataset from already aligned columns.
    ///
    /// # Errors
    /// `ShapeMismatch` if the three columns differ in length, `NonFinite` if a
    /// response value is NaN or infinite.
    pub fn new(
        target_type: TargetType,
        response: Array1<f64>,
        cell_line_ids: Vec<String>,
        drug_ids: Vec<String>,
    ) -> Result<Self, DatasetError> {
        if response.len() != cell_line_ids.len() || response.len() != drug_ids.len() {
            return Err(DatasetError::ShapeMismatch(format!(
                "response has {} entries, cell_line_ids has {}, drug_ids has {}",
                response.len(),
                cell_line_ids.len(),
                drug_ids.len()
            )));
        }
        if response.iter().any(|v| !v.is_finite()) {
            return Err(DatasetError::NonFinite("response".to_string()));
        }

        Ok(Self {
            target_type,
            response,
            cell_line_ids,
            drug_ids,
            predictions: None,
            cv_splits: None,
        })
    }

    pub fn target_type(&self) -> TargetType {
        self.target_type
    }

    pub fn response(&self) -> &Array1<f64> {
        &self.response
    }

    pub fn cell_line_ids(&self) -> &[String] {
        &self.cell_line_ids
    }

    pub fn drug_ids(&self) -> &[String] {
        &self.drug_ids
    }

    pub fn predictions(&self) -> Option<&Array1<f64>> {
        self.predictions.as_ref()
    }

    /// Folds produced by the most recent [`DrugResponseDataset::split_dataset`] call.
    pub fn cv_splits(&self) -> Option<&[Fold]> {
        self.cv_splits.as_deref()
    }

    pub fn len(&self) -> usize {
        self.response.len()
    }

    pub fn is_empty(&self) -> bool {
        self.response.is_empty()
    }

    /// Stores model predictions, one per record, replacing any earlier ones.
    pub fn set_predictions(&mut self, predictions: Array1<f64>) -> Result<(), DatasetError> {
        if predictions.len() != self.len() {
            return Err(DatasetError::ShapeMismatch(format!(
                "expected {} predictions, got {}",
                self.len(),
                predictions.len()
            )));
        }
        if predictions.iter().any(|v| !v.is_finite()) {
            return Err(DatasetError::NonFinite("predictions".to_string()));
        }
        self.predictions = Some(predictions);
        Ok(())
    }

    /// Returns a dataset holding the records at `indices`, in that order.
    ///
    /// Predictions are carried along when present. The fold cache is not.
    pub fn subset(&self, indices: &[usize]) -> Result<Self, DatasetError> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.len()) {
            return Err(DatasetError::InvalidArgument(format!(
                "record index {bad} is out of range for a dataset of {} records",
                self.len()
            )));
        }

        let response = indices.iter().map(|&i| self.response[i]).collect::<Array1<f64>>();
        let cell_line_ids = indices.iter().map(|&i| self.cell_line_ids[i].clone()).collect();
        let drug_ids = indices.iter().map(|&i| self.drug_ids[i].clone()).collect();
        let predictions = self
            .predictions
            .as_ref()
            .map(|p| indices.iter().map(|&i| p[i]).collect::<Array1<f64>>());

        Ok(Self {
            target_type: self.target_type,
            response,
            cell_line_ids,
            drug_ids,
            predictions,
            cv_splits: None,
        })
    }

    /// Splits the records into cross-validation folds and caches the result.
    ///
    /// # Errors
    /// - `NotImplemented` for the leave-cell-line-out and leave-drug-out modes.
    /// - `InvalidArgument` for a fold count outside `2..=len()` or a validation
    ///   ratio outside `[0, 1)`.
    ///
    /// A failed call clears any folds cached by an earlier call.
    pub fn split_dataset(&mut self, config: &SplitConfig) -> Result<&[Fold], DatasetError> {
        let folds = match split::split_records(self.len(), config) {
            Ok(folds) => folds,
            Err(e) => {
                self.cv_splits = None;
                return Err(e);
            }
        };
        let cached = self.cv_splits.insert(folds);
        Ok(cached.as_slice())
    }
}
