//! Builds model-ready design matrices from response records and features.
//!
//! For every requested record the cell line's views and the drug's views are
//! looked up and laid side by side, in the order the views are listed, so row
//! `r` of `x` describes the same record as `y[r]`.

use crate::error::DatasetError;
use crate::features::FeatureDataset;
use crate::response::DrugResponseDataset;
use crate::split::Fold;
use ndarray::{Array1, Array2, ArrayView2, Axis, concatenate};

/// Where the features of a record come from.
#[derive(Debug, Clone, Copy)]
pub struct FeatureSources<'a> {
    pub cell_lines: &'a FeatureDataset,
    pub cell_line_views: &'a [&'a str],
    pub drugs: &'a FeatureDataset,
    pub drug_views: &'a [&'a str],
}

/// Inputs of an external model: the design matrix and the aligned response.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInput {
    pub x: Array2<f64>,
    pub y: Array1<f64>,
}

impl ModelInput {
    pub fn n_samples(&self) -> usize {
        self.y.len()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }
}

/// Model inputs for the three parts of one fold.
#[derive(Debug, Clone, PartialEq)]
pub struct FoldInputs {
    pub train: ModelInput,
    /// `None` when the fold carries no validation records.
    pub validation: Option<ModelInput>,
    pub test: ModelInput,
}

/// Assembles `x` and `y` for the records at `indices`.
///
/// # Errors
/// - `InvalidArgument` if an index is out of range.
/// - `MissingEntity` / `MissingView` if a record's cell line or drug, or one of
///   the requested views, is absent from the feature datasets.
pub fn assemble_model_input(
    response: &DrugResponseDataset,
    indices: &[usize],
    sources: &FeatureSources<'_>,
) -> Result<ModelInput, DatasetError> {
    if let Some(&bad) = indices.iter().find(|&&i| i >= response.len()) {
        return Err(DatasetError::InvalidArgument(format!(
            "record index {bad} is out of range for a dataset of {} records",
            response.len()
        )));
    }

    let cell_lines: Vec<&str> = indices
        .iter()
        .map(|&i| response.cell_line_ids()[i].as_str())
        .collect();
    let drugs: Vec<&str> = indices
        .iter()
        .map(|&i| response.drug_ids()[i].as_str())
        .collect();

    let mut blocks: Vec<Array2<f64>> =
        Vec::with_capacity(sources.cell_line_views.len() + sources.drug_views.len());
    for view in sources.cell_line_views {
        blocks.push(sources.cell_lines.get_feature_matrix(view, &cell_lines)?);
    }
    for view in sources.drug_views {
        blocks.push(sources.drugs.get_feature_matrix(view, &drugs)?);
    }

    let x = if blocks.is_empty() {
        Array2::zeros((indices.len(), 0))
    } else {
        let views: Vec<ArrayView2<f64>> = blocks.iter().map(|block| block.view()).collect();
        concatenate(Axis(1), &views).map_err(|e| DatasetError::ShapeMismatch(e.to_string()))?
    };
    let y = indices.iter().map(|&i| response.response()[i]).collect::<Array1<f64>>();

    Ok(ModelInput { x, y })
}

/// Assembles train, validation and test inputs for `fold`.
pub fn assemble_fold_inputs(
    response: &DrugResponseDataset,
    fold: &Fold,
    sources: &FeatureSources<'_>,
) -> Result<FoldInputs, DatasetError> {
    let train = assemble_model_input(response, &fold.train, sources)?;
    let validation = if fold.validation.is_empty() {
        None
    } else {
        Some(assemble_model_input(response, &fold.validation, sources)?)
    };
    let test = assemble_model_input(response, &fold.test, sources)?;

    log::debug!(
        "Assembled fold inputs with {} features: {} train, {} validation, {} test rows",
        train.n_features(),
        train.n_samples(),
        validation.as_ref().map_or(0, ModelInput::n_samples),
        test.n_samples()
    );
    Ok(FoldInputs {
        train,
        validation,
        test,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::tests::dataset_from;
    use crate::response::TargetType;
    use ndarray::array;

    fn response() -> DrugResponseDataset {
        DrugResponseDataset::new(
            TargetType::Ic50,
            array![0.5, 1.5, 2.5],
            vec!["CL1".into(), "CL2".into(), "CL1".into()],
            vec!["D1".into(), "D1".into(), "D2".into()],
        )
        .unwrap()
    }

    fn cell_lines() -> FeatureDataset {
        dataset_from(vec![
            ("CL1", vec![("gene_expression", array![1.0, 2.0]), ("methylation", array![0.1])]),
            ("CL2", vec![("gene_expression", array![3.0, 4.0]), ("methylation", array![0.2])]),
        ])
    }

    fn drugs() -> FeatureDataset {
        dataset_from(vec![
            ("D1", vec![("fingerprints", array![1.0, 0.0, 1.0])]),
            ("D2", vec![("fingerprints", array![0.0, 1.0, 0.0])]),
        ])
    }

    #[test]
    fn test_views_are_concatenated_in_listed_order() {
        let response = response();
        let (cells, compounds) = (cell_lines(), drugs());
        let sources = FeatureSources {
            cell_lines: &cells,
            cell_line_views: &["methylation", "gene_expression"],
            drugs: &compounds,
            drug_views: &["fingerprints"],
        };

        let input = assemble_model_input(&response, &[2, 1], &sources).unwrap();
        assert_eq!(
            input.x,
            array![
                [0.1, 1.0, 2.0, 0.0, 1.0, 0.0],
                [0.2, 3.0, 4.0, 1.0, 0.0, 1.0]
            ]
        );
        assert_eq!(input.y, array![2.5, 1.5]);
        assert_eq!(input.n_features(), 6);
    }

    #[test]
    fn test_missing_drug_features_propagate() {
        let response = DrugResponseDataset::new(
            TargetType::Ic50,
            array![0.5],
            vec!["CL1".into()],
            vec!["D9".into()],
        )
        .unwrap();
        let (cells, compounds) = (cell_lines(), drugs());
        let sources = FeatureSources {
            cell_lines: &cells,
            cell_line_views: &["gene_expression"],
            drugs: &compounds,
            drug_views: &["fingerprints"],
        };
        match assemble_model_input(&response, &[0], &sources) {
            Err(DatasetError::MissingEntity(entity)) => assert_eq!(entity, "D9"),
            other => panic!("Expected MissingEntity, got {other:?}"),
        }
        assert!(matches!(
            assemble_model_input(&response, &[1], &sources),
            Err(DatasetError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_fold_inputs_skip_empty_validation() {
        let response = response();
        let (cells, compounds) = (cell_lines(), drugs());
        let sources = FeatureSources {
            cell_lines: &cells,
            cell_line_views: &["gene_expression"],
            drugs: &compounds,
            drug_views: &[],
        };
        let fold = Fold {
            train: vec![0, 1],
            validation: Vec::new(),
            test: vec![2],
        };
        let inputs = assemble_fold_inputs(&response, &fold, &sources).unwrap();
        assert!(inputs.validation.is_none());
        assert_eq!(inputs.train.x.shape(), &[2, 2]);
        assert_eq!(inputs.test.x, array![[1.0, 2.0]]);
        assert_eq!(inputs.test.y, array![2.5]);
    }
}
