//! # Feature Datasets
//!
//! A [`FeatureDataset`] holds one numeric vector per (entity, view) pair, where an
//! entity is a cell line or a drug and a view is a feature modality such as gene
//! expression or a chemical fingerprint.
//!
//! - Strict Schema: every entity carries exactly the same views, and a view has
//!   the same dimension for every entity. Both are validated at construction, so
//!   matrix assembly never has to guess.
//! - Stable Ordering: entity identifiers and view names keep the order in which
//!   they were supplied. View order is taken from the first entity.
//! - Fresh Allocation: matrices handed out by [`FeatureDataset::get_feature_matrix`]
//!   are owned copies, never views into the internal storage.

use crate::error::DatasetError;
use ahash::{AHashMap, AHashSet};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-entity, per-view numeric features.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureDataset {
    pub(crate) features: AHashMap<String, AHashMap<String, Array1<f64>>>,
    pub(crate) view_names: Vec<String>,
    pub(crate) identifier: Vec<String>,
}

/// Column-wise location and scale of a single view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewStatistics {
    pub mean: Array1<f64>,
    pub std: Array1<f64>,
}

/// Statistics for every view of a dataset, as produced by
/// [`FeatureDataset::get_mean_and_standard_deviation`].
///
/// Computing these on a training split and applying them to the matching test
/// split keeps test information out of the normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizationParameters {
    pub views: BTreeMap<String, ViewStatistics>,
}

impl FeatureDataset {
    /// Builds a dataset from `(entity, [(view, vector), ...])` entries.
    ///
    /// # Errors
    /// - `EmptyDataset` when no entities are supplied.
    /// - `DuplicateEntity` when an identifier occurs twice.
    /// - `SchemaMismatch` when an entity repeats a view, lacks a view of the first
    ///   entity, carries an extra view, or disagrees on a view's dimension.
    pub fn new<I, V>(entries: I) -> Result<Self, DatasetError>
    where
        I: IntoIterator<Item = (String, V)>,
        V: IntoIterator<Item = (String, Array1<f64>)>,
    {
        let mut features: AHashMap<String, AHashMap<String, Array1<f64>>> = AHashMap::new();
        let mut identifier: Vec<String> = Vec::new();
        let mut view_names: Vec<String> = Vec::new();
        let mut dimensions: AHashMap<String, usize> = AHashMap::new();

        for (entity, views) in entries {
            if features.contains_key(&entity) {
                return Err(DatasetError::DuplicateEntity(entity));
            }

            let mut entity_views: AHashMap<String, Array1<f64>> = AHashMap::new();
            let mut order: Vec<String> = Vec::new();
            for (view, vector) in views {
                if entity_views.contains_key(&view) {
                    return Err(DatasetError::SchemaMismatch(format!(
                        "entity '{entity}' lists view '{view}' more than once"
                    )));
                }
                order.push(view.clone());
                entity_views.insert(view, vector);
            }

            if identifier.is_empty() {
                for view in &order {
                    dimensions.insert(view.clone(), entity_views[view].len());
                }
                view_names = order;
            } else {
                validate_against_reference(
                    &entity,
                    &entity_views,
                    &view_names,
                    &dimensions,
                    &identifier[0],
                )?;
            }

            identifier.push(entity.clone());
            features.insert(entity, entity_views);
        }

        if identifier.is_empty() {
            return Err(DatasetError::EmptyDataset("feature dataset"));
        }

        log::debug!(
            "Constructed feature dataset with {} entities and views {:?}",
            identifier.len(),
            view_names
        );

        Ok(Self {
            features,
            view_names,
            identifier,
        })
    }

    /// Entity identifiers in construction order.
    pub fn get_ids(&self) -> &[String] {
        &self.identifier
    }

    /// View names in the order of the first entity.
    pub fn get_view_names(&self) -> &[String] {
        &self.view_names
    }

    pub fn len(&self) -> usize {
        self.identifier.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifier.is_empty()
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.features.contains_key(entity)
    }

    /// Number of components of `view`, or `None` if the view is unknown.
    pub fn view_dimension(&self, view: &str) -> Option<usize> {
        let first = self.identifier.first()?;
        self.features.get(first)?.get(view).map(Array1::len)
    }

    /// The stored vector of one entity for one view.
    pub fn get_feature_vector(&self, entity: &str, view: &str) -> Result<&Array1<f64>, DatasetError> {
        self.features
            .get(entity)
            .ok_or_else(|| DatasetError::MissingEntity(entity.to_string()))?
            .get(view)
            .ok_or_else(|| DatasetError::missing_view(view, entity))
    }

    pub(crate) fn get_feature_vector_mut(
        &mut self,
        entity: &str,
        view: &str,
    ) -> Result<&mut Array1<f64>, DatasetError> {
        self.features
            .get_mut(entity)
            .ok_or_else(|| DatasetError::MissingEntity(entity.to_string()))?
            .get_mut(view)
            .ok_or_else(|| DatasetError::missing_view(view, entity))
    }

    /// Stacks the `view` vectors of `identifiers`, in the given order, into a
    /// matrix of shape `[identifiers.len(), view_dimension]`.
    ///
    /// Identifiers may repeat; a drug measured against many cell lines yields one
    /// row per measurement.
    pub fn get_feature_matrix<S: AsRef<str>>(
        &self,
        view: &str,
        identifiers: &[S],
    ) -> Result<Array2<f64>, DatasetError> {
        let dimension = self
            .view_dimension(view)
            .ok_or_else(|| DatasetError::missing_view(view, &self.identifier[0]))?;

        let mut matrix = Array2::zeros((identifiers.len(), dimension));
        for (row, entity) in identifiers.iter().enumerate() {
            let vector = self.get_feature_vector(entity.as_ref(), view)?;
            matrix.row_mut(row).assign(vector);
        }
        Ok(matrix)
    }

    /// Column-wise mean and population standard deviation of every view,
    /// computed across all entities.
    pub fn get_mean_and_standard_deviation(&self) -> Result<NormalizationParameters, DatasetError> {
        let mut views = BTreeMap::new();
        for view in &self.view_names {
            let matrix = self.get_feature_matrix(view, &self.identifier)?;
            let mean = matrix
                .mean_axis(Axis(0))
                .ok_or(DatasetError::EmptyDataset("feature dataset"))?;
            let std = matrix.std_axis(Axis(0), 0.0);
            views.insert(view.clone(), ViewStatistics { mean, std });
        }
        Ok(NormalizationParameters { views })
    }

    /// Z-scores the named views in place using `parameters`.
    ///
    /// Columns whose standard deviation is zero or non-finite are only centered.
    /// The original values are discarded.
    pub fn normalize_features<S: AsRef<str>>(
        &mut self,
        views: &[S],
        parameters: &NormalizationParameters,
    ) -> Result<(), DatasetError> {
        let views = self.resolve_views(views)?;

        for view in &views {
            let stats = parameters.views.get(view).ok_or_else(|| {
                DatasetError::InvalidArgument(format!(
                    "no normalization parameters were supplied for view '{view}'"
                ))
            })?;
            let dimension = self.view_dimension(view).unwrap_or(0);
            if stats.mean.len() != dimension || stats.std.len() != dimension {
                return Err(DatasetError::ShapeMismatch(format!(
                    "view '{view}' has dimension {dimension}, but its normalization parameters have {} means and {} standard deviations",
                    stats.mean.len(),
                    stats.std.len()
                )));
            }

            let scale = stats
                .std
                .mapv(|s| if s.is_finite() && s > 0.0 { s } else { 1.0 });
            let entities = self.identifier.clone();
            for entity in &entities {
                let vector = self.get_feature_vector_mut(entity, view)?;
                let normalized = (&*vector - &stats.mean) / &scale;
                *vector = normalized;
            }
        }

        log::debug!("Normalized views {views:?} across {} entities", self.len());
        Ok(())
    }

    /// Checks that every requested view exists and returns them without duplicates,
    /// preserving the requested order.
    pub(crate) fn resolve_views<S: AsRef<str>>(&self, views: &[S]) -> Result<Vec<String>, DatasetError> {
        let mut seen = AHashSet::new();
        let mut resolved = Vec::with_capacity(views.len());
        for view in views {
            let view = view.as_ref();
            if self.view_dimension(view).is_none() {
                return Err(DatasetError::missing_view(view, &self.identifier[0]));
            }
            if seen.insert(view.to_string()) {
                resolved.push(view.to_string());
            }
        }
        Ok(resolved)
    }
}

fn validate_against_reference(
    entity: &str,
    entity_views: &AHashMap<String, Array1<f64>>,
    view_names: &[String],
    dimensions: &AHashMap<String, usize>,
    reference: &str,
) -> Result<(), DatasetError> {
    for view in view_names {
        let vector = entity_views.get(view).ok_or_else(|| {
            DatasetError::SchemaMismatch(format!(
                "entity '{entity}' is missing view '{view}', which entity '{reference}' provides"
            ))
        })?;
        let expected = dimensions[view];
        if vector.len() != expected {
            return Err(DatasetError::SchemaMismatch(format!(
                "view '{view}' has dimension {expected} on entity '{reference}' but {} on entity '{entity}'",
                vector.len()
            )));
        }
    }

    if let Some(extra) = entity_views.keys().find(|view| !dimensions.contains_key(*view)) {
        return Err(DatasetError::SchemaMismatch(format!(
            "entity '{entity}' has view '{extra}', which entity '{reference}' does not provide"
        )));
    }
    Ok(())
}
