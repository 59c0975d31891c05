//! Feature randomization for ablation studies.
//!
//! Each mode destroys the information carried by the targeted views while
//! leaving every other view bit-identical. All randomness comes from the
//! caller-supplied generator, so a seeded `StdRng` reproduces a run exactly.

use crate::error::DatasetError;
use crate::features::FeatureDataset;
use ndarray::Array1;
use rand::Rng;
use rand::seq::SliceRandom;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RandomizationMode {
    /// Entities exchange their vectors for the targeted views.
    Permutation,
    /// Vectors are redrawn from a normal distribution fitted to each vector.
    Gaussian,
    /// Vectors are replaced by zeros.
    Zeroing,
}

impl RandomizationMode {
    pub const ALL: [RandomizationMode; 3] = [
        RandomizationMode::Permutation,
        RandomizationMode::Gaussian,
        RandomizationMode::Zeroing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RandomizationMode::Permutation => "permutation",
            RandomizationMode::Gaussian => "gaussian",
            RandomizationMode::Zeroing => "zeroing",
        }
    }
}

impl fmt::Display for RandomizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RandomizationMode {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RandomizationMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| {
                DatasetError::InvalidArgument(format!(
                    "Unknown randomization mode '{s}'. Choose from 'permutation', 'gaussian', 'zeroing'."
                ))
            })
    }
}

impl FeatureDataset {
    /// Randomizes the named views of every entity in place.
    ///
    /// This is destructive: the original values of the targeted views are
    /// discarded. Use [`FeatureDataset::randomized`] to keep the source intact.
    ///
    /// - `Permutation` samples a single shuffle of the entities per call and
    ///   applies it to every targeted view, so entity `i` receives the vectors of
    ///   entity `perm[i]`. An entity may draw itself.
    /// - `Gaussian` replaces each vector with i.i.d. draws from
    ///   `N(mean(v), std(v))`, using the population standard deviation of that
    ///   entity's own original vector. A constant vector stays constant.
    /// - `Zeroing` replaces each vector with zeros of the same length.
    ///
    /// # Errors
    /// `MissingView` if any requested view does not exist. Nothing is mutated in
    /// that case.
    pub fn randomize_features<S, R>(
        &mut self,
        views_to_randomize: &[S],
        mode: RandomizationMode,
        rng: &mut R,
    ) -> Result<(), DatasetError>
    where
        S: AsRef<str>,
        R: Rng + ?Sized,
    {
        let views = self.resolve_views(views_to_randomize)?;
        log::debug!(
            "Randomizing views {views:?} of {} entities ({mode})",
            self.len()
        );

        match mode {
            RandomizationMode::Permutation => self.permute_views(&views, rng),
            RandomizationMode::Gaussian => self.resample_views(&views, rng),
            RandomizationMode::Zeroing => self.zero_views(&views),
        }
    }

    /// Copy-then-mutate counterpart of [`FeatureDataset::randomize_features`].
    pub fn randomized<S, R>(
        &self,
        views_to_randomize: &[S],
        mode: RandomizationMode,
        rng: &mut R,
    ) -> Result<FeatureDataset, DatasetError>
    where
        S: AsRef<str>,
        R: Rng + ?Sized,
    {
        let mut copy = self.clone();
        copy.randomize_features(views_to_randomize, mode, rng)?;
        Ok(copy)
    }

    fn permute_views<R: Rng + ?Sized>(
        &mut self,
        views: &[String],
        rng: &mut R,
    ) -> Result<(), DatasetError> {
        let mut sources: Vec<usize> = (0..self.identifier.len()).collect();
        sources.shuffle(rng);

        let entities = self.identifier.clone();
        for view in views {
            let originals = entities
                .iter()
                .map(|entity| self.get_feature_vector(entity, view).cloned())
                .collect::<Result<Vec<Array1<f64>>, _>>()?;

            for (entity, &source) in entities.iter().zip(&sources) {
                *self.get_feature_vector_mut(entity, view)? = originals[source].clone();
            }
        }
        Ok(())
    }

    fn resample_views<R: Rng + ?Sized>(
        &mut self,
        views: &[String],
        rng: &mut R,
    ) -> Result<(), DatasetError> {
        let entities = self.identifier.clone();
        for view in views {
            for entity in &entities {
                let vector = self.get_feature_vector_mut(entity, view)?;
                let Some(mean) = vector.mean() else {
                    continue;
                };
                let std = vector.std(0.0);

                if std.is_finite() && std > 0.0 {
                    let normal = Normal::new(mean, std).map_err(|e| {
                        DatasetError::InvalidArgument(format!(
                            "cannot sample view '{view}' of entity '{entity}': {e}"
                        ))
                    })?;
                    vector.iter_mut().for_each(|value| *value = normal.sample(rng));
                } else {
                    vector.fill(mean);
                }
            }
        }
        Ok(())
    }

    fn zero_views(&mut self, views: &[String]) -> Result<(), DatasetError> {
        let entities = self.identifier.clone();
        for view in views {
            for entity in &entities {
                self.get_feature_vector_mut(entity, view)?.fill(0.0);
            }
        }
        Ok(())
    }
}
