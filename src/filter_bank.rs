//! One estimator per parameter, updated in lockstep
//!
//! A bank only publishes a parameter set once every estimator in it has left
//! warm-up, so consumers never see a half-initialized pose.

use crate::{config::EstimatorConfig, filters::SignalEstimator, Error, Result};
use std::fmt::Debug;

/// Filtered values keyed by parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet<K> {
    values: Vec<(K, f64)>,
}

impl<K: Copy + PartialEq> ParameterSet<K> {
    #[must_use]
    pub fn get(&self, key: K) -> Option<f64> {
        self.values.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, f64)> + '_ {
        self.values.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Bank of named scalar estimators
pub struct ParameterFilterBank<K> {
    filters: Vec<(K, Box<dyn SignalEstimator>)>,
}

impl<K: Copy + PartialEq + Debug> ParameterFilterBank<K> {
    /// Create a bank from one estimator per key
    ///
    /// # Errors
    ///
    /// Returns an error if the bank is empty or a key appears twice
    pub fn new(filters: Vec<(K, Box<dyn SignalEstimator>)>) -> Result<Self> {
        if filters.is_empty() {
            return Err(Error::ConfigError("Filter bank needs at least one parameter".to_string()));
        }
        for (i, (key, _)) in filters.iter().enumerate() {
            if filters[..i].iter().any(|(k, _)| k == key) {
                return Err(Error::ConfigError(format!("Duplicate parameter {key:?} in filter bank")));
            }
        }
        log::info!("Initializing filter bank with {} parameters", filters.len());
        Ok(Self { filters })
    }

    /// Build a fresh estimator for every `(key, config)` pair
    ///
    /// # Errors
    ///
    /// Returns the first estimator configuration error
    pub fn from_configs<'a, I>(configs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, &'a EstimatorConfig)>,
    {
        let filters = configs
            .into_iter()
            .map(|(key, config)| Ok((key, config.build()?)))
            .collect::<Result<Vec<_>>>()?;
        Self::new(filters)
    }

    /// Feed one raw value per parameter
    ///
    /// Returns `Ok(None)` while any estimator is still warming up.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if a key is unknown, repeated or missing; no
    /// estimator is touched in that case
    pub fn update(&mut self, samples: &[(K, f64)]) -> Result<Option<ParameterSet<K>>> {
        if let Some((key, _)) = samples
            .iter()
            .find(|(key, _)| !self.filters.iter().any(|(k, _)| k == key))
        {
            return Err(Error::InvalidInput(format!("Unknown parameter {key:?}")));
        }
        for (key, _) in &self.filters {
            match samples.iter().filter(|(k, _)| k == key).count() {
                1 => {}
                0 => return Err(Error::InvalidInput(format!("Missing sample for {key:?}"))),
                _ => return Err(Error::InvalidInput(format!("Repeated sample for {key:?}"))),
            }
        }

        let mut ready = true;
        let mut values = Vec::with_capacity(self.filters.len());
        for (key, filter) in &mut self.filters {
            let key = *key;
            if let Some((_, sample)) = samples.iter().find(|(k, _)| *k == key) {
                filter.append(*sample);
            }
            match filter.estimate_current() {
                Some(value) => values.push((key, value)),
                None => ready = false,
            }
        }

        Ok(ready.then_some(ParameterSet { values }))
    }

    /// Current estimates without feeding new samples
    #[must_use]
    pub fn current(&self) -> Option<ParameterSet<K>> {
        self.filters
            .iter()
            .map(|(key, filter)| filter.estimate_current().map(|v| (*key, v)))
            .collect::<Option<Vec<_>>>()
            .map(|values| ParameterSet { values })
    }

    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.filters.iter().map(|(key, _)| *key)
    }

    pub fn reset(&mut self) {
        for (_, filter) in &mut self.filters {
            filter.reset();
        }
    }
}

/// `N × D` grid of estimators, one per keypoint coordinate
pub struct KeypointFilterBank<const D: usize> {
    filters: Vec<[Box<dyn SignalEstimator>; D]>,
}

/// Image-plane landmark smoothing
pub type LandmarkFilterBank = KeypointFilterBank<2>;

/// Smoothing of triangulated 3-D points
pub type PointCloudFilterBank = KeypointFilterBank<3>;

impl<const D: usize> KeypointFilterBank<D> {
    /// Create a grid with a fresh estimator per keypoint coordinate
    ///
    /// # Errors
    ///
    /// Returns an error if there are no keypoints or the configuration is invalid
    pub fn new(num_keypoints: usize, config: &EstimatorConfig) -> Result<Self> {
        if num_keypoints == 0 {
            return Err(Error::ConfigError(
                "Number of keypoints must be greater than 0".to_string(),
            ));
        }
        let filters = (0..num_keypoints)
            .map(|_| {
                let row = (0..D).map(|_| config.build()).collect::<Result<Vec<_>>>()?;
                row.try_into()
                    .map_err(|_| Error::ConfigError("Keypoint dimension mismatch".to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        log::info!("Initializing {num_keypoints}x{D} keypoint filter bank");
        Ok(Self { filters })
    }

    #[must_use]
    pub fn num_keypoints(&self) -> usize {
        self.filters.len()
    }

    /// Feed one frame of keypoints
    ///
    /// Returns `Ok(None)` until every coordinate estimator has a value.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the frame has the wrong number of keypoints
    pub fn update(&mut self, points: &[[f64; D]]) -> Result<Option<Vec<[f64; D]>>> {
        if points.len() != self.filters.len() {
            return Err(Error::InvalidInput(format!(
                "Expected {} keypoints, got {}",
                self.filters.len(),
                points.len()
            )));
        }

        let mut ready = true;
        let mut filtered = vec![[0.0; D]; points.len()];
        for ((row, point), out) in self.filters.iter_mut().zip(points).zip(&mut filtered) {
            for ((filter, &value), slot) in row.iter_mut().zip(point).zip(out.iter_mut()) {
                filter.append(value);
                match filter.estimate_current() {
                    Some(estimate) => *slot = estimate,
                    None => ready = false,
                }
            }
        }

        Ok(ready.then_some(filtered))
    }

    pub fn reset(&mut self) {
        for filter in self.filters.iter_mut().flatten() {
            filter.reset();
        }
    }
}
