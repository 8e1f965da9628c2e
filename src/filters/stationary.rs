use super::{sliding_window::SlidingWindowEstimator, SignalEstimator};
use crate::{Error, Result};

/// Where the hysteresis state machine currently sits
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StationaryState {
    /// Output frozen at the captured value
    Stationary { value: f64 },
    /// Newest samples left the band but have not yet outlasted the debounce count
    Transitioning { value: f64, out_of_band: usize },
    /// The base estimator drives the output
    Active,
}

/// Jitter suppression around a fixation
///
/// While the newest raw sample stays within `threshold` of the mean of the
/// retained raw samples, the output is frozen at the base estimator's value from
/// the moment the band was entered. `debounce_count` consecutive out-of-band
/// samples are needed before the base estimator takes over again.
#[derive(Debug, Clone)]
pub struct StationaryHysteresisEstimator {
    base: SlidingWindowEstimator,
    threshold: f64,
    debounce_count: usize,
    stationary_value: Option<f64>,
    out_of_band: usize,
    current: Option<f64>,
}

impl StationaryHysteresisEstimator {
    /// Wrap a sliding window estimator with a stationary band
    ///
    /// # Errors
    ///
    /// Returns an error if the threshold is negative or not finite
    pub fn new(base: SlidingWindowEstimator, threshold: f64, debounce_count: usize) -> Result<Self> {
        if !(threshold.is_finite() && threshold >= 0.0) {
            return Err(Error::ConfigError(format!(
                "Stationary threshold must be non-negative, got {threshold}"
            )));
        }
        Ok(Self {
            base,
            threshold,
            debounce_count,
            stationary_value: None,
            out_of_band: 0,
            current: None,
        })
    }

    #[must_use]
    pub fn state(&self) -> StationaryState {
        match self.stationary_value {
            Some(value) if self.out_of_band > 0 => StationaryState::Transitioning {
                value,
                out_of_band: self.out_of_band,
            },
            Some(value) => StationaryState::Stationary { value },
            None => StationaryState::Active,
        }
    }

    #[must_use]
    pub const fn base(&self) -> &SlidingWindowEstimator {
        &self.base
    }

    fn in_stationary_range(&self, value: f64) -> bool {
        self.base
            .window()
            .mean()
            .is_some_and(|center| (center - self.threshold..=center + self.threshold).contains(&value))
    }
}

impl SignalEstimator for StationaryHysteresisEstimator {
    fn append(&mut self, sample: f64) {
        self.base.append(sample);

        if self.in_stationary_range(sample) {
            self.out_of_band = 0;
            if self.stationary_value.is_none() {
                self.stationary_value = self.base.estimate_current();
                if let Some(value) = self.stationary_value {
                    log::debug!("Stationary: output frozen at {value:.4}");
                }
            }
            self.current = self.stationary_value;
            return;
        }

        self.out_of_band += 1;
        if self.out_of_band >= self.debounce_count {
            if self.stationary_value.take().is_some() {
                log::debug!("Stationary: released after {} samples", self.out_of_band);
            }
            self.current = self.base.estimate_current();
        } else {
            self.current = self.stationary_value;
        }
    }

    fn estimate_current(&self) -> Option<f64> {
        self.current
    }

    fn reset(&mut self) {
        self.base.reset();
        self.stationary_value = None;
        self.out_of_band = 0;
        self.current = None;
    }

    fn name(&self) -> &str {
        "StationaryHysteresisEstimator"
    }
}
