use super::{
    regression::{polyfit, polyval, ransac_line, RansacParams},
    smoothing::Smoothing,
    SignalEstimator,
};
use crate::{ring_buffer::RingBuffer, utils::safe_cast::usize_to_f64, Error, Result};

/// How the current value is read out of the window
#[derive(Debug, Clone, PartialEq)]
pub enum Estimation {
    /// Most recent sample
    Raw,
    /// Mean of the retained samples
    Mean,
    /// Median of the retained samples
    Median,
    /// Least-squares polynomial of the given degree, evaluated at the newest sample
    Polynomial { degree: usize },
    /// FIR filter: dot product of fixed weights with the smoothed window
    Kernel { weights: Vec<f64> },
    /// RANSAC-robust line evaluated at the newest sample
    RansacLinear(RansacParams),
}

impl Estimation {
    /// Whether this mode waits for a full window before producing output
    #[must_use]
    pub const fn needs_full_window(&self) -> bool {
        matches!(
            self,
            Self::Polynomial { .. } | Self::Kernel { .. } | Self::RansacLinear(_)
        )
    }

    fn validate(&self, window_size: usize) -> Result<()> {
        match self {
            Self::Polynomial { degree } if *degree >= window_size => Err(Error::ConfigError(format!(
                "Polynomial degree {degree} needs a window larger than {window_size}"
            ))),
            Self::Kernel { weights } if weights.len() != window_size => Err(Error::ConfigError(format!(
                "Kernel has {} weights but the window holds {window_size} samples",
                weights.len()
            ))),
            Self::RansacLinear(_) if window_size < 2 => Err(Error::ConfigError(
                "RANSAC line estimation needs a window of at least 2 samples".to_string(),
            )),
            Self::RansacLinear(params) if params.trials == 0 => Err(Error::ConfigError(
                "RANSAC needs at least one trial".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// 1-D sliding window noise filter
///
/// Mean/median/raw read whatever the window currently holds. Polynomial, kernel
/// and RANSAC modes stay silent (`None`) until the window is full, then run the
/// smoothing step over the time series `t = -(N-1)..=0` and evaluate at `t = 0`.
#[derive(Debug, Clone)]
pub struct SlidingWindowEstimator {
    window: RingBuffer<f64>,
    smoothing: Smoothing,
    estimation: Estimation,
}

impl SlidingWindowEstimator {
    /// Create a new sliding window estimator
    ///
    /// # Errors
    ///
    /// Returns an error if the window is empty or the modes do not fit the window
    pub fn new(window_size: usize, smoothing: Smoothing, estimation: Estimation) -> Result<Self> {
        let window = RingBuffer::new(window_size)?;
        smoothing.validate(window_size)?;
        estimation.validate(window_size)?;
        Ok(Self {
            window,
            smoothing,
            estimation,
        })
    }

    /// Underlying window of raw samples
    #[must_use]
    pub const fn window(&self) -> &RingBuffer<f64> {
        &self.window
    }

    #[must_use]
    pub const fn estimation(&self) -> &Estimation {
        &self.estimation
    }

    /// Raw window as `(times, smoothed values)`, newest sample at `t = 0`
    #[must_use]
    pub fn get_timeseries(&self) -> (Vec<f64>, Vec<f64>) {
        let values = self.smoothing.apply(&self.window.get_continuous());
        let last = usize_to_f64(values.len().saturating_sub(1));
        let times = (0..values.len()).map(|i| usize_to_f64(i) - last).collect();
        (times, values)
    }

    fn estimate_from_series(&self) -> Option<f64> {
        let (times, values) = self.get_timeseries();
        match &self.estimation {
            Estimation::Polynomial { degree } => polyfit(&times, &values, *degree)
                .map(|coefficients| polyval(&coefficients, 0.0))
                .map_err(|e| log::debug!("Polynomial estimate unavailable: {e}"))
                .ok(),
            Estimation::Kernel { weights } => {
                Some(weights.iter().zip(&values).map(|(w, v)| w * v).sum())
            }
            Estimation::RansacLinear(params) => ransac_line(&times, &values, params)
                .map(|line| line.evaluate(0.0))
                .map_err(|e| log::debug!("RANSAC estimate unavailable: {e}"))
                .ok(),
            Estimation::Raw | Estimation::Mean | Estimation::Median => None,
        }
    }
}

impl SignalEstimator for SlidingWindowEstimator {
    fn append(&mut self, sample: f64) {
        self.window.append(sample);
    }

    fn estimate_current(&self) -> Option<f64> {
        match self.estimation {
            Estimation::Raw => self.window.get_head(),
            Estimation::Mean => self.window.mean(),
            Estimation::Median => self.window.median(),
            _ if !self.window.is_full() => None,
            _ => self.estimate_from_series(),
        }
    }

    fn reset(&mut self) {
        self.window.reset();
    }

    fn name(&self) -> &str {
        "SlidingWindowEstimator"
    }
}
