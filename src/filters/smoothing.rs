//! Smoothing steps applied to a full window before estimation, and the
//! Gaussian kernels used to build them.

use crate::{ring_buffer::median_of, utils::safe_cast::usize_to_f64, Error, Result};

/// Scale a kernel so its weights sum to one
///
/// # Errors
///
/// Returns an error if the weights sum to (nearly) zero
pub fn normalize_window(window: &[f64]) -> Result<Vec<f64>> {
    let sum: f64 = window.iter().sum();
    if sum.abs() < f64::EPSILON {
        return Err(Error::ConfigError("Kernel weights must not sum to zero".to_string()));
    }
    Ok(window.iter().map(|w| w / sum).collect())
}

/// Unnormalized symmetric Gaussian of `length` points centred on the middle sample
fn gaussian(length: usize, standard_deviation: f64) -> Vec<f64> {
    let center = (usize_to_f64(length) - 1.0) / 2.0;
    let denom = 2.0 * standard_deviation * standard_deviation;
    (0..length)
        .map(|i| {
            let n = usize_to_f64(i) - center;
            (-n * n / denom).exp()
        })
        .collect()
}

/// Symmetric Gaussian kernel normalized to sum to one
///
/// # Errors
///
/// Returns an error if `length` is zero or the deviation is not positive
pub fn gaussian_window(length: usize, standard_deviation: f64) -> Result<Vec<f64>> {
    validate_kernel_shape(length, standard_deviation)?;
    normalize_window(&gaussian(length, standard_deviation))
}

/// Causal half of a Gaussian, rising towards the last (most recent) sample
///
/// Taken as the first `length` points of a `2 * length` Gaussian and normalized,
/// so a dot product with an oldest-to-newest window weights the newest samples most.
///
/// # Errors
///
/// Returns an error if `length` is zero or the deviation is not positive
pub fn half_gaussian_window(length: usize, standard_deviation: f64) -> Result<Vec<f64>> {
    validate_kernel_shape(length, standard_deviation)?;
    let full = gaussian(2 * length, standard_deviation);
    normalize_window(&full[..length])
}

fn validate_kernel_shape(length: usize, standard_deviation: f64) -> Result<()> {
    if length == 0 {
        return Err(Error::ConfigError("Kernel length must be greater than 0".to_string()));
    }
    if !(standard_deviation.is_finite() && standard_deviation > 0.0) {
        return Err(Error::ConfigError(format!(
            "Kernel standard deviation must be positive, got {standard_deviation}"
        )));
    }
    Ok(())
}

/// Mirror `length - 1` samples onto each end, excluding the edge samples themselves
///
/// `[a b c d e]` with `length = 3` becomes `[c b a b c d e d c]`.
#[must_use]
pub fn reflect_signal(values: &[f64], length: usize) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let pad = length.saturating_sub(1).min(values.len().saturating_sub(1));
    let mut out = Vec::with_capacity(values.len() + 2 * pad);
    out.extend(values[1..=pad].iter().rev());
    out.extend_from_slice(values);
    out.extend(values[values.len() - 1 - pad..values.len() - 1].iter().rev());
    out
}

/// Reflection length needed so that a `kernel_size` kernel in valid mode keeps the input length
#[must_use]
pub const fn reflection_length(kernel_size: usize) -> usize {
    kernel_size - kernel_size / 2
}

/// Smoothing step applied to the window before estimation
#[derive(Debug, Clone, PartialEq)]
pub enum Smoothing {
    /// Pass values through unchanged
    None,
    /// Running median over an odd kernel
    Median { kernel_size: usize },
    /// Convolution with a fixed odd-length kernel
    Convolve { kernel: Vec<f64> },
}

impl Smoothing {
    /// Check the kernel against the window it will run over
    ///
    /// # Errors
    ///
    /// Returns an error for even or empty kernels, or kernels too long to reflect
    /// within `window_size` samples
    pub fn validate(&self, window_size: usize) -> Result<()> {
        let kernel_size = match self {
            Self::None => return Ok(()),
            Self::Median { kernel_size } => *kernel_size,
            Self::Convolve { kernel } => kernel.len(),
        };
        if kernel_size == 0 || kernel_size % 2 == 0 {
            return Err(Error::ConfigError(format!(
                "Smoothing kernel size must be odd and greater than 0, got {kernel_size}"
            )));
        }
        if reflection_length(kernel_size) > window_size {
            return Err(Error::ConfigError(format!(
                "Smoothing kernel of size {kernel_size} is too long for a window of {window_size} samples"
            )));
        }
        Ok(())
    }

    /// Run the smoothing step, returning a series of the same length
    #[must_use]
    pub fn apply(&self, values: &[f64]) -> Vec<f64> {
        match self {
            Self::None => values.to_vec(),
            Self::Median { kernel_size } => median_filter(values, *kernel_size),
            Self::Convolve { kernel } => convolve_reflected(values, kernel),
        }
    }
}

fn median_filter(values: &[f64], kernel_size: usize) -> Vec<f64> {
    let reflected = reflect_signal(values, reflection_length(kernel_size));
    reflected
        .windows(kernel_size)
        .filter_map(median_of)
        .collect()
}

fn convolve_reflected(values: &[f64], kernel: &[f64]) -> Vec<f64> {
    let reflected = reflect_signal(values, reflection_length(kernel.len()));
    reflected
        .windows(kernel.len())
        // Convolution flips the kernel relative to the signal
        .map(|segment| {
            segment
                .iter()
                .zip(kernel.iter().rev())
                .map(|(v, w)| v * w)
                .sum()
        })
        .collect()
}
