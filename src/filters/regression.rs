//! Curve fits over a window's time series: least-squares polynomials and a
//! RANSAC-robust straight line.

use crate::{
    constants::{DEFAULT_RANSAC_SEED, DEFAULT_RANSAC_TRIALS, SVD_MAX_ITERATIONS},
    ring_buffer::median_of,
    utils::safe_cast::usize_to_f64,
    Error, Result,
};
use nalgebra::{DMatrix, DVector};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Least-squares polynomial fit, coefficients in ascending powers of `t`
///
/// # Errors
///
/// Returns an error if there are fewer samples than coefficients or the
/// system cannot be solved
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)] // Degree is tiny
pub fn polyfit(times: &[f64], values: &[f64], degree: usize) -> Result<DVector<f64>> {
    if times.len() != values.len() {
        return Err(Error::InvalidInput(format!(
            "Time series has {} times but {} values",
            times.len(),
            values.len()
        )));
    }
    if times.len() <= degree {
        return Err(Error::InvalidInput(format!(
            "Polynomial of degree {degree} needs more than {} samples",
            times.len()
        )));
    }

    // Vandermonde matrix, one column per power
    let vandermonde = DMatrix::from_fn(times.len(), degree + 1, |row, col| times[row].powi(col as i32));
    let rhs = DVector::from_column_slice(values);

    vandermonde
        .try_svd(true, true, f64::EPSILON, SVD_MAX_ITERATIONS)
        .ok_or_else(|| Error::DegenerateGeometry("Polynomial fit did not converge".to_string()))?
        .solve(&rhs, f64::EPSILON)
        .map_err(|e| Error::DegenerateGeometry(format!("Polynomial fit failed: {e}")))
}

/// Evaluate ascending-power coefficients at `t`
#[must_use]
pub fn polyval(coefficients: &DVector<f64>, t: f64) -> f64 {
    // Horner's scheme from the highest power down
    coefficients.iter().rev().fold(0.0, |acc, c| acc.mul_add(t, *c))
}

/// A fitted straight line `value = slope * t + intercept`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub slope: f64,
    pub intercept: f64,
}

impl Line {
    #[must_use]
    pub fn evaluate(&self, t: f64) -> f64 {
        self.slope.mul_add(t, self.intercept)
    }
}

/// Ordinary least-squares line through the given points
///
/// # Errors
///
/// Returns an error if fewer than two distinct times are given
pub fn fit_line(times: &[f64], values: &[f64]) -> Result<Line> {
    let n = usize_to_f64(times.len());
    if times.len() < 2 || times.len() != values.len() {
        return Err(Error::InvalidInput(
            "Line fit needs at least two paired samples".to_string(),
        ));
    }
    let mean_t = times.iter().sum::<f64>() / n;
    let mean_v = values.iter().sum::<f64>() / n;

    let mut s_tt = 0.0;
    let mut s_tv = 0.0;
    for (t, v) in times.iter().zip(values) {
        s_tt += (t - mean_t) * (t - mean_t);
        s_tv += (t - mean_t) * (v - mean_v);
    }
    if s_tt.abs() < f64::EPSILON {
        return Err(Error::DegenerateGeometry(
            "Line fit needs at least two distinct times".to_string(),
        ));
    }

    let slope = s_tv / s_tt;
    Ok(Line {
        slope,
        intercept: slope.mul_add(-mean_t, mean_v),
    })
}

/// RANSAC settings for the robust linear estimator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacParams {
    /// Number of random minimal samples to try
    pub trials: usize,
    /// Maximum residual for an inlier; the values' median absolute deviation when unset
    pub residual_threshold: Option<f64>,
    /// Seed for the sample generator, so repeated estimates are reproducible
    pub seed: u64,
}

impl RansacParams {
    pub const DEFAULT: Self = Self {
        trials: DEFAULT_RANSAC_TRIALS,
        residual_threshold: None,
        seed: DEFAULT_RANSAC_SEED,
    };
}

impl Default for RansacParams {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Median absolute deviation of `values` from their median
#[must_use]
pub fn median_absolute_deviation(values: &[f64]) -> Option<f64> {
    let median = median_of(values)?;
    let deviations: Vec<f64> = values.iter().map(|v| (v - median).abs()).collect();
    median_of(&deviations)
}

/// Robust straight-line fit
///
/// Repeatedly fits a line through two random samples, keeps the candidate with
/// the largest consensus set (ties broken by the smaller squared residual sum),
/// then refits by least squares on that consensus set. Falls back to a plain
/// least-squares fit when no candidate gathers two inliers.
///
/// # Errors
///
/// Returns an error if fewer than two distinct times are given
pub fn ransac_line(times: &[f64], values: &[f64], params: &RansacParams) -> Result<Line> {
    if times.len() < 2 || times.len() != values.len() {
        return Err(Error::InvalidInput(
            "RANSAC line fit needs at least two paired samples".to_string(),
        ));
    }
    let threshold = match params.residual_threshold {
        Some(threshold) => threshold,
        None => median_absolute_deviation(values).unwrap_or(0.0),
    };

    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut best: Option<(usize, f64, Vec<usize>)> = None;

    for _ in 0..params.trials {
        let i = rng.gen_range(0..times.len());
        let j = rng.gen_range(0..times.len());
        if i == j || times[i] == times[j] {
            continue;
        }
        let slope = (values[j] - values[i]) / (times[j] - times[i]);
        let candidate = Line {
            slope,
            intercept: slope.mul_add(-times[i], values[i]),
        };

        let mut inliers = Vec::new();
        let mut squared_error = 0.0;
        for (idx, (t, v)) in times.iter().zip(values).enumerate() {
            let residual = (v - candidate.evaluate(*t)).abs();
            if residual <= threshold {
                inliers.push(idx);
                squared_error += residual * residual;
            }
        }

        let better = match &best {
            None => true,
            Some((count, error, _)) => {
                inliers.len() > *count || (inliers.len() == *count && squared_error < *error)
            }
        };
        if better {
            best = Some((inliers.len(), squared_error, inliers));
        }
    }

    match best {
        Some((count, _, inliers)) if count >= 2 => {
            let inlier_times: Vec<f64> = inliers.iter().map(|&i| times[i]).collect();
            let inlier_values: Vec<f64> = inliers.iter().map(|&i| values[i]).collect();
            fit_line(&inlier_times, &inlier_values).or_else(|_| fit_line(times, values))
        }
        _ => {
            log::debug!("RANSAC found no consensus set, falling back to least squares");
            fit_line(times, values)
        }
    }
}
