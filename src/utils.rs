//! Small numeric helpers shared by the filters and the geometry code.

pub mod safe_cast;

/// Sum of squared deviations from the mean divided by the count
///
/// Returns `None` for an empty slice.
#[must_use]
pub fn variance(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let n = safe_cast::usize_to_f64(values.len());
    let mean = values.iter().sum::<f64>() / n;
    Some(values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n)
}
