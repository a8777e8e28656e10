//! Population statistics over sample slices.
//!
//! Every analysis reduces a pixel map or a list of angles to a mean and a
//! spread. Empty inputs reduce to `0.0` so degenerate panels take the
//! documented fallback branch instead of propagating `NaN`.

/// Mean and population variance (divisor `n`) of `values`.
///
/// Uses a two-pass computation so that inputs with a large common offset
/// keep full precision. Returns `(0.0, 0.0)` for an empty slice.
#[must_use]
pub fn mean_variance(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values
        .iter()
        .map(|v| {
            let d = v - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    (mean, variance)
}

/// Mean and population standard deviation of `values`.
#[must_use]
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    let (mean, variance) = mean_variance(values);
    (mean, variance.sqrt())
}

/// Smallest and largest value, or `(0.0, 0.0)` for an empty slice.
#[must_use]
pub fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .copied()
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
        .unwrap_or((0.0, 0.0))
}
