//! Compensated summation and the small set of dispersion statistics used by
//! the averaging and ratio-summary stages.
//!
//! Every routine propagates NaN: a single undefined input yields an undefined
//! statistic rather than being skipped.

fn kahan_add(sum: &mut f64, correction: &mut f64, value: f64) {
    let corrected = value - *correction;
    let next = *sum + corrected;
    *correction = (next - *sum) - corrected;
    *sum = next;
}

pub fn stable_sum(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut correction = 0.0;

    for &value in values {
        kahan_add(&mut sum, &mut correction, value);
    }

    // Kahan compensation turns an infinite running sum into NaN.
    if sum.is_nan() && values.iter().all(|value| !value.is_nan()) {
        return values.iter().sum();
    }

    sum
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    stable_sum(values) / values.len() as f64
}

fn sum_of_squared_deviations(values: &[f64]) -> f64 {
    let centre = mean(values);
    let squared: Vec<f64> = values
        .iter()
        .map(|value| (value - centre) * (value - centre))
        .collect();
    stable_sum(&squared)
}

/// Standard deviation with `n - 1` degrees of freedom. Undefined below two values.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    (sum_of_squared_deviations(values) / (values.len() - 1) as f64).sqrt()
}

/// Standard deviation with `n` degrees of freedom.
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    (sum_of_squared_deviations(values) / values.len() as f64).sqrt()
}

pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let first = *values.first()?;
    let mut bounds = (first, first);
    for &value in values {
        if value.is_nan() {
            return Some((f64::NAN, f64::NAN));
        }
        bounds.0 = bounds.0.min(value);
        bounds.1 = bounds.1.max(value);
    }
    Some(bounds)
}

/// `max - min`, or NaN for an empty or NaN-bearing slice.
pub fn range(values: &[f64]) -> f64 {
    min_max(values)
        .map(|(min, max)| max - min)
        .unwrap_or(f64::NAN)
}

/// Rounds half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10_f64.powi(places);
    (value * scale).round() / scale
}
