//! Descriptive statistics over plain `f64` slices.
//!
//! Empty input yields `None` rather than `NaN`.

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n − 1 denominator); needs two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Population standard deviation (n denominator).
pub fn population_std(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / values.len() as f64).sqrt())
}

pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Quantile with linear interpolation between the two nearest ranks:
/// position `(n - 1) * q` in the sorted values.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let position = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

pub fn min(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

pub fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn quantiles_interpolate_linearly() {
        let v = [7.0, 1.0, 3.0, 5.0];
        assert!(close(quantile(&v, 0.25).unwrap(), 2.5));
        assert!(close(quantile(&v, 0.75).unwrap(), 5.5));
        assert!(close(median(&v).unwrap(), 4.0));
        assert!(close(quantile(&v, 0.0).unwrap(), 1.0));
        assert!(close(quantile(&v, 1.0).unwrap(), 7.0));
    }

    #[test]
    fn std_variants() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!(close(population_std(&v).unwrap(), 2.0));
        assert!(close(sample_std(&v).unwrap(), (32.0f64 / 7.0).sqrt()));
        assert_eq!(sample_std(&[1.0]), None);
    }

    #[test]
    fn empty_input_has_no_statistics() {
        assert_eq!(mean(&[]), None);
        assert_eq!(median(&[]), None);
        assert_eq!(min(&[]), None);
        assert_eq!(max(&[]), None);
    }
}
