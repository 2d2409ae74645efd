use crate::{ClusterError, Result};

/// Position of the smallest value, first on ties.
///
/// NaN values are never selected unless every value is NaN.
pub fn min_index(values: &[f64]) -> Result<usize> {
    extreme_index(values, |candidate, best| candidate < best)
}

/// Position of the largest value, first on ties.
///
/// NaN values are never selected unless every value is NaN.
pub fn max_index(values: &[f64]) -> Result<usize> {
    extreme_index(values, |candidate, best| candidate > best)
}

fn extreme_index(values: &[f64], beats: impl Fn(f64, f64) -> bool) -> Result<usize> {
    let mut best: Option<usize> = None;
    for (i, &value) in values.iter().enumerate() {
        match best {
            None => best = Some(i),
            Some(b) if values[b].is_nan() && !value.is_nan() => best = Some(i),
            Some(b) if beats(value, values[b]) => best = Some(i),
            Some(_) => {}
        }
    }
    best.ok_or(ClusterError::NoMatchingElement)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_max_first_on_ties() {
        let values = [3.0, 1.0, 4.0, 1.0, 5.0, 5.0];
        assert_eq!(min_index(&values), Ok(1));
        assert_eq!(max_index(&values), Ok(4));
    }

    #[test]
    fn test_empty_has_no_match() {
        assert_eq!(min_index(&[]), Err(ClusterError::NoMatchingElement));
        assert_eq!(max_index(&[]), Err(ClusterError::NoMatchingElement));
    }

    #[test]
    fn test_nan_skipped() {
        assert_eq!(min_index(&[f64::NAN, 2.0, 1.0]), Ok(2));
        assert_eq!(max_index(&[f64::NAN, 2.0, f64::NAN]), Ok(1));
        assert_eq!(max_index(&[f64::NAN]), Ok(0));
    }
}
