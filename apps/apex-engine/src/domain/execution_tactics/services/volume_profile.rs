//! Intraday volume curves.

use rust_decimal::Decimal;

/// Symmetric U-shaped volume curve over `buckets`, normalized to sum to 1.
///
/// Weight of bucket `i` is `0.5 + 2 (x - 0.5)^2` with `x = i / (buckets - 1)`,
/// so the open and close carry three times the midday weight.
#[must_use]
pub fn u_shaped_profile(buckets: usize) -> Vec<Decimal> {
    if buckets <= 1 {
        return vec![Decimal::ONE];
    }

    let half = Decimal::new(5, 1);
    let denominator = Decimal::from(buckets - 1);
    let weights: Vec<Decimal> = (0..buckets)
        .map(|i| {
            let x = Decimal::from(i) / denominator;
            let d = x - half;
            half + Decimal::TWO * d * d
        })
        .collect();

    normalize(&weights)
}

/// Scale non-negative weights so they sum to 1.
#[must_use]
pub fn normalize(weights: &[Decimal]) -> Vec<Decimal> {
    let total: Decimal = weights.iter().copied().sum();
    if total <= Decimal::ZERO {
        return weights.iter().map(|_| Decimal::ZERO).collect();
    }
    weights.iter().map(|w| *w / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn assert_sums_to_one(profile: &[Decimal]) {
        let sum: Decimal = profile.iter().copied().sum();
        assert!((sum - Decimal::ONE).abs() < dec!(0.000000000001), "sum {sum}");
    }

    #[test]
    fn single_bucket_takes_everything() {
        assert_eq!(u_shaped_profile(1), vec![Decimal::ONE]);
        assert_eq!(u_shaped_profile(0), vec![Decimal::ONE]);
    }

    #[test]
    fn u_shape_is_symmetric_and_heavier_at_edges() {
        let profile = u_shaped_profile(9);
        assert_sums_to_one(&profile);
        assert_eq!(profile[0], profile[8]);
        assert_eq!(profile[1], profile[7]);
        assert!(profile[0] > profile[4]);
        assert!(profile[4] < profile[3]);
    }

    #[test]
    fn two_buckets_split_evenly() {
        let profile = u_shaped_profile(2);
        assert_eq!(profile, vec![dec!(0.5), dec!(0.5)]);
    }

    #[test]
    fn normalize_custom_weights() {
        let profile = normalize(&[dec!(1), dec!(3)]);
        assert_eq!(profile, vec![dec!(0.25), dec!(0.75)]);
    }
}
