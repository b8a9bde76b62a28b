mod euclideandistance;
mod histogramdistance;

pub use euclideandistance::{EuclideanDistance, SquaredEuclideanDistance};
pub use histogramdistance::HistogramDistance;

/// Distance between two elements of equal dimensionality.
///
/// This is the only behaviour that differs between clustering applications. It is called
/// `m * k` times per generation on every worker, so implementations should be pure and
/// must not allocate. Results have to be `>= 0`; symmetry is expected but not enforced.
pub trait DistanceFunction: Sync {
    fn distance(&self, a: &[u8], b: &[u8]) -> f64;
}

impl<F> DistanceFunction for F
where
    F: Fn(&[u8], &[u8]) -> f64 + Sync,
{
    #[inline(always)]
    fn distance(&self, a: &[u8], b: &[u8]) -> f64 {
        self(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn manhattan(a: &[u8], b: &[u8]) -> f64 {
        a.iter().zip(b).map(|(&x, &y)| (f64::from(x) - f64::from(y)).abs()).sum()
    }

    #[test]
    fn closures_are_distance_functions() {
        assert_eq!(manhattan.distance(&[0, 10], &[5, 0]), 15.0);
        let constant = |_: &[u8], _: &[u8]| 1.5;
        assert_eq!(constant.distance(&[], &[]), 1.5);
    }

    proptest! {
        #[test]
        fn distances_are_non_negative(pair in (1usize..64).prop_flat_map(|d| (
            proptest::collection::vec(any::<u8>(), d),
            proptest::collection::vec(any::<u8>(), d),
        ))) {
            let (a, b) = pair;
            prop_assert!(EuclideanDistance.distance(&a, &b) >= 0.0);
            prop_assert!(SquaredEuclideanDistance.distance(&a, &b) >= 0.0);
            prop_assert!(HistogramDistance.distance(&a, &b) >= 0.0);
            prop_assert_eq!(EuclideanDistance.distance(&a, &a), 0.0);
        }
    }
}
