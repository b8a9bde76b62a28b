use super::DistanceFunction;

/// Euclidean (L2) distance over byte coordinates, e.g. pixel intensities.
pub struct EuclideanDistance;

impl DistanceFunction for EuclideanDistance {
    #[inline(always)]
    fn distance(&self, a: &[u8], b: &[u8]) -> f64 {
        SquaredEuclideanDistance.distance(a, b).sqrt()
    }
}

/// Squared euclidean distance. Orders elements like [`EuclideanDistance`] without the `sqrt`.
pub struct SquaredEuclideanDistance;

impl DistanceFunction for SquaredEuclideanDistance {
    #[inline(always)]
    fn distance(&self, a: &[u8], b: &[u8]) -> f64 {
        a.iter().zip(b.iter())
            .map(|(&x, &y)| {
                let diff = i32::from(x) - i32::from(y);
                (diff * diff) as u32
            })
            .map(f64::from)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn euclidean() {
        assert_eq!(EuclideanDistance.distance(&[0, 0], &[3, 4]), 5.0);
        assert_eq!(EuclideanDistance.distance(&[255], &[0]), 255.0);
        assert_eq!(SquaredEuclideanDistance.distance(&[0, 0], &[3, 4]), 25.0);
    }

    #[test]
    fn symmetric() {
        let (a, b) = ([1u8, 200, 37, 0], [90u8, 3, 37, 255]);
        assert_eq!(EuclideanDistance.distance(&a, &b), EuclideanDistance.distance(&b, &a));
    }
}
