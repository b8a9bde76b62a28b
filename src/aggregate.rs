use crate::memory::{Centroids, LocalStatistics};

/// How a coordinate mean is turned back into a byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CentroidRounding {
    /// Round to the nearest byte value, halves away from zero.
    #[default]
    Nearest,
    /// Drop the fractional part (biased slightly downwards).
    Truncate,
}
impl CentroidRounding {
    #[inline(always)]
    pub fn to_byte(self, mean: f64) -> u8 {
        let v = match self {
            CentroidRounding::Nearest => mean.round(),
            CentroidRounding::Truncate => mean.trunc(),
        };
        num::clamp(v, 0.0, 255.0) as u8
    }
}

/// Recompute every centroid with a nonzero global count as the coordinate-wise mean
/// `sum / count` of its members. Clusters without members keep their previous centroid.
///
/// ## Returns
/// The amount of empty clusters.
pub(crate) fn update_centroids(centroids: &mut Centroids, global: &LocalStatistics, rounding: CentroidRounding) -> usize {
    let dims = centroids.dims();
    let mut empty = 0;
    centroids.as_mut_vec().chunks_exact_mut(dims)
        .zip(global.sums.chunks_exact(dims))
        .zip(global.counts.iter().cloned())
        .for_each(|((c, sums), count)| {
            if count == 0 {
                empty += 1;
                return;
            }
            let count = count as f64;
            c.iter_mut().zip(sums.iter().cloned())
                .for_each(|(cv, sv)| *cv = rounding.to_byte(sv / count));
        });
    empty
}


#[cfg(test)]
mod tests {
    use super::*;

    fn stats(counts: Vec<u64>, sums: Vec<f64>, dims: usize) -> LocalStatistics {
        LocalStatistics::from_parts(counts, sums, dims).unwrap()
    }

    #[test]
    fn rounding_conventions() {
        assert_eq!(CentroidRounding::Nearest.to_byte(2.5), 3);
        assert_eq!(CentroidRounding::Nearest.to_byte(2.49), 2);
        assert_eq!(CentroidRounding::Truncate.to_byte(2.99), 2);
        assert_eq!(CentroidRounding::Nearest.to_byte(255.4), 255);
        assert_eq!(CentroidRounding::Nearest.to_byte(300.0), 255);
        assert_eq!(CentroidRounding::Truncate.to_byte(-1.0), 0);
    }

    #[test]
    fn mean_per_coordinate() {
        let mut centroids = Centroids::from_vec(vec![0, 0, 0, 0], 2, 2).unwrap();
        let global = stats(vec![2, 3], vec![3.0, 10.0, 3.0, 766.0], 2);
        let empty = update_centroids(&mut centroids, &global, CentroidRounding::Nearest);
        assert_eq!(empty, 0);
        assert_eq!(centroids.as_slice(), &[2, 5, 1, 255]);

        let mut truncated = Centroids::from_vec(vec![0, 0, 0, 0], 2, 2).unwrap();
        update_centroids(&mut truncated, &global, CentroidRounding::Truncate);
        assert_eq!(truncated.as_slice(), &[1, 5, 1, 255]);
    }

    #[test]
    fn empty_cluster_keeps_centroid() {
        let mut centroids = Centroids::from_vec(vec![7, 8, 42, 43, 9, 9], 3, 2).unwrap();
        let before = centroids.get(1).to_vec();
        let global = stats(vec![1, 0, 1], vec![1.0, 1.0, 0.0, 0.0, 3.0, 3.0], 2);
        let empty = update_centroids(&mut centroids, &global, CentroidRounding::Nearest);
        assert_eq!(empty, 1);
        assert_eq!(centroids.get(1), &before[..]);
        assert_eq!(centroids.as_slice(), &[1, 1, 42, 43, 3, 3]);
    }
}
