use super::DistanceFunction;

/// Distance between two histograms with one byte-sized count per bin: the L1 distance
/// of their cumulative distributions (1-D earth mover's distance for equal totals).
pub struct HistogramDistance;

impl DistanceFunction for HistogramDistance {
    #[inline(always)]
    fn distance(&self, a: &[u8], b: &[u8]) -> f64 {
        let mut total = 0u64;
        let mut cdf_a = 0i64;
        let mut cdf_b = 0i64;
        for (&x, &y) in a.iter().zip(b.iter()) {
            cdf_a += i64::from(x);
            cdf_b += i64::from(y);
            total += (cdf_a - cdf_b).unsigned_abs();
        }
        total as f64
    }
}
