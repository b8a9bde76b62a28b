/// Index of the smallest distance in `row`.
/// Only a strictly smaller distance replaces the current best, so ties keep the lowest index.
pub(crate) fn nearest_centroid(row: &[f64]) -> usize {
    let mut best = 0;
    for (idx, dist) in row.iter().enumerate().skip(1) {
        if *dist < row[best] {
            best = idx;
        }
    }
    best
}

/// Sum of all bytes, logged on each rank after the scatter to verify the transfer.
pub(crate) fn checksum(bytes: &[u8]) -> u64 {
    bytes.iter().map(|&b| u64::from(b)).sum()
}

#[cfg(test)]
macro_rules! assert_approx_eq {
	($left: expr, $right: expr, $tol: expr) => ({
		match ($left, $right, $tol) {
			(left_val , right_val, tol_val) => {
				let delta = (left_val - right_val).abs();
				if !(delta < tol_val) {
					panic!(
						"assertion failed: `(left ≈ right)` \
						(left: `{}`, right: `{}`) \
						with ∆={:1.1e} (allowed ∆={:e})",
						left_val , right_val, delta, tol_val
					)
				}
			}
		}
	});
	($left: expr, $right: expr) => (assert_approx_eq!(($left), ($right), 1e-15))
}

#[cfg(test)]
pub(crate) mod testing {
	use crate::Cluster;

	/// Every index in `0..n` must appear in exactly one cluster, each list ascending.
	pub fn assert_membership_complete(clusters: &[Cluster], n: usize) {
		let mut seen = vec![false; n];
		let mut total = 0;
		for (ci, cluster) in clusters.iter().enumerate() {
			assert!(cluster.elements.windows(2).all(|w| w[0] < w[1]),
				"Cluster {} member list is not strictly ascending: {:?}", ci, cluster.elements);
			for &idx in &cluster.elements {
				assert!(idx < n, "Cluster {} contains out-of-range index {}", ci, idx);
				assert!(!seen[idx], "Index {} appears in more than one cluster", idx);
				seen[idx] = true;
				total += 1;
			}
		}
		assert_eq!(total, n);
	}

	/// Deterministic pseudo-random byte data, `n` elements of `dims` bytes.
	pub fn generate_elements(n: usize, dims: usize, seed: u64) -> Vec<u8> {
		use rand::prelude::*;
		let mut rnd = rand::rngs::StdRng::seed_from_u64(seed);
		let mut elements = vec![0u8; n * dims];
		elements.iter_mut().for_each(|v| *v = rnd.gen());
		elements
	}
}
