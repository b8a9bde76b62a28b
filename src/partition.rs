use std::ops::Range;

/// Root-side layout of the global element array over the workers.
///
/// `counts[r]` elements starting at global index `offsets[r]` belong to rank `r`.
/// Every rank gets `n / p` elements, the last rank additionally absorbs the
/// remainder `n % p`. The table is kept until the end of a fit, since the final
/// membership gather reuses it to put the per-element cluster indices back into
/// the original order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionTable {
    counts: Vec<usize>,
    offsets: Vec<usize>,
}
impl PartitionTable {
    /// Split `n` elements over `workers` contiguous partitions.
    pub fn even(n: usize, workers: usize) -> Self {
        assert!(workers > 0, "at least one worker is required");
        let per_worker = n / workers;
        let remainder = n % workers;
        let mut counts = vec![per_worker; workers];
        counts[workers - 1] += remainder;
        let offsets = (0..workers).map(|r| r * per_worker).collect();
        Self { counts, offsets }
    }

    pub fn workers(&self) -> usize { self.counts.len() }
    pub fn counts(&self) -> &[usize] { &self.counts }
    pub fn offsets(&self) -> &[usize] { &self.offsets }

    /// Total amount of elements covered by the table.
    pub fn total(&self) -> usize { self.counts.iter().sum() }

    /// Half-open range of global element indices owned by `rank`.
    pub fn range(&self, rank: usize) -> Range<usize> {
        self.offsets[rank]..self.offsets[rank] + self.counts[rank]
    }

    /// The same layout expressed in bytes, for elements of `dims` bytes each.
    pub fn scaled(&self, dims: usize) -> Self {
        Self {
            counts: self.counts.iter().map(|c| c * dims).collect(),
            offsets: self.offsets.iter().map(|o| o * dims).collect(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn remainder_goes_to_last_worker() {
        let table = PartitionTable::even(10, 3);
        assert_eq!(table.counts(), &[3, 3, 4]);
        assert_eq!(table.offsets(), &[0, 3, 6]);
        assert_eq!(table.range(2), 6..10);
    }

    #[test]
    fn fewer_elements_than_workers() {
        let table = PartitionTable::even(2, 4);
        assert_eq!(table.counts(), &[0, 0, 0, 2]);
        assert_eq!(table.offsets(), &[0, 0, 0, 0]);
        assert!(table.range(0).is_empty());
        assert_eq!(table.total(), 2);
    }

    #[test]
    fn scaled_to_bytes() {
        let table = PartitionTable::even(5, 2).scaled(3);
        assert_eq!(table.counts(), &[6, 9]);
        assert_eq!(table.offsets(), &[0, 6]);
    }

    proptest! {
        #[test]
        fn partitions_cover_all_indices(n in 0usize..5000, p in 1usize..64) {
            let table = PartitionTable::even(n, p);
            prop_assert_eq!(table.workers(), p);
            prop_assert_eq!(table.total(), n);

            let mut next = 0;
            for r in 0..p {
                let range = table.range(r);
                // contiguous and non-overlapping
                prop_assert_eq!(range.start, next);
                next = range.end;
                if r + 1 < p {
                    prop_assert_eq!(range.len(), n / p);
                } else {
                    prop_assert_eq!(range.len(), n / p + n % p);
                }
            }
            prop_assert_eq!(next, n);
        }
    }
}
