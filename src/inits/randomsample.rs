use crate::error::{Error, Result};
use crate::memory::Centroids;
use crate::KMeansConfig;
use std::ops::DerefMut;

/// Pick `k` distinct element indices uniformly at random (without replacement) and copy
/// those elements into the centroids. Runs on the root only.
pub(crate) fn calculate(elements: &[u8], centroids: &mut Centroids, config: &KMeansConfig<'_>) -> Result<()> {
    let (k, dims) = (centroids.k(), centroids.dims());
    let n = elements.len() / dims;
    if n < k {
        return Err(Error::InsufficientElements { n, k });
    }
    let seeds = rand::seq::index::sample(config.rnd.borrow_mut().deref_mut(), n, k).into_vec();
    tracing::debug!(?seeds, "seeding centroids from random sample");
    seeds.iter().cloned().enumerate().for_each(|(ci, idx)| {
        centroids.set_centroid_from_iter(ci, elements[idx * dims..(idx + 1) * dims].iter().cloned());
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn seeds_are_distinct_elements() {
        // every element is unique, so distinct indices give distinct centroids
        let elements: Vec<u8> = (0..50).collect();
        let conf = KMeansConfig::build().random_generator(StdRng::seed_from_u64(7)).build();
        let mut centroids = Centroids::new(10, 1);
        calculate(&elements, &mut centroids, &conf).unwrap();
        let distinct: HashSet<u8> = centroids.as_slice().iter().cloned().collect();
        assert_eq!(distinct.len(), 10);
    }

    #[test]
    fn seeding_is_reproducible() {
        let elements: Vec<u8> = (0..=255).collect();
        let run = || {
            let conf = KMeansConfig::build().random_generator(StdRng::seed_from_u64(1337)).build();
            let mut centroids = Centroids::new(4, 2);
            calculate(&elements, &mut centroids, &conf).unwrap();
            centroids
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn too_few_elements() {
        let conf = KMeansConfig::default();
        let mut centroids = Centroids::new(3, 2);
        assert_eq!(
            calculate(&[1, 2, 3, 4], &mut centroids, &conf),
            Err(Error::InsufficientElements { n: 2, k: 3 })
        );
    }
}
