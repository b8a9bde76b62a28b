use crate::error::{Error, Result};
use crate::memory::Centroids;
use crate::KMeansConfig;

/// Use caller-provided initial centroids (flat, `k * dims` bytes).
pub(crate) fn calculate(centroids: &mut Centroids, _config: &KMeansConfig<'_>, computed: Vec<u8>) -> Result<()> {
    if computed.len() != centroids.k() * centroids.dims() {
        return Err(Error::DimensionMismatch { expected: centroids.k() * centroids.dims(), found: computed.len() });
    }
    let dims = centroids.dims();
    computed.chunks_exact(dims).enumerate().for_each(|(ci, c)| {
        centroids.set_centroid_from_iter(ci, c.iter().cloned());
    });
    Ok(())
}
