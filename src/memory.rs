use crate::error::{Error, Result};

/// Flat, row-major set of `k` centroids of `dims` bytes each
/// = [<centroid0>,<centroid1>,<centroid2>,...]
///
/// Equality is byte equality over the whole set, which is exactly the
/// convergence test used by the fit loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Centroids {
    k: usize,
    dims: usize,
    data: Vec<u8>,
}
impl Centroids {
    pub(crate) fn new(k: usize, dims: usize) -> Self {
        Self { k, dims, data: vec![0u8; k * dims] }
    }

    /// Build a centroid set from a flat `k * dims` byte buffer.
    pub fn from_vec(data: Vec<u8>, k: usize, dims: usize) -> Result<Self> {
        if data.len() != k * dims {
            return Err(Error::DimensionMismatch { expected: k * dims, found: data.len() });
        }
        Ok(Self { k, dims, data })
    }

    pub fn k(&self) -> usize { self.k }
    pub fn dims(&self) -> usize { self.dims }
    pub fn as_slice(&self) -> &[u8] { &self.data }

    pub fn get(&self, idx: usize) -> &[u8] {
        &self.data[idx * self.dims..(idx + 1) * self.dims]
    }

    pub fn iter(&self) -> std::slice::ChunksExact<'_, u8> {
        self.data.chunks_exact(self.dims)
    }

    pub(crate) fn set_centroid_from_iter(&mut self, idx: usize, src: impl Iterator<Item = u8>) {
        self.data.iter_mut().skip(self.dims * idx).take(self.dims)
            .zip(src)
            .for_each(|(c, s)| *c = s);
    }

    pub(crate) fn as_mut_vec(&mut self) -> &mut Vec<u8> { &mut self.data }
}


/// Worker-local per-cluster statistics, rebuilt every generation.
///
/// ## Fields
/// - **counts**: Amount of local elements assigned to each cluster (length `k`)
/// - **sums**: Coordinate-wise sums of those elements [row-major] (length `k * dims`)
///
/// Sums are kept as `f64`. Every addend is an integer below 256, so sums stay exact
/// up to 2^53 and the reduction result does not depend on the order of summation.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalStatistics {
    pub counts: Vec<u64>,
    pub sums: Vec<f64>,
    dims: usize,
}
impl LocalStatistics {
    pub(crate) fn new(k: usize, dims: usize) -> Self {
        Self { counts: vec![0; k], sums: vec![0.0; k * dims], dims }
    }

    pub(crate) fn from_parts(counts: Vec<u64>, sums: Vec<f64>, dims: usize) -> Result<Self> {
        if sums.len() != counts.len() * dims {
            return Err(Error::DimensionMismatch { expected: counts.len() * dims, found: sums.len() });
        }
        Ok(Self { counts, sums, dims })
    }

    pub(crate) fn clear(&mut self) {
        self.counts.iter_mut().for_each(|c| *c = 0);
        self.sums.iter_mut().for_each(|s| *s = 0.0);
    }

    /// Add one element to the statistics of `cluster`.
    pub(crate) fn accumulate(&mut self, cluster: usize, element: &[u8]) {
        self.counts[cluster] += 1;
        self.sums.iter_mut().skip(cluster * self.dims).take(self.dims)
            .zip(element.iter().cloned())
            .for_each(|(s, v)| *s += f64::from(v));
    }

    pub fn k(&self) -> usize { self.counts.len() }
    pub fn dims(&self) -> usize { self.dims }
}


/// Worker-local `m x k` matrix of distances from each local element to each centroid.
#[derive(Clone, Debug, Default)]
pub(crate) struct DistanceTable {
    k: usize,
    data: Vec<f64>,
}
impl DistanceTable {
    pub(crate) fn new(rows: usize, k: usize) -> Self {
        Self { k, data: vec![f64::INFINITY; rows * k] }
    }

    pub(crate) fn rows(&self) -> usize {
        if self.k == 0 { 0 } else { self.data.len() / self.k }
    }

    pub(crate) fn row(&self, idx: usize) -> &[f64] {
        &self.data[idx * self.k..(idx + 1) * self.k]
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [f64] { &mut self.data }

    /// Index of the nearest centroid for local element `idx`.
    pub(crate) fn nearest(&self, idx: usize) -> usize {
        crate::helpers::nearest_centroid(self.row(idx))
    }
}
