use crate::aggregate;
use crate::comm::Communicator;
use crate::convergence::{ConvergenceController, FitStatus};
use crate::distances::DistanceFunction;
use crate::error::{Error, Result};
use crate::helpers;
use crate::memory::{Centroids, DistanceTable, LocalStatistics};
use crate::partition::PartitionTable;
use crate::{FitReport, KMeansConfig};
use rayon::prelude::*;

/// What only the root brings into a fit: the full element array and the seeding method.
pub(crate) struct RootInput<'e, F> {
    pub elements: &'e [u8],
    pub n: usize,
    pub init: F,
}

pub(crate) struct Outcome {
    pub report: FitReport,
    pub centroids: Centroids,
    /// Cluster index of every global element, root only.
    pub assignments: Option<Vec<usize>>,
}

/// Per-worker state of one fit. Every worker (the root included) runs the same
/// sequence of collectives, only the root additionally owns the full dataset and
/// the partition layout.
pub(crate) struct Worker<'w, C: Communicator, D: DistanceFunction> {
    comm: &'w C,
    distance: &'w D,
    root: usize,
    k: usize,
    dims: usize,
    n: usize,
    /// Partition layout in elements, root only. Kept until the membership gather.
    layout: Option<PartitionTable>,
    partition: Vec<u8>,
    table: DistanceTable,
    stats: LocalStatistics,
    centroids: Centroids,
}

impl<'w, C: Communicator, D: DistanceFunction> Worker<'w, C, D> {
    pub(crate) fn new(comm: &'w C, distance: &'w D, k: usize, dims: usize, root: usize) -> Self {
        Self {
            comm,
            distance,
            root,
            k,
            dims,
            n: 0,
            layout: None,
            partition: Vec::new(),
            table: DistanceTable::default(),
            stats: LocalStatistics::new(k, dims),
            centroids: Centroids::new(k, dims),
        }
    }

    fn is_root(&self) -> bool { self.comm.rank() == self.root }

    /// Run a complete fit on this worker: distribute the elements, iterate until the
    /// centroids are stable (or the generation limit is hit), then gather the final
    /// membership on the root.
    pub(crate) fn run<'e, F>(mut self, input: Option<RootInput<'e, F>>, config: &KMeansConfig<'_>) -> Result<Outcome>
    where
        F: FnOnce(&[u8], &mut Centroids, &KMeansConfig<'_>) -> Result<()>,
    {
        let mut controller = ConvergenceController::new(config.max_iter);

        // Seed before the first collective, so a failing seeding aborts the run
        // while nobody is inside an exchange yet.
        let elements = match input {
            Some(RootInput { elements, n, init }) => {
                self.n = n;
                init(elements, &mut self.centroids, config)?;
                Some(elements)
            }
            None => None,
        };

        self.scatter_elements(elements, config.max_iter)?;
        self.table = DistanceTable::new(self.partition.len() / self.dims, self.k);

        self.bcast_centroids()?;
        (config.init_done)(&self.centroids);
        controller.seeded();

        while controller.next(&self.centroids) {
            let generation = controller.generations();
            tracing::debug!(rank = self.comm.rank(), generation, "working on generation");
            self.update_distances();
            self.update_clusters();
            self.merge_clusters(config)?;
            self.bcast_centroids()?;
            (config.iteration_done)(&self.centroids, generation);
        }

        let assignments = self.build_membership()?;
        let report = FitReport {
            status: controller.status(),
            generations: controller.generations(),
            n: self.n,
            k: self.k,
        };
        if self.is_root() {
            match report.status {
                FitStatus::Converged => tracing::info!(generations = report.generations, "k-means converged"),
                _ => tracing::info!(generations = report.generations, "k-means stopped at generation limit"),
            }
        }
        Ok(Outcome { report, centroids: self.centroids, assignments })
    }

    /// Announce the problem shape and generation limit from the root and scatter
    /// each worker its contiguous slice of the element array.
    /// All workers must run the same amount of generations to stay in lockstep.
    fn scatter_elements(&mut self, elements: Option<&[u8]>, max_iter: usize) -> Result<()> {
        let rank = self.comm.rank();
        let mut header = vec![self.n as u64, self.k as u64, self.dims as u64, max_iter as u64];
        self.comm.broadcast(self.root, &mut header)?;
        if let [n, k, dims, root_max_iter] = header[..] {
            self.check_header("k", k as usize, self.k)?;
            self.check_header("dims", dims as usize, self.dims)?;
            self.check_header("max_iter", root_max_iter as usize, max_iter)?;
            self.n = n as usize;
        } else {
            return Err(Error::Protocol(format!("malformed fit header of length {}", header.len())));
        }

        let partition = if self.is_root() {
            let elements = elements.ok_or_else(|| Error::Protocol("root has no elements to scatter".into()))?;
            let layout = PartitionTable::even(self.n, self.comm.world_size());
            tracing::debug!(
                n = self.n, p = self.comm.world_size(),
                counts = ?layout.counts(), offsets = ?layout.offsets(),
                "scatter layout"
            );
            tracing::trace!(checksum = helpers::checksum(elements), "root checksum");
            let bytes = layout.scaled(self.dims);
            let partition = self.comm.scatterv(self.root, Some((elements, &bytes)))?;
            self.layout = Some(layout);
            partition
        } else {
            self.comm.scatterv::<u8>(self.root, None)?
        };

        if partition.len() % self.dims != 0 {
            return Err(Error::DimensionMismatch { expected: partition.len() / self.dims * self.dims, found: partition.len() });
        }
        tracing::debug!(rank, m = partition.len() / self.dims, "received partition");
        tracing::trace!(rank, checksum = helpers::checksum(&partition), "partition checksum");
        self.partition = partition;
        Ok(())
    }

    fn check_header(&self, what: &'static str, root_value: usize, local_value: usize) -> Result<()> {
        if root_value != local_value {
            return Err(Error::ConfigMismatch { rank: self.comm.rank(), what, root_value, local_value });
        }
        Ok(())
    }

    /// Recompute the distance from every local element to every centroid.
    fn update_distances(&mut self) {
        let (centroids, distance, k) = (&self.centroids, self.distance, self.k);

        // manually calculate work-packet size, because rayon does not do static scheduling
        let work_packet_size = (self.partition.len() / self.dims / rayon::current_num_threads()).max(1);
        self.partition.par_chunks_exact(self.dims)
            .zip(self.table.as_mut_slice().par_chunks_exact_mut(k))
            .with_min_len(work_packet_size)
            .for_each(|(element, row)| {
                row.iter_mut().zip(centroids.iter())
                    .for_each(|(dist, centroid)| *dist = distance.distance(centroid, element));
            });
    }

    /// Assign every local element to its nearest centroid and rebuild the local
    /// per-cluster counts and coordinate sums. Runs sequentially in element order.
    fn update_clusters(&mut self) {
        self.stats.clear();
        for (idx, element) in self.partition.chunks_exact(self.dims).enumerate() {
            self.stats.accumulate(self.table.nearest(idx), element);
        }
    }

    /// Sum all workers' statistics into the root and recompute the centroids there.
    fn merge_clusters(&mut self, config: &KMeansConfig<'_>) -> Result<()> {
        let counts = self.comm.reduce_sum(self.root, &self.stats.counts)?;
        let sums = self.comm.reduce_sum(self.root, &self.stats.sums)?;
        if let (Some(counts), Some(sums)) = (counts, sums) {
            let global = LocalStatistics::from_parts(counts, sums, self.dims)?;
            let empty = aggregate::update_centroids(&mut self.centroids, &global, config.rounding);
            if empty > 0 {
                tracing::debug!(empty, "clusters without members keep their centroid");
            }
        }
        Ok(())
    }

    fn bcast_centroids(&mut self) -> Result<()> {
        tracing::trace!(rank = self.comm.rank(), "broadcasting centroids");
        self.comm.broadcast(self.root, self.centroids.as_mut_vec())?;
        if self.centroids.as_slice().len() != self.k * self.dims {
            return Err(Error::DimensionMismatch { expected: self.k * self.dims, found: self.centroids.as_slice().len() });
        }
        Ok(())
    }

    /// Assign every local element against the final centroids and gather the flat
    /// per-element cluster indices on the root, in original element order.
    fn build_membership(&mut self) -> Result<Option<Vec<usize>>> {
        // the table may still hold distances to the previous generation's centroids
        self.update_distances();
        let local: Vec<usize> = (0..self.table.rows()).map(|idx| self.table.nearest(idx)).collect();

        let gathered = self.comm.gatherv(self.root, &local, self.layout.as_ref())?;
        if let Some(assignments) = &gathered {
            if assignments.len() != self.n {
                return Err(Error::DimensionMismatch { expected: self.n, found: assignments.len() });
            }
            if let Some(bad) = assignments.iter().find(|&&c| c >= self.k) {
                return Err(Error::Protocol(format!("gathered cluster index {} out of range", bad)));
            }
        }
        self.layout = None;
        Ok(gathered)
    }
}
