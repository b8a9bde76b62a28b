//! # dkmeans - API documentation
//!
//! dkmeans is a small rust library for distributed k-means clustering of fixed-width
//! byte vectors (images, histograms, ...).
//!
//! ## Design target
//! The dataset is split over a fixed group of cooperating workers that share no memory.
//! Each worker owns one contiguous partition of the elements; the workers only interact
//! through four blocking collectives (broadcast, scatter, sum-reduce and gather), in the
//! single-program-multiple-data style known from MPI. One of the workers, the root, owns
//! the full element array, picks the initial centroids and receives the final membership.
//!
//! Elements are given as a raw, row-major byte vector instead of any high-level matrix type.
//!
//! ## The protocol
//! 1. The root announces the problem shape and scatters the partitions.
//! 2. The root picks `k` initial centroids and broadcasts them.
//! 3. Every generation, each worker computes the distances from its elements to all
//!    centroids, assigns each element to its nearest centroid and sums up per-cluster
//!    counts and coordinates. These statistics are sum-reduced into the root, which
//!    recomputes the centroids as coordinate-wise means and broadcasts them again.
//!    Clusters that got no elements keep their previous centroid.
//! 4. The loop ends as soon as a generation reproduces its centroids byte for byte,
//!    or when the generation limit is reached.
//! 5. Every worker assigns its elements to the final centroids and the root gathers
//!    the assignments into `k` member lists.
//!
//! ## Example
//! ```rust
//! use dkmeans::*;
//! use rand::prelude::*;
//!
//! fn main() {
//!     let (element_cnt, element_dims, k, workers) = (2000, 16, 4, 3);
//!
//!     // Generate some random data
//!     let mut rnd = StdRng::seed_from_u64(42);
//!     let mut elements = vec![0u8; element_cnt * element_dims];
//!     elements.iter_mut().for_each(|v| *v = rnd.gen());
//!
//!     let results = spawn_group(workers, |comm| {
//!         let root = comm.rank() == 0;
//!         let mut kmean = KMeans::new(comm, k, element_dims, EuclideanDistance).unwrap();
//!         let conf = KMeansConfig::build()
//!             .random_generator(StdRng::seed_from_u64(1))
//!             .build();
//!         let report = if root {
//!             kmean.fit(&elements, element_cnt, init_random_sample, &conf)
//!         } else {
//!             kmean.fit_work(&conf)
//!         }.unwrap();
//!         (report, kmean.clusters().to_vec())
//!     });
//!
//!     let (report, clusters) = &results[0];
//!     println!("{:?} after {} generations", report.status, report.generations);
//!     for (i, c) in clusters.iter().enumerate() {
//!         println!("Cluster {}: {} elements", i, c.elements.len());
//!     }
//! }
//! ```
//!
//! ## Short API-Overview / Description
//! Entry-point of the library is the [`KMeans`] struct. Each worker creates one instance
//! around its own [`Communicator`] endpoint; [`LocalCommunicator`] connects workers
//! running on threads of one process, [`spawn_group`] starts such a group.
//! The root calls [`KMeans::fit`], all other workers [`KMeans::fit_work`]. The distance
//! between two elements is supplied through the [`DistanceFunction`] trait, which is also
//! implemented for plain functions and closures.

#[macro_use] mod helpers;
mod memory;
mod error;
mod partition;
mod distances;
mod comm;
mod aggregate;
mod convergence;
mod inits;
mod worker;
mod api;

pub use aggregate::CentroidRounding;
pub use api::{
    cluster_purity, init_precomputed, init_random_sample, majority_label, Cluster, FitReport,
    KMeans, KMeansConfig, KMeansConfigBuilder,
};
pub use comm::{spawn_group, spawn_group_with_timeout, Communicator, LocalCommunicator, Tag};
pub use convergence::FitStatus;
pub use distances::{DistanceFunction, EuclideanDistance, HistogramDistance, SquaredEuclideanDistance};
pub use error::{Error, Result};
pub use memory::{Centroids, LocalStatistics};
pub use partition::PartitionTable;
