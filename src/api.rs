use crate::aggregate::CentroidRounding;
use crate::comm::Communicator;
use crate::convergence::FitStatus;
use crate::distances::DistanceFunction;
use crate::error::{Error, Result};
use crate::memory::Centroids;
use crate::worker::{RootInput, Worker};
use rand::prelude::*;
use std::cell::RefCell;

pub type InitDoneCallbackFn<'a> = &'a dyn Fn(&Centroids);
pub type IterationDoneCallbackFn<'a> = &'a dyn Fn(&Centroids, usize);

type NoInit = for<'a, 'b, 'c, 'd> fn(&'a [u8], &'b mut Centroids, &'c KMeansConfig<'d>) -> Result<()>;

/// This is a structure holding the configuration of a fit, such as the generation limit,
/// the centroid rounding convention, the random number generator used for seeding, and a
/// couple of callbacks, that can be set to get status information from a running fit.
///
/// Every worker builds its own configuration. The random number generator is only ever
/// used on the root.
///
/// For a more detailed information about all possible options, have a look at [`KMeansConfigBuilder`].
pub struct KMeansConfig<'a> {
    /// Callback that is called on every worker, once the initial centroids were received
    /// ## Arguments
    /// - **centroids**: The initial centroids
    pub(crate) init_done: InitDoneCallbackFn<'a>,
    /// Callback that is called on every worker after each generation
    /// ## Arguments
    /// - **centroids**: Centroids after the generation's update
    /// - **generation**: Number of the finished generation (starting at 1)
    pub(crate) iteration_done: IterationDoneCallbackFn<'a>,
    /// Random number generator to use for seeding
    pub(crate) rnd: Box<RefCell<dyn RngCore>>,
    /// Maximum amount of generations
    pub(crate) max_iter: usize,
    pub(crate) rounding: CentroidRounding,
    /// Rank of the coordinating worker
    pub(crate) root: usize,
}
impl<'a> Default for KMeansConfig<'a> {
    fn default() -> Self {
        Self {
            init_done: &|_| {},
            iteration_done: &|_, _| {},
            rnd: Box::new(RefCell::new(rand::thread_rng())),
            max_iter: 300,
            rounding: CentroidRounding::default(),
            root: 0,
        }
    }
}
impl<'a> KMeansConfig<'a> {
    /// Use the [`KMeansConfigBuilder`] to build a [`KMeansConfig`] instance.
    pub fn build() -> KMeansConfigBuilder<'a> {
        KMeansConfigBuilder { config: KMeansConfig::default() }
    }
    pub fn max_iter(&self) -> usize { self.max_iter }
    pub fn rounding(&self) -> CentroidRounding { self.rounding }
    pub fn root(&self) -> usize { self.root }
}
impl<'a> std::fmt::Debug for KMeansConfig<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KMeansConfig")
            .field("max_iter", &self.max_iter)
            .field("rounding", &self.rounding)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

pub struct KMeansConfigBuilder<'a> {
    config: KMeansConfig<'a>,
}
impl<'a> KMeansConfigBuilder<'a> {
    /// Set the callback that should be called after the initial centroids were distributed.
    pub fn init_done(mut self, init_done: InitDoneCallbackFn<'a>) -> Self {
        self.config.init_done = init_done; self
    }
    /// Set the callback that should be called after each generation.
    pub fn iteration_done(mut self, iteration_done: IterationDoneCallbackFn<'a>) -> Self {
        self.config.iteration_done = iteration_done; self
    }
    /// Set the random number generator that is used to pick the initial centroids.
    /// Use a seeded generator for deterministically repeatable results.
    pub fn random_generator<R: RngCore + 'static>(mut self, rnd: R) -> Self {
        self.config.rnd = Box::new(RefCell::new(rnd)); self
    }
    /// Set the maximum amount of generations. Reaching it ends the fit normally
    /// with [`FitStatus::MaxStepsReached`].
    /// ## Default
    /// 300
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.config.max_iter = max_iter; self
    }
    /// Set how coordinate means are converted back to bytes.
    /// ## Default
    /// [`CentroidRounding::Nearest`]
    pub fn rounding(mut self, rounding: CentroidRounding) -> Self {
        self.config.rounding = rounding; self
    }
    /// Set the rank of the coordinating worker. All workers of a fit must agree on it.
    /// ## Default
    /// 0
    pub fn root(mut self, root: usize) -> Self {
        self.config.root = root; self
    }
    /// Return the internally built configuration structure.
    pub fn build(self) -> KMeansConfig<'a> { self.config }
}


/// One of the `k` clusters of a finished fit.
///
/// Two clusters are equal iff their centroids are byte-identical; the member list
/// is ignored.
#[derive(Clone, Debug, Default)]
pub struct Cluster {
    /// The cluster's center (byte-wise mean of its members)
    pub centroid: Vec<u8>,
    /// Global indices of the member elements, ascending. Only populated on the root.
    pub elements: Vec<usize>,
}
impl PartialEq for Cluster {
    fn eq(&self, other: &Self) -> bool {
        self.centroid == other.centroid
    }
}
impl Eq for Cluster {}

/// Summary of a fit, identical on every worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FitReport {
    /// Terminal status, [`FitStatus::Converged`] or [`FitStatus::MaxStepsReached`]
    pub status: FitStatus,
    /// Amount of generations that ran
    pub generations: usize,
    /// Amount of clustered elements
    pub n: usize,
    pub k: usize,
}
impl FitReport {
    pub fn converged(&self) -> bool { self.status == FitStatus::Converged }
}


/// Entrypoint of this crate's API-Surface.
///
/// Every worker of a group creates one instance around its own [`Communicator`] endpoint.
/// The root calls [`KMeans::fit`] with the full element array, all other workers call
/// [`KMeans::fit_work`]. Both run the identical per-generation protocol; afterwards the
/// result is available through [`KMeans::clusters`].
///
/// ## Generics
/// - **C**: Communication endpoint of this worker
/// - **D**: The distance between two elements, see [`DistanceFunction`]
pub struct KMeans<C: Communicator, D: DistanceFunction> {
    comm: C,
    k: usize,
    dims: usize,
    distance: D,
    clusters: Vec<Cluster>,
    assignments: Vec<usize>,
    report: Option<FitReport>,
}
impl<C: Communicator, D: DistanceFunction> KMeans<C, D> {
    /// Create a new instance of the [`KMeans`] structure.
    ///
    /// ## Arguments
    /// - **comm**: This worker's endpoint
    /// - **k**: Amount of clusters to search for
    /// - **dims**: Amount of bytes per element
    /// - **distance**: Distance between two elements
    pub fn new(comm: C, k: usize, dims: usize, distance: D) -> Result<Self> {
        if k == 0 {
            return Err(Error::InvalidClusterCount(k));
        }
        if dims == 0 {
            return Err(Error::InvalidDimensions(dims));
        }
        Ok(Self {
            comm,
            k,
            dims,
            distance,
            clusters: vec![Cluster { centroid: vec![0; dims], elements: Vec::new() }; k],
            assignments: Vec::new(),
            report: None,
        })
    }

    /// Run the fit as root.
    ///
    /// ## Arguments
    /// - **elements**: The `n` elements [row-major] = [<element0>,<element1>,...], `n * dims` bytes
    /// - **n**: Amount of elements
    /// - **init**: Seeding method for the initial centroids (e.g. [`init_random_sample`])
    /// - **config**: [`KMeansConfig`] of this worker
    ///
    /// ## Errors
    /// Shape problems and `n < k` are reported before any communication takes place.
    ///
    /// ## Example
    /// ```rust
    /// use dkmeans::*;
    ///
    /// let elements = vec![0u8, 0, 0, 10, 10, 10];
    /// let reports = spawn_group(2, |comm| {
    ///     let root = comm.rank() == 0;
    ///     let mut kmean = KMeans::new(comm, 2, 1, EuclideanDistance).unwrap();
    ///     let conf = KMeansConfig::default();
    ///     let report = if root {
    ///         kmean.fit(&elements, 6, init_precomputed(vec![0, 10]), &conf)
    ///     } else {
    ///         kmean.fit_work(&conf)
    ///     }.unwrap();
    ///     (report, kmean.clusters().to_vec())
    /// });
    /// let (report, clusters) = &reports[0];
    /// assert!(report.converged());
    /// assert_eq!(clusters[0].elements, vec![0, 1, 2]);
    /// assert_eq!(clusters[1].elements, vec![3, 4, 5]);
    /// ```
    pub fn fit<F>(&mut self, elements: &[u8], n: usize, init: F, config: &KMeansConfig<'_>) -> Result<FitReport>
    where
        F: FnOnce(&[u8], &mut Centroids, &KMeansConfig<'_>) -> Result<()>,
    {
        let rank = self.comm.rank();
        if rank != config.root {
            return Err(Error::NotRoot { rank, root: config.root });
        }
        let expected = n.checked_mul(self.dims)
            .ok_or(Error::DimensionMismatch { expected: usize::MAX, found: elements.len() })?;
        if elements.len() != expected {
            return Err(Error::DimensionMismatch { expected, found: elements.len() });
        }
        if n < self.k {
            return Err(Error::InsufficientElements { n, k: self.k });
        }
        self.run(Some(RootInput { elements, n, init }), config)
    }

    /// Take part in a fit started by the root. Must be called by every non-root worker.
    pub fn fit_work(&mut self, config: &KMeansConfig<'_>) -> Result<FitReport> {
        let rank = self.comm.rank();
        if rank == config.root {
            return Err(Error::IsRoot(rank));
        }
        self.run(None::<RootInput<'_, NoInit>>, config)
    }

    fn run<F>(&mut self, input: Option<RootInput<'_, F>>, config: &KMeansConfig<'_>) -> Result<FitReport>
    where
        F: FnOnce(&[u8], &mut Centroids, &KMeansConfig<'_>) -> Result<()>,
    {
        if config.root >= self.comm.world_size() {
            return Err(Error::Protocol(format!("root rank {} outside of group of {}", config.root, self.comm.world_size())));
        }
        let outcome = Worker::new(&self.comm, &self.distance, self.k, self.dims, config.root).run(input, config)?;

        let mut clusters: Vec<Cluster> = outcome.centroids.iter()
            .map(|c| Cluster { centroid: c.to_vec(), elements: Vec::new() })
            .collect();
        if let Some(assignments) = &outcome.assignments {
            assignments.iter().cloned().enumerate()
                .for_each(|(idx, c)| clusters[c].elements.push(idx));
        }
        self.clusters = clusters;
        self.assignments = outcome.assignments.unwrap_or_default();
        self.report = Some(outcome.report);
        Ok(outcome.report)
    }

    /// The `k` clusters of the latest fit. Member lists are only populated on the root.
    pub fn clusters(&self) -> &[Cluster] { &self.clusters }

    /// Cluster index of every element of the latest fit, in element order. Root only,
    /// empty on all other workers.
    pub fn assignments(&self) -> &[usize] { &self.assignments }

    /// Report of the latest fit, if any.
    pub fn report(&self) -> Option<&FitReport> { self.report.as_ref() }

    pub fn communicator(&self) -> &C { &self.comm }
    pub fn k(&self) -> usize { self.k }
    pub fn dims(&self) -> usize { self.dims }
}


/// Random sample initialization method (a.k.a. Forgy)
///
/// ## Description
/// This initialization method randomly selects k distinct elements as initial centroids,
/// using the configured random number generator. Runs on the root only.
///
/// ## Note
/// This method is not meant for direct invocation. Pass it to [`KMeans::fit`].
pub fn init_random_sample(elements: &[u8], centroids: &mut Centroids, config: &KMeansConfig<'_>) -> Result<()> {
    crate::inits::randomsample::calculate(elements, centroids, config)
}

/// Precomputed initialization method
///
/// ## Description
/// Use the given flat `k * dims` byte buffer as initial centroids.
pub fn init_precomputed(centroids: Vec<u8>) -> impl FnOnce(&[u8], &mut Centroids, &KMeansConfig<'_>) -> Result<()> {
    move |_, state, config| crate::inits::precomputed::calculate(state, config, centroids)
}


/// Most frequent ground-truth label among a cluster's members together with its
/// frequency. Ties go to the smaller label. Members without a label are skipped.
pub fn majority_label(cluster: &Cluster, labels: &[u8]) -> Option<(u8, usize)> {
    let mut freq = [0usize; 256];
    cluster.elements.iter()
        .filter_map(|&idx| labels.get(idx))
        .for_each(|&l| freq[l as usize] += 1);
    freq.iter().cloned().enumerate()
        .filter(|&(_, f)| f > 0)
        .fold(None, |best: Option<(u8, usize)>, (l, f)| match best {
            Some((_, bf)) if bf >= f => best,
            _ => Some((l as u8, f)),
        })
}

/// Fraction of labelled elements whose label equals the majority label of their cluster.
/// Labels only serve reporting; the clustering never looks at them.
pub fn cluster_purity(clusters: &[Cluster], labels: &[u8]) -> Option<f64> {
    let (correct, total) = clusters.iter().fold((0usize, 0usize), |(correct, total), cluster| {
        let labelled = cluster.elements.iter().filter(|&&idx| idx < labels.len()).count();
        let majority = majority_label(cluster, labels).map(|(_, f)| f).unwrap_or(0);
        (correct + majority, total + labelled)
    });
    if total == 0 { None } else { Some(correct as f64 / total as f64) }
}
