//! K-means partitioning of feature vectors.
//!
//! Centroids are seeded with k-means++ from a seedable [`StdRng`] and
//! refined with Lloyd iterations. Several seeded restarts are run and the
//! one with the lowest inertia is kept, so a fixed seed always reproduces
//! the same partition.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::ClusteringConfig;
use crate::error::{Result, ThemeError};

/// Parameters for a k-means run.
#[derive(Debug, Clone)]
pub struct KMeansParams {
    /// Number of clusters to produce.
    pub k: usize,
    /// Maximum Lloyd iterations per restart.
    pub max_iterations: usize,
    /// Convergence threshold on the largest centroid movement.
    pub tolerance: f64,
    /// Number of seeded restarts.
    ///
    /// A single k-means++ run often settles in a local minimum on sparse
    /// TF-IDF rows, since orthogonal rows are equidistant from a centroid
    /// and ties go to the lowest index. Keeping the best of many restarts
    /// makes a bad partition rare but not impossible for a given seed.
    pub n_init: usize,
    /// Base seed; restart `r` uses `seed + r`.
    pub seed: Option<u64>,
    /// L2-normalize rows before measuring distances.
    pub normalize: bool,
}

impl KMeansParams {
    /// Defaults for everything except `k`.
    pub fn new(k: usize) -> Self {
        let defaults = ClusteringConfig::default();
        Self {
            k,
            max_iterations: defaults.max_iterations,
            tolerance: defaults.tolerance,
            n_init: defaults.n_init,
            seed: defaults.seed,
            normalize: defaults.normalize,
        }
    }

    /// Build parameters from configuration.
    pub fn from_config(config: &ClusteringConfig) -> Self {
        Self {
            k: config.num_clusters,
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
            n_init: config.n_init,
            seed: config.seed,
            normalize: config.normalize,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }
}

/// Output of the partitioner: cluster index to member document indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    /// One entry per cluster in `0..k`; members are ascending and may be empty.
    pub clusters: BTreeMap<usize, Vec<usize>>,
    /// Sum of squared distances from each point to its centroid.
    pub inertia: f64,
    /// Lloyd iterations used by the winning restart.
    pub iterations: usize,
}

impl Partition {
    /// Number of clusters, including empty ones.
    pub fn num_clusters(&self) -> usize {
        self.clusters.len()
    }

    /// Members of a cluster (empty for unknown indices).
    pub fn members(&self, cluster: usize) -> &[usize] {
        self.clusters.get(&cluster).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The cluster a document was assigned to.
    pub fn cluster_of(&self, document: usize) -> Option<usize> {
        self.clusters
            .iter()
            .find(|(_, members)| members.contains(&document))
            .map(|(&cluster, _)| cluster)
    }

    /// Member index groups in cluster order.
    pub fn groups(&self) -> Vec<Vec<usize>> {
        self.clusters.values().cloned().collect()
    }
}

/// K-means partitioner.
#[derive(Debug, Clone)]
pub struct KMeans {
    params: KMeansParams,
}

struct Run {
    assignments: Vec<usize>,
    inertia: f64,
    iterations: usize,
}

impl KMeans {
    pub fn new(params: KMeansParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &KMeansParams {
        &self.params
    }

    /// Partition `vectors` into `k` clusters.
    ///
    /// Fails with [`ThemeError::InvalidPartitionRequest`] when `k` is zero,
    /// the input is empty, or the vectors disagree on dimension. A `k`
    /// larger than the number of vectors is allowed and yields empty
    /// clusters.
    pub fn partition(&self, vectors: &[Vec<f64>]) -> Result<Partition> {
        let k = self.params.k;
        if k == 0 {
            return Err(ThemeError::InvalidPartitionRequest(
                "number of clusters must be positive".to_string(),
            ));
        }
        if vectors.is_empty() {
            return Err(ThemeError::InvalidPartitionRequest(
                "no feature vectors to partition".to_string(),
            ));
        }
        let dim = vectors[0].len();
        if let Some(bad) = vectors.iter().position(|v| v.len() != dim) {
            return Err(ThemeError::InvalidPartitionRequest(format!(
                "vector {} has dimension {}, expected {}",
                bad,
                vectors[bad].len(),
                dim
            )));
        }

        let data: Vec<Vec<f64>> = if self.params.normalize {
            vectors.iter().map(|v| l2_normalized(v)).collect()
        } else {
            vectors.to_vec()
        };

        let mut best = self.run_once(&data, &mut make_rng(self.params.seed));
        for restart in 1..self.params.n_init {
            let mut rng = make_rng(self.params.seed.map(|s| s.wrapping_add(restart as u64)));
            let run = self.run_once(&data, &mut rng);
            tracing::debug!(
                restart,
                inertia = run.inertia,
                iterations = run.iterations,
                "k-means restart finished"
            );
            if run.inertia < best.inertia {
                best = run;
            }
        }

        let mut clusters: BTreeMap<usize, Vec<usize>> = (0..k).map(|c| (c, Vec::new())).collect();
        for (doc, &cluster) in best.assignments.iter().enumerate() {
            clusters.entry(cluster).or_default().push(doc);
        }

        Ok(Partition {
            clusters,
            inertia: best.inertia,
            iterations: best.iterations,
        })
    }

    fn run_once(&self, data: &[Vec<f64>], rng: &mut StdRng) -> Run {
        let k = self.params.k;
        let dim = data[0].len();
        let mut centroids = kmeans_plus_plus(data, k, rng);
        let mut assignments = vec![0usize; data.len()];
        let mut iterations = 0;

        for _ in 0..self.params.max_iterations.max(1) {
            iterations += 1;

            for (i, point) in data.iter().enumerate() {
                assignments[i] = nearest_centroid(point, &centroids).0;
            }

            let mut sums = vec![vec![0.0; dim]; k];
            let mut counts = vec![0usize; k];
            for (point, &cluster) in data.iter().zip(assignments.iter()) {
                counts[cluster] += 1;
                for (sum, &value) in sums[cluster].iter_mut().zip(point.iter()) {
                    *sum += value;
                }
            }

            let mut max_shift: f64 = 0.0;
            for (cluster, centroid) in centroids.iter_mut().enumerate() {
                // An empty cluster keeps its previous centroid.
                if counts[cluster] == 0 {
                    continue;
                }
                let count = counts[cluster] as f64;
                let updated: Vec<f64> = sums[cluster].iter().map(|s| s / count).collect();
                max_shift = max_shift.max(squared_distance(centroid, &updated).sqrt());
                *centroid = updated;
            }

            if max_shift < self.params.tolerance {
                break;
            }
        }

        let mut inertia = 0.0;
        for (i, point) in data.iter().enumerate() {
            let (cluster, distance) = nearest_centroid(point, &centroids);
            assignments[i] = cluster;
            inertia += distance;
        }

        Run {
            assignments,
            inertia,
            iterations,
        }
    }
}

/// Partition `vectors` into `k` clusters with default parameters and the given seed.
pub fn partition(vectors: &[Vec<f64>], k: usize, seed: u64) -> Result<Partition> {
    KMeans::new(KMeansParams::new(k).with_seed(seed)).partition(vectors)
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// k-means++ seeding: each further centroid is drawn with probability
/// proportional to its squared distance from the nearest chosen one.
fn kmeans_plus_plus(data: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let n = data.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(data[rng.gen_range(0..n)].clone());

    let mut dist_sq: Vec<f64> = data
        .iter()
        .map(|p| squared_distance(p, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = dist_sq.iter().sum();
        let next = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut chosen = dist_sq.iter().rposition(|&d| d > 0.0).unwrap_or(0);
            for (i, &d) in dist_sq.iter().enumerate() {
                if target < d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            chosen
        } else {
            // Every point already coincides with a centroid.
            rng.gen_range(0..n)
        };

        let centroid = data[next].clone();
        for (d, point) in dist_sq.iter_mut().zip(data.iter()) {
            *d = d.min(squared_distance(point, &centroid));
        }
        centroids.push(centroid);
    }

    centroids
}

/// Index and squared distance of the closest centroid; the lowest index wins ties.
fn nearest_centroid(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (index, centroid) in centroids.iter().enumerate() {
        let distance = squared_distance(point, centroid);
        if distance < best.1 {
            best = (index, distance);
        }
    }
    best
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

fn l2_normalized(v: &[f64]) -> Vec<f64> {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm == 0.0 {
        v.to_vec()
    } else {
        v.iter().map(|x| x / norm).collect()
    }
}
