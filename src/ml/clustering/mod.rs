//! Clustering algorithms
//!
//! K-means with seeded initialisation. Assignment ties go to the lowest
//! cluster index and a cluster that loses all its points is moved to the
//! point farthest from its centroid, so a fixed seed always produces the same
//! partition.

use crate::core::cancel::CancellationToken;
use crate::core::error::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Centroid initialisation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KMeansInit {
    /// D²-weighted sampling (k-means++)
    KMeansPlusPlus,
    /// K distinct rows drawn uniformly
    Random,
}

/// K-means clustering algorithm
#[derive(Debug, Clone)]
pub struct KMeans {
    /// Number of clusters
    pub n_clusters: usize,
    /// Maximum number of iterations
    pub max_iter: usize,
    /// Tolerance for convergence, relative to the mean feature variance
    pub tol: f64,
    /// Random seed for initialization
    pub random_seed: Option<u64>,
    /// Initialization strategy
    pub init: KMeansInit,
    /// Cluster assignments for each sample
    pub labels: Option<Vec<usize>>,
    /// Cluster centers
    pub centroids: Option<Vec<Vec<f64>>>,
    /// Inertia (within-cluster sum of squares)
    pub inertia: Option<f64>,
    /// Iterations run by the last fit
    pub n_iter: usize,
}

impl KMeans {
    /// Create a new K-means instance
    pub fn new(n_clusters: usize) -> Self {
        KMeans {
            n_clusters,
            max_iter: 300,
            tol: 1e-4,
            random_seed: None,
            init: KMeansInit::KMeansPlusPlus,
            labels: None,
            centroids: None,
            inertia: None,
            n_iter: 0,
        }
    }

    /// Set maximum number of iterations
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set tolerance for convergence
    pub fn tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set random seed for initialization
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn init(mut self, init: KMeansInit) -> Self {
        self.init = init;
        self
    }

    /// Number of points per cluster id for the last fit
    pub fn cluster_sizes(&self) -> Option<Vec<usize>> {
        self.labels.as_ref().map(|labels| {
            let mut sizes = vec![0; self.n_clusters];
            for &label in labels {
                sizes[label] += 1;
            }
            sizes
        })
    }

    /// Fit the model to row-major data
    pub fn fit(&mut self, data: &[Vec<f64>], cancel: &CancellationToken) -> Result<()> {
        self.labels = None;
        self.centroids = None;
        self.inertia = None;
        self.n_iter = 0;

        if self.n_clusters == 0 {
            return Err(Error::InvalidInput(
                "Number of clusters must be greater than 0".into(),
            ));
        }
        let Some(first) = data.first() else {
            return Err(Error::EmptyData("Cannot cluster zero rows".into()));
        };
        let width = first.len();
        if let Some(row) = data.iter().find(|r| r.len() != width) {
            return Err(Error::DimensionMismatch(format!(
                "expected {} features per row, found {}",
                width,
                row.len()
            )));
        }
        if data.iter().flatten().any(|v| !v.is_finite()) {
            return Err(Error::InvalidInput("Data contains non-finite values".into()));
        }
        if self.n_clusters > data.len() {
            return Err(Error::InsufficientData(format!(
                "{} clusters requested for {} rows",
                self.n_clusters,
                data.len()
            )));
        }

        let mut rng = match self.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        let mut centroids = match self.init {
            KMeansInit::KMeansPlusPlus => kmeans_plus_plus(data, self.n_clusters, &mut rng),
            KMeansInit::Random => random_init(data, self.n_clusters, &mut rng),
        };

        let tolerance = self.tol * mean_variance(data);
        let mut n_iter = 0;
        for _ in 0..self.max_iter {
            cancel.check()?;
            let labels = assign(data, &centroids);
            let updated = self.update_centroids(data, &labels, &centroids);
            let shift: f64 = centroids
                .iter()
                .zip(&updated)
                .map(|(old, new)| squared_distance(old, new))
                .sum();
            centroids = updated;
            n_iter += 1;
            if shift <= tolerance {
                break;
            }
        }

        let labels = assign(data, &centroids);
        let inertia: f64 = data
            .iter()
            .zip(&labels)
            .map(|(row, &label)| squared_distance(row, &centroids[label]))
            .sum();

        log::debug!(
            clusters = self.n_clusters, iterations = n_iter, inertia = inertia;
            "k-means fitted"
        );
        self.labels = Some(labels);
        self.centroids = Some(centroids);
        self.inertia = Some(inertia);
        self.n_iter = n_iter;
        Ok(())
    }

    /// Assign rows to the nearest fitted centroid
    pub fn predict(&self, data: &[Vec<f64>]) -> Result<Vec<usize>> {
        let centroids = self
            .centroids
            .as_ref()
            .ok_or_else(|| Error::InvalidValue("KMeans not fitted".into()))?;
        let width = centroids[0].len();
        if let Some(row) = data.iter().find(|r| r.len() != width) {
            return Err(Error::DimensionMismatch(format!(
                "expected {} features per row, found {}",
                width,
                row.len()
            )));
        }
        Ok(assign(data, centroids))
    }

    /// Mean of the assigned points; empty clusters take over the worst-fitted point
    fn update_centroids(
        &self,
        data: &[Vec<f64>],
        labels: &[usize],
        previous: &[Vec<f64>],
    ) -> Vec<Vec<f64>> {
        let width = previous[0].len();
        let mut sums = vec![vec![0.0; width]; self.n_clusters];
        let mut counts = vec![0usize; self.n_clusters];
        for (row, &label) in data.iter().zip(labels) {
            counts[label] += 1;
            for (s, v) in sums[label].iter_mut().zip(row) {
                *s += v;
            }
        }

        let mut centroids: Vec<Vec<f64>> = sums
            .into_iter()
            .zip(&counts)
            .zip(previous)
            .map(|((sum, &count), old)| {
                if count == 0 {
                    old.clone()
                } else {
                    sum.iter().map(|s| s / count as f64).collect()
                }
            })
            .collect();

        let empty: Vec<usize> = (0..self.n_clusters).filter(|&c| counts[c] == 0).collect();
        if empty.is_empty() {
            return centroids;
        }

        let mut distances: Vec<(usize, f64)> = data
            .iter()
            .zip(labels)
            .enumerate()
            .map(|(i, (row, &label))| (i, squared_distance(row, &previous[label])))
            .collect();
        // Farthest first, lowest row index on ties
        distances.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        for (cluster, (row, distance)) in empty.iter().zip(distances) {
            if distance > 0.0 {
                centroids[*cluster] = data[row].clone();
            } else {
                log::warn!(
                    cluster = *cluster;
                    "k-means cluster left empty, all points coincide with their centroids"
                );
            }
        }
        centroids
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Nearest centroid per row; ties go to the lowest index
fn assign(data: &[Vec<f64>], centroids: &[Vec<f64>]) -> Vec<usize> {
    data.iter()
        .map(|row| {
            let mut best = 0;
            let mut best_distance = f64::INFINITY;
            for (j, centroid) in centroids.iter().enumerate() {
                let distance = squared_distance(row, centroid);
                if distance < best_distance {
                    best_distance = distance;
                    best = j;
                }
            }
            best
        })
        .collect()
}

fn mean_variance(data: &[Vec<f64>]) -> f64 {
    let n = data.len() as f64;
    let width = data[0].len();
    if width == 0 {
        return 0.0;
    }
    let total: f64 = (0..width)
        .map(|j| {
            let mean = data.iter().map(|r| r[j]).sum::<f64>() / n;
            data.iter().map(|r| (r[j] - mean).powi(2)).sum::<f64>() / n
        })
        .sum();
    total / width as f64
}

fn random_init(data: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    rand::seq::index::sample(rng, data.len(), k)
        .into_iter()
        .map(|i| data[i].clone())
        .collect()
}

fn kmeans_plus_plus(data: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let n = data.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(data[rng.random_range(0..n)].clone());

    let mut closest: Vec<f64> = data
        .iter()
        .map(|row| squared_distance(row, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = closest.iter().sum();
        let chosen = if total > 0.0 {
            let target = rng.random::<f64>() * total;
            let mut cumulative = 0.0;
            let mut pick = n - 1;
            for (i, d) in closest.iter().enumerate() {
                cumulative += d;
                if cumulative > target {
                    pick = i;
                    break;
                }
            }
            pick
        } else {
            rng.random_range(0..n)
        };

        let centroid = data[chosen].clone();
        for (c, row) in closest.iter_mut().zip(data) {
            *c = c.min(squared_distance(row, &centroid));
        }
        centroids.push(centroid);
    }
    centroids
}
