//! Lloyd's k-means on normalised distributions.

use std::collections::BTreeMap;

use ck_core::RngHandle;
use rand::seq::SliceRandom;

use crate::metric::euclidean_distance;

/// Result of a k-means run.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    /// Cluster slot per row, `0..k`.
    pub assignments: Vec<usize>,
    /// Final centroids per slot.
    pub centroids: Vec<Vec<f64>>,
    /// Iterations performed.
    pub iterations: usize,
}

/// Runs k-means with centroids initialised from `k` seeded, distinct rows.
pub fn kmeans(features: &[Vec<f64>], k: usize, max_iterations: usize, seed: u64) -> KMeansFit {
    if features.is_empty() {
        return KMeansFit {
            assignments: Vec::new(),
            centroids: Vec::new(),
            iterations: 0,
        };
    }
    let k = k.max(1).min(features.len());
    let mut centroids = initialise_centroids(features, k, seed);
    let mut assignments = vec![usize::MAX; features.len()];

    let mut iterations = 0;
    for _ in 0..max_iterations.max(1) {
        iterations += 1;
        let updated = assign_clusters(features, &centroids, &mut assignments);
        recompute_centroids(features, &assignments, &mut centroids);
        if !updated {
            break;
        }
    }

    KMeansFit {
        assignments,
        centroids,
        iterations,
    }
}

fn initialise_centroids(features: &[Vec<f64>], k: usize, seed: u64) -> Vec<Vec<f64>> {
    let mut order: Vec<usize> = (0..features.len()).collect();
    order.shuffle(&mut RngHandle::from_seed(seed));
    let mut centroids: Vec<Vec<f64>> = Vec::with_capacity(k);
    for &idx in &order {
        if centroids.len() == k {
            break;
        }
        if !centroids.iter().any(|c| c == &features[idx]) {
            centroids.push(features[idx].clone());
        }
    }
    // fewer distinct rows than k
    for &idx in &order {
        if centroids.len() == k {
            break;
        }
        centroids.push(features[idx].clone());
    }
    centroids
}

fn assign_clusters(
    features: &[Vec<f64>],
    centroids: &[Vec<f64>],
    assignments: &mut [usize],
) -> bool {
    let mut changed = false;
    for (idx, feature) in features.iter().enumerate() {
        let mut best = 0usize;
        let mut best_dist = f64::INFINITY;
        for (cluster_idx, centroid) in centroids.iter().enumerate() {
            let dist = euclidean_distance(feature, centroid);
            if dist < best_dist {
                best = cluster_idx;
                best_dist = dist;
            }
        }
        if assignments[idx] != best {
            assignments[idx] = best;
            changed = true;
        }
    }
    changed
}

fn recompute_centroids(features: &[Vec<f64>], assignments: &[usize], centroids: &mut [Vec<f64>]) {
    let mut accumulators: BTreeMap<usize, (Vec<f64>, usize)> = BTreeMap::new();
    for (feature, &cluster) in features.iter().zip(assignments) {
        let (sum, count) = accumulators
            .entry(cluster)
            .or_insert_with(|| (vec![0.0; feature.len()], 0));
        for (slot, value) in sum.iter_mut().zip(feature) {
            *slot += value;
        }
        *count += 1;
    }
    for (cluster, (mut sum, count)) in accumulators {
        let denom = count as f64;
        for value in &mut sum {
            *value /= denom;
        }
        centroids[cluster] = sum;
    }
}

/// Row of `members` closest to `centroid`.
pub fn select_representative(members: &[usize], features: &[Vec<f64>], centroid: &[f64]) -> usize {
    let mut best_member = members[0];
    let mut best_dist = f64::INFINITY;
    for &idx in members {
        let dist = euclidean_distance(&features[idx], centroid);
        if dist < best_dist {
            best_dist = dist;
            best_member = idx;
        }
    }
    best_member
}
