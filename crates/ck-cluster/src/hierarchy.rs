//! Agglomerative clustering on a condensed distance matrix.

use serde::{Deserialize, Serialize};

use crate::metric::CondensedMatrix;

/// Inter-cluster distance used when merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    /// Nearest pair of members.
    Single,
    /// Farthest pair of members.
    #[default]
    Complete,
    /// Mean over all member pairs.
    Average,
    /// Mean of the two merged clusters' distances.
    Weighted,
}

/// Rule cutting the dendrogram into flat clusters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Criterion {
    /// Apply every merge at distance `<= max_d`.
    Distance {
        /// Largest merge distance applied.
        max_d: f64,
    },
    /// At most `k` clusters.
    MaxClust {
        /// Maximum number of clusters.
        k: usize,
    },
}

/// One merge step: clusters `left` and `right` joined at `distance`.
///
/// Ids below `n` are observations; merge `s` creates cluster `n + s`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    /// Smaller id of the merged pair.
    pub left: usize,
    /// Larger id of the merged pair.
    pub right: usize,
    /// Linkage distance of the merge.
    pub distance: f64,
    /// Observations in the new cluster.
    pub size: usize,
}

/// Full merge history of `n` observations.
#[derive(Debug, Clone, PartialEq)]
pub struct Dendrogram {
    n: usize,
    merges: Vec<Merge>,
}

impl Dendrogram {
    /// Builds the dendrogram of `distances` with `linkage`.
    ///
    /// Among equally distant pairs the one with the lowest row positions is
    /// merged first.
    pub fn build(distances: &CondensedMatrix, linkage: Linkage) -> Self {
        let n = distances.n();
        let mut dist = distances.to_full();
        let mut active: Vec<bool> = vec![true; n];
        let mut ids: Vec<usize> = (0..n).collect();
        let mut sizes: Vec<usize> = vec![1; n];
        let mut merges = Vec::with_capacity(n.saturating_sub(1));

        for step in 0..n.saturating_sub(1) {
            let mut best: Option<(usize, usize, f64)> = None;
            for a in 0..n {
                if !active[a] {
                    continue;
                }
                for b in (a + 1)..n {
                    if !active[b] {
                        continue;
                    }
                    match best {
                        Some((_, _, d)) if dist[a][b] >= d => {}
                        _ => best = Some((a, b, dist[a][b])),
                    }
                }
            }
            let Some((a, b, distance)) = best else {
                break;
            };

            for c in 0..n {
                if !active[c] || c == a || c == b {
                    continue;
                }
                let updated = match linkage {
                    Linkage::Single => dist[a][c].min(dist[b][c]),
                    Linkage::Complete => dist[a][c].max(dist[b][c]),
                    Linkage::Average => {
                        let (na, nb) = (sizes[a] as f64, sizes[b] as f64);
                        (na * dist[a][c] + nb * dist[b][c]) / (na + nb)
                    }
                    Linkage::Weighted => 0.5 * (dist[a][c] + dist[b][c]),
                };
                dist[a][c] = updated;
                dist[c][a] = updated;
            }

            let size = sizes[a] + sizes[b];
            merges.push(Merge {
                left: ids[a].min(ids[b]),
                right: ids[a].max(ids[b]),
                distance,
                size,
            });
            active[b] = false;
            sizes[a] = size;
            ids[a] = n + step;
        }
        Self { n, merges }
    }

    /// Number of observations.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Merge history in merge order.
    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    /// Flat cluster labels per observation, starting at 1 in order of first appearance.
    pub fn fcluster(&self, criterion: Criterion) -> Vec<i64> {
        let applied = match criterion {
            Criterion::Distance { max_d } => self
                .merges
                .iter()
                .take_while(|merge| merge.distance <= max_d)
                .count(),
            Criterion::MaxClust { k } => self.n.saturating_sub(k.max(1)),
        };

        let total = self.n + self.merges.len();
        let mut parent: Vec<usize> = (0..total).collect();
        for (step, merge) in self.merges.iter().take(applied).enumerate() {
            let node = self.n + step;
            parent[merge.left] = node;
            parent[merge.right] = node;
        }

        let mut labels = Vec::with_capacity(self.n);
        let mut roots: Vec<usize> = Vec::new();
        for observation in 0..self.n {
            let mut node = observation;
            while parent[node] != node {
                node = parent[node];
            }
            let label = match roots.iter().position(|&root| root == node) {
                Some(pos) => pos,
                None => {
                    roots.push(node);
                    roots.len() - 1
                }
            };
            labels.push(label as i64 + 1);
        }
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::euclidean;

    fn line(points: &[f64]) -> CondensedMatrix {
        euclidean(&points.iter().map(|&x| vec![x]).collect::<Vec<_>>()).unwrap()
    }

    #[test]
    fn single_linkage_chains() {
        let dendrogram = Dendrogram::build(&line(&[0.0, 1.0, 2.0, 10.0]), Linkage::Single);
        let distances: Vec<f64> = dendrogram.merges().iter().map(|m| m.distance).collect();
        assert_eq!(distances, vec![1.0, 1.0, 8.0]);
        assert_eq!(
            dendrogram.fcluster(Criterion::Distance { max_d: 1.5 }),
            vec![1, 1, 1, 2]
        );
    }

    #[test]
    fn complete_linkage_uses_farthest_members() {
        let dendrogram = Dendrogram::build(&line(&[0.0, 1.0, 2.0, 10.0]), Linkage::Complete);
        assert_eq!(dendrogram.merges()[1].distance, 2.0);
        assert_eq!(
            dendrogram.fcluster(Criterion::Distance { max_d: 1.5 }),
            vec![1, 1, 2, 3]
        );
    }

    #[test]
    fn maxclust_caps_the_cluster_count() {
        let dendrogram = Dendrogram::build(&line(&[0.0, 0.1, 5.0, 5.1, 9.0]), Linkage::Average);
        assert_eq!(
            dendrogram.fcluster(Criterion::MaxClust { k: 2 }),
            vec![1, 1, 2, 2, 2]
        );
        assert_eq!(
            dendrogram.fcluster(Criterion::MaxClust { k: 10 }),
            vec![1, 2, 3, 4, 5]
        );
        assert_eq!(
            dendrogram.fcluster(Criterion::MaxClust { k: 1 }),
            vec![1; 5]
        );
    }

    #[test]
    fn weighted_linkage_averages_merged_distances() {
        let dendrogram = Dendrogram::build(&line(&[0.0, 1.0, 4.0]), Linkage::Weighted);
        assert_eq!(dendrogram.merges()[1].distance, 0.5 * (4.0 + 3.0));
        assert_eq!(dendrogram.merges()[1].size, 3);
    }
}
