//! Cluster ids per row.

use ck_data::canonical_ids;

/// Row → cluster id, with ids contiguous from 0 in order of first appearance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterAssignment {
    ids: Vec<i64>,
}

impl ClusterAssignment {
    /// Canonicalises arbitrary labels.
    pub fn from_labels(labels: &[i64]) -> Self {
        Self {
            ids: canonical_ids(labels),
        }
    }

    /// Cluster id per row.
    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True if no rows were clustered.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of distinct clusters.
    pub fn n_clusters(&self) -> usize {
        self.ids.iter().max().map_or(0, |&max| max as usize + 1)
    }

    /// Rows of each cluster, indexed by cluster id.
    pub fn members(&self) -> Vec<Vec<usize>> {
        let mut members = vec![Vec::new(); self.n_clusters()];
        for (row, &id) in self.ids.iter().enumerate() {
            members[id as usize].push(row);
        }
        members
    }
}
