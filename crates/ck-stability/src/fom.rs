//! Figures of merit comparing a perturbed clustering with the baseline.

use std::collections::BTreeMap;

use ck_cluster::ClusterAssignment;
use ck_core::errors::{CkError, ErrorInfo};

/// Scalar comparison of two clusterings of the same rows.
pub trait FigureOfMerit: Send + Sync {
    /// Column name in the result table.
    fn name(&self) -> &str;

    /// Compares `perturbed` with `baseline`.
    fn compute(
        &self,
        baseline: &ClusterAssignment,
        perturbed: &ClusterAssignment,
    ) -> Result<f64, CkError>;
}

fn check_rows(name: &str, baseline: &ClusterAssignment, perturbed: &ClusterAssignment) -> Result<(), CkError> {
    if baseline.len() == perturbed.len() {
        return Ok(());
    }
    Err(CkError::Schema(
        ErrorInfo::new("fom-row-mismatch", "clusterings cover different numbers of rows")
            .with_context("fom", name)
            .with_context("baseline", baseline.len().to_string())
            .with_context("perturbed", perturbed.len().to_string()),
    ))
}

/// Fraction of rows whose cluster matches after mapping every perturbed
/// cluster to the baseline cluster most of its rows belong to.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchingClusters;

impl MatchingClusters {
    /// Column name.
    pub const NAME: &'static str = "matching_clusters";
}

impl FigureOfMerit for MatchingClusters {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn compute(
        &self,
        baseline: &ClusterAssignment,
        perturbed: &ClusterAssignment,
    ) -> Result<f64, CkError> {
        check_rows(self.name(), baseline, perturbed)?;
        if baseline.is_empty() {
            return Ok(1.0);
        }
        let mut votes: BTreeMap<i64, BTreeMap<i64, usize>> = BTreeMap::new();
        for (&base, &pert) in baseline.ids().iter().zip(perturbed.ids()) {
            *votes.entry(pert).or_default().entry(base).or_default() += 1;
        }
        let mut matching = 0usize;
        for counts in votes.values() {
            // ties go to the smallest baseline id
            let mut best = 0usize;
            for &count in counts.values() {
                if count > best {
                    best = count;
                }
            }
            matching += best;
        }
        Ok(matching as f64 / baseline.len() as f64)
    }
}

/// Perturbed minus baseline number of clusters.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeltaNClusters;

impl DeltaNClusters {
    /// Column name.
    pub const NAME: &'static str = "delta_n_clusters";
}

impl FigureOfMerit for DeltaNClusters {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn compute(
        &self,
        baseline: &ClusterAssignment,
        perturbed: &ClusterAssignment,
    ) -> Result<f64, CkError> {
        check_rows(self.name(), baseline, perturbed)?;
        Ok(perturbed.n_clusters() as f64 - baseline.n_clusters() as f64)
    }
}

/// Fraction of row pairs on which both clusterings agree (same or different cluster).
#[derive(Debug, Clone, Copy, Default)]
pub struct RandIndex;

impl RandIndex {
    /// Column name.
    pub const NAME: &'static str = "rand_index";
}

impl FigureOfMerit for RandIndex {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn compute(
        &self,
        baseline: &ClusterAssignment,
        perturbed: &ClusterAssignment,
    ) -> Result<f64, CkError> {
        check_rows(self.name(), baseline, perturbed)?;
        let (a, b) = (baseline.ids(), perturbed.ids());
        let n = a.len();
        if n < 2 {
            return Ok(1.0);
        }
        let mut agree = 0usize;
        for i in 0..n {
            for j in (i + 1)..n {
                if (a[i] == a[j]) == (b[i] == b[j]) {
                    agree += 1;
                }
            }
        }
        Ok(agree as f64 / (n * (n - 1) / 2) as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(labels: &[i64]) -> ClusterAssignment {
        ClusterAssignment::from_labels(labels)
    }

    #[test]
    fn identical_clusterings_score_perfectly() {
        let a = assignment(&[0, 0, 1, 2, 2]);
        let b = assignment(&[5, 5, 3, 9, 9]);
        assert_eq!(MatchingClusters.compute(&a, &b).unwrap(), 1.0);
        assert_eq!(RandIndex.compute(&a, &b).unwrap(), 1.0);
        assert_eq!(DeltaNClusters.compute(&a, &b).unwrap(), 0.0);
    }

    #[test]
    fn merged_clusters_lose_matches() {
        let base = assignment(&[0, 0, 1, 1]);
        let merged = assignment(&[0, 0, 0, 0]);
        assert_eq!(MatchingClusters.compute(&base, &merged).unwrap(), 0.5);
        assert_eq!(DeltaNClusters.compute(&base, &merged).unwrap(), -1.0);
        // pairs (0,1) and (2,3) agree, the four cross pairs do not
        assert!((RandIndex.compute(&base, &merged).unwrap() - 2.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn row_counts_must_match() {
        let err = RandIndex
            .compute(&assignment(&[0, 1]), &assignment(&[0]))
            .unwrap_err();
        assert!(matches!(err, CkError::Schema(_)));
    }
}
