use std::collections::BTreeMap;
use std::sync::Arc;

use ck_cluster::{ClusterEngine, ClusterMethod, Criterion, ErrorsSpec, Linkage, Metric};
use ck_core::CkError;
use ck_scan::{FnDistribution, Scanner, SamplePoint};

/// Two-bin step in `x`: negative values pile up in the first bin.
pub fn step_scanner() -> Scanner {
    let step = FnDistribution::new("step", 2, |point: &SamplePoint| {
        let x = point
            .get("x")
            .ok_or_else(|| CkError::config("step-no-x", "missing x"))?;
        Ok(if x < 0.0 { vec![9.0, 1.0] } else { vec![1.0, 9.0] })
    });
    let mut values = BTreeMap::new();
    values.insert("x".to_string(), vec![-2.0, -1.9, -1.8, 1.8, 1.9, 2.0]);
    let mut scanner = Scanner::new(Default::default());
    scanner
        .set_spoints_grid(values)
        .set_workers(Some(2))
        .set_dfunction_instance(Arc::new(step));
    scanner
}

pub fn two_cluster_engine() -> ClusterEngine {
    ClusterEngine::new(ClusterMethod::Hierarchical {
        linkage: Linkage::Average,
        criterion: Criterion::MaxClust { k: 2 },
        metric: Metric::Chi2,
    })
}

pub fn errors() -> ErrorsSpec {
    ErrorsSpec {
        abs: 0.0,
        rel: 0.05,
        poisson: None,
    }
}
