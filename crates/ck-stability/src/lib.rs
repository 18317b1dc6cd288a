#![deny(missing_docs)]
#![doc = "Stability of a clustering under perturbation of the sample points."]

pub mod fom;
pub mod plan;
pub mod table;
pub mod tester;

pub use fom::{DeltaNClusters, FigureOfMerit, MatchingClusters, RandIndex};
pub use plan::{builtin_fom, load_stability_plan, StabilityPlan};
pub use table::FomTable;
pub use tester::{StabilityResult, StabilityTester, CACHE_COLUMN};
