#![deny(missing_docs)]
#![doc = "Parallel scan of a parameter space into binned distributions."]

pub mod assemble;
pub mod dfunction;
pub mod noise;
pub mod plan;
pub mod pool;
pub mod scanner;
pub mod space;

pub use assemble::assemble;
pub use dfunction::{
    integrate, BinnedFunction, Density, DistributionFunction, FnDistribution, FunctionRegistry,
    Polynomial,
};
pub use noise::{Noise, NoiseKind, NoiseMode};
pub use plan::{load_plan, DFunctionSpec, NoiseSpec, ScanPlan, SpointsSpec};
pub use pool::{CancelToken, Job, Progress, ProgressObserver, RunHooks, WorkerPool};
pub use scanner::{ScanResult, Scanner, SpointsLabels};
pub use space::{ParameterSpace, SamplePoint};
