//! Distribution functions evaluated at every sample point.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use ck_core::errors::{CkError, ErrorInfo};
use ck_core::DFunctionMetadata;
use serde_json::{json, Value};

use crate::space::SamplePoint;

/// A pure function mapping a sample point to a binned distribution.
///
/// Implementations are shared between worker threads and must not keep
/// mutable state between calls.
pub trait DistributionFunction: Send + Sync {
    /// Name the function is registered under.
    fn name(&self) -> &str;

    /// Free-form description recorded in the metadata.
    fn doc(&self) -> &str {
        ""
    }

    /// Configuration recorded in the metadata.
    fn kwargs(&self) -> BTreeMap<String, Value> {
        BTreeMap::new()
    }

    /// Number of bins of every returned distribution.
    fn nbins(&self) -> usize;

    /// Bin edges, for functions that integrate a density.
    fn binning(&self) -> Option<Vec<f64>> {
        None
    }

    /// Whether returned distributions are normalised.
    fn normalize(&self) -> Option<bool> {
        None
    }

    /// Computes the bin contents at `point`.
    fn evaluate(&self, point: &SamplePoint) -> Result<Vec<f64>, CkError>;

    /// Metadata section describing this function.
    fn metadata(&self) -> DFunctionMetadata {
        DFunctionMetadata {
            name: self.name().to_string(),
            doc: self.doc().to_string(),
            kwargs: self.kwargs(),
            nbins: self.nbins(),
            binning: self.binning(),
            normalize: self.normalize(),
        }
    }
}

/// A pointwise density `f(point, x)` to be integrated over bins.
pub trait Density: Send + Sync {
    /// Name the binned function is registered under.
    fn name(&self) -> &str;

    /// Free-form description.
    fn doc(&self) -> &str {
        ""
    }

    /// Configuration recorded in the metadata.
    fn kwargs(&self) -> BTreeMap<String, Value> {
        BTreeMap::new()
    }

    /// Density at `x` for the given point.
    fn density(&self, point: &SamplePoint, x: f64) -> f64;
}

const SIMPSON_TOLERANCE: f64 = 1e-10;
const SIMPSON_MAX_DEPTH: u32 = 40;

/// Integrates a [`Density`] over fixed bins with adaptive Simpson quadrature.
pub struct BinnedFunction<D> {
    density: D,
    binning: Vec<f64>,
    normalize: bool,
}

impl<D: Density> BinnedFunction<D> {
    /// Wraps `density`; `binning` must hold at least two increasing edges.
    pub fn new(density: D, binning: Vec<f64>, normalize: bool) -> Result<Self, CkError> {
        if binning.len() < 2 {
            return Err(CkError::Configuration(
                ErrorInfo::new("binning-too-short", "binning needs at least two edges")
                    .with_context("edges", binning.len().to_string()),
            ));
        }
        if binning.windows(2).any(|w| !(w[0] < w[1])) {
            return Err(CkError::Configuration(
                ErrorInfo::new("binning-not-increasing", "bin edges must be strictly increasing")
                    .with_context("binning", format!("{binning:?}")),
            ));
        }
        Ok(Self {
            density,
            binning,
            normalize,
        })
    }
}

impl<D: Density> DistributionFunction for BinnedFunction<D> {
    fn name(&self) -> &str {
        self.density.name()
    }

    fn doc(&self) -> &str {
        self.density.doc()
    }

    fn kwargs(&self) -> BTreeMap<String, Value> {
        self.density.kwargs()
    }

    fn nbins(&self) -> usize {
        self.binning.len() - 1
    }

    fn binning(&self) -> Option<Vec<f64>> {
        Some(self.binning.clone())
    }

    fn normalize(&self) -> Option<bool> {
        Some(self.normalize)
    }

    fn evaluate(&self, point: &SamplePoint) -> Result<Vec<f64>, CkError> {
        let f = |x: f64| self.density.density(point, x);
        let mut contents = Vec::with_capacity(self.nbins());
        for edges in self.binning.windows(2) {
            let value = integrate(&f, edges[0], edges[1]);
            if !value.is_finite() {
                return Err(CkError::Evaluation(
                    ErrorInfo::new("bin-not-finite", "bin integral is not finite")
                        .with_context("bin", format!("[{}, {}]", edges[0], edges[1]))
                        .with_context("point", point.to_string()),
                ));
            }
            contents.push(value);
        }
        if self.normalize {
            let total: f64 = contents.iter().sum();
            if total == 0.0 {
                return Err(CkError::NumericDegeneracy(
                    ErrorInfo::new("normalize-zero-sum", "distribution integrates to zero")
                        .with_context("point", point.to_string()),
                ));
            }
            contents.iter_mut().for_each(|c| *c /= total);
        }
        Ok(contents)
    }
}

/// Adaptive Simpson integral of `f` over `[a, b]`.
pub fn integrate(f: &dyn Fn(f64) -> f64, a: f64, b: f64) -> f64 {
    let fa = f(a);
    let fb = f(b);
    let m = 0.5 * (a + b);
    let fm = f(m);
    let whole = simpson(a, b, fa, fm, fb);
    adaptive(f, a, b, fa, fm, fb, whole, SIMPSON_TOLERANCE, SIMPSON_MAX_DEPTH)
}

fn simpson(a: f64, b: f64, fa: f64, fm: f64, fb: f64) -> f64 {
    (b - a) / 6.0 * (fa + 4.0 * fm + fb)
}

#[allow(clippy::too_many_arguments)]
fn adaptive(
    f: &dyn Fn(f64) -> f64,
    a: f64,
    b: f64,
    fa: f64,
    fm: f64,
    fb: f64,
    whole: f64,
    tolerance: f64,
    depth: u32,
) -> f64 {
    let m = 0.5 * (a + b);
    let lm = 0.5 * (a + m);
    let rm = 0.5 * (m + b);
    let flm = f(lm);
    let frm = f(rm);
    let left = simpson(a, m, fa, flm, fm);
    let right = simpson(m, b, fm, frm, fb);
    let delta = left + right - whole;
    if depth == 0 || delta.abs() <= 15.0 * tolerance {
        return left + right + delta / 15.0;
    }
    adaptive(f, a, m, fa, flm, fm, left, tolerance / 2.0, depth - 1)
        + adaptive(f, m, b, fm, frm, fb, right, tolerance / 2.0, depth - 1)
}

/// Toy density `(1 + Σ_k p_k x^(k+1))²` with `p_k` the point's values in name order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Polynomial;

impl Polynomial {
    /// Registered name.
    pub const NAME: &'static str = "polynomial";
}

impl Density for Polynomial {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn doc(&self) -> &str {
        "Squared polynomial (1 + sum_k p_k x^(k+1))^2 in the sorted parameters."
    }

    fn density(&self, point: &SamplePoint, x: f64) -> f64 {
        let mut amplitude = 1.0;
        let mut power = x;
        for &p in point.values() {
            amplitude += p * power;
            power *= x;
        }
        amplitude * amplitude
    }
}

/// Adapter turning a closure into a [`DistributionFunction`].
pub struct FnDistribution<F> {
    name: String,
    nbins: usize,
    kwargs: BTreeMap<String, Value>,
    func: F,
}

impl<F> FnDistribution<F>
where
    F: Fn(&SamplePoint) -> Result<Vec<f64>, CkError> + Send + Sync,
{
    /// Wraps `func`, which must return `nbins` contents.
    pub fn new(name: impl Into<String>, nbins: usize, func: F) -> Self {
        Self {
            name: name.into(),
            nbins,
            kwargs: BTreeMap::new(),
            func,
        }
    }

    /// Records `kwargs` in the metadata.
    pub fn with_kwargs(mut self, kwargs: BTreeMap<String, Value>) -> Self {
        self.kwargs = kwargs;
        self
    }
}

impl<F> DistributionFunction for FnDistribution<F>
where
    F: Fn(&SamplePoint) -> Result<Vec<f64>, CkError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn kwargs(&self) -> BTreeMap<String, Value> {
        self.kwargs.clone()
    }

    fn nbins(&self) -> usize {
        self.nbins
    }

    fn evaluate(&self, point: &SamplePoint) -> Result<Vec<f64>, CkError> {
        (self.func)(point)
    }
}

/// Read-only lookup of distribution functions by name.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, Arc<dyn DistributionFunction>>,
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl FunctionRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in `polynomial` function over `binning`.
    pub fn with_builtins(binning: Vec<f64>, normalize: bool) -> Result<Self, CkError> {
        let mut registry = Self::new();
        registry.register(Arc::new(BinnedFunction::new(Polynomial, binning, normalize)?));
        Ok(registry)
    }

    /// Adds `function` under its own name, replacing any previous entry.
    pub fn register(&mut self, function: Arc<dyn DistributionFunction>) {
        self.functions.insert(function.name().to_string(), function);
    }

    /// Function registered as `name`.
    pub fn get(&self, name: &str) -> Result<Arc<dyn DistributionFunction>, CkError> {
        self.functions.get(name).cloned().ok_or_else(|| {
            CkError::Configuration(
                ErrorInfo::new("dfunction-unknown", "no distribution function with this name")
                    .with_context("name", name)
                    .with_context("known", json!(self.names()).to_string()),
            )
        })
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.functions.keys().cloned().collect()
    }
}
