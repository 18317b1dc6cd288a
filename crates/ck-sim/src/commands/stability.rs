use std::error::Error;
use std::path::PathBuf;

use ck_cluster::load_cluster_config;
use ck_data::{DataContainer, OverwritePolicy, StdinPrompt};
use ck_scan::load_plan;
use ck_stability::{load_stability_plan, StabilityPlan};
use clap::Args;
use tracing::info;

#[derive(Args, Debug)]
pub struct StabilityArgs {
    /// YAML scan plan.
    #[arg(long)]
    pub plan: PathBuf,
    /// YAML clustering configuration.
    #[arg(long)]
    pub cluster_config: PathBuf,
    /// YAML stability plan; the noise section of the scan plan is used when absent.
    #[arg(long)]
    pub stability: Option<PathBuf>,
    /// Number of perturbed repetitions, overriding the stability plan.
    #[arg(long)]
    pub repeat: Option<usize>,
    /// Output CSV with one row per repetition.
    #[arg(long)]
    pub out: PathBuf,
    /// What to do with an existing output file: ask, overwrite or raise.
    #[arg(long, default_value = "ask")]
    pub overwrite: OverwritePolicy,
}

pub fn run(args: &StabilityArgs) -> Result<(), Box<dyn Error>> {
    let scan_plan = load_plan(&args.plan)?;
    let config = load_cluster_config(&args.cluster_config)?;
    let mut plan = match &args.stability {
        Some(path) => load_stability_plan(path)?,
        None => {
            let noise = scan_plan.noise.ok_or_else(|| {
                format!(
                    "{} has no noise section; pass --stability",
                    args.plan.display()
                )
            })?;
            StabilityPlan::with_noise(noise)
        }
    };
    if let Some(repeat) = args.repeat {
        plan.repeat = repeat;
    }
    if plan.errors.is_none() {
        plan.errors = config.errors;
    }

    let scanner = scan_plan.scanner()?;
    let engine = config.engine();
    let tester = plan.tester()?;
    let result = tester.run(&DataContainer::empty(), &scanner, &engine)?;

    for name in result.foms.columns() {
        if let Some(mean) = result.foms.mean(name) {
            info!(fom = %name, mean, "figure of merit");
        }
    }
    if result.foms.write_csv(&args.out, args.overwrite, &StdinPrompt)? {
        info!(path = %args.out.display(), "figures of merit written");
    }
    Ok(())
}
