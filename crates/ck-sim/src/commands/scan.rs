use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use ck_data::{OverwritePolicy, WriteOptions, WriteOutcome};
use ck_scan::{load_plan, Progress};
use clap::Args;
use tracing::{debug, info};

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// YAML scan plan.
    #[arg(long)]
    pub plan: PathBuf,
    /// Output directory.
    #[arg(long)]
    pub out: PathBuf,
    /// Dataset name; files are `<name>_data.csv` and `<name>_metadata.json`.
    #[arg(long)]
    pub name: String,
    /// Worker threads, overriding the plan.
    #[arg(long)]
    pub workers: Option<usize>,
    /// What to do with existing output: ask, overwrite or raise.
    #[arg(long, default_value = "ask")]
    pub overwrite: OverwritePolicy,
    /// Write even if the scan produced no rows.
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: &ScanArgs) -> Result<(), Box<dyn Error>> {
    let plan = load_plan(&args.plan)?;
    let mut scanner = plan.scanner()?;
    if args.workers.is_some() {
        scanner.set_workers(args.workers);
    }
    scanner.set_progress_observer(Arc::new(|progress: &Progress| {
        debug!(
            completed = progress.completed,
            total = progress.total,
            remaining_s = progress.remaining.as_secs_f64(),
            "scan progress"
        );
    }));

    let data = scanner.run()?.into_container();
    let opts = WriteOptions {
        overwrite: args.overwrite,
        force: args.force,
    };
    match data.write(&args.out, &args.name, opts)? {
        WriteOutcome::Written { data, metadata } => info!(
            data = %data.display(),
            metadata = %metadata.display(),
            "scan written"
        ),
        WriteOutcome::Declined => info!("scan not written"),
    }
    Ok(())
}
