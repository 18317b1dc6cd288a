use std::error::Error;
use std::path::PathBuf;

use ck_cluster::load_cluster_config;
use ck_data::{DataContainer, OverwritePolicy, WriteOptions, WriteOutcome};
use clap::Args;
use tracing::info;

#[derive(Args, Debug)]
pub struct ClusterArgs {
    /// Directory of the scanned dataset.
    #[arg(long)]
    pub dir: PathBuf,
    /// Dataset name.
    #[arg(long)]
    pub name: String,
    /// YAML clustering configuration.
    #[arg(long)]
    pub config: PathBuf,
    /// Output column, overriding the configuration.
    #[arg(long)]
    pub column: Option<String>,
    /// What to do with the existing dataset files: ask, overwrite or raise.
    #[arg(long, default_value = "overwrite")]
    pub overwrite: OverwritePolicy,
}

pub fn run(args: &ClusterArgs) -> Result<(), Box<dyn Error>> {
    let mut config = load_cluster_config(&args.config)?;
    if let Some(column) = &args.column {
        if column.is_empty() || column.ends_with("_bp") {
            return Err(format!("invalid cluster column `{column}`").into());
        }
        config.column = column.clone();
    }
    let mut data = DataContainer::from_path_and_name(&args.dir, &args.name)?;
    let assignment = config.apply(&mut data)?;
    info!(
        column = %config.column,
        clusters = assignment.n_clusters(),
        "clustering done"
    );
    match data.write(&args.dir, &args.name, WriteOptions::with_policy(args.overwrite))? {
        WriteOutcome::Written { data, .. } => info!(data = %data.display(), "clustering written"),
        WriteOutcome::Declined => info!("clustering not written"),
    }
    Ok(())
}
