use std::error::Error;
use std::path::PathBuf;

use ck_core::serde::to_pretty_json_string;
use ck_data::DataContainer;
use clap::Args;

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Directory of the dataset.
    #[arg(long)]
    pub dir: PathBuf,
    /// Dataset name.
    #[arg(long)]
    pub name: String,
    /// Print the full metadata as JSON instead of a summary.
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: &InfoArgs) -> Result<(), Box<dyn Error>> {
    let data = DataContainer::from_path_and_name(&args.dir, &args.name)?;
    if args.json {
        println!("{}", to_pretty_json_string(data.metadata())?);
        return Ok(());
    }

    println!("rows:       {}", data.n());
    println!("bins:       {}", data.nbins());
    println!("parameters: {}", data.par_cols().join(", "));
    if let Some(scan) = &data.metadata().scan {
        println!("scanned:    {} ({})", scan.time, scan.dfunction.name);
    }
    if let Some(errors) = &data.metadata().errors {
        println!(
            "errors:     abs {} rel {} poisson {}",
            errors.abs,
            errors.rel,
            errors
                .poisson
                .map_or_else(|| "-".to_string(), |scale| scale.to_string())
        );
    }
    for (column, cluster) in &data.metadata().cluster {
        let benchmarks = data
            .table()
            .bools(&format!("{column}_bp"))
            .map(|flags| flags.iter().filter(|&&flag| flag).count())
            .unwrap_or(0);
        println!(
            "clustering: {column} ({}, {} clusters, {} benchmarks)",
            cluster.algorithm, cluster.n_clusters, benchmarks
        );
    }
    Ok(())
}
