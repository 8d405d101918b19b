//! Run command - execute the whole pipeline once.

use std::path::PathBuf;

use colored::Colorize;
use harvest::{KaggleCredentials, KaggleSource, LocalDirectory, Pipeline, SqliteStore};
use tracing::debug;

use super::{load_config, print_summary};

pub struct RunArgs {
    pub config: Option<PathBuf>,
    pub data_dir: PathBuf,
    pub download: bool,
    pub credentials: Option<PathBuf>,
    pub database: Option<String>,
    pub table: Option<String>,
    pub keep_intermediate: bool,
    pub json: bool,
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(database) = args.database {
        config.output.location = database;
    }
    if let Some(table) = args.table {
        config.output.name = table;
    }
    config.keep_intermediate |= args.keep_intermediate;
    debug!(
        database = %config.output.location,
        table = %config.output.name,
        keep_intermediate = config.keep_intermediate,
        "configuration resolved"
    );

    let pipeline = Pipeline::with_config(config);
    let store = SqliteStore::new();

    let report = if args.download {
        let path = args
            .credentials
            .ok_or("--download requires --credentials")?;
        let credentials = KaggleCredentials::from_file(&path)?;
        let source = KaggleSource::new(credentials, &args.data_dir)?;
        pipeline.run(&source, &store)?
    } else {
        if !args.data_dir.is_dir() {
            return Err(format!("Data directory not found: {}", args.data_dir.display()).into());
        }
        pipeline.run(&LocalDirectory::new(&args.data_dir), &store)?
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} {}",
            "Pipeline run from".cyan().bold(),
            report.source.white()
        );
        println!();
        for meta in [&report.emissions_source, &report.crop_source] {
            println!(
                "Loaded {} ({} rows, {}, {})",
                meta.name.white(),
                meta.row_count,
                meta.encoding,
                meta.format
            );
        }
        println!();

        print_summary("Emissions", &report.emissions);
        print_summary("Crop production", &report.crop);
        if let Some(merged) = &report.merged {
            print_summary("Merged", merged);
        }

        for target in &report.stored {
            println!(
                "{} {} in {}",
                "Stored".green(),
                target.name.white().bold(),
                target.location
            );
        }
    }

    if report.merged.is_none() {
        return Err("merge failed; nothing was stored for the merged table (see log output)".into());
    }
    Ok(())
}
