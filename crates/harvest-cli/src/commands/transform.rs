//! Transform command - run one transformer on a local file.

use std::path::PathBuf;

use colored::Colorize;
use harvest::{
    CropTransformer, EmissionsTransformer, Loader, SqliteStore, TableStore, TidyTransform,
};

use super::{load_config, print_summary};
use crate::cli::SourceKind;

pub fn run(
    kind: SourceKind,
    file: PathBuf,
    database: Option<String>,
    table: Option<String>,
    config: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    if !file.exists() {
        return Err(format!("File not found: {}", file.display()).into());
    }
    let config = load_config(config.as_deref())?;

    let (loader, transformer): (_, Box<dyn TidyTransform>) = match kind {
        SourceKind::Emissions => (
            config.emissions_loader.clone(),
            Box::new(EmissionsTransformer::with_config(config.emissions.clone())),
        ),
        SourceKind::Crop => (
            config.crop_loader.clone(),
            Box::new(CropTransformer::with_config(config.crop.clone())),
        ),
    };

    println!(
        "{} {} as {}",
        "Transforming".cyan().bold(),
        file.display().to_string().white(),
        transformer.name()
    );

    let (raw, metadata) = Loader::with_config(loader).load_file(&file, &config.encodings)?;
    println!(
        "Decoded as {} ({} rows, {} columns)",
        metadata.encoding, metadata.row_count, metadata.column_count
    );
    println!();

    let tidy = transformer.transform(raw)?;
    print_summary("Result", &tidy.summary());

    if let (Some(database), Some(table)) = (database, table) {
        SqliteStore::new().put(&tidy, &database, &table)?;
        println!("{} {} in {}", "Stored".green(), table.white().bold(), database);
    }

    Ok(())
}
