//! Fetch command - download and extract the datasets.

use std::path::PathBuf;

use colored::Colorize;
use harvest::{KaggleCredentials, KaggleSource};

use super::load_config;

pub fn run(
    credentials: PathBuf,
    data_dir: PathBuf,
    config: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config.as_deref())?;
    let credentials = KaggleCredentials::from_file(&credentials)?;
    let source = KaggleSource::new(credentials, &data_dir)?;

    for dataset in [&config.emissions_dataset, &config.crop_dataset] {
        println!("{} {}", "Downloading".cyan().bold(), dataset.to_string().white());
        let files = source.download(dataset)?;
        for file in &files {
            println!("  {}", file.display());
        }
        println!(
            "  {} {} files",
            "Extracted".green(),
            files.len().to_string().white().bold()
        );
    }

    Ok(())
}
