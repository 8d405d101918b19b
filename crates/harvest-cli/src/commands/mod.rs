//! CLI command implementations.

pub mod fetch;
pub mod run;
pub mod show;
pub mod transform;

use std::path::Path;

use colored::Colorize;
use harvest::{PipelineConfig, TableSummary};

/// Load the configuration file, or the defaults when none is given.
fn load_config(path: Option<&Path>) -> harvest::Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_file(path),
        None => Ok(PipelineConfig::default()),
    }
}

/// Print the shape of a table under a heading.
fn print_summary(title: &str, summary: &TableSummary) {
    println!("{}", title.yellow().bold());

    let span = match (summary.first_year, summary.last_year) {
        (Some(first), Some(last)) => format!("{}-{}", first, last),
        _ => "-".to_string(),
    };
    println!("  Rows:     {}", summary.rows.to_string().white().bold());
    println!(
        "  {:9} {} ({})",
        format!("{}:", summary.entity_label),
        summary.entities.len(),
        summary.entities.join(", ")
    );
    println!("  Years:    {}", span);

    for (metric, non_null) in &summary.non_null {
        let count = if *non_null == summary.rows {
            non_null.to_string().green()
        } else if *non_null == 0 {
            non_null.to_string().red()
        } else {
            non_null.to_string().yellow()
        };
        println!("    {:24} {} non-null", metric, count);
    }
    println!();
}
