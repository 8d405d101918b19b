//! Harvest CLI - emissions and crop production pipeline.

mod cli;
mod commands;
mod logging;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            config,
            data_dir,
            download,
            credentials,
            database,
            table,
            keep_intermediate,
            json,
        } => commands::run::run(commands::run::RunArgs {
            config,
            data_dir,
            download,
            credentials,
            database,
            table,
            keep_intermediate,
            json,
        }),

        Commands::Fetch {
            credentials,
            data_dir,
            config,
        } => commands::fetch::run(credentials, data_dir, config),

        Commands::Transform {
            kind,
            file,
            database,
            table,
            config,
        } => commands::transform::run(kind, file, database, table, config),

        Commands::Show {
            database,
            table,
            limit,
            json,
        } => commands::show::run(database, table, limit, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
