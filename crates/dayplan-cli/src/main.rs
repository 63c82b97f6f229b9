//! dayplan CLI - plan your days from the terminal

mod cli;
mod commands;
mod error;

#[cfg(test)]
mod tests;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::common::resolve_db_path;
use crate::commands::delete::run_delete;
use crate::commands::done::run_done;
use crate::commands::list::{run_list, ListArgs};
use crate::commands::postpone::run_postpone;
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dayplan=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);

    match cli.command {
        Commands::Add {
            title,
            date,
            priority,
            estimate,
            color,
            description,
        } => run_add(&title, date, priority, estimate, color, description, &db_path).await?,
        Commands::List {
            date,
            from,
            to,
            all,
            json,
        } => {
            run_list(
                ListArgs {
                    date,
                    from,
                    to,
                    all,
                    json,
                },
                &db_path,
            )
            .await?;
        }
        Commands::Done { id } => run_done(&id, &db_path).await?,
        Commands::Postpone { id, to } => run_postpone(&id, to, &db_path).await?,
        Commands::Delete { id } => run_delete(&id, &db_path).await?,
        Commands::Sync { user } => run_sync(user.as_deref(), &db_path).await?,
        Commands::Status { json } => run_status(json, &db_path).await?,
    }

    Ok(())
}
