//! limsync — file orphaned images according to a LIMS metadata export.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use limsync_cli::{notices, prepare, summary, Cli};
use limsync_omero::OmeroWebClient;
use limsync_reconcile::reconcile;

fn main() -> ExitCode {
    // Logs go to stderr so the per-row notices on stdout stay clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let (config, table) = prepare(cli)?;
    info!(
        "Loaded {} metadata rows from {}",
        table.len(),
        cli.md.display()
    );

    let password = rpassword::prompt_password(format!(
        "Enter password for {}: ",
        config.admin_user
    ))
    .context("Failed to read password")?;

    let (client, session) = OmeroWebClient::connect(&config, &password)?;
    drop(password);
    info!(
        "Connected to {} as {} for user {} in group {}",
        config.web_url(),
        config.admin_user,
        session.user().name,
        session.group().name
    );

    let report = reconcile(&client, &session, table, |row| {
        for line in notices(row) {
            println!("{}", line);
        }
    })?;

    println!("Complete!");
    println!("{}", summary(&report, cli.format)?);
    Ok(())
}
