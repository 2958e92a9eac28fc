//! # limsync
//!
//! Files orphaned OMERO images into Projects and Datasets named by a LIMS
//! metadata export, and attaches the remaining columns to each image as a
//! key-value annotation.
//!
//! ## Configuration
//!
//! Every flag can also be set through the environment:
//!
//! - `LIMSYNC_USER`, `LIMSYNC_GROUP`, `LIMSYNC_SUDO` - image owner, group, admin account
//! - `LIMSYNC_SERVER`, `LIMSYNC_PORT` - repository host and port (default `localhost:4064`)
//! - `LIMSYNC_WEB_URL` - OMERO.web base URL (default `http://<server>:4080`)
//!
//! The admin password is always prompted for.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use limsync_core::config::{DEFAULT_PORT, DEFAULT_SERVER, DEFAULT_TIMEOUT_SECS};
use limsync_core::{ConnectionConfig, ImageId};
use limsync_metadata::{load_metadata, MetadataTable};
use limsync_reconcile::{RowOutcome, RowReport, RunReport};

/// Reconcile LIMS metadata against orphaned images.
#[derive(Debug, Parser)]
#[command(name = "limsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Metadata file (csv, tsv, xlsx or ods).
    pub md: PathBuf,

    /// Account that owns the images.
    #[arg(short = 'u', long, env = "LIMSYNC_USER")]
    pub user: String,

    /// Group to search for orphaned images.
    #[arg(short = 'g', long, env = "LIMSYNC_GROUP")]
    pub group: String,

    /// Administrative account used to log in.
    #[arg(long, env = "LIMSYNC_SUDO")]
    pub sudo: String,

    /// Repository host.
    #[arg(short = 's', long, env = "LIMSYNC_SERVER", default_value = DEFAULT_SERVER)]
    pub server: String,

    /// Repository port.
    #[arg(short = 'p', long, env = "LIMSYNC_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// OMERO.web base URL.
    #[arg(long, env = "LIMSYNC_WEB_URL")]
    pub web_url: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, env = "LIMSYNC_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Summary format.
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,
}

impl Cli {
    /// Connection settings from the parsed flags.
    pub fn config(&self) -> ConnectionConfig {
        ConnectionConfig {
            server: self.server.clone(),
            port: self.port,
            web_url: self.web_url.clone(),
            admin_user: self.sudo.clone(),
            user: self.user.clone(),
            group: self.group.clone(),
            timeout_secs: self.timeout,
        }
    }
}

/// Summary format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable counters.
    #[default]
    Text,
    /// The run report as one JSON object.
    Json,
}

/// Everything that can fail before a password is asked for: flag values,
/// the metadata file and its header.
pub fn prepare(cli: &Cli) -> Result<(ConnectionConfig, MetadataTable)> {
    let config = cli.config();
    config.validate()?;

    let table = load_metadata(&cli.md)
        .with_context(|| format!("Failed to read metadata file {}", cli.md.display()))?;
    table.validate()?;
    Ok((config, table))
}

/// Lines printed to stdout for one finished row.
pub fn notices(row: &RowReport) -> Vec<String> {
    match &row.outcome {
        RowOutcome::Moved {
            dataset,
            images,
            annotation,
            ..
        } => vec![
            format!("Moved images:{} to dataset:{}", id_list(images), dataset),
            format!(
                "Created annotation:{} and linked to images:{}",
                annotation,
                id_list(images)
            ),
        ],
        RowOutcome::NotFound => vec![format!(
            "Image with filename:{} not found in orphans",
            row.filename
        )],
        RowOutcome::Incomplete { missing } => vec![format!(
            "Skipped line:{}, blank column(s):{}",
            row.line,
            missing.join(", ")
        )],
    }
}

/// Closing summary in the chosen format.
pub fn summary(report: &RunReport, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => format!(
            "{} row(s): {} moved, {} not found, {} skipped; {} image(s) linked, \
             {} project(s) and {} dataset(s) created in {}ms",
            report.rows_total,
            report.moved,
            report.not_found,
            report.incomplete,
            report.images_linked,
            report.projects_created,
            report.datasets_created,
            report.duration_ms
        ),
        OutputFormat::Json => serde_json::to_string(report)?,
    })
}

fn id_list(images: &[ImageId]) -> String {
    let ids: Vec<String> = images.iter().map(ToString::to_string).collect();
    format!("[{}]", ids.join(", "))
}
