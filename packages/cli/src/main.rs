#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line access to the community permit pipeline.
//!
//! Lists the configured datasets and known communities, or runs the
//! pipeline for one community and prints the unified permit table as CSV
//! or JSON. Configuration comes from the same environment variables as
//! the server, with flags taking precedence.

use std::io::Write;

use clap::{Parser, Subcommand, ValueEnum};
use community_map_pipeline::Pipeline;
use community_map_pipeline::config::{LookbackWindow, PipelineConfig};
use community_map_server_models::{ApiDashboard, ApiPermit, ApiSource};

#[derive(Parser)]
#[command(name = "community_map", about = "Calgary community development permits")]
struct Cli {
    /// Socrata domain (overrides `SOCRATA_DOMAIN`)
    #[arg(long, global = true)]
    domain: Option<String>,
    /// Socrata app token (overrides `SOCRATA_APP_TOKEN`)
    #[arg(long, global = true)]
    app_token: Option<String>,
    /// Only include permits applied for in the last N days
    #[arg(long, global = true)]
    lookback_days: Option<u32>,
    /// Skip the land-use dataset
    #[arg(long, global = true)]
    no_land_use: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the configured permit datasets
    Sources,
    /// List every community name
    Communities,
    /// Print the unified permit table for a community
    Permits {
        /// Community name; unknown names fall back to the default
        #[arg(long)]
        community: Option<String>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

impl Cli {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(domain) = &self.domain {
            config.domain.clone_from(domain);
        }
        if let Some(token) = &self.app_token {
            config.app_token = Some(token.clone());
        }
        if let Some(days) = self.lookback_days {
            config.lookback = LookbackWindow::Rolling { days };
        }
        if self.no_land_use {
            config.include_land_use = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let mut config = PipelineConfig::from_env()?;
    cli.apply(&mut config);
    let pipeline = Pipeline::from_config(config);

    let mut out = std::io::stdout();

    match cli.command {
        Commands::Sources => {
            let domain = &pipeline.config().domain;
            let sources: Vec<ApiSource> = pipeline
                .datasets()
                .iter()
                .map(|dataset| ApiSource::new(dataset, domain))
                .collect();
            write_sources(&mut out, &sources)?;
        }
        Commands::Communities => {
            for community in pipeline.communities().await? {
                writeln!(out, "{}", community.name)?;
            }
        }
        Commands::Permits { community, format } => {
            let dashboard = ApiDashboard::from(pipeline.run(community.as_deref()).await?);
            if let Some(warning) = &dashboard.warning {
                log::warn!("{warning}");
            }
            log::info!(
                "{} permits for {}",
                dashboard.table.len(),
                dashboard.community
            );
            write_permits(&mut out, &dashboard.table, format)?;
        }
    }

    out.flush()?;
    Ok(())
}

fn write_sources(out: &mut impl Write, sources: &[ApiSource]) -> std::io::Result<()> {
    writeln!(out, "{:<22} {:<12} PORTAL", "SOURCE", "DATASET")?;
    writeln!(out, "{}", "-".repeat(72))?;
    for source in sources {
        writeln!(
            out,
            "{:<22} {:<12} {}",
            source.name, source.dataset_id, source.portal_url
        )?;
    }
    Ok(())
}

fn write_permits(
    out: &mut impl Write,
    permits: &[ApiPermit],
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            for permit in permits {
                writer.serialize(permit)?;
            }
            writer.flush()?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, permits)?;
            writeln!(out)?;
        }
    }
    Ok(())
}
