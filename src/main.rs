use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use segmented_store::{
    application::builder::ApplicationBuilder,
    config::LogFormat,
    dto::{IngestRequest, ReadPartRequest, ReadRecordRequest},
    entities::DataUnit,
    value_objects::ChannelName,
    Config,
};

#[derive(Parser)]
#[command(name = "segstore", version, about = "Indexed segmented stream store")]
struct Cli {
    /// TOML config file; unset fields come from the environment
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Overrides STORE_ROOT
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[arg(long = "type", global = true, default_value = "document")]
    type_name: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write files as the parts of a data unit, one segment per line
    Ingest {
        #[arg(long)]
        unit: u64,

        #[arg(long = "input", required = true)]
        inputs: Vec<PathBuf>,

        /// INDEX=FILE written to the Context channel at part INDEX
        #[arg(long = "context", value_parser = parse_indexed_file)]
        context: Vec<(u64, PathBuf)>,

        /// KEY=VALUE stored in the manifest
        #[arg(long = "attr", value_parser = parse_attribute)]
        attributes: Vec<(String, String)>,

        /// Store each file as a single segment
        #[arg(long)]
        no_segments: bool,
    },
    /// Print a part, or one segment of it, to stdout
    Cat {
        #[arg(long)]
        unit: u64,

        #[arg(long)]
        part: u64,

        #[arg(long, conflicts_with = "record")]
        segment: Option<u64>,

        /// Print one record framed by the part's header and footer segments
        #[arg(long)]
        record: Option<u64>,

        #[arg(long, default_value = ChannelName::DATA)]
        channel: ChannelName,
    },
    /// Print part and segment counts as JSON
    Info {
        #[arg(long)]
        unit: u64,

        #[arg(long = "channel")]
        channels: Vec<ChannelName>,
    },
}

fn parse_indexed_file(s: &str) -> Result<(u64, PathBuf), String> {
    let (index, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected INDEX=FILE, got '{}'", s))?;
    let index = index
        .parse()
        .map_err(|_| format!("invalid part index '{}'", index))?;
    Ok((index, PathBuf::from(path)))
}

fn parse_attribute(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    if key.is_empty() {
        return Err("attribute key cannot be empty".to_string());
    }
    Ok((key.to_string(), value.to_string()))
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout carries command output
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::from_env(),
    };
    if let Some(root) = &cli.root {
        config.store_root = root.clone();
    }
    config.validate().map_err(anyhow::Error::msg)?;

    init_tracing(config.log_format);
    info!(root = ?config.store_root, "Configuration loaded and validated");

    let services = ApplicationBuilder::new(config)
        .with_local_storage()
        .context("Failed to initialize storage")?
        .build()?;

    match cli.command {
        Command::Ingest {
            unit,
            inputs,
            context,
            attributes,
            no_segments,
        } => {
            let mut request = IngestRequest::new(DataUnit::new(unit, cli.type_name.as_str()));
            for input in &inputs {
                let payload = std::fs::read(input)
                    .with_context(|| format!("Failed to read {}", input.display()))?;
                request.parts.push(payload);
            }
            for (index, path) in &context {
                let payload = std::fs::read(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                request.context.insert(*index, payload);
            }
            for (key, value) in attributes {
                request.attributes.insert(key, value);
            }
            if no_segments {
                request.segment_delimiter = None;
            }

            let summary = services
                .ingest
                .execute(request)
                .with_context(|| format!("Failed to ingest unit {}", unit))?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Cat {
            unit,
            part,
            segment,
            record,
            channel,
        } => {
            let data_unit = DataUnit::new(unit, cli.type_name.as_str());
            let bytes = match record {
                Some(record) => {
                    let request = ReadRecordRequest {
                        unit: data_unit,
                        channel,
                        part,
                        record,
                    };
                    let page = services.step_record.execute(&request).with_context(|| {
                        format!("Failed to read record {} of part {} of unit {}", record, part, unit)
                    })?;
                    info!(
                        record = page.record,
                        records = page.record_total,
                        "Record page"
                    );
                    page.bytes
                }
                None => {
                    let request = ReadPartRequest {
                        unit: data_unit,
                        channel,
                        part,
                        segment,
                    };
                    services
                        .read_part
                        .execute(&request)
                        .with_context(|| format!("Failed to read part {} of unit {}", part, unit))?
                }
            };
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
        }
        Command::Info { unit, channels } => {
            let info = services
                .describe
                .execute(&DataUnit::new(unit, cli.type_name.as_str()), &channels)
                .with_context(|| format!("Failed to describe unit {}", unit))?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
    }

    Ok(())
}
