mod args;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use beatflow_core::capture::CaptureRange;
use beatflow_core::classify::Rule;
use beatflow_core::config::PipelineConfig;
use beatflow_core::session::{FilterSession, InspectSession};
use beatflow_core::telemetry::TelemetrySnapshot;

use args::{BeatWidth, Cli, Command, FilterArgs, InspectArgs, PipelineArgs};

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &PipelineArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Cannot read config {:?}", path))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Invalid config {:?}", path))?
        }
        None => PipelineConfig::default(),
    };

    if args.start.is_some() || args.end.is_some() {
        let range = CaptureRange::new(
            args.start.unwrap_or(config.range.start),
            args.end.unwrap_or(config.range.end),
        );
        config = config.with_range(range);
    }
    if let Some(depth) = args.depth {
        config.stream_depth = depth;
    }
    if args.tick_budget.is_some() {
        config.tick_budget = args.tick_budget;
    }

    config.validate().context("Invalid pipeline config")?;
    Ok(config)
}

fn load_rules(path: &Path) -> Result<Vec<Rule>> {
    let text = fs::read_to_string(path).with_context(|| format!("Cannot read rules {:?}", path))?;
    let rules: Vec<Rule> =
        serde_json::from_str(&text).with_context(|| format!("Invalid rules file {:?}", path))?;
    info!(count = rules.len(), "rules loaded");
    Ok(rules)
}

fn filter_with<const W: usize>(args: &FilterArgs, config: PipelineConfig, rules: Vec<Rule>) -> Result<TelemetrySnapshot> {
    FilterSession::<W>::new(config)
        .with_rules(rules)
        .run_files(&args.input, &args.output)
        .with_context(|| format!("Filtering {:?} into {:?} failed", args.input, args.output))
}

fn filter(args: FilterArgs) -> Result<()> {
    let mut config = load_config(&args.pipeline)?;
    if args.default_drop {
        config.default_drop = true;
    }
    let rules = match &args.rules {
        Some(path) => load_rules(path)?,
        None => Vec::new(),
    };

    info!("Filtering {:?} -> {:?}", args.input, args.output);
    let snapshot = match args.pipeline.beat_width {
        BeatWidth::W16 => filter_with::<16>(&args, config, rules)?,
        BeatWidth::W32 => filter_with::<32>(&args, config, rules)?,
        BeatWidth::W64 => filter_with::<64>(&args, config, rules)?,
    };
    info!("{}", snapshot.summary());

    if args.report {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }
    Ok(())
}

fn inspect_with<const W: usize>(args: &InspectArgs, config: PipelineConfig) -> Result<TelemetrySnapshot> {
    InspectSession::<W>::new(config)
        .run_file(&args.input, |ordinal, metadata| {
            let line = json!({
                "ordinal": ordinal,
                "ether_type": format!("{:#06x}", metadata.ether_type),
                "ip_protocol": metadata.ip_protocol,
                "ip_source": metadata.ip_source_addr().to_string(),
                "ip_dest": metadata.ip_dest_addr().to_string(),
                "udp_source": metadata.udp_source,
                "udp_dest": metadata.udp_dest,
                "valid_ip": metadata.valid_ip(),
                "valid_udp": metadata.valid_udp(),
            });
            println!("{line}");
        })
        .with_context(|| format!("Inspecting {:?} failed", args.input))
}

fn inspect(args: InspectArgs) -> Result<()> {
    let config = load_config(&args.pipeline)?;
    let snapshot = match args.pipeline.beat_width {
        BeatWidth::W16 => inspect_with::<16>(&args, config)?,
        BeatWidth::W32 => inspect_with::<32>(&args, config)?,
        BeatWidth::W64 => inspect_with::<64>(&args, config)?,
    };
    info!("{}", snapshot.summary());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Filter(args) => filter(args),
        Command::Inspect(args) => inspect(args),
    }
}
