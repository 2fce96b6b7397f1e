use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(author, version, about = "Stream pcap packets through a beat-level encoder, header parser and firewall.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify every packet and write the forwarded ones to a new capture
    Filter(FilterArgs),
    /// Print the parsed header metadata of every packet as JSON lines
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
pub struct FilterArgs {
    /// Input legacy .pcap file
    pub input: PathBuf,

    /// Output .pcap file
    pub output: PathBuf,

    /// JSON array of rules: {ip_source, ip_dest, udp_source, udp_dest, drop}
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// Drop packets that match no rule
    #[arg(long, default_value_t = false)]
    pub default_drop: bool,

    /// Print the session telemetry as JSON to stdout
    #[arg(long, default_value_t = false)]
    pub report: bool,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Input legacy .pcap file
    pub input: PathBuf,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

/// Flags shared by every subcommand that runs a pipeline.
#[derive(Args, Debug)]
pub struct PipelineArgs {
    /// JSON pipeline config; flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// First packet ordinal to process
    #[arg(long)]
    pub start: Option<u64>,

    /// Ordinal one past the last packet to process
    #[arg(long)]
    pub end: Option<u64>,

    /// Capacity of each inter-stage stream
    #[arg(long)]
    pub depth: Option<usize>,

    /// Abort if the pipeline has not drained after this many ticks
    #[arg(long)]
    pub tick_budget: Option<u64>,

    /// Bytes per beat
    #[arg(long, value_enum, default_value_t = BeatWidth::W32)]
    pub beat_width: BeatWidth,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BeatWidth {
    #[value(name = "16")]
    W16,
    #[value(name = "32")]
    W32,
    #[value(name = "64")]
    W64,
}
