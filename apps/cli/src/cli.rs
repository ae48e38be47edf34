use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// Wait for eventually-consistent systems to settle
#[derive(Debug, Parser)]
#[command(name = "settle", version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/settle/settle.toml)
    #[arg(long, global = true, env = "SETTLE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print a JSON summary on stdout
    #[arg(long, global = true)]
    pub json: bool,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Poll an HTTP endpoint until it answers as expected
    Http(HttpArgs),
    /// Poll a command until it exits successfully
    Exec(ExecArgs),
    /// Measure availability of an HTTP endpoint over a period
    Probe(ProbeArgs),
    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Overrides for the configured poll policy
#[derive(Debug, Clone, Copy, Args)]
pub struct PollArgs {
    /// Sleep between attempts, e.g. `500ms`
    #[arg(long, value_parser = parse_duration)]
    pub interval: Option<Duration>,

    /// Total budget, e.g. `30s`
    #[arg(long, value_parser = parse_duration)]
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Args)]
pub struct HttpArgs {
    /// URL to GET
    pub url: String,

    /// Expected response status
    #[arg(long, default_value_t = 200)]
    pub status: u16,

    /// Text the response body must contain
    #[arg(long)]
    pub contains: Option<String>,

    #[command(flatten)]
    pub poll: PollArgs,
}

#[derive(Debug, Clone, Args)]
pub struct ExecArgs {
    #[command(flatten)]
    pub poll: PollArgs,

    /// Longest a single run may take before it is killed (default from config)
    #[arg(long, value_parser = parse_duration)]
    pub attempt_timeout: Option<Duration>,

    /// Program and arguments
    #[arg(required = true, last = true, num_args = 1..)]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct ProbeArgs {
    /// URL to GET
    pub url: String,

    /// How long to probe, e.g. `1m`
    #[arg(long, value_parser = parse_duration)]
    pub duration: Duration,

    /// Probes per second (default from config)
    #[arg(long)]
    pub rate: Option<u32>,

    /// Status counted as available
    #[arg(long, default_value_t = 200)]
    pub status: u16,

    /// Minimum success ratio in percent
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u32).range(0..=100))]
    pub min_success: u32,
}

fn parse_duration(raw: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(raw).map_err(|e| e.to_string())
}
