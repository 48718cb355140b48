//! Command line arguments.

use std::path::PathBuf;

use clap::{ArgGroup, Parser, ValueEnum};

/// Apply per-address netem impairments to network interfaces.
#[derive(Parser, Debug)]
#[command(name = "netem-rules", author, version, about)]
#[command(group(ArgGroup::new("target").required(true).multiple(true).args(["config", "interface"])))]
pub(crate) struct Cli {
    /// Topology file (TOML)
    #[arg(short, long)]
    pub(crate) config: Option<PathBuf>,

    /// Interface to clear or show. With a topology file, only these interfaces are configured
    #[arg(short, long = "interface", value_name = "INTERFACE")]
    pub(crate) interface: Vec<String>,

    /// Only remove existing impairments
    #[arg(long)]
    pub(crate) clear: bool,

    /// Print the qdiscs, classes and filters of each interface when done
    #[arg(long)]
    pub(crate) show: bool,

    /// Print the commands instead of running them
    #[arg(long)]
    pub(crate) dry_run: bool,

    /// Run every command through sudo
    #[arg(long)]
    pub(crate) sudo: bool,

    /// Log level for console output, overridden by RUST_LOG
    #[arg(short, long, value_enum, default_value_t = LogLevel::Info)]
    pub(crate) log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogLevel {
    Critical,
    Error,
    Warning,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// The equivalent `tracing` filter directive.
    pub(crate) const fn directive(self) -> &'static str {
        match self {
            Self::Critical | Self::Error => "error",
            Self::Warning => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}
