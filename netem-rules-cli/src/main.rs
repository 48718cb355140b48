//! `netem-rules`: apply, clear and inspect per-address netem impairments.

use std::process::ExitCode;

use clap::Parser as _;
use netem_rules::command::{Recorder, Runner};
use tracing_subscriber::EnvFilter;

mod cli;
mod run;

use cli::Cli;
use run::run;

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.directive())),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = if cli.dry_run {
        run(&cli, &mut Recorder::new().with_echo(true))
    } else {
        run(&cli, &mut Runner::new().with_sudo(cli.sudo))
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
