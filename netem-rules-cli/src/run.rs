//! The apply, clear and show flow behind the command line.

use netem_rules::{
    Error, Result,
    command::Executor,
    inspect::inspect,
    teardown::clear_all,
    topology::Topology,
};

use crate::cli::Cli;

/// Carries out the command line on `exec`.
pub(crate) fn run<E: Executor>(cli: &Cli, exec: &mut E) -> Result<()> {
    let interfaces = match &cli.config {
        Some(path) => {
            let mut topology = Topology::load(path)?;
            if !cli.interface.is_empty() {
                topology.retain_interfaces(&cli.interface)?;
            }
            let plan = topology.plan()?;

            if cli.clear {
                plan.clear(exec);
            } else {
                let applied = plan.apply(exec)?;
                for interface in &applied.interfaces {
                    let outbound = interface.egress.as_ref().map_or(0, |e| e.tree().classes().len());
                    let inbound = interface.ingress.as_ref().map_or(0, |i| i.tree().classes().len());
                    tracing::info!(interface = %interface.name, outbound, inbound, "interface configured");
                }
            }

            plan.interfaces.into_iter().map(|interface| interface.name).collect()
        }
        None => {
            if !(cli.clear || cli.show) {
                return Err(Error::Config(
                    "a topology file is required to configure interfaces".to_string(),
                ));
            }
            if cli.clear {
                for interface in &cli.interface {
                    tracing::info!(%interface, "clearing interface");
                    clear_all(exec, interface);
                }
            }
            cli.interface.clone()
        }
    };

    if cli.show {
        for interface in &interfaces {
            let state = inspect(exec, interface)?;
            println!("== {interface}");
            print!("{}{}{}", state.qdiscs, state.classes, state.filters);
        }
    }

    Ok(())
}
