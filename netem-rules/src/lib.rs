#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Per-address network impairment with Linux traffic control.
//!
//! Given a [`Topology`](topology::Topology) describing, per interface, which address ranges
//! should see which `netem` impairments in which direction, this crate issues the `tc`, `ip` and
//! `modprobe` commands building the matching HTB trees. Inbound traffic is impaired by
//! redirecting it through an IFB device.
//!
//! ```no_run
//! use netem_rules::{command::Runner, topology::Topology};
//!
//! let topology: Topology = r#"
//! [[interfaces.eth0.both]]
//! netem = "delay 30ms 10ms"
//! cidrs = ["192.168.70.2/32"]
//! "#
//! .parse()?;
//!
//! topology.plan()?.apply(&mut Runner::new().with_sudo(true))?;
//! # Ok::<(), netem_rules::Error>(())
//! ```

pub mod command;
pub mod direction;
mod error;
pub mod inspect;
pub mod ip;
pub mod tc;
pub mod teardown;
pub mod topology;
pub mod tree;

pub use error::{Error, Result};
