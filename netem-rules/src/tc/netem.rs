//! Netem (Network Emulator) qdisc support.
//!
//! Netem provides latency, jitter, packet loss, duplication and reordering. Its arguments are
//! opaque here: they are handed to `tc` exactly as configured, and `tc` validates them.

use std::{
    fmt::{self, Display},
    str::FromStr,
};

use super::handle::TcHandle;
use crate::command::Cmd;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("empty netem arguments")]
pub struct EmptyNetemArgs;

/// The ordered tokens following `netem` on the `tc` command line, e.g. `delay 30ms 10ms`.
///
/// Always contains at least one token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NetemArgs(Vec<String>);

impl NetemArgs {
    pub fn new<I, S>(tokens: I) -> Result<Self, EmptyNetemArgs>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        if tokens.is_empty() {
            return Err(EmptyNetemArgs);
        }
        Ok(Self(tokens))
    }

    pub fn tokens(&self) -> &[String] {
        &self.0
    }
}

impl FromStr for NetemArgs {
    type Err = EmptyNetemArgs;

    /// Splits the arguments on whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.split_ascii_whitespace())
    }
}

impl Display for NetemArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

/// Builder for attaching a netem qdisc to an HTB class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QdiscNetemRequest {
    pub device: String,
    /// The class the netem qdisc is attached to.
    pub parent: TcHandle,
    pub args: NetemArgs,
}

impl QdiscNetemRequest {
    pub fn new(device: impl Into<String>, parent: TcHandle, args: NetemArgs) -> Self {
        Self { device: device.into(), parent, args }
    }

    /// `tc qdisc add dev <device> parent <class> netem <args...>`
    pub fn build(&self) -> Cmd {
        Cmd::new("tc")
            .args(["qdisc", "add", "dev", &self.device])
            .arg("parent")
            .arg(self.parent.to_string())
            .arg("netem")
            .args(self.args.tokens().iter().cloned())
    }
}
