//! Qdisc requests that are not tied to a classful discipline: the ingress qdisc, deletions and
//! state queries.

use std::fmt::{self, Display};

use super::handle::TcHandle;
use crate::command::Cmd;

/// The two attachment points a device exposes for qdiscs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QdiscParent {
    /// The egress root.
    Root,
    /// The ingress hook.
    Ingress,
}

impl Display for QdiscParent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => f.write_str("root"),
            Self::Ingress => f.write_str("ingress"),
        }
    }
}

/// Builder for the ingress qdisc of a device, with handle `ffff:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QdiscIngressRequest {
    pub device: String,
}

impl QdiscIngressRequest {
    pub fn new(device: impl Into<String>) -> Self {
        Self { device: device.into() }
    }

    /// `tc qdisc add dev <device> handle ffff: ingress`
    pub fn build(&self) -> Cmd {
        Cmd::new("tc")
            .args(["qdisc", "add", "dev", &self.device])
            .arg("handle")
            .arg(TcHandle::INGRESS.to_string())
            .arg("ingress")
    }
}

/// `tc qdisc del dev <device> root|ingress`
///
/// Deleting a qdisc removes every class, filter and child qdisc below it.
pub fn delete_qdisc(device: &str, parent: QdiscParent) -> Cmd {
    Cmd::new("tc").args(["qdisc", "del", "dev", device]).arg(parent.to_string())
}

/// The kinds of traffic control objects that can be listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TcObject {
    Qdisc,
    Class,
    Filter,
}

impl TcObject {
    pub const ALL: [Self; 3] = [Self::Qdisc, Self::Class, Self::Filter];
}

impl Display for TcObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Qdisc => f.write_str("qdisc"),
            Self::Class => f.write_str("class"),
            Self::Filter => f.write_str("filter"),
        }
    }
}

/// `tc <object> show dev <device>`
pub fn show(object: TcObject, device: &str) -> Cmd {
    Cmd::new("tc").arg(object.to_string()).args(["show", "dev", device])
}
