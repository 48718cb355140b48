//! TC filter support (u32 filters).
//!
//! Filters classify packets and route them to the appropriate classes. Address filters match a
//! packet's source or destination against a subnet; the redirect filter matches everything and
//! hands it to an IFB device.

use std::fmt::{self, Display};

use super::handle::TcHandle;
use crate::{command::Cmd, ip::Subnet};

/// Which address of a packet a filter looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchDirection {
    /// Match on the packet's source address ("what X sends to me").
    Source,
    /// Match on the packet's destination address ("what I send to X").
    Destination,
}

impl MatchDirection {
    /// The u32 selector keyword for this direction.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Source => "src",
            Self::Destination => "dst",
        }
    }
}

impl Display for MatchDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Builder for a u32 filter routing traffic of a subnet into a class.
///
/// # How Classification Works
///
/// 1. Packet enters the HTB root qdisc
/// 2. The u32 filter examines the source or destination address
/// 3. If it falls in the subnet → packet goes to the specified class (e.g. 1:12)
/// 4. If no filter matches → packet is sent unshaped
///
/// # Example
///
/// ```
/// use netem_rules::tc::filter::{AddressFilterRequest, MatchDirection};
/// use netem_rules::tc::handle::TcHandle;
///
/// let cmd = AddressFilterRequest::new(
///     "eth0",
///     "192.168.70.2/32".parse().unwrap(),
///     MatchDirection::Destination,
///     TcHandle::rule_class(0).unwrap(),
/// )
/// .build();
///
/// assert_eq!(
///     cmd.to_string(),
///     "tc filter add dev eth0 protocol ip parent 1: u32 match ip dst 192.168.70.2/32 flowid 1:10"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressFilterRequest {
    pub device: String,
    pub subnet: Subnet,
    pub direction: MatchDirection,
    /// The class to route matching traffic to.
    pub class_id: TcHandle,
}

impl AddressFilterRequest {
    pub fn new(
        device: impl Into<String>,
        subnet: Subnet,
        direction: MatchDirection,
        class_id: TcHandle,
    ) -> Self {
        Self { device: device.into(), subnet, direction, class_id }
    }

    pub fn build(&self) -> Cmd {
        // IPv6 headers need their own protocol and u32 selector.
        let (protocol, selector) = if self.subnet.is_ipv4() { ("ip", "ip") } else { ("ipv6", "ip6") };

        Cmd::new("tc")
            .args(["filter", "add", "dev", &self.device])
            .args(["protocol", protocol])
            .arg("parent")
            .arg(TcHandle::ROOT.to_string())
            .args(["u32", "match", selector, self.direction.keyword()])
            .arg(self.subnet.to_string())
            .arg("flowid")
            .arg(self.class_id.to_string())
    }
}

/// Builder for the catch-all u32 filter redirecting every packet received by a device to the
/// egress path of another device.
///
/// `match u32 0 0` matches all packets (a zero mask means "don't care"). The `mirred` action
/// redirects rather than copies, so the packet skips the normal ingress processing of the
/// physical device and re-enters the stack through the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectFilterRequest {
    pub device: String,
    pub target: String,
}

impl RedirectFilterRequest {
    pub fn new(device: impl Into<String>, target: impl Into<String>) -> Self {
        Self { device: device.into(), target: target.into() }
    }

    /// `tc filter add dev <device> parent ffff: protocol all u32 match u32 0 0 action mirred
    /// egress redirect dev <target>`
    pub fn build(&self) -> Cmd {
        Cmd::new("tc")
            .args(["filter", "add", "dev", &self.device])
            .arg("parent")
            .arg(TcHandle::INGRESS.to_string())
            .args(["protocol", "all", "u32", "match", "u32", "0", "0"])
            .args(["action", "mirred", "egress", "redirect", "dev", &self.target])
    }
}
