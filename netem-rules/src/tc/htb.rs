//! HTB (Hierarchical Token Bucket) qdisc and class support.
//!
//! HTB is the root classifier because it correctly handles non-work-conserving child qdiscs
//! (like netem): when netem holds a packet back, HTB moves on to the next class instead of
//! blocking the whole device.

use std::{
    fmt::{self, Display},
    num::NonZeroU32,
};

use super::handle::{RequestInner, TcHandle};
use crate::command::Cmd;

/// Default ceiling rate in Mbit/s.
pub const DEFAULT_RATE_MBIT: u32 = 1_000;

/// A nominal bandwidth ceiling, in megabits per second.
///
/// The ceiling is assigned to the root class and reused as the rate of every rule class. It is
/// never divided among the classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rate {
    mbit: NonZeroU32,
}

impl Rate {
    /// [`DEFAULT_RATE_MBIT`] Mbit/s.
    pub const DEFAULT: Self = match NonZeroU32::new(DEFAULT_RATE_MBIT) {
        Some(mbit) => Self { mbit },
        None => panic!("DEFAULT_RATE_MBIT must be positive"),
    };

    /// Returns `None` for a zero rate.
    pub fn from_mbit(mbit: u32) -> Option<Self> {
        NonZeroU32::new(mbit).map(|mbit| Self { mbit })
    }

    pub fn mbit(&self) -> u32 {
        self.mbit.get()
    }
}

impl Default for Rate {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Mbit", self.mbit)
    }
}

/// Builder for creating the HTB root qdisc of a device, with handle `1:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QdiscHtbRequest {
    pub device: String,
}

impl QdiscHtbRequest {
    pub fn new(device: impl Into<String>) -> Self {
        Self { device: device.into() }
    }

    /// `tc qdisc add dev <device> handle 1: root htb`
    pub fn build(&self) -> Cmd {
        Cmd::new("tc")
            .args(["qdisc", "add", "dev", &self.device])
            .args(["handle".to_string(), TcHandle::ROOT.to_string()])
            .args(["root", "htb"])
    }
}

/// Builder for creating an HTB class.
///
/// # Example
///
/// ```
/// use netem_rules::tc::handle::{RequestInner, TcHandle};
/// use netem_rules::tc::htb::{HtbClassRequest, Rate};
///
/// let cmd = HtbClassRequest::new(
///     RequestInner::new("eth0")
///         .with_parent(TcHandle::ROOT_CLASS)
///         .with_handle(TcHandle::rule_class(0).unwrap()),
///     Rate::from_mbit(100).unwrap(),
/// )
/// .build();
///
/// assert_eq!(cmd.to_string(), "tc class add dev eth0 parent 1:1 classid 1:10 htb rate 100Mbit");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtbClassRequest {
    pub inner: RequestInner,
    pub rate: Rate,
}

impl HtbClassRequest {
    pub fn new(inner: RequestInner, rate: Rate) -> Self {
        Self { inner, rate }
    }

    pub fn build(&self) -> Cmd {
        let mut cmd = Cmd::new("tc").args(["class", "add", "dev", &self.inner.device]);
        if let Some(parent) = self.inner.parent {
            cmd = cmd.arg("parent").arg(parent.to_string());
        }
        if let Some(handle) = self.inner.handle {
            cmd = cmd.arg("classid").arg(handle.to_string());
        }
        cmd.args(["htb", "rate"]).arg(self.rate.to_string())
    }
}
