//! TC handle computation and common request infrastructure.
//!
//! TC handles are split into major:minor halves. This module provides the handles used by the
//! shaping tree and the addressing shared by every request.

use std::fmt::{self, Display};

/// Major number of the HTB root qdisc (`1:`).
pub const ROOT_MAJOR: u16 = 1;

/// Minor number of the ceiling class every rule class hangs from (`1:1`).
pub const ROOT_CLASS_MINOR: u16 = 1;

/// Major number of the ingress qdisc (`ffff:`). Reserved by the kernel for ingress, so it can
/// coexist with the root qdisc on the same device.
pub const INGRESS_MAJOR: u16 = 0xffff;

/// The offset added to the rule index to compute class minor numbers.
///
/// For the `n`-th rule of a tree, the class minor is `ID_OFFSET + n`. This keeps the low minors
/// free for the root and its ceiling class.
pub const ID_OFFSET: u16 = 10;

/// Largest class minor handed out. Its decimal digits, read back as hexadecimal by `tc`, must
/// still fit in 16 bits.
pub const MAX_RULE_MINOR: u16 = 9999;

/// A traffic control handle.
///
/// The major number is rendered in hexadecimal, as `tc` expects. Minor numbers are rendered as
/// their decimal digits: `tc` reads them back as hexadecimal, so class `1:10` is minor `0x10` to
/// the kernel. Distinct minors still render to distinct handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TcHandle {
    pub major: u16,
    /// `None` for qdisc handles, which are written as `major:`.
    pub minor: Option<u16>,
}

impl TcHandle {
    /// The HTB root qdisc handle, `1:`.
    pub const ROOT: Self = Self::qdisc(ROOT_MAJOR);

    /// The ceiling class handle, `1:1`.
    pub const ROOT_CLASS: Self = Self::class(ROOT_MAJOR, ROOT_CLASS_MINOR);

    /// The ingress qdisc handle, `ffff:`.
    pub const INGRESS: Self = Self::qdisc(INGRESS_MAJOR);

    pub const fn qdisc(major: u16) -> Self {
        Self { major, minor: None }
    }

    pub const fn class(major: u16, minor: u16) -> Self {
        Self { major, minor: Some(minor) }
    }

    /// Compute the class handle of the `index`-th rule of a tree.
    ///
    /// Returns `None` once the minor number space is exhausted.
    ///
    /// # Example
    ///
    /// ```
    /// use netem_rules::tc::handle::TcHandle;
    /// assert_eq!(TcHandle::rule_class(2).unwrap().to_string(), "1:12");
    /// ```
    pub fn rule_class(index: usize) -> Option<Self> {
        let minor = u16::try_from(index).ok()?.checked_add(ID_OFFSET)?;
        (minor <= MAX_RULE_MINOR).then_some(Self::class(ROOT_MAJOR, minor))
    }
}

impl Display for TcHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.minor {
            Some(minor) => write!(f, "{:x}:{}", self.major, minor),
            None => write!(f, "{:x}:", self.major),
        }
    }
}

/// Common fields shared by qdisc and class requests.
///
/// This struct captures the addressing information needed to target a specific qdisc or class
/// in the traffic control hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInner {
    /// The network device name.
    pub device: String,
    /// Where this qdisc/class attaches. `None` means the device root.
    pub parent: Option<TcHandle>,
    /// This qdisc/class's own handle, if any.
    pub handle: Option<TcHandle>,
}

impl RequestInner {
    /// Create a new request for the given device, defaulting to the root parent.
    pub fn new(device: impl Into<String>) -> Self {
        Self { device: device.into(), parent: None, handle: None }
    }

    pub fn with_parent(mut self, parent: TcHandle) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_handle(mut self, handle: TcHandle) -> Self {
        self.handle = Some(handle);
        self
    }
}
