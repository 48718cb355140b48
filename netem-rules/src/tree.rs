//! The HTB shaping tree of a single device.
//!
//! A [`ShapingTree`] is the in-memory model of what this process has built on a device: the
//! root qdisc and ceiling class, plus one class per [`ImpairmentRule`], each carrying a netem
//! qdisc and one u32 filter per address range. The authoritative state lives in the kernel; the
//! tree only tracks what is needed to allocate identifiers and to avoid building the root twice.

use crate::{
    command::Executor,
    error::{CommandResultExt as _, Error, Result},
    ip::Subnet,
    tc::{
        filter::{AddressFilterRequest, MatchDirection},
        handle::{RequestInner, TcHandle},
        htb::{HtbClassRequest, QdiscHtbRequest, Rate},
        netem::{NetemArgs, QdiscNetemRequest},
    },
};

/// A set of netem arguments applied to the traffic of one or more subnets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpairmentRule {
    pub netem: NetemArgs,
    ranges: Vec<Subnet>,
    pub direction: MatchDirection,
}

impl ImpairmentRule {
    /// Fails if `ranges` is empty: a rule must match something.
    pub fn new(netem: NetemArgs, ranges: Vec<Subnet>, direction: MatchDirection) -> Result<Self> {
        if ranges.is_empty() {
            return Err(Error::InvalidTopology(format!("rule `{netem}` has no address ranges")));
        }
        Ok(Self { netem, ranges, direction })
    }

    pub fn ranges(&self) -> &[Subnet] {
        &self.ranges
    }
}

/// The HTB tree attached to one device.
///
/// Invariants:
/// - the root qdisc and ceiling class are created at most once per tree;
/// - every rule class is created after them;
/// - rule classes are allocated `1:10`, `1:11`, ... in creation order and never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapingTree {
    device: String,
    rate: Rate,
    classes: Vec<TcHandle>,
    created: bool,
}

impl ShapingTree {
    /// Creates the model of a tree on `device`. No command is issued.
    pub fn new(device: impl Into<String>, rate: Rate) -> Self {
        Self { device: device.into(), rate, classes: Vec::new(), created: false }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn rate(&self) -> Rate {
        self.rate
    }

    /// The ceiling class every rule class hangs from.
    pub fn root_class(&self) -> TcHandle {
        TcHandle::ROOT_CLASS
    }

    /// The rule classes allocated so far, in creation order.
    pub fn classes(&self) -> &[TcHandle] {
        &self.classes
    }

    /// Whether the root qdisc and ceiling class have been created.
    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Creates the HTB root qdisc and the ceiling class, unless already done.
    pub fn ensure_root<E: Executor>(&mut self, exec: &mut E) -> Result<()> {
        if self.created {
            return Ok(());
        }

        tracing::debug!(device = %self.device, rate = %self.rate, "creating htb root");

        let qdisc = QdiscHtbRequest::new(&self.device).build();
        exec.execute(&qdisc).for_command(&qdisc)?;

        let class = HtbClassRequest::new(
            RequestInner::new(&self.device).with_parent(TcHandle::ROOT).with_handle(self.root_class()),
            self.rate,
        )
        .build();
        exec.execute(&class).for_command(&class)?;

        self.created = true;
        Ok(())
    }

    /// Adds a rule to the tree: a new class, its netem qdisc, and one filter per address range.
    ///
    /// Returns the handle of the new class. A failing command aborts the remaining steps; what
    /// was already applied stays in place.
    pub fn add_rule<E: Executor>(&mut self, exec: &mut E, rule: &ImpairmentRule) -> Result<TcHandle> {
        self.ensure_root(exec)?;

        let class_id = TcHandle::rule_class(self.classes.len())
            .ok_or_else(|| Error::TooManyRules(self.device.clone()))?;
        self.classes.push(class_id);

        let _span = tracing::debug_span!("add_rule", device = %self.device, class = %class_id)
            .entered();
        tracing::debug!(netem = %rule.netem, ranges = rule.ranges.len(), direction = %rule.direction, "adding rule");

        let class = HtbClassRequest::new(
            RequestInner::new(&self.device).with_parent(self.root_class()).with_handle(class_id),
            self.rate,
        )
        .build();
        exec.execute(&class).for_command(&class)?;

        let netem = QdiscNetemRequest::new(&self.device, class_id, rule.netem.clone()).build();
        exec.execute(&netem).for_command(&netem)?;

        for subnet in &rule.ranges {
            let filter =
                AddressFilterRequest::new(&self.device, *subnet, rule.direction, class_id).build();
            exec.execute(&filter).for_command(&filter)?;
        }

        Ok(class_id)
    }
}
