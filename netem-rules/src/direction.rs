//! Attaching a [`ShapingTree`] to a device, for outbound or inbound traffic.

use crate::{
    command::Executor,
    error::{CommandResultExt as _, Result},
    ip::Subnet,
    tc::{
        filter::{MatchDirection, RedirectFilterRequest},
        handle::TcHandle,
        htb::Rate,
        ifb::{self, DEFAULT_IFB_DEVICE, LoadIfbRequest},
        netem::NetemArgs,
        qdisc::QdiscIngressRequest,
    },
    tree::{ImpairmentRule, ShapingTree},
};

/// Impairs traffic a device sends, matching on the destination address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Egress {
    tree: ShapingTree,
}

impl Egress {
    /// No command is issued until the first impairment is added.
    pub fn new(device: impl Into<String>, rate: Rate) -> Self {
        Self { tree: ShapingTree::new(device, rate) }
    }

    pub fn add_impairment<E: Executor>(
        &mut self,
        exec: &mut E,
        netem: NetemArgs,
        ranges: Vec<Subnet>,
    ) -> Result<TcHandle> {
        let rule = ImpairmentRule::new(netem, ranges, MatchDirection::Destination)?;
        self.tree.add_rule(exec, &rule)
    }

    pub fn tree(&self) -> &ShapingTree {
        &self.tree
    }
}

/// The IFB device receiving the traffic redirected from a physical device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectDevice {
    pub physical: String,
    pub virtual_device: String,
    /// Number of IFB devices to request when loading the driver, `None` for its default.
    pub numifbs: Option<usize>,
}

impl RedirectDevice {
    /// Redirects `physical` to the default IFB device.
    ///
    /// The default device is shared host-wide: two physical devices redirected to it would
    /// interfere. Use [`RedirectDevice::with_virtual_device`] to pick a distinct device for each.
    pub fn new(physical: impl Into<String>) -> Self {
        Self { physical: physical.into(), virtual_device: DEFAULT_IFB_DEVICE.to_string(), numifbs: None }
    }

    pub fn with_virtual_device(mut self, name: impl Into<String>) -> Self {
        self.virtual_device = name.into();
        self
    }

    pub fn with_numifbs(mut self, numifbs: Option<usize>) -> Self {
        self.numifbs = numifbs;
        self
    }

    /// Loads the IFB driver, brings the virtual device up, and redirects everything the physical
    /// device receives to it.
    pub fn establish<E: Executor>(&self, exec: &mut E) -> Result<()> {
        tracing::debug!(physical = %self.physical, virtual_device = %self.virtual_device, "establishing redirect");

        let cmds = [
            LoadIfbRequest::new().with_numifbs(self.numifbs).build(),
            ifb::link_up(&self.virtual_device),
            QdiscIngressRequest::new(&self.physical).build(),
            RedirectFilterRequest::new(&self.physical, &self.virtual_device).build(),
        ];

        for cmd in &cmds {
            exec.execute(cmd).for_command(cmd)?;
        }

        Ok(())
    }
}

/// Impairs traffic a device receives, matching on the source address.
///
/// The kernel can only shape traffic leaving a device, so inbound packets are redirected to the
/// egress path of an IFB device and the tree is built there. The packets still carry their
/// original source address, which is what the filters match on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingress {
    redirect: RedirectDevice,
    tree: ShapingTree,
}

impl Ingress {
    /// Establishes the redirect path immediately; the tree on the IFB device is built with the
    /// first impairment.
    pub fn new<E: Executor>(exec: &mut E, redirect: RedirectDevice, rate: Rate) -> Result<Self> {
        redirect.establish(exec)?;
        let tree = ShapingTree::new(redirect.virtual_device.clone(), rate);
        Ok(Self { redirect, tree })
    }

    pub fn add_impairment<E: Executor>(
        &mut self,
        exec: &mut E,
        netem: NetemArgs,
        ranges: Vec<Subnet>,
    ) -> Result<TcHandle> {
        let rule = ImpairmentRule::new(netem, ranges, MatchDirection::Source)?;
        self.tree.add_rule(exec, &rule)
    }

    pub fn redirect(&self) -> &RedirectDevice {
        &self.redirect
    }

    pub fn tree(&self) -> &ShapingTree {
        &self.tree
    }
}
