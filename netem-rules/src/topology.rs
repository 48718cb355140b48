//! Declarative impairment topologies and their application.
//!
//! A [`Topology`] is what the user writes: per interface, lists of rules for outbound (`out`),
//! inbound (`in`) and both (`both`) directions. [`Topology::plan`] validates the whole of it
//! and produces a [`Plan`], which can then be applied or cleared.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
    str::FromStr,
};

use serde::Deserialize;

use crate::{
    command::Executor,
    direction::{Egress, Ingress, RedirectDevice},
    error::{Error, Result},
    ip::Subnet,
    tc::{
        htb::{DEFAULT_RATE_MBIT, Rate},
        ifb::{ifb_device_index, ifb_device_name},
        netem::NetemArgs,
    },
    teardown::{TeardownReport, clear_all},
};

/// Maximum length of a network device name (`IFNAMSIZ` minus the trailing NUL).
const MAX_DEVICE_NAME_LEN: usize = 15;

const fn default_rate() -> u32 {
    DEFAULT_RATE_MBIT
}

/// Main topology structure.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Topology {
    /// Ceiling rate in Mbit/s for interfaces that don't set their own.
    #[serde(default = "default_rate")]
    pub rate: u32,

    /// Interfaces to configure, by name.
    #[serde(default)]
    pub interfaces: BTreeMap<String, InterfaceConfig>,
}

impl Default for Topology {
    fn default() -> Self {
        Self { rate: DEFAULT_RATE_MBIT, interfaces: BTreeMap::new() }
    }
}

/// The rules of one interface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InterfaceConfig {
    /// Ceiling rate override in Mbit/s.
    #[serde(default)]
    pub rate: Option<u32>,

    /// IFB device used for inbound rules. Allocated automatically when unset.
    #[serde(default)]
    pub ifb: Option<String>,

    /// Rules for traffic sent to the listed ranges.
    #[serde(default)]
    pub out: Vec<RuleConfig>,

    /// Rules for traffic received from the listed ranges.
    #[serde(default, rename = "in")]
    pub inbound: Vec<RuleConfig>,

    /// Rules applied in both directions.
    #[serde(default)]
    pub both: Vec<RuleConfig>,
}

impl InterfaceConfig {
    /// Outbound rules, followed by the rules shared with the inbound direction.
    pub fn outbound_rules(&self) -> impl Iterator<Item = &RuleConfig> {
        self.out.iter().chain(&self.both)
    }

    /// Inbound rules, followed by the rules shared with the outbound direction.
    pub fn inbound_rules(&self) -> impl Iterator<Item = &RuleConfig> {
        self.inbound.iter().chain(&self.both)
    }
}

/// One rule as written in the topology file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    /// Netem arguments, e.g. `delay 30ms 10ms`.
    pub netem: String,
    /// Address ranges the rule applies to.
    pub cidrs: Vec<String>,
}

impl RuleConfig {
    fn resolve(&self, interface: &str) -> Result<Impairment> {
        let netem: NetemArgs = self.netem.parse().map_err(|_| {
            Error::InvalidTopology(format!("{interface}: rule has empty netem arguments"))
        })?;

        if self.cidrs.is_empty() {
            return Err(Error::InvalidTopology(format!(
                "{interface}: rule `{netem}` has no address ranges"
            )));
        }

        let ranges = self
            .cidrs
            .iter()
            .map(|cidr| {
                cidr.parse::<Subnet>()
                    .map_err(|source| Error::InvalidCidr { cidr: cidr.clone(), source })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Impairment { netem, ranges })
    }
}

impl FromStr for Topology {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| Error::Config(format!("failed to parse topology: {e}")))
    }
}

impl Topology {
    /// Load a topology from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.as_ref().display()))
        })?;
        content.parse()
    }

    /// Keep only the named interfaces. Fails if one of them is not in the topology.
    pub fn retain_interfaces(&mut self, names: &[String]) -> Result<()> {
        if let Some(missing) = names.iter().find(|name| !self.interfaces.contains_key(*name)) {
            return Err(Error::InvalidTopology(format!("interface {missing} is not configured")));
        }
        self.interfaces.retain(|name, _| names.contains(name));
        Ok(())
    }

    /// Validate the whole topology and resolve it into a [`Plan`].
    ///
    /// Every interface with inbound rules gets an IFB device: its explicit `ifb<N>` if set,
    /// otherwise the lowest index no other interface uses. When any device beyond `ifb0` is
    /// used, the driver is loaded with enough devices to include the highest one.
    pub fn plan(&self) -> Result<Plan> {
        if self.interfaces.is_empty() {
            return Err(Error::InvalidTopology("no interfaces configured".to_string()));
        }

        let ifbs = self.allocate_ifbs()?;
        let required = ifbs.values().max().map_or(0, |max| max + 1);
        let numifbs = (required > 1).then_some(required);

        let mut interfaces = Vec::with_capacity(self.interfaces.len());

        for (name, config) in &self.interfaces {
            if name.is_empty() || name.len() > MAX_DEVICE_NAME_LEN {
                return Err(Error::InvalidTopology(format!("invalid interface name `{name}`")));
            }

            let mbit = config.rate.unwrap_or(self.rate);
            let rate = Rate::from_mbit(mbit)
                .ok_or_else(|| Error::InvalidTopology(format!("{name}: rate must be positive")))?;

            let outbound =
                config.outbound_rules().map(|rule| rule.resolve(name)).collect::<Result<Vec<_>>>()?;
            let inbound =
                config.inbound_rules().map(|rule| rule.resolve(name)).collect::<Result<Vec<_>>>()?;

            let redirect = ifbs.get(name.as_str()).map(|&index| {
                RedirectDevice::new(name.clone())
                    .with_virtual_device(ifb_device_name(index))
                    .with_numifbs(numifbs)
            });
            if redirect.is_none() && config.ifb.is_some() {
                tracing::warn!(interface = %name, "ifb set without inbound rules, ignoring");
            }

            interfaces.push(InterfacePlan { name: name.clone(), rate, outbound, inbound, redirect });
        }

        Ok(Plan { interfaces })
    }

    /// Assigns an IFB device index to every interface with inbound rules.
    ///
    /// Explicit `ifb` choices are reserved first and must be named `ifb<N>`. The remaining
    /// interfaces get the lowest free indices, in interface name order.
    fn allocate_ifbs(&self) -> Result<BTreeMap<&str, usize>> {
        let inbound: Vec<_> = self
            .interfaces
            .iter()
            .filter(|(_, config)| config.inbound_rules().next().is_some())
            .map(|(name, config)| (name.as_str(), config))
            .collect();

        let mut allocated = BTreeMap::new();
        let mut taken = BTreeSet::new();

        for &(name, config) in &inbound {
            let Some(ifb) = &config.ifb else { continue };
            let index = ifb_device_index(ifb).ok_or_else(|| {
                Error::InvalidTopology(format!("{name}: `{ifb}` is not an ifb device name"))
            })?;
            if !taken.insert(index) {
                return Err(Error::InvalidTopology(format!(
                    "{name}: ifb device {ifb} is used by another interface"
                )));
            }
            allocated.insert(name, index);
        }

        let mut next = 0;
        for &(name, config) in &inbound {
            if config.ifb.is_some() {
                continue;
            }
            while taken.contains(&next) {
                next += 1;
            }
            allocated.insert(name, next);
            next += 1;
        }

        Ok(allocated)
    }
}

/// A validated rule: netem arguments and the ranges they apply to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Impairment {
    pub netem: NetemArgs,
    pub ranges: Vec<Subnet>,
}

/// Everything needed to configure one interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfacePlan {
    pub name: String,
    pub rate: Rate,
    pub outbound: Vec<Impairment>,
    pub inbound: Vec<Impairment>,
    /// Set whenever there are inbound rules.
    pub redirect: Option<RedirectDevice>,
}

impl InterfacePlan {
    fn apply<E: Executor>(&self, exec: &mut E) -> Result<AppliedInterface> {
        let _span = tracing::info_span!("configure", interface = %self.name).entered();

        let egress = if self.outbound.is_empty() {
            None
        } else {
            let mut egress = Egress::new(&self.name, self.rate);
            for rule in &self.outbound {
                let class = egress.add_impairment(exec, rule.netem.clone(), rule.ranges.clone())?;
                tracing::info!(%class, netem = %rule.netem, "outbound rule applied");
            }
            Some(egress)
        };

        let ingress = match &self.redirect {
            Some(redirect) => {
                let mut ingress = Ingress::new(exec, redirect.clone(), self.rate)?;
                for rule in &self.inbound {
                    let class = ingress.add_impairment(exec, rule.netem.clone(), rule.ranges.clone())?;
                    tracing::info!(%class, netem = %rule.netem, ifb = %redirect.virtual_device, "inbound rule applied");
                }
                Some(ingress)
            }
            None => None,
        };

        Ok(AppliedInterface { name: self.name.clone(), egress, ingress })
    }
}

/// A validated topology, ready to be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub interfaces: Vec<InterfacePlan>,
}

impl Plan {
    /// Clears every interface of the plan.
    pub fn clear<E: Executor>(&self, exec: &mut E) -> Vec<TeardownReport> {
        self.interfaces
            .iter()
            .map(|interface| {
                tracing::info!(interface = %interface.name, "clearing interface");
                clear_all(exec, &interface.name)
            })
            .collect()
    }

    /// Clears every interface, then configures them one by one.
    ///
    /// All interfaces are cleared before any is configured: clearing unloads the IFB driver,
    /// which would break the inbound path of an interface configured earlier in the run.
    pub fn apply<E: Executor>(&self, exec: &mut E) -> Result<Applied> {
        let teardown = self.clear(exec);

        let interfaces = self
            .interfaces
            .iter()
            .map(|interface| interface.apply(exec))
            .collect::<Result<Vec<_>>>()?;

        Ok(Applied { teardown, interfaces })
    }
}

/// What was built on one interface.
#[derive(Debug)]
pub struct AppliedInterface {
    pub name: String,
    pub egress: Option<Egress>,
    pub ingress: Option<Ingress>,
}

/// The result of [`Plan::apply`].
#[derive(Debug)]
pub struct Applied {
    pub teardown: Vec<TeardownReport>,
    pub interfaces: Vec<AppliedInterface>,
}
