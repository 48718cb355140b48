use std::collections::{BTreeMap, BTreeSet};

use netem_rules::{
    command::{self, Cmd, Executor, Output},
    inspect::inspect,
    teardown::{Removal, clear_all},
    topology::Topology,
};

/// A minimal model of the kernel state touched by the tool, keyed by device.
#[derive(Debug, Default)]
struct FakeKernel {
    ifb_loaded: bool,
    roots: BTreeSet<String>,
    ingresses: BTreeSet<String>,
    classes: BTreeMap<String, Vec<String>>,
    filters: BTreeMap<String, Vec<String>>,
}

impl FakeKernel {
    fn absent(stderr: &str) -> command::Result<Output> {
        Err(command::Error::NonZero(Output::failure(2, stderr)))
    }
}

impl Executor for FakeKernel {
    fn execute(&mut self, cmd: &Cmd) -> command::Result<Output> {
        let argv: Vec<&str> = cmd.argv().iter().map(String::as_str).collect();
        match argv.as_slice() {
            ["modprobe", "ifb", ..] => self.ifb_loaded = true,
            ["modprobe", "-r", "ifb"] => {
                if !std::mem::take(&mut self.ifb_loaded) {
                    return Self::absent("modprobe: FATAL: Module ifb is not currently loaded.");
                }
                // Unloading the driver destroys the IFB devices with everything attached.
                self.roots.retain(|dev| !dev.starts_with("ifb"));
                self.classes.retain(|dev, _| !dev.starts_with("ifb"));
                self.filters.retain(|dev, _| !dev.starts_with("ifb"));
            }
            ["tc", "qdisc", "del", "dev", dev, "root"] => {
                if !self.roots.remove(*dev) {
                    return Self::absent("Error: Cannot delete qdisc with handle of zero.");
                }
                self.classes.remove(*dev);
                self.filters.remove(*dev);
            }
            ["tc", "qdisc", "del", "dev", dev, "ingress"] => {
                if !self.ingresses.remove(*dev) {
                    return Self::absent("Error: Invalid handle.");
                }
            }
            ["tc", "qdisc", "add", "dev", dev, "handle", "1:", "root", "htb"] => {
                self.roots.insert(dev.to_string());
            }
            ["tc", "qdisc", "add", "dev", dev, "handle", "ffff:", "ingress"] => {
                self.ingresses.insert(dev.to_string());
            }
            ["tc", "class", "add", "dev", dev, _, _, "classid", class, ..] => {
                self.classes.entry(dev.to_string()).or_default().push(class.to_string());
            }
            ["tc", "filter", "add", "dev", dev, ..] => {
                self.filters.entry(dev.to_string()).or_default().push(cmd.to_string());
            }
            ["tc", "class", "show", "dev", dev] => {
                let stdout = self.classes.get(*dev).map(|c| c.join("\n")).unwrap_or_default();
                return Ok(Output { stdout, ..Output::success() });
            }
            ["tc", "filter", "show", "dev", dev] => {
                let stdout = self.filters.get(*dev).map(|f| f.join("\n")).unwrap_or_default();
                return Ok(Output { stdout, ..Output::success() });
            }
            _ => {}
        }
        Ok(Output::success())
    }
}

#[test]
fn clear_on_unconfigured_interface_is_not_fatal() {
    let _ = tracing_subscriber::fmt::try_init();

    let mut kernel = FakeKernel::default();
    let report = clear_all(&mut kernel, "eth0");

    assert!(matches!(report.root, Removal::NotFound));
    assert!(matches!(report.ingress, Removal::NotFound));
    assert!(matches!(report.driver, Removal::NotFound));
    assert!(report.is_clean());
}

#[test]
fn clear_removes_configured_state() {
    let _ = tracing_subscriber::fmt::try_init();

    let topology: Topology = r#"
[[interfaces.eth0.out]]
netem = "delay 30ms 10ms"
cidrs = ["192.168.70.2/32"]
"#
    .parse()
    .unwrap();
    let plan = topology.plan().unwrap();

    let mut kernel = FakeKernel::default();
    plan.apply(&mut kernel).unwrap();

    let state = inspect(&mut kernel, "eth0").unwrap();
    assert!(!state.is_unshaped());
    assert_eq!(state.classes, "1:1\n1:10");

    let reports = plan.clear(&mut kernel);
    assert_eq!(reports.len(), 1);
    assert!(matches!(reports[0].root, Removal::Applied));
    assert!(matches!(reports[0].ingress, Removal::NotFound));

    let state = inspect(&mut kernel, "eth0").unwrap();
    assert!(state.is_unshaped());
}

#[test]
fn clear_removes_inbound_redirect() {
    let topology: Topology = r#"
[[interfaces.eth0.both]]
netem = "delay 30ms 10ms"
cidrs = ["192.168.70.2/32"]
"#
    .parse()
    .unwrap();
    let plan = topology.plan().unwrap();

    let mut kernel = FakeKernel::default();
    plan.apply(&mut kernel).unwrap();
    assert!(kernel.ifb_loaded);
    assert!(kernel.ingresses.contains("eth0"));

    let report = clear_all(&mut kernel, "eth0");
    assert!(matches!(report.root, Removal::Applied));
    assert!(matches!(report.ingress, Removal::Applied));
    assert!(matches!(report.driver, Removal::Applied));
    assert!(!kernel.ifb_loaded);
    assert!(kernel.ingresses.is_empty());

    // Reapplying from this clean baseline works again.
    plan.apply(&mut kernel).unwrap();
    assert_eq!(kernel.classes["eth0"], ["1:1", "1:10"]);
}
