//! IFB (Intermediate Functional Block) driver and device commands.
//!
//! The `ifb` kernel module is a host-wide resource: loading it creates `numifbs` devices named
//! `ifb0`, `ifb1`, ... (two by default), and unloading it removes all of them at once.

use crate::command::Cmd;

/// Name of the kernel module providing IFB devices.
pub const IFB_MODULE: &str = "ifb";

/// The IFB device used when none is chosen explicitly.
pub const DEFAULT_IFB_DEVICE: &str = "ifb0";

/// Returns the name of the `index`-th IFB device created by the driver.
pub fn ifb_device_name(index: usize) -> String {
    format!("{IFB_MODULE}{index}")
}

/// The index of an IFB device named the way the driver names them, `ifb<N>`.
///
/// Returns `None` for any other name, including zero-padded indices like `ifb01`.
pub fn ifb_device_index(name: &str) -> Option<usize> {
    let index: usize = name.strip_prefix(IFB_MODULE)?.parse().ok()?;
    (ifb_device_name(index) == name).then_some(index)
}

/// Builder for loading the IFB driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadIfbRequest {
    /// Number of devices to create, `None` for the driver's default.
    pub numifbs: Option<usize>,
}

impl LoadIfbRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_numifbs(mut self, numifbs: Option<usize>) -> Self {
        self.numifbs = numifbs;
        self
    }

    /// `modprobe ifb [numifbs=<n>]`
    pub fn build(&self) -> Cmd {
        let cmd = Cmd::new("modprobe").arg(IFB_MODULE);
        match self.numifbs {
            Some(n) => cmd.arg(format!("numifbs={n}")),
            None => cmd,
        }
    }
}

/// `modprobe -r ifb`
pub fn unload_ifb() -> Cmd {
    Cmd::new("modprobe").args(["-r", IFB_MODULE])
}

/// `ip link set dev <device> up`
pub fn link_up(device: &str) -> Cmd {
    Cmd::new("ip").args(["link", "set", "dev", device, "up"])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ifb_cmds() {
        assert_eq!(LoadIfbRequest::new().build().to_string(), "modprobe ifb");
        assert_eq!(
            LoadIfbRequest::new().with_numifbs(Some(3)).build().to_string(),
            "modprobe ifb numifbs=3"
        );
        assert_eq!(unload_ifb().to_string(), "modprobe -r ifb");
        assert_eq!(link_up("ifb1").to_string(), "ip link set dev ifb1 up");
        assert_eq!(ifb_device_name(1), "ifb1");
    }

    #[test]
    fn test_ifb_device_index() {
        assert_eq!(ifb_device_index("ifb0"), Some(0));
        assert_eq!(ifb_device_index("ifb12"), Some(12));
        for name in ["ifb", "ifb01", "ifb+1", "eth0", "myifb", "ifb1a"] {
            assert_eq!(ifb_device_index(name), None, "{name}");
        }
    }
}
