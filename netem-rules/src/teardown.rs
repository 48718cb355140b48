//! Best-effort removal of everything this tool may have installed on an interface.

use std::fmt::{self, Display};

use crate::{
    command::{self, Cmd, Executor},
    tc::{
        ifb,
        qdisc::{QdiscParent, delete_qdisc},
    },
};

/// Error messages meaning there was nothing to remove.
const ABSENCE_MARKERS: &[&str] = &[
    "no such file or directory",
    "cannot delete qdisc with handle of zero",
    "cannot find specified qdisc",
    "invalid handle",
    "not currently loaded",
];

/// The outcome of a single removal.
#[derive(Debug)]
pub enum Removal {
    /// The state existed and was removed.
    Applied,
    /// There was nothing to remove.
    NotFound,
    /// The removal failed for another reason.
    Failed(command::Error),
}

impl Removal {
    fn classify(result: command::Result<command::Output>) -> Self {
        match result {
            Ok(_) => Self::Applied,
            Err(command::Error::NonZero(output)) if is_absence(&output.stderr) => Self::NotFound,
            Err(e) => Self::Failed(e),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl Display for Removal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => f.write_str("removed"),
            Self::NotFound => f.write_str("nothing to remove"),
            Self::Failed(e) => write!(f, "failed: {e}"),
        }
    }
}

fn is_absence(stderr: &str) -> bool {
    let stderr = stderr.to_ascii_lowercase();
    ABSENCE_MARKERS.iter().any(|marker| stderr.contains(marker))
}

/// What [`clear_all`] did on an interface.
#[derive(Debug)]
pub struct TeardownReport {
    pub interface: String,
    pub root: Removal,
    pub ingress: Removal,
    pub driver: Removal,
}

impl TeardownReport {
    /// Whether every removal either applied or found nothing to remove.
    pub fn is_clean(&self) -> bool {
        !(self.root.is_failed() || self.ingress.is_failed() || self.driver.is_failed())
    }
}

fn remove<E: Executor>(exec: &mut E, cmd: Cmd) -> Removal {
    let removal = Removal::classify(exec.execute(&cmd));
    match &removal {
        Removal::Failed(e) => tracing::warn!(%cmd, error = %e, "removal failed"),
        outcome => tracing::debug!(%cmd, %outcome, "removal"),
    }
    removal
}

/// Removes the root and ingress qdiscs of `interface` and unloads the IFB driver.
///
/// Each removal is attempted regardless of the others and of what exists on the interface.
/// This never fails: real errors are logged and reported, absence is expected.
pub fn clear_all<E: Executor>(exec: &mut E, interface: &str) -> TeardownReport {
    let _span = tracing::debug_span!("clear_all", %interface).entered();

    let report = TeardownReport {
        interface: interface.to_string(),
        root: remove(exec, delete_qdisc(interface, QdiscParent::Root)),
        ingress: remove(exec, delete_qdisc(interface, QdiscParent::Ingress)),
        driver: remove(exec, ifb::unload_ifb()),
    };

    if !report.is_clean() {
        tracing::warn!(%interface, "interface was not fully cleared");
    }

    report
}
