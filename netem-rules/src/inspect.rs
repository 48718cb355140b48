//! Querying the traffic control state of an interface.

use crate::{
    command::Executor,
    error::{CommandResultExt as _, Result},
    tc::qdisc::{TcObject, show},
};

/// The output of `tc qdisc|class|filter show` for one device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceState {
    pub device: String,
    pub qdiscs: String,
    pub classes: String,
    pub filters: String,
}

impl InterfaceState {
    /// Whether no class and no filter is installed on the device.
    pub fn is_unshaped(&self) -> bool {
        self.classes.trim().is_empty() && self.filters.trim().is_empty()
    }
}

/// Lists the qdiscs, classes and filters of `device`.
pub fn inspect<E: Executor>(exec: &mut E, device: &str) -> Result<InterfaceState> {
    let mut state = InterfaceState { device: device.to_string(), ..Default::default() };

    for object in TcObject::ALL {
        let cmd = show(object, device);
        let output = exec.execute(&cmd).for_command(&cmd)?;
        let slot = match object {
            TcObject::Qdisc => &mut state.qdiscs,
            TcObject::Class => &mut state.classes,
            TcObject::Filter => &mut state.filters,
        };
        *slot = output.stdout;
    }

    Ok(state)
}
