use crate::{
    command::{self, Cmd},
    ip::ParseSubnetError,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A command that must succeed did not. Nothing already applied is rolled back.
    #[error("command `{command}` failed: {source}")]
    Command {
        command: Cmd,
        #[source]
        source: command::Error,
    },
    #[error("too many rules on device {0}")]
    TooManyRules(String),
    #[error("invalid CIDR `{cidr}`: {source}")]
    InvalidCidr {
        cidr: String,
        #[source]
        source: ParseSubnetError,
    },
    #[error("invalid topology: {0}")]
    InvalidTopology(String),
    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait attaching the failed command to executor errors.
pub(crate) trait CommandResultExt<T> {
    fn for_command(self, command: &Cmd) -> Result<T>;
}

impl<T> CommandResultExt<T> for command::Result<T> {
    fn for_command(self, command: &Cmd) -> Result<T> {
        self.map_err(|source| Error::Command { command: command.clone(), source })
    }
}
