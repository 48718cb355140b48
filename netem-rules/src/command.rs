//! Utilities for running the host commands (`tc`, `ip`, `modprobe`) that configure traffic
//! control.
//!
//! Every operation is expressed as a [`Cmd`], a plain argument vector. An [`Executor`] decides
//! what to do with it: [`Runner`] spawns the process and waits for it, [`Recorder`] only records
//! it (used for dry runs and tests).

use std::{fmt, io, process};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("empty commmand provided")]
    Empty,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("non-zero exit status: {0}")]
    NonZero(Output),
}

pub type Result<T> = std::result::Result<T, Error>;

/// The captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
    /// The exit code, `None` if the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl Output {
    /// A successful, silent output.
    pub fn success() -> Self {
        Self { code: Some(0), ..Default::default() }
    }

    /// A failed output with the given exit code and stderr.
    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self { code: Some(code), stdout: String::new(), stderr: stderr.into() }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<process::Output> for Output {
    fn from(value: process::Output) -> Self {
        Self {
            code: value.status.code(),
            stdout: String::from_utf8_lossy(&value.stdout).to_string(),
            stderr: String::from_utf8_lossy(&value.stderr).to_string(),
        }
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {code}")?,
            None => write!(f, "terminated by signal")?,
        }
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            write!(f, ": {stderr}")?;
        }
        Ok(())
    }
}

/// An external command as an argument vector. The first element is the program.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Cmd {
    args: Vec<String>,
}

impl Cmd {
    /// Creates a command running `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self { args: vec![program.into()] }
    }

    /// Appends a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends all the provided arguments, in order.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Returns the full argument vector, program included.
    pub fn argv(&self) -> &[String] {
        &self.args
    }

    /// Returns a copy of this command prefixed with `sudo`.
    pub fn with_sudo(&self) -> Self {
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push("sudo".to_string());
        args.extend(self.args.iter().cloned());
        Self { args }
    }

    /// Builds the [`process::Command`] for this argument vector.
    pub fn to_process(&self) -> Result<process::Command> {
        let (program, args) = self.args.split_first().ok_or(Error::Empty)?;
        let mut cmd = process::Command::new(program);
        cmd.args(args);
        Ok(cmd)
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.args.join(" "))
    }
}

/// Something able to carry out a [`Cmd`].
///
/// Implementations must block until the command has completed: the caller relies on every
/// command being finished before the next one is issued.
pub trait Executor {
    /// Executes the command. A non-zero exit status is reported as [`Error::NonZero`].
    fn execute(&mut self, cmd: &Cmd) -> Result<Output>;
}

impl<E: Executor + ?Sized> Executor for &mut E {
    fn execute(&mut self, cmd: &Cmd) -> Result<Output> {
        (**self).execute(cmd)
    }
}

/// Runs commands as child processes of the current one.
#[derive(Debug, Clone, Copy, Default)]
pub struct Runner {
    sudo: bool,
}

impl Runner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix every command with `sudo`.
    pub fn with_sudo(mut self, sudo: bool) -> Self {
        self.sudo = sudo;
        self
    }
}

impl Executor for Runner {
    fn execute(&mut self, cmd: &Cmd) -> Result<Output> {
        let cmd = if self.sudo { cmd.with_sudo() } else { cmd.clone() };
        let mut process = cmd.to_process()?;
        process.stderr(process::Stdio::piped()).stdout(process::Stdio::piped());

        tracing::debug!(%cmd, "running command");

        let output: Output = process.spawn()?.wait_with_output()?.into();

        if !output.is_success() {
            tracing::debug!(?output.stderr, ?output.code, %cmd, "command returned non-zero status");
            return Err(Error::NonZero(output));
        }

        Ok(output)
    }
}

/// An [`Executor`] that records commands instead of running them.
///
/// Commands whose rendered form contains one of the configured patterns fail with the
/// configured output, everything else succeeds with an empty output.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    commands: Vec<Cmd>,
    failures: Vec<(String, Output)>,
    echo: bool,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Print every command to stdout as it is recorded.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Fail every command containing `pattern` with exit code 2 and the given stderr.
    pub fn fail_matching(mut self, pattern: impl Into<String>, stderr: impl Into<String>) -> Self {
        self.failures.push((pattern.into(), Output::failure(2, stderr)));
        self
    }

    /// The commands recorded so far, in execution order.
    pub fn commands(&self) -> &[Cmd] {
        &self.commands
    }

    /// The recorded commands rendered as strings.
    pub fn lines(&self) -> Vec<String> {
        self.commands.iter().map(ToString::to_string).collect()
    }

    /// Forget every recorded command, keeping the failure rules.
    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl Executor for Recorder {
    fn execute(&mut self, cmd: &Cmd) -> Result<Output> {
        if cmd.argv().is_empty() {
            return Err(Error::Empty);
        }

        tracing::debug!(%cmd, "recording command");
        if self.echo {
            println!("{cmd}");
        }
        self.commands.push(cmd.clone());

        let rendered = cmd.to_string();
        match self.failures.iter().find(|(pattern, _)| rendered.contains(pattern.as_str())) {
            Some((_, output)) => Err(Error::NonZero(output.clone())),
            None => Ok(Output::success()),
        }
    }
}
