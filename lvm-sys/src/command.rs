// SPDX-License-Identifier: GPL-3.0-only

//! Synchronous invocation of the LVM reporting binaries
//!
//! The caller blocks until the child exits. With a timeout configured the
//! child is killed and reaped once the deadline passes.

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{ExecutionFailure, LvmError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Captured output of a successful command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

/// Runs an external command with a fixed argument vector
///
/// Implementations must fail with [`LvmError::Execution`] when the command
/// cannot be started, exits non-zero, or times out.
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: &str, args: &[&str]) -> Result<CommandOutput>;
}

/// Runs commands as child processes of this one
#[derive(Debug, Clone, Default)]
pub struct SystemCommandRunner {
    /// Directory holding the binaries; `PATH` lookup when unset
    bin_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bin_dir(mut self, bin_dir: Option<PathBuf>) -> Self {
        self.bin_dir = bin_dir;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Program path handed to the OS for `command`
    pub fn program(&self, command: &str) -> PathBuf {
        match &self.bin_dir {
            Some(dir) => dir.join(command),
            None => PathBuf::from(command),
        }
    }

    /// Commands from `commands` that cannot be found
    pub fn missing_tools(&self, commands: &[&str]) -> Vec<String> {
        commands
            .iter()
            .filter(|command| match &self.bin_dir {
                Some(dir) => !dir.join(command).exists(),
                None => which::which(command).is_err(),
            })
            .map(ToString::to_string)
            .collect()
    }
}

impl CommandRunner for SystemCommandRunner {
    fn run(&self, command: &str, args: &[&str]) -> Result<CommandOutput> {
        let program = self.program(command);
        debug!("Running {} {}", program.display(), args.join(" "));

        let failed = |reason: ExecutionFailure| LvmError::Execution {
            command: command.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
            reason,
        };

        let mut child = Command::new(&program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| failed(e.into()))?;

        // Drain both pipes concurrently so a large report cannot fill the
        // pipe buffer and stall the child.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = match self.timeout {
            Some(timeout) => wait_with_deadline(&mut child, timeout)
                .map_err(|e| failed(e.into()))?
                .ok_or_else(|| failed(ExecutionFailure::TimedOut(timeout)))?,
            None => child.wait().map_err(|e| failed(e.into()))?,
        };

        let output = CommandOutput {
            stdout: collect(stdout),
            stderr: collect(stderr),
        };

        if !status.success() {
            return Err(failed(ExecutionFailure::Exit {
                status,
                stderr: output.stderr_lossy(),
            }));
        }

        Ok(output)
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = pipe.read_to_end(&mut buffer);
        buffer
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

/// Wait for `child`, returning `None` if it had to be killed
fn wait_with_deadline(child: &mut Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}
