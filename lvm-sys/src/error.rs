// SPDX-License-Identifier: GPL-3.0-only

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use lvm_types::EntityKind;
use thiserror::Error;

/// Error types for LVM inventory operations
///
/// Every variant is fatal to the listing that produced it.
#[derive(Error, Debug)]
pub enum LvmError {
    #[error("failed to run {command} {}: {reason}", .args.join(" "))]
    Execution {
        command: String,
        args: Vec<String>,
        reason: ExecutionFailure,
    },

    #[error("invalid report JSON: {0}")]
    Format(#[from] serde_json::Error),

    #[error("expected exactly one lvm report, found {found}")]
    Schema { found: usize },

    #[error("invalid format of {field}={value:?} for {kind} {entity}: {reason}")]
    Parse {
        kind: EntityKind,
        entity: String,
        field: String,
        value: String,
        reason: String,
    },

    #[error("failed to resolve device mapper from lv path {path:?}: {source}")]
    DeviceResolution {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Why an external command did not produce a report
#[derive(Error, Debug)]
pub enum ExecutionFailure {
    #[error("{0}")]
    Spawn(#[from] io::Error),

    #[error("exited with {status}: {stderr}")]
    Exit { status: ExitStatus, stderr: String },

    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

/// Result type alias for LVM inventory operations
pub type Result<T> = std::result::Result<T, LvmError>;
