// SPDX-License-Identifier: GPL-3.0-only

//! LVM reporting tool operations
//!
//! This crate turns the output of the LVM reporting tools into typed
//! records:
//! - Running `vgs`, `lvs`, `pvs` (and optionally `pvscan --cache`)
//! - Decoding their `--reportformat json` envelope
//! - Normalizing counts, byte quantities, percentages and enum fields
//! - Resolving logical volume paths to kernel device names
//!
//! The tools usually require elevated privileges; the calling process is
//! expected to run as root.

pub mod command;
pub mod error;
pub mod fields;
pub mod inventory;
pub mod parse;
pub mod report;

pub use command::{CommandOutput, CommandRunner, SystemCommandRunner};
pub use error::{ExecutionFailure, LvmError, Result};
pub use inventory::{DevicePolicy, InventoryOptions, LvmInventory, REQUIRED_TOOLS};
pub use report::{ReportRow, decode_report};
