// SPDX-License-Identifier: GPL-3.0-only

//! Canonical domain models for the LVM exporter
//!
//! This crate defines the records produced by one inventory pass over the
//! host's LVM topology:
//!
//! - **lvm-sys**: parses `vgs`/`lvs`/`pvs` reports into these types
//! - **lvm-exporter**: renders them as Prometheus samples
//!
//! It also carries the enumeration catalog that maps string-valued report
//! fields to stable integer codes.

pub mod enums;
pub mod lvm;

pub use enums::{EnumTable, LVM_ENUMS, UNDEFINED};
pub use lvm::{EntityKind, LogicalVolume, PhysicalVolume, THIN_POOL_SEGMENT, VolumeGroup};
