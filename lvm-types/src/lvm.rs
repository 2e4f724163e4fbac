// SPDX-License-Identifier: GPL-3.0-only

//! LVM (Logical Volume Manager) inventory records
//!
//! One record per volume group, logical volume and physical volume, built
//! fresh on every scrape from the LVM reporting tools. All sizes are exact
//! byte counts.

use std::fmt;

/// Segment type whose metadata size is meaningful
pub const THIN_POOL_SEGMENT: &str = "thin-pool";

/// The three kinds of LVM entity reported by `vgs`, `lvs` and `pvs`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    VolumeGroup,
    LogicalVolume,
    PhysicalVolume,
}

impl EntityKind {
    /// Short form used as report key and metric subsystem ("vg", "lv", "pv")
    pub fn short_name(self) -> &'static str {
        match self {
            EntityKind::VolumeGroup => "vg",
            EntityKind::LogicalVolume => "lv",
            EntityKind::PhysicalVolume => "pv",
        }
    }

    /// Report column holding the entity's own name
    pub fn name_field(self) -> &'static str {
        match self {
            EntityKind::VolumeGroup => "vg_name",
            EntityKind::LogicalVolume => "lv_name",
            EntityKind::PhysicalVolume => "pv_name",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::VolumeGroup => "volume group",
            EntityKind::LogicalVolume => "logical volume",
            EntityKind::PhysicalVolume => "physical volume",
        };
        f.write_str(label)
    }
}

/// Volume group attributes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeGroup {
    /// Volume group name
    pub name: String,

    /// Volume group UUID
    pub uuid: String,

    /// Total size in bytes
    pub size: u64,

    /// Free space in bytes
    pub free: u64,

    /// `size - free`, computed at parse time
    pub used: u64,

    /// Number of logical volumes
    pub lv_count: u32,

    /// Number of physical volumes
    pub pv_count: u32,

    /// Maximum number of logical volumes, 0 if unlimited
    pub max_lv: u32,

    /// Maximum number of physical volumes, 0 if unlimited
    pub max_pv: u32,

    /// Number of snapshots
    pub snap_count: u32,

    /// Number of physical volumes which are missing
    pub missing_pv_count: u32,

    /// Number of metadata areas
    pub mda_count: u32,

    /// Number of metadata areas in use
    pub mda_used_count: u32,

    /// Free metadata area space in bytes
    pub mda_free: u64,

    /// Size of the smallest metadata area in bytes
    pub mda_size: u64,

    /// `vg_permissions` enum code
    pub permission: i32,

    /// `vg_allocation_policy` enum code
    pub allocation_policy: i32,
}

/// Logical volume attributes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogicalVolume {
    /// Logical volume name (e.g. "pvc-213ca1e6")
    pub name: String,

    /// Full name including the volume group (e.g. "vg0/pvc-213ca1e6")
    pub full_name: String,

    /// Logical volume UUID
    pub uuid: String,

    /// Stable device path (e.g. "/dev/vg0/root")
    pub path: String,

    /// Device mapper path (e.g. "/dev/mapper/vg0-root")
    pub dm_path: String,

    /// Kernel device name `path` resolves to (e.g. "dm-0")
    pub device: String,

    /// Owning volume group name
    pub vg_name: String,

    /// Host the logical volume was created on
    pub host: String,

    /// Segment type (e.g. "linear", "thin-pool")
    pub segment_type: String,

    /// Thin pool backing a thin volume, empty otherwise
    pub pool_name: String,

    /// Activation state as reported by LVM
    pub active_status: String,

    /// Size in bytes
    pub size: u64,

    /// Metadata size in bytes, 0 unless this is a thin pool
    pub metadata_size: u64,

    /// `lv_permissions` enum code
    pub permission: i32,

    /// `lv_when_full` enum code
    pub when_full: i32,

    /// `lv_health_status` enum code
    pub health_status: i32,

    /// `raid_sync_action` enum code
    pub raid_sync_action: i32,

    /// Data usage percentage
    pub used_percent: f64,

    /// Metadata usage percentage
    pub metadata_used_percent: f64,

    /// Snapshot usage percentage
    pub snapshot_used_percent: f64,
}

/// Physical volume attributes
///
/// The allocatable, missing and in-use flags are kept exactly as LVM renders
/// them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhysicalVolume {
    /// Device path (e.g. "/dev/sda1")
    pub name: String,

    /// Physical volume UUID
    pub uuid: String,

    /// Volume group name, empty if not assigned
    pub vg_name: String,

    pub allocatable: String,

    pub missing: String,

    pub in_use: String,

    /// Total size in bytes
    pub size: u64,

    /// Free space in bytes
    pub free: u64,

    /// `size - free`, computed at parse time
    pub used: u64,

    /// Size of the underlying device in bytes
    pub device_size: u64,

    /// Size of the smallest metadata area in bytes
    pub mda_size: u64,

    /// Free metadata area space in bytes
    pub mda_free: u64,
}
