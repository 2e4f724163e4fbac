// SPDX-License-Identifier: GPL-3.0-only

use std::path::Path;

use lvm_types::enums::{LV_HEALTH_STATUS, LV_PERMISSIONS, LV_WHEN_FULL, RAID_SYNC_ACTION};
use lvm_types::{EntityKind, EnumTable, LogicalVolume, THIN_POOL_SEGMENT};
use tracing::error;

use crate::error::{LvmError, Result};
use crate::fields::{FieldContext, Field, apply, raw_value};
use crate::report::ReportRow;

const LV_FIELDS: &[Field<LogicalVolume>] = &[
    Field::text("lv_name", |lv, v| lv.name = v),
    Field::text("lv_full_name", |lv, v| lv.full_name = v),
    Field::text("lv_uuid", |lv, v| lv.uuid = v),
    Field::text("lv_path", |lv, v| lv.path = v),
    Field::text("lv_dm_path", |lv, v| lv.dm_path = v),
    Field::text("vg_name", |lv, v| lv.vg_name = v),
    Field::text("lv_host", |lv, v| lv.host = v),
    Field::text("segtype", |lv, v| lv.segment_type = v),
    Field::text("pool_lv", |lv, v| lv.pool_name = v),
    Field::text("lv_active", |lv, v| lv.active_status = v),
    Field::bytes("lv_size", |lv, v| lv.size = v),
    // Only thin pools report a meaningful metadata size
    Field::bytes_if("lv_metadata_size", is_thin_pool, |lv, v| lv.metadata_size = v),
    Field::enumerated(LV_PERMISSIONS, |lv, v| lv.permission = v),
    Field::enumerated(LV_WHEN_FULL, |lv, v| lv.when_full = v),
    Field::enumerated(LV_HEALTH_STATUS, |lv, v| lv.health_status = v),
    Field::enumerated(RAID_SYNC_ACTION, |lv, v| lv.raid_sync_action = v),
    Field::percent("data_percent", |lv, v| lv.used_percent = v),
    Field::percent("metadata_percent", |lv, v| lv.metadata_used_percent = v),
    Field::percent("snap_percent", |lv, v| lv.snapshot_used_percent = v),
];

fn is_thin_pool(row: &ReportRow) -> bool {
    raw_value(row, "segtype") == THIN_POOL_SEGMENT
}

/// Build a [`LogicalVolume`] from one `lvs` report row
///
/// Resolves `lv_path` to its kernel device; a path that does not resolve
/// fails with [`LvmError::DeviceResolution`]. Volumes without a device link
/// (thin pools, hidden volumes) report an empty path and keep an empty
/// device name.
pub fn parse_logical_volume(row: &ReportRow, enums: &EnumTable) -> Result<LogicalVolume> {
    let mut lv = parse_logical_volume_fields(row, enums)?;
    if !lv.path.is_empty() {
        lv.device = resolve_device_name(Path::new(&lv.path))?;
    }
    Ok(lv)
}

fn parse_logical_volume_fields(row: &ReportRow, enums: &EnumTable) -> Result<LogicalVolume> {
    let ctx = FieldContext::new(EntityKind::LogicalVolume, row, enums);
    let mut lv = LogicalVolume::default();
    apply(&mut lv, row, LV_FIELDS, &ctx)?;
    Ok(lv)
}

/// Name of the device node `path` links to
///
/// Used as a metric label mapping an LV to its device,
/// e.g. `/dev/vg0/root` -> `dm-0`.
pub fn resolve_device_name(path: &Path) -> Result<String> {
    let target = std::fs::canonicalize(path).map_err(|source| {
        error!("failed to resolve device mapper from lv path {path:?}: {source}");
        LvmError::DeviceResolution {
            path: path.to_path_buf(),
            source,
        }
    })?;

    Ok(target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default())
}
