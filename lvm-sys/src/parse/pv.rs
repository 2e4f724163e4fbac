// SPDX-License-Identifier: GPL-3.0-only

use lvm_types::{EntityKind, EnumTable, PhysicalVolume};

use crate::error::Result;
use crate::fields::{FieldContext, Field, apply};
use crate::report::ReportRow;

// `pv_used` is not read; used is derived from size and free.
const PV_FIELDS: &[Field<PhysicalVolume>] = &[
    Field::text("pv_name", |pv, v| pv.name = v),
    Field::text("pv_uuid", |pv, v| pv.uuid = v),
    Field::text("vg_name", |pv, v| pv.vg_name = v),
    Field::text("pv_allocatable", |pv, v| pv.allocatable = v),
    Field::text("pv_missing", |pv, v| pv.missing = v),
    Field::text("pv_in_use", |pv, v| pv.in_use = v),
    Field::bytes("pv_size", |pv, v| pv.size = v),
    Field::bytes("pv_free", |pv, v| pv.free = v),
    Field::bytes("dev_size", |pv, v| pv.device_size = v),
    Field::bytes("pv_mda_size", |pv, v| pv.mda_size = v),
    Field::bytes("pv_mda_free", |pv, v| pv.mda_free = v),
];

/// Build a [`PhysicalVolume`] from one `pvs` report row
pub fn parse_physical_volume(row: &ReportRow, enums: &EnumTable) -> Result<PhysicalVolume> {
    let ctx = FieldContext::new(EntityKind::PhysicalVolume, row, enums);
    let mut pv = PhysicalVolume::default();
    apply(&mut pv, row, PV_FIELDS, &ctx)?;
    pv.used = ctx.used(pv.size, pv.free, "pv_free", row)?;
    Ok(pv)
}
