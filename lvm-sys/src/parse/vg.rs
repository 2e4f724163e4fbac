// SPDX-License-Identifier: GPL-3.0-only

use lvm_types::enums::{VG_ALLOCATION_POLICY, VG_PERMISSIONS};
use lvm_types::{EntityKind, EnumTable, VolumeGroup};

use crate::error::Result;
use crate::fields::{FieldContext, Field, apply};
use crate::report::ReportRow;

const VG_FIELDS: &[Field<VolumeGroup>] = &[
    Field::text("vg_name", |vg, v| vg.name = v),
    Field::text("vg_uuid", |vg, v| vg.uuid = v),
    Field::count("pv_count", |vg, v| vg.pv_count = v),
    Field::count("lv_count", |vg, v| vg.lv_count = v),
    Field::count("max_lv", |vg, v| vg.max_lv = v),
    Field::count("max_pv", |vg, v| vg.max_pv = v),
    Field::count("snap_count", |vg, v| vg.snap_count = v),
    Field::count("vg_missing_pv_count", |vg, v| vg.missing_pv_count = v),
    Field::count("vg_mda_count", |vg, v| vg.mda_count = v),
    Field::count("vg_mda_used_count", |vg, v| vg.mda_used_count = v),
    Field::bytes("vg_size", |vg, v| vg.size = v),
    Field::bytes("vg_free", |vg, v| vg.free = v),
    Field::bytes("vg_mda_size", |vg, v| vg.mda_size = v),
    Field::bytes("vg_mda_free", |vg, v| vg.mda_free = v),
    Field::enumerated(VG_PERMISSIONS, |vg, v| vg.permission = v),
    Field::enumerated(VG_ALLOCATION_POLICY, |vg, v| vg.allocation_policy = v),
];

/// Build a [`VolumeGroup`] from one `vgs` report row
pub fn parse_volume_group(row: &ReportRow, enums: &EnumTable) -> Result<VolumeGroup> {
    let ctx = FieldContext::new(EntityKind::VolumeGroup, row, enums);
    let mut vg = VolumeGroup::default();
    apply(&mut vg, row, VG_FIELDS, &ctx)?;
    vg.used = ctx.used(vg.size, vg.free, "vg_free", row)?;
    Ok(vg)
}

#[cfg(test)]
mod tests {
    use lvm_types::{LVM_ENUMS, UNDEFINED};

    use super::*;
    use crate::error::LvmError;
    use crate::parse::row;

    fn vg_row() -> ReportRow {
        row(&[
            ("vg_name", "vg0"),
            ("vg_uuid", "u1"),
            ("vg_size", "1000b"),
            ("vg_free", "400b"),
            ("vg_mda_size", "0b"),
            ("vg_mda_free", "0b"),
            ("pv_count", "1"),
            ("lv_count", "0"),
            ("max_lv", "0"),
            ("max_pv", "0"),
            ("snap_count", "0"),
            ("vg_missing_pv_count", "0"),
            ("vg_mda_count", "0"),
            ("vg_mda_used_count", "0"),
            ("vg_permissions", "writeable"),
            ("vg_allocation_policy", "normal"),
        ])
    }

    #[test]
    fn parses_minimal_volume_group() {
        let vg = parse_volume_group(&vg_row(), &LVM_ENUMS).unwrap();

        assert_eq!(vg.name, "vg0");
        assert_eq!(vg.uuid, "u1");
        assert_eq!(vg.size, 1000);
        assert_eq!(vg.free, 400);
        assert_eq!(vg.used, 600);
        assert_eq!(vg.pv_count, 1);
        assert_eq!(vg.permission, 0);
        assert_eq!(vg.allocation_policy, 0);
    }

    #[test]
    fn parses_realistic_vgs_row() {
        let mut row = vg_row();
        row.insert("vg_size".into(), "499553779712B".into());
        row.insert("vg_free".into(), "4294967296B".into());
        row.insert("vg_mda_size".into(), "1044480B".into());
        row.insert("vg_mda_free".into(), "517120B".into());
        row.insert("lv_count".into(), "3".into());
        row.insert("vg_mda_count".into(), "1".into());
        row.insert("vg_mda_used_count".into(), "1".into());
        row.insert("vg_permissions".into(), "read-only".into());
        row.insert("vg_allocation_policy".into(), "cling".into());
        row.insert("vg_attr".into(), "wz--n-".into());

        let vg = parse_volume_group(&row, &LVM_ENUMS).unwrap();
        assert_eq!(vg.used, 499553779712 - 4294967296);
        assert_eq!(vg.mda_size, 1044480);
        assert_eq!(vg.mda_free, 517120);
        assert_eq!(vg.lv_count, 3);
        assert_eq!(vg.permission, 1);
        assert_eq!(vg.allocation_policy, 2);
    }

    #[test]
    fn unknown_policy_is_undefined() {
        let mut row = vg_row();
        row.insert("vg_allocation_policy".into(), "".into());
        row.insert("vg_permissions".into(), "exclusive".into());

        let vg = parse_volume_group(&row, &LVM_ENUMS).unwrap();
        assert_eq!(vg.allocation_policy, UNDEFINED);
        assert_eq!(vg.permission, UNDEFINED);
    }

    #[test]
    fn invalid_size_fails_with_context() {
        let mut row = vg_row();
        row.insert("vg_size".into(), "1.5g".into());

        let error = parse_volume_group(&row, &LVM_ENUMS).unwrap_err();
        assert!(matches!(
            error,
            LvmError::Parse { ref field, ref entity, .. } if field == "vg_size" && entity == "vg0"
        ));
    }

    #[test]
    fn free_larger_than_size_is_rejected() {
        let mut row = vg_row();
        row.insert("vg_free".into(), "1001b".into());

        assert!(matches!(
            parse_volume_group(&row, &LVM_ENUMS),
            Err(LvmError::Parse { ref field, .. }) if field == "vg_free"
        ));
    }
}
