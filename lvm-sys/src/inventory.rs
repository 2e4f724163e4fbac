// SPDX-License-Identifier: GPL-3.0-only

//! Volume inventory: one listing per entity kind
//!
//! Each listing runs its own reporting command, decodes the JSON report and
//! parses every row. The first error aborts that listing; the three listings
//! are independent of each other.

use lvm_types::{
    EntityKind, EnumTable, LVM_ENUMS, LogicalVolume, PhysicalVolume, VolumeGroup,
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::command::{CommandRunner, SystemCommandRunner};
use crate::error::{LvmError, Result};
use crate::parse::{parse_logical_volume, parse_physical_volume, parse_volume_group};
use crate::report::{ReportRow, decode_report};

pub const VGS: &str = "vgs";
pub const LVS: &str = "lvs";
pub const PVS: &str = "pvs";
pub const PVSCAN: &str = "pvscan";

const VGS_ARGS: &[&str] = &["--options", "all", "--reportformat", "json", "--units", "b"];
const LVS_ARGS: &[&str] = &[
    "--options",
    "lv_all,vg_name,segtype",
    "--reportformat",
    "json",
    "--units",
    "b",
];
const PVS_ARGS: &[&str] = &[
    "--options",
    "pv_all,vg_name",
    "--reportformat",
    "json",
    "--units",
    "b",
];
const PVSCAN_ARGS: &[&str] = &["--cache"];

/// Binaries the listings need; [`PVSCAN`] is needed as well when `reload_cache` is set
pub const REQUIRED_TOOLS: &[&str] = &[VGS, LVS, PVS];

/// Reporting command and arguments for `kind`
pub fn report_command(kind: EntityKind) -> (&'static str, &'static [&'static str]) {
    match kind {
        EntityKind::VolumeGroup => (VGS, VGS_ARGS),
        EntityKind::LogicalVolume => (LVS, LVS_ARGS),
        EntityKind::PhysicalVolume => (PVS, PVS_ARGS),
    }
}

/// What to do with a logical volume whose path does not resolve
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DevicePolicy {
    /// Fail the whole logical volume listing
    #[default]
    Strict,
    /// Drop the volume, log a warning and keep the rest
    SkipUnresolved,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InventoryOptions {
    /// Run `pvscan --cache` before every listing
    pub reload_cache: bool,
    pub device_policy: DevicePolicy,
}

/// Lists LVM entities through a [`CommandRunner`]
pub struct LvmInventory<R = SystemCommandRunner> {
    runner: R,
    enums: &'static EnumTable,
    options: InventoryOptions,
}

impl<R: CommandRunner> LvmInventory<R> {
    pub fn new(runner: R, options: InventoryOptions) -> Self {
        Self {
            runner,
            enums: &LVM_ENUMS,
            options,
        }
    }

    /// List all volume groups via `vgs`
    pub fn list_volume_groups(&self) -> Result<Vec<VolumeGroup>> {
        self.fetch(EntityKind::VolumeGroup)?
            .iter()
            .map(|row| parse_volume_group(row, self.enums))
            .collect()
    }

    /// List all logical volumes via `lvs`
    pub fn list_logical_volumes(&self) -> Result<Vec<LogicalVolume>> {
        let rows = self.fetch(EntityKind::LogicalVolume)?;
        let mut lvs = Vec::with_capacity(rows.len());

        for row in &rows {
            match parse_logical_volume(row, self.enums) {
                Ok(lv) => lvs.push(lv),
                Err(LvmError::DeviceResolution { path, source })
                    if self.options.device_policy == DevicePolicy::SkipUnresolved =>
                {
                    warn!("Skipping logical volume with unresolvable path {path:?}: {source}");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(lvs)
    }

    /// List all physical volumes via `pvs`
    pub fn list_physical_volumes(&self) -> Result<Vec<PhysicalVolume>> {
        self.fetch(EntityKind::PhysicalVolume)?
            .iter()
            .map(|row| parse_physical_volume(row, self.enums))
            .collect()
    }

    /// Refresh the metadata cache the reporting tools read from
    pub fn reload_metadata_cache(&self) -> Result<()> {
        let output = self.runner.run(PVSCAN, PVSCAN_ARGS)?;
        log_stderr(PVSCAN, &output.stderr_lossy());
        Ok(())
    }

    fn fetch(&self, kind: EntityKind) -> Result<Vec<ReportRow>> {
        if self.options.reload_cache {
            self.reload_metadata_cache()?;
        }

        let (command, args) = report_command(kind);
        let output = self.runner.run(command, args)?;
        log_stderr(command, &output.stderr_lossy());

        let rows = decode_report(&output.stdout, kind.short_name())?;
        debug!("{command} reported {} rows", rows.len());
        Ok(rows)
    }
}

fn log_stderr(command: &str, stderr: &str) {
    if !stderr.is_empty() {
        warn!("{command}: {stderr}");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::os::unix::fs::symlink;
    use std::sync::Mutex;

    use serde_json::{Value, json};

    use super::*;
    use crate::command::CommandOutput;
    use crate::error::ExecutionFailure;

    /// Replays canned stdout per command and records every invocation
    #[derive(Default)]
    struct ScriptedRunner {
        outputs: HashMap<String, Vec<u8>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedRunner {
        fn with(mut self, command: &str, stdout: impl Into<Vec<u8>>) -> Self {
            self.outputs.insert(command.to_string(), stdout.into());
            self
        }

        fn with_report(self, command: &str, key: &str, rows: Value) -> Self {
            let report = json!({ "report": [{ key: rows }] });
            self.with(command, report.to_string())
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&self, command: &str, args: &[&str]) -> Result<CommandOutput> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("{command} {}", args.join(" ")));

            match self.outputs.get(command) {
                Some(stdout) => Ok(CommandOutput {
                    stdout: stdout.clone(),
                    stderr: Vec::new(),
                }),
                None => Err(LvmError::Execution {
                    command: command.to_string(),
                    args: args.iter().map(ToString::to_string).collect(),
                    reason: ExecutionFailure::Spawn(std::io::ErrorKind::NotFound.into()),
                }),
            }
        }
    }

    fn inventory(runner: ScriptedRunner) -> LvmInventory<ScriptedRunner> {
        LvmInventory::new(runner, InventoryOptions::default())
    }

    fn lv_json(name: &str, path: &str) -> Value {
        json!({
            "lv_name": name,
            "lv_full_name": format!("vg0/{name}"),
            "lv_uuid": format!("uuid-{name}"),
            "lv_path": path,
            "lv_dm_path": format!("/dev/mapper/vg0-{name}"),
            "vg_name": "vg0",
            "segtype": "linear",
            "lv_active": "active",
            "lv_size": "1073741824B",
            "lv_metadata_size": "",
            "lv_permissions": "writeable",
            "data_percent": "",
        })
    }

    #[test]
    fn lists_volume_group_from_json_report() {
        let raw = r#"{"report":[{"vg":[{"vg_name":"vg0","vg_uuid":"u1","vg_size":"1000b","vg_free":"400b","vg_mda_size":"0b","vg_mda_free":"0b","pv_count":"1","lv_count":"0","max_lv":"0","max_pv":"0","snap_count":"0","vg_missing_pv_count":"0","vg_mda_count":"0","vg_mda_used_count":"0","vg_permissions":"writeable","vg_allocation_policy":"normal"}]}]}"#;
        let inventory = inventory(ScriptedRunner::default().with(VGS, raw));

        let vgs = inventory.list_volume_groups().unwrap();
        assert_eq!(vgs.len(), 1);
        assert_eq!(vgs[0].size, 1000);
        assert_eq!(vgs[0].free, 400);
        assert_eq!(vgs[0].used, 600);
        assert_eq!(vgs[0].permission, 0);
        assert_eq!(vgs[0].allocation_policy, 0);

        assert_eq!(
            inventory.runner.calls(),
            ["vgs --options all --reportformat json --units b"]
        );
    }

    #[test]
    fn lists_logical_volumes_in_report_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut rows = Vec::new();
        for index in 0..3 {
            let node = dir.path().join(format!("dm-{index}"));
            std::fs::write(&node, "").unwrap();
            let link = dir.path().join(format!("lv{index}"));
            symlink(&node, &link).unwrap();
            rows.push(lv_json(&format!("lv{index}"), &link.to_string_lossy()));
        }

        let inventory =
            inventory(ScriptedRunner::default().with_report(LVS, "lv", Value::Array(rows)));
        let lvs = inventory.list_logical_volumes().unwrap();

        let devices: Vec<_> = lvs.iter().map(|lv| lv.device.as_str()).collect();
        assert_eq!(devices, ["dm-0", "dm-1", "dm-2"]);
        assert_eq!(
            inventory.runner.calls(),
            ["lvs --options lv_all,vg_name,segtype --reportformat json --units b"]
        );
    }

    #[test]
    fn thin_pool_without_path_is_listed() {
        let dir = tempfile::tempdir().unwrap();
        let node = dir.path().join("dm-0");
        std::fs::write(&node, "").unwrap();
        let link = dir.path().join("root");
        symlink(&node, &link).unwrap();

        let mut pool = lv_json("pool", "");
        pool["segtype"] = json!("thin-pool");
        pool["lv_metadata_size"] = json!("4194304B");
        pool["lv_when_full"] = json!("queue");
        pool["metadata_percent"] = json!("10.25");
        let rows = json!([lv_json("root", &link.to_string_lossy()), pool]);

        let lvs = inventory(ScriptedRunner::default().with_report(LVS, "lv", rows))
            .list_logical_volumes()
            .unwrap();

        assert_eq!(lvs.len(), 2);
        assert_eq!(lvs[0].device, "dm-0");
        assert_eq!(lvs[1].name, "pool");
        assert_eq!(lvs[1].device, "");
        assert_eq!(lvs[1].metadata_size, 4194304);
        assert_eq!(lvs[1].when_full, 1);
        assert_eq!(lvs[1].metadata_used_percent, 10.25);
    }

    fn nine_good_one_dangling(dir: &tempfile::TempDir) -> Value {
        let mut rows = Vec::new();
        for index in 0..10 {
            let link = dir.path().join(format!("lv{index}"));
            if index != 6 {
                let node = dir.path().join(format!("dm-{index}"));
                std::fs::write(&node, "").unwrap();
                symlink(&node, &link).unwrap();
            }
            rows.push(lv_json(&format!("lv{index}"), &link.to_string_lossy()));
        }
        Value::Array(rows)
    }

    #[test]
    fn one_unresolvable_path_fails_the_whole_listing() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::default().with_report(LVS, "lv", nine_good_one_dangling(&dir));

        let error = inventory(runner).list_logical_volumes().unwrap_err();
        assert!(matches!(error, LvmError::DeviceResolution { ref path, .. } if path.ends_with("lv6")));
    }

    #[test]
    fn skip_policy_keeps_resolvable_volumes() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::default().with_report(LVS, "lv", nine_good_one_dangling(&dir));
        let inventory = LvmInventory::new(
            runner,
            InventoryOptions {
                device_policy: DevicePolicy::SkipUnresolved,
                ..Default::default()
            },
        );

        let lvs = inventory.list_logical_volumes().unwrap();
        assert_eq!(lvs.len(), 9);
        assert!(lvs.iter().all(|lv| lv.name != "lv6"));
    }

    #[test]
    fn skip_policy_still_fails_on_parse_errors() {
        let mut row = lv_json("bad", "/nonexistent");
        row["lv_size"] = json!("big");

        let inventory = LvmInventory::new(
            ScriptedRunner::default().with_report(LVS, "lv", json!([row])),
            InventoryOptions {
                device_policy: DevicePolicy::SkipUnresolved,
                ..Default::default()
            },
        );
        assert!(matches!(
            inventory.list_logical_volumes(),
            Err(LvmError::Parse { .. })
        ));
    }

    #[test]
    fn lists_physical_volumes() {
        let rows = json!([
            {
                "pv_name": "/dev/sda2", "vg_name": "vg0", "pv_uuid": "p1",
                "pv_allocatable": "allocatable", "pv_missing": "", "pv_in_use": "used",
                "pv_size": "1000B", "pv_free": "250B", "pv_used": "750B",
                "dev_size": "1024B", "pv_mda_size": "512B", "pv_mda_free": "256B"
            },
            {
                "pv_name": "/dev/sdb", "vg_name": "", "pv_uuid": "p2",
                "pv_allocatable": "", "pv_missing": "", "pv_in_use": "",
                "pv_size": "2048B", "pv_free": "2048B", "pv_used": "0B",
                "dev_size": "2048B", "pv_mda_size": "512B", "pv_mda_free": "512B"
            }
        ]);
        let inventory = inventory(ScriptedRunner::default().with_report(PVS, "pv", rows));

        let pvs = inventory.list_physical_volumes().unwrap();
        assert_eq!(pvs.len(), 2);
        assert_eq!(pvs[0].used, 750);
        assert_eq!(pvs[1].vg_name, "");
        assert_eq!(
            inventory.runner.calls(),
            ["pvs --options pv_all,vg_name --reportformat json --units b"]
        );
    }

    #[test]
    fn missing_columns_fail_the_listing() {
        let rows = json!([
            {"vg_name": "vg0", "vg_size": "1b", "vg_free": "0b"},
        ]);
        let inventory = inventory(ScriptedRunner::default().with_report(VGS, "vg", rows));
        assert!(matches!(
            inventory.list_volume_groups(),
            Err(LvmError::Parse { .. })
        ));
    }

    #[test]
    fn batched_report_is_a_schema_error() {
        let raw = json!({ "report": [{ "pv": [] }, { "pv": [] }] }).to_string();
        let inventory = inventory(ScriptedRunner::default().with(PVS, raw));
        assert!(matches!(
            inventory.list_physical_volumes(),
            Err(LvmError::Schema { found: 2 })
        ));
    }

    #[test]
    fn listings_fail_independently() {
        let inventory = inventory(ScriptedRunner::default().with_report(PVS, "pv", json!([])));

        assert!(matches!(
            inventory.list_volume_groups(),
            Err(LvmError::Execution { ref command, .. }) if command == VGS
        ));
        assert!(inventory.list_physical_volumes().unwrap().is_empty());
    }

    #[test]
    fn reload_cache_runs_pvscan_first() {
        let runner = ScriptedRunner::default()
            .with(PVSCAN, "")
            .with_report(VGS, "vg", json!([]));
        let inventory = LvmInventory::new(
            runner,
            InventoryOptions {
                reload_cache: true,
                ..Default::default()
            },
        );

        assert!(inventory.list_volume_groups().unwrap().is_empty());
        assert_eq!(
            inventory.runner.calls(),
            [
                "pvscan --cache",
                "vgs --options all --reportformat json --units b"
            ]
        );
    }

    #[test]
    fn failed_cache_reload_aborts_listing() {
        let runner = ScriptedRunner::default().with_report(VGS, "vg", json!([]));
        let inventory = LvmInventory::new(
            runner,
            InventoryOptions {
                reload_cache: true,
                ..Default::default()
            },
        );

        assert!(matches!(
            inventory.list_volume_groups(),
            Err(LvmError::Execution { ref command, .. }) if command == PVSCAN
        ));
        assert_eq!(inventory.runner.calls(), ["pvscan --cache"]);
    }
}
