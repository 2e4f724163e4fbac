// SPDX-License-Identifier: GPL-3.0-only

//! Prometheus rendering of LVM inventory records
//!
//! A [`LvmMetrics`] owns a private registry and lives for one scrape, so
//! volumes that disappear between scrapes never leave stale series.

use std::time::Duration;

use lvm_types::enums::{
    LV_HEALTH_STATUS, LV_PERMISSIONS, LV_WHEN_FULL, RAID_SYNC_ACTION, VG_ALLOCATION_POLICY,
    VG_PERMISSIONS,
};
use lvm_types::{EntityKind, LVM_ENUMS, LogicalVolume, PhysicalVolume, VolumeGroup};
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};

const VG_LABELS: &[&str] = &["name"];
const LV_LABELS: &[&str] = &[
    "name",
    "path",
    "dm_path",
    "vg",
    "device",
    "host",
    "segtype",
    "pool",
    "active_status",
];
const PV_LABELS: &[&str] = &["name", "allocatable", "vg", "missing", "in_use"];

/// One gauge family fed from a record field
struct Gauge<T> {
    name: &'static str,
    help: &'static str,
    /// Enumeration whose code table is appended to the help text
    codes: Option<&'static str>,
    value: fn(&T) -> f64,
}

impl<T> Gauge<T> {
    const fn plain(name: &'static str, help: &'static str, value: fn(&T) -> f64) -> Self {
        Self {
            name,
            help,
            codes: None,
            value,
        }
    }

    const fn coded(
        name: &'static str,
        help: &'static str,
        field: &'static str,
        value: fn(&T) -> f64,
    ) -> Self {
        Self {
            name,
            help,
            codes: Some(field),
            value,
        }
    }

    fn help_text(&self) -> String {
        match self.codes {
            Some(field) => format!("{} {}", self.help, LVM_ENUMS.legend(field)),
            None => self.help.to_string(),
        }
    }
}

const VG_GAUGES: &[Gauge<VolumeGroup>] = &[
    Gauge::plain("lvm_vg_total_bytes", "Total size of the volume group in bytes", |vg| {
        vg.size as f64
    }),
    Gauge::plain("lvm_vg_free_bytes", "Free space of the volume group in bytes", |vg| {
        vg.free as f64
    }),
    Gauge::plain("lvm_vg_used_size_bytes", "Used space of the volume group in bytes", |vg| {
        vg.used as f64
    }),
    Gauge::plain("lvm_vg_lv_count", "Number of logical volumes in the volume group", |vg| {
        f64::from(vg.lv_count)
    }),
    Gauge::plain("lvm_vg_pv_count", "Number of physical volumes in the volume group", |vg| {
        f64::from(vg.pv_count)
    }),
    Gauge::plain("lvm_vg_max_lv_count", "Maximum number of logical volumes, 0 for unlimited", |vg| {
        f64::from(vg.max_lv)
    }),
    Gauge::plain("lvm_vg_max_pv_count", "Maximum number of physical volumes, 0 for unlimited", |vg| {
        f64::from(vg.max_pv)
    }),
    Gauge::plain("lvm_vg_snap_count", "Number of snapshots in the volume group", |vg| {
        f64::from(vg.snap_count)
    }),
    Gauge::plain("lvm_vg_missing_pv_count", "Number of physical volumes reported missing", |vg| {
        f64::from(vg.missing_pv_count)
    }),
    Gauge::plain("lvm_vg_mda_count", "Number of metadata areas", |vg| f64::from(vg.mda_count)),
    Gauge::plain("lvm_vg_mda_used_count", "Number of metadata areas in use", |vg| {
        f64::from(vg.mda_used_count)
    }),
    Gauge::plain("lvm_vg_mda_free_bytes", "Free metadata area space in bytes", |vg| {
        vg.mda_free as f64
    }),
    Gauge::plain("lvm_vg_mda_total_size_bytes", "Size of the smallest metadata area in bytes", |vg| {
        vg.mda_size as f64
    }),
    Gauge::coded("lvm_vg_permission", "Volume group permissions", VG_PERMISSIONS, |vg| {
        f64::from(vg.permission)
    }),
    Gauge::coded(
        "lvm_vg_allocation_policy",
        "Volume group allocation policy",
        VG_ALLOCATION_POLICY,
        |vg| f64::from(vg.allocation_policy),
    ),
];

const LV_GAUGES: &[Gauge<LogicalVolume>] = &[
    Gauge::plain("lvm_lv_total_size_bytes", "Size of the logical volume in bytes", |lv| {
        lv.size as f64
    }),
    Gauge::plain("lvm_lv_used_percent", "Percentage of data space in use", |lv| lv.used_percent),
    Gauge::coded("lvm_lv_permission", "Logical volume permissions", LV_PERMISSIONS, |lv| {
        f64::from(lv.permission)
    }),
    Gauge::coded("lvm_lv_when_full", "Thin pool behaviour when full", LV_WHEN_FULL, |lv| {
        f64::from(lv.when_full)
    }),
    Gauge::coded("lvm_lv_health_status", "Logical volume health", LV_HEALTH_STATUS, |lv| {
        f64::from(lv.health_status)
    }),
    Gauge::coded("lvm_lv_raid_sync_action", "Current RAID sync action", RAID_SYNC_ACTION, |lv| {
        f64::from(lv.raid_sync_action)
    }),
    Gauge::plain("lvm_lv_mda_total_size_bytes", "Thin pool metadata size in bytes", |lv| {
        lv.metadata_size as f64
    }),
    Gauge::plain("lvm_lv_mda_used_percent", "Percentage of thin pool metadata in use", |lv| {
        lv.metadata_used_percent
    }),
    Gauge::plain("lvm_lv_snap_percent", "Percentage of snapshot space in use", |lv| {
        lv.snapshot_used_percent
    }),
];

const PV_GAUGES: &[Gauge<PhysicalVolume>] = &[
    Gauge::plain("lvm_pv_total_size_bytes", "Size of the physical volume in bytes", |pv| {
        pv.size as f64
    }),
    Gauge::plain("lvm_pv_free_size_bytes", "Free space of the physical volume in bytes", |pv| {
        pv.free as f64
    }),
    Gauge::plain("lvm_pv_used_size_bytes", "Allocated space of the physical volume in bytes", |pv| {
        pv.used as f64
    }),
    Gauge::plain("lvm_pv_device_size_bytes", "Size of the underlying device in bytes", |pv| {
        pv.device_size as f64
    }),
    Gauge::plain("lvm_pv_mda_total_size_bytes", "Size of the smallest metadata area in bytes", |pv| {
        pv.mda_size as f64
    }),
    Gauge::plain("lvm_pv_mda_free_size_bytes", "Free metadata area space in bytes", |pv| {
        pv.mda_free as f64
    }),
];

fn vg_labels(vg: &VolumeGroup) -> [&str; 1] {
    [vg.name.as_str()]
}

fn lv_labels(lv: &LogicalVolume) -> [&str; 9] {
    [
        lv.name.as_str(),
        lv.path.as_str(),
        lv.dm_path.as_str(),
        lv.vg_name.as_str(),
        lv.device.as_str(),
        lv.host.as_str(),
        lv.segment_type.as_str(),
        lv.pool_name.as_str(),
        lv.active_status.as_str(),
    ]
}

fn pv_labels(pv: &PhysicalVolume) -> [&str; 5] {
    [
        pv.name.as_str(),
        pv.allocatable.as_str(),
        pv.vg_name.as_str(),
        pv.missing.as_str(),
        pv.in_use.as_str(),
    ]
}

/// Registered gauge vectors of one table, index-aligned with it
struct Family<T: 'static> {
    gauges: &'static [Gauge<T>],
    vecs: Vec<GaugeVec>,
}

impl<T: 'static> Family<T> {
    fn register(
        registry: &Registry,
        gauges: &'static [Gauge<T>],
        labels: &[&str],
    ) -> prometheus::Result<Self> {
        let vecs = gauges
            .iter()
            .map(|gauge| register_gauge_vec(registry, gauge.name, gauge.help_text(), labels))
            .collect::<prometheus::Result<_>>()?;
        Ok(Self { gauges, vecs })
    }

    fn observe(&self, record: &T, labels: &[&str]) {
        for (gauge, vec) in self.gauges.iter().zip(&self.vecs) {
            vec.with_label_values(labels).set((gauge.value)(record));
        }
    }
}

fn register_gauge_vec(
    registry: &Registry,
    name: &str,
    help: String,
    labels: &[&str],
) -> prometheus::Result<GaugeVec> {
    let vec = GaugeVec::new(Opts::new(name, help), labels)?;
    registry.register(Box::new(vec.clone()))?;
    Ok(vec)
}

/// Metric families for a single scrape
pub struct LvmMetrics {
    registry: Registry,
    volume_groups: Family<VolumeGroup>,
    logical_volumes: Family<LogicalVolume>,
    physical_volumes: Family<PhysicalVolume>,
    collector_success: GaugeVec,
    collector_duration: GaugeVec,
}

impl LvmMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        Ok(Self {
            volume_groups: Family::register(&registry, VG_GAUGES, VG_LABELS)?,
            logical_volumes: Family::register(&registry, LV_GAUGES, LV_LABELS)?,
            physical_volumes: Family::register(&registry, PV_GAUGES, PV_LABELS)?,
            collector_success: register_gauge_vec(
                &registry,
                "lvm_exporter_collector_success",
                "Whether the listing succeeded (1 = success, 0 = failure)".to_string(),
                &["collector"],
            )?,
            collector_duration: register_gauge_vec(
                &registry,
                "lvm_exporter_collector_duration_seconds",
                "Time spent running and parsing the listing".to_string(),
                &["collector"],
            )?,
            registry,
        })
    }

    pub fn observe_volume_groups(&self, groups: &[VolumeGroup]) {
        for vg in groups {
            self.volume_groups.observe(vg, &vg_labels(vg));
        }
    }

    pub fn observe_logical_volumes(&self, volumes: &[LogicalVolume]) {
        for lv in volumes {
            self.logical_volumes.observe(lv, &lv_labels(lv));
        }
    }

    pub fn observe_physical_volumes(&self, volumes: &[PhysicalVolume]) {
        for pv in volumes {
            self.physical_volumes.observe(pv, &pv_labels(pv));
        }
    }

    /// Record the outcome of one listing
    pub fn observe_collector(&self, kind: EntityKind, success: bool, elapsed: Duration) {
        let labels = [kind.short_name()];
        self.collector_success
            .with_label_values(&labels)
            .set(if success { 1.0 } else { 0.0 });
        self.collector_duration
            .with_label_values(&labels)
            .set(elapsed.as_secs_f64());
    }

    /// Text exposition of everything observed so far
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|error| prometheus::Error::Msg(format!("non UTF-8 exposition: {error}")))
    }
}
