// SPDX-License-Identifier: GPL-3.0-only

//! Enumerated LVM report fields
//!
//! Some report columns carry one of a small, fixed set of strings. They are
//! exported as integer codes: the position of the value in the catalog list,
//! or [`UNDEFINED`] when the value is not listed.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::Deserialize;
use tracing::error;

/// Code reported for a value missing from its catalog list
pub const UNDEFINED: i32 = -1;

pub const LV_PERMISSIONS: &str = "lv_permissions";
pub const LV_WHEN_FULL: &str = "lv_when_full";
pub const LV_HEALTH_STATUS: &str = "lv_health_status";
pub const RAID_SYNC_ACTION: &str = "raid_sync_action";
pub const VG_PERMISSIONS: &str = "vg_permissions";
pub const VG_ALLOCATION_POLICY: &str = "vg_allocation_policy";

// Load the catalog at compile time from the crate resources directory
const ENUMS_TOML: &str = include_str!("../resources/enums.toml");

#[derive(Deserialize)]
struct EnumCatalog {
    fields: Vec<EnumField>,
}

#[derive(Deserialize)]
struct EnumField {
    name: String,
    values: Vec<String>,
}

/// Read-only mapping from field name to its ordered list of recognised values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumTable {
    fields: HashMap<String, Vec<String>>,
}

impl EnumTable {
    /// Parse a catalog in the `[[fields]] name = .. values = [..]` layout
    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        let catalog: EnumCatalog = toml::from_str(raw)?;
        let fields = catalog
            .fields
            .into_iter()
            .map(|field| (field.name, field.values))
            .collect();
        Ok(Self { fields })
    }

    /// Code for `value` of `field`, or [`UNDEFINED`]
    ///
    /// Fields without a catalog entry always yield [`UNDEFINED`].
    pub fn code(&self, field: &str, value: &str) -> i32 {
        self.values(field)
            .iter()
            .position(|known| known == value)
            .map_or(UNDEFINED, |index| index as i32)
    }

    /// Recognised values of `field`, in code order
    pub fn values(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    /// Human readable code legend, e.g. `[-1: undefined], [0: writeable], [1: read-only]`
    pub fn legend(&self, field: &str) -> String {
        let mut entries = vec![format!("[{UNDEFINED}: undefined]")];
        for (index, value) in self.values(field).iter().enumerate() {
            if value.is_empty() {
                entries.push(format!("[{index}: \"\"]"));
            } else {
                entries.push(format!("[{index}: {value}]"));
            }
        }
        entries.join(", ")
    }
}

/// The process-wide enumeration table, parsed once on first use
pub static LVM_ENUMS: LazyLock<EnumTable> = LazyLock::new(|| load_catalog(ENUMS_TOML));

/// Parse the bundled catalog, falling back to an empty table
///
/// An empty table reports every enumerated field as [`UNDEFINED`].
fn load_catalog(raw: &str) -> EnumTable {
    EnumTable::from_toml(raw).unwrap_or_else(|e| {
        error!("Failed to parse enumeration catalog, all enum fields will be undefined: {e}");
        EnumTable::default()
    })
}
