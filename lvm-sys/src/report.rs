// SPDX-License-Identifier: GPL-3.0-only

//! Decoding of `--reportformat json` output
//!
//! The LVM tools wrap their rows as
//! `{"report": [{"vg": [{"vg_name": "vg0", ...}, ...]}]}`, every value a
//! string. Only a single report per invocation is accepted.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{LvmError, Result};

/// One entity's columns, keyed by LVM field name
pub type ReportRow = HashMap<String, String>;

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    report: Vec<HashMap<String, Value>>,
}

/// Extract the rows stored under `key` (e.g. "lv") from a JSON report
///
/// Rows keep the order the tool emitted them in. A report without `key`
/// yields no rows.
pub fn decode_report(raw: &[u8], key: &str) -> Result<Vec<ReportRow>> {
    let envelope: Envelope = serde_json::from_slice(raw)?;

    let [mut report] = <[_; 1]>::try_from(envelope.report).map_err(|reports| LvmError::Schema {
        found: reports.len(),
    })?;

    match report.remove(key) {
        Some(rows) => Ok(serde_json::from_value(rows)?),
        None => Ok(Vec::new()),
    }
}
