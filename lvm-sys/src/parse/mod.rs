// SPDX-License-Identifier: GPL-3.0-only

//! Entity parsers: one report row in, one typed record out

pub mod lv;
pub mod pv;
pub mod vg;

pub use lv::parse_logical_volume;
pub use pv::parse_physical_volume;
pub use vg::parse_volume_group;

#[cfg(test)]
pub(crate) fn row(pairs: &[(&str, &str)]) -> crate::report::ReportRow {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}
