// SPDX-License-Identifier: GPL-3.0-only

//! Conversion of report columns into typed record fields
//!
//! Each entity parser declares a static table of [`Field`]s naming the
//! column, how to convert it, and where to store the result. [`apply`] walks
//! such a table against one report row.

use lvm_types::{EntityKind, EnumTable};

use crate::error::{LvmError, Result};
use crate::report::ReportRow;

/// How a column is converted and where the value lands
pub enum Conversion<T> {
    /// Copied verbatim
    Text(fn(&mut T, String)),
    /// Base-10 count
    Count(fn(&mut T, u32)),
    /// Byte quantity with an optional trailing `b`/`B`
    Bytes(fn(&mut T, u64)),
    /// Percentage, empty means 0
    Percent(fn(&mut T, f64)),
    /// Enumeration code from the [`EnumTable`]
    Enum(fn(&mut T, i32)),
}

/// One entry of an entity's conversion table
pub struct Field<T> {
    pub name: &'static str,
    conversion: Conversion<T>,
    /// When set and false for a row, the column is not read and the target
    /// keeps its default value
    guard: Option<fn(&ReportRow) -> bool>,
}

impl<T> Field<T> {
    pub const fn text(name: &'static str, set: fn(&mut T, String)) -> Self {
        Self::new(name, Conversion::Text(set))
    }

    pub const fn count(name: &'static str, set: fn(&mut T, u32)) -> Self {
        Self::new(name, Conversion::Count(set))
    }

    pub const fn bytes(name: &'static str, set: fn(&mut T, u64)) -> Self {
        Self::new(name, Conversion::Bytes(set))
    }

    pub const fn percent(name: &'static str, set: fn(&mut T, f64)) -> Self {
        Self::new(name, Conversion::Percent(set))
    }

    pub const fn enumerated(name: &'static str, set: fn(&mut T, i32)) -> Self {
        Self::new(name, Conversion::Enum(set))
    }

    /// Byte quantity only read when `guard` holds for the row
    pub const fn bytes_if(
        name: &'static str,
        guard: fn(&ReportRow) -> bool,
        set: fn(&mut T, u64),
    ) -> Self {
        Self {
            name,
            conversion: Conversion::Bytes(set),
            guard: Some(guard),
        }
    }

    const fn new(name: &'static str, conversion: Conversion<T>) -> Self {
        Self {
            name,
            conversion,
            guard: None,
        }
    }
}

/// Identifies the entity a row belongs to, for error reporting
pub struct FieldContext<'a> {
    kind: EntityKind,
    entity: &'a str,
    enums: &'a EnumTable,
}

impl<'a> FieldContext<'a> {
    pub fn new(kind: EntityKind, row: &'a ReportRow, enums: &'a EnumTable) -> Self {
        Self {
            kind,
            entity: raw_value(row, kind.name_field()),
            enums,
        }
    }

    pub fn invalid(&self, field: &str, value: &str, reason: impl ToString) -> LvmError {
        LvmError::Parse {
            kind: self.kind,
            entity: self.entity.to_string(),
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    /// `size - free`, failing on the `free_field` column if free exceeds size
    pub fn used(&self, size: u64, free: u64, free_field: &str, row: &ReportRow) -> Result<u64> {
        size.checked_sub(free).ok_or_else(|| {
            self.invalid(
                free_field,
                raw_value(row, free_field),
                format!("free space exceeds total size of {size} bytes"),
            )
        })
    }
}

/// Column value, absent columns reading as the empty string
pub fn raw_value<'a>(row: &'a ReportRow, field: &str) -> &'a str {
    row.get(field).map(String::as_str).unwrap_or_default()
}

/// Run every conversion in `fields` against `row`, storing into `target`
///
/// Stops at the first column that fails to convert.
pub fn apply<T>(
    target: &mut T,
    row: &ReportRow,
    fields: &[Field<T>],
    ctx: &FieldContext<'_>,
) -> Result<()> {
    for field in fields {
        if let Some(guard) = field.guard
            && !guard(row)
        {
            continue;
        }

        let raw = raw_value(row, field.name);
        match field.conversion {
            Conversion::Text(set) => set(target, raw.to_string()),
            Conversion::Count(set) => {
                let value = parse_count(raw).map_err(|e| ctx.invalid(field.name, raw, e))?;
                set(target, value);
            }
            Conversion::Bytes(set) => {
                let value = parse_bytes(raw).map_err(|e| ctx.invalid(field.name, raw, e))?;
                set(target, value);
            }
            Conversion::Percent(set) => {
                let value = parse_percent(raw).map_err(|e| ctx.invalid(field.name, raw, e))?;
                set(target, value);
            }
            Conversion::Enum(set) => set(target, ctx.enums.code(field.name, raw)),
        }
    }
    Ok(())
}

pub fn parse_count(raw: &str) -> std::result::Result<u32, std::num::ParseIntError> {
    raw.parse()
}

/// Parse `<digits>b` (any case) into a byte count; the suffix may be omitted
pub fn parse_bytes(raw: &str) -> std::result::Result<u64, std::num::ParseIntError> {
    raw.strip_suffix(['b', 'B']).unwrap_or(raw).parse()
}

pub fn parse_percent(raw: &str) -> std::result::Result<f64, std::num::ParseFloatError> {
    if raw.is_empty() {
        return Ok(0.0);
    }
    raw.parse()
}
