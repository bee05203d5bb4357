//! Declarative column schemas.
//!
//! A [`Schema`] describes one GeoNames file layout: how many raw fields a line
//! carries, how they are separated, and which typed columns are produced from
//! them. Columns usually map one raw field; a few are derived (a point built
//! from latitude/longitude, a `class.code` field split in two).

use crate::storage::Table;

/// Field separator convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Tab-separated, no quoting: a `"` is an ordinary character.
    Tab,
    /// Tab-separated with `"`-quoted fields that may contain tabs and doubled quotes.
    QuotedTab,
}

/// Type a raw field is coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Unbounded text
    Text,
    /// Text of at most `n` characters
    Code(usize),
    /// 32-bit integer
    Integer,
    /// 64-bit integer
    BigInt,
    /// Decimal rounded to the given number of fractional digits
    Decimal(u32),
    /// `1` for true, empty or `0` for false
    Flag,
    /// `YYYY-MM-DD`
    Date,
    /// Point synthesized from two decimal columns
    Point,
}

/// Where a column's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// The raw field at this index
    Field(usize),
    /// The part of the raw field before the first `separator` (empty if there is none)
    Before(usize, char),
    /// The part of the raw field after the first `separator` (the whole field if there is none)
    After(usize, char),
    /// Built from two previously parsed decimal columns, by name
    Point {
        latitude: &'static str,
        longitude: &'static str,
    },
}

/// What to do with a reference value that has no matching row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnMissing {
    /// Store NULL instead.
    Null,
    /// Fail the import (or skip the row when unknown references are tolerated).
    Reject,
}

/// Foreign key declared by a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub table: Table,
    pub column: &'static str,
    pub on_missing: OnMissing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub nullable: bool,
    pub source: Source,
    pub reference: Option<Reference>,
}

impl Column {
    /// Non-null column read from raw field `index`.
    pub const fn required(name: &'static str, kind: ColumnKind, index: usize) -> Self {
        Column {
            name,
            kind,
            nullable: false,
            source: Source::Field(index),
            reference: None,
        }
    }

    /// Nullable column read from raw field `index`; empty means NULL.
    pub const fn optional(name: &'static str, kind: ColumnKind, index: usize) -> Self {
        Column {
            name,
            kind,
            nullable: true,
            source: Source::Field(index),
            reference: None,
        }
    }

    pub const fn derived(name: &'static str, kind: ColumnKind, source: Source) -> Self {
        Column {
            name,
            kind,
            nullable: false,
            source,
            reference: None,
        }
    }

    pub const fn references(
        self,
        table: Table,
        column: &'static str,
        on_missing: OnMissing,
    ) -> Self {
        Column {
            reference: Some(Reference {
                table,
                column,
                on_missing,
            }),
            ..self
        }
    }

    /// True when the column maps a raw field one-to-one.
    pub fn is_direct(&self) -> bool {
        matches!(self.source, Source::Field(_))
    }
}

/// Layout of one GeoNames file type.
#[derive(Debug, PartialEq)]
pub struct Schema {
    /// Human-readable format name used in logs.
    pub name: &'static str,
    pub table: Table,
    pub dialect: Dialect,
    /// Number of raw fields per line.
    pub fields: usize,
    /// The first line is a column header.
    pub header: bool,
    /// Output columns, in the order they are bound into the target table.
    pub columns: &'static [Column],
}

impl Schema {
    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Columns declaring a foreign key, with their position.
    pub fn references(&self) -> impl Iterator<Item = (usize, &'static Column)> + '_ {
        let columns: &'static [Column] = self.columns;
        columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.reference.is_some())
    }
}
