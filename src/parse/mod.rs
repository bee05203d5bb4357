//! GeoNames line parsing.
//!
//! Every file layout is described by a static [`Schema`] (see [`formats`]);
//! one generic [`parse_line`] turns a raw line into a typed [`Record`]:
//! - splits the line on tabs, honouring quotes for [`Dialect::QuotedTab`] layouts
//! - checks the field count
//! - coerces each field to its column type
//! - synthesizes derived columns (geographic points, split codes)

mod formats;
mod schema;
mod value;

use std::borrow::Cow;

use chrono::NaiveDate;
use thiserror::Error;

pub use formats::{
    FileFormat, ALTERNATE_NAMES, ALTERNATE_NAMES_V2, COUNTRY, FEATURE, GEONAME, HIERARCHY,
    POSTAL_CODE, TIMEZONE,
};
pub use schema::{Column, ColumnKind, Dialect, OnMissing, Reference, Schema, Source};
pub use value::{BoundingBox, GeoPoint, Value};

/// Why a single line was rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("expected {expected} fields, found {found}")]
    ColumnCount { expected: usize, found: usize },

    #[error("{column}: {value:?} is not a valid number")]
    InvalidNumber { column: &'static str, value: String },

    #[error("{column}: value is required")]
    Missing { column: &'static str },

    #[error("{column}: {value:?} is longer than {max} characters")]
    TooLong {
        column: &'static str,
        value: String,
        max: usize,
    },

    #[error("{column}: ({latitude}, {longitude}) is not a valid latitude/longitude")]
    InvalidPoint {
        column: &'static str,
        latitude: String,
        longitude: String,
    },

    #[error("{column}: {value:?} is not a YYYY-MM-DD date")]
    InvalidDate { column: &'static str, value: String },

    #[error("{column}: {value:?} is not a flag (expected 1, 0 or empty)")]
    InvalidFlag { column: &'static str, value: String },

    #[error("malformed quoting: {0}")]
    Quoting(String),
}

/// One parsed line: typed values in [`Schema::columns`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: &'static Schema,
    values: Vec<Value>,
    line: u64,
}

impl Record {
    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    /// 1-based line number in the source file.
    pub fn line(&self) -> u64 {
        self.line
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schema.index_of(name).map(|i| &self.values[i])
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Replaces the value at column `index`. Out-of-range indexes are ignored.
    pub fn set(&mut self, index: usize, value: Value) {
        if let Some(slot) = self.values.get_mut(index) {
            *slot = value;
        }
    }

    /// `(column name, value)` pairs, derived columns included.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> + '_ {
        self.schema.column_names().zip(self.values.iter())
    }

    /// Re-renders the raw fields this record was parsed from.
    ///
    /// Fields feeding only derived columns are rebuilt where possible (a split
    /// `class.code` field is joined back); fields not mapped to any column come
    /// back empty.
    pub fn to_fields(&self) -> Vec<String> {
        let mut fields = vec![String::new(); self.schema.fields];
        let mut before: Vec<Option<(char, String)>> = vec![None; self.schema.fields];
        for (column, value) in self.schema.columns.iter().zip(&self.values) {
            match column.source {
                Source::Field(i) => fields[i] = value.to_field(),
                Source::Before(i, sep) => before[i] = Some((sep, value.to_field())),
                Source::After(i, _) => fields[i] = value.to_field(),
                Source::Point { .. } => {}
            }
        }
        for (i, prefix) in before.into_iter().enumerate() {
            if let Some((sep, prefix)) = prefix {
                if !prefix.is_empty() {
                    fields[i] = format!("{prefix}{sep}{}", fields[i]);
                }
            }
        }
        fields
    }
}

/// Splits a line into raw fields according to the dialect.
pub fn split_fields(dialect: Dialect, line: &str) -> Result<Vec<Cow<'_, str>>, FieldError> {
    match dialect {
        Dialect::Tab => Ok(line.split('\t').map(Cow::Borrowed).collect()),
        Dialect::QuotedTab => {
            let mut reader = csv::ReaderBuilder::new()
                .delimiter(b'\t')
                .has_headers(false)
                .flexible(true)
                .from_reader(line.as_bytes());
            match reader.records().next() {
                Some(Ok(record)) => Ok(record
                    .iter()
                    .map(|field| Cow::Owned(field.to_string()))
                    .collect()),
                Some(Err(e)) => Err(FieldError::Quoting(e.to_string())),
                None => Ok(vec![Cow::Borrowed("")]),
            }
        }
    }
}

/// Parses one line of `schema`'s layout.
///
/// `line_no` is only recorded on the resulting [`Record`]; callers attach file
/// context to errors themselves.
pub fn parse_line(
    schema: &'static Schema,
    line: &str,
    line_no: u64,
) -> Result<Record, FieldError> {
    let fields = split_fields(schema.dialect, line)?;
    if fields.len() != schema.fields {
        return Err(FieldError::ColumnCount {
            expected: schema.fields,
            found: fields.len(),
        });
    }

    let mut values = Vec::with_capacity(schema.columns.len());
    for column in schema.columns {
        let value = match column.source {
            Source::Field(i) => coerce(column, &fields[i])?,
            Source::Before(i, sep) => {
                let raw = fields[i].split_once(sep).map_or("", |(before, _)| before);
                coerce(column, raw)?
            }
            Source::After(i, sep) => {
                let raw = fields[i]
                    .split_once(sep)
                    .map_or(fields[i].as_ref(), |(_, after)| after);
                coerce(column, raw)?
            }
            Source::Point {
                latitude,
                longitude,
            } => synthesize_point(column, schema, &values, latitude, longitude)?,
        };
        values.push(value);
    }

    Ok(Record {
        schema,
        values,
        line: line_no,
    })
}

fn coerce(column: &Column, raw: &str) -> Result<Value, FieldError> {
    if raw.is_empty() {
        if column.nullable {
            return Ok(Value::Null);
        }
        return match column.kind {
            ColumnKind::Text | ColumnKind::Code(_) => Ok(Value::Text(String::new())),
            ColumnKind::Flag => Ok(Value::Flag(false)),
            _ => Err(FieldError::Missing {
                column: column.name,
            }),
        };
    }

    let invalid_number = || FieldError::InvalidNumber {
        column: column.name,
        value: raw.to_string(),
    };

    match column.kind {
        ColumnKind::Text => Ok(Value::Text(raw.to_string())),
        ColumnKind::Code(max) => {
            if raw.chars().count() > max {
                Err(FieldError::TooLong {
                    column: column.name,
                    value: raw.to_string(),
                    max,
                })
            } else {
                Ok(Value::Text(raw.to_string()))
            }
        }
        ColumnKind::Integer => raw
            .trim()
            .parse::<i32>()
            .map(|i| Value::Integer(i64::from(i)))
            .map_err(|_| invalid_number()),
        ColumnKind::BigInt => raw
            .trim()
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| invalid_number()),
        ColumnKind::Decimal(scale) => {
            let parsed: f64 = raw.trim().parse().map_err(|_| invalid_number())?;
            if !parsed.is_finite() {
                return Err(invalid_number());
            }
            let factor = 10f64.powi(scale as i32);
            Ok(Value::Decimal((parsed * factor).round() / factor))
        }
        ColumnKind::Flag => match raw.trim() {
            "1" => Ok(Value::Flag(true)),
            "0" => Ok(Value::Flag(false)),
            _ => Err(FieldError::InvalidFlag {
                column: column.name,
                value: raw.to_string(),
            }),
        },
        ColumnKind::Date => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map(Value::Date)
            .map_err(|_| FieldError::InvalidDate {
                column: column.name,
                value: raw.to_string(),
            }),
        ColumnKind::Point => GeoPoint::from_wkt(raw)
            .map(Value::Point)
            .ok_or_else(|| FieldError::InvalidPoint {
                column: column.name,
                latitude: String::new(),
                longitude: raw.to_string(),
            }),
    }
}

fn synthesize_point(
    column: &Column,
    schema: &Schema,
    parsed: &[Value],
    latitude: &str,
    longitude: &str,
) -> Result<Value, FieldError> {
    let lookup = |name: &str| schema.index_of(name).and_then(|i| parsed.get(i));
    let (lat, lon) = match (lookup(latitude), lookup(longitude)) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => {
            return Err(FieldError::Missing {
                column: column.name,
            })
        }
    };
    if lat.is_null() || lon.is_null() {
        return if column.nullable {
            Ok(Value::Null)
        } else {
            Err(FieldError::Missing {
                column: column.name,
            })
        };
    }
    lat.as_f64()
        .zip(lon.as_f64())
        .and_then(|(lat, lon)| GeoPoint::new(lat, lon))
        .map(Value::Point)
        .ok_or_else(|| FieldError::InvalidPoint {
            column: column.name,
            latitude: lat.to_field(),
            longitude: lon.to_field(),
        })
}
