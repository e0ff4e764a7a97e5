//! Cell values for [`Table`] columns.
//!
//! [`Table`]: crate::table::Table

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::traits::IntoDatumType;

pub mod operations;

/// Strings read as missing values, following the common conventions of
/// spreadsheet and data frame exports.
pub const MISSING_VALUES: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL"];

/// These are core supported data types stored in an `enum`, to
/// unify the types that come out of reading delimited measurement
/// files, where column types are only known at runtime.
///
/// In the transport form this is serialized untagged: integers and
/// floats as JSON numbers, strings as JSON strings, and
/// [`DatumType::NoValue`] as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DatumType {
    Integer64(i64),
    Float64(f64),
    String(String),
    NoValue,
}

impl DatumType {
    /// Numeric view of this value. Missing values are `NaN`, strings are `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DatumType::Integer64(val) => Some(*val as f64),
            DatumType::Float64(val) => Some(*val),
            DatumType::NoValue => Some(f64::NAN),
            DatumType::String(_) => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, DatumType::NoValue)
    }

    /// Round floats to `decimals` places; other types pass through.
    pub fn round(&self, decimals: u32) -> DatumType {
        match self {
            DatumType::Float64(val) => {
                let factor = 10f64.powi(decimals as i32);
                DatumType::Float64((val * factor).round() / factor)
            }
            other => other.clone(),
        }
    }

    /// Build a float value, storing non-finite results as [`DatumType::NoValue`].
    pub fn from_f64(val: f64) -> DatumType {
        if val.is_finite() {
            DatumType::Float64(val)
        } else {
            DatumType::NoValue
        }
    }
}

impl fmt::Display for DatumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatumType::Integer64(val) => write!(f, "{}", val),
            DatumType::Float64(val) => write!(f, "{}", val),
            DatumType::String(val) => write!(f, "{}", val),
            DatumType::NoValue => Ok(()),
        }
    }
}

/// The inferred type of a column of raw strings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ColumnType {
    Integer,
    Float,
    String,
}

/// Infer a single type for a column of raw cells. Missing cells do not
/// constrain the type; a column of only missing cells is a float column.
pub fn infer_column_type<S: AsRef<str>>(cells: &[S]) -> ColumnType {
    let mut column_type = ColumnType::Integer;
    for cell in cells {
        let cell = cell.as_ref().trim();
        if MISSING_VALUES.contains(&cell) {
            continue;
        }
        if column_type == ColumnType::Integer && cell.parse::<i64>().is_ok() {
            continue;
        }
        if cell.parse::<f64>().is_ok() {
            column_type = ColumnType::Float;
            continue;
        }
        return ColumnType::String;
    }
    if cells
        .iter()
        .all(|cell| MISSING_VALUES.contains(&cell.as_ref().trim()))
    {
        return ColumnType::Float;
    }
    column_type
}

/// Convert raw cells into values of a common type.
pub fn parse_column<S: AsRef<str>>(cells: &[S]) -> Vec<DatumType> {
    let column_type = infer_column_type(cells);
    cells
        .iter()
        .map(|cell| {
            let raw = cell.as_ref();
            let trimmed = raw.trim();
            if MISSING_VALUES.contains(&trimmed) {
                return DatumType::NoValue;
            }
            match column_type {
                ColumnType::Integer => trimmed
                    .parse::<i64>()
                    .map_or(DatumType::NoValue, DatumType::Integer64),
                ColumnType::Float => trimmed
                    .parse::<f64>()
                    .map_or(DatumType::NoValue, DatumType::from_f64),
                ColumnType::String => DatumType::String(raw.to_string()),
            }
        })
        .collect()
}

impl IntoDatumType for f64 {
    fn into_data_type(self) -> DatumType {
        DatumType::from_f64(self)
    }
}

impl IntoDatumType for i64 {
    fn into_data_type(self) -> DatumType {
        DatumType::Integer64(self)
    }
}

impl IntoDatumType for String {
    fn into_data_type(self) -> DatumType {
        DatumType::String(self)
    }
}

impl IntoDatumType for &str {
    fn into_data_type(self) -> DatumType {
        DatumType::String(self.to_string())
    }
}

impl<T: IntoDatumType> IntoDatumType for Option<T> {
    fn into_data_type(self) -> DatumType {
        self.map_or(DatumType::NoValue, |val| val.into_data_type())
    }
}

// Conversion from field types to `DatumType`
impl<T: IntoDatumType> From<T> for DatumType {
    fn from(item: T) -> Self {
        item.into_data_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_integer_column() {
        assert_eq!(infer_column_type(&["1", "2", "", "40"]), ColumnType::Integer);
    }

    #[test]
    fn test_infer_float_column() {
        assert_eq!(infer_column_type(&["1", "2.5", "NA"]), ColumnType::Float);
    }

    #[test]
    fn test_infer_string_column() {
        assert_eq!(infer_column_type(&["thrL", "2", "3"]), ColumnType::String);
    }

    #[test]
    fn test_parse_column_missing() {
        let values = parse_column(&["1", "", "3"]);
        assert_eq!(
            values,
            vec![
                DatumType::Integer64(1),
                DatumType::NoValue,
                DatumType::Integer64(3)
            ]
        );
    }

    #[test]
    fn test_parse_column_non_finite_is_missing() {
        let values = parse_column(&["1.5", "inf"]);
        assert_eq!(values, vec![DatumType::Float64(1.5), DatumType::NoValue]);
    }

    #[test]
    fn test_round() {
        assert_eq!(
            DatumType::Float64(0.123456).round(3),
            DatumType::Float64(0.123)
        );
        assert_eq!(DatumType::Integer64(7).round(3), DatumType::Integer64(7));
    }

    #[test]
    fn test_untagged_json() {
        let values = vec![
            DatumType::Integer64(3),
            DatumType::Float64(3.0),
            DatumType::String("dnaA".to_string()),
            DatumType::NoValue,
        ];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[3,3.0,"dnaA",null]"#);
        let back: Vec<DatumType> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, values);
    }
}
