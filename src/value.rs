use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};

use crate::error::EasySqlError;

/// A single result-set cell, normalized across drivers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
    Timestamp(NaiveDateTime),
    Decimal(Decimal),
}

impl SqlValue {
    pub fn as_bool(&self) -> Option<bool> {
        if let SqlValue::Bool(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        if let SqlValue::Int(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        if let SqlValue::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        if let SqlValue::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        if let SqlValue::Blob(value) = self {
            Some(value)
        } else {
            None
        }
    }

    pub fn as_timestamp(&self) -> Option<&NaiveDateTime> {
        if let SqlValue::Timestamp(value) = self {
            Some(value)
        } else {
            None
        }
    }

    pub fn as_decimal(&self) -> Option<&Decimal> {
        if let SqlValue::Decimal(value) = self {
            Some(value)
        } else {
            None
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Bool(_) => "bool",
            SqlValue::Int(_) => "integer",
            SqlValue::Float(_) => "float",
            SqlValue::Text(_) => "text",
            SqlValue::Blob(_) => "blob",
            SqlValue::Timestamp(_) => "timestamp",
            SqlValue::Decimal(_) => "decimal",
        }
    }
}

/// A bindable statement parameter.
///
/// Each variant maps to one narrow driver binding call; `Other` is the
/// generic fallback for values with no dedicated binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlParam {
    Bool(bool),
    TinyInt(i8),
    Double(f64),
    Float(f32),
    Int(i32),
    BigInt(i64),
    SmallInt(i16),
    Text(String),
    Char(char),
    Timestamp(NaiveDateTime),
    Decimal(Decimal),
    Array(ArrayParam),
    Null,
    Other(serde_json::Value),
}

impl From<bool> for SqlParam {
    fn from(value: bool) -> Self {
        SqlParam::Bool(value)
    }
}

impl From<i8> for SqlParam {
    fn from(value: i8) -> Self {
        SqlParam::TinyInt(value)
    }
}

impl From<i16> for SqlParam {
    fn from(value: i16) -> Self {
        SqlParam::SmallInt(value)
    }
}

impl From<i32> for SqlParam {
    fn from(value: i32) -> Self {
        SqlParam::Int(value)
    }
}

impl From<i64> for SqlParam {
    fn from(value: i64) -> Self {
        SqlParam::BigInt(value)
    }
}

impl From<f32> for SqlParam {
    fn from(value: f32) -> Self {
        SqlParam::Float(value)
    }
}

impl From<f64> for SqlParam {
    fn from(value: f64) -> Self {
        SqlParam::Double(value)
    }
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        SqlParam::Text(value.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(value: String) -> Self {
        SqlParam::Text(value)
    }
}

impl From<char> for SqlParam {
    fn from(value: char) -> Self {
        SqlParam::Char(value)
    }
}

impl From<NaiveDateTime> for SqlParam {
    fn from(value: NaiveDateTime) -> Self {
        SqlParam::Timestamp(value)
    }
}

impl From<Decimal> for SqlParam {
    fn from(value: Decimal) -> Self {
        SqlParam::Decimal(value)
    }
}

impl From<ArrayParam> for SqlParam {
    fn from(value: ArrayParam) -> Self {
        SqlParam::Array(value)
    }
}

impl From<serde_json::Value> for SqlParam {
    fn from(value: serde_json::Value) -> Self {
        SqlParam::Other(value)
    }
}

/// An ordered list of values bound as one set-membership parameter.
///
/// The element type names the database type of the target column, e.g.
/// `"int4"` or `"varchar"`. Values are read once by the binder and resolved
/// through the connection's array constructor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayParam {
    element_type: String,
    values: Vec<SqlParam>,
}

impl ArrayParam {
    /// Start an empty array parameter for the given element database type.
    pub fn of(element_type: impl Into<String>) -> Self {
        ArrayParam {
            element_type: element_type.into(),
            values: Vec::new(),
        }
    }

    /// Build an array parameter from an existing value sequence.
    pub fn of_values<I, V>(element_type: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlParam>,
    {
        ArrayParam {
            element_type: element_type.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Append one value, consuming and returning the builder.
    pub fn push(mut self, value: impl Into<SqlParam>) -> Self {
        self.values.push(value.into());
        self
    }

    pub fn element_type(&self) -> &str {
        &self.element_type
    }

    pub fn values(&self) -> &[SqlParam] {
        &self.values
    }
}

/// Conversion from a result cell into a concrete Rust type.
///
/// Used by the scalar query and typed generated-key paths. Conversions are
/// strict: a lossy numeric narrowing fails with `TypeMismatch` instead of
/// truncating.
pub trait FromSqlValue: Sized {
    fn from_sql_value(value: SqlValue) -> Result<Self, EasySqlError>;
}

fn mismatch(expected: &'static str, value: &SqlValue) -> EasySqlError {
    EasySqlError::TypeMismatch {
        expected,
        found: value.type_name().to_string(),
    }
}

fn narrow_mismatch(expected: &'static str) -> EasySqlError {
    EasySqlError::TypeMismatch {
        expected,
        found: "out-of-range integer".to_string(),
    }
}

impl FromSqlValue for SqlValue {
    fn from_sql_value(value: SqlValue) -> Result<Self, EasySqlError> {
        Ok(value)
    }
}

impl FromSqlValue for bool {
    fn from_sql_value(value: SqlValue) -> Result<Self, EasySqlError> {
        match value {
            SqlValue::Bool(v) => Ok(v),
            // Drivers without a boolean type surface 0/1 integers.
            SqlValue::Int(0) => Ok(false),
            SqlValue::Int(1) => Ok(true),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl FromSqlValue for i64 {
    fn from_sql_value(value: SqlValue) -> Result<Self, EasySqlError> {
        match value {
            SqlValue::Int(v) => Ok(v),
            other => Err(mismatch("i64", &other)),
        }
    }
}

impl FromSqlValue for i32 {
    fn from_sql_value(value: SqlValue) -> Result<Self, EasySqlError> {
        match value {
            SqlValue::Int(v) => i32::try_from(v).map_err(|_| narrow_mismatch("i32")),
            other => Err(mismatch("i32", &other)),
        }
    }
}

impl FromSqlValue for i16 {
    fn from_sql_value(value: SqlValue) -> Result<Self, EasySqlError> {
        match value {
            SqlValue::Int(v) => i16::try_from(v).map_err(|_| narrow_mismatch("i16")),
            other => Err(mismatch("i16", &other)),
        }
    }
}

impl FromSqlValue for i8 {
    fn from_sql_value(value: SqlValue) -> Result<Self, EasySqlError> {
        match value {
            SqlValue::Int(v) => i8::try_from(v).map_err(|_| narrow_mismatch("i8")),
            other => Err(mismatch("i8", &other)),
        }
    }
}

impl FromSqlValue for f64 {
    fn from_sql_value(value: SqlValue) -> Result<Self, EasySqlError> {
        match value {
            SqlValue::Float(v) => Ok(v),
            SqlValue::Int(v) => Ok(v as f64),
            other => Err(mismatch("f64", &other)),
        }
    }
}

impl FromSqlValue for f32 {
    fn from_sql_value(value: SqlValue) -> Result<Self, EasySqlError> {
        match value {
            SqlValue::Float(v) if f64::from(v as f32) == v => Ok(v as f32),
            SqlValue::Float(_) => Err(EasySqlError::TypeMismatch {
                expected: "f32",
                found: "out-of-range float".to_string(),
            }),
            other => Err(mismatch("f32", &other)),
        }
    }
}

impl FromSqlValue for String {
    fn from_sql_value(value: SqlValue) -> Result<Self, EasySqlError> {
        match value {
            SqlValue::Text(v) => Ok(v),
            other => Err(mismatch("String", &other)),
        }
    }
}

impl FromSqlValue for Vec<u8> {
    fn from_sql_value(value: SqlValue) -> Result<Self, EasySqlError> {
        match value {
            SqlValue::Blob(v) => Ok(v),
            other => Err(mismatch("Vec<u8>", &other)),
        }
    }
}

impl FromSqlValue for NaiveDateTime {
    fn from_sql_value(value: SqlValue) -> Result<Self, EasySqlError> {
        match value {
            SqlValue::Timestamp(v) => Ok(v),
            SqlValue::Text(s) => NaiveDateTime::parse_from_str(&s, "%F %T%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(&s, "%F %T"))
                .map_err(|_| EasySqlError::TypeMismatch {
                    expected: "timestamp",
                    found: format!("text {s:?}"),
                }),
            other => Err(mismatch("timestamp", &other)),
        }
    }
}

impl FromSqlValue for Decimal {
    fn from_sql_value(value: SqlValue) -> Result<Self, EasySqlError> {
        match value {
            SqlValue::Decimal(v) => Ok(v),
            SqlValue::Int(v) => Ok(Decimal::from(v)),
            SqlValue::Float(v) => Decimal::from_f64(v).ok_or(EasySqlError::TypeMismatch {
                expected: "decimal",
                found: "out-of-range float".to_string(),
            }),
            SqlValue::Text(s) => s.parse::<Decimal>().map_err(|_| EasySqlError::TypeMismatch {
                expected: "decimal",
                found: format!("text {s:?}"),
            }),
            other => Err(mismatch("decimal", &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrowing_int_casts_are_lossless_or_fail() {
        assert_eq!(i32::from_sql_value(SqlValue::Int(41)).unwrap(), 41);
        assert!(matches!(
            i16::from_sql_value(SqlValue::Int(70_000)),
            Err(EasySqlError::TypeMismatch { expected: "i16", .. })
        ));
        assert!(matches!(
            i8::from_sql_value(SqlValue::Int(200)),
            Err(EasySqlError::TypeMismatch { expected: "i8", .. })
        ));
    }

    #[test]
    fn bool_accepts_integer_encoding() {
        assert!(bool::from_sql_value(SqlValue::Int(1)).unwrap());
        assert!(!bool::from_sql_value(SqlValue::Int(0)).unwrap());
        assert!(bool::from_sql_value(SqlValue::Int(2)).is_err());
    }

    #[test]
    fn mismatched_type_reports_both_sides() {
        let err = i64::from_sql_value(SqlValue::Text("five".into())).unwrap_err();
        assert!(matches!(
            err,
            EasySqlError::TypeMismatch { expected: "i64", ref found } if found == "text"
        ));
    }

    #[test]
    fn timestamp_parses_driver_text_encoding() {
        let ts = NaiveDateTime::from_sql_value(SqlValue::Text("2024-03-01 10:20:30.5".into()))
            .unwrap();
        let expected = chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_milli_opt(10, 20, 30, 500)
            .unwrap();
        assert_eq!(ts, expected);
    }

    #[test]
    fn decimal_round_trips_through_text() {
        let dec = Decimal::from_sql_value(SqlValue::Text("12.345".into())).unwrap();
        assert_eq!(dec.to_string(), "12.345");
    }

    #[test]
    fn array_builder_keeps_insertion_order() {
        let arr = ArrayParam::of("int4").push(1).push(2).push(3);
        assert_eq!(arr.element_type(), "int4");
        assert_eq!(
            arr.values(),
            &[SqlParam::Int(1), SqlParam::Int(2), SqlParam::Int(3)]
        );
    }
}
