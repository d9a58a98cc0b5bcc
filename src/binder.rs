//! Runtime parameter dispatch.
//!
//! One closed match maps every [`SqlParam`] variant to the narrowest native
//! binding call, in a fixed priority order. Indices are 1-based and
//! assigned gap-free in supply order; an empty parameter list binds
//! nothing.

use crate::driver::{Connection, Statement};
use crate::error::EasySqlError;
use crate::value::SqlParam;

/// Bind all parameters to an already-prepared statement.
///
/// # Errors
///
/// Fails with `InvalidArgument` for an array parameter without an element
/// type name, and with `Driver` when a binding call or the connection's
/// array constructor fails.
pub fn bind_params(
    conn: &dyn Connection,
    stmt: &mut dyn Statement,
    params: &[SqlParam],
) -> Result<(), EasySqlError> {
    for (pos, param) in params.iter().enumerate() {
        bind_param(conn, stmt, pos + 1, param)?;
    }
    Ok(())
}

fn bind_param(
    conn: &dyn Connection,
    stmt: &mut dyn Statement,
    idx: usize,
    param: &SqlParam,
) -> Result<(), EasySqlError> {
    match param {
        SqlParam::Bool(v) => stmt.bind_bool(idx, *v)?,
        SqlParam::TinyInt(v) => stmt.bind_i8(idx, *v)?,
        SqlParam::Double(v) => stmt.bind_f64(idx, *v)?,
        SqlParam::Float(v) => stmt.bind_f32(idx, *v)?,
        SqlParam::Int(v) => stmt.bind_i32(idx, *v)?,
        SqlParam::BigInt(v) => stmt.bind_i64(idx, *v)?,
        SqlParam::SmallInt(v) => stmt.bind_i16(idx, *v)?,
        SqlParam::Text(v) => stmt.bind_text(idx, v)?,
        // A single character binds as 1-character text.
        SqlParam::Char(c) => {
            let mut buf = [0u8; 4];
            stmt.bind_text(idx, c.encode_utf8(&mut buf))?;
        }
        SqlParam::Timestamp(ts) => stmt.bind_timestamp(idx, *ts)?,
        SqlParam::Decimal(d) => stmt.bind_decimal(idx, *d)?,
        SqlParam::Array(arr) => {
            if arr.element_type().trim().is_empty() {
                return Err(EasySqlError::InvalidArgument(
                    "array parameter requires an element type name".to_string(),
                ));
            }
            let value = conn.create_array(arr.element_type(), arr.values())?;
            stmt.bind_array(idx, value)?;
        }
        SqlParam::Null => stmt.bind_null(idx)?,
        // Anything else goes down the driver's generic path.
        SqlParam::Other(v) => stmt.bind_other(idx, v)?,
    }
    Ok(())
}
