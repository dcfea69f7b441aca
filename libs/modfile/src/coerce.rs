//! Conversions from [`RawValue`] into the primitive config kinds.
//!
//! Every function is total over its input: it either produces the
//! requested kind or a [`CoerceError`] naming what was found instead.

use crate::error::CoerceError;
use crate::ir::ConfigScalar;
use crate::value::RawValue;

fn mismatch(expected: &'static str, v: &RawValue) -> CoerceError {
    CoerceError {
        expected,
        found: v.kind(),
    }
}

/// Accepts strings only.
pub fn string(v: &RawValue) -> Result<String, CoerceError> {
    match v {
        RawValue::String(s) => Ok(s.clone()),
        other => Err(mismatch("string", other)),
    }
}

/// Accepts strings, and renders integers and floats in minimal decimal form.
///
/// Used for string-typed config values, where authors commonly write
/// `value: 8080` without quoting.
pub fn string_lenient(v: &RawValue) -> Result<String, CoerceError> {
    match v {
        RawValue::String(s) => Ok(s.clone()),
        RawValue::Int(i) => Ok(i.to_string()),
        RawValue::Float(f) => Ok(f.to_string()),
        other => Err(mismatch("string", other)),
    }
}

pub fn boolean(v: &RawValue) -> Result<bool, CoerceError> {
    match v {
        RawValue::Bool(b) => Ok(*b),
        other => Err(mismatch("bool", other)),
    }
}

pub fn int64(v: &RawValue) -> Result<i64, CoerceError> {
    match v {
        RawValue::Int(i) => Ok(*i),
        other => Err(mismatch("int64", other)),
    }
}

pub fn float64(v: &RawValue) -> Result<f64, CoerceError> {
    match v {
        RawValue::Float(f) => Ok(*f),
        other => Err(mismatch("float64", other)),
    }
}

/// Infers the scalar kind of a value from its decoded shape.
///
/// Lists, maps and nulls have no scalar form.
pub fn infer_scalar(v: &RawValue) -> Result<ConfigScalar, CoerceError> {
    match v {
        RawValue::String(s) => Ok(ConfigScalar::String(s.clone())),
        RawValue::Bool(b) => Ok(ConfigScalar::Bool(*b)),
        RawValue::Int(i) => Ok(ConfigScalar::Int64(*i)),
        RawValue::Float(f) => Ok(ConfigScalar::Float64(*f)),
        other => Err(mismatch("scalar", other)),
    }
}
