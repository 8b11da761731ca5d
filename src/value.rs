//! Typed values stored in property maps and returned by voxel accessors

use crate::geometry::Vector3;
use crate::types::{Color, DataType, Scaling};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A single typed value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Color24(Color<u8>),
    Color48(Color<u16>),
    String(String),
    Vector3([f64; 3]),
    Vector4([f64; 4]),
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Pixel type matching this value, if it is a voxel type
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Bool(_) => Some(DataType::Bool),
            Value::U8(_) => Some(DataType::U8),
            Value::U16(_) => Some(DataType::U16),
            Value::U32(_) => Some(DataType::U32),
            Value::U64(_) => Some(DataType::U64),
            Value::I8(_) => Some(DataType::I8),
            Value::I16(_) => Some(DataType::I16),
            Value::I32(_) => Some(DataType::I32),
            Value::I64(_) => Some(DataType::I64),
            Value::F32(_) => Some(DataType::F32),
            Value::F64(_) => Some(DataType::F64),
            Value::Color24(_) => Some(DataType::Color24),
            Value::Color48(_) => Some(DataType::Color48),
            _ => None,
        }
    }

    /// Scalar numeric value as f64
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Bool(v) => Some(if v { 1.0 } else { 0.0 }),
            Value::U8(v) => Some(v as f64),
            Value::U16(v) => Some(v as f64),
            Value::U32(v) => Some(v as f64),
            Value::U64(v) => Some(v as f64),
            Value::I8(v) => Some(v as f64),
            Value::I16(v) => Some(v as f64),
            Value::I32(v) => Some(v as f64),
            Value::I64(v) => Some(v as f64),
            Value::F32(v) => Some(v as f64),
            Value::F64(v) => Some(v),
            _ => None,
        }
    }

    /// Scalar integral value as i64, floats are accepted when they have no fraction
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::U64(v) => i64::try_from(v).ok(),
            Value::F32(_) | Value::F64(_) => {
                let v = self.as_f64()?;
                (v.fract() == 0.0 && v >= i64::MIN as f64 && v <= i64::MAX as f64)
                    .then_some(v as i64)
            }
            _ => self.as_f64().map(|v| v as i64),
        }
    }

    /// The first three components of a vector value
    pub fn as_vector3(&self) -> Option<Vector3> {
        match *self {
            Value::Vector3(v) => Some(v),
            Value::Vector4(v) => Some([v[0], v[1], v[2]]),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.as_f64().is_some()
    }

    /// Check whether this scalar can be represented by `target` without loss
    pub fn fits_into(&self, target: DataType) -> bool {
        if self.data_type() == Some(target) {
            return true;
        }
        let (Some(v), Some((min, max))) = (self.as_f64(), target.domain()) else {
            return false;
        };
        if v < min || v > max {
            return false;
        }
        match target {
            DataType::Bool => v == 0.0 || v == 1.0,
            DataType::F32 | DataType::F64 => true,
            _ => v.fract() == 0.0,
        }
    }

    /// Build a value of the numeric `target` type from `v`, rounding and clamping
    pub fn from_f64(target: DataType, v: f64) -> Option<Value> {
        let (min, max) = target.domain()?;
        let rounded = if target.is_float() {
            v
        } else {
            v.round().clamp(min, max)
        };
        Some(match target {
            DataType::Bool => Value::Bool(v != 0.0),
            DataType::U8 => Value::U8(rounded as u8),
            DataType::U16 => Value::U16(rounded as u16),
            DataType::U32 => Value::U32(rounded as u32),
            DataType::U64 => Value::U64(rounded as u64),
            DataType::I8 => Value::I8(rounded as i8),
            DataType::I16 => Value::I16(rounded as i16),
            DataType::I32 => Value::I32(rounded as i32),
            DataType::I64 => Value::I64(rounded as i64),
            DataType::F32 => Value::F32(rounded as f32),
            DataType::F64 => Value::F64(rounded),
            DataType::Color24 | DataType::Color48 => return None,
        })
    }

    /// Add an integer offset, keeping the type where possible
    pub fn offset_by(&self, delta: i64) -> Option<Value> {
        match *self {
            Value::F32(v) => Some(Value::F32(v + delta as f32)),
            Value::F64(v) => Some(Value::F64(v + delta as f64)),
            _ => {
                let target = self.data_type().filter(|t| t.is_integer())?;
                let sum = self.as_i64()?.checked_add(delta)?;
                let shifted = Value::I64(sum);
                if shifted.fits_into(target) {
                    Value::from_f64(target, sum as f64)
                } else {
                    Some(shifted)
                }
            }
        }
    }

    /// Translate a vector value, keeping its arity
    pub fn translated(&self, offset: Vector3) -> Option<Value> {
        match *self {
            Value::Vector3(v) => Some(Value::Vector3(crate::geometry::add(v, offset))),
            Value::Vector4(v) => Some(Value::Vector4([
                v[0] + offset[0],
                v[1] + offset[1],
                v[2] + offset[2],
                v[3],
            ])),
            _ => None,
        }
    }

    /// Apply a scaling to a numeric value, keeping its type
    pub fn scaled(&self, scaling: Scaling) -> Option<Value> {
        let v = scaling.apply(self.as_f64()?);
        match self.data_type() {
            Some(t) => Value::from_f64(t, v),
            None => Some(Value::F64(v)),
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Value::String(_) => 1,
            Value::Vector3(_) | Value::Vector4(_) => 2,
            Value::Timestamp(_) => 3,
            Value::Color24(_) | Value::Color48(_) => 4,
            _ => 0,
        }
    }

    /// Total order used to sort chunks by scalar properties
    pub fn scalar_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            _ => {
                if let (Some(a), Some(b)) = (self.as_f64(), other.as_f64()) {
                    return a.total_cmp(&b);
                }
                if let (Some(a), Some(b)) = (self.as_vector3(), other.as_vector3()) {
                    return crate::geometry::lexical_cmp_reverse(&a, &b);
                }
                self.kind_rank()
                    .cmp(&other.kind_rank())
                    .then_with(|| self.to_string().cmp(&other.to_string()))
            }
        }
    }
}

fn write_components(f: &mut fmt::Formatter<'_>, items: &[f64]) -> fmt::Result {
    write!(f, "(")?;
    for (i, v) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{}", v)?;
    }
    write!(f, ")")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::U8(v) => write!(f, "{}", v),
            Value::U16(v) => write!(f, "{}", v),
            Value::U32(v) => write!(f, "{}", v),
            Value::U64(v) => write!(f, "{}", v),
            Value::I8(v) => write!(f, "{}", v),
            Value::I16(v) => write!(f, "{}", v),
            Value::I32(v) => write!(f, "{}", v),
            Value::I64(v) => write!(f, "{}", v),
            Value::F32(v) => write!(f, "{}", v),
            Value::F64(v) => write!(f, "{}", v),
            Value::Color24(c) => write!(f, "<{},{},{}>", c.r, c.g, c.b),
            Value::Color48(c) => write!(f, "<{},{},{}>", c.r, c.g, c.b),
            Value::String(s) => f.write_str(s),
            Value::Vector3(v) => write_components(f, v),
            Value::Vector4(v) => write_components(f, v),
            Value::Timestamp(t) => write!(f, "{}", t),
        }
    }
}

macro_rules! impl_from_for_value {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from_for_value!(
    bool => Bool,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    Color<u8> => Color24,
    Color<u16> => Color48,
    String => String,
    [f64; 3] => Vector3,
    [f64; 4] => Vector4,
    NaiveDateTime => Timestamp,
);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

/// Typed extraction of a [`Value`]
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64().map(|v| v as f32)
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_i64()
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_i64().and_then(|v| i32::try_from(v).ok())
    }
}

impl FromValue for u32 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_i64().and_then(|v| u32::try_from(v).ok())
    }
}

impl FromValue for u64 {
    fn from_value(value: &Value) -> Option<Self> {
        match *value {
            Value::U64(v) => Some(v),
            _ => value.as_i64().and_then(|v| u64::try_from(v).ok()),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64().map(|v| v != 0.0)
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.to_string())
    }
}

impl FromValue for [f64; 3] {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_vector3()
    }
}

impl FromValue for [f64; 4] {
    fn from_value(value: &Value) -> Option<Self> {
        match *value {
            Value::Vector4(v) => Some(v),
            Value::Vector3(v) => Some([v[0], v[1], v[2], 0.0]),
            _ => None,
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }
}
