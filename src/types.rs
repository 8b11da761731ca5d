//! Core data types for chunked images

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pixel data types a chunk can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DataType {
    /// Boolean mask
    Bool = 0,
    /// Unsigned 8-bit integer
    U8 = 1,
    /// Unsigned 16-bit integer
    U16 = 2,
    /// Unsigned 32-bit integer
    U32 = 3,
    /// Unsigned 64-bit integer
    U64 = 4,
    /// Signed 8-bit integer
    I8 = 5,
    /// Signed 16-bit integer
    I16 = 6,
    /// Signed 32-bit integer
    I32 = 7,
    /// Signed 64-bit integer
    I64 = 8,
    /// 32-bit floating point
    F32 = 9,
    /// 64-bit floating point
    F64 = 10,
    /// RGB with 8 bits per channel
    Color24 = 11,
    /// RGB with 16 bits per channel
    Color48 = 12,
}

impl DataType {
    /// Size in bytes of this data type
    pub fn size_in_bytes(&self) -> usize {
        match self {
            DataType::Bool => 1,
            DataType::U8 | DataType::I8 => 1,
            DataType::U16 | DataType::I16 => 2,
            DataType::U32 | DataType::I32 | DataType::F32 => 4,
            DataType::U64 | DataType::I64 | DataType::F64 => 8,
            DataType::Color24 => 3,
            DataType::Color48 => 6,
        }
    }

    /// Check if this is a floating point type
    pub fn is_float(&self) -> bool {
        matches!(self, DataType::F32 | DataType::F64)
    }

    /// Check if this is an integer type (bool and colors are not)
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DataType::U8
                | DataType::U16
                | DataType::U32
                | DataType::U64
                | DataType::I8
                | DataType::I16
                | DataType::I32
                | DataType::I64
        )
    }

    /// Check if this is one of the color types
    pub fn is_color(&self) -> bool {
        matches!(self, DataType::Color24 | DataType::Color48)
    }

    /// Types for which a scalar min/max is meaningful
    pub fn has_min_max(&self) -> bool {
        !self.is_color()
    }

    /// Value domain `(min, max)` of numeric types
    pub fn domain(&self) -> Option<(f64, f64)> {
        match self {
            DataType::Bool => Some((0.0, 1.0)),
            DataType::U8 => Some((0.0, u8::MAX as f64)),
            DataType::U16 => Some((0.0, u16::MAX as f64)),
            DataType::U32 => Some((0.0, u32::MAX as f64)),
            DataType::U64 => Some((0.0, u64::MAX as f64)),
            DataType::I8 => Some((i8::MIN as f64, i8::MAX as f64)),
            DataType::I16 => Some((i16::MIN as f64, i16::MAX as f64)),
            DataType::I32 => Some((i32::MIN as f64, i32::MAX as f64)),
            DataType::I64 => Some((i64::MIN as f64, i64::MAX as f64)),
            DataType::F32 => Some((f32::MIN as f64, f32::MAX as f64)),
            DataType::F64 => Some((f64::MIN, f64::MAX)),
            DataType::Color24 | DataType::Color48 => None,
        }
    }

    /// Short lowercase name of the type
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::U8 => "u8",
            DataType::U16 => "u16",
            DataType::U32 => "u32",
            DataType::U64 => "u64",
            DataType::I8 => "i8",
            DataType::I16 => "i16",
            DataType::I32 => "i32",
            DataType::I64 => "i64",
            DataType::F32 => "f32",
            DataType::F64 => "f64",
            DataType::Color24 => "color24",
            DataType::Color48 => "color48",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Axes of an image (up to 4D)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Dimension {
    /// Along a row (x, number of columns)
    Row = 0,
    /// Along a column (y, number of rows)
    Column = 1,
    /// Slices (z)
    Slice = 2,
    /// Timesteps
    Time = 3,
}

impl Dimension {
    /// Convert from usize index
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Dimension::Row),
            1 => Some(Dimension::Column),
            2 => Some(Dimension::Slice),
            3 => Some(Dimension::Time),
            _ => None,
        }
    }

    /// Convert to usize index
    pub fn to_index(&self) -> usize {
        *self as usize
    }
}

/// RGB color voxel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color<T> {
    pub r: T,
    pub g: T,
    pub b: T,
}

impl<T> Color<T> {
    pub fn new(r: T, g: T, b: T) -> Self {
        Self { r, g, b }
    }
}

/// Strategy used when computing a [`Scaling`] for a type conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScalingOption {
    /// Never scale, values are rounded and clamped
    NoScale,
    /// Scale down if needed, scale up only for non-integer sources
    #[default]
    AutoScale,
    /// Scale down if needed, never up
    NoUpscale,
    /// Always use the full destination domain
    Upscale,
}

/// Linear transform `dst = src * scale + offset` applied during conversion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scaling {
    pub scale: f64,
    pub offset: f64,
}

impl Scaling {
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        offset: 0.0,
    };

    pub fn new(scale: f64, offset: f64) -> Self {
        Self { scale, offset }
    }

    pub fn is_identity(&self) -> bool {
        self.scale == 1.0 && self.offset == 0.0
    }

    /// Apply the transform to a single value
    pub fn apply(&self, value: f64) -> f64 {
        value * self.scale + self.offset
    }
}

impl Default for Scaling {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_sizes() {
        assert_eq!(DataType::U8.size_in_bytes(), 1);
        assert_eq!(DataType::U16.size_in_bytes(), 2);
        assert_eq!(DataType::F32.size_in_bytes(), 4);
        assert_eq!(DataType::F64.size_in_bytes(), 8);
        assert_eq!(DataType::Color48.size_in_bytes(), 6);
    }

    #[test]
    fn test_data_type_classes() {
        assert!(DataType::I16.is_integer());
        assert!(!DataType::Bool.is_integer());
        assert!(DataType::F32.is_float());
        assert!(!DataType::Color24.has_min_max());
        assert_eq!(DataType::I8.domain(), Some((-128.0, 127.0)));
        assert_eq!(DataType::Color24.domain(), None);
    }

    #[test]
    fn test_dimension_conversion() {
        assert_eq!(Dimension::from_index(0), Some(Dimension::Row));
        assert_eq!(Dimension::from_index(3), Some(Dimension::Time));
        assert_eq!(Dimension::from_index(4), None);

        assert_eq!(Dimension::Row.to_index(), 0);
        assert_eq!(Dimension::Time.to_index(), 3);
    }

    #[test]
    fn test_scaling() {
        let scaling = Scaling::new(2.0, 1.0);
        assert_eq!(scaling.apply(3.0), 7.0);
        assert!(Scaling::default().is_identity());
    }
}
