//! Shared typed pixel buffers
//!
//! A [`ValueArray`] is a view (offset and length) into a reference counted,
//! lock protected buffer. Cloning a view or splicing it into smaller views
//! never copies pixels; [`ValueArray::deep_copy`] and the conversion
//! operations produce a fresh buffer.

use crate::error::{ImageError, Result};
use crate::types::{Color, DataType, Scaling, ScalingOption};
use crate::value::Value;
use log::debug;
use num_traits::{Bounded, NumCast, Zero};
use parking_lot::RwLock;
use std::sync::Arc;

/// Owned pixel storage, one variant per [`DataType`]
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    Bool(Vec<bool>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    Color24(Vec<Color<u8>>),
    Color48(Vec<Color<u16>>),
}

macro_rules! dispatch {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            ArrayData::Bool($v) => $body,
            ArrayData::U8($v) => $body,
            ArrayData::U16($v) => $body,
            ArrayData::U32($v) => $body,
            ArrayData::U64($v) => $body,
            ArrayData::I8($v) => $body,
            ArrayData::I16($v) => $body,
            ArrayData::I32($v) => $body,
            ArrayData::I64($v) => $body,
            ArrayData::F32($v) => $body,
            ArrayData::F64($v) => $body,
            ArrayData::Color24($v) => $body,
            ArrayData::Color48($v) => $body,
        }
    };
}

impl ArrayData {
    pub fn data_type(&self) -> DataType {
        match self {
            ArrayData::Bool(_) => DataType::Bool,
            ArrayData::U8(_) => DataType::U8,
            ArrayData::U16(_) => DataType::U16,
            ArrayData::U32(_) => DataType::U32,
            ArrayData::U64(_) => DataType::U64,
            ArrayData::I8(_) => DataType::I8,
            ArrayData::I16(_) => DataType::I16,
            ArrayData::I32(_) => DataType::I32,
            ArrayData::I64(_) => DataType::I64,
            ArrayData::F32(_) => DataType::F32,
            ArrayData::F64(_) => DataType::F64,
            ArrayData::Color24(_) => DataType::Color24,
            ArrayData::Color48(_) => DataType::Color48,
        }
    }

    pub fn len(&self) -> usize {
        dispatch!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Zero filled storage of the given type
    pub fn zeros(data_type: DataType, len: usize) -> Self {
        match data_type {
            DataType::Bool => ArrayData::Bool(vec![false; len]),
            DataType::U8 => ArrayData::U8(vec![0; len]),
            DataType::U16 => ArrayData::U16(vec![0; len]),
            DataType::U32 => ArrayData::U32(vec![0; len]),
            DataType::U64 => ArrayData::U64(vec![0; len]),
            DataType::I8 => ArrayData::I8(vec![0; len]),
            DataType::I16 => ArrayData::I16(vec![0; len]),
            DataType::I32 => ArrayData::I32(vec![0; len]),
            DataType::I64 => ArrayData::I64(vec![0; len]),
            DataType::F32 => ArrayData::F32(vec![0.0; len]),
            DataType::F64 => ArrayData::F64(vec![0.0; len]),
            DataType::Color24 => ArrayData::Color24(vec![Color::default(); len]),
            DataType::Color48 => ArrayData::Color48(vec![Color::default(); len]),
        }
    }

    fn sub(&self, start: usize, end: usize) -> ArrayData {
        match self {
            ArrayData::Bool(v) => ArrayData::Bool(v[start..end].to_vec()),
            ArrayData::U8(v) => ArrayData::U8(v[start..end].to_vec()),
            ArrayData::U16(v) => ArrayData::U16(v[start..end].to_vec()),
            ArrayData::U32(v) => ArrayData::U32(v[start..end].to_vec()),
            ArrayData::U64(v) => ArrayData::U64(v[start..end].to_vec()),
            ArrayData::I8(v) => ArrayData::I8(v[start..end].to_vec()),
            ArrayData::I16(v) => ArrayData::I16(v[start..end].to_vec()),
            ArrayData::I32(v) => ArrayData::I32(v[start..end].to_vec()),
            ArrayData::I64(v) => ArrayData::I64(v[start..end].to_vec()),
            ArrayData::F32(v) => ArrayData::F32(v[start..end].to_vec()),
            ArrayData::F64(v) => ArrayData::F64(v[start..end].to_vec()),
            ArrayData::Color24(v) => ArrayData::Color24(v[start..end].to_vec()),
            ArrayData::Color48(v) => ArrayData::Color48(v[start..end].to_vec()),
        }
    }
}

/// Element types a [`ValueArray`] can hold
pub trait Pixel: Copy + PartialEq + Send + Sync + 'static {
    const DATA_TYPE: DataType;

    fn as_slice(data: &ArrayData) -> Option<&[Self]>;
    fn as_mut_slice(data: &mut ArrayData) -> Option<&mut [Self]>;
    fn into_data(values: Vec<Self>) -> ArrayData;
    fn to_value(self) -> Value;
    fn from_value(value: &Value) -> Option<Self>;

    /// Channel values, scalars only use the first
    fn to_channels(self) -> [f64; 3];
    /// Build from channel values with rounding and saturation
    fn from_channels(channels: [f64; 3]) -> Self;
}

fn saturate<T: Bounded + NumCast + Zero>(v: f64) -> T {
    if v.is_nan() {
        return T::zero();
    }
    let rounded = v.round();
    <T as NumCast>::from(rounded).unwrap_or_else(|| {
        if rounded.is_sign_negative() {
            T::min_value()
        } else {
            T::max_value()
        }
    })
}

macro_rules! impl_int_pixel {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl Pixel for $t {
                const DATA_TYPE: DataType = DataType::$variant;

                fn as_slice(data: &ArrayData) -> Option<&[Self]> {
                    match data {
                        ArrayData::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                fn as_mut_slice(data: &mut ArrayData) -> Option<&mut [Self]> {
                    match data {
                        ArrayData::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                fn into_data(values: Vec<Self>) -> ArrayData {
                    ArrayData::$variant(values)
                }

                fn to_value(self) -> Value {
                    Value::$variant(self)
                }

                fn from_value(value: &Value) -> Option<Self> {
                    value.as_f64().map(|v| saturate::<$t>(v))
                }

                fn to_channels(self) -> [f64; 3] {
                    [self as f64, 0.0, 0.0]
                }

                fn from_channels(channels: [f64; 3]) -> Self {
                    saturate::<$t>(channels[0])
                }
            }
        )*
    };
}

impl_int_pixel!(
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
);

macro_rules! impl_float_pixel {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl Pixel for $t {
                const DATA_TYPE: DataType = DataType::$variant;

                fn as_slice(data: &ArrayData) -> Option<&[Self]> {
                    match data {
                        ArrayData::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                fn as_mut_slice(data: &mut ArrayData) -> Option<&mut [Self]> {
                    match data {
                        ArrayData::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                fn into_data(values: Vec<Self>) -> ArrayData {
                    ArrayData::$variant(values)
                }

                fn to_value(self) -> Value {
                    Value::$variant(self)
                }

                fn from_value(value: &Value) -> Option<Self> {
                    value.as_f64().map(|v| v as $t)
                }

                fn to_channels(self) -> [f64; 3] {
                    [self as f64, 0.0, 0.0]
                }

                fn from_channels(channels: [f64; 3]) -> Self {
                    channels[0] as $t
                }
            }
        )*
    };
}

impl_float_pixel!(f32 => F32, f64 => F64);

impl Pixel for bool {
    const DATA_TYPE: DataType = DataType::Bool;

    fn as_slice(data: &ArrayData) -> Option<&[Self]> {
        match data {
            ArrayData::Bool(v) => Some(v),
            _ => None,
        }
    }

    fn as_mut_slice(data: &mut ArrayData) -> Option<&mut [Self]> {
        match data {
            ArrayData::Bool(v) => Some(v),
            _ => None,
        }
    }

    fn into_data(values: Vec<Self>) -> ArrayData {
        ArrayData::Bool(values)
    }

    fn to_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64().map(|v| v != 0.0)
    }

    fn to_channels(self) -> [f64; 3] {
        [if self { 1.0 } else { 0.0 }, 0.0, 0.0]
    }

    fn from_channels(channels: [f64; 3]) -> Self {
        channels[0] != 0.0
    }
}

macro_rules! impl_color_pixel {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl Pixel for Color<$t> {
                const DATA_TYPE: DataType = DataType::$variant;

                fn as_slice(data: &ArrayData) -> Option<&[Self]> {
                    match data {
                        ArrayData::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                fn as_mut_slice(data: &mut ArrayData) -> Option<&mut [Self]> {
                    match data {
                        ArrayData::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                fn into_data(values: Vec<Self>) -> ArrayData {
                    ArrayData::$variant(values)
                }

                fn to_value(self) -> Value {
                    Value::$variant(self)
                }

                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::$variant(c) => Some(*c),
                        _ => None,
                    }
                }

                fn to_channels(self) -> [f64; 3] {
                    [self.r as f64, self.g as f64, self.b as f64]
                }

                fn from_channels(channels: [f64; 3]) -> Self {
                    Color::new(
                        saturate::<$t>(channels[0]),
                        saturate::<$t>(channels[1]),
                        saturate::<$t>(channels[2]),
                    )
                }
            }
        )*
    };
}

impl_color_pixel!(u8 => Color24, u16 => Color48);

fn convert_pixel<S: Pixel, D: Pixel>(src: S, scaling: Scaling) -> D {
    D::from_channels(src.to_channels().map(|c| scaling.apply(c)))
}

fn convert_into<S: Pixel>(src: &[S], dst: &mut ArrayData, dst_start: usize, scaling: Scaling) {
    let end = dst_start + src.len();
    dispatch!(dst, d => {
        for (o, s) in d[dst_start..end].iter_mut().zip(src) {
            *o = convert_pixel(*s, scaling);
        }
    })
}

fn compare_slices<T: Pixel>(a: &[T], b: &ArrayData, b_start: usize) -> usize {
    match T::as_slice(b) {
        Some(b) => a
            .iter()
            .zip(&b[b_start..b_start + a.len()])
            .filter(|(x, y)| x != y)
            .count(),
        None => a.len(),
    }
}

fn min_max_of<T: Pixel>(values: &[T]) -> Option<(Value, Value)> {
    if T::DATA_TYPE.is_color() {
        return None;
    }
    let mut result: Option<(T, f64, T, f64)> = None;
    for &v in values {
        let f = v.to_channels()[0];
        if f.is_nan() {
            continue;
        }
        result = Some(match result {
            None => (v, f, v, f),
            Some((min, fmin, max, fmax)) => {
                let (min, fmin) = if f < fmin { (v, f) } else { (min, fmin) };
                let (max, fmax) = if f > fmax { (v, f) } else { (max, fmax) };
                (min, fmin, max, fmax)
            }
        });
    }
    result.map(|(min, _, max, _)| (min.to_value(), max.to_value()))
}

/// View into a shared typed pixel buffer
#[derive(Debug, Clone)]
pub struct ValueArray {
    data: Arc<RwLock<ArrayData>>,
    offset: usize,
    len: usize,
}

impl ValueArray {
    /// Take ownership of `values`
    pub fn new<T: Pixel>(values: Vec<T>) -> Self {
        Self::from_data(T::into_data(values))
    }

    pub fn from_data(data: ArrayData) -> Self {
        let len = data.len();
        Self {
            data: Arc::new(RwLock::new(data)),
            offset: 0,
            len,
        }
    }

    pub fn zeros(data_type: DataType, len: usize) -> Self {
        Self::from_data(ArrayData::zeros(data_type, len))
    }

    pub fn data_type(&self) -> DataType {
        self.data.read().data_type()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of views sharing the underlying buffer
    pub fn use_count(&self) -> usize {
        Arc::strong_count(&self.data)
    }

    pub fn shares_buffer_with(&self, other: &ValueArray) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    fn check_range(&self, start: usize, end: usize) -> Result<()> {
        if start > end || end > self.len {
            return Err(ImageError::OutOfBounds(format!(
                "range {}..{} of array with {} elements",
                start, end, self.len
            )));
        }
        Ok(())
    }

    /// Run `f` on the typed elements of this view
    pub fn with_slice<T: Pixel, R>(&self, f: impl FnOnce(&[T]) -> R) -> Result<R> {
        let guard = self.data.read();
        let slice = T::as_slice(&guard).ok_or(ImageError::TypeMismatch {
            expected: T::DATA_TYPE,
            found: guard.data_type(),
        })?;
        Ok(f(&slice[self.offset..self.offset + self.len]))
    }

    /// Run `f` on the mutable typed elements of this view
    ///
    /// Writes are visible through every view sharing the buffer.
    pub fn with_slice_mut<T: Pixel, R>(&self, f: impl FnOnce(&mut [T]) -> R) -> Result<R> {
        let mut guard = self.data.write();
        let found = guard.data_type();
        let slice = T::as_mut_slice(&mut guard).ok_or(ImageError::TypeMismatch {
            expected: T::DATA_TYPE,
            found,
        })?;
        Ok(f(&mut slice[self.offset..self.offset + self.len]))
    }

    pub fn to_vec<T: Pixel>(&self) -> Result<Vec<T>> {
        self.with_slice(|s: &[T]| s.to_vec())
    }

    pub fn get<T: Pixel>(&self, index: usize) -> Result<T> {
        self.check_range(index, index + 1)?;
        self.with_slice(|s: &[T]| s[index])
    }

    pub fn set<T: Pixel>(&self, index: usize, value: T) -> Result<()> {
        self.check_range(index, index + 1)?;
        self.with_slice_mut(|s: &mut [T]| s[index] = value)
    }

    /// Element at `index` as a [`Value`]
    pub fn value(&self, index: usize) -> Result<Value> {
        self.check_range(index, index + 1)?;
        let guard = self.data.read();
        let at = self.offset + index;
        Ok(dispatch!(&*guard, v => v[at].to_value()))
    }

    /// Store `value` at `index`, converting it to the element type
    pub fn set_value(&self, index: usize, value: &Value) -> Result<()> {
        self.check_range(index, index + 1)?;
        let mut guard = self.data.write();
        let found = guard.data_type();
        let at = self.offset + index;
        dispatch!(&mut *guard, v => {
            v[at] = Pixel::from_value(value).ok_or_else(|| {
                ImageError::InvalidProperty(format!("cannot store {} in {} array", value, found))
            })?;
        });
        Ok(())
    }

    /// Split into consecutive views of `block` elements sharing this buffer
    pub fn splice(&self, block: usize) -> Result<Vec<ValueArray>> {
        if block == 0 || self.len % block != 0 {
            return Err(ImageError::Splice(format!(
                "cannot split {} elements into blocks of {}",
                self.len, block
            )));
        }
        Ok((0..self.len / block)
            .map(|i| ValueArray {
                data: Arc::clone(&self.data),
                offset: self.offset + i * block,
                len: block,
            })
            .collect())
    }

    /// Copy the viewed elements into a new, unshared buffer
    pub fn deep_copy(&self) -> ValueArray {
        let guard = self.data.read();
        Self::from_data(guard.sub(self.offset, self.offset + self.len))
    }

    /// Smallest and largest element, `None` for color types or empty views
    pub fn min_max(&self) -> Option<(Value, Value)> {
        let guard = self.data.read();
        let (start, end) = (self.offset, self.offset + self.len);
        dispatch!(&*guard, v => min_max_of(&v[start..end]))
    }

    /// New buffer of type `data_type` holding `src * scale + offset`
    pub fn convert_to(&self, data_type: DataType, scaling: Scaling) -> Result<ValueArray> {
        let from = self.data_type();
        if from == data_type && scaling.is_identity() {
            return Ok(self.deep_copy());
        }
        let out = ValueArray::zeros(data_type, self.len);
        self.copy_into(&out, 0, scaling)?;
        Ok(out)
    }

    /// Convert all elements into `dst` starting at `dst_start`
    pub fn copy_into(&self, dst: &ValueArray, dst_start: usize, scaling: Scaling) -> Result<()> {
        let (from, to) = (self.data_type(), dst.data_type());
        if from.is_color() != to.is_color() {
            return Err(ImageError::UnsupportedConversion { from, to });
        }
        dst.check_range(dst_start, dst_start + self.len)?;
        if self.shares_buffer_with(dst) {
            return self.deep_copy().copy_into(dst, dst_start, scaling);
        }
        let src = self.data.read();
        let mut out = dst.data.write();
        let (start, end) = (self.offset, self.offset + self.len);
        let at = dst.offset + dst_start;
        dispatch!(&*src, v => convert_into(&v[start..end], &mut out, at, scaling));
        Ok(())
    }

    /// Copy `start..end` of this view into `dst` at `dst_start`, types must match
    pub fn copy_range(&self, start: usize, end: usize, dst: &ValueArray, dst_start: usize) -> Result<()> {
        self.check_range(start, end)?;
        let (from, to) = (self.data_type(), dst.data_type());
        if from != to {
            return Err(ImageError::TypeMismatch {
                expected: to,
                found: from,
            });
        }
        let part = ValueArray {
            data: Arc::clone(&self.data),
            offset: self.offset + start,
            len: end - start,
        };
        part.copy_into(dst, dst_start, Scaling::IDENTITY)
    }

    /// Count elements in `start..end` that differ from `other` starting at `other_start`
    ///
    /// Elements of a different type count as differing.
    pub fn compare(&self, start: usize, end: usize, other: &ValueArray, other_start: usize) -> Result<usize> {
        self.check_range(start, end)?;
        other.check_range(other_start, other_start + (end - start))?;
        let mine = self.data.read_recursive();
        let theirs = other.data.read_recursive();
        let (s, e) = (self.offset + start, self.offset + end);
        let at = other.offset + other_start;
        Ok(dispatch!(&*mine, v => compare_slices(&v[s..e], &theirs, at)))
    }
}

/// Scaling to bring values in `[min, max]` into the domain of `dst`
///
/// Only integer destinations are scaled. `AutoScale` from an integer source
/// never scales up.
pub fn compute_scaling(min: &Value, max: &Value, dst: DataType, option: ScalingOption) -> Result<Scaling> {
    let (Some(vmin), Some(vmax)) = (min.as_f64(), max.as_f64()) else {
        return Err(ImageError::InvalidProperty(format!(
            "cannot compute scaling from {} and {}",
            min, max
        )));
    };
    if option == ScalingOption::NoScale || !dst.is_integer() {
        return Ok(Scaling::IDENTITY);
    }
    let Some((dmin, dmax)) = dst.domain() else {
        return Ok(Scaling::IDENTITY);
    };
    let integer_source = [min, max]
        .iter()
        .all(|v| v.data_type().is_some_and(|t| t.is_integer() || t == DataType::Bool));
    let option = if option == ScalingOption::AutoScale && integer_source {
        ScalingOption::NoUpscale
    } else {
        option
    };

    let offset = if vmin >= 0.0 || dmin == 0.0 {
        -vmin
    } else if vmax <= 0.0 {
        -vmax
    } else {
        0.0
    };
    let (range_min, range_max) = (vmin + offset, vmax + offset);
    let scale_max = if range_max != 0.0 { dmax / range_max } else { f64::INFINITY };
    let scale_min = if range_min != 0.0 { dmin / range_min } else { f64::INFINITY };
    let mut scale = scale_max.min(scale_min);
    if !scale.is_finite() {
        scale = 1.0;
    }
    if option == ScalingOption::NoUpscale && scale > 1.0 {
        scale = 1.0;
    }
    let scaling = if scale == 1.0 && min.fits_into(dst) && max.fits_into(dst) {
        Scaling::IDENTITY
    } else {
        Scaling::new(scale, offset * scale)
    };
    debug!(
        "Scaling for [{}, {}] to {}: scale {} offset {}",
        min, max, dst, scaling.scale, scaling.offset
    );
    Ok(scaling)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splice_shares_buffer() {
        let array = ValueArray::new((0u16..8).collect());
        let parts = array.splice(4).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(array.use_count(), 3);
        assert_eq!(parts[1].get::<u16>(0).unwrap(), 4);

        parts[1].set::<u16>(0, 40).unwrap();
        assert_eq!(array.get::<u16>(4).unwrap(), 40);
        assert!(array.splice(3).is_err());
    }

    #[test]
    fn test_deep_copy_severs_sharing() {
        let array = ValueArray::new(vec![1i32, 2, 3]);
        let copy = array.deep_copy();
        copy.set::<i32>(0, 10).unwrap();
        assert_eq!(array.get::<i32>(0).unwrap(), 1);
        assert_eq!(array.use_count(), 1);
    }

    #[test]
    fn test_type_mismatch() {
        let array = ValueArray::new(vec![1u8, 2]);
        assert!(matches!(
            array.get::<f32>(0),
            Err(ImageError::TypeMismatch { .. })
        ));
        assert!(matches!(array.get::<u8>(2), Err(ImageError::OutOfBounds(_))));
    }

    #[test]
    fn test_min_max() {
        let array = ValueArray::new(vec![3i16, -7, 12, 0]);
        assert_eq!(array.min_max(), Some((Value::I16(-7), Value::I16(12))));
        let floats = ValueArray::new(vec![f32::NAN, 1.5, -0.5]);
        assert_eq!(floats.min_max(), Some((Value::F32(-0.5), Value::F32(1.5))));
        let colors = ValueArray::new(vec![Color::new(1u8, 2, 3)]);
        assert_eq!(colors.min_max(), None);
    }

    #[test]
    fn test_convert_saturates() {
        let array = ValueArray::new(vec![-5.0f64, 1.4, 300.0]);
        let converted = array.convert_to(DataType::U8, Scaling::IDENTITY).unwrap();
        assert_eq!(converted.to_vec::<u8>().unwrap(), vec![0, 1, 255]);

        let scaled = array.convert_to(DataType::I16, Scaling::new(2.0, 1.0)).unwrap();
        assert_eq!(scaled.to_vec::<i16>().unwrap(), vec![-9, 4, 601]);

        assert!(matches!(
            array.convert_to(DataType::Color24, Scaling::IDENTITY),
            Err(ImageError::UnsupportedConversion { .. })
        ));
    }

    #[test]
    fn test_value_access() {
        let array = ValueArray::new(vec![0u32; 4]);
        array.set_value(2, &Value::F64(7.0)).unwrap();
        assert_eq!(array.value(2).unwrap(), Value::U32(7));
        assert!(array.set_value(1, &Value::from("x")).is_err());
    }

    #[test]
    fn test_compare_and_copy_range() {
        let a = ValueArray::new(vec![1u8, 2, 3, 4]);
        let b = ValueArray::new(vec![1u8, 0, 3, 0]);
        assert_eq!(a.compare(0, 4, &b, 0).unwrap(), 2);
        assert_eq!(a.compare(0, 2, &a, 2).unwrap(), 2);

        a.copy_range(0, 2, &b, 2).unwrap();
        assert_eq!(b.to_vec::<u8>().unwrap(), vec![1, 0, 1, 2]);
        a.copy_range(0, 2, &a, 2).unwrap();
        assert_eq!(a.to_vec::<u8>().unwrap(), vec![1, 2, 1, 2]);
    }

    #[test]
    fn test_compute_scaling() {
        let scaling = compute_scaling(
            &Value::I16(i16::MIN),
            &Value::I16(i16::MAX),
            DataType::U8,
            ScalingOption::AutoScale,
        )
        .unwrap();
        assert!((scaling.scale - 255.0 / 65535.0).abs() < 1e-12);
        assert!((scaling.offset - 32768.0 * 255.0 / 65535.0).abs() < 1e-9);

        // fits already, no upscaling from integers
        let scaling = compute_scaling(&Value::U8(10), &Value::U8(200), DataType::U16, ScalingOption::AutoScale)
            .unwrap();
        assert!(scaling.is_identity());

        // floats are stretched to the full domain
        let scaling = compute_scaling(&Value::F32(0.0), &Value::F32(1.0), DataType::U8, ScalingOption::AutoScale)
            .unwrap();
        assert_eq!(scaling.scale, 255.0);

        let scaling = compute_scaling(&Value::F32(0.0), &Value::F32(1.0), DataType::F64, ScalingOption::Upscale)
            .unwrap();
        assert!(scaling.is_identity());
    }
}
