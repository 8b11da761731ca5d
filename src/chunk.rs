//! Chunks: typed voxel blocks with their own metadata

use crate::error::{ImageError, Result};
use crate::geometry::{self, Vector3};
use crate::layout::{NDimensional, DIMS};
use crate::metadata::{PropPath, PropertyMap, PropertyValue};
use crate::types::{DataType, Scaling, ScalingOption};
use crate::value::{FromValue, Value};
use crate::value_array::{compute_scaling, Pixel, ValueArray};
use log::{debug, error};
use ndarray::Array4;

/// Properties every chunk must carry
pub const CHUNK_NEEDED: &[&str] = &[
    "indexOrigin",
    "acquisitionNumber",
    "voxelSize",
    "rowVec",
    "columnVec",
];

/// A rectangular block of voxels plus its metadata
///
/// Cloning is cheap: the metadata is copied but the voxel buffer is shared.
/// Writes through one clone are visible through all of them until
/// [`Chunk::deep_copy`] or a type conversion gives a chunk its own buffer.
#[derive(Debug, Clone)]
pub struct Chunk {
    shape: NDimensional,
    data: ValueArray,
    props: PropertyMap,
}

impl Chunk {
    /// Create a chunk owning `values`, laid out row fastest
    pub fn new<T: Pixel>(values: Vec<T>, size: [usize; DIMS]) -> Result<Self> {
        Self::from_array(ValueArray::new(values), size)
    }

    /// Zero filled chunk of the given type
    pub fn zeros(data_type: DataType, size: [usize; DIMS]) -> Result<Self> {
        let shape = NDimensional::new(size)?;
        Ok(Self {
            data: ValueArray::zeros(data_type, shape.volume()),
            shape,
            props: PropertyMap::new(),
        })
    }

    /// Wrap an existing buffer, its length must match the volume of `size`
    pub fn from_array(data: ValueArray, size: [usize; DIMS]) -> Result<Self> {
        let shape = NDimensional::new(size)?;
        if data.len() != shape.volume() {
            return Err(ImageError::InvalidChunk(format!(
                "{} voxels do not fit a chunk of size {}",
                data.len(),
                shape.size_string()
            )));
        }
        Ok(Self {
            shape,
            data,
            props: PropertyMap::new(),
        })
    }

    pub fn shape(&self) -> &NDimensional {
        &self.shape
    }

    pub fn size(&self) -> [usize; DIMS] {
        self.shape.size()
    }

    pub fn volume(&self) -> usize {
        self.shape.volume()
    }

    pub fn relevant_dims(&self) -> usize {
        self.shape.relevant_dims()
    }

    pub fn data_type(&self) -> DataType {
        self.data.data_type()
    }

    pub fn bytes_per_voxel(&self) -> usize {
        self.data_type().size_in_bytes()
    }

    pub fn value_array(&self) -> &ValueArray {
        &self.data
    }

    pub fn properties(&self) -> &PropertyMap {
        &self.props
    }

    pub fn properties_mut(&mut self) -> &mut PropertyMap {
        &mut self.props
    }

    pub fn property(&self, path: impl Into<PropPath>) -> Option<&PropertyValue> {
        self.props.property(path)
    }

    pub fn has_property(&self, path: impl Into<PropPath>) -> bool {
        self.props.has_property(path)
    }

    pub fn value_as<T: FromValue>(&self, path: impl Into<PropPath>) -> Option<T> {
        self.props.value_as(path)
    }

    pub fn set_property(
        &mut self,
        path: impl Into<PropPath>,
        value: impl Into<PropertyValue>,
    ) -> Result<()> {
        self.props.set_property(path, value)
    }

    /// Builder style [`Chunk::set_property`]
    pub fn with_property(
        mut self,
        path: impl Into<PropPath>,
        value: impl Into<PropertyValue>,
    ) -> Result<Self> {
        self.props.set_property(path, value)?;
        Ok(self)
    }

    /// Needed properties that are missing or empty
    pub fn missing(&self) -> Vec<String> {
        self.props.missing(CHUNK_NEEDED)
    }

    pub fn is_valid(&self) -> bool {
        self.missing().is_empty()
    }

    /// `sliceVec`, or the cross product of row and column vectors
    pub fn slice_vec(&self) -> Option<Vector3> {
        self.value_as::<Vector3>("sliceVec").or_else(|| {
            let row = self.value_as::<Vector3>("rowVec")?;
            let column = self.value_as::<Vector3>("columnVec")?;
            Some(geometry::normalize(geometry::cross(row, column)))
        })
    }

    fn index_of(&self, coords: [usize; DIMS]) -> Result<usize> {
        if !self.shape.is_in_range(coords) {
            return Err(ImageError::OutOfBounds(format!(
                "{:?} is outside of chunk with size {}",
                coords,
                self.shape.size_string()
            )));
        }
        Ok(self.shape.linear_index(coords))
    }

    pub fn voxel<T: Pixel>(&self, x: usize, y: usize, z: usize, t: usize) -> Result<T> {
        self.data.get(self.index_of([x, y, z, t])?)
    }

    pub fn set_voxel<T: Pixel>(&self, x: usize, y: usize, z: usize, t: usize, value: T) -> Result<()> {
        self.data.set(self.index_of([x, y, z, t])?, value)
    }

    pub fn voxel_value(&self, x: usize, y: usize, z: usize, t: usize) -> Result<Value> {
        self.data.value(self.index_of([x, y, z, t])?)
    }

    pub fn set_voxel_value(&self, x: usize, y: usize, z: usize, t: usize, value: &Value) -> Result<()> {
        self.data.set_value(self.index_of([x, y, z, t])?, value)
    }

    /// Split into chunks covering the axes below `at_dim`
    ///
    /// Splicing a volume at the slice axis yields one chunk per slice. The
    /// pieces share this chunk's buffer. Properties whose length is a
    /// multiple of the number of pieces are distributed, everything else is
    /// copied to every piece.
    pub fn splice(&self, at_dim: usize) -> Result<Vec<Chunk>> {
        if at_dim >= DIMS {
            return Err(ImageError::Splice(format!("cannot splice at axis {}", at_dim)));
        }
        let whole = self.size();
        let mut piece_size = [1; DIMS];
        piece_size[..at_dim].copy_from_slice(&whole[..at_dim]);
        let piece_volume: usize = piece_size.iter().product();

        let mut pieces = self
            .data
            .splice(piece_volume)?
            .into_iter()
            .map(|array| Chunk::from_array(array, piece_size))
            .collect::<Result<Vec<_>>>()?;

        let mut source = self.props.clone();
        let mut targets: Vec<&mut PropertyMap> = pieces.iter_mut().map(|c| &mut c.props).collect();
        source.splice(&mut targets, false);
        Ok(pieces)
    }

    /// Splice along the topmost axis and fix up the position of each piece
    ///
    /// Piece `n` gets its `indexOrigin` moved by `n` voxel distances along the
    /// splice direction and its `acquisitionNumber` raised by
    /// `acquisition_number_stride * n`, unless those were lists with one
    /// entry per piece.
    pub fn auto_splice(&self, acquisition_number_stride: u64) -> Result<Vec<Chunk>> {
        if !self.is_valid() {
            return Err(ImageError::MissingProperties(self.missing().join(", ")));
        }
        let voxel_size = self.value_as::<Vector3>("voxelSize").unwrap_or([1.0; 3]);
        let voxel_gap = self.value_as::<Vector3>("voxelGap").unwrap_or([0.0; 3]);
        let distance = geometry::add(
            voxel_size,
            voxel_gap.map(|g| if g.is_finite() { g } else { 0.0 }),
        );
        let at_dim = self.relevant_dims() - 1;

        let direction = match at_dim {
            0 => self.value_as::<Vector3>("rowVec"),
            1 => self.value_as::<Vector3>("columnVec"),
            2 => self.slice_vec(),
            _ => None,
        };
        if at_dim < 3 && distance[at_dim] == 0.0 {
            error!(
                "The voxel distance along the splice axis {} is zero, the sorted image will likely break",
                at_dim
            );
        }
        if at_dim == 3 && acquisition_number_stride == 0 {
            error!("Splicing along time without acquisitionNumber stride, the next reindex will likely fail");
        }
        let origin_offset = match direction {
            Some(dir) if at_dim < 3 => geometry::scale(dir, distance[at_dim]),
            _ => [0.0; 3],
        };

        let extent = self.size()[at_dim];
        let was_list = |name: &str| self.property(name).is_some_and(|p| p.len() == extent);
        let origin_was_list = was_list("indexOrigin");
        let acquisition_was_list = was_list("acquisitionNumber");

        debug!(
            "Splicing chunk at axis {} with origin stride {:?} and acquisitionNumber stride {}",
            at_dim + 1,
            origin_offset,
            acquisition_number_stride
        );
        let mut pieces = self.splice(at_dim)?;
        for (cnt, piece) in pieces.iter_mut().enumerate().skip(1) {
            if !origin_was_list {
                let shift = geometry::scale(origin_offset, cnt as f64);
                piece.shift_property("indexOrigin", |v| v.translated(shift));
            }
            if !acquisition_was_list && acquisition_number_stride != 0 {
                let delta = (acquisition_number_stride as i64) * cnt as i64;
                piece.shift_property("acquisitionNumber", |v| v.offset_by(delta));
            }
        }
        Ok(pieces)
    }

    fn shift_property(&mut self, name: &str, op: impl Fn(&Value) -> Option<Value>) {
        let shifted = self
            .property(name)
            .and_then(|p| p.front())
            .and_then(|v| op(v));
        match shifted {
            Some(v) => {
                if let Err(e) = self.props.set_value(name, v) {
                    error!("Failed to update {}: {}", name, e);
                }
            }
            None => error!("Cannot shift {} of spliced chunk", name),
        }
    }

    pub fn min_max(&self) -> Option<(Value, Value)> {
        self.data.min_max()
    }

    /// Scaling to convert this chunk into `data_type`
    pub fn scaling_to(&self, data_type: DataType, option: ScalingOption) -> Result<Scaling> {
        match self.min_max() {
            Some((min, max)) => compute_scaling(&min, &max, data_type, option),
            None => Ok(Scaling::IDENTITY),
        }
    }

    /// Replace the voxel buffer by a converted copy
    pub fn convert_to_type(&mut self, data_type: DataType, scaling: Scaling) -> Result<()> {
        if data_type == self.data_type() && scaling.is_identity() {
            return Ok(());
        }
        self.data = self.data.convert_to(data_type, scaling)?;
        Ok(())
    }

    /// Copy of this chunk with its own buffer of type `data_type`
    pub fn copy_by_id(&self, data_type: DataType, scaling: Scaling) -> Result<Chunk> {
        Ok(Chunk {
            shape: self.shape,
            data: self.data.convert_to(data_type, scaling)?,
            props: self.props.clone(),
        })
    }

    /// Copy of this chunk with its own buffer of the same type
    pub fn deep_copy(&self) -> Chunk {
        Chunk {
            shape: self.shape,
            data: self.data.deep_copy(),
            props: self.props.clone(),
        }
    }

    /// Number of chunks sharing this chunk's buffer
    pub fn use_count(&self) -> usize {
        self.data.use_count()
    }

    /// Count voxels differing from `other`, every voxel differs if the sizes do
    pub fn compare(&self, other: &Chunk) -> usize {
        if self.size() != other.size() {
            return self.volume().max(other.volume());
        }
        self.data
            .compare(0, self.volume(), &other.data, 0)
            .unwrap_or(self.volume())
    }

    /// Count differing voxels from `start` to `end` (inclusive) against `other` at `destination`
    pub fn compare_range(
        &self,
        start: [usize; DIMS],
        end: [usize; DIMS],
        other: &Chunk,
        destination: [usize; DIMS],
    ) -> Result<usize> {
        let (s, e) = (self.index_of(start)?, self.index_of(end)?);
        let d = other.index_of(destination)?;
        self.data.compare(s, e + 1, &other.data, d)
    }

    /// Copy voxels from `start` to `end` (inclusive) into `dst` at `destination`
    pub fn copy_range(
        &self,
        start: [usize; DIMS],
        end: [usize; DIMS],
        dst: &Chunk,
        destination: [usize; DIMS],
    ) -> Result<()> {
        let (s, e) = (self.index_of(start)?, self.index_of(end)?);
        let d = dst.index_of(destination)?;
        self.data.copy_range(s, e + 1, &dst.data, d)
    }

    /// Copy one slice of this chunk into a slice of `dst`
    pub fn copy_slice(&self, slice: usize, timestep: usize, dst: &Chunk, dst_slice: usize, dst_timestep: usize) -> Result<()> {
        let [columns, rows, _, _] = self.size();
        self.copy_range(
            [0, 0, slice, timestep],
            [columns - 1, rows - 1, slice, timestep],
            dst,
            [0, 0, dst_slice, dst_timestep],
        )
    }

    /// Copy the voxels into an array indexed `[t, z, y, x]`
    pub fn to_ndarray<T: Pixel>(&self) -> Result<Array4<T>> {
        let [x, y, z, t] = self.size();
        let values = self.data.to_vec::<T>()?;
        Array4::from_shape_vec((t, z, y, x), values)
            .map_err(|e| ImageError::InvalidDimensions(e.to_string()))
    }

    /// `chunk`, `slice`, `volume` or `volset` depending on the relevant axes
    pub fn shape_string(&self, upper: bool) -> String {
        let name = match self.relevant_dims() {
            2 => "slice",
            3 => "volume",
            4 => "volset",
            _ => "chunk",
        };
        if upper {
            let mut chars = name.chars();
            chars
                .next()
                .map(|c| c.to_ascii_uppercase().to_string() + chars.as_str())
                .unwrap_or_default()
        } else {
            name.to_string()
        }
    }
}
