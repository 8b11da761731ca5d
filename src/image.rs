//! Assembly of chunks into a randomly addressable four dimensional image
//!
//! An [`Image`] collects chunks in a [`SortedChunkList`] and becomes usable
//! once [`Image::reindex`] has worked out how the sorted chunks tile the
//! image. Reindexing also hoists metadata shared by all chunks into the
//! image and repairs redundant geometry (direction vectors, slice gap,
//! field of view) where it is missing or inconsistent.

use crate::chunk::{Chunk, CHUNK_NEEDED};
use crate::error::{ImageError, Result};
use crate::geometry::{self, Vector3};
use crate::layout::{NDimensional, DIMS};
use crate::metadata::{PropPath, PropertyMap, PropertyValue};
use crate::options::ImageOptions;
use crate::sorted_chunk_list::SortedChunkList;
use crate::types::{DataType, Dimension, Scaling, ScalingOption};
use crate::utils::format_bytes;
use crate::value::{FromValue, Value};
use crate::value_array::{compute_scaling, Pixel, ValueArray};
use log::{debug, error, info, warn};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Properties a clean image must carry
pub const IMAGE_NEEDED: &[&str] = &["indexOrigin", "voxelSize", "rowVec", "columnVec", "sliceVec"];

/// Pushed into every chunk before it is spliced so the pieces stay valid
const SPLICE_NEEDED: &[&str] = &[
    "voxelSize",
    "voxelGap",
    "rowVec",
    "columnVec",
    "sliceVec",
    "indexOrigin",
    "acquisitionNumber",
];

/// Derived geometry that is recomputed on every reindex
const DERIVED_GEOMETRY: &[&str] = &["indexOrigin", "rowVec", "columnVec", "sliceVec"];

/// Anatomical plane closest to the slices of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Axial,
    ReversedAxial,
    Sagittal,
    ReversedSagittal,
    Coronal,
    ReversedCoronal,
}

/// A grid of chunks plus the metadata common to all of them
#[derive(Debug, Clone)]
pub struct Image {
    shape: NDimensional,
    props: PropertyMap,
    set: SortedChunkList,
    lookup: Vec<usize>,
    clean: bool,
    min_indexing_dim: Dimension,
    chunk_volume: usize,
    options: ImageOptions,
}

impl Default for Image {
    fn default() -> Self {
        Self::new()
    }
}

impl Image {
    pub fn new() -> Self {
        Self::with_options(ImageOptions::default())
    }

    pub fn with_options(options: ImageOptions) -> Self {
        Self {
            shape: NDimensional::default(),
            props: PropertyMap::new(),
            set: SortedChunkList::new(&options),
            lookup: Vec::new(),
            clean: false,
            min_indexing_dim: options.min_indexing_dim,
            chunk_volume: 0,
            options,
        }
    }

    /// Image made of a single chunk
    pub fn from_chunk(chunk: &Chunk, min_dim: Dimension) -> Result<Self> {
        let mut image = Self::with_options(ImageOptions::default().with_min_indexing_dim(min_dim));
        if !image.insert_chunk(chunk) {
            let cause = if !chunk.is_valid() {
                format!("it is missing {}", chunk.missing().join(", "))
            } else if !image.options.secondary_sort.iter().any(|p| chunk.has_property(p.as_str())) {
                format!(
                    "it has none of the secondary sort properties {}",
                    image.options.secondary_sort.join(", ")
                )
            } else {
                "its pieces could not be sorted into distinct positions".to_string()
            };
            return Err(ImageError::InvalidChunk(format!(
                "cannot create an image from the chunk, {}",
                cause
            )));
        }
        image.reindex()?;
        Ok(image)
    }

    /// Insert all `chunks` and reindex
    pub fn from_chunks<I>(chunks: I) -> Result<Self>
    where
        I: IntoIterator<Item = Chunk>,
    {
        let mut image = Self::new();
        let mut rejected = 0;
        for chunk in chunks {
            if !image.insert_chunk(&chunk) {
                rejected += 1;
            }
        }
        if rejected > 0 {
            info!("{} chunks were rejected while building the image", rejected);
        }
        image.reindex()?;
        Ok(image)
    }

    pub fn options(&self) -> &ImageOptions {
        &self.options
    }

    pub fn is_clean(&self) -> bool {
        self.clean
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
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

    pub fn value_as<T: FromValue>(&self, path: impl Into<PropPath>) -> Option<T> {
        self.props.value_as(path)
    }

    pub fn shape(&self) -> &NDimensional {
        &self.shape
    }

    pub fn size_as_vector(&self) -> [usize; DIMS] {
        self.shape.size()
    }

    pub fn volume(&self) -> usize {
        self.shape.volume()
    }

    /// Number of chunks in the current lookup table
    pub fn chunk_count(&self) -> usize {
        self.lookup.len()
    }

    pub fn chunk_volume(&self) -> usize {
        self.chunk_volume
    }

    pub fn nr_of_columns(&self) -> usize {
        self.shape.dim_size(Dimension::Row)
    }

    pub fn nr_of_rows(&self) -> usize {
        self.shape.dim_size(Dimension::Column)
    }

    pub fn nr_of_slices(&self) -> usize {
        self.shape.dim_size(Dimension::Slice)
    }

    pub fn nr_of_timesteps(&self) -> usize {
        self.shape.dim_size(Dimension::Time)
    }

    /// Properties missing for the image to be valid
    pub fn missing(&self) -> Vec<String> {
        self.props.missing(IMAGE_NEEDED)
    }

    fn ensure_clean(&self, what: &str) -> Result<()> {
        if self.clean {
            Ok(())
        } else {
            error!("Cannot {} of a non clean image, run reindex first", what);
            Err(ImageError::NotClean)
        }
    }

    fn lookup_chunks(&self) -> impl Iterator<Item = &Chunk> + '_ {
        self.lookup.iter().filter_map(|&slot| self.set.chunk(slot))
    }

    fn chunk_ref(&self, index: usize) -> Result<&Chunk> {
        let slot = self.lookup.get(index).ok_or_else(|| {
            ImageError::OutOfBounds(format!(
                "chunk {} requested, but the lookup table has {} entries",
                index,
                self.lookup.len()
            ))
        })?;
        self.set
            .chunk(*slot)
            .ok_or_else(|| ImageError::OutOfBounds(format!("chunk slot {} is empty", slot)))
    }

    fn origin_at(&self, index: usize) -> Vector3 {
        self.chunk_ref(index)
            .ok()
            .and_then(|c| c.value_as::<Vector3>("indexOrigin"))
            .unwrap_or([0.0; 3])
    }

    fn store(&mut self, key: &str, value: impl Into<Value>) {
        if let Err(e) = self.props.set_value(key, value) {
            error!("Failed to set {} of the image: {}", key, e);
        }
    }

    /// Insert a chunk, the image has to be reindexed afterwards
    ///
    /// Returns false if the chunk was rejected. Rejection leaves a clean
    /// image clean.
    pub fn insert_chunk(&mut self, chunk: &Chunk) -> bool {
        if self.clean {
            warn!("Inserting into already indexed images is inefficient, you should not do that");
            self.push_down_properties();
        }

        if self.set.insert(chunk) {
            self.clean = false;
            self.lookup.clear();
            true
        } else {
            if self.clean {
                self.deduplicate_properties();
            }
            false
        }
    }

    /// Move the image properties back into the chunks of the lookup table
    fn push_down_properties(&mut self) {
        let mut chunks = self.set.chunks_mut(&self.lookup);
        if let Some((last, rest)) = chunks.split_last_mut() {
            for chunk in rest {
                chunk.properties_mut().join(&self.props, false);
            }
            let rejected = last.properties_mut().transfer(&mut self.props, false);
            if !rejected.is_empty() {
                debug!("{} image properties conflict with the chunks and stay in the image", rejected.len());
            }
        }
    }

    /// Change the minimal indexing dimension, reindexing a clean image
    pub fn set_indexing_dim(&mut self, dim: Dimension) -> Result<()> {
        self.min_indexing_dim = dim;
        if self.clean {
            debug!("Image was already indexed, reindexing");
            self.reindex()?;
        }
        Ok(())
    }

    /// Reindex if needed, returns whether the image is clean afterwards
    pub fn check_make_clean(&mut self) -> bool {
        if !self.clean {
            debug!("Image is not clean, running reindex");
            if let Err(e) = self.reindex() {
                error!("Reindexing failed: {}", e);
            }
        }
        self.clean
    }

    /// Work out the structure of the sorted chunks
    pub fn reindex(&mut self) -> Result<()> {
        self.reindex_impl(None)
    }

    /// [`Image::reindex`], collecting the `source` of chunks dropped to make the image rectangular
    pub fn reindex_with_rejects(&mut self, rejected: &mut Vec<String>) -> Result<()> {
        self.reindex_impl(Some(rejected))
    }

    fn reindex_impl(&mut self, rejected: Option<&mut Vec<String>>) -> Result<()> {
        self.clean = false;
        if self.set.is_empty() {
            warn!("Reindexing an empty image is useless");
            return Err(ImageError::EmptyImage);
        }
        if self.set.make_rectangular(rejected) > 0 && self.set.is_empty() {
            error!("No rectangular image data left, skipping");
            return Err(ImageError::NoRectangularData);
        }

        self.lookup = self.set.lookup();
        let (chunk_dims, chunk_size, chunk_volume) = {
            let first = self.chunk_ref(0)?;
            (
                first.relevant_dims().max(self.min_indexing_dim.to_index()),
                first.size(),
                first.volume(),
            )
        };
        self.chunk_volume = chunk_volume;

        self.push_down_properties();
        for key in DERIVED_GEOMETRY {
            self.props.remove(*key);
        }

        let timesteps = self.set.horizontal_size();
        let sort_dims = DIMS - usize::from(timesteps > 1);
        let mut structure = [1usize; DIMS];

        if chunk_dims >= DIMS {
            if self.lookup.len() > 1 {
                error!(
                    "Cannot handle multiple chunks if they have more than {} dimensions",
                    DIMS - 1
                );
                return Err(ImageError::TooManyDimensions(DIMS));
            }
        } else {
            debug!("Computing strides for dimensions {} to {}", chunk_dims + 1, sort_dims);
            for i in chunk_dims..sort_dims {
                let prod: usize = structure.iter().product();
                structure[i] = self.chunk_stride(prod) / prod;
            }
        }
        if sort_dims < DIMS {
            structure[sort_dims] = timesteps;
        }

        let covered: usize = structure.iter().product();
        if covered == 0 || covered > self.lookup.len() {
            error!(
                "The detected structure {:?} does not fit {} chunks",
                structure,
                self.lookup.len()
            );
            return Err(ImageError::InvalidDimensions(format!(
                "chunk structure {:?} does not fit {} chunks",
                structure,
                self.lookup.len()
            )));
        }
        if covered < self.lookup.len() {
            warn!("Ignoring {} chunks at the end of the image", self.lookup.len() - covered);
            self.lookup.truncate(covered);
        }

        self.deduplicate_properties();

        structure[..chunk_dims.min(DIMS)].copy_from_slice(&chunk_size[..chunk_dims.min(DIMS)]);
        self.shape = NDimensional::new(structure)?;

        self.repair_geometry(chunk_dims);

        let missing = self.missing();
        if !missing.is_empty() {
            warn!(
                "The image is not valid after reindexing, missing properties: {}",
                missing.join(", ")
            );
            return Err(ImageError::MissingProperties(missing.join(", ")));
        }
        self.clean = true;
        debug!(
            "Reindexed {} image from {} chunks ({})",
            self.shape.size_string(),
            self.lookup.len(),
            format_bytes(self.lookup_chunks().map(|c| c.volume() * c.bytes_per_voxel()).sum())
        );
        Ok(())
    }

    /// Rebuild redundant geometry that is missing or inconsistent
    fn repair_geometry(&mut self, chunk_dims: usize) {
        for (axis, key) in ["rowVec", "columnVec", "sliceVec"].into_iter().enumerate() {
            if let Some(vec) = self.props.value_as::<Vector3>(key) {
                let fixed = if geometry::sqlen(vec) == 0.0 {
                    let mut unit = [0.0; 3];
                    unit[axis] = 1.0;
                    error!(
                        "The existing {} {:?} has the length zero, falling back to {:?}",
                        key, vec, unit
                    );
                    unit
                } else {
                    geometry::normalize(vec)
                };
                self.store(key, fixed);
            }
        }

        if !self.props.has_property("indexOrigin") {
            let found = self.chunk_ref(0).ok().and_then(|c| c.property("indexOrigin").cloned());
            match found {
                Some(origin) => {
                    if let Err(e) = self.props.set_property("indexOrigin", origin) {
                        error!("Failed to set indexOrigin of the image: {}", e);
                    }
                }
                None => {
                    error!("No indexOrigin found, falling back to (0,0,0)");
                    self.store("indexOrigin", [0.0; 3]);
                }
            }
        }

        let voxel_size = self.props.value_as::<Vector3>("voxelSize").map(|mut size| {
            for (i, v) in size.iter_mut().enumerate() {
                if *v == 0.0 || v.is_infinite() {
                    warn!("voxelSize[{}]=={} is invalid, using 1", i, v);
                    *v = 1.0;
                }
            }
            size
        });
        if let Some(size) = voxel_size {
            self.store("voxelSize", size);
        }

        let slices = self.shape.dim_size(Dimension::Slice);
        let first_origin = self
            .chunk_ref(0)
            .ok()
            .and_then(|c| c.value_as::<Vector3>("indexOrigin"));
        let last_origin = self
            .chunk_ref(slices.saturating_sub(1))
            .ok()
            .and_then(|c| c.value_as::<Vector3>("indexOrigin"));
        if let (2, true, Some(first), Some(last)) = (chunk_dims, slices > 1, first_origin, last_origin) {
            self.check_slice_distance(first, last, slices, voxel_size);
        }

        let row = self.props.value_as::<Vector3>("rowVec");
        let column = self.props.value_as::<Vector3>("columnVec");
        match (row, column) {
            (Some(row), Some(column)) => {
                if geometry::dot(row, column) > 0.01 {
                    warn!("The cosine between the columns and the rows of the image is bigger than 0.01");
                }
                let cross = geometry::cross(row, column);
                match self.props.value_as::<Vector3>("sliceVec") {
                    Some(slice) => {
                        if geometry::angle_deg(cross, slice) > 1.0 {
                            warn!(
                                "The existing sliceVec {:?} differs from the cross product of the row and column vector {:?}",
                                slice, cross
                            );
                        }
                    }
                    None => {
                        info!(
                            "Using the cross product between rowVec and columnVec as sliceVec: {:?}, that might be wrong",
                            cross
                        );
                        self.store("sliceVec", cross);
                    }
                }
            }
            _ => warn!("Image has no common rowVec/columnVec, won't check for sliceVec"),
        }

        if let (Some(mut stored), Some(calculated)) =
            (self.props.value_as::<Vector3>("fov"), self.compute_fov())
        {
            let mut ok = true;
            for i in 0..3 {
                if stored[i] != f64::NEG_INFINITY {
                    ok &= geometry::fuzzy_equal(stored[i], calculated[i], 1.0);
                } else {
                    stored[i] = calculated[i];
                }
            }
            if !ok {
                info!(
                    "The calculated field of view {:?} differs from the stored {:?}",
                    calculated, stored
                );
            }
            self.store("fov", stored);
        }
    }

    fn check_slice_distance(&mut self, first: Vector3, last: Vector3, slices: usize, voxel_size: Option<Vector3>) {
        let distance = geometry::sub(last, first);
        if geometry::len(distance) == 0.0 {
            error!("The distance between the first and the last chunk is zero");
        }
        let direction = geometry::normalize(distance);
        match self.props.value_as::<Vector3>("sliceVec") {
            Some(slice) => {
                if !geometry::fuzzy_equal_v(direction, slice) {
                    info!(
                        "The existing sliceVec {:?} differs from the distance vector between chunk 0 and {} {:?}",
                        slice,
                        slices - 1,
                        direction
                    );
                }
            }
            None => {
                debug!(
                    "Used the distance between chunk 0 and {} to synthesize the missing sliceVec as {:?}",
                    slices - 1,
                    direction
                );
                self.store("sliceVec", direction);
            }
        }

        let Some(voxel_size) = voxel_size else {
            return;
        };
        let average = geometry::len(distance) / (slices - 1) as f64;
        let slice_gap = average - voxel_size[2];
        if slice_gap > 0.0 {
            let mut gap = self
                .props
                .value_as::<Vector3>("voxelGap")
                .unwrap_or([0.0, 0.0, f64::NEG_INFINITY]);
            if gap[2] != f64::NEG_INFINITY {
                if !geometry::fuzzy_equal(gap[2], slice_gap, 500.0) {
                    warn!(
                        "The existing slice distance (voxelGap[2]) {} differs from the distance between chunk 0 and 1, which is {}",
                        gap[2], slice_gap
                    );
                }
            } else {
                gap[2] = slice_gap;
                debug!("Synthesized the missing slice distance (voxelGap[2]) as {}", slice_gap);
            }
            self.store("voxelGap", gap);
        }
    }

    /// Number of chunks per step of the next dimension above `base_stride`
    ///
    /// Walks the lookup table in steps of `base_stride` and reports the first
    /// position whose chunk is not further from chunk 0 than from its
    /// predecessor, which is where the next axis wraps around.
    pub fn chunk_stride(&self, base_stride: usize) -> usize {
        let count = self.lookup.len();
        if count == 0 || base_stride == 0 {
            error!("Lookup table for chunks is empty, run reindex first");
            return 0;
        }

        if count >= 4 * base_stride {
            let first = self.origin_at(0);
            let second = self.origin_at(base_stride);
            if geometry::sqlen(geometry::sub(second, first)) == 0.0 {
                debug!(
                    "Distance between 0 and {} is zero, assuming there are no dimensional breaks anymore",
                    base_stride
                );
                return base_stride;
            }
            let mut i = base_stride;
            while i < count - base_stride {
                let this = self.origin_at(i);
                let next = self.origin_at(i + base_stride);
                let dist_first = geometry::sqlen(geometry::sub(next, first));
                let dist_this = geometry::sqlen(geometry::sub(next, this));
                if dist_first <= dist_this {
                    debug!("Assuming dimensional break at {}", i + base_stride);
                    return i + base_stride;
                }
                i += base_stride;
            }
        } else if count % base_stride != 0 {
            error!(
                "The amount of chunks ({}) is not divisible by the block size of the dimension below ({}), maybe the image is incomplete",
                count, base_stride
            );
            warn!("Ignoring {} chunks", count % base_stride);
            return count - count % base_stride;
        }

        let horizontal = self.set.horizontal_size().max(1);
        debug!("No dimensional break found, assuming it to be at the end ({}/{})", count, horizontal);
        count / horizontal
    }

    /// Hoist properties common to all chunks into the image
    pub fn deduplicate_properties(&mut self) {
        if self.lookup.is_empty() {
            error!("The lookup table is empty, won't deduplicate");
            return;
        }
        {
            let mut maps: Vec<&mut PropertyMap> = self
                .set
                .chunks_mut(&self.lookup)
                .into_iter()
                .map(|c| c.properties_mut())
                .collect();
            self.props.deduplicate(&mut maps);
        }

        let records = self.set.take_not_spliced();
        if records.is_empty() {
            return;
        }
        let (mut maps, slots): (Vec<PropertyMap>, Vec<Vec<usize>>) =
            records.into_iter().map(|r| (r.props, r.slots)).unzip();
        {
            let mut refs: Vec<&mut PropertyMap> = maps.iter_mut().collect();
            self.props.deduplicate(&mut refs);
        }
        for (map, slots) in maps.iter().zip(&slots) {
            debug!("Copying {} remaining properties into {} spliced chunks", map.len(), slots.len());
            for chunk in self.set.chunks_mut(slots) {
                chunk.properties_mut().join(map, false);
            }
        }
    }

    fn locate(&self, coords: [usize; DIMS]) -> Result<(&Chunk, [usize; DIMS])> {
        self.ensure_clean("access voxels")?;
        if !self.shape.is_in_range(coords) {
            return Err(ImageError::OutOfBounds(format!(
                "{:?} is outside of image with size {}",
                coords,
                self.shape.size_string()
            )));
        }
        let linear = self.shape.linear_index(coords);
        let chunk = self.chunk_ref(linear / self.chunk_volume)?;
        Ok((chunk, chunk.shape().coords(linear % self.chunk_volume)))
    }

    pub fn voxel<T: Pixel>(&self, x: usize, y: usize, z: usize, t: usize) -> Result<T> {
        let (chunk, [cx, cy, cz, ct]) = self.locate([x, y, z, t])?;
        chunk.voxel(cx, cy, cz, ct)
    }

    /// Write a voxel, visible to every image sharing the chunk's buffer
    pub fn set_voxel<T: Pixel>(&self, x: usize, y: usize, z: usize, t: usize, value: T) -> Result<()> {
        let (chunk, [cx, cy, cz, ct]) = self.locate([x, y, z, t])?;
        chunk.set_voxel(cx, cy, cz, ct, value)
    }

    pub fn voxel_value(&self, x: usize, y: usize, z: usize, t: usize) -> Result<Value> {
        let (chunk, [cx, cy, cz, ct]) = self.locate([x, y, z, t])?;
        chunk.voxel_value(cx, cy, cz, ct)
    }

    pub fn set_voxel_value(&self, x: usize, y: usize, z: usize, t: usize, value: &Value) -> Result<()> {
        let (chunk, [cx, cy, cz, ct]) = self.locate([x, y, z, t])?;
        chunk.set_voxel_value(cx, cy, cz, ct, value)
    }

    /// Chunk at position `index` of the lookup table
    ///
    /// With `copy_metadata` the image properties are joined into the returned chunk.
    pub fn chunk_at(&self, index: usize, copy_metadata: bool) -> Result<Chunk> {
        let mut chunk = self.chunk_ref(index)?.clone();
        if copy_metadata {
            chunk.properties_mut().join(&self.props, false);
        }
        Ok(chunk)
    }

    /// The chunk holding voxel `(x, y, z, t)`
    pub fn get_chunk(&self, x: usize, y: usize, z: usize, t: usize, copy_metadata: bool) -> Result<Chunk> {
        self.ensure_clean("get a chunk")?;
        if !self.shape.is_in_range([x, y, z, t]) {
            return Err(ImageError::OutOfBounds(format!(
                "({}, {}, {}, {}) is outside of image with size {}",
                x,
                y,
                z,
                t,
                self.shape.size_string()
            )));
        }
        let linear = self.shape.linear_index([x, y, z, t]);
        self.chunk_at(linear / self.chunk_volume, copy_metadata)
    }

    /// Chunks in lookup order, sharing their buffers with the image
    pub fn copy_chunks_to_vector(&self, copy_metadata: bool) -> Vec<Chunk> {
        self.lookup_chunks()
            .map(|chunk| {
                let mut chunk = chunk.clone();
                if copy_metadata {
                    chunk.properties_mut().join(&self.props, false);
                }
                chunk
            })
            .collect()
    }

    /// Values of `key` in every chunk, in lookup order
    ///
    /// With `unique`, missing values and repetitions of the previous value are skipped.
    pub fn chunks_properties(&self, key: impl Into<PropPath>, unique: bool) -> Result<Vec<PropertyValue>> {
        self.ensure_clean("get chunk properties")?;
        let key = key.into();
        let mut out: Vec<PropertyValue> = Vec::new();
        for chunk in self.lookup_chunks() {
            let prop = chunk.property(&key);
            if unique {
                match prop {
                    None => continue,
                    Some(p) if p.is_empty() || out.last() == Some(p) => continue,
                    _ => {}
                }
            }
            out.push(prop.cloned().unwrap_or_default());
        }
        Ok(out)
    }

    /// Largest voxel size in bytes among the chunks
    pub fn max_bytes_per_voxel(&self) -> Result<usize> {
        let first = self.chunk_ref(0)?.bytes_per_voxel();
        Ok(self.lookup_chunks().fold(first, |bytes, chunk| {
            let size = chunk.bytes_per_voxel();
            if size != bytes {
                debug!("Not all voxels have the same byte size ({}!={}), using the biggest", bytes, size);
            }
            bytes.max(size)
        }))
    }

    /// Smallest and largest voxel value over all chunks
    pub fn min_max(&self) -> Result<(Value, Value)> {
        self.ensure_clean("compute min/max")?;
        let mut result: Option<(Value, Value)> = None;
        for (lo, hi) in self.lookup_chunks().filter_map(|c| c.min_max()) {
            result = Some(match result {
                None => (lo, hi),
                Some((min, max)) => (
                    if lo.scalar_cmp(&min) == Ordering::Less { lo } else { min },
                    if hi.scalar_cmp(&max) == Ordering::Greater { hi } else { max },
                ),
            });
        }
        result.ok_or_else(|| ImageError::TypeSelection("no chunk with a scalar value range".to_string()))
    }

    /// Single scaling converting every chunk into `data_type`
    pub fn scaling_to(&self, data_type: DataType, option: ScalingOption) -> Result<Scaling> {
        self.ensure_clean("compute a scaling")?;
        if self.lookup_chunks().all(|c| c.data_type() == data_type) {
            return Ok(Scaling::IDENTITY);
        }
        let (min, max) = self.min_max()?;
        compute_scaling(&min, &max, data_type, option)
    }

    /// Narrowest type able to hold every voxel of the image
    pub fn major_type_id(&self) -> Result<DataType> {
        self.ensure_clean("determine the major type")?;
        let first = self.chunk_ref(0)?.data_type();
        if !first.has_min_max() {
            info!("Using flat type {} because no min/max can be computed", first);
            return Ok(first);
        }
        let (min, max) = self.min_max()?;
        debug!("Determining data type of image with the value range [{}, {}]", min, max);
        let (Some(min_type), Some(max_type)) = (min.data_type(), max.data_type()) else {
            return Err(ImageError::TypeSelection(format!("range was [{}, {}]", min, max)));
        };
        if min_type == max_type {
            Ok(min_type)
        } else if min.fits_into(max_type) {
            Ok(max_type)
        } else if max.fits_into(min_type) {
            Ok(min_type)
        } else {
            error!("Cannot decide between {} and {}", min_type, max_type);
            Err(ImageError::TypeSelection(format!("range was [{}, {}]", min, max)))
        }
    }

    /// Convert every chunk in place with the given scaling
    ///
    /// `window/min` and `window/max` are rescaled alongside the voxels.
    pub fn convert_to_type_scaled(&mut self, data_type: DataType, scaling: Scaling) -> Result<()> {
        self.ensure_clean("convert the voxels")?;
        for chunk in self.set.chunks_mut(&self.lookup) {
            chunk.convert_to_type(data_type, scaling)?;
        }
        for key in ["window/max", "window/min"] {
            self.props.transform(key, |p| {
                p.iter()
                    .map(|v| v.scaled(scaling))
                    .collect::<Option<Vec<_>>>()
                    .map(PropertyValue::from_values)
                    .or_else(|| Some(p.clone()))
            });
        }
        Ok(())
    }

    /// Convert every chunk in place, computing one scaling for the whole image
    pub fn convert_to_type(&mut self, data_type: DataType, option: ScalingOption) -> Result<()> {
        self.ensure_clean("convert the voxels")?;
        if self.lookup_chunks().all(|c| c.data_type() == data_type) {
            return Ok(());
        }
        let scaling = self.scaling_to(data_type, option)?;
        debug!("Computed scaling {:?} of the image data", scaling);
        self.convert_to_type_scaled(data_type, scaling)
    }

    /// Copy all voxels into `dst`, converting them
    ///
    /// Without an explicit scaling one is computed from the image's value range.
    pub fn copy_to_value_array(&self, dst: &ValueArray, scaling: Option<Scaling>) -> Result<()> {
        self.ensure_clean("copy the voxels")?;
        if self.volume() > dst.len() {
            error!("Image won't fit into the value array, won't copy");
            return Err(ImageError::OutOfBounds(format!(
                "{} voxels do not fit into {} elements",
                self.volume(),
                dst.len()
            )));
        }
        let scaling = match scaling {
            Some(s) => s,
            None => self.scaling_to(dst.data_type(), ScalingOption::AutoScale)?,
        };
        for (i, chunk) in self.lookup_chunks().enumerate() {
            chunk.value_array().copy_into(dst, i * self.chunk_volume, scaling)?;
        }
        Ok(())
    }

    /// Copy of the image whose chunks own buffers of type `data_type`
    pub fn copy_by_id(&self, data_type: DataType, scaling: Option<Scaling>) -> Result<Image> {
        let scaling = match scaling {
            Some(s) => s,
            None if self.clean => self.scaling_to(data_type, ScalingOption::AutoScale)?,
            None => Scaling::IDENTITY,
        };
        let mut ret = self.clone();
        let mut failure = None;
        ret.set.transform(|chunk| {
            if failure.is_some() {
                return;
            }
            match chunk.copy_by_id(data_type, scaling) {
                Ok(copy) => *chunk = copy,
                Err(e) => failure = Some(e),
            }
        });
        if let Some(e) = failure {
            return Err(e);
        }
        if !ret.clean {
            debug!("Copied unclean image, running reindex on the copy");
            ret.reindex()?;
        }
        Ok(ret)
    }

    /// Count voxels that differ from `other`
    ///
    /// Differing sizes add the product of the size differences.
    pub fn compare(&self, other: &Image) -> Result<usize> {
        self.ensure_clean("compare")?;
        other.ensure_clean("compare")?;
        let mut ret = 0;
        let (mine, theirs) = (self.size_as_vector(), other.size_as_vector());
        if mine != theirs {
            warn!(
                "Size of images differs ({} / {}), adding difference to the result",
                self.shape.size_string(),
                other.shape.size_string()
            );
            ret += mine.iter().zip(theirs.iter()).map(|(a, b)| a.abs_diff(*b)).product::<usize>();
        }

        let (first, second) = (self.chunk_ref(0)?.size(), other.chunk_ref(0)?.size());
        let increment: usize = first.iter().zip(second.iter()).map(|(a, b)| (*a).min(*b)).product();
        let volume = self.volume().min(other.volume());
        let mut i = 0;
        while i + increment <= volume {
            let c1 = self.chunk_ref(i / self.chunk_volume)?;
            let c2 = other.chunk_ref(i / other.chunk_volume)?;
            let start = i % self.chunk_volume;
            ret += c1.value_array().compare(
                start,
                start + increment,
                c2.value_array(),
                i % other.chunk_volume,
            )?;
            i += increment;
        }
        Ok(ret)
    }

    /// Visit every chunk together with the image position of its first voxel
    ///
    /// Returns the number of visits for which `op` returned false.
    pub fn foreach_chunk<F>(&mut self, mut op: F, copy_metadata: bool) -> Result<usize>
    where
        F: FnMut(&Chunk, [usize; DIMS]) -> bool,
    {
        if !self.check_make_clean() {
            return Err(ImageError::NotClean);
        }
        let image_size = self.size_as_vector();
        let chunk_size = self.chunk_ref(0)?.size();
        let mut errors = 0;
        for t in (0..image_size[3]).step_by(chunk_size[3]) {
            for z in (0..image_size[2]).step_by(chunk_size[2]) {
                for y in (0..image_size[1]).step_by(chunk_size[1]) {
                    for x in (0..image_size[0]).step_by(chunk_size[0]) {
                        let chunk = self.get_chunk(x, y, z, t, copy_metadata)?;
                        if !op(&chunk, [x, y, z, t]) {
                            errors += 1;
                        }
                    }
                }
            }
        }
        Ok(errors)
    }

    fn compute_fov(&self) -> Option<Vector3> {
        let voxel_size = self.props.value_as::<Vector3>("voxelSize")?;
        let gap = self.props.value_as::<Vector3>("voxelGap").unwrap_or([0.0; 3]);
        for (i, g) in gap.iter().enumerate() {
            if *g == f64::NEG_INFINITY {
                info!("Ignoring unknown voxel gap in direction {}", i);
            }
        }
        Some(self.shape.fov(voxel_size, gap))
    }

    /// Physical extent of the image, unknown gaps count as zero
    pub fn fov(&self) -> Result<Vector3> {
        self.ensure_clean("compute the field of view")?;
        self.compute_fov()
            .ok_or_else(|| ImageError::MissingProperties("voxelSize".to_string()))
    }

    /// Anatomical plane the slices are closest to
    pub fn main_orientation(&self) -> Result<Orientation> {
        self.ensure_clean("determine the orientation")?;
        let (Some(row), Some(column)) = (
            self.value_as::<Vector3>("rowVec"),
            self.value_as::<Vector3>("columnVec"),
        ) else {
            return Err(ImageError::MissingProperties("rowVec, columnVec".to_string()));
        };
        let (row, column) = (geometry::normalize(row), geometry::normalize(column));
        if geometry::dot(row, column) > 0.01 {
            warn!("The cosine between the columns and the rows of the image is bigger than 0.01");
        }
        let normal = geometry::cross(row, column);
        let angle = |axis: Vector3| {
            let a = geometry::dot(normal, axis).clamp(-1.0, 1.0).acos() / std::f64::consts::PI;
            if a > 0.5 {
                ((a - 1.0).abs(), true)
            } else {
                (a, false)
            }
        };
        let candidates = [
            (angle([0.0, 0.0, 1.0]), Orientation::Axial, Orientation::ReversedAxial),
            (angle([1.0, 0.0, 0.0]), Orientation::Sagittal, Orientation::ReversedSagittal),
            (angle([0.0, 1.0, 0.0]), Orientation::Coronal, Orientation::ReversedCoronal),
        ];
        debug!(
            "Angles to vectors are {} to z, {} to x and {} to y",
            candidates[0].0 .0 * 180.0,
            candidates[1].0 .0 * 180.0,
            candidates[2].0 .0 * 180.0
        );
        let pick = |((_, inverse), plane, reversed): &((f64, bool), Orientation, Orientation)| {
            if *inverse {
                *reversed
            } else {
                *plane
            }
        };
        if let Some(found) = candidates.iter().find(|c| c.0 .0 <= 0.25) {
            return Ok(pick(found));
        }
        let closest = candidates
            .iter()
            .min_by(|a, b| a.0 .0.total_cmp(&b.0 .0))
            .map(pick)
            .unwrap_or(Orientation::Axial);
        warn!("The image is oblique, using the closest plane {:?}", closest);
        Ok(closest)
    }

    /// Human readable identification built from sequence properties
    pub fn identify(&self, with_path: bool, with_date: bool) -> String {
        if with_path
            && !self.props.has_property("source")
            && !self.chunk_ref(0).is_ok_and(|c| c.has_property("source"))
        {
            warn!("Asking for the path in an image that has no \"source\" property");
        }
        self.set.identify(with_path, with_date, &self.props)
    }

    /// Split every chunk until it has `dim` relevant dimensions and reindex
    ///
    /// Returns the number of chunks afterwards. Chunks already having `dim`
    /// relevant dimensions are left alone.
    pub fn splice_down_to(&mut self, dim: Dimension) -> Result<usize> {
        self.ensure_clean("splice the chunks")?;
        let dim = dim.to_index();
        let relevant = self.chunk_ref(0)?.relevant_dims();
        if relevant < dim {
            error!(
                "The dimensionality of the chunks of this image is already below {}, cannot splice it",
                dim
            );
            return Err(ImageError::Splice(format!(
                "chunks have {} relevant dimensions, cannot splice to {}",
                relevant, dim
            )));
        } else if relevant == dim {
            info!("Skipping useless splicing, relevant dimensions are already {}", relevant);
            return Ok(self.lookup.len());
        }
        if dim == 0 {
            return Err(ImageError::Splice("cannot splice below a single row".to_string()));
        }

        let backup = self.clone();
        match self.splice_chunks(dim) {
            Ok(count) => Ok(count),
            Err(e) => {
                error!("Splicing failed, restoring the image: {}", e);
                *self = backup;
                Err(e)
            }
        }
    }

    fn splice_chunks(&mut self, dim: usize) -> Result<usize> {
        let mut image_size = self.size_as_vector();
        image_size[..dim].fill(1);
        let amount: usize = image_size.iter().product();

        let needed: BTreeSet<&str> = CHUNK_NEEDED.iter().chain(SPLICE_NEEDED).copied().collect();
        let old_lookup = std::mem::take(&mut self.lookup);
        let mut chunks: Vec<Chunk> = old_lookup.iter().filter_map(|&s| self.set.chunk(s).cloned()).collect();
        self.set = SortedChunkList::new(&self.options);
        self.clean = false;

        {
            let mut maps: Vec<&mut PropertyMap> = chunks.iter_mut().map(|c| c.properties_mut()).collect();
            self.props.splice(&mut maps, true);
        }
        for need in needed {
            let Some(found) = self.props.property(need).cloned() else {
                continue;
            };
            for chunk in chunks.iter_mut() {
                if chunk.has_property(need) {
                    debug!("{} was found in the chunk although it is in the image as well", need);
                } else if let Err(e) = chunk.set_property(need, found.clone()) {
                    error!("Failed to copy {} into the chunk for splicing: {}", need, e);
                }
            }
            self.props.remove(need);
        }

        for chunk in &chunks {
            self.splice_recursive(chunk, dim, amount)?;
        }
        self.reindex()?;
        Ok(self.lookup.len())
    }

    fn splice_recursive(&mut self, chunk: &Chunk, dim: usize, amount: usize) -> Result<()> {
        let top = chunk.relevant_dims() - 1;
        if top >= dim {
            let sub = self.shape.size()[top];
            let stride = amount / sub;
            for piece in chunk.auto_splice(stride as u64)? {
                self.splice_recursive(&piece, dim, stride)?;
            }
        } else if !self.insert_chunk(chunk) {
            warn!(
                "Failed to insert splice result at {:?}",
                chunk.value_as::<Vector3>("indexOrigin")
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn slice(z: f64, acquisition: u32, fill: u8) -> Chunk {
        Chunk::new(vec![fill; 16], [4, 4, 1, 1])
            .unwrap()
            .with_property("indexOrigin", [0.0, 0.0, z])
            .unwrap()
            .with_property("acquisitionNumber", acquisition)
            .unwrap()
            .with_property("voxelSize", [1.0, 1.0, 1.0])
            .unwrap()
            .with_property("rowVec", [1.0, 0.0, 0.0])
            .unwrap()
            .with_property("columnVec", [0.0, 1.0, 0.0])
            .unwrap()
    }

    fn stack(n: u32) -> Image {
        Image::from_chunks((0..n).map(|z| slice(z as f64, z, z as u8))).unwrap()
    }

    #[test]
    fn test_empty_image_fails() {
        init_logger();
        let mut image = Image::new();
        assert!(matches!(image.reindex(), Err(ImageError::EmptyImage)));
        assert!(!image.is_clean());
        assert!(matches!(image.voxel::<u8>(0, 0, 0, 0), Err(ImageError::NotClean)));
    }

    #[test]
    fn test_slices_stack_up() {
        init_logger();
        let image = stack(3);
        assert!(image.is_clean());
        assert_eq!(image.size_as_vector(), [4, 4, 3, 1]);
        assert_eq!(image.voxel::<u8>(3, 3, 2, 0).unwrap(), 2);
        assert_eq!(image.value_as::<Vector3>("sliceVec"), Some([0.0, 0.0, 1.0]));
        assert_eq!(image.value_as::<Vector3>("indexOrigin"), Some([0.0, 0.0, 0.0]));
        // slices touch each other, so there is no gap
        assert!(!image.properties().has_property("voxelGap"));
        assert!(image.get_chunk(0, 0, 3, 0, false).is_err());
    }

    #[test]
    fn test_slice_gap_is_synthesized() {
        init_logger();
        let image = Image::from_chunks((0..3).map(|z| slice(z as f64 * 1.5, z, 0))).unwrap();
        let gap = image.value_as::<Vector3>("voxelGap").unwrap();
        assert!((gap[2] - 0.5).abs() < 1e-9);
        let fov = image.fov().unwrap();
        assert!((fov[2] - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_geometry_is_repaired() {
        init_logger();
        let chunks = (0..2).map(|z| {
            slice(z as f64, z, 0)
                .with_property("rowVec", [0.0, 0.0, 0.0])
                .unwrap()
                .with_property("sliceVec", [0.0, 0.0, 2.0])
                .unwrap()
                .with_property("voxelSize", [0.0, f64::INFINITY, 1.0])
                .unwrap()
        });
        let image = Image::from_chunks(chunks).unwrap();
        assert_eq!(image.size_as_vector(), [4, 4, 2, 1]);
        assert_eq!(image.value_as::<Vector3>("rowVec"), Some([1.0, 0.0, 0.0]));
        assert_eq!(image.value_as::<Vector3>("columnVec"), Some([0.0, 1.0, 0.0]));
        assert_eq!(image.value_as::<Vector3>("sliceVec"), Some([0.0, 0.0, 1.0]));
        assert_eq!(image.value_as::<Vector3>("voxelSize"), Some([1.0, 1.0, 1.0]));
        assert_eq!(image.fov().unwrap(), [4.0, 4.0, 2.0]);
    }

    #[test]
    fn test_fov_and_unknown_gap() {
        init_logger();
        let unknown = f64::NEG_INFINITY;
        let chunks = (0..3).map(|z| {
            slice(z as f64 * 1.5, z, 0)
                .with_property("voxelGap", [unknown, 0.0, unknown])
                .unwrap()
                .with_property("fov", [unknown, 4.0, unknown])
                .unwrap()
        });
        let image = Image::from_chunks(chunks).unwrap();

        // the unknown slice gap is taken from the slice positions
        let gap = image.value_as::<Vector3>("voxelGap").unwrap();
        assert_eq!(gap[0], unknown);
        assert!((gap[2] - 0.5).abs() < 1e-9);
        // unknown fov components are filled in from the computed one
        let fov = image.value_as::<Vector3>("fov").unwrap();
        assert_eq!(fov[0], 4.0);
        assert_eq!(fov[1], 4.0);
        assert!((fov[2] - 4.0).abs() < 1e-9);

        // a mismatching fov is reported but kept
        let chunks = (0..3).map(|z| {
            slice(z as f64, z, 0)
                .with_property("fov", [unknown, 9.0, unknown])
                .unwrap()
        });
        let image = Image::from_chunks(chunks).unwrap();
        assert_eq!(image.value_as::<Vector3>("fov"), Some([4.0, 9.0, 3.0]));
    }

    #[test]
    fn test_from_chunk_reports_cause() {
        init_logger();
        let invalid = Chunk::new(vec![0u8; 16], [4, 4, 1, 1]).unwrap();
        match Image::from_chunk(&invalid, Dimension::Row) {
            Err(ImageError::InvalidChunk(msg)) => assert!(msg.contains("missing indexOrigin")),
            other => panic!("unexpected result {:?}", other),
        }

        // every piece of the volume claims the same position and acquisition
        let mut volume = Chunk::new(vec![0u8; 48], [4, 4, 3, 1])
            .unwrap()
            .with_property("voxelSize", [1.0, 1.0, 1.0])
            .unwrap()
            .with_property("rowVec", [1.0, 0.0, 0.0])
            .unwrap()
            .with_property("columnVec", [0.0, 1.0, 0.0])
            .unwrap();
        volume
            .set_property("acquisitionNumber", PropertyValue::from_values(vec![Value::U32(0); 3]))
            .unwrap();
        volume
            .set_property(
                "indexOrigin",
                PropertyValue::from_values(vec![Value::Vector3([0.0; 3]); 3]),
            )
            .unwrap();
        match Image::from_chunk(&volume, Dimension::Row) {
            Err(ImageError::InvalidChunk(msg)) => {
                assert!(!msg.contains("missing"));
                assert!(msg.contains("distinct positions"));
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_failed_splice_leaves_image_intact() {
        init_logger();
        let volume = Chunk::new((0..96u16).collect::<Vec<_>>(), [4, 4, 3, 2])
            .unwrap()
            .with_property("indexOrigin", [0.0, 0.0, 0.0])
            .unwrap()
            .with_property("acquisitionNumber", 0u32)
            .unwrap()
            .with_property("voxelSize", [1.0, 1.0, 1.0])
            .unwrap()
            .with_property("rowVec", [1.0, 0.0, 0.0])
            .unwrap()
            .with_property("columnVec", [0.0, 1.0, 0.0])
            .unwrap();
        let mut image = Image::from_chunk(&volume, Dimension::Row).unwrap();
        // without a voxelSize the pieces cannot be made valid
        image.properties_mut().remove("voxelSize");
        let props = image.properties().clone();

        assert!(matches!(
            image.splice_down_to(Dimension::Slice),
            Err(ImageError::MissingProperties(_))
        ));
        assert!(image.is_clean());
        assert_eq!(image.chunk_count(), 1);
        assert_eq!(image.size_as_vector(), [4, 4, 3, 2]);
        assert_eq!(image.properties(), &props);
        assert_eq!(image.voxel::<u16>(3, 3, 2, 1).unwrap(), 95);
    }

    #[test]
    fn test_reindex_is_idempotent() {
        init_logger();
        let mut image = stack(4);
        let lookup = image.lookup.clone();
        let props = image.properties().clone();
        image.reindex().unwrap();
        assert_eq!(image.lookup, lookup);
        assert_eq!(image.properties(), &props);
        assert_eq!(image.size_as_vector(), [4, 4, 4, 1]);
    }

    #[test]
    fn test_chunk_stride() {
        init_logger();
        let image = stack(6);
        assert_eq!(image.chunk_stride(1), 6);
        assert_eq!(image.chunk_stride(6), 6);
    }

    #[test]
    fn test_insert_into_clean_image() {
        init_logger();
        let mut image = stack(2);
        assert!(!image.insert_chunk(&slice(1.0, 1, 0)));
        assert!(image.is_clean());
        assert!(image.properties().has_property("voxelSize"));

        // the image synthesized a sliceVec which now is compared as well
        let next = slice(2.0, 2, 2).with_property("sliceVec", [0.0, 0.0, 1.0]).unwrap();
        assert!(image.insert_chunk(&next));
        assert!(!image.is_clean());
        assert!(image.check_make_clean());
        assert_eq!(image.nr_of_slices(), 3);
    }

    #[test]
    fn test_major_type() {
        init_logger();
        let wide = Chunk::new(vec![-100i16, 50, 0, 0], [2, 2, 1, 1]).unwrap();
        let narrow = Chunk::new(vec![0u8, 200, 0, 0], [2, 2, 1, 1]).unwrap();
        let chunks = [narrow, wide].into_iter().enumerate().map(|(z, c)| {
            let mut c = c;
            for (key, value) in slice(z as f64, z as u32, 0).properties().flat_map() {
                c.set_property(&key, value.clone()).unwrap();
            }
            c
        });
        let image = Image::from_chunks(chunks).unwrap();
        assert_eq!(image.min_max().unwrap(), (Value::I16(-100), Value::U8(200)));
        assert_eq!(image.major_type_id().unwrap(), DataType::I16);
    }

    #[test]
    fn test_convert_rescales_window() {
        init_logger();
        let mut image = Image::from_chunks((0..2).map(|z| {
            let chunk = Chunk::new(vec![0i16, 1000, -1000, 0], [2, 2, 1, 1]).unwrap();
            let mut chunk = chunk;
            for (key, value) in slice(z as f64, z, 0).properties().flat_map() {
                chunk.set_property(&key, value.clone()).unwrap();
            }
            chunk
        }))
        .unwrap();
        image.properties_mut().set_value("window/max", 1000.0).unwrap();
        image.convert_to_type(DataType::U8, ScalingOption::AutoScale).unwrap();
        assert_eq!(image.major_type_id().unwrap(), DataType::U8);
        assert_eq!(image.voxel::<u8>(0, 1, 0, 0).unwrap(), 0);
        assert_eq!(image.voxel::<u8>(1, 0, 1, 0).unwrap(), 255);
        let window = image.value_as::<f64>("window/max").unwrap();
        assert!((window - 255.0).abs() < 1e-9);
    }

    #[test]
    fn test_copy_by_id_owns_buffers() {
        init_logger();
        let image = stack(3);
        let copy = image.copy_by_id(DataType::F32, None).unwrap();
        assert_eq!(copy.voxel::<f32>(0, 0, 2, 0).unwrap(), 2.0);
        copy.set_voxel::<f32>(0, 0, 2, 0, 9.0).unwrap();
        assert_eq!(image.voxel::<u8>(0, 0, 2, 0).unwrap(), 2);

        let shared = image.clone();
        shared.set_voxel::<u8>(0, 0, 0, 0, 7).unwrap();
        assert_eq!(image.voxel::<u8>(0, 0, 0, 0).unwrap(), 7);
    }

    #[test]
    fn test_copy_to_value_array_and_compare() {
        init_logger();
        let image = stack(3);
        let dst = ValueArray::zeros(DataType::U16, image.volume());
        image.copy_to_value_array(&dst, None).unwrap();
        assert_eq!(dst.get::<u16>(16 * 2).unwrap(), 2);

        let other = stack(3);
        assert_eq!(image.compare(&other).unwrap(), 0);
        other.set_voxel::<u8>(1, 1, 1, 0, 42).unwrap();
        assert_eq!(image.compare(&other).unwrap(), 1);
    }

    #[test]
    fn test_chunks_properties_and_foreach() {
        init_logger();
        let mut image = stack(3);
        let numbers = image.chunks_properties("acquisitionNumber", true).unwrap();
        assert_eq!(numbers.len(), 3);
        assert_eq!(numbers[2].as_type::<u32>(), Some(2));

        let mut positions = Vec::new();
        let failed = image
            .foreach_chunk(
                |chunk, pos| {
                    positions.push(pos);
                    chunk.has_property("voxelSize")
                },
                true,
            )
            .unwrap();
        assert_eq!(failed, 0);
        assert_eq!(positions, vec![[0, 0, 0, 0], [0, 0, 1, 0], [0, 0, 2, 0]]);
        assert_eq!(image.max_bytes_per_voxel().unwrap(), 1);
    }

    #[test]
    fn test_orientation() {
        init_logger();
        let image = stack(2);
        assert_eq!(image.main_orientation().unwrap(), Orientation::Axial);

        let sagittal = Image::from_chunks((0..2).map(|x| {
            let mut chunk = slice(0.0, x, 0);
            chunk.set_property("indexOrigin", [x as f64, 0.0, 0.0]).unwrap();
            chunk.set_property("rowVec", [0.0, 1.0, 0.0]).unwrap();
            chunk.set_property("columnVec", [0.0, 0.0, -1.0]).unwrap();
            chunk
        }))
        .unwrap();
        assert_eq!(sagittal.main_orientation().unwrap(), Orientation::ReversedSagittal);
    }
}
