//! Two level sorting of chunks by position and acquisition order
//!
//! Chunks are bucketed by their position (the projection of `indexOrigin`
//! onto the chunk's own row, column and slice vectors) and, inside each
//! bucket, by the value of a secondary sort property such as
//! `acquisitionNumber`. Chunks live in an arena of slots, the maps store
//! slot indices.

use crate::chunk::{Chunk, CHUNK_NEEDED};
use crate::geometry::{self, Vector3};
use crate::metadata::PropertyMap;
use crate::options::ImageOptions;
use crate::utils::common_root_path;
use crate::value::Value;
use log::{debug, error, info, warn};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Position of a chunk, ordered with the last component dominating
///
/// Components are quantized to single precision so origins differing only
/// by rounding noise share a bucket.
#[derive(Debug, Clone, Copy)]
struct PositionKey(Vector3);

impl PartialEq for PositionKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PositionKey {}

impl PartialOrd for PositionKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PositionKey {
    fn cmp(&self, other: &Self) -> Ordering {
        geometry::lexical_cmp_reverse(&self.0, &other.0)
    }
}

/// Scalar value of the secondary sort property
#[derive(Debug, Clone)]
struct SortKey(Value);

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortKey {}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.scalar_cmp(&other.0)
    }
}

type SecondaryMap = BTreeMap<SortKey, usize>;

/// Properties taken out of a chunk before it was split for sorting,
/// together with the slots of the resulting pieces
#[derive(Debug, Clone, Default)]
pub struct NotSpliced {
    pub props: PropertyMap,
    pub slots: Vec<usize>,
}

/// Chunks sorted into a primary (position) by secondary (acquisition) matrix
#[derive(Debug, Clone)]
pub struct SortedChunkList {
    options: ImageOptions,
    slots: Vec<Option<Chunk>>,
    chunks: BTreeMap<PositionKey, SecondaryMap>,
    equal_props: Vec<String>,
    secondary_sort: Vec<String>,
    protected_props: BTreeSet<String>,
    not_spliced: Vec<NotSpliced>,
}

impl SortedChunkList {
    pub fn new(options: &ImageOptions) -> Self {
        let mut protected_props: BTreeSet<String> = options.equal_props.iter().cloned().collect();
        protected_props.extend(CHUNK_NEEDED.iter().map(|s| s.to_string()));
        protected_props.extend(options.protected_props.iter().cloned());
        Self {
            options: options.clone(),
            slots: Vec::new(),
            chunks: BTreeMap::new(),
            equal_props: options.equal_props.clone(),
            secondary_sort: options.secondary_sort.clone(),
            protected_props,
            not_spliced: Vec::new(),
        }
    }

    /// Register a secondary sort property, it is tried before all earlier ones
    pub fn add_secondary_sort(&mut self, prop: impl Into<String>) {
        self.secondary_sort.push(prop.into());
    }

    /// The secondary sort property currently in use
    pub fn secondary_sort(&self) -> Option<&str> {
        self.secondary_sort.last().map(String::as_str)
    }

    pub fn equal_props(&self) -> &[String] {
        &self.equal_props
    }

    /// No primary bucket, or the first one is empty
    pub fn is_empty(&self) -> bool {
        self.chunks.values().next().map_or(true, |b| b.is_empty())
    }

    /// Number of sorted chunks
    pub fn len(&self) -> usize {
        self.chunks.values().map(|b| b.len()).sum()
    }

    /// Forget all chunks and start over with the initial configuration
    pub fn clear(&mut self) {
        *self = SortedChunkList::new(&self.options);
    }

    pub fn chunk(&self, slot: usize) -> Option<&Chunk> {
        self.slots.get(slot).and_then(|c| c.as_ref())
    }

    pub fn chunk_mut(&mut self, slot: usize) -> Option<&mut Chunk> {
        self.slots.get_mut(slot).and_then(|c| c.as_mut())
    }

    /// Mutable references to the chunks in `order`, unknown or repeated slots are skipped
    pub fn chunks_mut(&mut self, order: &[usize]) -> Vec<&mut Chunk> {
        let mut all: Vec<Option<&mut Chunk>> = self.slots.iter_mut().map(|c| c.as_mut()).collect();
        order
            .iter()
            .filter_map(|&slot| all.get_mut(slot).and_then(|c| c.take()))
            .collect()
    }

    /// Visit every sorted chunk
    pub fn for_each(&self, mut op: impl FnMut(&Chunk)) {
        for bucket in self.chunks.values() {
            for &slot in bucket.values() {
                if let Some(chunk) = self.chunk(slot) {
                    op(chunk);
                }
            }
        }
    }

    /// Apply `op` to every sorted chunk
    pub fn transform(&mut self, mut op: impl FnMut(&mut Chunk)) {
        let slots: Vec<usize> = self.chunks.values().flat_map(|b| b.values().copied()).collect();
        for slot in slots {
            if let Some(chunk) = self.chunk_mut(slot) {
                op(chunk);
            }
        }
    }

    /// Take the records of properties removed before splitting chunks
    pub fn take_not_spliced(&mut self) -> Vec<NotSpliced> {
        std::mem::take(&mut self.not_spliced)
    }

    fn first_chunk(&self) -> Option<&Chunk> {
        let slot = *self.chunks.values().next()?.values().next()?;
        self.chunk(slot)
    }

    /// Insert a copy of `chunk`
    ///
    /// Returns false if the chunk is invalid, does not match the chunks
    /// already sorted, or would occupy a position that is already taken.
    pub fn insert(&mut self, chunk: &Chunk) -> bool {
        if !chunk.is_valid() {
            warn!(
                "Refusing to insert invalid chunk, missing properties are {}",
                chunk.missing().join(", ")
            );
            return false;
        }

        if self.is_empty() && !self.select_secondary_sort(chunk) {
            return false;
        }
        let Some(sort_prop) = self.secondary_sort.last().cloned() else {
            warn!("There is no secondary sort property left, cannot insert");
            return false;
        };

        let list_size = chunk.property(&sort_prop).map_or(0, |p| p.len());
        if list_size > 1 {
            self.insert_spliced(chunk, &sort_prop, list_size)
        } else {
            self.insert_single(chunk.clone()).is_some()
        }
    }

    fn select_secondary_sort(&mut self, chunk: &Chunk) -> bool {
        let backup = self.secondary_sort.clone();
        loop {
            let Some(top) = self.secondary_sort.last() else {
                self.secondary_sort = backup;
                return false;
            };
            if chunk.has_property(top.as_str()) {
                info!("Using {} for secondary sorting, determined by the first chunk", top);
                return true;
            }
            if self.secondary_sort.len() > 1 {
                self.secondary_sort.pop();
            } else {
                warn!(
                    "First chunk is missing the last secondary sort property fallback ({}), won't insert",
                    top
                );
                self.secondary_sort = backup;
                return false;
            }
        }
    }

    fn insert_spliced(&mut self, chunk: &Chunk, sort_prop: &str, list_size: usize) -> bool {
        info!(
            "Splicing chunk at top dimension as secondary sort property {} is a list of size {}",
            sort_prop, list_size
        );
        let mut spliceable = chunk.clone();
        let protected: Vec<String> = self.protected_props.iter().cloned().collect();
        let split = spliceable
            .properties_mut()
            .extract_if(|_, p| p.len() != list_size)
            .and_then(|mut extracted| {
                let kept = extracted.extract(&protected)?;
                Ok((extracted, kept))
            });
        let (extracted, kept) = match split {
            Ok(split) => split,
            Err(e) => {
                warn!("Failed to separate the properties of a chunk before splicing: {}", e);
                return false;
            }
        };
        spliceable.properties_mut().join(&kept, true);
        debug!("Removed {} properties before splicing", extracted.len());

        let pieces = match spliceable.auto_splice(0) {
            Ok(pieces) => pieces,
            Err(e) => {
                warn!("Failed to splice chunk for sorting: {}", e);
                return false;
            }
        };

        let equal_backup = self.equal_props.clone();
        let sort_backup = self.secondary_sort.clone();
        let mut inserted = Vec::with_capacity(pieces.len());
        let mut ok = true;
        for piece in pieces {
            match self.insert_single(piece) {
                Some(slot) => inserted.push(slot),
                None => ok = false,
            }
        }

        if ok {
            self.not_spliced.push(NotSpliced {
                props: extracted,
                slots: inserted,
            });
        } else {
            warn!("Failed to insert all pieces of a spliced chunk, rolling back {} pieces", inserted.len());
            self.remove_slots(&inserted);
            if self.is_empty() {
                self.equal_props = equal_backup;
                self.secondary_sort = sort_backup;
            }
        }
        ok
    }

    fn remove_slots(&mut self, slots: &[usize]) {
        let doomed: BTreeSet<usize> = slots.iter().copied().collect();
        for bucket in self.chunks.values_mut() {
            bucket.retain(|_, slot| !doomed.contains(slot));
        }
        self.chunks.retain(|_, bucket| !bucket.is_empty());
        for &slot in &doomed {
            if let Some(entry) = self.slots.get_mut(slot) {
                *entry = None;
            }
        }
    }

    fn insert_single(&mut self, chunk: Chunk) -> Option<usize> {
        if let Some(first) = self.first_chunk() {
            if first.size() != chunk.size() {
                debug!(
                    "Ignoring chunk with different size ({} != {})",
                    chunk.shape().size_string(),
                    first.shape().size_string()
                );
                return None;
            }
            for prop in &self.equal_props {
                let (mine, theirs) = (first.property(prop), chunk.property(prop));
                if (first.has_property(prop) || chunk.has_property(prop)) && mine != theirs {
                    debug!(
                        "Ignoring chunk with different {}, is {:?} but chunks already in the list have {:?}",
                        prop,
                        theirs.map(|p| p.to_string()),
                        mine.map(|p| p.to_string())
                    );
                    return None;
                }
            }
        } else {
            debug!("Inserting first chunk");
            if chunk.size()[2] > 1 && !self.equal_props.iter().any(|p| p == "indexOrigin") {
                info!("Dealing with volume chunks, considering indexOrigin as equal across the image");
                self.equal_props.push("indexOrigin".to_string());
            }
        }

        let sort_prop = self.secondary_sort.last()?.clone();
        let Some(sort_value) = chunk.property(&sort_prop).and_then(|p| p.front()).cloned() else {
            warn!(
                "Cannot insert chunk, it is lacking the property {} which is needed for secondary sorting",
                sort_prop
            );
            return None;
        };
        let position = position_of(&chunk)?;

        let bucket = self.chunks.entry(PositionKey(position)).or_default();
        let key = SortKey(sort_value);
        if let Some(&existing) = bucket.get(&key) {
            info!(
                "Not inserting chunk because there is already a chunk at the same position {:?} with the same {} ({})",
                position, sort_prop, key.0
            );
            if let Some(other) = self.slots.get(existing).and_then(|c| c.as_ref()) {
                let sources = (
                    chunk.value_as::<String>("source"),
                    other.value_as::<String>("source"),
                );
                if let (Some(a), Some(b)) = sources {
                    if a != b {
                        info!("The conflicting chunks were from {} and {}", a, b);
                    }
                }
            }
            return None;
        }
        let slot = self.slots.len();
        self.slots.push(Some(chunk));
        bucket.insert(key, slot);
        Some(slot)
    }

    /// Cardinalities of the primary buckets
    pub fn shape(&self) -> BTreeSet<usize> {
        self.chunks.values().map(|b| b.len()).collect()
    }

    /// Number of chunks in the first primary bucket
    pub fn horizontal_size(&self) -> usize {
        self.chunks.values().next().map_or(0, |b| b.len())
    }

    /// Truncate every primary bucket to the size of the smallest one
    ///
    /// Returns the number of dropped chunks. The `source` of every dropped
    /// chunk is appended to `rejected`.
    pub fn make_rectangular(&mut self, mut rejected: Option<&mut Vec<String>>) -> usize {
        let shape = self.shape();
        let Some(&resize) = shape.iter().next() else {
            return 0;
        };
        if shape.len() < 2 {
            return 0;
        }

        let mut dropped_slots = Vec::new();
        for bucket in self.chunks.values_mut() {
            if let Some(cut) = bucket.keys().nth(resize).cloned() {
                let tail = bucket.split_off(&cut);
                dropped_slots.extend(tail.into_values());
            }
        }
        for &slot in &dropped_slots {
            if let Some(entry) = self.slots.get_mut(slot) {
                if let (Some(chunk), Some(out)) = (entry.take(), rejected.as_deref_mut()) {
                    out.push(chunk.value_as::<String>("source").unwrap_or_default());
                }
            }
        }
        self.chunks.retain(|_, bucket| !bucket.is_empty());

        let dropped = dropped_slots.len();
        if dropped > 0 {
            warn!(
                "Dropped {} chunks to make {} rectangular",
                dropped,
                self.identify(true, false, &PropertyMap::new())
            );
        }
        dropped
    }

    /// Slots of all chunks, primary position running fastest
    ///
    /// Empty if the list is not rectangular.
    pub fn lookup(&self) -> Vec<usize> {
        if self.shape().len() != 1 {
            if !self.chunks.is_empty() {
                error!("Building a lookup on a non rectangular chunk list is not defined");
            }
            return Vec::new();
        }
        let horizontal = self.chunks.len();
        let vertical = self.horizontal_size();
        let mut ret = vec![0; horizontal * vertical];
        for (h, bucket) in self.chunks.values().enumerate() {
            for (v, &slot) in bucket.values().enumerate() {
                ret[h + v * horizontal] = slot;
            }
        }
        ret
    }

    fn collect_unique(&self, extra: &PropertyMap, name: &str) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        let mut add = |map: &PropertyMap| {
            if let Some(p) = map.property(name) {
                out.extend(p.iter().map(|v| v.to_string()));
            }
        };
        add(extra);
        self.for_each(|c| add(c.properties()));
        out
    }

    /// Human readable description built from sequence properties
    ///
    /// Properties are searched in `extra` and in every chunk, and only used
    /// when they have a single distinct value.
    pub fn identify(&self, with_path: bool, with_date: bool, extra: &PropertyMap) -> String {
        let single = |name: &str| {
            let values = self.collect_unique(extra, name);
            if values.len() == 1 {
                values.into_iter().next()
            } else {
                None
            }
        };
        let mut parts: Vec<String> = Vec::new();
        let mut series = String::new();
        if let Some(number) = single("sequenceNumber") {
            series = format!("S{}", number);
        }
        if let Some(description) = single("sequenceDescription") {
            if !series.is_empty() {
                series.push('_');
            }
            series.push_str(&description);
        }
        if !series.is_empty() {
            parts.push(series);
        }
        if with_path {
            let sources: Vec<String> = self.collect_unique(extra, "source").into_iter().collect();
            parts.push(format!("from {}", common_root_path(&sources)));
        }
        if with_date {
            if let Some(start) = single("sequenceStart") {
                parts.push(format!("taken at {}", start));
            }
        }
        parts.join(" ")
    }
}

/// Projection of `indexOrigin` onto the chunk's own axes, quantized to `f32`
fn position_of(chunk: &Chunk) -> Option<Vector3> {
    let origin = chunk.value_as::<Vector3>("indexOrigin")?;
    let row = chunk.value_as::<Vector3>("rowVec")?;
    let column = chunk.value_as::<Vector3>("columnVec")?;
    let slice = chunk
        .value_as::<Vector3>("sliceVec")
        .unwrap_or_else(|| geometry::cross(row, column));
    let position = [
        geometry::dot(origin, row),
        geometry::dot(origin, column),
        geometry::dot(origin, slice),
    ];
    Some(position.map(|c| c as f32 as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice(z: f64, acquisition: u32) -> Chunk {
        Chunk::new(vec![0u8; 16], [4, 4, 1, 1])
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

    fn list() -> SortedChunkList {
        SortedChunkList::new(&ImageOptions::default())
    }

    #[test]
    fn test_secondary_sort_falls_back() {
        let mut list = list();
        assert!(list.is_empty());
        assert!(list.insert(&slice(0.0, 0)));
        // acquisitionTime is tried first but missing
        assert_eq!(list.secondary_sort(), Some("acquisitionNumber"));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_rejects_invalid_and_duplicates() {
        let mut list = list();
        let invalid = Chunk::new(vec![0u8; 16], [4, 4, 1, 1]).unwrap();
        assert!(!list.insert(&invalid));

        assert!(list.insert(&slice(1.0, 0)));
        assert!(!list.insert(&slice(1.0, 0)));
        assert!(list.insert(&slice(1.0, 1)));

        let mut bigger = Chunk::new(vec![0u8; 32], [8, 4, 1, 1])
            .unwrap()
            .with_property("indexOrigin", [0.0, 0.0, 2.0])
            .unwrap();
        for key in ["acquisitionNumber", "voxelSize", "rowVec", "columnVec"] {
            let value = slice(0.0, 0).property(key).cloned().unwrap();
            bigger.set_property(key, value).unwrap();
        }
        assert!(!list.insert(&bigger));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_position_is_quantized() {
        let mut list = list();
        assert!(list.insert(&slice(0.0, 0)));
        assert!(list.insert(&slice(0.3, 1)));
        // 0.1 + 0.2 is not 0.3 in double precision
        assert!(!list.insert(&slice(0.1 + 0.2, 1)));
        assert_eq!(list.len(), 2);
        assert_eq!(list.shape(), BTreeSet::from([1]));
    }

    #[test]
    fn test_equal_props_enforced() {
        let mut list = list();
        assert!(list.insert(&slice(0.0, 0)));
        let mut other = slice(1.0, 0);
        other.set_property("voxelSize", [2.0, 2.0, 2.0]).unwrap();
        assert!(!list.insert(&other));
    }

    #[test]
    fn test_lookup_primary_fastest() {
        let mut list = list();
        for t in 0..2u32 {
            for z in 0..3 {
                assert!(list.insert(&slice(z as f64, t * 3 + z)));
            }
        }
        assert_eq!(list.shape().len(), 1);
        assert_eq!(list.horizontal_size(), 2);
        let numbers: Vec<u32> = list
            .lookup()
            .iter()
            .filter_map(|&s| list.chunk(s).and_then(|c| c.value_as::<u32>("acquisitionNumber")))
            .collect();
        assert_eq!(numbers, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_make_rectangular() {
        let mut list = list();
        for (z, acquisition) in [(0.0, 0), (0.0, 1), (1.0, 2), (1.0, 3), (2.0, 4)] {
            let chunk = slice(z, acquisition)
                .with_property("source", format!("/data/{}.dcm", acquisition))
                .unwrap();
            assert!(list.insert(&chunk));
        }
        assert!(list.lookup().is_empty());

        let mut rejected = Vec::new();
        assert_eq!(list.make_rectangular(Some(&mut rejected)), 2);
        assert_eq!(rejected, vec!["/data/1.dcm", "/data/3.dcm"]);
        assert_eq!(list.shape(), BTreeSet::from([1]));
        assert_eq!(list.lookup().len(), 3);
    }

    #[test]
    fn test_list_valued_sort_key_is_spliced() {
        let mut volume = Chunk::new(vec![0u8; 4 * 4 * 3], [4, 4, 3, 1])
            .unwrap()
            .with_property("indexOrigin", [0.0, 0.0, 0.0])
            .unwrap()
            .with_property("voxelSize", [1.0, 1.0, 1.0])
            .unwrap()
            .with_property("rowVec", [1.0, 0.0, 0.0])
            .unwrap()
            .with_property("columnVec", [0.0, 1.0, 0.0])
            .unwrap()
            .with_property("seriesDescription", "fmri")
            .unwrap();
        volume
            .set_property(
                "acquisitionNumber",
                crate::metadata::PropertyValue::from_values(vec![
                    Value::U32(0),
                    Value::U32(1),
                    Value::U32(2),
                ]),
            )
            .unwrap();

        let mut list = list();
        assert!(list.insert(&volume));
        assert_eq!(list.len(), 3);
        assert_eq!(list.horizontal_size(), 1);

        let records = list.take_not_spliced();
        assert_eq!(records.len(), 1);
        assert!(records[0].props.has_property("seriesDescription"));
        assert_eq!(records[0].slots.len(), 3);
        for slot in &records[0].slots {
            let piece = list.chunk(*slot).unwrap();
            assert!(!piece.has_property("seriesDescription"));
            assert!(piece.is_valid());
        }
    }

    #[test]
    fn test_failed_splice_is_rolled_back() {
        let mut list = list();
        assert!(list.insert(&slice(1.0, 1)));

        let mut volume = Chunk::new(vec![0u8; 4 * 4 * 3], [4, 4, 3, 1])
            .unwrap()
            .with_property("indexOrigin", [0.0, 0.0, 0.0])
            .unwrap()
            .with_property("voxelSize", [1.0, 1.0, 1.0])
            .unwrap()
            .with_property("rowVec", [1.0, 0.0, 0.0])
            .unwrap()
            .with_property("columnVec", [0.0, 1.0, 0.0])
            .unwrap()
            .with_property("seriesDescription", "fmri")
            .unwrap();
        volume
            .set_property(
                "acquisitionNumber",
                crate::metadata::PropertyValue::from_values(vec![
                    Value::U32(0),
                    Value::U32(1),
                    Value::U32(2),
                ]),
            )
            .unwrap();

        // the second piece lands on the slice already inserted
        assert!(!list.insert(&volume));
        assert_eq!(list.len(), 1);
        assert!(list.take_not_spliced().is_empty());
        let numbers: Vec<u32> = list
            .lookup()
            .iter()
            .filter_map(|&s| list.chunk(s).and_then(|c| c.value_as::<u32>("acquisitionNumber")))
            .collect();
        assert_eq!(numbers, vec![1]);
    }

    #[test]
    fn test_identify() {
        let mut list = list();
        for z in 0..2 {
            let chunk = slice(z as f64, z)
                .with_property("sequenceNumber", 5u16)
                .unwrap()
                .with_property("sequenceDescription", "t1")
                .unwrap()
                .with_property("source", format!("/data/s5/{}.dcm", z))
                .unwrap();
            assert!(list.insert(&chunk));
        }
        assert_eq!(list.identify(true, false, &PropertyMap::new()), "S5_t1 from /data/s5");
        assert_eq!(list.identify(false, true, &PropertyMap::new()), "S5_t1");
    }
}
