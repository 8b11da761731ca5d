//! Hierarchical property maps holding chunk and image metadata
//!
//! A [`PropertyMap`] is a tree of named entries. Each entry is either a
//! [`PropertyValue`] (an ordered list of [`Value`]s) or a nested branch.
//! Keys are addressed with a [`PropPath`], written as `a/b/c`.

use crate::error::{ImageError, Result};
use crate::value::{FromValue, Value};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Path of a property inside a [`PropertyMap`]
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PropPath(Vec<String>);

impl PropPath {
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The final segment
    pub fn name(&self) -> Option<&str> {
        self.0.last().map(|s| s.as_str())
    }

    /// Append a segment
    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }
}

impl From<&str> for PropPath {
    fn from(path: &str) -> Self {
        Self(
            path.split('/')
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect(),
        )
    }
}

impl From<String> for PropPath {
    fn from(path: String) -> Self {
        PropPath::from(path.as_str())
    }
}

impl From<&String> for PropPath {
    fn from(path: &String) -> Self {
        PropPath::from(path.as_str())
    }
}

impl From<&PropPath> for PropPath {
    fn from(path: &PropPath) -> Self {
        path.clone()
    }
}

impl fmt::Display for PropPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// Ordered list of values stored under one key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyValue {
    values: Vec<Value>,
}

impl PropertyValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// More than one value
    pub fn is_list(&self) -> bool {
        self.values.len() > 1
    }

    pub fn front(&self) -> Option<&Value> {
        self.values.first()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    pub fn push(&mut self, value: impl Into<Value>) {
        self.values.push(value.into());
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Front value converted to `T`
    pub fn as_type<T: FromValue>(&self) -> Option<T> {
        self.front().and_then(T::from_value)
    }

    /// Split into `blocks` equal pieces, `None` if the length is not divisible
    pub fn split(&self, blocks: usize) -> Option<Vec<PropertyValue>> {
        if blocks == 0 || self.values.len() % blocks != 0 {
            return None;
        }
        let piece = self.values.len() / blocks;
        Some(
            self.values
                .chunks(piece.max(1))
                .map(|c| PropertyValue::from_values(c.to_vec()))
                .collect(),
        )
    }
}

impl From<Value> for PropertyValue {
    fn from(value: Value) -> Self {
        Self {
            values: vec![value],
        }
    }
}

macro_rules! impl_from_for_property_value {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for PropertyValue {
                fn from(v: $t) -> Self {
                    PropertyValue::from(Value::from(v))
                }
            }
        )*
    };
}

impl_from_for_property_value!(
    bool,
    u8,
    u16,
    u32,
    u64,
    i8,
    i16,
    i32,
    i64,
    f32,
    f64,
    String,
    &str,
    [f64; 3],
    [f64; 4],
    chrono::NaiveDateTime,
    crate::types::Color<u8>,
    crate::types::Color<u16>,
);

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.values.as_slice() {
            [single] => write!(f, "{}", single),
            values => {
                write!(f, "[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// An entry of a [`PropertyMap`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Entry {
    Property(PropertyValue),
    Branch(PropertyMap),
}

/// Tree of named properties
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyMap {
    entries: BTreeMap<String, Entry>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// No entries at all
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Top level entries
    pub fn entries(&self) -> impl Iterator<Item = (&String, &Entry)> {
        self.entries.iter()
    }

    fn entry(&self, path: &PropPath) -> Option<&Entry> {
        let (last, parents) = path.segments().split_last()?;
        let mut map = self;
        for segment in parents {
            match map.entries.get(segment)? {
                Entry::Branch(b) => map = b,
                Entry::Property(_) => return None,
            }
        }
        map.entries.get(last)
    }

    fn entry_mut(&mut self, path: &PropPath) -> Option<&mut Entry> {
        let (last, parents) = path.segments().split_last()?;
        let mut map = self;
        for segment in parents {
            match map.entries.get_mut(segment)? {
                Entry::Branch(b) => map = b,
                Entry::Property(_) => return None,
            }
        }
        map.entries.get_mut(last)
    }

    /// Property stored at `path`
    pub fn property(&self, path: impl Into<PropPath>) -> Option<&PropertyValue> {
        match self.entry(&path.into())? {
            Entry::Property(p) => Some(p),
            Entry::Branch(_) => None,
        }
    }

    pub fn property_mut(&mut self, path: impl Into<PropPath>) -> Option<&mut PropertyValue> {
        match self.entry_mut(&path.into())? {
            Entry::Property(p) => Some(p),
            Entry::Branch(_) => None,
        }
    }

    /// Branch stored at `path`
    pub fn branch(&self, path: impl Into<PropPath>) -> Option<&PropertyMap> {
        match self.entry(&path.into())? {
            Entry::Branch(b) => Some(b),
            Entry::Property(_) => None,
        }
    }

    /// True if a non-empty property exists at `path`
    pub fn has_property(&self, path: impl Into<PropPath>) -> bool {
        self.property(path).is_some_and(|p| !p.is_empty())
    }

    pub fn has_branch(&self, path: impl Into<PropPath>) -> bool {
        self.branch(path).is_some()
    }

    /// Front value of the property at `path` converted to `T`
    pub fn value_as<T: FromValue>(&self, path: impl Into<PropPath>) -> Option<T> {
        self.property(path).and_then(|p| p.as_type())
    }

    /// Get or create the property at `path`, creating intermediate branches
    pub fn touch_property(&mut self, path: impl Into<PropPath>) -> Result<&mut PropertyValue> {
        let path = path.into();
        let Some((last, parents)) = path.segments().split_last() else {
            return Err(ImageError::InvalidProperty("empty property path".to_string()));
        };
        let mut map = self;
        for segment in parents {
            let entry = map
                .entries
                .entry(segment.clone())
                .or_insert_with(|| Entry::Branch(PropertyMap::new()));
            match entry {
                Entry::Branch(b) => map = b,
                Entry::Property(_) => {
                    return Err(ImageError::InvalidProperty(format!(
                        "{} is a property, not a branch",
                        segment
                    )))
                }
            }
        }
        let entry = map
            .entries
            .entry(last.clone())
            .or_insert_with(|| Entry::Property(PropertyValue::new()));
        match entry {
            Entry::Property(p) => Ok(p),
            Entry::Branch(_) => Err(ImageError::InvalidProperty(format!(
                "{} is a branch, not a property",
                path
            ))),
        }
    }

    /// Replace the property at `path`
    pub fn set_property(
        &mut self,
        path: impl Into<PropPath>,
        value: impl Into<PropertyValue>,
    ) -> Result<()> {
        *self.touch_property(path)? = value.into();
        Ok(())
    }

    /// Set a single value
    pub fn set_value(&mut self, path: impl Into<PropPath>, value: impl Into<Value>) -> Result<()> {
        self.set_property(path, PropertyValue::from(value.into()))
    }

    /// Remove the entry at `path`, pruning branches left empty
    pub fn remove(&mut self, path: impl Into<PropPath>) -> Option<Entry> {
        let path = path.into();
        self.remove_segments(path.segments())
    }

    fn remove_segments(&mut self, segments: &[String]) -> Option<Entry> {
        match segments {
            [] => None,
            [last] => self.entries.remove(last),
            [first, rest @ ..] => {
                let Entry::Branch(branch) = self.entries.get_mut(first)? else {
                    return None;
                };
                let removed = branch.remove_segments(rest);
                if branch.is_empty() {
                    self.entries.remove(first);
                }
                removed
            }
        }
    }

    /// Remove every property whose key exists in `other`
    pub fn remove_map(&mut self, other: &PropertyMap) {
        for key in other.keys() {
            self.remove(&key);
        }
    }

    /// Rename the entry at `from`, fails if `to` is taken
    pub fn rename(&mut self, from: impl Into<PropPath>, to: impl Into<PropPath>) -> bool {
        let (from, to) = (from.into(), to.into());
        if self.entry(&to).is_some() {
            warn!("Cannot rename {} to {}, target exists", from, to);
            return false;
        }
        match self.remove(&from) {
            Some(Entry::Property(p)) => self.set_property(&to, p).is_ok(),
            Some(Entry::Branch(b)) => {
                let Some((last, parents)) = to.segments().split_last() else {
                    return false;
                };
                let mut map = self;
                for segment in parents {
                    let entry = map
                        .entries
                        .entry(segment.clone())
                        .or_insert_with(|| Entry::Branch(PropertyMap::new()));
                    match entry {
                        Entry::Branch(next) => map = next,
                        Entry::Property(_) => return false,
                    }
                }
                map.entries.insert(last.clone(), Entry::Branch(b));
                true
            }
            None => false,
        }
    }

    /// Replace the property at `path` by `op(old)`, removing it if `op` returns `None`
    pub fn transform<F>(&mut self, path: impl Into<PropPath>, op: F) -> bool
    where
        F: FnOnce(&PropertyValue) -> Option<PropertyValue>,
    {
        let path = path.into();
        let Some(old) = self.property(&path) else {
            return false;
        };
        match op(old) {
            Some(new) => self.set_property(&path, new).is_ok(),
            None => {
                self.remove(&path);
                true
            }
        }
    }

    fn collect_flat<'a>(&'a self, prefix: &PropPath, out: &mut BTreeMap<PropPath, &'a PropertyValue>) {
        for (name, entry) in &self.entries {
            let path = prefix.join(name.clone());
            match entry {
                Entry::Property(p) => {
                    out.insert(path, p);
                }
                Entry::Branch(b) => b.collect_flat(&path, out),
            }
        }
    }

    /// All properties keyed by their full path
    pub fn flat_map(&self) -> BTreeMap<PropPath, &PropertyValue> {
        let mut out = BTreeMap::new();
        self.collect_flat(&PropPath::default(), &mut out);
        out
    }

    /// Paths of all properties
    pub fn keys(&self) -> Vec<PropPath> {
        self.flat_map().into_keys().collect()
    }

    /// Number of properties in the whole tree
    pub fn len(&self) -> usize {
        self.flat_map().len()
    }

    /// Properties that differ between `self` and `other`
    pub fn diff(
        &self,
        other: &PropertyMap,
    ) -> BTreeMap<PropPath, (Option<PropertyValue>, Option<PropertyValue>)> {
        let mine = self.flat_map();
        let theirs = other.flat_map();
        let mut out = BTreeMap::new();
        for (key, value) in &mine {
            if theirs.get(key) != Some(value) {
                out.insert(
                    key.clone(),
                    (Some((*value).clone()), theirs.get(key).map(|v| (*v).clone())),
                );
            }
        }
        for (key, value) in &theirs {
            if !mine.contains_key(key) {
                out.insert(key.clone(), (None, Some((*value).clone())));
            }
        }
        out
    }

    /// Drop every property that is not present with the same value in `other`
    pub fn remove_uncommon(&mut self, other: &PropertyMap) {
        let uncommon: Vec<PropPath> = self
            .flat_map()
            .into_iter()
            .filter(|(key, value)| other.property(key) != Some(*value))
            .map(|(key, _)| key)
            .collect();
        for key in uncommon {
            self.remove(&key);
        }
    }

    /// Insert entries of `other` that are missing here
    ///
    /// With `overwrite` differing properties are replaced. Returns the paths of
    /// properties that could not be joined.
    pub fn join(&mut self, other: &PropertyMap, overwrite: bool) -> Vec<PropPath> {
        let mut rejected = Vec::new();
        self.join_at(other, overwrite, &PropPath::default(), &mut rejected);
        rejected
    }

    fn join_at(
        &mut self,
        other: &PropertyMap,
        overwrite: bool,
        prefix: &PropPath,
        rejected: &mut Vec<PropPath>,
    ) {
        for (name, theirs) in &other.entries {
            let path = prefix.join(name.clone());
            match (self.entries.get_mut(name), theirs) {
                (None, _) => {
                    self.entries.insert(name.clone(), theirs.clone());
                }
                (Some(Entry::Branch(mine)), Entry::Branch(b)) => {
                    mine.join_at(b, overwrite, &path, rejected)
                }
                (Some(Entry::Property(mine)), Entry::Property(p)) => {
                    if mine.is_empty() || overwrite {
                        *mine = p.clone();
                    } else if mine != p {
                        rejected.push(path);
                    }
                }
                (Some(slot), _) => {
                    if overwrite {
                        *slot = theirs.clone();
                    } else {
                        rejected.push(path);
                    }
                }
            }
        }
    }

    /// Move entries of `other` into `self`
    ///
    /// Entries that could not be moved stay in `other` and are returned.
    pub fn transfer(&mut self, other: &mut PropertyMap, overwrite: bool) -> Vec<PropPath> {
        let mut rejected = Vec::new();
        self.transfer_at(other, overwrite, &PropPath::default(), &mut rejected);
        rejected
    }

    fn transfer_at(
        &mut self,
        other: &mut PropertyMap,
        overwrite: bool,
        prefix: &PropPath,
        rejected: &mut Vec<PropPath>,
    ) {
        let taken = std::mem::take(&mut other.entries);
        for (name, theirs) in taken {
            let path = prefix.join(name.clone());
            match (self.entries.get_mut(&name), theirs) {
                (None, theirs) => {
                    self.entries.insert(name, theirs);
                }
                (Some(Entry::Branch(mine)), Entry::Branch(mut b)) => {
                    mine.transfer_at(&mut b, overwrite, &path, rejected);
                    if !b.is_empty() {
                        other.entries.insert(name, Entry::Branch(b));
                    }
                }
                (Some(Entry::Property(mine)), Entry::Property(p)) => {
                    if mine.is_empty() || overwrite || *mine == p {
                        *mine = p;
                    } else {
                        rejected.push(path);
                        other.entries.insert(name, Entry::Property(p));
                    }
                }
                (Some(slot), theirs) => {
                    if overwrite {
                        *slot = theirs;
                    } else {
                        rejected.push(path);
                        other.entries.insert(name, theirs);
                    }
                }
            }
        }
    }

    /// Hoist properties common to all `maps` into `self`
    ///
    /// Properties equal in every map are removed from the maps and stored
    /// here. A property already present here with a different value stays in
    /// the maps.
    pub fn deduplicate(&mut self, maps: &mut [&mut PropertyMap]) {
        let Some((first, rest)) = maps.split_first() else {
            return;
        };
        let mut common = (**first).clone();
        for map in rest {
            common.remove_uncommon(map);
        }
        let conflicting: Vec<PropPath> = common
            .flat_map()
            .into_iter()
            .filter(|(key, value)| self.property(key).is_some_and(|mine| mine != *value))
            .map(|(key, _)| key)
            .collect();
        for key in conflicting {
            common.remove(&key);
        }
        for map in maps.iter_mut() {
            map.remove_map(&common);
        }
        self.join(&common, false);
    }

    /// Remove the listed properties and return them as a new map
    pub fn extract<P: Into<PropPath> + Clone>(&mut self, keys: &[P]) -> Result<PropertyMap> {
        let mut out = PropertyMap::new();
        for key in keys {
            let path: PropPath = key.clone().into();
            if let Some(Entry::Property(p)) = self.entry(&path).cloned() {
                self.remove(&path);
                out.set_property(&path, p)?;
            }
        }
        Ok(out)
    }

    /// Remove every property matching `pred` and return them as a new map
    pub fn extract_if<F>(&mut self, mut pred: F) -> Result<PropertyMap>
    where
        F: FnMut(&PropPath, &PropertyValue) -> bool,
    {
        let selected: Vec<(PropPath, PropertyValue)> = self
            .flat_map()
            .into_iter()
            .filter(|(k, v)| pred(k, v))
            .map(|(k, v)| (k, v.clone()))
            .collect();
        let mut out = PropertyMap::new();
        for (key, value) in selected {
            self.remove(&key);
            out.set_property(&key, value)?;
        }
        Ok(out)
    }

    /// Distribute properties across `targets`
    ///
    /// A property whose length is a multiple of `targets.len()` is split into
    /// equal consecutive pieces, one per target. Any other property is copied
    /// to every target. With `lists_only` single values are left untouched.
    /// Distributed properties are removed from `self`.
    pub fn splice(&mut self, targets: &mut [&mut PropertyMap], lists_only: bool) {
        let blocks = targets.len();
        if blocks == 0 {
            return;
        }
        let selected: Vec<(PropPath, PropertyValue)> = self
            .flat_map()
            .into_iter()
            .filter(|(_, v)| !v.is_empty() && (!lists_only || v.is_list()))
            .map(|(k, v)| (k, v.clone()))
            .collect();

        for (key, value) in selected {
            match value.split(blocks) {
                Some(pieces) => {
                    for (target, piece) in targets.iter_mut().zip(pieces) {
                        if let Err(e) = target.set_property(&key, piece) {
                            warn!("Failed to splice {}: {}", key, e);
                        }
                    }
                }
                None => {
                    if value.is_list() {
                        warn!(
                            "Cannot splice list {} of length {} into {} blocks, copying it",
                            key,
                            value.len(),
                            blocks
                        );
                    }
                    for target in targets.iter_mut() {
                        if let Err(e) = target.set_property(&key, value.clone()) {
                            warn!("Failed to splice {}: {}", key, e);
                        }
                    }
                }
            }
            self.remove(&key);
        }
    }

    /// Entries of `needed` that are missing or empty
    pub fn missing(&self, needed: &[&str]) -> Vec<String> {
        needed
            .iter()
            .filter(|key| !self.has_property(**key))
            .map(|key| key.to_string())
            .collect()
    }

    pub fn is_valid(&self, needed: &[&str]) -> bool {
        self.missing(needed).is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl fmt::Display for PropertyMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in self.flat_map() {
            writeln!(f, "{}: {}", key, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PropertyMap {
        let mut map = PropertyMap::new();
        map.set_value("voxelSize", [1.0, 1.0, 2.0]).unwrap();
        map.set_value("acquisitionNumber", 4u32).unwrap();
        map.set_value("DICOM/EchoTime", 12.5).unwrap();
        map
    }

    #[test]
    fn test_paths_and_branches() {
        let map = sample();
        assert!(map.has_property("DICOM/EchoTime"));
        assert!(map.has_branch("DICOM"));
        assert!(!map.has_property("DICOM"));
        assert_eq!(map.value_as::<f64>("DICOM/EchoTime"), Some(12.5));
        assert_eq!(PropPath::from("a//b").to_string(), "a/b");
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_touch_conflict() {
        let mut map = sample();
        assert!(map.set_value("acquisitionNumber/sub", 1u32).is_err());
        assert!(map.set_value("DICOM", 1u32).is_err());
    }

    #[test]
    fn test_remove_prunes_branches() {
        let mut map = sample();
        assert!(map.remove("DICOM/EchoTime").is_some());
        assert!(!map.has_branch("DICOM"));
        assert!(map.remove("missing").is_none());
    }

    #[test]
    fn test_join_rejects_conflicts() {
        let mut map = sample();
        let mut other = PropertyMap::new();
        other.set_value("acquisitionNumber", 5u32).unwrap();
        other.set_value("DICOM/RepetitionTime", 2000.0).unwrap();

        let rejected = map.join(&other, false);
        assert_eq!(rejected, vec![PropPath::from("acquisitionNumber")]);
        assert_eq!(map.value_as::<u32>("acquisitionNumber"), Some(4));
        assert!(map.has_property("DICOM/RepetitionTime"));

        assert!(map.join(&other, true).is_empty());
        assert_eq!(map.value_as::<u32>("acquisitionNumber"), Some(5));
    }

    #[test]
    fn test_transfer_moves_entries() {
        let mut map = sample();
        let mut other = PropertyMap::new();
        other.set_value("acquisitionNumber", 5u32).unwrap();
        other.set_value("DICOM/RepetitionTime", 2000.0).unwrap();

        let rejected = map.transfer(&mut other, false);
        assert_eq!(rejected.len(), 1);
        assert!(map.has_property("DICOM/RepetitionTime"));
        assert!(other.has_property("acquisitionNumber"));
        assert!(!other.has_branch("DICOM"));
    }

    #[test]
    fn test_deduplicate() {
        let mut a = sample();
        let mut b = sample();
        b.set_value("acquisitionNumber", 5u32).unwrap();
        let mut common = PropertyMap::new();

        common.deduplicate(&mut [&mut a, &mut b]);
        assert!(common.has_property("voxelSize"));
        assert!(common.has_property("DICOM/EchoTime"));
        assert!(!common.has_property("acquisitionNumber"));
        assert_eq!(a.keys(), vec![PropPath::from("acquisitionNumber")]);
        assert_eq!(b.value_as::<u32>("acquisitionNumber"), Some(5));
    }

    #[test]
    fn test_splice() {
        let mut source = PropertyMap::new();
        source
            .set_property(
                "acquisitionNumber",
                PropertyValue::from_values((0..4u32).map(Value::from).collect()),
            )
            .unwrap();
        source.set_value("voxelSize", [1.0, 1.0, 1.0]).unwrap();
        source
            .set_property(
                "odd",
                PropertyValue::from_values((0..3u32).map(Value::from).collect()),
            )
            .unwrap();

        let mut a = PropertyMap::new();
        let mut b = PropertyMap::new();
        source.splice(&mut [&mut a, &mut b], true);

        assert_eq!(a.property("acquisitionNumber").map(|p| p.len()), Some(2));
        assert_eq!(b.property("acquisitionNumber").and_then(|p| p.front()), Some(&Value::U32(2)));
        // not divisible, copied
        assert_eq!(a.property("odd").map(|p| p.len()), Some(3));
        // single values are left alone with lists_only
        assert!(source.has_property("voxelSize"));
        assert!(!a.has_property("voxelSize"));
        assert!(!source.has_property("acquisitionNumber"));
    }

    #[test]
    fn test_extract_and_missing() {
        let mut map = sample();
        let extracted = map.extract(&["voxelSize", "nothing"]).unwrap();
        assert!(extracted.has_property("voxelSize"));
        assert!(!map.has_property("voxelSize"));
        assert_eq!(map.missing(&["voxelSize", "acquisitionNumber"]), vec!["voxelSize"]);

        let dicom = map.extract_if(|k, _| k.segments()[0] == "DICOM").unwrap();
        assert_eq!(dicom.len(), 1);
        assert!(!map.has_branch("DICOM"));
    }

    #[test]
    fn test_rename_and_transform() {
        let mut map = sample();
        assert!(map.rename("DICOM/EchoTime", "echoTime"));
        assert!(map.has_property("echoTime"));
        assert!(map.transform("echoTime", |p| p
            .as_type::<f64>()
            .map(|v| PropertyValue::from(v * 2.0))));
        assert_eq!(map.value_as::<f64>("echoTime"), Some(25.0));
    }

    #[test]
    fn test_diff_and_json() {
        let a = sample();
        let mut b = sample();
        b.set_value("acquisitionNumber", 5u32).unwrap();
        let diff = a.diff(&b);
        assert_eq!(diff.len(), 1);

        let json = a.to_json().unwrap();
        let back = PropertyMap::from_json(&json).unwrap();
        assert_eq!(back, a);
    }
}
