//! Logical property paths and physical JSON paths
//!
//! A [`PropertyPath`] is the dotted logical path through the metamodel
//! (`Session.School.SchoolId`); a [`JsonPath`] is the physical location in an
//! API document (`$.sessionReference.schoolId`, with `[*]` per traversed
//! array). [`EntityJsonPaths`] maps every logical path an entity exposes to
//! the physical paths it lands on.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Dotted logical path of full property names, relative to an entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyPath(String);

impl PropertyPath {
    pub fn new(segment: impl Into<String>) -> Self {
        PropertyPath(segment.into())
    }

    /// Extends the path with a child segment
    pub fn extend(&self, segment: &str) -> PropertyPath {
        PropertyPath(format!("{}.{segment}", self.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Physical JSONPath location in an API document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonPath(String);

impl JsonPath {
    /// A top-level document field: `$.<name>`
    pub fn root(name: &str) -> Self {
        JsonPath(format!("$.{name}"))
    }

    /// A nested field: `<self>.<name>`
    pub fn field(&self, name: &str) -> JsonPath {
        JsonPath(format!("{}.{name}", self.0))
    }

    /// A field of each item of an array: `<self>[*].<name>`
    pub fn array_item(&self, name: &str) -> JsonPath {
        JsonPath(format!("{}[*].{name}", self.0))
    }

    /// The array wildcard itself: `<self>[*]`
    pub fn wildcard(&self) -> JsonPath {
        JsonPath(format!("{}[*]", self.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Insertion-ordered map from logical path to the sorted physical paths it
/// resolves to. Values are deduplicated on insert and sorted on finalize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityJsonPaths {
    entries: IndexMap<PropertyPath, Vec<JsonPath>>,
}

impl EntityJsonPaths {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a physical path under each of the given logical paths,
    /// skipping duplicates
    pub fn add(&mut self, property_paths: &[PropertyPath], json_path: &JsonPath) {
        for property_path in property_paths {
            let paths = self.entries.entry(property_path.clone()).or_default();
            if !paths.contains(json_path) {
                paths.push(json_path.clone());
            }
        }
    }

    /// Every physical path recorded under the given logical path
    pub fn get(&self, property_path: &str) -> Option<&[JsonPath]> {
        self.entries
            .get(&PropertyPath::new(property_path))
            .map(Vec::as_slice)
    }

    /// Merges another mapping into this one, preserving dedup
    pub fn merge(&mut self, other: EntityJsonPaths) {
        for (property_path, json_paths) in other.entries {
            for json_path in json_paths {
                self.add(std::slice::from_ref(&property_path), &json_path);
            }
        }
    }

    /// All physical paths in the mapping, flattened
    pub fn json_paths(&self) -> impl Iterator<Item = &JsonPath> {
        self.entries.values().flatten()
    }

    /// Sorts every value list, as the final artifact shape requires
    pub fn sort_values(&mut self) {
        for json_paths in self.entries.values_mut() {
            json_paths.sort();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PropertyPath, &Vec<JsonPath>)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
