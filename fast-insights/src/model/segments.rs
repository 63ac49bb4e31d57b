//! Binary segment columns and their provenance.
//!
//! A segment is a 0/1 indicator column. Its [`Provenance`] records the base
//! column it was derived from, or the constituent segments of a combination.
//! Combination provenance is canonical: constituents are sorted before they
//! are stored, so the same set of constituents always yields the same key.

use std::fmt;

use arrow::array::BooleanArray;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered mapping from segment name to provenance.
pub type ProvenanceMap = IndexMap<String, Provenance>;

/// Link from a segment back to what it was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Provenance {
    /// Derived from a single raw column.
    BaseColumn(String),
    /// Derived from a conjunction; holds sorted constituent segment names.
    Combination(Vec<String>),
}

impl Provenance {
    /// Provenance pointing at a raw column.
    pub fn base(column: impl Into<String>) -> Self {
        Self::BaseColumn(column.into())
    }

    /// Combination provenance; constituents are sorted lexicographically.
    pub fn combination<I, S>(constituents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = constituents.into_iter().map(Into::into).collect();
        names.sort();
        Self::Combination(names)
    }

    /// Reconstructs provenance from its serialized key.
    ///
    /// Keys that parse as a JSON array of strings are combinations; anything
    /// else names a base column.
    pub fn from_key(key: &str) -> Self {
        if key.starts_with('[') {
            if let Ok(names) = serde_json::from_str::<Vec<String>>(key) {
                return Self::combination(names);
            }
        }
        Self::BaseColumn(key.to_string())
    }

    /// Serialized form: the column name, or the canonical combination key.
    pub fn key(&self) -> String {
        match self {
            Self::BaseColumn(name) => name.clone(),
            Self::Combination(names) => combination_key(names),
        }
    }

    /// The base column, if this provenance refers to one.
    pub fn base_column(&self) -> Option<&str> {
        match self {
            Self::BaseColumn(name) => Some(name),
            Self::Combination(_) => None,
        }
    }

    /// Whether this is combination provenance.
    pub fn is_combination(&self) -> bool {
        matches!(self, Self::Combination(_))
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Canonical array-literal key for a set of constituent names.
///
/// Names are sorted, JSON-quoted and joined with `", "`:
///
/// ```rust
/// use fast_insights::model::combination_key;
///
/// assert_eq!(
///     combination_key(&["color_red", "age_[-inf,10.0)"]),
///     r#"["age_[-inf,10.0)", "color_red"]"#
/// );
/// ```
pub fn combination_key<S: AsRef<str>>(names: &[S]) -> String {
    let mut sorted: Vec<&str> = names.iter().map(AsRef::as_ref).collect();
    sorted.sort_unstable();
    let quoted: Vec<String> = sorted
        .into_iter()
        .map(|n| serde_json::Value::String(n.to_string()).to_string())
        .collect();
    format!("[{}]", quoted.join(", "))
}

/// A derived indicator column.
#[derive(Debug, Clone)]
pub struct Segment {
    name: String,
    provenance: Provenance,
    values: BooleanArray,
}

impl Segment {
    /// Creates a segment; `values` must not contain nulls.
    pub fn new(name: impl Into<String>, provenance: Provenance, values: BooleanArray) -> Self {
        Self {
            name: name.into(),
            provenance,
            values,
        }
    }

    /// Segment name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Segment provenance.
    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    /// Indicator values.
    pub fn values(&self) -> &BooleanArray {
        &self.values
    }

    /// Number of rows where the segment is active.
    pub fn size(&self) -> u64 {
        self.values.true_count() as u64
    }
}

/// Insertion-ordered collection of segments.
///
/// Inserting a name that already exists replaces the column and provenance in
/// place and keeps its position.
#[derive(Debug, Clone, Default)]
pub struct SegmentTable {
    segments: IndexMap<String, Segment>,
}

impl SegmentTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a segment.
    pub fn insert(&mut self, segment: Segment) {
        self.segments.insert(segment.name.clone(), segment);
    }

    /// Looks up a segment by name.
    pub fn get(&self, name: &str) -> Option<&Segment> {
        self.segments.get(name)
    }

    /// Whether a segment with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.segments.contains_key(name)
    }

    /// Whether any segment carries the given provenance.
    pub fn contains_provenance(&self, provenance: &Provenance) -> bool {
        self.segments.values().any(|s| &s.provenance == provenance)
    }

    /// Segments in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.values()
    }

    /// Segment names in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.segments.keys().cloned().collect()
    }

    /// Segments derived directly from `column`.
    pub fn with_base<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a Segment> + 'a {
        self.segments
            .values()
            .filter(move |s| s.provenance.base_column() == Some(column))
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the table has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Snapshot of the provenance map.
    pub fn provenance_map(&self) -> ProvenanceMap {
        self.segments
            .iter()
            .map(|(name, s)| (name.clone(), s.provenance.clone()))
            .collect()
    }
}
