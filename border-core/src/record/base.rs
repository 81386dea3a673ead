//! Base implementation of records.
use crate::error::BorderError;
use std::collections::{
    hash_map::{IntoIter, Iter, Keys},
    HashMap,
};

/// Represents possible types of values that can be stored in a [`Record`].
///
/// Batched environments produce one value per environment instance, so per-environment
/// quantities are stored as [`RecordValue::Array1`] (floats) or [`RecordValue::Flags`]
/// (booleans) with one element per instance.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    /// A single floating-point value, typically an aggregate such as a mean.
    Scalar(f32),

    /// One floating-point value per environment instance.
    Array1(Vec<f32>),

    /// One boolean value per environment instance.
    Flags(Vec<bool>),

    /// A text value.
    String(String),
}

/// A container for storing key-value pairs of various data types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// Creates an empty record.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Creates a record containing a single scalar value.
    pub fn from_scalar(name: impl Into<String>, value: f32) -> Self {
        Self(HashMap::from([(name.into(), RecordValue::Scalar(value))]))
    }

    /// Creates a record from a slice of key-value pairs.
    pub fn from_slice<K: Into<String> + Clone>(s: &[(K, RecordValue)]) -> Self {
        Self(
            s.iter()
                .map(|(k, v)| (k.clone().into(), v.clone()))
                .collect(),
        )
    }

    /// Returns an iterator over the keys in the record.
    pub fn keys(&self) -> Keys<String, RecordValue> {
        self.0.keys()
    }

    /// Inserts a key-value pair into the record.
    pub fn insert(&mut self, k: impl Into<String>, v: RecordValue) {
        self.0.insert(k.into(), v);
    }

    /// Returns an iterator over the key-value pairs in the record.
    pub fn iter(&self) -> Iter<'_, String, RecordValue> {
        self.0.iter()
    }

    /// Returns an iterator that consumes the record.
    pub fn into_iter_in_record(self) -> IntoIter<String, RecordValue> {
        self.0.into_iter()
    }

    /// Gets a reference to the value associated with the given key.
    pub fn get(&self, k: &str) -> Option<&RecordValue> {
        self.0.get(k)
    }

    /// Merges two records, consuming both.
    ///
    /// Values of `record` overwrite values of `self` with the same key.
    pub fn merge(self, record: Record) -> Self {
        Record(self.0.into_iter().chain(record.0).collect())
    }

    /// Merges another record into this one in place.
    pub fn merge_inplace(&mut self, record: Record) {
        for (k, v) in record.0 {
            self.0.insert(k, v);
        }
    }

    /// Gets a scalar value.
    pub fn get_scalar(&self, k: &str) -> Result<f32, BorderError> {
        match self.lookup(k)? {
            RecordValue::Scalar(v) => Ok(*v),
            _ => Err(BorderError::RecordValueTypeError("Scalar".to_string())),
        }
    }

    /// Gets a per-environment array of floats.
    pub fn get_array1(&self, k: &str) -> Result<&[f32], BorderError> {
        match self.lookup(k)? {
            RecordValue::Array1(v) => Ok(v.as_slice()),
            _ => Err(BorderError::RecordValueTypeError("Array1".to_string())),
        }
    }

    /// Gets per-environment flags.
    pub fn get_flags(&self, k: &str) -> Result<&[bool], BorderError> {
        match self.lookup(k)? {
            RecordValue::Flags(v) => Ok(v.as_slice()),
            _ => Err(BorderError::RecordValueTypeError("Flags".to_string())),
        }
    }

    /// Gets a string value.
    pub fn get_string(&self, k: &str) -> Result<&str, BorderError> {
        match self.lookup(k)? {
            RecordValue::String(s) => Ok(s.as_str()),
            _ => Err(BorderError::RecordValueTypeError("String".to_string())),
        }
    }

    /// Returns `true` if the record contains no key-value pairs.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The number of key-value pairs.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    fn lookup(&self, k: &str) -> Result<&RecordValue, BorderError> {
        self.0
            .get(k)
            .ok_or_else(|| BorderError::RecordKeyError(k.to_string()))
    }
}
