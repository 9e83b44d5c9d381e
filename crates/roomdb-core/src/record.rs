//! Records: ordered sets of string field values.

use crate::schema::RoomField;
use serde::{Deserialize, Serialize};

/// One row of the database, passed by value between the store and callers.
///
/// Field order follows the schema of the file the record belongs to. Values
/// are held without padding; the codec pads them to their declared widths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    fields: Vec<String>,
}

impl Record {
    /// Create a record from field values in schema order
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    /// Create a record from anything yielding string-like values
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a record laid out for the room schema
    pub fn room(
        name: &str,
        location: &str,
        size: &str,
        smoking: &str,
        rate: &str,
        date: &str,
        owner: &str,
    ) -> Self {
        Self::from_values([name, location, size, smoking, rate, date, owner])
    }

    /// All field values in schema order
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Consume the record, returning its values
    pub fn into_fields(self) -> Vec<String> {
        self.fields
    }

    /// Number of values held
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record holds no values
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Value at `index`, if present
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    /// Value of a room field; empty when the record is shorter than the room schema
    pub fn get(&self, field: RoomField) -> &str {
        self.field(field.index()).unwrap_or("")
    }

    /// Replace the value at `index`, returning the previous value.
    ///
    /// Returns `None` and leaves the record untouched when `index` is out of bounds.
    pub fn set(&mut self, index: usize, value: impl Into<String>) -> Option<String> {
        self.fields
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, value.into()))
    }

    /// Builder-style variant of [`Record::set`]
    pub fn with_field(mut self, index: usize, value: impl Into<String>) -> Self {
        self.set(index, value);
        self
    }

    /// Values of the given key fields, in the order given
    pub fn key<'a>(&'a self, key_fields: &[usize]) -> Vec<&'a str> {
        key_fields
            .iter()
            .map(|&i| self.field(i).unwrap_or(""))
            .collect()
    }

    /// Exact-prefix, case-sensitive match of one field.
    ///
    /// A missing or empty prefix matches every value.
    pub fn matches_prefix(&self, index: usize, prefix: Option<&str>) -> bool {
        match prefix {
            None => true,
            Some(p) if p.is_empty() => true,
            Some(p) => self.field(index).map_or(false, |v| v.starts_with(p)),
        }
    }

    /// Whether every criterion matches its field by prefix
    pub fn matches_criteria(&self, criteria: &[Option<&str>]) -> bool {
        criteria
            .iter()
            .enumerate()
            .all(|(i, c)| self.matches_prefix(i, *c))
    }

    /// Whether the room's owner field is set
    pub fn is_booked(&self) -> bool {
        !self.get(RoomField::Owner).trim().is_empty()
    }
}
