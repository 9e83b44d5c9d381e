//! Record schema: the field names and byte widths declared by a file header.

use crate::error::{Error, Result};
use crate::format_version::MAGIC_COOKIE;
use serde::{Deserialize, Serialize};

/// A single field descriptor from the file header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name as stored in the header
    pub name: String,
    /// Declared width in bytes
    pub width: usize,
}

impl FieldDef {
    /// Create a field descriptor
    pub fn new(name: impl Into<String>, width: usize) -> Self {
        Self {
            name: name.into(),
            width,
        }
    }
}

/// Schema read once from the file header, immutable for the open session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    magic_cookie: u32,
    fields: Vec<FieldDef>,
    record_length: usize,
}

impl Schema {
    /// Build a schema, checking that it can be represented in a file header.
    pub fn new(magic_cookie: u32, fields: Vec<FieldDef>) -> Result<Self> {
        if fields.is_empty() {
            return Err(Error::Format("schema declares no fields".to_string()));
        }
        if fields.len() > u16::MAX as usize {
            return Err(Error::Format(format!(
                "schema declares {} fields, maximum is {}",
                fields.len(),
                u16::MAX
            )));
        }

        for field in &fields {
            if field.name.is_empty() || !field.name.is_ascii() {
                return Err(Error::Format(format!(
                    "invalid field name {:?}",
                    field.name
                )));
            }
            if field.name.len() > u16::MAX as usize {
                return Err(Error::Format(format!(
                    "field name {} is too long",
                    field.name
                )));
            }
            if field.width == 0 || field.width > u16::MAX as usize {
                return Err(Error::Format(format!(
                    "field {} has invalid width {}",
                    field.name, field.width
                )));
            }
        }

        let record_length = fields.iter().map(|f| f.width).sum();

        Ok(Self {
            magic_cookie,
            fields,
            record_length,
        })
    }

    /// The seven-field room booking schema.
    pub fn room() -> Self {
        let fields = RoomField::ALL
            .iter()
            .map(|f| FieldDef::new(f.name(), f.width()))
            .collect();

        Self::new(MAGIC_COOKIE, fields).expect("room schema is well formed")
    }

    /// Magic cookie of the file this schema belongs to
    pub fn magic_cookie(&self) -> u32 {
        self.magic_cookie
    }

    /// Field descriptors in file order
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Number of fields
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Sum of all field widths (slot size minus the flag byte)
    pub fn record_length(&self) -> usize {
        self.record_length
    }

    /// Index of the field with the given name
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// Field indices of the room booking schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomField {
    /// Hotel name
    Name = 0,
    /// City
    Location = 1,
    /// Maximum occupancy
    Size = 2,
    /// `Y` or `N`
    Smoking = 3,
    /// Nightly rate including currency symbol
    Rate = 4,
    /// Date available, `yyyy/mm/dd`
    Date = 5,
    /// Customer id holding the booking; blank when free
    Owner = 6,
}

impl RoomField {
    /// All fields in file order
    pub const ALL: [RoomField; 7] = [
        RoomField::Name,
        RoomField::Location,
        RoomField::Size,
        RoomField::Smoking,
        RoomField::Rate,
        RoomField::Date,
        RoomField::Owner,
    ];

    /// Position of this field within a record
    pub fn index(self) -> usize {
        self as usize
    }

    /// Header name of this field
    pub fn name(self) -> &'static str {
        match self {
            RoomField::Name => "name",
            RoomField::Location => "location",
            RoomField::Size => "size",
            RoomField::Smoking => "smoking",
            RoomField::Rate => "rate",
            RoomField::Date => "date",
            RoomField::Owner => "owner",
        }
    }

    /// Declared byte width of this field
    pub fn width(self) -> usize {
        match self {
            RoomField::Name => 64,
            RoomField::Location => 64,
            RoomField::Size => 4,
            RoomField::Smoking => 1,
            RoomField::Rate => 8,
            RoomField::Date => 10,
            RoomField::Owner => 8,
        }
    }
}
