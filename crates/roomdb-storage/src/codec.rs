// Binary codec for the file header and fixed-length record slots
//
// Header format (big-endian):
// [magic: u32] [record length: u32] [field count: u16]
// then per field: [name length: u16] [name bytes] [width: u16]
//
// Slot format:
// [flag: u8] [field 0, space padded] ... [field n-1, space padded]
//
// Flag 0x00 marks a valid record; any other value marks a tombstone.
// Text is single-byte (ISO-8859-1, of which US-ASCII is a subset).

use roomdb_core::format_version::{
    DELETED_FLAG, FIELD_DESCRIPTOR_OVERHEAD, HEADER_PREFIX_LEN, PAD_BYTE, VALID_FLAG,
};
use roomdb_core::{Error, FieldDef, Record, Result, Schema};
use std::io::{Read, Write};

/// Read and validate a file header.
///
/// `expected_cookie` is the magic cookie the caller is prepared to read.
pub fn read_header<R: Read>(reader: &mut R, expected_cookie: u32) -> Result<Schema> {
    let magic = read_u32(reader, "magic cookie")?;
    if magic != expected_cookie {
        return Err(Error::Format(format!(
            "unexpected magic cookie {:#x}, expected {:#x}",
            magic, expected_cookie
        )));
    }

    let record_length = read_u32(reader, "record length")? as usize;
    let field_count = read_u16(reader, "field count")? as usize;
    if field_count == 0 {
        return Err(Error::Format("header declares zero fields".to_string()));
    }

    let mut fields = Vec::with_capacity(field_count);
    for i in 0..field_count {
        let name_len = read_u16(reader, "field name length")? as usize;
        let mut name = vec![0u8; name_len];
        read_exact(reader, &mut name, "field name")?;
        let width = read_u16(reader, "field width")? as usize;

        fields.push(FieldDef::new(decode_text(&name), width));

        if width == 0 {
            return Err(Error::Format(format!("field {} declares zero width", i)));
        }
    }

    let schema = Schema::new(magic, fields)?;
    if schema.record_length() != record_length {
        return Err(Error::Format(format!(
            "record length {} does not match field widths totalling {}",
            record_length,
            schema.record_length()
        )));
    }

    Ok(schema)
}

/// Write a header describing `schema`.
pub fn write_header<W: Write>(writer: &mut W, schema: &Schema) -> Result<()> {
    let mut buf = Vec::with_capacity(header_length(schema));
    buf.extend_from_slice(&schema.magic_cookie().to_be_bytes());
    buf.extend_from_slice(&(schema.record_length() as u32).to_be_bytes());
    buf.extend_from_slice(&(schema.field_count() as u16).to_be_bytes());

    for field in schema.fields() {
        let name = encode_text(&field.name).ok_or_else(|| {
            Error::Validation(format!("field name {:?} is not single-byte text", field.name))
        })?;
        buf.extend_from_slice(&(name.len() as u16).to_be_bytes());
        buf.extend_from_slice(&name);
        buf.extend_from_slice(&(field.width as u16).to_be_bytes());
    }

    writer.write_all(&buf)?;
    Ok(())
}

/// Length in bytes of the header describing `schema`
pub fn header_length(schema: &Schema) -> usize {
    HEADER_PREFIX_LEN
        + schema
            .fields()
            .iter()
            .map(|f| FIELD_DESCRIPTOR_OVERHEAD + f.name.len())
            .sum::<usize>()
}

/// Length in bytes of one slot: the flag byte plus every field
pub fn slot_size(schema: &Schema) -> usize {
    1 + schema.record_length()
}

/// Decode one slot into its validity flag and record.
pub fn decode_slot(bytes: &[u8], schema: &Schema) -> Result<(bool, Record)> {
    let expected = slot_size(schema);
    if bytes.len() < expected {
        return Err(Error::Format(format!(
            "truncated slot: expected {} bytes, got {}",
            expected,
            bytes.len()
        )));
    }

    let valid = bytes[0] == VALID_FLAG;

    let mut offset = 1;
    let mut values = Vec::with_capacity(schema.field_count());
    for field in schema.fields() {
        let raw = &bytes[offset..offset + field.width];
        values.push(decode_text(trim_padding(raw)));
        offset += field.width;
    }

    Ok((valid, Record::new(values)))
}

/// Encode a record into one slot, padding every field to its width.
pub fn encode_slot(record: &Record, schema: &Schema, valid: bool) -> Result<Vec<u8>> {
    if record.len() != schema.field_count() {
        return Err(Error::Validation(format!(
            "record has {} fields, schema declares {}",
            record.len(),
            schema.field_count()
        )));
    }

    let mut slot = Vec::with_capacity(slot_size(schema));
    slot.push(if valid { VALID_FLAG } else { DELETED_FLAG });

    for (value, field) in record.fields().iter().zip(schema.fields()) {
        let bytes = encode_text(value).ok_or_else(|| {
            Error::Validation(format!(
                "field {} contains characters outside single-byte text",
                field.name
            ))
        })?;
        if bytes.contains(&0) {
            return Err(Error::Validation(format!(
                "field {} contains a NUL byte",
                field.name
            )));
        }
        if bytes.len() > field.width {
            return Err(Error::Validation(format!(
                "field {} is {} bytes, maximum is {}",
                field.name,
                bytes.len(),
                field.width
            )));
        }

        slot.extend_from_slice(&bytes);
        slot.resize(slot.len() + field.width - bytes.len(), PAD_BYTE);
    }

    Ok(slot)
}

fn trim_padding(raw: &[u8]) -> &[u8] {
    let end = raw
        .iter()
        .rposition(|&b| b != PAD_BYTE && b != 0)
        .map_or(0, |i| i + 1);
    &raw[..end]
}

fn decode_text(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn encode_text(text: &str) -> Option<Vec<u8>> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).ok())
        .collect()
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8], what: &str) -> Result<()> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::Format(format!("header truncated while reading {}", what))
        } else {
            Error::Io(e)
        }
    })
}

fn read_u32<R: Read>(reader: &mut R, what: &str) -> Result<u32> {
    let mut buf = [0u8; 4];
    read_exact(reader, &mut buf, what)?;
    Ok(u32::from_be_bytes(buf))
}

fn read_u16<R: Read>(reader: &mut R, what: &str) -> Result<u16> {
    let mut buf = [0u8; 2];
    read_exact(reader, &mut buf, what)?;
    Ok(u16::from_be_bytes(buf))
}
