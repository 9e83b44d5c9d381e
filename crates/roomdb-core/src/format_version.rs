//! On-disk format constants for roomdb database files.
//!
//! The header opens with a magic cookie identifying the file family, followed
//! by the record length and the field count. All header integers are
//! big-endian.

/// Magic cookie written by, and expected from, room database files
pub const MAGIC_COOKIE: u32 = 257;

/// Flag byte of a live slot
pub const VALID_FLAG: u8 = 0x00;

/// Flag byte written for a tombstoned slot (any non-zero flag reads as deleted)
pub const DELETED_FLAG: u8 = 0xFF;

/// Byte used to pad field values to their declared width
pub const PAD_BYTE: u8 = b' ';

/// Size of the fixed header prefix: magic (4) + record length (4) + field count (2)
pub const HEADER_PREFIX_LEN: usize = 10;

/// Per-field descriptor overhead: name length (2) + width (2)
pub const FIELD_DESCRIPTOR_OVERHEAD: usize = 4;

/// File extension expected for database files
pub const DATABASE_FILE_EXTENSION: &str = "db";
