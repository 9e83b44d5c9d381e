#![no_main]

use libfuzzer_sys::fuzz_target;
use roomdb_core::format_version::MAGIC_COOKIE;
use roomdb_storage::codec;

fuzz_target!(|data: &[u8]| {
    // Any byte string must yield a schema or an error, never a panic
    let mut reader = data;
    if let Ok(schema) = codec::read_header(&mut reader, MAGIC_COOKIE) {
        let mut written = Vec::new();
        codec::write_header(&mut written, &schema).unwrap();
        assert_eq!(written.len(), codec::header_length(&schema));
        assert_eq!(&data[..written.len()], written.as_slice());
    }
});
