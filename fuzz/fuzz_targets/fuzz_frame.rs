#![no_main]

use libfuzzer_sys::fuzz_target;
use roomdb_remote::{Frame, FrameKind, Request, Response};

fuzz_target!(|data: &[u8]| {
    let mut reader = data;
    while let Ok(Some(frame)) = Frame::read_from(&mut reader) {
        match frame.kind {
            FrameKind::Request => {
                let _ = frame.into_message::<Request>(FrameKind::Request);
            }
            FrameKind::Response => {
                let _ = frame.into_message::<Response>(FrameKind::Response);
            }
        }
    }
});
