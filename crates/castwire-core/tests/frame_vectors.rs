//! Binary media frame vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use bytes::Bytes;

use castwire_core::protocol::frame::{decode_media_frame, encode_media_frame};

mod vector_loader;
use vector_loader::load;

const FILES: [&str; 6] = [
    "frame_stream.json",
    "frame_stream_server_seq.json",
    "frame_bad_version.json",
    "frame_seq_flag_missing_u32.json",
    "frame_too_short.json",
    "frame_unknown_kind.json",
];

#[test]
fn frame_vectors() {
    for file in FILES {
        let v = load(file);
        let raw = v.bytes();
        let decoded = decode_media_frame(Bytes::from(raw.clone()));

        match (&v.decoded, &v.fault) {
            (_, Some(fault)) => {
                let err = decoded.expect_err(&v.name);
                assert_eq!(err.kind().as_str(), fault.code, "{}", v.name);
            }
            (Some(want), None) => {
                let frame = decoded.unwrap_or_else(|e| panic!("{}: {e}", v.name));
                assert_eq!(frame.kind.path(), want.path, "{}", v.name);
                assert_eq!(frame.seq, want.seq, "{}", v.name);
                assert_eq!(frame.payload.len(), want.payload_len, "{}", v.name);

                // valid vectors are canonical
                assert_eq!(encode_media_frame(&frame).as_ref(), &raw[..], "{}", v.name);
            }
            (None, None) => panic!("{file}: vector has neither expect nor expect_error"),
        }
    }
}
