//! Decode-once codec for the transport layer.
//!
//! - Text frames => Envelope
//! - Binary frames => MediaFrame (panic-free bytes::Buf parsing)
//! - Ping/Pong are answered by tungstenite itself; Close ends the session

use tokio_tungstenite::tungstenite::Message;

use castwire_core::{
    error::Result,
    protocol::{decode_media_frame, encode_media_frame, Envelope, MediaFrame},
};

#[derive(Debug)]
pub enum Inbound {
    Envelope { env: Envelope, bytes_len: usize },
    Media { frame: MediaFrame, bytes_len: usize },
    Control,
    Close,
}

pub fn decode(msg: Message) -> Result<Inbound> {
    match msg {
        Message::Text(s) => {
            let bytes_len = s.len();
            let env = Envelope::parse(&s)?;
            Ok(Inbound::Envelope { env, bytes_len })
        }
        Message::Binary(b) => {
            let bytes_len = b.len();
            let frame = decode_media_frame(b)?;
            Ok(Inbound::Media { frame, bytes_len })
        }
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => Ok(Inbound::Control),
        Message::Close(_) => Ok(Inbound::Close),
    }
}

pub fn encode_envelope(env: &Envelope) -> Result<Message> {
    Ok(Message::text(env.to_json()?))
}

pub fn encode_frame(frame: &MediaFrame) -> Message {
    Message::binary(encode_media_frame(frame))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use castwire_core::protocol::MediaKind;

    #[test]
    fn text_frames_become_envelopes() {
        let msg = Message::text(r#"{"path":"clients","data":["a"]}"#.to_string());
        match decode(msg).unwrap() {
            Inbound::Envelope { env, bytes_len } => {
                assert_eq!(env.path, "clients");
                assert_eq!(bytes_len, 31);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn binary_frames_become_media() {
        let frame = MediaFrame {
            kind: MediaKind::StreamServer,
            seq: None,
            payload: Bytes::from_static(b"webm"),
        };
        match decode(encode_frame(&frame)).unwrap() {
            Inbound::Media { frame: got, bytes_len } => {
                assert_eq!(got, frame);
                assert_eq!(bytes_len, 7);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn garbage_text_is_an_error_not_a_panic() {
        let err = decode(Message::text("not json".to_string())).unwrap_err();
        assert_eq!(err.kind().as_str(), "BAD_ENVELOPE");
    }
}
