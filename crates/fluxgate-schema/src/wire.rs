//! Confluent wire framing for schema-tagged payloads.
//!
//! Format: `[magic_byte(1)][schema_id(4, big-endian)][datum(N)]`.

use crate::error::{Result, SchemaError};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Marker byte announcing a schema-id header.
const MAGIC_BYTE: u8 = 0x00;

/// Length of the framing header: magic byte plus schema id.
pub const HEADER_LEN: usize = 5;

/// Frame a datum with its schema id.
pub fn frame(schema_id: u32, datum: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + datum.len());
    buf.put_u8(MAGIC_BYTE);
    buf.put_u32(schema_id);
    buf.put_slice(datum);
    buf.freeze()
}

/// Split a framed payload into its schema id and the bare datum.
pub fn split(payload: &[u8]) -> Result<(u32, &[u8])> {
    if payload.len() < HEADER_LEN {
        return Err(SchemaError::Frame(format!(
            "payload of {} bytes is too short to carry a schema id",
            payload.len()
        )));
    }
    if payload[0] != MAGIC_BYTE {
        return Err(SchemaError::Frame(format!(
            "invalid magic byte: expected 0x00, got 0x{:02x}",
            payload[0]
        )));
    }
    let mut id_bytes = &payload[1..HEADER_LEN];
    let schema_id = id_bytes.get_u32();
    Ok((schema_id, &payload[HEADER_LEN..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_split_round_trip() {
        let framed = frame(123, b"hello world");
        assert_eq!(framed[0], MAGIC_BYTE);
        assert_eq!(framed.len(), HEADER_LEN + 11);

        let (schema_id, datum) = split(&framed).unwrap();
        assert_eq!(schema_id, 123);
        assert_eq!(datum, b"hello world");
    }

    #[test]
    fn test_schema_id_is_big_endian() {
        let framed = frame(258, b"");
        assert_eq!(&framed[..], &[0x00, 0x00, 0x00, 0x01, 0x02]);
    }

    #[test]
    fn test_split_accepts_empty_datum() {
        let (schema_id, datum) = split(&[0x00, 0x00, 0x00, 0x00, 0x2a]).unwrap();
        assert_eq!(schema_id, 42);
        assert!(datum.is_empty());
    }

    #[test]
    fn test_split_rejects_wrong_magic_byte() {
        let err = split(&[0xff, 0x00, 0x00, 0x00, 0x01, 0x42]).unwrap_err();
        assert!(err.to_string().contains("magic byte"));
    }

    #[test]
    fn test_split_rejects_short_payload() {
        let err = split(&[0x00, 0x01]).unwrap_err();
        assert!(err.to_string().contains("too short"));
    }
}
