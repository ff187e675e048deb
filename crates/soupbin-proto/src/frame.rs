//! Frame type: a length-prefixed packet type plus opaque body.
//!
//! Layout on the wire: `length:u16_be ‖ packet_type:u8 ‖ body:byte[length-1]`.

use bytes::{BufMut, Bytes, BytesMut};

use crate::errors::{ProtocolError, Result};

/// A decoded protocol frame: a packet type byte and its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The single ASCII packet-type character.
    pub packet_type: u8,
    /// Body bytes, not including the packet-type byte.
    pub body: Bytes,
}

impl Frame {
    /// Largest payload (packet type + body) representable by the 16-bit length field.
    pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

    /// Build a frame from a packet type and body.
    pub fn new(packet_type: u8, body: impl Into<Bytes>) -> Self {
        Self { packet_type, body: body.into() }
    }

    /// Encode this frame to its wire representation, including the length prefix.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::PayloadTooLarge`] if `1 + body.len()` does not fit in `u16`.
    pub fn encode(&self) -> Result<Bytes> {
        let payload_len = 1 + self.body.len();
        if payload_len > Self::MAX_PAYLOAD_LEN {
            return Err(ProtocolError::PayloadTooLarge { size: payload_len, max: Self::MAX_PAYLOAD_LEN });
        }

        let mut buf = BytesMut::with_capacity(2 + payload_len);
        #[allow(clippy::cast_possible_truncation)]
        buf.put_u16(payload_len as u16);
        buf.put_u8(self.packet_type);
        buf.put_slice(&self.body);
        Ok(buf.freeze())
    }

    /// Decode a single frame from the front of `bytes`.
    ///
    /// Returns the parsed frame and the number of bytes it consumed. `bytes` may
    /// contain trailing data belonging to a subsequent frame; only the consumed
    /// prefix is read.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::ShortRead`] if fewer bytes are available than the
    /// length prefix promises, or [`ProtocolError::EmptyPayload`] if the length
    /// prefix is zero.
    pub fn decode(bytes: &[u8]) -> Result<(Self, usize)> {
        if bytes.len() < 2 {
            return Err(ProtocolError::ShortRead { expected: 2, actual: bytes.len() });
        }

        #[allow(clippy::indexing_slicing)]
        let length = u16::from_be_bytes([bytes[0], bytes[1]]) as usize;
        if length == 0 {
            return Err(ProtocolError::EmptyPayload);
        }

        let total = 2 + length;
        if bytes.len() < total {
            return Err(ProtocolError::ShortRead { expected: total, actual: bytes.len() });
        }

        #[allow(clippy::indexing_slicing)]
        let packet_type = bytes[2];
        #[allow(clippy::indexing_slicing)]
        let body = Bytes::copy_from_slice(&bytes[3..total]);

        Ok((Self { packet_type, body }, total))
    }

    /// Validate a length prefix read directly off the wire, without the body in hand yet.
    ///
    /// The reader duty uses this after reading the 2-byte length so it knows how
    /// many body bytes to read next without allocating an intermediate buffer.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::EmptyPayload`] if `raw` decodes to zero.
    pub fn decode_length(raw: [u8; 2]) -> Result<u16> {
        let length = u16::from_be_bytes(raw);
        if length == 0 {
            return Err(ProtocolError::EmptyPayload);
        }
        Ok(length)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn packet_type_strategy() -> impl Strategy<Value = u8> {
        prop_oneof![
            Just(b'L'),
            Just(b'A'),
            Just(b'J'),
            Just(b'H'),
            Just(b'R'),
            Just(b'S'),
            Just(b'U'),
            Just(b'+'),
            Just(b'O'),
        ]
    }

    proptest! {
        #[test]
        fn frame_round_trip(packet_type in packet_type_strategy(), body in proptest::collection::vec(any::<u8>(), 0..256)) {
            let frame = Frame::new(packet_type, body);
            let wire = frame.encode().expect("should encode");
            let (decoded, consumed) = Frame::decode(&wire).expect("should decode");
            prop_assert_eq!(consumed, wire.len());
            prop_assert_eq!(decoded, frame);
        }
    }

    #[test]
    fn zero_length_is_rejected() {
        let err = Frame::decode(&[0, 0]).unwrap_err();
        assert_eq!(err, ProtocolError::EmptyPayload);
    }

    #[test]
    fn short_read_is_reported() {
        // length prefix claims 5 bytes, only 2 are present
        let err = Frame::decode(&[0, 5, b'S']).unwrap_err();
        assert_eq!(err, ProtocolError::ShortRead { expected: 7, actual: 3 });
    }

    #[test]
    fn heartbeat_has_empty_body() {
        let frame = Frame::new(b'H', Bytes::new());
        let wire = frame.encode().expect("should encode");
        assert_eq!(wire.as_ref(), &[0, 1, b'H']);
    }

    #[test]
    fn decode_consumes_only_its_own_frame() {
        let first = Frame::new(b'+', Bytes::from_static(b"hi"));
        let second = Frame::new(b'+', Bytes::from_static(b"there"));
        let mut wire = BytesMut::new();
        wire.extend_from_slice(&first.encode().unwrap());
        wire.extend_from_slice(&second.encode().unwrap());

        let (decoded_first, consumed) = Frame::decode(&wire).unwrap();
        assert_eq!(decoded_first, first);
        let (decoded_second, _) = Frame::decode(&wire[consumed..]).unwrap();
        assert_eq!(decoded_second, second);
    }
}
