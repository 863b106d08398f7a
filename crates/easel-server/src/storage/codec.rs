//! Document codecs.
//!
//! A room document is the room's full record sequence encoded as one array.
//! JSON is the on-disk format of [`FileStorage`](super::FileStorage) and is
//! the `<room>_board.json` / `<room>_chat.json` layout of existing data dirs.
//! CBOR is used inside [`RedbStorage`](super::RedbStorage).

use serde::{Serialize, de::DeserializeOwned};

use super::StorageError;

/// Encoding used for a room document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Codec {
    /// JSON array of records
    #[default]
    Json,
    /// CBOR array of records
    Cbor,
}

impl Codec {
    /// Encode a whole room sequence.
    pub fn encode<R: Serialize>(self, records: &[R]) -> Result<Vec<u8>, StorageError> {
        match self {
            Self::Json => {
                serde_json::to_vec(records).map_err(|e| StorageError::Serialization(e.to_string()))
            },
            Self::Cbor => {
                let mut bytes = Vec::new();
                ciborium::into_writer(records, &mut bytes)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                Ok(bytes)
            },
        }
    }

    /// Decode a whole room sequence.
    pub fn decode<R: DeserializeOwned>(self, bytes: &[u8]) -> Result<Vec<R>, StorageError> {
        match self {
            Self::Json => {
                serde_json::from_slice(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
            },
            Self::Cbor => {
                ciborium::from_reader(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_is_a_plain_array() {
        let bytes = Codec::Json.encode(&[1u32, 2, 3]).unwrap();
        assert_eq!(bytes, b"[1,2,3]");
    }

    #[test]
    fn decode_rejects_garbage() {
        for codec in [Codec::Json, Codec::Cbor] {
            let result: Result<Vec<u32>, _> = codec.decode(b"\xff{not a document");
            assert!(matches!(result, Err(StorageError::Serialization(_))), "{codec:?}");
        }
    }

    #[test]
    fn decode_rejects_wrong_shape() {
        let result: Result<Vec<u32>, _> = Codec::Json.decode(br#"{"x0": 1}"#);
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }

    #[test]
    fn empty_sequence_roundtrips() {
        for codec in [Codec::Json, Codec::Cbor] {
            let bytes = codec.encode::<u32>(&[]).unwrap();
            let back: Vec<u32> = codec.decode(&bytes).unwrap();
            assert!(back.is_empty());
        }
    }
}
