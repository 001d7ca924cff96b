//! Byte encodings of arkworks objects: compressed canonical bytes for the wire and a `serde_with`
//! adapter so that structs holding group elements or field elements can derive serde.

use alloc::vec::Vec;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize, SerializationError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_with::{DeserializeAs, SerializeAs};

/// Use as `#[serde_as(as = "ArkObjectBytes")]` on fields whose type only implements the arkworks
/// canonical serialization traits.
pub struct ArkObjectBytes;

impl<T: CanonicalSerialize> SerializeAs<T> for ArkObjectBytes {
    fn serialize_as<S: Serializer>(source: &T, serializer: S) -> Result<S::Ok, S::Error> {
        let bytes = to_compressed_bytes(source).map_err(serde::ser::Error::custom)?;
        bytes.serialize(serializer)
    }
}

impl<'de, T: CanonicalDeserialize> DeserializeAs<'de, T> for ArkObjectBytes {
    fn deserialize_as<D: Deserializer<'de>>(deserializer: D) -> Result<T, D::Error> {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        from_compressed_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

/// Compressed canonical encoding. Group elements have a fixed length for a given curve.
pub fn to_compressed_bytes<T: CanonicalSerialize>(obj: &T) -> Result<Vec<u8>, SerializationError> {
    let mut bytes = Vec::with_capacity(obj.compressed_size());
    obj.serialize_compressed(&mut bytes)?;
    Ok(bytes)
}

/// Inverse of [`to_compressed_bytes`]. Points are checked to be on the curve and in the right
/// subgroup. Trailing bytes are rejected.
pub fn from_compressed_bytes<T: CanonicalDeserialize>(
    bytes: &[u8],
) -> Result<T, SerializationError> {
    let mut reader = bytes;
    let obj = T::deserialize_compressed(&mut reader)?;
    if !reader.is_empty() {
        return Err(SerializationError::InvalidData);
    }
    Ok(obj)
}
