//! Byte layout shared by all protocol payloads: big-endian integers, variable length fields
//! prefixed with their length as a 4 byte big-endian integer, group elements and scalars in their
//! compressed canonical encoding.

use crate::error::OfflineEuroError;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ecash_crypto_utils::serde_utils::{from_compressed_bytes, to_compressed_bytes};

pub trait WireFormat: Sized {
    fn write_to(&self, writer: &mut WireWriter) -> Result<(), OfflineEuroError>;

    fn read_from(reader: &mut WireReader<'_>) -> Result<Self, OfflineEuroError>;

    fn to_wire_bytes(&self) -> Result<Vec<u8>, OfflineEuroError> {
        let mut writer = WireWriter::new();
        self.write_to(&mut writer)?;
        Ok(writer.into_bytes())
    }

    /// Trailing bytes after the value are an error
    fn from_wire_bytes(bytes: &[u8]) -> Result<Self, OfflineEuroError> {
        let mut reader = WireReader::new(bytes);
        let value = Self::read_from(&mut reader)?;
        reader.finish()?;
        Ok(value)
    }
}

#[derive(Default, Debug)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn put_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) -> Result<(), OfflineEuroError> {
        let len = u32::try_from(bytes.len())
            .map_err(|_| OfflineEuroError::MalformedPayload("field longer than 4 GiB"))?;
        self.buf.extend_from_slice(&len.to_be_bytes());
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    pub fn put_str(&mut self, s: &str) -> Result<(), OfflineEuroError> {
        self.put_bytes(s.as_bytes())
    }

    /// Length prefixed compressed encoding
    pub fn put_element<T: CanonicalSerialize>(&mut self, obj: &T) -> Result<(), OfflineEuroError> {
        let bytes = to_compressed_bytes(obj)?;
        self.put_bytes(&bytes)
    }

    pub fn put_option<T, F>(&mut self, value: Option<&T>, mut put: F) -> Result<(), OfflineEuroError>
    where
        F: FnMut(&mut Self, &T) -> Result<(), OfflineEuroError>,
    {
        match value {
            None => self.put_u8(0),
            Some(v) => {
                self.put_u8(1);
                put(self, v)?;
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[derive(Debug)]
pub struct WireReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], OfflineEuroError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(OfflineEuroError::MalformedPayload("truncated payload"))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub fn get_u8(&mut self) -> Result<u8, OfflineEuroError> {
        Ok(self.take(1)?[0])
    }

    pub fn get_u64(&mut self) -> Result<u64, OfflineEuroError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_be_bytes(buf))
    }

    pub fn get_bytes(&mut self) -> Result<&'a [u8], OfflineEuroError> {
        let mut len = [0u8; 4];
        len.copy_from_slice(self.take(4)?);
        self.take(u32::from_be_bytes(len) as usize)
    }

    pub fn get_string(&mut self) -> Result<String, OfflineEuroError> {
        let bytes = self.get_bytes()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| OfflineEuroError::MalformedPayload("string is not utf-8"))
    }

    pub fn get_element<T: CanonicalDeserialize>(&mut self) -> Result<T, OfflineEuroError> {
        let bytes = self.get_bytes()?;
        Ok(from_compressed_bytes(bytes)?)
    }

    pub fn get_option<T, F>(&mut self, mut get: F) -> Result<Option<T>, OfflineEuroError>
    where
        F: FnMut(&mut Self) -> Result<T, OfflineEuroError>,
    {
        match self.get_u8()? {
            0 => Ok(None),
            1 => Ok(Some(get(self)?)),
            _ => Err(OfflineEuroError::MalformedPayload("invalid option tag")),
        }
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn finish(&self) -> Result<(), OfflineEuroError> {
        if self.remaining() != 0 {
            return Err(OfflineEuroError::MalformedPayload("trailing bytes"));
        }
        Ok(())
    }
}
