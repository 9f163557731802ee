//! Bounds-checked packet reader.

use crate::varint::decode_varint;
use crate::ProtocolError;

/// Reads packet fields in order from a borrowed buffer.
///
/// Every read checks the remaining length first. A read that fails leaves
/// the cursor where it was, and nothing is ever substituted for missing or
/// malformed bytes.
#[derive(Debug, Clone)]
pub struct PacketDecoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PacketDecoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Reads a fixed number of raw bytes.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], ProtocolError> {
        let remaining = self.remaining();
        if count > remaining {
            return Err(ProtocolError::OutOfBounds {
                requested: count,
                remaining,
            });
        }
        let bytes = &self.buf[self.pos..self.pos + count];
        self.pos += count;
        Ok(bytes)
    }

    /// Reads exactly `N` bytes into an array.
    pub fn read_array_bytes<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_varint(&mut self) -> Result<u32, ProtocolError> {
        let (value, used) = decode_varint(&self.buf[self.pos..])?;
        self.pos += used;
        Ok(value)
    }

    /// Reads a varint byte length and then that many bytes as UTF-8.
    pub fn read_length_prefixed_string(&mut self) -> Result<String, ProtocolError> {
        let start = self.pos;
        let result = self
            .read_varint()
            .and_then(|len| self.read_utf8(len as usize));
        if result.is_err() {
            self.pos = start;
        }
        result
    }

    /// Reads every remaining byte as UTF-8.
    pub fn read_exhaustive_string(&mut self) -> Result<String, ProtocolError> {
        self.read_utf8(self.remaining())
    }

    /// Reads a varint count, then calls `read_element` that many times.
    ///
    /// Elements come back in wire order. If any element fails the whole
    /// array fails and the cursor is restored.
    pub fn read_array<T>(
        &mut self,
        mut read_element: impl FnMut(&mut Self) -> Result<T, ProtocolError>,
    ) -> Result<Vec<T>, ProtocolError> {
        let start = self.pos;
        let result = (|| -> Result<Vec<T>, ProtocolError> {
            let count = self.read_varint()? as usize;
            // Each element takes at least one byte, so a count larger than
            // what's left can't be honest. Don't let it size the allocation.
            let mut items = Vec::with_capacity(count.min(self.remaining()));
            for _ in 0..count {
                items.push(read_element(self)?);
            }
            Ok(items)
        })();
        if result.is_err() {
            self.pos = start;
        }
        result
    }

    fn read_utf8(&mut self, len: usize) -> Result<String, ProtocolError> {
        let start = self.pos;
        let bytes = self.read_bytes(len)?;
        match std::str::from_utf8(bytes) {
            Ok(text) => Ok(text.to_owned()),
            Err(e) => {
                self.pos = start;
                Err(e.into())
            }
        }
    }
}
