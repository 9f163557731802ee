//! Growable packet writer.

use std::fmt;
use std::ops::Deref;

use crate::varint::encode_varint;

/// Capacity a fresh encoder starts with. Every message in the catalog
/// except long chat lines fits without growing.
pub const INITIAL_CAPACITY: usize = 64;

/// Upper bound on the slack added when the buffer grows.
///
/// A write that needs `needed` bytes in total grows the buffer to
/// `needed + min(GROWTH_STEP, needed)`: small packets double, large ones
/// get at most this much headroom.
pub const GROWTH_STEP: usize = 1024;

/// Capacity the encoder grows to when a write needs `needed` bytes.
pub fn grown_capacity(needed: usize) -> usize {
    needed + needed.min(GROWTH_STEP)
}

/// Writes packet fields in order into a growable buffer.
///
/// Methods return `&mut Self` so fields can be chained:
///
/// ```rust
/// use peerchat_protocol::PacketEncoder;
///
/// let mut enc = PacketEncoder::new();
/// enc.append_u8(0x01).append_exhaustive_string("hi");
/// assert_eq!(enc.finish().as_bytes(), &[0x01, b'h', b'i']);
/// ```
#[derive(Debug, Clone)]
pub struct PacketEncoder {
    buf: Vec<u8>,
}

impl Default for PacketEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketEncoder {
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    pub fn append_u8(&mut self, value: u8) -> &mut Self {
        self.ensure(1);
        self.buf.push(value);
        self
    }

    /// Appends a fixed-width field verbatim.
    pub fn append_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.ensure(bytes.len());
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Appends a varint. Values above 2^28 - 1 lose their high bits.
    pub fn append_varint(&mut self, value: u32) -> &mut Self {
        self.ensure(crate::varint::MAX_VARINT_BYTES);
        encode_varint(value, &mut self.buf);
        self
    }

    /// Appends a varint byte length followed by the UTF-8 bytes.
    pub fn append_length_prefixed_string(&mut self, text: &str) -> &mut Self {
        self.append_varint(text.len() as u32);
        self.append_bytes(text.as_bytes())
    }

    /// Appends the UTF-8 bytes with no length. The reader takes everything
    /// up to the end of the packet, so this must be the last field.
    pub fn append_exhaustive_string(&mut self, text: &str) -> &mut Self {
        self.append_bytes(text.as_bytes())
    }

    /// Appends a varint count followed by each element.
    pub fn append_array<T>(
        &mut self,
        items: &[T],
        mut write: impl FnMut(&mut Self, &T),
    ) -> &mut Self {
        self.append_varint(items.len() as u32);
        for item in items {
            write(self, item);
        }
        self
    }

    /// Stops writing and returns exactly the bytes written.
    pub fn finish(self) -> Packet {
        Packet(self.buf.into_boxed_slice())
    }

    fn ensure(&mut self, additional: usize) {
        let needed = self.buf.len() + additional;
        if needed > self.buf.capacity() {
            let target = grown_capacity(needed);
            self.buf.reserve_exact(target - self.buf.len());
        }
    }
}

// ---------------------------------------------------------------------------
// Packet
// ---------------------------------------------------------------------------

/// An encoded packet: the leading kind id and its payload.
///
/// Immutable once built. Dereferences to `[u8]`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Packet(Box<[u8]>);

impl Packet {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0.into_vec()
    }
}

impl Deref for Packet {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Packet {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Packet> for Vec<u8> {
    fn from(packet: Packet) -> Self {
        packet.into_vec()
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Packet(")?;
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}
