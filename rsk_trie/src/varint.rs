//! The fixed and variable width integer encodings that appear inside RSK trie
//! node messages.
//!
//! These are **not** RLP. [`VarInt`] is the Bitcoin "compact size" encoding
//! (little-endian payload after a one byte marker) and is used for the
//! children size of a node and for long shared path lengths. The 24-bit
//! big-endian [`Uint24`] holds the length of long values.

use thiserror::Error;

/// Errors encountered while decoding integers from a byte buffer.
#[derive(Clone, Debug, Eq, Error, Hash, PartialEq)]
pub enum CodecError {
    /// The buffer ends before the field does.
    #[error("Needed {needed} bytes at offset {offset} but the buffer is only {len} bytes long")]
    Truncated {
        /// Offset the field starts at.
        offset: usize,
        /// Number of bytes the field needs.
        needed: usize,
        /// Length of the whole buffer.
        len: usize,
    },

    /// The value does not fit in 24 bits.
    #[error("Value {0} does not fit in an unsigned 24 bit integer")]
    Uint24Overflow(u64),
}

/// Result alias for integer codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

const VARINT_U16_MARKER: u8 = 0xfd;
const VARINT_U32_MARKER: u8 = 0xfe;
const VARINT_U64_MARKER: u8 = 0xff;

/// A variable length unsigned integer together with the number of bytes its
/// encoding occupies.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct VarInt {
    /// The decoded value.
    pub value: u64,
    /// Size of the encoding in bytes (`1`, `3`, `5` or `9`).
    pub size: usize,
}

impl From<u64> for VarInt {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl VarInt {
    /// Creates a `VarInt` using the shortest encoding for `value`.
    pub const fn new(value: u64) -> Self {
        Self {
            value,
            size: Self::size_of(value),
        }
    }

    /// Number of bytes the shortest encoding of `value` occupies.
    pub const fn size_of(value: u64) -> usize {
        match value {
            0..=0xfc => 1,
            0xfd..=0xffff => 3,
            0x1_0000..=0xffff_ffff => 5,
            _ => 9,
        }
    }

    /// Encodes the value.
    pub fn encode(&self) -> Vec<u8> {
        let v = self.value;
        match self.size {
            1 => vec![v as u8],
            3 => prefixed(VARINT_U16_MARKER, &(v as u16).to_le_bytes()),
            5 => prefixed(VARINT_U32_MARKER, &(v as u32).to_le_bytes()),
            _ => prefixed(VARINT_U64_MARKER, &v.to_le_bytes()),
        }
    }
}

fn prefixed(marker: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 1);
    out.push(marker);
    out.extend_from_slice(payload);
    out
}

/// Reads a [`VarInt`] starting at `offset`.
pub fn read_var_int(buf: &[u8], offset: usize) -> CodecResult<VarInt> {
    let marker = field(buf, offset, 1)?[0];

    let (value, size) = match marker {
        VARINT_U16_MARKER => {
            let b = field(buf, offset + 1, 2)?;
            (u16::from_le_bytes([b[0], b[1]]) as u64, 3)
        }
        VARINT_U32_MARKER => {
            let b = field(buf, offset + 1, 4)?;
            (u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as u64, 5)
        }
        VARINT_U64_MARKER => {
            let mut le = [0; 8];
            le.copy_from_slice(field(buf, offset + 1, 8)?);
            (u64::from_le_bytes(le), 9)
        }
        v => (v as u64, 1),
    };

    Ok(VarInt { value, size })
}

/// An unsigned 24-bit integer, stored in a `u32`.
pub type Uint24 = u32;

/// Largest value representable by a [`Uint24`].
pub const UINT24_MAX: Uint24 = 0x00ff_ffff;

/// Size in bytes of an encoded [`Uint24`].
pub const UINT24_SIZE: usize = 3;

/// Decodes a 3-byte big-endian unsigned integer starting at `offset`.
pub fn decode_uint24(buf: &[u8], offset: usize) -> CodecResult<Uint24> {
    let b = field(buf, offset, UINT24_SIZE)?;
    Ok(u32::from_be_bytes([0, b[0], b[1], b[2]]))
}

/// Encodes a [`Uint24`] as 3 big-endian bytes.
pub fn encode_uint24(v: u64) -> CodecResult<[u8; UINT24_SIZE]> {
    if v > UINT24_MAX as u64 {
        return Err(CodecError::Uint24Overflow(v));
    }

    let [_, a, b, c] = (v as u32).to_be_bytes();
    Ok([a, b, c])
}

/// Borrows `needed` bytes at `offset`, failing if the buffer is too short.
pub(crate) fn field(buf: &[u8], offset: usize, needed: usize) -> CodecResult<&[u8]> {
    offset
        .checked_add(needed)
        .and_then(|end| buf.get(offset..end))
        .ok_or(CodecError::Truncated {
            offset,
            needed,
            len: buf.len(),
        })
}
