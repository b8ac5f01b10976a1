//! Define [`BitPath`], the key type used to walk RSK's binary trie, and how
//! to convert bytes and packed encodings into bit paths.
//!
//! Every node of the unified trie branches on a single bit, so keys are
//! consumed one bit at a time, most-significant bit of each byte first. The
//! shared path stored in a node is just a [`BitPath`] whose length need not be
//! a multiple of `8`.

use std::fmt::{self, Debug, Display};

use bitvec::{order::Msb0, slice::BitSlice, vec::BitVec};
use thiserror::Error;

/// A single bit of a key. `false` selects the left child, `true` the right
/// one.
pub type Bit = bool;

/// Errors encountered when reading from or building a [`BitPath`].
#[derive(Clone, Debug, Eq, Error, Hash, PartialEq)]
pub enum BitPathError {
    /// Tried to read a bit past the end of the path.
    #[error("Tried to read bit {index} of a path that is only {len} bits long")]
    IndexOutOfBounds {
        /// The requested bit index.
        index: usize,
        /// The length of the path in bits.
        len: usize,
    },

    /// The packed encoding holds fewer bits than the declared length.
    #[error("Packed path of {available} bytes cannot hold {len} bits")]
    EncodingTooShort {
        /// The declared length in bits.
        len: usize,
        /// The number of bytes that were available.
        available: usize,
    },
}

/// Result alias for [`BitPath`] operations.
pub type BitPathResult<T> = Result<T, BitPathError>;

/// An ordered, immutable sequence of bits with an explicit bit length.
///
/// Two paths are equal iff they have the same length and the same bit at
/// every position. A path of length `0` is the empty path.
/// ```rust
/// # use rsk_trie::bit_path::BitPath;
/// let p = BitPath::from_bytes(&[0b1010_0000]);
/// assert_eq!(p.len(), 8);
/// assert_eq!(p.get(0), Ok(true));
/// assert_eq!(p.get(1), Ok(false));
/// assert!(p.get(8).is_err());
/// ```
#[derive(Clone, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct BitPath {
    bits: BitVec<u8, Msb0>,
}

impl Display for BitPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0b")?;
        for bit in self.bits.iter().by_vals() {
            write!(f, "{}", u8::from(bit))?;
        }

        Ok(())
    }
}

// Manual impl so long paths print as a bit string instead of the raw storage.
impl Debug for BitPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitPath")
            .field("len", &self.len())
            .field("bits", &format!("{self}"))
            .finish()
    }
}

impl From<&[u8]> for BitPath {
    fn from(v: &[u8]) -> Self {
        Self::from_bytes(v)
    }
}

impl FromIterator<Bit> for BitPath {
    fn from_iter<T: IntoIterator<Item = Bit>>(iter: T) -> Self {
        Self {
            bits: iter.into_iter().collect(),
        }
    }
}

impl BitPath {
    /// The empty path.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a path of `8 * data.len()` bits, reading each byte
    /// most-significant bit first.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self {
            bits: BitVec::from_slice(data),
        }
    }

    /// Creates a path from the first `len` bits of a packed MSB-first
    /// encoding. Trailing padding bits in the last byte are ignored.
    pub fn from_encoded(encoded: &[u8], len: usize) -> BitPathResult<Self> {
        if encoded.len() < Self::encoded_len_for(len) {
            return Err(BitPathError::EncodingTooShort {
                len,
                available: encoded.len(),
            });
        }

        let bits = BitSlice::<u8, Msb0>::from_slice(encoded);
        Ok(Self {
            bits: bits[..len].to_bitvec(),
        })
    }

    /// The number of bits in the path.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Returns `true` if the path holds no bits.
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Reads the bit at index `i`.
    pub fn get(&self, i: usize) -> BitPathResult<Bit> {
        self.bits
            .get(i)
            .map(|b| *b)
            .ok_or(BitPathError::IndexOutOfBounds {
                index: i,
                len: self.len(),
            })
    }

    /// Iterates over the bits of the path in order.
    pub fn iter(&self) -> impl Iterator<Item = Bit> + '_ {
        self.bits.iter().by_vals()
    }

    /// Number of bytes needed to hold `bit_len` bits.
    pub const fn encoded_len_for(bit_len: usize) -> usize {
        bit_len.div_ceil(8)
    }

    /// Number of bytes the packed encoding of this path occupies.
    pub fn encoded_len(&self) -> usize {
        Self::encoded_len_for(self.len())
    }

    /// Packs the path into bytes, most-significant bit first, zero padded at
    /// the end of the last byte.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![0; self.encoded_len()];
        for (i, bit) in self.iter().enumerate() {
            if bit {
                out[i / 8] |= 0x80 >> (i % 8);
            }
        }

        out
    }

    /// Returns the sub-path `[start, end)`.
    ///
    /// # Panics
    /// Panics if `start > end` or `end > self.len()`.
    pub fn slice(&self, start: usize, end: usize) -> Self {
        Self {
            bits: self.bits[start..end].to_bitvec(),
        }
    }

    /// Returns the path without its first `n` bits (clamped to the length).
    pub fn skip(&self, n: usize) -> Self {
        self.slice(n.min(self.len()), self.len())
    }

    /// Number of leading bits that `self[self_offset..]` and
    /// `other[other_offset..]` have in common.
    ///
    /// The comparison stops at the first mismatch or when either side runs
    /// out of bits. Offsets past the end yield `0`.
    pub fn common_prefix_len(
        &self,
        self_offset: usize,
        other: &BitPath,
        other_offset: usize,
    ) -> usize {
        let a = self.bits.get(self_offset..).unwrap_or(BitSlice::empty());
        let b = other.bits.get(other_offset..).unwrap_or(BitSlice::empty());

        a.iter()
            .by_vals()
            .zip(b.iter().by_vals())
            .take_while(|(x, y)| x == y)
            .count()
    }

    /// Returns `true` if `self` is a prefix of `other[offset..]`.
    pub fn is_prefix_of(&self, other: &BitPath, offset: usize) -> bool {
        other.len() >= offset + self.len()
            && self.common_prefix_len(0, other, offset) == self.len()
    }
}
