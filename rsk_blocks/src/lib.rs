//! Rootstock block level verification.
//!
//! Given the JSON-RPC view of a block, this library recomputes what the block
//! commits to and reports whether the node told the truth:
//! - the block hash, whose preimage depends on the RSKIPs active at the
//!   block's height ([`config`], [`header`]),
//! - the transaction and receipt trie roots ([`transaction`], [`receipt`]),
//!   built with [`rsk_trie`],
//! - `eth_getProof` responses against the block's state root
//!   ([`proof_response`]).
//!
//! Responses are parsed with the types in [`rpc`] and checked end to end by
//! [`verify::verify_block`].

#![deny(rustdoc::broken_intra_doc_links)]
#![warn(missing_debug_implementations)]
#![warn(missing_docs)]

pub mod config;
pub mod header;
pub mod proof_response;
pub mod receipt;
pub mod rpc;
pub mod transaction;
pub mod verify;

#[cfg(test)]
pub(crate) mod testing_utils;

/// Like `#[serde(with = "hex")`, but tolerates and emits leading `0x` prefixes.
/// A `null` reads as the empty value.
mod hex {
    use serde::{de::Error as _, Deserialize as _, Deserializer, Serializer};

    pub fn serialize<S: Serializer, T>(data: T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: hex::ToHex,
    {
        let s = data.encode_hex::<String>();
        serializer.serialize_str(&format!("0x{}", s))
    }

    pub fn deserialize<'de, D: Deserializer<'de>, T>(deserializer: D) -> Result<T, D::Error>
    where
        T: hex::FromHex + Default,
        T::Error: std::fmt::Display,
    {
        let Some(s) = Option::<String>::deserialize(deserializer)? else {
            return Ok(T::default());
        };
        match s.strip_prefix("0x") {
            Some(rest) => T::from_hex(rest),
            None => T::from_hex(&*s),
        }
        .map_err(D::Error::custom)
    }
}
