//! Transaction encoding and the transaction trie root.

use ethereum_types::{H160, H256, U256};
use keccak_hash::keccak;
use log::trace;
use rlp::RlpStream;
use rlp_derive::RlpEncodable;
use rsk_trie::{
    builder::{BuildResult, TrieBuilder},
    trie_hashing::TrieFormat,
};
use serde::{Deserialize, Serialize};

/// The envelope of a transaction.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum TxType {
    /// Untyped RLP list.
    #[default]
    Legacy,
    /// EIP-2930 (`0x01`).
    AccessList,
    /// EIP-1559 (`0x02`).
    DynamicFee,
}

impl TxType {
    /// The envelope prefix byte, `None` for legacy transactions.
    pub const fn prefix(self) -> Option<u8> {
        match self {
            TxType::Legacy => None,
            TxType::AccessList => Some(0x01),
            TxType::DynamicFee => Some(0x02),
        }
    }
}

impl TryFrom<u64> for TxType {
    type Error = u64;

    fn try_from(v: u64) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(TxType::Legacy),
            1 => Ok(TxType::AccessList),
            2 => Ok(TxType::DynamicFee),
            other => Err(other),
        }
    }
}

/// An entry of an EIP-2930 access list.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, RlpEncodable, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessListItem {
    /// The accessed account.
    pub address: H160,
    /// The accessed storage slots.
    pub storage_keys: Vec<H256>,
}

/// Zero-valued fields that a sender signed as the raw byte `0x00` rather
/// than as the canonical empty string.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct RawZeroFields {
    /// The nonce.
    pub nonce: bool,
    /// The gas price (legacy and EIP-2930 only).
    pub gas_price: bool,
    /// The transferred value.
    pub value: bool,
}

/// A signed transaction.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Transaction {
    /// The envelope.
    pub tx_type: TxType,
    /// Chain id, only encoded by typed transactions.
    pub chain_id: u64,
    /// Sender nonce.
    pub nonce: U256,
    /// Gas price of legacy and EIP-2930 transactions.
    pub gas_price: U256,
    /// EIP-1559 priority fee.
    pub max_priority_fee_per_gas: U256,
    /// EIP-1559 fee cap.
    pub max_fee_per_gas: U256,
    /// Gas limit.
    pub gas: U256,
    /// Recipient, `None` for contract creation.
    pub to: Option<H160>,
    /// Transferred wei.
    pub value: U256,
    /// Call data or init code.
    pub data: Vec<u8>,
    /// EIP-2930 access list.
    pub access_list: Vec<AccessListItem>,
    /// Signature recovery id, EIP-155 adjusted for legacy transactions.
    pub v: U256,
    /// Signature `r`.
    pub r: U256,
    /// Signature `s`.
    pub s: U256,
    /// How zero fields are encoded.
    pub raw_zeros: RawZeroFields,
}

fn append_amount(s: &mut RlpStream, v: &U256, raw_zero: bool) {
    match raw_zero && v.is_zero() {
        true => s.append_raw(&[0x00], 1),
        false => s.append(v),
    };
}

impl Transaction {
    fn append_to(&self, s: &mut RlpStream) {
        match &self.to {
            Some(to) => s.append(to),
            None => s.append_empty_data(),
        };
    }

    /// The consensus encoding, prefixed with the type byte for typed
    /// transactions.
    pub fn encode(&self) -> Vec<u8> {
        let z = &self.raw_zeros;
        let mut s = match self.tx_type {
            TxType::Legacy => RlpStream::new_list(9),
            TxType::AccessList => RlpStream::new_list(11),
            TxType::DynamicFee => RlpStream::new_list(12),
        };

        if self.tx_type != TxType::Legacy {
            s.append(&self.chain_id);
        }
        append_amount(&mut s, &self.nonce, z.nonce);

        match self.tx_type {
            TxType::Legacy | TxType::AccessList => {
                append_amount(&mut s, &self.gas_price, z.gas_price);
            }
            TxType::DynamicFee => {
                s.append(&self.max_priority_fee_per_gas)
                    .append(&self.max_fee_per_gas);
            }
        }

        s.append(&self.gas);
        self.append_to(&mut s);
        append_amount(&mut s, &self.value, z.value);
        s.append(&self.data);

        if self.tx_type != TxType::Legacy {
            s.append_list(&self.access_list);
        }
        s.append(&self.v).append(&self.r).append(&self.s);

        let body = s.out();
        let mut out = Vec::with_capacity(body.len() + 1);
        out.extend(self.tx_type.prefix());
        out.extend_from_slice(&body);
        out
    }

    /// The transaction hash, `keccak` of [`Transaction::encode`].
    pub fn hash(&self) -> H256 {
        keccak(self.encode())
    }

    /// Every [`RawZeroFields`] combination that changes this transaction's
    /// encoding, the canonical one first.
    pub fn raw_zero_candidates(&self) -> Vec<RawZeroFields> {
        let nonce = self.nonce.is_zero();
        let gas_price = self.gas_price.is_zero() && self.tx_type != TxType::DynamicFee;
        let value = self.value.is_zero();

        let mut candidates = Vec::new();
        for bits in 0u8..8 {
            let c = RawZeroFields {
                nonce: bits & 1 != 0,
                gas_price: bits & 2 != 0,
                value: bits & 4 != 0,
            };
            if (c.nonce && !nonce) || (c.gas_price && !gas_price) || (c.value && !value) {
                continue;
            }
            candidates.push(c);
        }

        candidates
    }
}

/// The trie key of the item at `index` in a block: the RLP encoding of the
/// index.
pub fn index_key(index: usize) -> Vec<u8> {
    rlp::encode(&(index as u64)).to_vec()
}

/// Builds the trie of encoded items keyed by their index and returns its
/// root.
pub(crate) fn indexed_trie_root<I>(items: I, format: TrieFormat) -> BuildResult<H256>
where
    I: IntoIterator<Item = Vec<u8>>,
{
    let mut builder = TrieBuilder::new();
    for (i, item) in items.into_iter().enumerate() {
        trace!("Indexing item {} ({} bytes)", i, item.len());
        builder.insert(&index_key(i), item)?;
    }

    Ok(builder.root_hash(format))
}

/// The transaction trie root of a block.
pub fn get_tx_trie_root(transactions: &[Transaction], format: TrieFormat) -> BuildResult<H256> {
    indexed_trie_root(transactions.iter().map(Transaction::encode), format)
}

#[cfg(test)]
mod tests {
    use ethereum_types::{H160, U256};
    use hex_literal::hex;
    use rsk_common::EMPTY_TRIE_HASH;
    use rsk_trie::trie_hashing::TrieFormat;

    use super::{get_tx_trie_root, index_key, RawZeroFields, Transaction, TxType};

    fn transfer() -> Transaction {
        Transaction {
            nonce: U256::from(9),
            gas_price: U256::from(20_000_000_000u64),
            gas: U256::from(21_000),
            to: Some(H160(hex!("3535353535353535353535353535353535353535"))),
            value: U256::from(1_000_000_000_000_000_000u64),
            v: U256::from(37),
            r: U256::from_dec_str(
                "18515461264373351373200002665853028612451056578545711640558177340181847433846",
            )
            .unwrap(),
            s: U256::from_dec_str(
                "46948507304638947509940763649030358759909902576025900602547168820602576006531",
            )
            .unwrap(),
            ..Default::default()
        }
    }

    #[test]
    fn legacy_encoding_matches_eip155_example() {
        let tx = transfer();

        assert_eq!(
            tx.encode(),
            hex!(
                "f86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
            )
        );
        assert_eq!(
            tx.hash().0,
            hex!("33469b22e9f636356c4160a87eb19df52b7412e8eac32a4a55ffe88ea8350788")
        );
    }

    #[test]
    fn typed_transactions_are_prefixed() {
        let tx = Transaction {
            tx_type: TxType::DynamicFee,
            chain_id: 31,
            ..transfer()
        };
        let enc = tx.encode();

        assert_eq!(enc[0], 0x02);
        let list = rlp::Rlp::new(&enc[1..]);
        assert_eq!(list.item_count().unwrap(), 12);
        assert_eq!(list.val_at::<u64>(0).unwrap(), 31);
        assert!(list.at(8).unwrap().is_list());

        let access = Transaction {
            tx_type: TxType::AccessList,
            chain_id: 31,
            ..transfer()
        };
        assert_eq!(access.encode()[0], 0x01);
        assert_eq!(rlp::Rlp::new(&access.encode()[1..]).item_count().unwrap(), 11);
    }

    #[test]
    fn contract_creation_has_empty_recipient() {
        let tx = Transaction {
            to: None,
            ..transfer()
        };
        let enc = tx.encode();

        assert!(rlp::Rlp::new(&enc).at(3).unwrap().is_empty());
    }

    #[test]
    fn raw_zero_candidates_only_cover_zero_fields() {
        let tx = transfer();
        assert_eq!(tx.raw_zero_candidates(), vec![RawZeroFields::default()]);

        let zeroed = Transaction {
            nonce: U256::zero(),
            value: U256::zero(),
            ..transfer()
        };
        let candidates = zeroed.raw_zero_candidates();
        assert_eq!(candidates.len(), 4);
        assert_eq!(candidates[0], RawZeroFields::default());
        assert!(candidates.iter().all(|c| !c.gas_price));

        let raw = Transaction {
            raw_zeros: RawZeroFields {
                nonce: true,
                ..Default::default()
            },
            ..zeroed.clone()
        };
        let (canonical, raw) = (zeroed.encode(), raw.encode());
        assert_eq!(canonical.len(), raw.len());
        assert_eq!(rlp::Rlp::new(&canonical).at(0).unwrap().as_raw(), &[0x80]);
        assert_eq!(rlp::Rlp::new(&raw).at(0).unwrap().as_raw(), &[0x00]);
    }

    #[test]
    fn index_keys_are_rlp_integers() {
        assert_eq!(index_key(0), vec![0x80]);
        assert_eq!(index_key(1), vec![0x01]);
        assert_eq!(index_key(0x80), vec![0x81, 0x80]);
        assert_eq!(index_key(1000), vec![0x82, 0x03, 0xe8]);
    }

    #[test]
    fn empty_block_has_empty_tx_root() {
        assert_eq!(get_tx_trie_root(&[], TrieFormat::Rskip107).unwrap(), EMPTY_TRIE_HASH);
        assert_eq!(get_tx_trie_root(&[], TrieFormat::Orchid).unwrap(), EMPTY_TRIE_HASH);
    }
}
