//! Receipt encoding and the receipt trie root.

use bytes::Bytes;
use ethereum_types::{Address, Bloom, H256, U256};
use rlp_derive::RlpEncodable;
use rsk_trie::{builder::BuildResult, trie_hashing::TrieFormat};

use crate::transaction::{indexed_trie_root, TxType};

/// A log entry, encoded as `[address, [topics], data]`.
#[derive(Clone, Debug, Eq, PartialEq, RlpEncodable)]
pub struct Log {
    /// The emitting contract.
    pub address: Address,
    /// Indexed topics.
    pub topics: Vec<H256>,
    /// Unindexed data.
    pub data: Bytes,
}

/// The RLP body of an RSK receipt.
#[derive(Clone, Debug, Eq, PartialEq, RlpEncodable)]
pub struct ReceiptRlp {
    /// Post-transaction state, empty on current networks.
    pub post_tx_state: Bytes,
    /// Gas used by the block up to and including this transaction.
    pub cumulative_gas: U256,
    /// Bloom filter over `logs`.
    pub logs_bloom: Bloom,
    /// Logs emitted by the transaction.
    pub logs: Vec<Log>,
    /// Gas used by this transaction alone.
    pub gas_used: U256,
    /// Encoded as `0x01` on success and as the empty string on failure.
    pub status: bool,
}

/// A receipt together with the envelope of its transaction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Receipt {
    /// The type of the transaction this receipt belongs to.
    pub tx_type: TxType,
    /// The receipt fields.
    pub body: ReceiptRlp,
}

impl Receipt {
    /// RLP encodes the receipt and prepends the tx type.
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = rlp::encode(&self.body).to_vec();
        if let Some(prefix) = self.tx_type.prefix() {
            bytes.insert(0, prefix);
        }
        bytes
    }
}

/// The receipt trie root of a block.
pub fn calculate_receipts_trie_root(
    receipts: &[Receipt],
    format: TrieFormat,
) -> BuildResult<H256> {
    indexed_trie_root(receipts.iter().map(Receipt::encode), format)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use ethereum_types::{Address, Bloom, H256, U256};
    use rsk_common::EMPTY_TRIE_HASH;
    use rsk_trie::trie_hashing::TrieFormat;

    use super::{calculate_receipts_trie_root, Log, Receipt, ReceiptRlp};
    use crate::transaction::TxType;

    fn receipt(success: bool) -> Receipt {
        Receipt {
            tx_type: TxType::Legacy,
            body: ReceiptRlp {
                post_tx_state: Bytes::new(),
                cumulative_gas: U256::from(21_000),
                logs_bloom: Bloom::zero(),
                logs: vec![],
                gas_used: U256::from(21_000),
                status: success,
            },
        }
    }

    #[test]
    fn status_encodes_as_one_or_empty() {
        let ok = receipt(true).encode();
        let failed = receipt(false).encode();

        let last = |enc: &[u8]| rlp::Rlp::new(enc).at(5).unwrap().as_raw().to_vec();
        assert_eq!(last(&ok), vec![0x01]);
        assert_eq!(last(&failed), vec![0x80]);
    }

    #[test]
    fn receipt_layout() {
        let mut r = receipt(true);
        r.body.logs.push(Log {
            address: Address::repeat_byte(0x11),
            topics: vec![H256::repeat_byte(0x22)],
            data: Bytes::from_static(&[0xde, 0xad]),
        });
        let enc = r.encode();
        let list = rlp::Rlp::new(&enc);

        assert_eq!(list.item_count().unwrap(), 6);
        assert!(list.at(0).unwrap().is_empty());
        assert_eq!(list.at(2).unwrap().data().unwrap().len(), 256);

        let log = list.at(3).unwrap().at(0).unwrap();
        assert_eq!(log.item_count().unwrap(), 3);
        assert_eq!(log.at(0).unwrap().data().unwrap(), &[0x11; 20]);
        assert_eq!(log.at(1).unwrap().item_count().unwrap(), 1);
        assert_eq!(log.at(2).unwrap().data().unwrap(), &[0xde, 0xad]);
    }

    #[test]
    fn typed_receipts_are_prefixed() {
        let legacy = receipt(true);
        let typed = Receipt {
            tx_type: TxType::DynamicFee,
            ..legacy.clone()
        };

        assert_eq!(typed.encode()[0], 0x02);
        assert_eq!(&typed.encode()[1..], &legacy.encode()[..]);
    }

    #[test]
    fn receipt_roots_depend_on_the_format() {
        assert_eq!(
            calculate_receipts_trie_root(&[], TrieFormat::Rskip107).unwrap(),
            EMPTY_TRIE_HASH
        );

        let receipts = [receipt(true), receipt(false)];
        assert_ne!(
            calculate_receipts_trie_root(&receipts, TrieFormat::Rskip107).unwrap(),
            calculate_receipts_trie_root(&receipts, TrieFormat::Orchid).unwrap()
        );
    }
}
