//! Recomputes the digests committed to by a block and compares them with the
//! reported ones.

use std::fmt::{self, Display};

use ethereum_types::H256;
use log::{info, warn};

use crate::{
    config::BlockHeaderConfig,
    header::compute_block_hash,
    receipt::{calculate_receipts_trie_root, Receipt},
    rpc::{input_to_block_header, InputError, InputResult, RpcBlock, RpcReceipt},
    transaction::{get_tx_trie_root, TxType},
};

/// A reported digest next to the recomputed one.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct HashCheck {
    /// The digest reported by the node.
    pub expected: H256,
    /// The digest computed locally.
    pub computed: H256,
}

impl HashCheck {
    /// Returns `true` if both digests are equal.
    pub fn is_match(&self) -> bool {
        self.expected == self.computed
    }
}

impl Display for HashCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.is_match() {
            true => write!(f, "{:#x} (ok)", self.computed),
            false => write!(
                f,
                "expected {:#x}, computed {:#x} (MISMATCH)",
                self.expected, self.computed
            ),
        }
    }
}

/// Expected and computed digests of one block.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BlockVerification {
    /// Block height.
    pub number: u64,
    /// The rules the block was hashed with.
    pub config: BlockHeaderConfig,
    /// The block hash.
    pub block_hash: HashCheck,
    /// The transaction trie root.
    pub transactions_root: HashCheck,
    /// The receipt trie root, when receipts were supplied.
    pub receipts_root: Option<HashCheck>,
}

impl BlockVerification {
    /// The individual checks, labelled.
    pub fn checks(&self) -> impl Iterator<Item = (&'static str, &HashCheck)> {
        [
            Some(("block hash", &self.block_hash)),
            Some(("transactions root", &self.transactions_root)),
            self.receipts_root.as_ref().map(|c| ("receipts root", c)),
        ]
        .into_iter()
        .flatten()
    }

    /// Every computed digest equals the reported one.
    pub fn is_valid(&self) -> bool {
        self.checks().all(|(_, c)| c.is_match())
    }
}

fn decode_receipts(receipts: &[RpcReceipt], tx_types: &[TxType]) -> InputResult<Vec<Receipt>> {
    if receipts.len() != tx_types.len() {
        return Err(InputError::ReceiptCount {
            expected: tx_types.len(),
            got: receipts.len(),
        });
    }

    let mut ordered: Vec<&RpcReceipt> = receipts.iter().collect();
    ordered.sort_by_key(|r| r.transaction_index);

    ordered
        .into_iter()
        .zip(tx_types)
        .map(|(r, tx_type)| -> InputResult<Receipt> {
            let mut receipt = r.to_receipt()?;
            if r.tx_type.is_none() {
                receipt.tx_type = *tx_type;
            }
            Ok(receipt)
        })
        .collect()
}

/// Recomputes the block hash, the transaction root and, if `receipts` are
/// given, the receipt root of `block` under `config`.
///
/// `block` must include full transaction objects.
pub fn verify_block(
    block: &RpcBlock,
    receipts: Option<&[RpcReceipt]>,
    config: &BlockHeaderConfig,
) -> InputResult<BlockVerification> {
    let header = input_to_block_header(block);
    let format = config.trie_format();

    let block_hash = HashCheck {
        expected: block.hash,
        computed: compute_block_hash(&header, config),
    };

    let txs = block.to_transactions()?;
    let transactions_root = HashCheck {
        expected: block.transactions_root,
        computed: get_tx_trie_root(&txs, format)?,
    };

    let receipts_root = match receipts {
        Some(receipts) => {
            let tx_types: Vec<TxType> = txs.iter().map(|tx| tx.tx_type).collect();
            let receipts = decode_receipts(receipts, &tx_types)?;

            Some(HashCheck {
                expected: block.receipts_root,
                computed: calculate_receipts_trie_root(&receipts, format)?,
            })
        }
        None => None,
    };

    let verification = BlockVerification {
        number: header.number,
        config: *config,
        block_hash,
        transactions_root,
        receipts_root,
    };

    for (name, check) in verification.checks().filter(|(_, c)| !c.is_match()) {
        warn!("Block {} {}: {}", verification.number, name, check);
    }
    info!(
        "Block {} with {} transaction(s) verified: {}",
        verification.number,
        txs.len(),
        verification.is_valid()
    );

    Ok(verification)
}
