use std::collections::BTreeMap;

use log::info;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{bit_path::BitPath, node::TrieNode};

/// Key length of the random entries. Fixed so no key is a prefix of another.
const RANDOM_KEY_BYTES: usize = 32;

pub(crate) fn common_setup() {
    // Try init since multiple tests calling `init` will cause an error.
    let _ = pretty_env_logger::try_init();
}

pub(crate) fn random_path(len: usize, seed: u64) -> BitPath {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen::<bool>()).collect()
}

/// Distinct random keys with short (inline) non-zero values.
pub(crate) fn random_entries(n: usize, seed: u64) -> Vec<(Vec<u8>, Vec<u8>)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut entries = BTreeMap::new();

    while entries.len() < n {
        let key: Vec<u8> = (0..RANDOM_KEY_BYTES).map(|_| rng.gen()).collect();
        let val_len = rng.gen_range(1..=32);
        let val: Vec<u8> = (0..val_len).map(|_| rng.gen_range(1..=255)).collect();

        entries.insert(key, val);
    }

    info!("Generated {} random trie entries (seed {})", n, seed);
    entries.into_iter().collect()
}

pub(crate) fn rlp_wrap(msg: &[u8]) -> Vec<u8> {
    rlp::encode(&msg.to_vec()).to_vec()
}

/// The RLP wrapped messages of every non-embedded node met while walking
/// `key` from `root`, leaf first.
pub(crate) fn proof_for(root: &TrieNode, key: &[u8]) -> Vec<Vec<u8>> {
    let key = BitPath::from_bytes(key);
    let mut proof = vec![rlp_wrap(&root.to_message())];
    let mut node = root;
    let mut cursor = 0;

    while node.shared_path.is_prefix_of(&key, cursor) {
        cursor += node.shared_path.len();
        let Ok(bit) = key.get(cursor) else {
            break;
        };
        cursor += 1;

        let child = node.child(bit);
        let Some(next) = child.node() else {
            break;
        };

        if !child.is_embeddable() {
            proof.push(rlp_wrap(&next.to_message()));
        }
        node = next;
    }

    proof.reverse();
    proof
}
