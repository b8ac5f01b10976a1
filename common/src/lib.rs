use ethereum_types::H256;

/// The hash of empty input.
/// 0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470
pub const KECCAK_EMPTY: H256 = H256([
    197, 210, 70, 1, 134, 247, 35, 60, 146, 126, 125, 178, 220, 199, 3, 192, 229, 0, 182, 83, 202,
    130, 39, 59, 123, 250, 216, 4, 93, 133, 164, 112,
]);

/// The hash of an empty trie. RSK keeps the Ethereum value, the hash of the
/// RLP encoding of an empty byte string.
/// 0x56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421
pub const EMPTY_TRIE_HASH: H256 = H256([
    86, 232, 31, 23, 27, 204, 85, 166, 255, 131, 69, 230, 146, 192, 248, 110, 91, 72, 224, 27, 153,
    108, 173, 192, 1, 98, 47, 181, 227, 99, 180, 33,
]);

/// The uncles hash of a block without uncles, the hash of an empty RLP list.
/// 0x1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347
pub const EMPTY_UNCLES_HASH: H256 = H256([
    29, 204, 77, 232, 222, 199, 93, 122, 171, 133, 181, 103, 182, 204, 212, 26, 211, 18, 69, 27,
    148, 138, 116, 19, 240, 161, 66, 253, 64, 212, 147, 71,
]);

/// Size in bytes of a keccak256 digest as it appears inside trie nodes.
pub const HASH_SIZE: usize = 32;

#[test]
fn test_keccak_empty() {
    assert_eq!(KECCAK_EMPTY, keccak_hash::keccak([]));
}

#[test]
fn test_empty_trie_hash() {
    assert_eq!(EMPTY_TRIE_HASH, keccak_hash::keccak(&rlp::NULL_RLP));
}

#[test]
fn test_empty_uncles_hash() {
    assert_eq!(EMPTY_UNCLES_HASH, keccak_hash::keccak(&rlp::EMPTY_LIST_RLP));
}
