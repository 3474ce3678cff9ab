use crate::engine::ring::murmur3::{hash3_x64_128, token_of};

#[test]
fn int_key_matches_cluster_token() {
    // serialized int 1
    assert_eq!(token_of(&[0, 0, 0, 1]), -4069959284402364209);
}

#[test]
fn empty_key_hashes_to_zero() {
    assert_eq!(hash3_x64_128(&[], 0), (0, 0));
    assert_eq!(token_of(&[]), 0);
}

#[test]
fn hashing_is_deterministic_across_block_boundaries() {
    let key: Vec<u8> = (0u8..40).collect();
    for len in [7, 8, 9, 15, 16, 17, 31, 32, 33, 40] {
        assert_eq!(token_of(&key[..len]), token_of(&key[..len]));
    }
    assert_ne!(token_of(&key[..16]), token_of(&key[..17]));
}

#[test]
fn high_tail_bytes_change_the_hash() {
    // sign extension must not collapse 0x80 onto 0x00
    assert_ne!(token_of(&[0x80]), token_of(&[0x00]));
    assert_ne!(token_of(&[0xff, 0x01]), token_of(&[0x7f, 0x01]));
}
