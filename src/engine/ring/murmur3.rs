//! Murmur3 x64/128 as computed by the cluster's Murmur3 partitioner.
//!
//! Tail bytes are sign-extended before mixing, matching the cluster's
//! implementation rather than the reference one. Only the first 64-bit
//! half is used for tokens.

const C1: u64 = 0x87c3_7b91_1142_53d5;
const C2: u64 = 0x4cf5_ad43_2745_937f;

#[inline]
fn fmix(mut k: u64) -> u64 {
    k ^= k >> 33;
    k = k.wrapping_mul(0xff51_afd7_ed55_8ccd);
    k ^= k >> 33;
    k = k.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    k ^= k >> 33;
    k
}

#[inline]
fn block(key: &[u8], index: usize) -> u64 {
    let start = index * 8;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&key[start..start + 8]);
    u64::from_le_bytes(buf)
}

#[inline]
fn signed(byte: u8) -> u64 {
    byte as i8 as i64 as u64
}

/// Returns both 64-bit halves of the hash.
pub fn hash3_x64_128(key: &[u8], seed: u64) -> (u64, u64) {
    let len = key.len();
    let nblocks = len / 16;

    let mut h1 = seed;
    let mut h2 = seed;

    for i in 0..nblocks {
        let mut k1 = block(key, i * 2);
        let mut k2 = block(key, i * 2 + 1);

        k1 = k1.wrapping_mul(C1).rotate_left(31).wrapping_mul(C2);
        h1 ^= k1;
        h1 = h1
            .rotate_left(27)
            .wrapping_add(h2)
            .wrapping_mul(5)
            .wrapping_add(0x52dc_e729);

        k2 = k2.wrapping_mul(C2).rotate_left(33).wrapping_mul(C1);
        h2 ^= k2;
        h2 = h2
            .rotate_left(31)
            .wrapping_add(h1)
            .wrapping_mul(5)
            .wrapping_add(0x3849_5ab5);
    }

    let tail = &key[nblocks * 16..];
    let mut k1: u64 = 0;
    let mut k2: u64 = 0;

    if tail.len() > 8 {
        for (i, b) in tail[8..].iter().enumerate() {
            k2 ^= signed(*b) << (8 * i);
        }
        k2 = k2.wrapping_mul(C2).rotate_left(33).wrapping_mul(C1);
        h2 ^= k2;
    }

    if !tail.is_empty() {
        for (i, b) in tail[..tail.len().min(8)].iter().enumerate() {
            k1 ^= signed(*b) << (8 * i);
        }
        k1 = k1.wrapping_mul(C1).rotate_left(31).wrapping_mul(C2);
        h1 ^= k1;
    }

    h1 ^= len as u64;
    h2 ^= len as u64;

    h1 = h1.wrapping_add(h2);
    h2 = h2.wrapping_add(h1);

    h1 = fmix(h1);
    h2 = fmix(h2);

    h1 = h1.wrapping_add(h2);
    h2 = h2.wrapping_add(h1);

    (h1, h2)
}

/// Token for a serialized partition key. `i64::MIN` is reserved as the ring
/// minimum and folds onto `i64::MAX`.
pub fn token_of(key: &[u8]) -> i64 {
    let (h1, _) = hash3_x64_128(key, 0);
    let v = h1 as i64;
    if v == i64::MIN { i64::MAX } else { v }
}
