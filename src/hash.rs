//! Short content ids used for production class names and cache keys.

use xxhash_rust::xxh3::xxh3_64;

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
/// Base-36 digits needed for any `u64`.
const WIDTH: usize = 13;

/// Deterministic, non-cryptographic id of `input`: lowercase base-36,
/// always `WIDTH` characters long.
pub fn hash(input: &str) -> String {
    let mut n = xxh3_64(input.as_bytes());
    let mut out = [b'0'; WIDTH];
    for slot in out.iter_mut().rev() {
        *slot = ALPHABET[(n % 36) as usize];
        n /= 36;
    }
    // Leading digits of a 13-digit u64 are biased toward '0'..'3'; the tail is
    // uniform, so short ids are cut from the end.
    out.iter().map(|&b| b as char).collect()
}

/// The last `len` characters of [`hash`], `len <= 13`.
pub fn short_hash(input: &str, len: usize) -> String {
    let full = hash(input);
    full[WIDTH - len.min(WIDTH)..].to_string()
}
