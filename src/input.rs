//! Test input generation.
//!
//! Inputs are deterministic in shape (exact requested length, every
//! escapable character class present in each fragment) but randomized in
//! content, so repeated benchmark invocations do not hit byte-identical
//! strings. Content randomness deliberately perturbs allocator and cache
//! behavior under test; it is not a correctness concern.

use rand::Rng;

/// Build the seed fragment with the given salt rendered into the middle.
///
/// The fragment contains at least one instance of every character the
/// candidate functions must escape (`& < > ' "`) on both ends, with plain
/// filler and the salt between them. ASCII only, so byte-level truncation
/// in [`generate_with_rng`] always lands on a character boundary.
fn fragment(salt: f64) -> String {
    format!("<>&'\"asdf{}zxcv<>&'\"", salt)
}

/// Generate a test string of exactly `len` bytes using the given RNG.
///
/// The seed fragment is repeated enough times to reach or exceed `len`,
/// then truncated to exactly `len`. A `len` smaller than the fragment
/// (including 0) truncates correctly.
pub fn generate_with_rng<R: Rng + ?Sized>(len: usize, rng: &mut R) -> String {
    let frag = fragment(rng.random::<f64>());
    let dups = len.div_ceil(frag.len());
    let mut s = frag.repeat(dups);
    s.truncate(len);
    s
}

/// Generate a test string of exactly `len` bytes with a thread-local RNG.
pub fn generate(len: usize) -> String {
    generate_with_rng(len, &mut rand::rng())
}
