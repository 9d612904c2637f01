//! Path hashing using FxHash.
//!
//! `rustc_hash::FxHasher` is unseeded, so the same input hashes to the same
//! value in every process. Compiled artifact names depend on that: any
//! consumer can recompute a locator without a lookup table.
//!
//! ```ignore
//! use crate::utils::hash;
//!
//! let h = hash::compute("textures/grass.png"); // -> u64
//! let key = hash::to_key(h);                  // -> "9f1c...16 hex digits"
//! ```

use rustc_hash::FxHasher;
use std::hash::Hasher;

/// Compute 64-bit hash from byte data.
#[inline]
pub fn compute<T: AsRef<[u8]> + ?Sized>(data: &T) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(data.as_ref());
    hasher.finish()
}

/// Render a hash as a fixed-width, filename-safe key.
#[inline]
pub fn to_key(hash: u64) -> String {
    format!("{hash:016x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_deterministic() {
        assert_eq!(compute("models/hero.fbx"), compute("models/hero.fbx"));
    }

    #[test]
    fn test_compute_distinguishes_paths() {
        assert_ne!(compute("a.png"), compute("b.png"));
    }

    #[test]
    fn test_key_is_fixed_width() {
        assert_eq!(to_key(0), "0000000000000000");
        assert_eq!(to_key(0xabc).len(), 16);
    }
}
