use foldhash::fast::FixedState;
use std::hash::BuildHasher;

/// 32-bit hash family used to assign keys to hash tables.
///
/// Implementations must be deterministic and must compute every hash from a
/// fresh state: lookups on a shared [`Reader`](crate::Reader) run
/// concurrently, so `hash` takes `&self` and may not mutate anything. The
/// same implementation has to be used to build and to read a given file.
pub trait Hash32 {
    /// Hashes `key` to a 32-bit value.
    fn hash(&self, key: &[u8]) -> u32;
}

/// Any plain `fn(&[u8]) -> u32` (or closure) can serve as a hash function.
impl<F: Fn(&[u8]) -> u32> Hash32 for F {
    fn hash(&self, key: &[u8]) -> u32 {
        self(key)
    }
}

const DJB_SEED: u32 = 5381;

/// The hash from the cdb reference implementation: seed 5381, then
/// `h = (h * 33) ^ byte` in wrapping 32-bit arithmetic.
///
/// This is the default for both [`Writer`](crate::Writer) and
/// [`Reader`](crate::Reader); files built with it are bit-for-bit compatible
/// with other cdb tools using the same directory conventions.
#[derive(Debug, Default, Clone, Copy)]
pub struct DjbHash;

impl Hash32 for DjbHash {
    fn hash(&self, key: &[u8]) -> u32 {
        key.iter().fold(DJB_SEED, |h, &c| {
            h.wrapping_shl(5).wrapping_add(h) ^ u32::from(c)
        })
    }
}

/// Alternative hash backed by [`foldhash`], truncated to 32 bits.
///
/// Faster than [`DjbHash`] on long keys and seedable, at the cost of
/// producing files only readable with the same configuration.
#[derive(Debug, Clone)]
pub struct Fold32 {
    state: FixedState,
}

impl Fold32 {
    /// Creates a hasher whose output is fixed by `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Fold32 {
            state: FixedState::with_seed(seed),
        }
    }
}

impl Default for Fold32 {
    fn default() -> Self {
        Fold32::with_seed(0)
    }
}

impl Hash32 for Fold32 {
    fn hash(&self, key: &[u8]) -> u32 {
        self.state.hash_one(key) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_djb_vectors() {
        assert_eq!(DjbHash.hash(b""), 0x1505);
        assert_eq!(DjbHash.hash(b"Hello, world!"), 0x564369e8);
        assert_eq!(DjbHash.hash(b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"), 0x40032705);
    }

    #[test]
    fn test_fresh_state_per_call() {
        let h = DjbHash;
        assert_eq!(h.hash(b"key1"), h.hash(b"key1"));

        let f = Fold32::with_seed(42);
        assert_eq!(f.hash(b"key1"), f.hash(b"key1"));
        assert_ne!(
            Fold32::with_seed(1).hash(b"key1"),
            Fold32::with_seed(2).hash(b"key1")
        );
    }

    #[test]
    fn test_function_as_hash() {
        fn first_byte(key: &[u8]) -> u32 {
            key.first().copied().map_or(0, u32::from)
        }
        assert_eq!(first_byte.hash(b"abc"), u32::from(b'a'));
        assert_eq!((|_: &[u8]| 7u32).hash(b"anything"), 7);
    }
}
