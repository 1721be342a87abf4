//! Deterministic descriptor identity.
//!
//! Grounded on the teacher's `TypeHash`: a 64-bit hash computed
//! deterministically from a name (plus, for functions/methods, its
//! parameter types) so the global Scope and Class member maps can use O(1)
//! lookups keyed by hash instead of repeated string comparison, with no
//! registration-order dependency.

use xxhash_rust::xxh64::xxh64;

mod constants {
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;
    pub const FUNCTION: u64 = 0x5ea77ffbcdf5f302;
    pub const METHOD: u64 = 0x7d3c8b4a92e15f6d;
    pub const CONSTRUCTOR: u64 = 0x9a7f3d5e2b8c4601;
    pub const PARAM: u64 = 0x9e3779b97f4a7c15;
}

/// Deterministic 64-bit identity for a Type/Function/Method/Constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorHash(pub u64);

impl DescriptorHash {
    pub fn from_name(domain: u64, name: &str) -> Self {
        let mixed = xxh64(name.as_bytes(), domain);
        DescriptorHash(mixed)
    }

    pub fn for_type(name: &str) -> Self {
        Self::from_name(constants::TYPE, name)
    }

    pub fn for_function(name: &str, param_hashes: &[DescriptorHash]) -> Self {
        let mut seed = constants::FUNCTION;
        for (i, p) in param_hashes.iter().enumerate() {
            seed ^= p.0.rotate_left((i as u32 % 32) + 1) ^ constants::PARAM;
        }
        Self::from_name(seed, name)
    }

    pub fn for_method(owner: DescriptorHash, name: &str, param_hashes: &[DescriptorHash]) -> Self {
        let mut seed = constants::METHOD ^ owner.0;
        for (i, p) in param_hashes.iter().enumerate() {
            seed ^= p.0.rotate_left((i as u32 % 32) + 1) ^ constants::PARAM;
        }
        Self::from_name(seed, name)
    }

    pub fn for_constructor(owner: DescriptorHash, param_hashes: &[DescriptorHash]) -> Self {
        let mut seed = constants::CONSTRUCTOR ^ owner.0;
        for (i, p) in param_hashes.iter().enumerate() {
            seed ^= p.0.rotate_left((i as u32 % 32) + 1) ^ constants::PARAM;
        }
        Self::from_name(seed, "constructor")
    }
}

impl std::fmt::Display for DescriptorHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_same_hash() {
        assert_eq!(DescriptorHash::for_type("int"), DescriptorHash::for_type("int"));
    }

    #[test]
    fn different_signatures_different_hash() {
        let a = DescriptorHash::for_function("foo", &[DescriptorHash::for_type("int")]);
        let b = DescriptorHash::for_function("foo", &[DescriptorHash::for_type("float")]);
        assert_ne!(a, b);
    }
}
