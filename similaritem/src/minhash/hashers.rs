use fnv::FnvHasher;
use seahash::SeaHasher;
use serde::{Deserialize, Serialize};
use siphasher::sip::SipHasher24;
use std::fmt;
use std::hash::Hasher;
use std::str::FromStr;

use crate::minhash::{HashedShingleSet, LARGEST_32_BIT_PRIME};
use crate::text::ShingleSet;

/// String hash used to reduce shingles into `[0, modulus)`.
///
/// Every variant is seeded with fixed keys, so the same shingle hashes to the
/// same value on every run and platform. `Sea` is the default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShingleHasher {
    #[default]
    Sea,
    Sip,
    Fnv,
}

impl ShingleHasher {
    pub fn new_hasher(&self) -> Box<dyn Hasher> {
        match self {
            ShingleHasher::Sea => Box::new(SeaHasher::new()),
            ShingleHasher::Sip => Box::new(SipHasher24::new_with_keys(1, 2)),
            ShingleHasher::Fnv => Box::new(FnvHasher::default()),
        }
    }

    /// Hashes the UTF-8 bytes of `shingle` into 64 bits.
    pub fn hash_str(&self, shingle: &str) -> u64 {
        let mut hasher = self.new_hasher();
        hasher.write(shingle.as_bytes());
        hasher.finish()
    }

    /// Hashes every shingle and reduces it modulo `modulus`.
    /// Colliding shingles merge into one entry.
    pub fn hash_shingles(&self, shingles: &ShingleSet, modulus: u32) -> HashedShingleSet {
        shingles
            .iter()
            .map(|shingle| (self.hash_str(shingle) % modulus as u64) as u32)
            .collect()
    }
}

impl FromStr for ShingleHasher {
    type Err = String;

    fn from_str(input: &str) -> Result<ShingleHasher, String> {
        match input.to_lowercase().as_str() {
            "sea" => Ok(ShingleHasher::Sea),
            "sip" => Ok(ShingleHasher::Sip),
            "fnv" => Ok(ShingleHasher::Fnv),
            _ => Err(format!(
                "Unsupported hasher [{}]. Supported hashers [sea, sip, fnv].",
                input
            )),
        }
    }
}

impl fmt::Display for ShingleHasher {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ShingleHasher::Sea => "sea",
            ShingleHasher::Sip => "sip",
            ShingleHasher::Fnv => "fnv",
        };
        f.write_str(name)
    }
}

/// Hashes a shingle set with the default hasher and [`LARGEST_32_BIT_PRIME`].
pub fn hash_shingles(shingles: &ShingleSet) -> HashedShingleSet {
    ShingleHasher::default().hash_shingles(shingles, LARGEST_32_BIT_PRIME)
}
