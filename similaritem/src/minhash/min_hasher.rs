use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::SimilarityError;
use crate::minhash::{HashedShingleSet, Signature, EMPTY_SLOT, LARGEST_32_BIT_PRIME};

/// Seed of the coefficient generator when none is configured.
pub const DEFAULT_SEED: u64 = 1786;

/// One member of the MinHash family, `h(x) = (a * x + b) mod modulus`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AffineHash {
    a: u32,
    b: u32,
    modulus: u32,
}

impl AffineHash {
    pub fn new(a: u32, b: u32, modulus: u32) -> Self {
        AffineHash { a, b, modulus }
    }

    pub fn a(&self) -> u32 {
        self.a
    }

    pub fn b(&self) -> u32 {
        self.b
    }

    pub fn modulus(&self) -> u32 {
        self.modulus
    }

    #[inline]
    pub fn apply(&self, x: u32) -> u32 {
        // a, b, x < 2^32 so a * x + b fits in u64
        ((self.a as u64 * x as u64 + self.b as u64) % self.modulus as u64) as u32
    }
}

/// Inclusive range the affine coefficients `a` and `b` are drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoefficientRange {
    pub low: u32,
    pub high: u32,
}

impl CoefficientRange {
    pub fn new(low: u32, high: u32) -> Self {
        CoefficientRange { low, high }
    }

    /// The widest range that keeps every function a bijection modulo
    /// [`LARGEST_32_BIT_PRIME`].
    pub fn full() -> Self {
        CoefficientRange::new(1, LARGEST_32_BIT_PRIME - 1)
    }

    /// `a = 0` would collapse every input onto `b`, and coefficients at or
    /// above the modulus alias smaller ones.
    pub fn validate(&self, modulus: u32) -> Result<(), SimilarityError> {
        if self.low < 1 || self.low > self.high || self.high >= modulus {
            return Err(SimilarityError::InvalidCoefficientRange {
                low: self.low,
                high: self.high,
                modulus,
            });
        }
        Ok(())
    }
}

impl Default for CoefficientRange {
    fn default() -> Self {
        CoefficientRange::new(1, 100)
    }
}

/// Builds MinHash signatures from hashed shingle sets.
///
/// The family of hash functions is generated once and must be shared by all
/// documents whose signatures are compared.
///
/// ```
/// use similaritem::minhash::{hash_shingles, MinHasher};
/// use similaritem::text::shingle_text;
///
/// let min_hasher = MinHasher::new(128);
/// let a = hash_shingles(&shingle_text("locality sensitive hashing is cool", 4));
/// let b = hash_shingles(&shingle_text("locality sensitive hashing is cool", 4));
/// let signature_a = min_hasher.create_signature(a.iter().copied());
/// let signature_b = min_hasher.create_signature(b.iter().copied());
/// assert_eq!(signature_a.len(), 128);
/// assert_eq!(signature_a.similarity(&signature_b).unwrap(), 1.0);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MinHasher {
    hash_functions: Vec<AffineHash>,
}

impl MinHasher {
    /// Family of `num_hashes` functions with the default coefficient range
    /// and [`DEFAULT_SEED`].
    pub fn new(num_hashes: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(DEFAULT_SEED);
        Self::generate(num_hashes, CoefficientRange::default(), &mut rng)
    }

    pub fn new_with_seed(
        num_hashes: usize,
        range: CoefficientRange,
        seed: u64,
    ) -> Result<Self, SimilarityError> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::from_rng(num_hashes, range, &mut rng)
    }

    /// Draws every `a` and `b` independently and uniformly from `range`.
    pub fn from_rng<R: Rng + ?Sized>(
        num_hashes: usize,
        range: CoefficientRange,
        rng: &mut R,
    ) -> Result<Self, SimilarityError> {
        range.validate(LARGEST_32_BIT_PRIME)?;
        Ok(Self::generate(num_hashes, range, rng))
    }

    pub fn from_hash_functions(hash_functions: Vec<AffineHash>) -> Self {
        MinHasher { hash_functions }
    }

    fn generate<R: Rng + ?Sized>(num_hashes: usize, range: CoefficientRange, rng: &mut R) -> Self {
        let coefficients = Uniform::new_inclusive(range.low, range.high);
        let hash_functions = (0..num_hashes)
            .map(|_| {
                let a = coefficients.sample(rng);
                let b = coefficients.sample(rng);
                AffineHash::new(a, b, LARGEST_32_BIT_PRIME)
            })
            .collect();
        MinHasher { hash_functions }
    }

    pub fn hash_functions(&self) -> &[AffineHash] {
        &self.hash_functions
    }

    pub fn num_hashes(&self) -> usize {
        self.hash_functions.len()
    }

    /// Folds every hashed shingle into the per-function minimum. An empty
    /// input yields a signature of [`EMPTY_SLOT`] values.
    pub fn create_signature<T>(&self, hashes: T) -> Signature
    where
        T: IntoIterator<Item = u32>,
    {
        let mut min_hashes = vec![EMPTY_SLOT; self.hash_functions.len()];
        for hash in hashes {
            for (min_hash, hash_function) in min_hashes.iter_mut().zip(self.hash_functions.iter()) {
                let h = hash_function.apply(hash);
                if h < *min_hash {
                    *min_hash = h;
                }
            }
        }
        Signature::from(min_hashes)
    }

    pub fn compute_similarity(
        &self,
        set_1: &HashedShingleSet,
        set_2: &HashedShingleSet,
    ) -> Result<f64, SimilarityError> {
        self.create_signature(set_1.iter().copied())
            .similarity(&self.create_signature(set_2.iter().copied()))
    }
}
