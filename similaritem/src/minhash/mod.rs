use fxhash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SimilarityError;

mod hashers;
mod lsh_index;
mod min_hasher;

pub use self::hashers::{hash_shingles, ShingleHasher};
pub use self::lsh_index::LshIndex;
pub use self::min_hasher::{AffineHash, CoefficientRange, MinHasher, DEFAULT_SEED};

/// Largest prime below 2^32. Shingle hashes are reduced modulo this value
/// and the affine MinHash family works over the same field.
pub const LARGEST_32_BIT_PRIME: u32 = 4_294_967_291;

/// Value of every signature slot of an empty shingle set. It is larger than
/// any value an affine hash modulo [`LARGEST_32_BIT_PRIME`] can produce.
pub const EMPTY_SLOT: u32 = u32::MAX;

/// Hashed shingles of one document, each in `[0, LARGEST_32_BIT_PRIME)`.
pub type HashedShingleSet = FxHashSet<u32>;

/// Fixed-length MinHash signature of a document.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(Vec<u32>);

impl Signature {
    pub fn values(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when the signature was built from an empty shingle set.
    pub fn is_empty_set(&self) -> bool {
        self.0.iter().all(|v| *v == EMPTY_SLOT)
    }

    /// Fraction of positions on which the two signatures agree.
    pub fn similarity(&self, other: &Signature) -> Result<f64, SimilarityError> {
        compute_minhash_similarity(&self.0, &other.0)
    }

    pub fn into_vec(self) -> Vec<u32> {
        self.0
    }
}

impl From<Vec<u32>> for Signature {
    fn from(values: Vec<u32>) -> Self {
        Signature(values)
    }
}

impl AsRef<[u32]> for Signature {
    fn as_ref(&self) -> &[u32] {
        &self.0
    }
}

/// Exact jaccard similarity of two hashed shingle sets.
/// Two empty sets have similarity 0.
///
/// ```
/// use similaritem::minhash::{compute_jaccard_similarity, HashedShingleSet};
///
/// let a: HashedShingleSet = [1, 2, 3, 4].into_iter().collect();
/// let b: HashedShingleSet = [3, 4, 5, 6].into_iter().collect();
/// assert!((compute_jaccard_similarity(&a, &b) - 1.0 / 3.0).abs() < 1e-9);
/// ```
pub fn compute_jaccard_similarity(set_1: &HashedShingleSet, set_2: &HashedShingleSet) -> f64 {
    let intersection_len = set_1.intersection(set_2).count();
    let union_len = set_1.len() + set_2.len() - intersection_len;
    if union_len == 0 {
        return 0.0;
    }
    intersection_len as f64 / union_len as f64
}

pub fn compute_jaccard_distance(set_1: &HashedShingleSet, set_2: &HashedShingleSet) -> f64 {
    1.0 - compute_jaccard_similarity(set_1, set_2)
}

/// Calculates jaccard similarity between two minhashes as the fraction of
/// equal positions. Positions holding [`EMPTY_SLOT`] never match, so
/// signatures of empty sets are dissimilar to everything.
///
/// # Examples
///
/// ```
/// use similaritem::minhash::compute_minhash_similarity;
///
/// let m1 = [1, 2, 3, 4, 5, 6];
/// let m2 = [1, 2, 3, 7, 5, 8];
/// assert!((compute_minhash_similarity(&m1, &m2).unwrap() - 0.666).abs() < 0.01);
/// assert!(compute_minhash_similarity(&m1, &m2[..5]).is_err());
/// ```
pub fn compute_minhash_similarity(
    min_hashes_1: &[u32],
    min_hashes_2: &[u32],
) -> Result<f64, SimilarityError> {
    if min_hashes_1.len() != min_hashes_2.len() {
        return Err(SimilarityError::SignatureLengthMismatch {
            expected: min_hashes_1.len(),
            got: min_hashes_2.len(),
        });
    }
    let num_hashes = min_hashes_1.len();
    if num_hashes == 0 {
        return Ok(0.0);
    }
    let matches: u64 = min_hashes_1
        .iter()
        .zip(min_hashes_2.iter())
        .map(|(min_hash_1, min_hash_2)| (min_hash_1 == min_hash_2 && *min_hash_1 != EMPTY_SLOT) as u64)
        .sum();
    Ok((matches as f64) / (num_hashes as f64))
}

pub fn compute_minhash_distance(
    min_hashes_1: &[u32],
    min_hashes_2: &[u32],
) -> Result<f64, SimilarityError> {
    compute_minhash_similarity(min_hashes_1, min_hashes_2).map(|s| 1.0 - s)
}

/// Which side of the LSH S-curve to favor when choosing bands and rows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LshMode {
    /// Take the first decomposition whose threshold estimate falls below
    /// the target, so pairs near the threshold are not missed.
    #[default]
    FavorRecall,
    /// Take the decomposition with the most bands whose threshold estimate
    /// stays above the target.
    FavorPrecision,
}

impl fmt::Display for LshMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LshMode::FavorRecall => f.write_str("favor-recall"),
            LshMode::FavorPrecision => f.write_str("favor-precision"),
        }
    }
}

impl FromStr for LshMode {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.to_lowercase().as_str() {
            "favor-recall" | "recall" => Ok(LshMode::FavorRecall),
            "favor-precision" | "precision" => Ok(LshMode::FavorPrecision),
            _ => Err(format!(
                "Unsupported lsh mode [{}]. Supported modes [favor-recall, favor-precision].",
                input
            )),
        }
    }
}

/// Number of bands `b` and rows per band `r` of an LSH banding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LshParams {
    pub num_bands: usize,
    pub band_width: usize,
}

impl LshParams {
    pub fn new(num_bands: usize, band_width: usize) -> Self {
        LshParams { num_bands, band_width }
    }

    pub fn signature_size(&self) -> usize {
        self.num_bands * self.band_width
    }

    /// Similarity at the steepest point of the S-curve, `(1/b)^(1/r)`.
    pub fn threshold_estimate(&self) -> f64 {
        threshold_estimate(self.num_bands, self.band_width)
    }

    /// Probability that two sets with jaccard similarity `s` share at least
    /// one band, `1 - (1 - s^r)^b`.
    pub fn candidate_probability(&self, s: f64) -> f64 {
        1.0 - (1.0 - s.powf(self.band_width as f64)).powf(self.num_bands as f64)
    }
}

impl fmt::Display for LshParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bands = {}, rows_per_band = {}", self.num_bands, self.band_width)
    }
}

fn threshold_estimate(b: usize, r: usize) -> f64 {
    (1.0 / b as f64).powf(1.0 / r as f64)
}

/// Calculates number of bands `b` and band width `r` for a signature of
/// `signature_size` hashes and a target jaccard `threshold`.
/// For more info see 3.4.3 in http://infolab.stanford.edu/~ullman/mmds/ch3n.pdf
///
/// Candidates are scanned by increasing `b` starting at 2, and for each `b` by
/// increasing `r`; only exact factorizations `b * r == signature_size` count.
///
/// # Examples
///
/// ```
/// use similaritem::minhash::{calculate_lsh_params, LshMode};
///
/// let params = calculate_lsh_params(100, 0.8, LshMode::FavorRecall).unwrap();
/// assert_eq!((params.num_bands, params.band_width), (10, 10));
///
/// let params = calculate_lsh_params(100, 0.8, LshMode::FavorPrecision).unwrap();
/// assert_eq!((params.num_bands, params.band_width), (5, 20));
/// ```
pub fn calculate_lsh_params(
    signature_size: usize,
    threshold: f64,
    mode: LshMode,
) -> Result<LshParams, SimilarityError> {
    let mut selected = None;
    for b in 2..=signature_size {
        // for a fixed b only r = n / b can satisfy b * r == n
        if signature_size % b != 0 {
            continue;
        }
        let r = signature_size / b;
        let t = threshold_estimate(b, r);
        match mode {
            LshMode::FavorRecall => {
                if t < threshold {
                    selected = Some(LshParams::new(b, r));
                    break;
                }
            }
            LshMode::FavorPrecision => {
                if t > threshold {
                    selected = Some(LshParams::new(b, r));
                }
            }
        }
    }
    selected.ok_or(SimilarityError::InvalidBandDecomposition {
        signature_size,
        threshold,
        mode,
    })
}
