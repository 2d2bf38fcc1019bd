//! Run configuration.
//!
//! A [`SimilarityConfig`] fully determines the output of a pipeline run for a
//! given corpus: two runs with equal configs produce identical reports apart
//! from timings.

use serde::{Deserialize, Serialize};

use crate::error::SimilarityError;
use crate::minhash::{
    calculate_lsh_params, CoefficientRange, LshMode, LshParams, ShingleHasher, DEFAULT_SEED,
    LARGEST_32_BIT_PRIME,
};

/// Parameters of a similarity run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Characters per shingle.
    pub shingle_size: usize,
    /// Jaccard similarity above which two documents count as similar.
    /// Drives both the band/row search and candidate verification.
    pub threshold: f64,
    /// Number of MinHash functions, which is also the signature length.
    pub signature_size: usize,
    pub lsh_mode: LshMode,
    /// Inclusive range the affine coefficients `a` and `b` are drawn from.
    pub coefficient_range: CoefficientRange,
    /// Seed of the random source generating the hash-function family.
    ///
    /// Equal seeds and ranges give bit-identical families.
    pub seed: u64,
    pub hasher: ShingleHasher,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            shingle_size: 9,
            threshold: 0.8,
            signature_size: 100,
            lsh_mode: LshMode::FavorRecall,
            coefficient_range: CoefficientRange::default(),
            seed: DEFAULT_SEED,
            hasher: ShingleHasher::Sea,
        }
    }
}

impl SimilarityConfig {
    pub fn with_shingle_size(mut self, shingle_size: usize) -> Self {
        self.shingle_size = shingle_size;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_signature_size(mut self, signature_size: usize) -> Self {
        self.signature_size = signature_size;
        self
    }

    pub fn with_lsh_mode(mut self, lsh_mode: LshMode) -> Self {
        self.lsh_mode = lsh_mode;
        self
    }

    pub fn with_coefficient_range(mut self, coefficient_range: CoefficientRange) -> Self {
        self.coefficient_range = coefficient_range;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_hasher(mut self, hasher: ShingleHasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// Modulus shared by the shingle hasher and the affine hash family.
    pub fn modulus(&self) -> u32 {
        LARGEST_32_BIT_PRIME
    }

    /// Checks every field independently of the band/row search.
    pub fn validate(&self) -> Result<(), SimilarityError> {
        if self.shingle_size < 1 {
            return Err(SimilarityError::InvalidShingleSize {
                shingle_size: self.shingle_size,
            });
        }
        // NaN fails both comparisons
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(SimilarityError::InvalidThreshold {
                threshold: self.threshold,
            });
        }
        if self.signature_size < 1 {
            return Err(SimilarityError::InvalidSignatureSize {
                signature_size: self.signature_size,
            });
        }
        self.coefficient_range.validate(self.modulus())
    }

    /// Band/row decomposition of the signature for this threshold and mode.
    pub fn lsh_params(&self) -> Result<LshParams, SimilarityError> {
        calculate_lsh_params(self.signature_size, self.threshold, self.lsh_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::SimilarityConfig;
    use crate::error::SimilarityError;
    use crate::minhash::{CoefficientRange, LshMode, LshParams, ShingleHasher};

    #[test]
    fn test_defaults() {
        let config = SimilarityConfig::default();
        assert_eq!(config.shingle_size, 9);
        assert_eq!(config.threshold, 0.8);
        assert_eq!(config.signature_size, 100);
        assert_eq!(config.lsh_mode, LshMode::FavorRecall);
        assert_eq!(config.coefficient_range, CoefficientRange::new(1, 100));
        assert_eq!(config.seed, 1786);
        assert_eq!(config.hasher, ShingleHasher::Sea);
        assert_eq!(config.modulus(), 4_294_967_291);
        assert!(config.validate().is_ok());
        assert_eq!(config.lsh_params(), Ok(LshParams::new(10, 10)));
    }

    #[test]
    fn test_builders() {
        let config = SimilarityConfig::default()
            .with_shingle_size(5)
            .with_threshold(0.8)
            .with_lsh_mode(LshMode::FavorPrecision)
            .with_seed(7)
            .with_hasher(ShingleHasher::Fnv);
        assert_eq!(config.shingle_size, 5);
        assert_eq!(config.seed, 7);
        assert_eq!(config.hasher, ShingleHasher::Fnv);
        assert_eq!(config.lsh_params(), Ok(LshParams::new(5, 20)));
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        assert_eq!(
            SimilarityConfig::default().with_shingle_size(0).validate(),
            Err(SimilarityError::InvalidShingleSize { shingle_size: 0 })
        );
        for threshold in [0.0, -0.5, 1.5] {
            assert_eq!(
                SimilarityConfig::default().with_threshold(threshold).validate(),
                Err(SimilarityError::InvalidThreshold { threshold })
            );
        }
        assert!(SimilarityConfig::default().with_threshold(f64::NAN).validate().is_err());
        assert!(SimilarityConfig::default().with_threshold(1.0).validate().is_ok());
        assert_eq!(
            SimilarityConfig::default().with_signature_size(0).validate(),
            Err(SimilarityError::InvalidSignatureSize { signature_size: 0 })
        );
        assert!(SimilarityConfig::default()
            .with_coefficient_range(CoefficientRange { low: 0, high: 10 })
            .validate()
            .is_err());
    }

    #[test]
    fn test_single_hash_has_no_decomposition() {
        let config = SimilarityConfig::default().with_signature_size(1);
        assert!(config.validate().is_ok());
        assert!(matches!(
            config.lsh_params(),
            Err(SimilarityError::InvalidBandDecomposition { signature_size: 1, .. })
        ));
    }

    #[test]
    fn test_serde() {
        let config = SimilarityConfig::default().with_lsh_mode(LshMode::FavorPrecision);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"favor-precision\""));
        assert!(json.contains("\"sea\""));
        let parsed: SimilarityConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);

        let partial: SimilarityConfig =
            serde_json::from_str(r#"{"shingle_size": 4, "hasher": "sip"}"#).unwrap();
        assert_eq!(partial.shingle_size, 4);
        assert_eq!(partial.hasher, ShingleHasher::Sip);
        assert_eq!(partial.signature_size, 100);
    }
}
