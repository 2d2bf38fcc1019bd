//! End-to-end similarity run over an in-memory corpus.
//!
//! Documents go through shingling, hashing and signature building once. From
//! there three result classes are produced: exact jaccard similarity of every
//! pair, signature agreement of every pair, and the LSH candidates whose
//! signature agreement reaches the configured threshold.

use ahash::AHashSet;
use fxhash::FxHashMap;
use rand::Rng;
use serde::Serialize;
use std::convert::Infallible;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, Level};

use crate::config::SimilarityConfig;
use crate::error::SimilarityError;
use crate::minhash::{HashedShingleSet, LshIndex, LshParams, MinHasher, Signature};
use crate::similarity::{all_pairs, check_signature_similarity, compare_sets_jaccard, SimilarityScore};
use crate::text::ShingleExtractor;

/// A named document, stored as its lines without terminators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub lines: Vec<String>,
}

impl Document {
    pub fn new(id: impl Into<String>, lines: Vec<String>) -> Self {
        Document { id: id.into(), lines }
    }

    /// Splits `text` on `\n` and `\r\n`.
    pub fn from_text(id: impl Into<String>, text: &str) -> Self {
        Document::new(id, text.lines().map(str::to_owned).collect())
    }
}

/// Supplies the corpus of a run.
pub trait DocumentSource {
    type Error;

    fn documents(&self) -> Result<Vec<Document>, Self::Error>;
}

impl DocumentSource for Vec<Document> {
    type Error = Infallible;

    fn documents(&self) -> Result<Vec<Document>, Infallible> {
        Ok(self.clone())
    }
}

/// The three collections a run reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultClass {
    /// Exact jaccard similarity of every pair.
    Jaccard,
    /// Signature agreement of every pair.
    Signature,
    /// LSH candidates verified against the threshold.
    Lsh,
}

impl ResultClass {
    pub const ALL: [ResultClass; 3] = [ResultClass::Jaccard, ResultClass::Signature, ResultClass::Lsh];

    pub fn title(&self) -> &'static str {
        match self {
            ResultClass::Jaccard => "Jaccard similarity",
            ResultClass::Signature => "Signature similarity",
            ResultClass::Lsh => "Similar documents (LSH)",
        }
    }
}

impl fmt::Display for ResultClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultClass::Jaccard => f.write_str("jaccard"),
            ResultClass::Signature => f.write_str("signature"),
            ResultClass::Lsh => f.write_str("lsh"),
        }
    }
}

/// Receives the scores of a report, class by class.
pub trait ResultSink {
    /// Called once per class before its scores, even when it has none.
    fn begin_class(&mut self, _class: ResultClass, _len: usize) {}

    fn accept(&mut self, class: ResultClass, score: &SimilarityScore<String>);
}

impl ResultSink for Vec<(ResultClass, SimilarityScore<String>)> {
    fn accept(&mut self, class: ResultClass, score: &SimilarityScore<String>) {
        self.push((class, score.clone()));
    }
}

/// Wall time spent in each stage of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StageTimings {
    pub shingling: Duration,
    pub hashing: Duration,
    pub jaccard: Duration,
    pub signatures: Duration,
    pub signature_comparison: Duration,
    pub lsh: Duration,
}

impl StageTimings {
    pub fn total(&self) -> Duration {
        self.shingling
            + self.hashing
            + self.jaccard
            + self.signatures
            + self.signature_comparison
            + self.lsh
    }

    /// Stage names paired with their durations, in execution order.
    pub fn stages(&self) -> [(&'static str, Duration); 6] {
        [
            ("shingling", self.shingling),
            ("hashing", self.hashing),
            ("jaccard", self.jaccard),
            ("signatures", self.signatures),
            ("signature comparison", self.signature_comparison),
            ("lsh", self.lsh),
        ]
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityReport {
    pub config: SimilarityConfig,
    pub lsh_params: LshParams,
    pub jaccard: Vec<SimilarityScore<String>>,
    pub signature: Vec<SimilarityScore<String>>,
    pub similar: Vec<SimilarityScore<String>>,
    /// Pairs proposed by banding before verification.
    pub num_candidates: usize,
    pub timings: StageTimings,
}

impl SimilarityReport {
    pub fn scores(&self, class: ResultClass) -> &[SimilarityScore<String>] {
        match class {
            ResultClass::Jaccard => &self.jaccard,
            ResultClass::Signature => &self.signature,
            ResultClass::Lsh => &self.similar,
        }
    }

    /// Feeds every class to `sink` in [`ResultClass::ALL`] order.
    pub fn emit<S: ResultSink + ?Sized>(&self, sink: &mut S) {
        for class in ResultClass::ALL {
            let scores = self.scores(class);
            sink.begin_class(class, scores.len());
            for score in scores {
                sink.accept(class, score);
            }
        }
    }
}

/// Runs shingling, MinHash and LSH over a corpus with one fixed
/// hash-function family.
///
/// ```
/// use similaritem::config::SimilarityConfig;
/// use similaritem::pipeline::{Document, SimilarityPipeline};
///
/// let pipeline = SimilarityPipeline::new(SimilarityConfig::default()).unwrap();
/// let documents = vec![
///     Document::from_text("a", "the quick brown fox jumps over the lazy dog"),
///     Document::from_text("b", "the quick brown fox jumps over the lazy dog"),
///     Document::from_text("c", "an entirely unrelated sentence about rust"),
/// ];
/// let report = pipeline.run(&documents).unwrap();
/// assert_eq!(report.jaccard.len(), 3);
/// assert_eq!(report.similar.len(), 1);
/// assert_eq!((report.similar[0].a.as_str(), report.similar[0].b.as_str()), ("a", "b"));
/// ```
#[derive(Debug, Clone)]
pub struct SimilarityPipeline {
    config: SimilarityConfig,
    extractor: ShingleExtractor,
    min_hasher: MinHasher,
    lsh_params: LshParams,
}

impl SimilarityPipeline {
    /// Validates `config` and generates the hash-function family from its seed.
    pub fn new(config: SimilarityConfig) -> Result<Self, SimilarityError> {
        config.validate()?;
        let min_hasher =
            MinHasher::new_with_seed(config.signature_size, config.coefficient_range, config.seed)?;
        Self::assemble(config, min_hasher)
    }

    /// Like [`SimilarityPipeline::new`] but draws the family from `rng`;
    /// `config.seed` is ignored.
    pub fn with_rng<R: Rng + ?Sized>(config: SimilarityConfig, rng: &mut R) -> Result<Self, SimilarityError> {
        config.validate()?;
        let min_hasher = MinHasher::from_rng(config.signature_size, config.coefficient_range, rng)?;
        Self::assemble(config, min_hasher)
    }

    fn assemble(config: SimilarityConfig, min_hasher: MinHasher) -> Result<Self, SimilarityError> {
        let lsh_params = config.lsh_params()?;
        let extractor = ShingleExtractor::new(config.shingle_size)?;
        debug!(
            signature_size = config.signature_size,
            threshold = config.threshold,
            lsh_mode = %config.lsh_mode,
            lsh_params = %lsh_params,
            threshold_estimate = lsh_params.threshold_estimate(),
            "lsh_params_selected"
        );
        Ok(SimilarityPipeline {
            config,
            extractor,
            min_hasher,
            lsh_params,
        })
    }

    pub fn config(&self) -> &SimilarityConfig {
        &self.config
    }

    pub fn min_hasher(&self) -> &MinHasher {
        &self.min_hasher
    }

    pub fn lsh_params(&self) -> LshParams {
        self.lsh_params
    }

    pub fn run(&self, documents: &[Document]) -> Result<SimilarityReport, SimilarityError> {
        let span = tracing::span!(
            Level::INFO,
            "similaritem.run",
            documents = documents.len(),
            shingle_size = self.config.shingle_size,
            signature_size = self.config.signature_size,
            threshold = self.config.threshold
        );
        let _guard = span.enter();

        let mut seen = AHashSet::with_capacity(documents.len());
        for document in documents {
            if !seen.insert(document.id.as_str()) {
                return Err(SimilarityError::DuplicateDocument {
                    id: document.id.clone(),
                });
            }
        }

        let mut timings = StageTimings::default();

        let start = Instant::now();
        let shingle_sets: Vec<_> = documents
            .iter()
            .map(|document| self.extractor.extract(&document.lines))
            .collect();
        timings.shingling = start.elapsed();
        debug!(
            total_shingles = shingle_sets.iter().map(|s| s.len()).sum::<usize>(),
            empty_documents = shingle_sets.iter().filter(|s| s.is_empty()).count(),
            elapsed_micros = timings.shingling.as_micros(),
            "shingling_done"
        );

        let start = Instant::now();
        let modulus = self.config.modulus();
        let hashed: Vec<(String, HashedShingleSet)> = documents
            .iter()
            .zip(shingle_sets.iter())
            .map(|(document, shingles)| {
                (document.id.clone(), self.config.hasher.hash_shingles(shingles, modulus))
            })
            .collect();
        timings.hashing = start.elapsed();
        debug!(
            hasher = %self.config.hasher,
            elapsed_micros = timings.hashing.as_micros(),
            "hashing_done"
        );

        let start = Instant::now();
        let jaccard = compare_sets_jaccard(&hashed);
        timings.jaccard = start.elapsed();
        debug!(pairs = jaccard.len(), elapsed_micros = timings.jaccard.as_micros(), "jaccard_done");

        let start = Instant::now();
        let signatures: Vec<(String, Signature)> = hashed
            .iter()
            .map(|(id, set)| (id.clone(), self.min_hasher.create_signature(set.iter().copied())))
            .collect();
        let signature_map: FxHashMap<String, Signature> = signatures.iter().cloned().collect();
        timings.signatures = start.elapsed();
        debug!(
            signatures = signatures.len(),
            elapsed_micros = timings.signatures.as_micros(),
            "signatures_done"
        );

        let start = Instant::now();
        let ids: Vec<String> = documents.iter().map(|document| document.id.clone()).collect();
        let signature = check_signature_similarity(&all_pairs(&ids), &signature_map, 0.0)?;
        timings.signature_comparison = start.elapsed();
        debug!(
            pairs = signature.len(),
            elapsed_micros = timings.signature_comparison.as_micros(),
            "signature_comparison_done"
        );

        let start = Instant::now();
        let mut index = LshIndex::new(self.lsh_params);
        for (id, signature) in signatures {
            index.insert(id, &signature)?;
        }
        let candidates = index.candidate_pairs();
        let similar = check_signature_similarity(&candidates, &signature_map, self.config.threshold)?;
        timings.lsh = start.elapsed();
        debug!(
            buckets = index.num_buckets(),
            candidates = candidates.len(),
            similar = similar.len(),
            elapsed_micros = timings.lsh.as_micros(),
            "lsh_done"
        );

        info!(
            documents = documents.len(),
            candidates = candidates.len(),
            similar = similar.len(),
            elapsed_micros = timings.total().as_micros(),
            "run_complete"
        );

        Ok(SimilarityReport {
            config: self.config.clone(),
            lsh_params: self.lsh_params,
            jaccard,
            signature,
            similar,
            num_candidates: candidates.len(),
            timings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::minhash::{CoefficientRange, LshMode};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    static FIFTY_CHARS: &'static str = "abcdefghijklmnopqrstuvwxyz0123456789ABCDEFGHIJKLMN";

    fn pair(score: &SimilarityScore<String>) -> (&str, &str) {
        (score.a.as_str(), score.b.as_str())
    }

    fn pipeline() -> SimilarityPipeline {
        SimilarityPipeline::new(SimilarityConfig::default()).unwrap()
    }

    #[test]
    fn test_identical_documents() {
        assert_eq!(FIFTY_CHARS.chars().count(), 50);
        let documents = vec![
            Document::from_text("doc1", FIFTY_CHARS),
            Document::from_text("doc2", FIFTY_CHARS),
        ];
        let report = pipeline().run(&documents).unwrap();

        assert_eq!(report.jaccard, vec![SimilarityScore::new("doc1".to_string(), "doc2".to_string(), 1.0)]);
        assert_eq!(report.signature.len(), 1);
        assert_eq!(report.signature[0].score, 1.0);
        assert_eq!(report.num_candidates, 1);
        assert_eq!(report.similar.len(), 1);
        assert_eq!(pair(&report.similar[0]), ("doc1", "doc2"));
        assert_eq!(report.similar[0].score, 1.0);
    }

    #[test]
    fn test_disjoint_documents() {
        let documents = vec![
            Document::from_text("doc1", &"a".repeat(20)),
            Document::from_text("doc2", &"b".repeat(20)),
        ];
        let report = pipeline().run(&documents).unwrap();
        assert_eq!(report.jaccard[0].score, 0.0);
        assert_eq!(report.signature[0].score, 0.0);
        assert!(report.similar.is_empty());
    }

    #[test]
    fn test_empty_and_single_corpus() {
        let report = pipeline().run(&[]).unwrap();
        assert!(report.jaccard.is_empty());
        assert!(report.signature.is_empty());
        assert!(report.similar.is_empty());
        assert_eq!(report.num_candidates, 0);

        let report = pipeline().run(&[Document::from_text("only", FIFTY_CHARS)]).unwrap();
        assert!(report.jaccard.is_empty());
        assert!(report.signature.is_empty());
        assert!(report.similar.is_empty());
    }

    #[test]
    fn test_documents_shorter_than_shingle() {
        let documents = vec![
            Document::from_text("short1", "abc"),
            Document::from_text("short2", "abc"),
            Document::new("blank", vec![]),
        ];
        let report = pipeline().run(&documents).unwrap();
        assert_eq!(report.jaccard.len(), 3);
        assert!(report.jaccard.iter().all(|s| s.score == 0.0));
        assert!(report.signature.iter().all(|s| s.score == 0.0));
        assert_eq!(report.num_candidates, 0);
        assert!(report.similar.is_empty());
    }

    #[test]
    fn test_multiline_document_matches_joined() {
        let lines = Document::new(
            "lines",
            vec!["the quick brown".to_string(), "fox jumps over".to_string(), "the lazy dog".to_string()],
        );
        let joined = Document::from_text("joined", "the quick brown fox jumps over the lazy dog");
        let report = pipeline().run(&[lines, joined]).unwrap();
        assert_eq!(report.jaccard[0].score, 1.0);
        assert_eq!(report.similar.len(), 1);
    }

    #[test]
    fn test_similar_is_verified_subset() {
        let base = "Locality sensitive hashing finds similar documents without comparing every pair. ";
        let documents = vec![
            Document::from_text("a", &base.repeat(3)),
            Document::from_text("b", &format!("{}{}", base.repeat(3), "Plus a short tail.")),
            Document::from_text("c", "MinHash signatures estimate jaccard similarity of shingle sets."),
            Document::from_text("d", &base.repeat(3)),
        ];
        let config = SimilarityConfig::default().with_shingle_size(5);
        let report = SimilarityPipeline::new(config).unwrap().run(&documents).unwrap();

        assert_eq!(report.jaccard.len(), 6);
        assert_eq!(report.signature.len(), 6);
        assert!(report.similar.len() <= report.num_candidates);
        for score in &report.similar {
            assert!(score.score >= 0.8);
            assert!(report.signature.contains(score));
        }
        assert!(report.similar.iter().any(|s| pair(s) == ("a", "d")));
        let ordered: Vec<_> = report.jaccard.iter().map(pair).collect();
        assert_eq!(ordered, vec![("a", "b"), ("a", "c"), ("a", "d"), ("b", "c"), ("b", "d"), ("c", "d")]);
    }

    #[test]
    fn test_runs_are_deterministic() {
        let documents = vec![
            Document::from_text("x", "shingles of the first document"),
            Document::from_text("y", "shingles of the second document"),
        ];
        let first = pipeline().run(&documents).unwrap();
        let second = pipeline().run(&documents).unwrap();
        assert_eq!(first.jaccard, second.jaccard);
        assert_eq!(first.signature, second.signature);
        assert_eq!(first.similar, second.similar);
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let documents = vec![
            Document::from_text("same", "first"),
            Document::from_text("same", "second"),
        ];
        assert_eq!(
            pipeline().run(&documents).unwrap_err(),
            SimilarityError::DuplicateDocument { id: "same".to_string() }
        );
    }

    #[test]
    fn test_invalid_configs() {
        assert_eq!(
            SimilarityPipeline::new(SimilarityConfig::default().with_threshold(0.0)).unwrap_err(),
            SimilarityError::InvalidThreshold { threshold: 0.0 }
        );
        assert!(matches!(
            SimilarityPipeline::new(SimilarityConfig::default().with_signature_size(1)),
            Err(SimilarityError::InvalidBandDecomposition { .. })
        ));
    }

    #[test]
    fn test_with_rng() {
        let config = SimilarityConfig::default()
            .with_coefficient_range(CoefficientRange::full())
            .with_lsh_mode(LshMode::FavorPrecision);
        let mut rng = StdRng::seed_from_u64(3);
        let pipeline = SimilarityPipeline::with_rng(config, &mut rng).unwrap();
        assert_eq!(pipeline.min_hasher().num_hashes(), 100);
        assert_eq!(pipeline.lsh_params(), LshParams::new(5, 20));
        assert!(pipeline
            .min_hasher()
            .hash_functions()
            .iter()
            .all(|h| h.a() >= 1 && h.b() >= 1));
    }

    #[test]
    fn test_emit_and_source() {
        let documents = vec![
            Document::from_text("doc1", FIFTY_CHARS),
            Document::from_text("doc2", FIFTY_CHARS),
            Document::from_text("doc3", &"z".repeat(30)),
        ];
        let report = pipeline().run(&documents.documents().unwrap()).unwrap();
        let mut sink: Vec<(ResultClass, SimilarityScore<String>)> = Vec::new();
        report.emit(&mut sink);

        let classes: Vec<ResultClass> = sink.iter().map(|(class, _)| *class).collect();
        assert_eq!(classes.iter().filter(|c| **c == ResultClass::Jaccard).count(), 3);
        assert_eq!(classes.iter().filter(|c| **c == ResultClass::Signature).count(), 3);
        assert_eq!(classes.last(), Some(&ResultClass::Lsh));
        assert_eq!(pair(&sink.last().unwrap().1), ("doc1", "doc2"));
        assert!(report.timings.total() >= report.timings.lsh);
    }

    #[test]
    fn test_report_serializes() {
        let documents = vec![Document::from_text("a", "hello world"), Document::from_text("b", "hello there")];
        let report = pipeline().run(&documents).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["lsh_params"]["num_bands"], 10);
        assert_eq!(json["jaccard"][0]["a"], "a");
        assert_eq!(json["config"]["lsh_mode"], "favor-recall");
        assert!(json["timings"]["shingling"].is_object());
    }
}
