/*!
This library estimates pairwise textual similarity across a corpus of
documents with [MinHash](https://en.wikipedia.org/wiki/MinHash) signatures
and Locality Sensitive Hashing.

Each document is split into overlapping character shingles, the shingles are
hashed into `[0, 4294967291)`, every hashed set is compressed into a fixed
length signature, and LSH banding proposes candidate pairs that are verified
against a similarity threshold. Exact jaccard similarity and signature
agreement of every pair are reported alongside as a reference.

## Example

 ```
 use similaritem::config::SimilarityConfig;
 use similaritem::minhash::{hash_shingles, LshIndex, MinHasher};
 use similaritem::pipeline::{Document, SimilarityPipeline};
 use similaritem::text::ShingleExtractor;

 let corpus = [
     "This is the first document.",
     "This document is the second document.",
     "And this is the third document.",
     "This is the first document.",
 ];

 // building blocks
 let config = SimilarityConfig::default().with_shingle_size(5);
 let extractor = ShingleExtractor::new(config.shingle_size).unwrap();
 let min_hasher = MinHasher::new(config.signature_size);
 let mut index = LshIndex::new(config.lsh_params().unwrap());
 for (i, doc) in corpus.iter().enumerate() {
     let shingles = hash_shingles(&extractor.extract(doc.lines()));
     index.insert(i, &min_hasher.create_signature(shingles)).unwrap();
 }
 assert!(index.candidate_pairs().contains(&(0, 3)));

 // or the whole pipeline
 let documents: Vec<Document> = corpus
     .iter()
     .enumerate()
     .map(|(i, doc)| Document::from_text(format!("doc{}", i), doc))
     .collect();
 let report = SimilarityPipeline::new(config).unwrap().run(&documents).unwrap();
 assert_eq!(report.jaccard.len(), 6);
 ```

## References
[[1] Chapter 3, Mining of Massive Datasets](http://www.mmds.org)

 */

pub mod config;
pub mod error;
pub mod minhash;
pub mod pipeline;
pub mod similarity;
pub mod text;

pub use crate::config::SimilarityConfig;
pub use crate::error::SimilarityError;
pub use crate::pipeline::{
    Document, DocumentSource, ResultClass, ResultSink, SimilarityPipeline, SimilarityReport,
    StageTimings,
};
pub use crate::similarity::SimilarityScore;
