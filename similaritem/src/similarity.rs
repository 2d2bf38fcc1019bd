//! Pairwise scoring over a corpus.
//!
//! Exact jaccard similarity is computed over hashed shingle sets; signature
//! agreement is computed over MinHash signatures and doubles as the verifier
//! for LSH candidates.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::{BuildHasher, Hash};

use crate::error::SimilarityError;
use crate::minhash::{compute_jaccard_similarity, HashedShingleSet, Signature};

/// Similarity of two documents, in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityScore<Id> {
    pub a: Id,
    pub b: Id,
    pub score: f64,
}

impl<Id> SimilarityScore<Id> {
    pub fn new(a: Id, b: Id, score: f64) -> Self {
        SimilarityScore { a, b, score }
    }
}

/// Every unordered pair `(ids[i], ids[j])` with `i < j`, in input order.
///
/// ```
/// use similaritem::similarity::all_pairs;
///
/// assert_eq!(all_pairs(&["a", "b", "c"]), vec![("a", "b"), ("a", "c"), ("b", "c")]);
/// assert!(all_pairs(&["only"]).is_empty());
/// ```
pub fn all_pairs<Id: Clone>(ids: &[Id]) -> Vec<(Id, Id)> {
    ids.iter().cloned().tuple_combinations().collect()
}

/// Exact jaccard similarity of every pair of documents.
pub fn compare_sets_jaccard<Id: Clone>(documents: &[(Id, HashedShingleSet)]) -> Vec<SimilarityScore<Id>> {
    documents
        .iter()
        .tuple_combinations()
        .map(|((id_a, set_a), (id_b, set_b))| {
            SimilarityScore::new(id_a.clone(), id_b.clone(), compute_jaccard_similarity(set_a, set_b))
        })
        .collect()
}

/// Scores each pair by signature agreement and keeps the pairs scoring at
/// least `threshold`. A threshold of 0 keeps every pair.
///
/// ```
/// use std::collections::HashMap;
/// use similaritem::minhash::Signature;
/// use similaritem::similarity::check_signature_similarity;
///
/// let mut signatures = HashMap::new();
/// signatures.insert("a", Signature::from(vec![1, 2, 3, 4]));
/// signatures.insert("b", Signature::from(vec![1, 2, 3, 5]));
/// signatures.insert("c", Signature::from(vec![6, 7, 8, 9]));
/// let pairs = [("a", "b"), ("a", "c")];
///
/// let all = check_signature_similarity(&pairs, &signatures, 0.0).unwrap();
/// assert_eq!(all.len(), 2);
/// let similar = check_signature_similarity(&pairs, &signatures, 0.7).unwrap();
/// assert_eq!(similar.len(), 1);
/// assert_eq!(similar[0].score, 0.75);
/// ```
pub fn check_signature_similarity<Id, S>(
    pairs: &[(Id, Id)],
    signatures: &HashMap<Id, Signature, S>,
    threshold: f64,
) -> Result<Vec<SimilarityScore<Id>>, SimilarityError>
where
    Id: Hash + Eq + Clone + Display,
    S: BuildHasher,
{
    let lookup = |id: &Id| {
        signatures
            .get(id)
            .ok_or_else(|| SimilarityError::UnknownDocument { id: id.to_string() })
    };
    let mut similar = Vec::new();
    for (id_a, id_b) in pairs {
        let score = lookup(id_a)?.similarity(lookup(id_b)?)?;
        if score >= threshold {
            similar.push(SimilarityScore::new(id_a.clone(), id_b.clone(), score));
        }
    }
    Ok(similar)
}
