use ahash::AHashSet;
use itertools::Itertools;
use seahash::SeaHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, Hash, Hasher};
use std::ops::Range;

use crate::error::SimilarityError;
use crate::minhash::{LshParams, Signature};

/// BandKey contains the hash of the band.
/// Using the hash of the band instead of the whole band slice will not decrease
/// recall. Banding provides candidates, which then are compared using the full
/// signature similarity.
#[derive(PartialEq, Eq)]
struct BandKey {
    hash: u64,
}

impl BandKey {
    /// Order-sensitive SeaHash of the band values, stable across runs.
    #[inline]
    fn new(band: &[u32]) -> Self {
        let mut hasher = SeaHasher::new();
        for value in band {
            hasher.write_u32(*value);
        }
        BandKey {
            hash: hasher.finish(),
        }
    }
}

impl Hash for BandKey {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash)
    }
}

/// Because we hash the band slice in the BandKey we don't need
/// to hash the hash in the hashmap.
#[derive(Default)]
struct NoOpHasher {
    hash: u64,
}

impl Hasher for NoOpHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.hash
    }

    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.hash = self.hash.rotate_left(8) ^ *byte as u64;
        }
    }

    #[inline]
    fn write_u64(&mut self, h: u64) {
        // h is the BandKey.hash
        self.hash = h;
    }
}

#[derive(Clone, Copy, Default)]
struct NoOpHashBuilder;

impl BuildHasher for NoOpHashBuilder {
    type Hasher = NoOpHasher;

    #[inline]
    fn build_hasher(&self) -> Self::Hasher {
        NoOpHasher::default()
    }
}

/// Bucket table of a single band. Buckets hold insertion positions.
struct MinHashBand {
    hash_table: HashMap<BandKey, Vec<usize>, NoOpHashBuilder>,
    range: Range<usize>,
}

impl MinHashBand {
    fn new(range: Range<usize>) -> Self {
        MinHashBand {
            hash_table: HashMap::with_hasher(NoOpHashBuilder),
            range,
        }
    }

    #[inline]
    fn band_key(&self, signature: &Signature) -> BandKey {
        BandKey::new(&signature.values()[self.range.clone()])
    }

    #[inline]
    fn insert(&mut self, position: usize, signature: &Signature) {
        let band_key = self.band_key(signature);
        self.hash_table.entry(band_key).or_default().push(position);
    }

    #[inline]
    fn query(&self, signature: &Signature, match_positions: &mut AHashSet<usize>) {
        if let Some(positions) = self.hash_table.get(&self.band_key(signature)) {
            match_positions.extend(positions.iter().copied());
        }
    }

    /// Adds every pair of positions sharing a bucket. Positions in a bucket
    /// are increasing, so each pair comes out as (earlier, later).
    fn collect_pairs(&self, pairs: &mut AHashSet<(usize, usize)>) {
        for positions in self.hash_table.values().filter(|positions| positions.len() > 1) {
            pairs.extend(positions.iter().copied().tuple_combinations::<(usize, usize)>());
        }
    }

    fn num_buckets(&self) -> usize {
        self.hash_table.len()
    }
}

/// Data Structure to index minhashes into bands.
///
/// Reference: [Chapter 3, Mining of Massive Datasets](http://www.mmds.org)
///
/// Every signature is split into `num_bands` contiguous bands of `band_width`
/// values; each band has its own bucket table keyed by the band hash.
/// [`LshIndex::candidate_pairs`] lists every pair of documents that share a
/// bucket in at least one band. Candidates still have to be verified with the
/// full signature similarity.
///
/// Signatures of empty shingle sets are counted but never bucketed: they can
/// not be similar to anything.
///
/// # Examples
///
/// ```
/// use similaritem::minhash::{LshIndex, LshParams, Signature};
///
/// let mut index = LshIndex::new(LshParams::new(4, 2));
/// index.insert("a", &Signature::from(vec![1, 1, 1, 1, 1, 1, 1, 1])).unwrap();
/// index.insert("b", &Signature::from(vec![1, 1, 2, 2, 3, 3, 4, 4])).unwrap();
/// index.insert("c", &Signature::from(vec![5, 5, 6, 6, 7, 7, 8, 8])).unwrap();
/// assert_eq!(index.candidate_pairs(), vec![("a", "b")]);
/// ```
pub struct LshIndex<Id> {
    bands: Vec<MinHashBand>,
    ids: Vec<Id>,
    params: LshParams,
}

impl<Id> fmt::Display for LshIndex<Id> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LshIndex {{ num_hashes = {}, bands = {}, rows_per_band = {}, size = {} }}",
            self.params.signature_size(),
            self.params.num_bands,
            self.params.band_width,
            self.ids.len()
        )
    }
}

impl<Id> LshIndex<Id>
where
    Id: Clone,
{
    pub fn new(params: LshParams) -> Self {
        let bands = (0..params.num_bands)
            .map(|i| MinHashBand::new(i * params.band_width..(i + 1) * params.band_width))
            .collect();
        LshIndex {
            bands,
            ids: Vec::new(),
            params,
        }
    }

    pub fn params(&self) -> LshParams {
        self.params
    }

    pub fn size(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Total number of buckets over all bands.
    pub fn num_buckets(&self) -> usize {
        self.bands.iter().map(MinHashBand::num_buckets).sum()
    }

    pub fn insert(&mut self, id: Id, signature: &Signature) -> Result<(), SimilarityError> {
        self.check_len(signature)?;
        let position = self.ids.len();
        self.ids.push(id);
        if signature.is_empty_set() {
            return Ok(());
        }
        for band in &mut self.bands {
            band.insert(position, signature);
        }
        Ok(())
    }

    /// Returns the ids that share at least one band bucket with
    /// `query_signature`, in insertion order. No similarity filtering is done.
    pub fn query(&self, query_signature: &Signature) -> Result<Vec<&Id>, SimilarityError> {
        self.check_len(query_signature)?;
        if query_signature.is_empty_set() {
            return Ok(Vec::new());
        }
        let mut match_positions = AHashSet::with_capacity(10);
        for band in &self.bands {
            band.query(query_signature, &mut match_positions);
        }
        Ok(match_positions
            .into_iter()
            .sorted()
            .map(|position| &self.ids[position])
            .collect())
    }

    /// All distinct candidate pairs, each reported once as
    /// (earlier inserted, later inserted), ordered by insertion position.
    pub fn candidate_pairs(&self) -> Vec<(Id, Id)> {
        let mut pairs = AHashSet::new();
        for band in &self.bands {
            band.collect_pairs(&mut pairs);
        }
        pairs
            .into_iter()
            .sorted()
            .map(|(a, b)| (self.ids[a].clone(), self.ids[b].clone()))
            .collect()
    }

    fn check_len(&self, signature: &Signature) -> Result<(), SimilarityError> {
        if signature.len() != self.params.signature_size() {
            return Err(SimilarityError::SignatureLengthMismatch {
                expected: self.params.signature_size(),
                got: signature.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::LshIndex;
    use crate::error::SimilarityError;
    use crate::minhash::{
        calculate_lsh_params, hash_shingles, LshMode, LshParams, MinHasher, Signature, EMPTY_SLOT,
    };
    use crate::text::shingle_text;
    use std::collections::HashSet;

    static S1: &'static str = "local sensitive hashing is cool";
    static S2: &'static str = "local sensitive hashing is great";
    static S3: &'static str = "local sensitive hashing is awesome";
    static S4: &'static str = "we all scream for ice cream";
    static S5: &'static str = "we all scream for ice cream sandwich";
    static S6: &'static str = "i like ice cream sandwich";

    fn sig(values: Vec<u32>) -> Signature {
        Signature::from(values)
    }

    fn build_index() -> LshIndex<u32> {
        let mut lsh_index = LshIndex::new(LshParams::new(4, 2));
        lsh_index.insert(1, &sig(vec![1, 1,  1, 1,  1, 1,  1, 1])).unwrap();
        lsh_index.insert(2, &sig(vec![1, 1,  1, 1,  1, 1,  1, 1])).unwrap();

        lsh_index.insert(3, &sig(vec![1, 1,  1, 1,  1, 1,  2, 2])).unwrap();
        lsh_index.insert(4, &sig(vec![1, 1,  1, 1,  1, 1,  2, 3])).unwrap();

        lsh_index.insert(5, &sig(vec![2, 2,  2, 3,  3, 3,  4, 4])).unwrap();

        lsh_index.insert(6, &sig(vec![3, 3,  3, 4,  4, 4,  5, 5])).unwrap();
        lsh_index.insert(7, &sig(vec![3, 3,  3, 4,  4, 4,  5, 6])).unwrap();
        lsh_index
    }

    #[test]
    pub fn test_candidate_pairs() {
        let lsh_index = build_index();
        assert_eq!(lsh_index.size(), 7);
        assert_eq!(
            lsh_index.candidate_pairs(),
            vec![(1, 2), (1, 3), (1, 4), (2, 3), (2, 4), (3, 4), (6, 7)]
        );
    }

    #[test]
    pub fn test_candidates_are_unique_and_ordered() {
        let lsh_index = build_index();
        let pairs = lsh_index.candidate_pairs();
        let unique: HashSet<(u32, u32)> = pairs.iter().copied().collect();
        assert_eq!(unique.len(), pairs.len());
        for (a, b) in pairs.iter() {
            assert!(a < b);
            assert!(!unique.contains(&(*b, *a)));
        }
    }

    #[test]
    pub fn test_query() {
        let lsh_index = build_index();
        let res = lsh_index.query(&sig(vec![1, 1,  1, 1,  1, 1,  1, 1])).unwrap();
        assert_eq!(res, vec![&1, &2, &3, &4]);

        let res = lsh_index.query(&sig(vec![2, 2,  2, 3,  3, 3,  4, 4])).unwrap();
        assert_eq!(res, vec![&5]);

        let res = lsh_index.query(&sig(vec![9, 9,  9, 9,  9, 9,  5, 6])).unwrap();
        assert_eq!(res, vec![&7]);

        let res = lsh_index.query(&sig(vec![9, 9,  9, 9,  9, 9,  9, 9])).unwrap();
        assert!(res.is_empty());
    }

    #[test]
    pub fn test_signature_length_is_checked() {
        let mut lsh_index: LshIndex<u32> = LshIndex::new(LshParams::new(4, 2));
        assert_eq!(
            lsh_index.insert(1, &sig(vec![1, 2, 3])),
            Err(SimilarityError::SignatureLengthMismatch { expected: 8, got: 3 })
        );
        assert!(lsh_index.is_empty());
        assert!(lsh_index.query(&sig(vec![1; 9])).is_err());
    }

    #[test]
    pub fn test_empty_set_signatures_are_not_bucketed() {
        let mut lsh_index = LshIndex::new(LshParams::new(4, 2));
        lsh_index.insert("empty-1", &sig(vec![EMPTY_SLOT; 8])).unwrap();
        lsh_index.insert("empty-2", &sig(vec![EMPTY_SLOT; 8])).unwrap();
        assert_eq!(lsh_index.size(), 2);
        assert_eq!(lsh_index.num_buckets(), 0);
        assert!(lsh_index.candidate_pairs().is_empty());
        assert!(lsh_index.query(&sig(vec![EMPTY_SLOT; 8])).unwrap().is_empty());
    }

    #[test]
    pub fn test_lsh_index() {
        let params = calculate_lsh_params(200, 0.5, LshMode::FavorRecall).unwrap();
        let min_hash = MinHasher::new(params.signature_size());
        let signature = |text: &str| min_hash.create_signature(hash_shingles(&shingle_text(text, 3)));
        let mut lsh_index = LshIndex::new(params);
        for (id, text) in [(1, S1), (2, S2), (3, S3), (4, S4), (5, S5), (6, S6)] {
            lsh_index.insert(id, &signature(text)).unwrap();
        }
        println!("{}", lsh_index);
        assert_eq!(lsh_index.size(), 6);

        let pairs = lsh_index.candidate_pairs();
        assert!(pairs.contains(&(1, 2)));
        assert!(pairs.contains(&(2, 3)));
        assert!(pairs.contains(&(4, 5)));

        let ret = lsh_index.query(&signature(S2)).unwrap();
        assert!(ret.contains(&&1));
        assert!(ret.contains(&&2));
        assert!(ret.contains(&&3));
    }

    #[test]
    pub fn test_display() {
        let lsh_index = build_index();
        assert_eq!(
            lsh_index.to_string(),
            "LshIndex { num_hashes = 8, bands = 4, rows_per_band = 2, size = 7 }"
        );
    }
}
