mod shingles;

pub use self::shingles::normalize_whitespace;
pub use self::shingles::shingle_text;
pub use self::shingles::CharShingles;
pub use self::shingles::ShingleExtractor;
pub use self::shingles::ShingleSet;
