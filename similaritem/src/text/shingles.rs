use fxhash::FxHashSet;

use crate::error::SimilarityError;

/// Distinct character shingles of a single document.
pub type ShingleSet = FxHashSet<String>;

/// CharShingles produces every window of `size` characters of a string,
/// advancing one character at a time. Windows never split a UTF-8 sequence.
#[derive(Clone)]
pub struct CharShingles<'a> {
    data: &'a str,
    size: usize,
}

impl<'a> CharShingles<'a> {
    pub fn new(data: &'a str, size: usize) -> Self {
        CharShingles { data, size }
    }
}

impl<'a> Iterator for CharShingles<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.size == 0 {
            return None;
        }
        // byte offsets just past each char
        let mut ends = self
            .data
            .char_indices()
            .map(|(i, _)| i)
            .skip(1)
            .chain(std::iter::once(self.data.len()));

        // get shingle end pos and step next pos at once
        let pos_next = ends.next().filter(|_| !self.data.is_empty())?;
        let pos_end = if self.size == 1 {
            pos_next
        } else {
            ends.nth(self.size - 2)?
        };

        let ret = &self.data[..pos_end];
        self.data = &self.data[pos_next..];
        Some(ret)
    }
}

/// Replaces newlines and tabs with spaces and collapses runs of spaces
/// into a single space.
///
/// ```
/// use similaritem::text::normalize_whitespace;
///
/// assert_eq!(normalize_whitespace("a\t\tb   c\nd"), "a b c d");
/// ```
pub fn normalize_whitespace(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    let mut previous_space = false;
    for c in text.chars() {
        let c = match c {
            '\n' | '\t' => ' ',
            c => c,
        };
        if c == ' ' {
            if previous_space {
                continue;
            }
            previous_space = true;
        } else {
            previous_space = false;
        }
        normalized.push(c);
    }
    normalized
}

/// Shingles a single string after whitespace normalization.
///
/// ```
/// use similaritem::text::shingle_text;
///
/// let shingles = shingle_text("abcd", 3);
/// assert_eq!(shingles.len(), 2);
/// assert!(shingles.contains("abc"));
/// assert!(shingles.contains("bcd"));
/// ```
pub fn shingle_text(text: &str, shingle_size: usize) -> ShingleSet {
    let normalized = normalize_whitespace(text);
    CharShingles::new(&normalized, shingle_size)
        .map(str::to_owned)
        .collect()
}

/// Extracts the set of `k`-character shingles from a document given as lines.
///
/// Lines are processed one at a time. The last `k - 1` characters of each
/// normalized working buffer are carried into the next line, so shingles
/// straddle line breaks and the result equals shingling
/// `lines.join("\n")` as a single string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShingleExtractor {
    shingle_size: usize,
}

impl ShingleExtractor {
    pub fn new(shingle_size: usize) -> Result<Self, SimilarityError> {
        if shingle_size < 1 {
            return Err(SimilarityError::InvalidShingleSize { shingle_size });
        }
        Ok(ShingleExtractor { shingle_size })
    }

    pub fn shingle_size(&self) -> usize {
        self.shingle_size
    }

    pub fn extract<I, S>(&self, lines: I) -> ShingleSet
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut shingles = ShingleSet::default();
        let mut carry = String::new();
        for (i, line) in lines.into_iter().enumerate() {
            let mut working = std::mem::take(&mut carry);
            if i > 0 {
                working.push('\n');
            }
            working.push_str(line.as_ref());
            let working = normalize_whitespace(&working);

            shingles.extend(CharShingles::new(&working, self.shingle_size).map(str::to_owned));
            carry = tail_chars(&working, self.shingle_size - 1).to_owned();
        }
        shingles
    }
}

/// Returns the last `n` characters of `s`, or all of `s` if it is shorter.
fn tail_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match s.char_indices().rev().nth(n - 1) {
        Some((pos, _)) => &s[pos..],
        None => s,
    }
}
