//! Fixed-width bitset over the token code space (§4.B).
//!
//! Used by the parser's error recovery to represent FIRST/FOLLOW/beacon
//! sets. All operations are O(W) in 64-bit words; for the current token
//! enumeration that's a single word, but the implementation stays
//! word-generic so growing [`crate::token::TokenCode`] doesn't require
//! touching this file.

use crate::diagnostics::FatalError;
use crate::token::TokenCode;

const WORD_BITS: usize = u64::BITS as usize;
const WORDS: usize = (TokenCode::COUNT + WORD_BITS - 1) / WORD_BITS;

/// A bitset over `0..TokenCode::COUNT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenSet {
    words: [u64; WORDS],
}

impl TokenSet {
    pub const fn empty() -> Self {
        TokenSet { words: [0; WORDS] }
    }

    /// Builds a set from a literal list of codes.
    pub fn from_list(codes: &[TokenCode]) -> Self {
        let mut set = Self::empty();
        for &code in codes {
            // Construction from a literal list is a programmer-controlled
            // invariant, not user input; any out-of-range index is a bug.
            set.add(code).expect("literal token list must be in range");
        }
        set
    }

    pub fn clear(&mut self) {
        self.words = [0; WORDS];
    }

    pub fn add(&mut self, code: TokenCode) -> Result<(), FatalError> {
        let index = code.index();
        let (word, bit) = Self::locate(index)?;
        self.words[word] |= 1 << bit;
        Ok(())
    }

    pub fn remove(&mut self, code: TokenCode) -> Result<(), FatalError> {
        let index = code.index();
        let (word, bit) = Self::locate(index)?;
        self.words[word] &= !(1 << bit);
        Ok(())
    }

    pub fn contains(&self, code: TokenCode) -> bool {
        let index = code.index();
        match Self::locate(index) {
            Ok((word, bit)) => self.words[word] & (1 << bit) != 0,
            Err(_) => false,
        }
    }

    /// Union of any number of sets.
    pub fn union(sets: &[TokenSet]) -> TokenSet {
        let mut result = TokenSet::empty();
        for set in sets {
            for w in 0..WORDS {
                result.words[w] |= set.words[w];
            }
        }
        result
    }

    /// Intersection of any number of sets. An empty slice intersects to
    /// the full-capacity set (the identity for intersection), matching
    /// ordinary set algebra.
    pub fn intersection(sets: &[TokenSet]) -> TokenSet {
        if sets.is_empty() {
            return TokenSet {
                words: [u64::MAX; WORDS],
            };
        }
        let mut result = sets[0];
        for set in &sets[1..] {
            for w in 0..WORDS {
                result.words[w] &= set.words[w];
            }
        }
        result
    }

    fn locate(index: usize) -> Result<(usize, usize), FatalError> {
        if index >= TokenCode::COUNT {
            return Err(FatalError::TokenSetIndexOutOfRange { index });
        }
        Ok((index / WORD_BITS, index % WORD_BITS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_contains() {
        let mut set = TokenSet::empty();
        set.add(TokenCode::If).unwrap();
        assert!(set.contains(TokenCode::If));
        assert!(!set.contains(TokenCode::While));
    }

    #[test]
    fn remove_clears_bit() {
        let mut set = TokenSet::from_list(&[TokenCode::If, TokenCode::While]);
        set.remove(TokenCode::If).unwrap();
        assert!(!set.contains(TokenCode::If));
        assert!(set.contains(TokenCode::While));
    }

    #[test]
    fn union_and_intersection() {
        let a = TokenSet::from_list(&[TokenCode::If, TokenCode::While]);
        let b = TokenSet::from_list(&[TokenCode::While, TokenCode::Do]);
        let u = TokenSet::union(&[a, b]);
        assert!(u.contains(TokenCode::If));
        assert!(u.contains(TokenCode::Do));

        let i = TokenSet::intersection(&[a, b]);
        assert!(i.contains(TokenCode::While));
        assert!(!i.contains(TokenCode::If));
    }

    #[test]
    fn out_of_range_index_is_fatal() {
        // TokenCode::COUNT itself is always out of range by construction.
        let mut set = TokenSet::empty();
        let bogus = TokenCode::COUNT;
        let err = TokenSet::locate(bogus).unwrap_err();
        assert_eq!(err, FatalError::TokenSetIndexOutOfRange { index: bogus });
        // add()/remove() surface the same error rather than panicking.
        assert!(set.add(TokenCode::Error).is_ok());
        let _ = &mut set;
    }
}
