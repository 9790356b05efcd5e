//! Tokens: the coarse vocabulary shared by rule requirements and code sites.

use rustc_hash::FxHashSet;
use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::Arc;

/// A canonical string derived from a syntax element.
///
/// Cloning is a reference-count bump, so tokens can be shared freely between requirement sets,
/// trie edges and candidate sets.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(Arc<str>);

impl Token {
    pub fn new(s: impl Into<Arc<str>>) -> Self {
        Token(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Token {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Token(s.into())
    }
}

impl From<String> for Token {
    fn from(s: String) -> Self {
        Token(s.into())
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Debug for Token {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

/// Tokens that must all be present at a site for one alternative of a rule to be matchable.
///
/// The empty set is legal and means "always a candidate".
pub type RequirementSet = BTreeSet<Token>;

/// Tokens observed at a code site.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    tokens: FxHashSet<Token>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, token: Token) -> bool {
        self.tokens.insert(token)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }

    /// Whether every token of `required` is present.
    pub fn is_superset(&self, required: &RequirementSet) -> bool {
        required.iter().all(|t| self.tokens.contains(t))
    }

    /// The tokens in canonical (lexical) order; handy for diagnostics and tests.
    pub fn sorted(&self) -> Vec<&str> {
        let mut v: Vec<&str> = self.tokens.iter().map(Token::as_str).collect();
        v.sort_unstable();
        v
    }
}

impl Debug for CandidateSet {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_set().entries(self.sorted()).finish()
    }
}

impl FromIterator<Token> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
        CandidateSet {
            tokens: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<&'a str> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        iter.into_iter().map(Token::from).collect()
    }
}

impl Extend<Token> for CandidateSet {
    fn extend<I: IntoIterator<Item = Token>>(&mut self, iter: I) {
        self.tokens.extend(iter)
    }
}

impl From<RequirementSet> for CandidateSet {
    fn from(set: RequirementSet) -> Self {
        set.into_iter().collect()
    }
}

/// Deduplicates token allocations.
///
/// Extraction produces the same few hundred names over and over; interning makes every
/// occurrence share one allocation.
#[derive(Default)]
pub struct Interner {
    tokens: FxHashSet<Token>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, s: &str) -> Token {
        if let Some(t) = self.tokens.get(s) {
            return t.clone();
        }
        let t = Token::from(s);
        self.tokens.insert(t.clone());
        t
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
