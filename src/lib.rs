//! Candidate selection for large sets of declarative rewrite rules.
//!
//! Every rule is reduced to a few sets of tokens (names, operators) that must all occur at a
//! site for the rule to have any chance of matching there. Those sets go into a [`SetTrie`];
//! at match time the tokens of a site are collected and the trie yields every rule whose
//! requirements they cover. Only those rules need to reach an exact structural matcher.
//!
//! ```
//! # use rulesieve::{Bundle, RuleCorpus, Selector};
//! let rules = Bundle::parse("strings", r#"
//!     macro_rules! empty_len { ($s:expr) => { $s.len() == 0 } }
//!     macro_rules! redundant_clone { ($s:expr) => { $s.clone().to_string() } }
//! "#).unwrap();
//! let selector = Selector::new(std::iter::once(rules).collect::<RuleCorpus>());
//!
//! let site: syn::Expr = syn::parse_str("if name.len() == 0 { None } else { Some(name) }").unwrap();
//! let names: Vec<_> = selector.select_candidates(&site).iter().map(|r| r.qualified_name()).collect();
//! assert_eq!(names, ["strings::empty_len"]);
//! ```

mod config;
mod trie;
mod vocab;

#[cfg(feature = "syn")]
mod ast;
#[cfg(feature = "syn")]
mod rule;
#[cfg(feature = "syn")]
mod select;
#[cfg(feature = "syn")]
mod tokens;

pub use crate::config::Config;
pub use crate::trie::{SetTrie, TokenOrder};
pub use crate::vocab::{CandidateSet, Interner, RequirementSet, Token};

#[cfg(feature = "syn")]
pub use crate::ast::{extract_candidates, TemplateKind, Visitable, ANY_OF};
#[cfg(feature = "syn")]
pub use crate::rule::{Bundle, BundleId, BundleInfo, Rule, RuleCorpus, RuleId, Template, Transformer};
#[cfg(feature = "syn")]
pub use crate::select::{index_rules, RuleIndex, RuleRef, Selector};
#[cfg(feature = "syn")]
pub use crate::tokens::Fragment;

pub use proc_macro2;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("cannot tokenize: {0}")]
    Lex(String),
    #[error("metavariable `${0}` is not declared")]
    UndeclaredMetavar(String),
    #[error("metavariable `${0}` is declared twice")]
    DuplicateMetavar(String),
    #[error("unsupported fragment specifier `{0}`")]
    UnsupportedFragment(String),
    #[error("malformed metavariable declaration: {0}")]
    MalformedDeclaration(String),
    #[error("malformed template: {0}")]
    MalformedTemplate(String),
    #[error("rule `{0}` has no templates")]
    EmptyRule(String),
    #[error("in rule `{rule}`: {source}")]
    InRule {
        rule: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    #[cfg_attr(not(feature = "syn"), allow(dead_code))]
    pub(crate) fn in_rule(self, rule: &str) -> Self {
        Error::InRule {
            rule: rule.to_owned(),
            source: Box::new(self),
        }
    }
}

#[cfg(feature = "syn")]
impl From<syn::Error> for Error {
    fn from(e: syn::Error) -> Self {
        Error::Syntax(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
