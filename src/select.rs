//! Narrowing a rule corpus down to the rules that could match at a site.

use crate::ast::{extract_candidates, extract_requirements, Visitable};
use crate::config::Config;
use crate::rule::{BundleInfo, Rule, RuleCorpus, RuleId};
use crate::trie::SetTrie;
use crate::vocab::{CandidateSet, Interner, RequirementSet};

use log::{debug, trace, warn};
use once_cell::sync::OnceCell;
use std::collections::BTreeSet;
use std::fmt::{self, Debug, Formatter};

/// Requirement sets of every rule in a corpus, and the trie built from them.
pub struct RuleIndex {
    requirements: Vec<BTreeSet<RequirementSet>>,
    trie: SetTrie<RuleId>,
}

impl RuleIndex {
    /// The alternative requirement sets derived for `id`.
    pub fn requirements(&self, id: RuleId) -> Option<&BTreeSet<RequirementSet>> {
        self.requirements.get(id.index())
    }

    pub fn trie(&self) -> &SetTrie<RuleId> {
        &self.trie
    }

    /// Every rule with an alternative contained in `candidates`, in id order.
    pub fn query(&self, candidates: &CandidateSet) -> Vec<RuleId> {
        let mut ids: Vec<RuleId> = self
            .trie
            .collect_reachable_values(candidates)
            .into_iter()
            .copied()
            .collect();
        ids.sort_unstable();
        ids
    }
}

impl Debug for RuleIndex {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("RuleIndex")
            .field("rules", &self.requirements.len())
            .field("trie", &self.trie)
            .finish()
    }
}

/// Derive the requirement sets of every rule in `corpus` and index them.
///
/// A rule contributes one requirement set per alternative of each of its templates.
pub fn index_rules(corpus: &RuleCorpus, config: &Config) -> RuleIndex {
    let mut interner = Interner::new();
    let mut requirements = Vec::with_capacity(corpus.len());
    for (id, rule) in corpus.iter() {
        let mut alternatives = BTreeSet::new();
        for template in rule.templates() {
            match template.syntax() {
                Ok(syntax) => {
                    alternatives.extend(extract_requirements(&syntax, config, &mut interner));
                }
                Err(e) => {
                    // templates are checked on creation; an unreadable one can only be kept sound
                    warn!("{}: template unreadable, always a candidate: {}", id, e);
                    alternatives.insert(RequirementSet::new());
                }
            }
        }
        trace!("{} {}: {:?}", id, rule.name(), alternatives);
        requirements.push(alternatives);
    }

    let pairs = requirements.iter().enumerate().flat_map(|(i, alts)| {
        alts.iter()
            .map(move |set| (RuleId::new(i), set.iter().cloned()))
    });
    let trie = SetTrie::build_with_order(pairs, config.token_order);
    debug!(
        "indexed {} rules: {} alternatives, {} distinct tokens",
        requirements.len(),
        trie.len(),
        interner.len()
    );
    RuleIndex { requirements, trie }
}

/// A rule that survived selection.
#[derive(Clone, Copy)]
pub struct RuleRef<'c> {
    id: RuleId,
    rule: &'c Rule,
    corpus: &'c RuleCorpus,
}

impl<'c> RuleRef<'c> {
    pub fn id(&self) -> RuleId {
        self.id
    }

    pub fn rule(&self) -> &'c Rule {
        self.rule
    }

    /// The bundle the rule was loaded from, if any.
    pub fn bundle(&self) -> Option<&'c BundleInfo> {
        self.corpus
            .bundle_of(self.id)
            .and_then(|b| self.corpus.bundle(b))
    }

    pub fn qualified_name(&self) -> String {
        self.corpus
            .qualified_name(self.id)
            .unwrap_or_else(|| self.rule.name().to_owned())
    }
}

impl PartialEq for RuleRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && std::ptr::eq(self.corpus, other.corpus)
    }
}

impl Eq for RuleRef<'_> {}

impl Debug for RuleRef<'_> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{} {}", self.id, self.qualified_name())
    }
}

/// Owns a rule corpus and answers "which rules could match here?".
///
/// The index is built on first use and shared by every later query; a `Selector` can be queried
/// from several threads at once.
pub struct Selector {
    corpus: RuleCorpus,
    config: Config,
    index: OnceCell<RuleIndex>,
}

impl Selector {
    pub fn new(corpus: RuleCorpus) -> Self {
        Self::with_config(corpus, Config::default())
    }

    pub fn with_config(corpus: RuleCorpus, config: Config) -> Self {
        Selector {
            corpus,
            config,
            index: OnceCell::new(),
        }
    }

    pub fn corpus(&self) -> &RuleCorpus {
        &self.corpus
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn index(&self) -> &RuleIndex {
        self.index
            .get_or_init(|| index_rules(&self.corpus, &self.config))
    }

    /// Rules that could match somewhere inside `site`.
    pub fn select_candidates<N: Visitable + ?Sized>(&self, site: &N) -> Vec<RuleRef<'_>> {
        let candidates = extract_candidates(site, &self.config);
        self.select_for(&candidates)
    }

    /// Rules with an alternative contained in an already extracted candidate set.
    pub fn select_for(&self, candidates: &CandidateSet) -> Vec<RuleRef<'_>> {
        let selected: Vec<_> = self
            .index()
            .query(candidates)
            .into_iter()
            .filter_map(|id| {
                Some(RuleRef {
                    id,
                    rule: self.corpus.get(id)?,
                    corpus: &self.corpus,
                })
            })
            .collect();
        trace!(
            "{} of {} rules selected from {} tokens",
            selected.len(),
            self.corpus.len(),
            candidates.len()
        );
        selected
    }
}

impl Debug for Selector {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Selector")
            .field("rules", &self.corpus.len())
            .field("config", &self.config)
            .field("index", &self.index.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{Bundle, Template};
    use crate::trie::TokenOrder;
    use pretty_assertions::assert_eq;

    fn corpus() -> RuleCorpus {
        let strings = Bundle::new("strings")
            .with(Rule::single("empty_len", "$s:expr", "$s.len() == 0").unwrap())
            .with(
                Rule::new(
                    "redundant_clone",
                    vec![
                        Template::parse("$s:expr", "$s.clone().to_string()").unwrap(),
                        Template::parse("$s:expr", "$s.to_owned().to_string()").unwrap(),
                    ],
                )
                .unwrap(),
            );
        let mut corpus = RuleCorpus::new();
        corpus.add(strings);
        corpus.add(Rule::single("anything", "$a:expr", "$a").unwrap());
        corpus
    }

    fn names(selected: &[RuleRef]) -> Vec<String> {
        selected.iter().map(|r| r.qualified_name()).collect()
    }

    fn select(selector: &Selector, src: &str) -> Vec<String> {
        let x: syn::Expr = syn::parse_str(src).unwrap();
        names(&selector.select_candidates(&x))
    }

    fn requirement_strs(index: &RuleIndex, i: usize) -> Vec<Vec<&str>> {
        index
            .requirements(RuleId::new(i))
            .unwrap()
            .iter()
            .map(|s| s.iter().map(|t| t.as_str()).collect())
            .collect()
    }

    #[test]
    fn requirement_map() {
        let index = index_rules(&corpus(), &Config::default());
        let reqs = |i| requirement_strs(&index, i);
        assert_eq!(reqs(0), [vec!["==", "len"]]);
        assert_eq!(
            reqs(1),
            [vec!["clone", "to_string"], vec!["to_owned", "to_string"]]
        );
        assert_eq!(reqs(2), [Vec::<&str>::new()]);
        assert!(index.requirements(RuleId::new(3)).is_none());
        assert_eq!(index.trie().len(), 4);
    }

    #[test]
    fn selection() {
        let selector = Selector::new(corpus());
        assert_eq!(select(&selector, "x + 1"), ["anything"]);
        assert_eq!(
            select(&selector, "name.len() == 0"),
            ["strings::empty_len", "anything"]
        );
        assert_eq!(
            select(&selector, "v.iter().map(|s| s.to_owned().to_string())"),
            ["strings::redundant_clone", "anything"]
        );
    }

    #[test]
    fn order_does_not_change_results() {
        let lexical = Selector::new(corpus());
        let rarest = Selector::with_config(
            corpus(),
            Config {
                token_order: TokenOrder::RarestFirst,
                ..Config::default()
            },
        );
        for src in ["a.len() == b.clone().to_string().len()", "f(x)", "s.to_owned()"] {
            assert_eq!(select(&lexical, src), select(&rarest, src));
        }
    }

    #[test]
    fn index_is_built_once() {
        let selector = Selector::new(corpus());
        let first: *const RuleIndex = selector.index();
        selector.select_for(&CandidateSet::new());
        assert!(std::ptr::eq(first, selector.index()));
    }

    #[test]
    fn rule_refs_point_back_to_bundles() {
        let selector = Selector::new(corpus());
        let selected = selector.select_for(&["len", "=="].into_iter().collect());
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].rule().name(), "empty_len");
        assert_eq!(selected[0].bundle().map(|b| b.name()), Some("strings"));
        assert_eq!(selected[1].bundle(), None);
        assert_ne!(selected[0], selected[1]);
    }
}
