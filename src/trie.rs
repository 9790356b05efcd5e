//! A set-trie over canonically ordered tokens.
//!
//! Every stored set is written as a path of its tokens in canonical order; the value associated
//! with the set sits on the node where the path ends. A query walks down from the root following
//! only the edges whose token is in the query set. Because each path is sorted, a stored set is
//! reached exactly when all of its tokens are present, so the walk visits precisely the stored
//! subsets of the query and nothing has to be backtracked.

use crate::vocab::{CandidateSet, Token};

use log::{debug, trace};
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Ordering;
use std::fmt::{self, Debug, Formatter};
use std::hash::Hash;

/// Canonical order for laying a set out as a trie path.
///
/// Any total order works for correctness; what matters is that one order is used for the whole
/// build. Queries only test membership, so they never depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenOrder {
    /// Plain string order.
    #[default]
    Lexical,
    /// Tokens occurring in fewer stored sets first (ties broken lexically). Rare tokens near the
    /// root prune most queries after one membership test.
    RarestFirst,
}

struct Node<V> {
    children: FxHashMap<Token, Node<V>>,
    values: Vec<V>,
}

impl<V> Default for Node<V> {
    fn default() -> Self {
        Node {
            children: FxHashMap::default(),
            values: Vec::new(),
        }
    }
}

/// Immutable index answering "which stored sets are subsets of this set?".
pub struct SetTrie<V> {
    root: Node<V>,
    len: usize,
    nodes: usize,
    order: TokenOrder,
}

impl<V: Eq + Hash> SetTrie<V> {
    /// Build from `(value, set)` pairs using [`TokenOrder::Lexical`].
    ///
    /// A value may appear in several pairs; it is then reachable through any of its sets.
    pub fn build<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (V, S)>,
        S: IntoIterator<Item = Token>,
    {
        Self::build_with_order(pairs, TokenOrder::Lexical)
    }

    pub fn build_with_order<I, S>(pairs: I, order: TokenOrder) -> Self
    where
        I: IntoIterator<Item = (V, S)>,
        S: IntoIterator<Item = Token>,
    {
        let mut pairs: Vec<(V, Vec<Token>)> = pairs
            .into_iter()
            .map(|(v, s)| {
                let mut path: Vec<Token> = s.into_iter().collect();
                path.sort_unstable();
                path.dedup();
                (v, path)
            })
            .collect();

        if order == TokenOrder::RarestFirst {
            let rank = rarity_ranks(&pairs);
            for (_, path) in &mut pairs {
                path.sort_unstable_by_key(|t| rank[t]);
            }
        }

        let mut trie = SetTrie {
            root: Node::default(),
            len: 0,
            nodes: 1,
            order,
        };
        for (value, path) in pairs {
            trie.insert(value, &path);
        }
        debug!(
            "built set-trie: {} entries, {} nodes, order {:?}",
            trie.len, trie.nodes, trie.order
        );
        trie
    }

    fn insert(&mut self, value: V, path: &[Token]) {
        let mut created = 0;
        let mut node = &mut self.root;
        for edge in path {
            node = node.children.entry(edge.clone()).or_insert_with(|| {
                created += 1;
                Node::default()
            });
        }
        self.nodes += created;
        if !node.values.contains(&value) {
            node.values.push(value);
            self.len += 1;
        }
    }

    /// Report every value with at least one stored set contained in `candidates`, each exactly
    /// once, in unspecified order.
    pub fn for_each_reachable<'t>(&'t self, candidates: &CandidateSet, mut f: impl FnMut(&'t V)) {
        let mut seen: FxHashSet<&V> = FxHashSet::default();
        let mut stack = vec![&self.root];
        let mut visited = 0usize;
        while let Some(node) = stack.pop() {
            visited += 1;
            for v in &node.values {
                if seen.insert(v) {
                    f(v);
                }
            }
            // look up from whichever side is smaller; both find the same children
            if node.children.len() <= candidates.len() {
                for (edge, child) in &node.children {
                    if candidates.contains(edge.as_str()) {
                        stack.push(child);
                    }
                }
            } else {
                for t in candidates.iter() {
                    if let Some(child) = node.children.get(t.as_str()) {
                        stack.push(child);
                    }
                }
            }
        }
        trace!(
            "set-trie query: {} candidate tokens, {} nodes visited, {} values",
            candidates.len(),
            visited,
            seen.len()
        );
    }

    pub fn collect_reachable_values(&self, candidates: &CandidateSet) -> Vec<&V> {
        let mut out = Vec::new();
        self.for_each_reachable(candidates, |v| out.push(v));
        out
    }
}

impl<V> SetTrie<V> {
    /// Number of distinct `(value, set)` entries stored.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of nodes including the root.
    pub fn node_count(&self) -> usize {
        self.nodes
    }

    pub fn order(&self) -> TokenOrder {
        self.order
    }
}

impl<V> Debug for SetTrie<V> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("SetTrie")
            .field("len", &self.len)
            .field("nodes", &self.nodes)
            .field("order", &self.order)
            .finish()
    }
}

fn rarity_ranks<V>(pairs: &[(V, Vec<Token>)]) -> FxHashMap<Token, usize> {
    let mut counts: FxHashMap<&Token, usize> = FxHashMap::default();
    for (_, path) in pairs {
        for t in path {
            *counts.entry(t).or_default() += 1;
        }
    }
    let mut by_rarity: Vec<(&Token, usize)> = counts.into_iter().collect();
    by_rarity.sort_unstable_by(|(a, na), (b, nb)| match na.cmp(nb) {
        Ordering::Equal => a.cmp(b),
        x => x,
    });
    by_rarity
        .into_iter()
        .enumerate()
        .map(|(rank, (t, _))| (t.clone(), rank))
        .collect()
}
