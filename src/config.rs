use crate::trie::TokenOrder;

/// Knobs shared by both extraction sides and the index build.
///
/// A selector owns exactly one `Config`, so rule requirements and site candidates are always
/// lowered with the same vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Emit integer literals (as base-10 digits) as tokens.
    pub int_literals: bool,
    /// Upper bound on the alternatives one template may enumerate through nested `any_of!`.
    /// Past it the alternatives collapse to their common tokens.
    pub max_alternatives: usize,
    /// Canonical token order used to lay requirement sets out as trie paths.
    pub token_order: TokenOrder,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            int_literals: false,
            max_alternatives: 256,
            token_order: TokenOrder::Lexical,
        }
    }
}
