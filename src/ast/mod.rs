//! Token extraction from syn trees

mod names;
mod visit;

pub use self::visit::Visitable;
use self::visit::{Node, Position, Visitor};

use crate::config::Config;
use crate::tokens::{is_placeholder, MetaContext};
use crate::vocab::{CandidateSet, Interner, RequirementSet, Token};
use crate::{Error, Result};

use log::{debug, trace, warn};
use proc_macro2::{Delimiter, Spacing, TokenStream, TokenTree};
use std::collections::BTreeSet;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;

/// Name of the macro that introduces alternatives into a template.
pub const ANY_OF: &str = "any_of";

struct Stmts(Vec<syn::Stmt>);
impl Parse for Stmts {
    fn parse(input: ParseStream) -> syn::parse::Result<Self> {
        Ok(Stmts(input.call(syn::Block::parse_within)?))
    }
}

/// Syntactic shape of a template body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// A single expression; matches anywhere an expression appears.
    Expr,
    /// One or more statements; matches a run of statements in a block.
    StmtSeq,
}

pub(crate) enum TemplateSyntax {
    Expr(syn::Expr),
    StmtSeq(Vec<syn::Stmt>),
}

impl TemplateSyntax {
    pub(crate) fn parse(args: TokenStream, body: TokenStream) -> Result<Self> {
        let body = MetaContext::new(args)?.apply(body)?;
        trace!("template body: {}", body);
        let Stmts(mut stmts) = syn::parse2(body)?;
        if stmts.is_empty() {
            return Err(Error::MalformedTemplate("empty body".to_owned()));
        }
        if stmts.len() == 1 {
            if let Some(syn::Stmt::Expr(_, None)) = stmts.first() {
                if let Some(syn::Stmt::Expr(x, None)) = stmts.pop() {
                    return Ok(TemplateSyntax::Expr(x));
                }
            }
        }
        Ok(TemplateSyntax::StmtSeq(stmts))
    }

    pub(crate) fn kind(&self) -> TemplateKind {
        match self {
            TemplateSyntax::Expr(_) => TemplateKind::Expr,
            TemplateSyntax::StmtSeq(_) => TemplateKind::StmtSeq,
        }
    }
}

impl Visitable for TemplateSyntax {
    fn apply<V: Visitor>(&self, v: &mut V) {
        match self {
            TemplateSyntax::Expr(x) => x.apply(v),
            TemplateSyntax::StmtSeq(x) => x[..].apply(v),
        }
    }
}

/// One comma-separated argument of a macro, read in the grammar of the place it is invoked.
enum Alternative {
    Expr(syn::Expr),
    Pat(syn::Pat),
    Type(syn::Type),
}

impl Visitable for Alternative {
    fn apply<V: Visitor>(&self, v: &mut V) {
        match self {
            Alternative::Expr(x) => x.apply(v),
            Alternative::Pat(x) => x.apply(v),
            Alternative::Type(x) => x.apply(v),
        }
    }
}

/// Parses the arguments of a macro invoked at `position`, such as the branches of `any_of!`.
fn alternatives(mac: &syn::Macro, position: Position) -> syn::Result<Vec<Alternative>> {
    type Args<T> = Punctuated<T, syn::Token![,]>;
    Ok(match position {
        Position::Expr => mac
            .parse_body_with(Args::<syn::Expr>::parse_terminated)?
            .into_iter()
            .map(Alternative::Expr)
            .collect(),
        // or-patterns are one alternative each: `any_of!(A | B, C)` has two
        Position::Pat => mac
            .parse_body_with(|input: ParseStream| {
                Args::<syn::Pat>::parse_terminated_with(input, syn::Pat::parse_multi)
            })?
            .into_iter()
            .map(Alternative::Pat)
            .collect(),
        Position::Type => mac
            .parse_body_with(Args::<syn::Type>::parse_terminated)?
            .into_iter()
            .map(Alternative::Type)
            .collect(),
    })
}

/// Collects, for one template, every set of tokens a site must contain for some choice of its
/// alternatives to match.
struct RuleExtractor<'c> {
    config: &'c Config,
    interner: &'c mut Interner,
    combinations: Vec<RequirementSet>,
}

impl<'c> RuleExtractor<'c> {
    fn new(config: &'c Config, interner: &'c mut Interner) -> Self {
        let combinations = vec![RequirementSet::new()];
        RuleExtractor {
            config,
            interner,
            combinations,
        }
    }

    fn add(&mut self, s: &str) {
        let token = self.interner.intern(s);
        for c in &mut self.combinations {
            c.insert(token.clone());
        }
    }

    fn ident(&mut self, id: &syn::Ident) {
        if !is_placeholder(id) {
            self.add(&id.to_string());
        }
    }

    /// Past the configured bound, the alternatives are replaced by the tokens they all share.
    fn limit(&mut self) {
        if self.combinations.len() <= self.config.max_alternatives {
            return;
        }
        debug!(
            "{} alternatives exceed the limit of {}; keeping their common tokens",
            self.combinations.len(),
            self.config.max_alternatives
        );
        let mut sets = self.combinations.drain(..);
        let first = sets.next().unwrap_or_default();
        let common = sets.fold(first, |acc, s| acc.intersection(&s).cloned().collect());
        self.combinations = vec![common];
    }
}

impl Visitor for RuleExtractor<'_> {
    fn node(&mut self, node: Node<'_>) {
        match node {
            Node::Path(p) => {
                for seg in &p.segments {
                    self.ident(&seg.ident);
                }
            }
            Node::Member(id) => self.ident(id),
            Node::Operator(op) => self.add(op),
            Node::LitInt(x) => {
                if self.config.int_literals {
                    self.add(x.base10_digits());
                }
            }
        }
    }

    fn open_macro(&mut self, mac: &syn::Macro, position: Position) -> std::result::Result<(), ()> {
        if !mac.path.is_ident(ANY_OF) {
            // only the invocation path is known to be present at a matching site
            return Ok(());
        }
        let branches = match alternatives(mac, position) {
            Ok(branches) => branches,
            Err(e) => {
                warn!("{}! alternatives do not parse, ignoring them: {}", ANY_OF, e);
                return Err(());
            }
        };
        if branches.is_empty() {
            return Err(());
        }
        let base = std::mem::take(&mut self.combinations);
        for branch in &branches {
            let mut sub = RuleExtractor {
                config: self.config,
                interner: &mut *self.interner,
                combinations: base.clone(),
            };
            branch.apply(&mut sub);
            self.combinations.extend(sub.combinations);
        }
        self.limit();
        Err(())
    }
}

/// Every alternative requirement set of a template.
///
/// A site can only match the template if, for at least one returned set, the site contains every
/// token of that set. Placeholders contribute nothing, and each `any_of!` forks the alternatives
/// gathered so far once per branch.
pub(crate) fn extract_requirements(
    template: &TemplateSyntax,
    config: &Config,
    interner: &mut Interner,
) -> BTreeSet<RequirementSet> {
    let mut x = RuleExtractor::new(config, interner);
    template.apply(&mut x);
    x.limit();
    x.combinations.into_iter().collect()
}

struct SiteExtractor<'c> {
    config: &'c Config,
    tokens: CandidateSet,
}

impl SiteExtractor<'_> {
    fn add(&mut self, s: &str) {
        if !self.tokens.contains(s) {
            self.tokens.insert(Token::from(s));
        }
    }

    /// Conservative scan of a macro body that is not a list of expressions.
    fn scan(&mut self, ts: TokenStream) {
        let mut run = String::new();
        for tt in ts {
            match tt {
                TokenTree::Punct(p) => {
                    run.push(p.as_char());
                    if p.spacing() == Spacing::Alone {
                        self.flush(&mut run);
                    }
                }
                TokenTree::Ident(id) => {
                    self.flush(&mut run);
                    self.add(&id.to_string());
                }
                TokenTree::Group(g) => {
                    self.flush(&mut run);
                    if g.delimiter() == Delimiter::Bracket {
                        self.add(names::INDEX);
                    }
                    self.scan(g.stream());
                }
                TokenTree::Literal(x) => {
                    self.flush(&mut run);
                    if self.config.int_literals {
                        if let syn::Lit::Int(x) = syn::Lit::new(x) {
                            self.add(x.base10_digits());
                        }
                    }
                }
            }
        }
        self.flush(&mut run);
    }

    /// Splits a run of joint punctuation into the longest known operators.
    fn flush(&mut self, run: &mut String) {
        let mut rest = run.as_str();
        while !rest.is_empty() {
            let n = (1..=rest.len().min(3))
                .rev()
                .find(|&n| !names::punct_tokens(&rest[..n]).is_empty())
                .unwrap_or(1);
            for t in names::punct_tokens(&rest[..n]) {
                self.add(t);
            }
            rest = &rest[n..];
        }
        run.clear();
    }
}

impl Visitor for SiteExtractor<'_> {
    fn node(&mut self, node: Node<'_>) {
        match node {
            Node::Path(p) => {
                for seg in &p.segments {
                    self.add(&seg.ident.to_string());
                }
            }
            Node::Member(id) => self.add(&id.to_string()),
            Node::Operator(op) => self.add(op),
            Node::LitInt(x) => {
                if self.config.int_literals {
                    self.add(x.base10_digits());
                }
            }
        }
    }

    fn open_macro(&mut self, mac: &syn::Macro, position: Position) -> std::result::Result<(), ()> {
        match alternatives(mac, position) {
            Ok(args) => {
                for arg in &args {
                    arg.apply(self);
                }
            }
            Err(_) => self.scan(mac.tokens.clone()),
        }
        Ok(())
    }
}

/// Every token that occurs at a code site.
///
/// Covers every node a template could match inside the site, so the result is a superset of the
/// tokens of any matching template. Function signatures are left out, as they are for templates.
pub fn extract_candidates<N: Visitable + ?Sized>(site: &N, config: &Config) -> CandidateSet {
    let mut x = SiteExtractor {
        config,
        tokens: CandidateSet::new(),
    };
    site.apply(&mut x);
    trace!("site tokens: {:?}", x.tokens);
    x.tokens
}
