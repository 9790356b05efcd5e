/// A template arrives as two TokenStreams, in the shape of a `macro_rules!` arm:
/// 1: a metavariable declaration, `$a:expr, $b:ident`
/// 2: a body in standard syntax extended with the declared metavariables, `$a.len() == 0`
/// This module checks (1) and rewrites (2) into plain syntax by replacing every metavariable with
/// a placeholder identifier, so the body can be parsed by syn.
use crate::{Error, Result};

use log::trace;
use proc_macro2::{Delimiter, Ident, Spacing, Span, TokenStream, TokenTree};
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::num::NonZeroU32;

/// Every placeholder identifier starts with this.
pub(crate) const PLACEHOLDER_PREFIX: &str = "__rulesieve_";

pub(crate) fn is_placeholder(ident: &Ident) -> bool {
    ident.to_string().starts_with(PLACEHOLDER_PREFIX)
}

/// Fragment specifier of a metavariable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment {
    Expr,
    Ident,
    Ty,
    Path,
    Pat,
    Literal,
}

impl Fragment {
    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "expr" => Fragment::Expr,
            "ident" => Fragment::Ident,
            "ty" => Fragment::Ty,
            "path" => Fragment::Path,
            "pat" => Fragment::Pat,
            "literal" => Fragment::Literal,
            _ => return None,
        })
    }
}

impl Display for Fragment {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            Fragment::Expr => "expr",
            Fragment::Ident => "ident",
            Fragment::Ty => "ty",
            Fragment::Path => "path",
            Fragment::Pat => "pat",
            Fragment::Literal => "literal",
        })
    }
}

#[derive(Debug)]
struct MetaDef {
    fragment: Fragment,
    /// unique identifier for each metavar
    id: NonZeroU32,
}

impl MetaDef {
    fn placeholder(&self, span: Span) -> TokenTree {
        Ident::new(&format!("{}{}", PLACEHOLDER_PREFIX, self.id), span).into()
    }
}

type DefMap = HashMap<String, MetaDef>;

fn wildcard(span: Span) -> TokenTree {
    Ident::new(&format!("{}_", PLACEHOLDER_PREFIX), span).into()
}

#[derive(Debug)]
enum BodyState {
    AwaitingDollar,
    AwaitingName,
}

struct BodyTransducer<'a, It> {
    ts: It,
    defs: &'a DefMap,
    state: BodyState,
}

impl<'a, It> BodyTransducer<'a, It> {
    fn new(ts: It, defs: &'a DefMap) -> Self {
        let state = BodyState::AwaitingDollar;
        BodyTransducer { ts, defs, state }
    }
}

impl<'a, It: Iterator<Item = TokenTree>> Iterator for BodyTransducer<'a, It> {
    type Item = Result<TokenTree>;

    fn next(&mut self) -> Option<Result<TokenTree>> {
        use self::BodyState::*;
        use proc_macro2::TokenTree::*;
        loop {
            let tt = self.ts.next();
            match (&self.state, tt) {
                (AwaitingDollar, Some(Punct(ref c))) if c.as_char() == '$' => {
                    self.state = AwaitingName;
                }
                (AwaitingDollar, Some(Group(g))) => {
                    let inner = BodyTransducer::new(g.stream().into_iter(), self.defs)
                        .collect::<Result<TokenStream>>();
                    return Some(inner.map(|inner| {
                        let mut rebuilt = proc_macro2::Group::new(g.delimiter(), inner);
                        rebuilt.set_span(g.span());
                        rebuilt.into()
                    }));
                }
                (AwaitingDollar, x) => return x.map(Ok),
                (AwaitingName, Some(Ident(id))) => {
                    self.state = AwaitingDollar;
                    let name = id.to_string();
                    if name == "_" {
                        return Some(Ok(wildcard(id.span())));
                    }
                    return Some(match self.defs.get(&name) {
                        Some(def) => Ok(def.placeholder(id.span())),
                        None => Err(Error::UndeclaredMetavar(name)),
                    });
                }
                (AwaitingName, Some(Punct(ref c))) if c.as_char() == '_' => {
                    self.state = AwaitingDollar;
                    return Some(Ok(wildcard(c.span())));
                }
                (AwaitingName, Some(Punct(c))) if c.as_char() == '$' => {
                    self.state = AwaitingDollar;
                    return Some(Ok(Punct(c)));
                }
                (AwaitingName, _) => {
                    self.state = AwaitingDollar;
                    return Some(Err(Error::MalformedTemplate(
                        "after '$', expected one of: identifier, '_', '$'".to_owned(),
                    )));
                }
            }
        }
    }
}

fn malformed(what: &str, got: Option<TokenTree>) -> Error {
    let got = got.map_or_else(|| "end of input".to_owned(), |tt| format!("`{}`", tt));
    Error::MalformedDeclaration(format!("expected {}, found {}", what, got))
}

fn parse_args(ts: TokenStream) -> Result<DefMap> {
    let mut ts = ts.into_iter();
    let mut args = HashMap::new();
    loop {
        use proc_macro2::TokenTree::*;
        match ts.next() {
            Some(Punct(ref c)) if c.as_char() == '$' => (),
            None => break,
            x => return Err(malformed("'$'", x)),
        }
        let id = match ts.next() {
            Some(Ident(id)) => id.to_string(),
            x => return Err(malformed("metavariable name", x)),
        };
        match ts.next() {
            Some(Punct(ref c)) if c.as_char() == ':' && c.spacing() == Spacing::Alone => (),
            x => return Err(malformed("':'", x)),
        }
        let fragment = match ts.next() {
            Some(Ident(typ)) => {
                let typ = typ.to_string();
                Fragment::parse(&typ).ok_or(Error::UnsupportedFragment(typ))?
            }
            x => return Err(malformed("fragment specifier", x)),
        };
        let def = MetaDef {
            fragment,
            id: NonZeroU32::new((args.len() + 1) as u32).expect("ids start at 1"),
        };
        if args.contains_key(&id) {
            return Err(Error::DuplicateMetavar(id));
        }
        args.insert(id, def);
        match ts.next() {
            Some(Punct(ref c)) if c.as_char() == ',' => (),
            None => break,
            x => return Err(malformed("',' or end of declaration", x)),
        }
    }
    Ok(args)
}

pub struct MetaContext {
    bindings: DefMap,
}

impl MetaContext {
    /// A template's declaration creates a context associating fragment types with metavar names.
    pub fn new(ts: TokenStream) -> Result<Self> {
        let bindings = parse_args(ts)?;
        trace!("bindings={:?}", bindings);
        Ok(MetaContext { bindings })
    }

    /// Replace the metavariables of `ts` with placeholders.
    /// ($foo:expr, $bar:ident) { let $bar = $foo.len(); }
    /// =>
    /// { let __rulesieve_2 = __rulesieve_1.len(); }
    pub fn apply(&self, ts: TokenStream) -> Result<TokenStream> {
        BodyTransducer::new(ts.into_iter(), &self.bindings).collect()
    }

    /// Declared metavariables in declaration order.
    pub fn metavars(&self) -> Vec<(&str, Fragment)> {
        let mut v: Vec<_> = self
            .bindings
            .iter()
            .map(|(name, def)| (def.id, name.as_str(), def.fragment))
            .collect();
        v.sort_unstable_by_key(|&(id, _, _)| id);
        v.into_iter().map(|(_, name, f)| (name, f)).collect()
    }
}

/// Strip the outer delimiters of `ts` when it is a single group, as in a `macro_rules!` arm.
pub(crate) fn ungroup(ts: TokenStream) -> TokenStream {
    let mut it = ts.clone().into_iter();
    match (it.next(), it.next()) {
        (Some(TokenTree::Group(g)), None) if g.delimiter() != Delimiter::None => g.stream(),
        _ => ts,
    }
}
