//! Rules and the corpus the selector indexes.
//!
//! A [`Rule`] owns one or more "before" templates. Rules are grouped into [`Bundle`]s, which may
//! nest; a [`RuleCorpus`] flattens that tree into leaves, each keeping a back-pointer to the
//! bundle it came from.

use crate::ast::{extract_requirements, TemplateKind, TemplateSyntax};
use crate::config::Config;
use crate::tokens::{ungroup, MetaContext};
use crate::vocab::{Interner, RequirementSet};
use crate::{Error, Result};

use log::{debug, trace};
use proc_macro2::{Group, TokenStream};
use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};
use syn::parse::{Parse, ParseStream};

fn lex(s: &str) -> Result<TokenStream> {
    s.parse().map_err(|e: proc_macro2::LexError| Error::Lex(e.to_string()))
}

/// A "before" pattern: metavariable declarations and a body that uses them.
///
/// Only the source text is kept, so templates (and everything holding them) can be shared
/// across threads. The text is validated when the template is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    args: String,
    body: String,
    kind: TemplateKind,
}

impl Template {
    /// ```
    /// # use rulesieve::{Template, TemplateKind};
    /// let t = Template::parse("$v:expr", "$v.len() == 0").unwrap();
    /// assert_eq!(t.kind(), TemplateKind::Expr);
    /// ```
    pub fn parse(args: &str, body: &str) -> Result<Self> {
        Self::from_tokens(lex(args)?, lex(body)?)
    }

    pub fn from_tokens(args: TokenStream, body: TokenStream) -> Result<Self> {
        let kind = TemplateSyntax::parse(args.clone(), body.clone())?.kind();
        Ok(Template {
            args: args.to_string(),
            body: body.to_string(),
            kind,
        })
    }

    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    pub fn args(&self) -> &str {
        &self.args
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Declared metavariables, in declaration order.
    pub fn metavars(&self) -> Result<Vec<(String, crate::Fragment)>> {
        let cx = MetaContext::new(lex(&self.args)?)?;
        Ok(cx
            .metavars()
            .into_iter()
            .map(|(name, f)| (name.to_owned(), f))
            .collect())
    }

    pub(crate) fn syntax(&self) -> Result<TemplateSyntax> {
        TemplateSyntax::parse(lex(&self.args)?, lex(&self.body)?)
    }

    /// The alternative token sets a site must cover for this template to possibly match.
    pub fn requirements(&self, config: &Config) -> Result<BTreeSet<RequirementSet>> {
        let mut interner = Interner::new();
        Ok(extract_requirements(&self.syntax()?, config, &mut interner))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    name: String,
    templates: Vec<Template>,
}

impl Rule {
    pub fn new(name: impl Into<String>, templates: Vec<Template>) -> Result<Self> {
        let name = name.into();
        if templates.is_empty() {
            return Err(Error::EmptyRule(name));
        }
        Ok(Rule { name, templates })
    }

    /// A rule with a single template.
    pub fn single(name: impl Into<String>, args: &str, body: &str) -> Result<Self> {
        let name = name.into();
        let template = Template::parse(args, body).map_err(|e| e.in_rule(&name))?;
        Rule::new(name, vec![template])
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }
}

/// A node of the rule tree: a rule, or a bundle of further nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transformer {
    Rule(Rule),
    Bundle(Bundle),
}

impl From<Rule> for Transformer {
    fn from(r: Rule) -> Self {
        Transformer::Rule(r)
    }
}

impl From<Bundle> for Transformer {
    fn from(b: Bundle) -> Self {
        Transformer::Bundle(b)
    }
}

/// A named group of rules and nested bundles that are loaded together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    name: String,
    members: Vec<Transformer>,
}

/// The arms of a `macro_rules!` definition.
struct Arms(Vec<(TokenStream, TokenStream)>);

impl Parse for Arms {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut arms = Vec::new();
        while !input.is_empty() {
            let matcher: Group = input.parse()?;
            input.parse::<syn::Token![=>]>()?;
            let body: Group = input.parse()?;
            arms.push((matcher.stream(), ungroup(body.stream())));
            if input.is_empty() {
                break;
            }
            input.parse::<syn::Token![;]>()?;
        }
        Ok(Arms(arms))
    }
}

impl Bundle {
    pub fn new(name: impl Into<String>) -> Self {
        Bundle {
            name: name.into(),
            members: Vec::new(),
        }
    }

    pub fn with(mut self, member: impl Into<Transformer>) -> Self {
        self.push(member);
        self
    }

    pub fn push(&mut self, member: impl Into<Transformer>) {
        self.members.push(member.into());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[Transformer] {
        &self.members
    }

    /// Load a bundle from Rust source.
    ///
    /// Every `macro_rules!` definition is a rule, each of its arms one template: the matcher
    /// declares the metavariables and the transcriber is the template body. An inline `mod`
    /// becomes a nested bundle. Other items are ignored.
    ///
    /// ```
    /// # use rulesieve::Bundle;
    /// let b = Bundle::parse("strings", r#"
    ///     macro_rules! empty_len {
    ///         ($s:expr) => { $s.len() == 0 };
    ///         ($s:expr) => { 0 == $s.len() };
    ///     }
    ///     mod nested {
    ///         macro_rules! clone_to_owned { ($s:expr) => { $s.clone().to_owned() } }
    ///     }
    /// "#).unwrap();
    /// assert_eq!(b.members().len(), 2);
    /// ```
    pub fn parse(name: impl Into<String>, src: &str) -> Result<Self> {
        let file: syn::File = syn::parse_str(src)?;
        Self::from_items(name.into(), &file.items)
    }

    fn from_items(name: String, items: &[syn::Item]) -> Result<Self> {
        let mut bundle = Bundle::new(name);
        for item in items {
            match item {
                syn::Item::Macro(m) if m.mac.path.is_ident("macro_rules") => {
                    let rule_name = match &m.ident {
                        Some(id) => id.to_string(),
                        None => continue,
                    };
                    let rule = Self::rule_from_macro(&rule_name, &m.mac)
                        .map_err(|e| e.in_rule(&rule_name))?;
                    trace!("{}: loaded rule {}", bundle.name, rule_name);
                    bundle.push(rule);
                }
                syn::Item::Mod(m) => match &m.content {
                    Some((_, items)) => {
                        let nested = Self::from_items(m.ident.to_string(), items)?;
                        bundle.push(nested);
                    }
                    None => debug!("{}: skipping out-of-line mod {}", bundle.name, m.ident),
                },
                _ => (),
            }
        }
        Ok(bundle)
    }

    fn rule_from_macro(name: &str, mac: &syn::Macro) -> Result<Rule> {
        let Arms(arms) = mac.parse_body()?;
        let templates = arms
            .into_iter()
            .map(|(args, body)| Template::from_tokens(args, body))
            .collect::<Result<Vec<_>>>()?;
        Rule::new(name, templates)
    }
}

/// Handle to a rule in a [`RuleCorpus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(u32);

impl RuleId {
    pub(crate) fn new(index: usize) -> Self {
        RuleId(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle to a bundle in a [`RuleCorpus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BundleId(u32);

impl BundleId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// What remains of a bundle once its rules have been flattened out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleInfo {
    name: String,
    parent: Option<BundleId>,
}

impl BundleInfo {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<BundleId> {
        self.parent
    }
}

#[derive(Debug, Clone)]
struct Leaf {
    rule: Rule,
    bundle: Option<BundleId>,
}

/// Flattened rule tree: every rule is a leaf, identified by a [`RuleId`].
#[derive(Debug, Clone, Default)]
pub struct RuleCorpus {
    rules: Vec<Leaf>,
    bundles: Vec<BundleInfo>,
}

impl RuleCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, member: impl Into<Transformer>) {
        self.flatten(member.into(), None);
    }

    fn flatten(&mut self, t: Transformer, parent: Option<BundleId>) {
        match t {
            Transformer::Rule(rule) => self.rules.push(Leaf {
                rule,
                bundle: parent,
            }),
            Transformer::Bundle(Bundle { name, members }) => {
                let id = BundleId(self.bundles.len() as u32);
                self.bundles.push(BundleInfo { name, parent });
                for m in members {
                    self.flatten(m, Some(id));
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rules
            .iter()
            .enumerate()
            .map(|(i, leaf)| (RuleId::new(i), &leaf.rule))
    }

    pub fn get(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(id.index()).map(|leaf| &leaf.rule)
    }

    /// The bundle `id` was loaded from, if any.
    pub fn bundle_of(&self, id: RuleId) -> Option<BundleId> {
        self.rules.get(id.index()).and_then(|leaf| leaf.bundle)
    }

    pub fn bundle(&self, id: BundleId) -> Option<&BundleInfo> {
        self.bundles.get(id.index())
    }

    /// Path of bundle names down to the rule, e.g. `strings::nested::clone_to_owned`.
    pub fn qualified_name(&self, id: RuleId) -> Option<String> {
        let leaf = self.rules.get(id.index())?;
        let mut parts = vec![leaf.rule.name()];
        let mut next = leaf.bundle;
        while let Some(b) = next.and_then(|b| self.bundle(b)) {
            parts.push(b.name());
            next = b.parent;
        }
        parts.reverse();
        Some(parts.join("::"))
    }

    /// Keep only the rules whose qualified name satisfies `keep`. Ids are reassigned.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        let verdicts: Vec<bool> = (0..self.rules.len())
            .map(|i| {
                self.qualified_name(RuleId::new(i))
                    .map_or(false, |name| keep(&name))
            })
            .collect();
        let before = self.rules.len();
        let mut verdicts = verdicts.into_iter();
        self.rules.retain(|_| verdicts.next().unwrap_or(false));
        debug!("name filter kept {} of {} rules", self.rules.len(), before);
    }
}

impl<T: Into<Transformer>> FromIterator<T> for RuleCorpus {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut corpus = RuleCorpus::new();
        for t in iter {
            corpus.add(t);
        }
        corpus
    }
}

impl Display for RuleId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
