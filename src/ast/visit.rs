use super::names::{self, OperatorToken};

use syn::visit::Visit;

/// The syntax-node categories that carry tokens.
///
/// The walker classifies every node it passes into one of these or into nothing at all; the
/// extractors only ever see this closed set. Both extraction sides go through the same walker,
/// so a node kind lowers to the same tokens for rules and for sites.
pub enum Node<'a> {
    /// A path in expression, type, pattern or macro position: every segment is a token.
    Path(&'a syn::Path),
    /// Name of a called method, an accessed field, or a field in a struct literal or pattern.
    Member(&'a syn::Ident),
    Operator(&'static str),
    LitInt(&'a syn::LitInt),
}

fn classify(x: &syn::Expr) -> Option<Node<'_>> {
    use syn::Expr::*;
    match x {
        Binary(e) => e.op.token().map(Node::Operator),
        Unary(e) => e.op.token().map(Node::Operator),
        Assign(..) => Some(Node::Operator(names::ASSIGN)),
        Reference(e) if e.mutability.is_some() => Some(Node::Operator(names::REF_MUT)),
        Reference(..) => Some(Node::Operator(names::REF)),
        Try(..) => Some(Node::Operator(names::TRY)),
        Cast(..) => Some(Node::Operator(names::CAST)),
        Index(..) => Some(Node::Operator(names::INDEX)),
        Await(..) => Some(Node::Operator(names::AWAIT)),
        Range(e) => e.limits.token().map(Node::Operator),
        MethodCall(e) => Some(Node::Member(&e.method)),
        Field(e) => member(&e.member),
        // paths and literals are reported from their own visit hooks
        _ => None,
    }
}

fn member(m: &syn::Member) -> Option<Node<'_>> {
    match m {
        syn::Member::Named(id) => Some(Node::Member(id)),
        syn::Member::Unnamed(..) => None,
    }
}

/// The grammar a macro invocation stands in for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// An expression, a statement or an item.
    Expr,
    Pat,
    Type,
}

pub trait Visitor {
    fn node(&mut self, node: Node<'_>);

    /// Called for every macro invocation before its path is walked; `Err` skips the invocation.
    fn open_macro(&mut self, _: &syn::Macro, _: Position) -> Result<(), ()> {
        Ok(())
    }
}

/// A syntax tree that can be lowered to tokens: a code site, or a template body.
pub trait Visitable {
    fn apply<V: Visitor>(&self, v: &mut V);
}

impl Visitable for syn::Expr {
    fn apply<V: Visitor>(&self, v: &mut V) {
        SynVis { inner: v }.visit_expr(self);
    }
}

impl Visitable for syn::Stmt {
    fn apply<V: Visitor>(&self, v: &mut V) {
        SynVis { inner: v }.visit_stmt(self);
    }
}

impl Visitable for [syn::Stmt] {
    fn apply<V: Visitor>(&self, v: &mut V) {
        let mut v = SynVis { inner: v };
        for s in self {
            v.visit_stmt(s);
        }
    }
}

impl Visitable for syn::Block {
    fn apply<V: Visitor>(&self, v: &mut V) {
        SynVis { inner: v }.visit_block(self);
    }
}

impl Visitable for syn::Pat {
    fn apply<V: Visitor>(&self, v: &mut V) {
        SynVis { inner: v }.visit_pat(self);
    }
}

impl Visitable for syn::Type {
    fn apply<V: Visitor>(&self, v: &mut V) {
        SynVis { inner: v }.visit_type(self);
    }
}

impl Visitable for syn::Item {
    fn apply<V: Visitor>(&self, v: &mut V) {
        SynVis { inner: v }.visit_item(self);
    }
}

impl Visitable for syn::ItemFn {
    fn apply<V: Visitor>(&self, v: &mut V) {
        SynVis { inner: v }.visit_item_fn(self);
    }
}

impl Visitable for syn::ImplItemFn {
    fn apply<V: Visitor>(&self, v: &mut V) {
        SynVis { inner: v }.visit_impl_item_fn(self);
    }
}

impl Visitable for syn::File {
    fn apply<V: Visitor>(&self, v: &mut V) {
        SynVis { inner: v }.visit_file(self);
    }
}

/// Outer visitor ensures AST->token lowering is consistent for different traversal modes
struct SynVis<'v, V> {
    inner: &'v mut V,
}

impl<V: Visitor> SynVis<'_, V> {
    fn macro_at(&mut self, x: &syn::Macro, position: Position) {
        if let Err(()) = self.inner.open_macro(x, position) {
            return;
        }
        syn::visit::visit_macro(self, x);
    }
}

impl<'ast, 'v, V: Visitor> Visit<'ast> for SynVis<'v, V> {
    fn visit_expr(&mut self, x: &'ast syn::Expr) {
        if let Some(node) = classify(x) {
            self.inner.node(node);
        }
        syn::visit::visit_expr(self, x);
    }

    fn visit_path(&mut self, x: &'ast syn::Path) {
        self.inner.node(Node::Path(x));
        syn::visit::visit_path(self, x);
    }

    fn visit_field_value(&mut self, x: &'ast syn::FieldValue) {
        if let Some(node) = member(&x.member) {
            self.inner.node(node);
        }
        syn::visit::visit_field_value(self, x);
    }

    fn visit_field_pat(&mut self, x: &'ast syn::FieldPat) {
        if let Some(node) = member(&x.member) {
            self.inner.node(node);
        }
        syn::visit::visit_field_pat(self, x);
    }

    fn visit_lit_int(&mut self, x: &'ast syn::LitInt) {
        self.inner.node(Node::LitInt(x));
    }

    fn visit_pat(&mut self, x: &'ast syn::Pat) {
        match x {
            syn::Pat::Macro(m) => self.macro_at(&m.mac, Position::Pat),
            _ => syn::visit::visit_pat(self, x),
        }
    }

    fn visit_type(&mut self, x: &'ast syn::Type) {
        match x {
            syn::Type::Macro(m) => self.macro_at(&m.mac, Position::Type),
            _ => syn::visit::visit_type(self, x),
        }
    }

    fn visit_macro(&mut self, x: &'ast syn::Macro) {
        self.macro_at(x, Position::Expr);
    }

    // function headers are left out on the rule and the site side alike
    fn visit_signature(&mut self, _: &'ast syn::Signature) {}

    // attributes never take part in a match
    fn visit_attribute(&mut self, _: &'ast syn::Attribute) {}
}
