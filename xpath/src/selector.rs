//! The public facade (§6, C7): `Parser1`/`Parser2` compile a source
//! string against a `StaticContext` into a `Selector`; `Selector::select`
//! and the top-level `select`/`iter_select` drive a host tree through
//! it. Mirrors the constructor-then-`.parse()`-then-`.select()` shape
//! the ambient stack already follows for "compile once, apply many
//! times" components.

use crate::context::{DynamicContext, ItemTypeSpec, Occurrence, ParserOptions, SequenceType, StaticContext};
use crate::error::Error;
use crate::eval::{evaluate, static_check};
use crate::parser::Parser;
use crate::value::{Item, Sequence};
use indexmap::IndexMap;
use smol_str::SmolStr;
use std::sync::Arc;
use xdm::{HostElement, QName, SchemaProxy, Tree};

/// In-scope variable bindings (§3.4, §6.3 "variables?"): a builder
/// collects these via `.variable(name, value)`, and every
/// `DynamicContext` the resulting `Selector` builds is seeded with them
/// through `bind_variable` before evaluation starts.
#[derive(Debug, Clone, Default)]
pub struct Variables(IndexMap<QName, Sequence>);

impl Variables {
    pub fn new() -> Self {
        Variables(IndexMap::new())
    }

    pub fn bind(&mut self, name: QName, value: Sequence) {
        self.0.insert(name, value);
    }
}

/// A compiled expression plus the static context it was compiled
/// against (§6.3). Re-running `select`/`select_nodes` against a
/// different tree re-evaluates the same `Expr` from scratch — no
/// per-selection state is cached on `Selector` itself.
pub struct Selector {
    #[allow(dead_code)]
    ctx: StaticContext,
    expr: crate::ast::Expr,
    variables: Variables,
}

impl Selector {
    /// Evaluates against an already-built tree, with `context_node` as
    /// the initial context item (§3.4), binding only the variables the
    /// parser was given.
    pub fn select_nodes(&self, tree: &Tree, context_node: xdm::NodeId) -> Result<Sequence, Error> {
        self.select_nodes_with(tree, context_node, &Variables::new())
    }

    /// Like `select_nodes`, plus per-call variable bindings layered on
    /// top of (and overriding, by name) the ones bound on the parser.
    /// This is the primitive every other entry point funnels through.
    pub fn select_nodes_with(&self, tree: &Tree, context_node: xdm::NodeId, extra: &Variables) -> Result<Sequence, Error> {
        let mut dyn_ctx = DynamicContext::new(tree, tree.root());
        dyn_ctx.item = Some(Item::Node(context_node));
        for (name, value) in self.variables.0.iter() {
            dyn_ctx.bind_variable(name.clone(), value.clone());
        }
        for (name, value) in extra.0.iter() {
            dyn_ctx.bind_variable(name.clone(), value.clone());
        }
        evaluate(&self.expr, &mut dyn_ctx).map_err(|e| e.into_public(self.expr.position))
    }

    /// Builds a node tree from a host element and evaluates this
    /// selector with the document root as the initial context item
    /// (§4.4 "select(expr, root)"). Returns the built `Tree` alongside
    /// the result sequence since a `NodeId` in the result is only
    /// meaningful against that tree.
    pub fn select<'d, E: HostElement<'d>>(&self, host_root: E) -> Result<(Tree, Sequence), Error> {
        let tree = xdm::build::build_node_tree(host_root).map_err(Error::from_tree_error)?;
        let root = tree.root();
        let seq = self.select_nodes(&tree, root)?;
        Ok((tree, seq))
    }

    /// Like `select`, but exposes the context item one at a time as an
    /// iterator of individually-evaluated result sequences — the
    /// `iter_select` variant named in §4.4, useful when a caller wants
    /// to short-circuit without materializing every result.
    pub fn iter_select<'t>(
        &'t self,
        tree: &'t Tree,
        context_nodes: impl IntoIterator<Item = xdm::NodeId> + 't,
    ) -> impl Iterator<Item = Result<Sequence, Error>> + 't {
        context_nodes.into_iter().map(move |n| self.select_nodes(tree, n))
    }
}

/// Declares `name` as an in-scope variable of unconstrained type in
/// `ctx`, the way a real static type declaration would if this crate
/// tracked bound-value types instead of just declared ones (§3.3).
fn declare_any(ctx: &mut StaticContext, name: &QName) {
    ctx.variables.declare(name.clone(), SequenceType::Item(ItemTypeSpec::AnyItem, Occurrence::ZeroOrMore));
}

/// Builder for an XPath 1.0 selector (§6.3 "XPath1Parser").
pub struct Parser1 {
    ctx: StaticContext,
    variables: Variables,
}

impl Parser1 {
    pub fn new() -> Self {
        let mut options = ParserOptions::default();
        options.compatibility_mode = true;
        Parser1 { ctx: StaticContext::new(options), variables: Variables::new() }
    }

    pub fn namespace(mut self, prefix: impl Into<SmolStr>, uri: impl Into<SmolStr>) -> Self {
        self.ctx.namespaces.bind(prefix, uri);
        self
    }

    pub fn schema(mut self, schema: Arc<dyn SchemaProxy>) -> Self {
        self.ctx.schema = Some(schema);
        self
    }

    /// Binds an in-scope variable (§3.4, §6.3 "variables?"): declares it
    /// statically so a bare `$name` parses and type-checks, and records
    /// its value so `Selector::select*` can resolve it without the
    /// caller threading `Variables` through by hand.
    pub fn variable(mut self, name: QName, value: Sequence) -> Self {
        declare_any(&mut self.ctx, &name);
        self.variables.bind(name, value);
        self
    }

    /// Compiles `source`, running the §4.1 point 4 static-analysis pass
    /// (no dynamic context) so type/arity errors surface here rather
    /// than at first `select`.
    pub fn parse(&self, source: &str) -> Result<Selector, Error> {
        let expr = Parser::parse_source(&self.ctx, source)?;
        static_check(&expr)?;
        Ok(Selector { ctx: clone_static_context(&self.ctx), expr, variables: self.variables.clone() })
    }
}

impl Default for Parser1 {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for an XPath 2.0 selector (§6.3 "XPath2Parser"): same shape,
/// plus the extra namespace/compatibility knobs XPath 2.0 exposes.
pub struct Parser2 {
    ctx: StaticContext,
    variables: Variables,
}

impl Parser2 {
    pub fn new() -> Self {
        Parser2 { ctx: StaticContext::new(ParserOptions::default()), variables: Variables::new() }
    }

    pub fn namespace(mut self, prefix: impl Into<SmolStr>, uri: impl Into<SmolStr>) -> Self {
        self.ctx.namespaces.bind(prefix, uri);
        self
    }

    pub fn default_element_namespace(mut self, uri: impl Into<SmolStr>) -> Self {
        self.ctx.options.default_element_namespace = Some(uri.into());
        self
    }

    pub fn default_function_namespace(mut self, uri: impl Into<SmolStr>) -> Self {
        self.ctx.options.default_function_namespace = Some(uri.into());
        self
    }

    pub fn schema(mut self, schema: Arc<dyn SchemaProxy>) -> Self {
        self.ctx.schema = Some(schema);
        self
    }

    pub fn variable(mut self, name: QName, value: Sequence) -> Self {
        declare_any(&mut self.ctx, &name);
        self.variables.bind(name, value);
        self
    }

    pub fn parse(&self, source: &str) -> Result<Selector, Error> {
        let expr = Parser::parse_source(&self.ctx, source)?;
        static_check(&expr)?;
        Ok(Selector { ctx: clone_static_context(&self.ctx), expr, variables: self.variables.clone() })
    }
}

impl Default for Parser2 {
    fn default() -> Self {
        Self::new()
    }
}

fn clone_static_context(ctx: &StaticContext) -> StaticContext {
    StaticContext {
        namespaces: ctx.namespaces.clone(),
        variables: ctx.variables.clone(),
        schema: ctx.schema.clone(),
        options: ctx.options.clone(),
    }
}

/// §4.4 "select(expr, root)": parses `source` once and runs it
/// immediately — convenience wrapper around `Parser1`/`Selector` for
/// one-shot callers who don't need to reuse a compiled expression or
/// bind variables.
pub fn select<'d, E: HostElement<'d>>(source: &str, root: E) -> Result<(Tree, Sequence), Error> {
    let selector = Parser1::new().parse(source)?;
    selector.select(root)
}

/// §4.4 "iter_select": one-shot parse plus the per-context-node
/// iterator variant.
pub fn iter_select<'t>(
    source: &str,
    tree: &'t Tree,
    context_nodes: impl IntoIterator<Item = xdm::NodeId> + 't,
) -> Result<Vec<Result<Sequence, Error>>, Error> {
    let selector = Parser1::new().parse(source)?;
    Ok(context_nodes.into_iter().map(|n| selector.select_nodes(tree, n)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Atomic;
    use xdm::simple::SimpleXml;

    #[test]
    fn variable_bound_on_parser_is_visible_to_a_bare_var_ref() {
        let doc = SimpleXml::parse("<a/>");
        let selector = Parser1::new().variable(QName::new("limit"), Sequence::atomic(Atomic::Integer(3))).parse("$limit").unwrap();
        let (_, seq) = selector.select(doc.root()).unwrap();
        assert_eq!(seq.0, vec![Item::Atomic(Atomic::Integer(3))]);
    }

    #[test]
    fn select_nodes_with_overrides_a_parser_bound_variable() {
        let doc = SimpleXml::parse("<a/>");
        let selector = Parser1::new().variable(QName::new("x"), Sequence::atomic(Atomic::Integer(1))).parse("$x").unwrap();
        let tree = xdm::build::build_node_tree(doc.root()).unwrap();
        let mut extra = Variables::new();
        extra.bind(QName::new("x"), Sequence::atomic(Atomic::Integer(9)));
        let seq = selector.select_nodes_with(&tree, tree.root(), &extra).unwrap();
        assert_eq!(seq.0, vec![Item::Atomic(Atomic::Integer(9))]);
    }
}
