//! The host tree capability set (§6.1): the minimal interface the core
//! needs from a foreign XML tree. A host never has to implement XDM
//! node semantics itself; it only exposes tags, text, children and
//! attributes, and the builders in `crate::build` do the rest.
//!
//! Node handles are expected to be small `Copy` types borrowing from a
//! backing document for lifetime `'d` (the shape used by `roxmltree`,
//! `sxd_document`, and similar arena-backed XML trees), which keeps this
//! trait free of associated iterator/GAT plumbing: a one-time pre-order
//! walk at tree-build time does not need zero-cost iteration.

/// One attribute as exposed by a host element.
#[derive(Debug, Clone, Copy)]
pub struct HostAttr<'d> {
    pub prefix: Option<&'d str>,
    pub ns_uri: Option<&'d str>,
    pub local: &'d str,
    pub value: &'d str,
}

/// What a host element's children contain: either another element, or
/// (lxml-style hosts only) a comment/PI interleaved with elements.
pub enum HostChild<'d, E> {
    Element(E),
    Comment(&'d str),
    ProcessingInstruction(&'d str, &'d str),
}

/// A host element: ElementTree-like or lxml-like, as long as it can
/// answer these questions about itself.
pub trait HostElement<'d>: Copy {
    fn tag_prefix(&self) -> Option<&'d str>;
    fn tag_ns_uri(&self) -> Option<&'d str>;
    fn tag_local(&self) -> &'d str;

    /// Text immediately inside this element, before its first child.
    fn text(&self) -> Option<&'d str>;

    /// Text following this element, up to (not including) the next
    /// sibling. Only lxml-style trees have this; ElementTree-style
    /// hosts return `None` always, and the builder drops it (§9 Open
    /// Questions: the default policy is to preserve where the host
    /// exposes it, drop otherwise).
    fn tail(&self) -> Option<&'d str> {
        None
    }

    fn attributes(&self) -> Vec<HostAttr<'d>>;

    fn children(&self) -> Vec<HostChild<'d, Self>>;

    /// Reference identity, used by diagnostics only; the arena never
    /// compares host elements for tree structure (it uses `NodeId` for
    /// that).
    fn host_identity(&self) -> usize;
}

/// A host document: the lxml-style entry point that additionally
/// exposes top-level comments/PIs outside the root element (§6.1, §4.3).
pub trait HostDocument<'d> {
    type Element: HostElement<'d>;

    fn root_element(&self) -> Self::Element;

    /// Comments/processing instructions that appear before the root
    /// element, in document order.
    fn leading_misc(&self) -> Vec<HostMisc<'d>> {
        Vec::new()
    }

    /// Comments/processing instructions that appear after the root
    /// element, in document order.
    fn trailing_misc(&self) -> Vec<HostMisc<'d>> {
        Vec::new()
    }
}

pub enum HostMisc<'d> {
    Comment(&'d str),
    ProcessingInstruction(&'d str, &'d str),
}

/// A host element whose children are produced lazily (§3.2
/// "LazyElementNode"). The builder consumes `lazy_children` once, in
/// order, at the point it first visits this element; the result is
/// still deterministic since it is driven by a single forward pass
/// (§3.2 invariant: "iterators must be deterministic").
pub trait LazyHostElement<'d>: HostElement<'d> {
    fn lazy_children(&self) -> Box<dyn Iterator<Item = HostChild<'d, Self>> + 'd>;
}
