//! Tree builders (§4.3): three entry points, one per host tree shape,
//! plus a fourth for lazily-enumerated hosts (§3.2 "LazyElementNode").
//! Each performs a pre-order traversal, allocating nodes and assigning
//! monotonically increasing `position`s as it goes, validating
//! namespace/attribute integrity as it descends (`TreeError`).

use crate::arena::{Arena, NodeId, NodeKind, QName, Tree};
use crate::error::TreeError;
use crate::host::{HostChild, HostDocument, HostElement, HostMisc, LazyHostElement};
use indexmap::IndexMap;
use smol_str::SmolStr;

const XML_PREFIX: &str = "xml";
const XML_NS_URI: &str = "http://www.w3.org/XML/1998/namespace";

fn base_namespaces() -> IndexMap<Option<SmolStr>, SmolStr> {
    let mut m = IndexMap::new();
    m.insert(Some(SmolStr::new_inline(XML_PREFIX)), SmolStr::new(XML_NS_URI));
    m
}

/// Build a node tree from an ElementTree-style host: no document-level
/// comments/PIs, no element tails.
pub fn build_node_tree<'d, E: HostElement<'d>>(host_root: E) -> Result<Tree, TreeError> {
    let mut arena = Arena::new();
    let doc_id = arena.alloc_root(NodeKind::Document);
    let base = base_namespaces();
    let children = host_root.children();
    let root_id = build_element(&mut arena, doc_id, host_root, &base, children.into_iter())?;
    arena.get_mut(doc_id).children.push(root_id);
    Ok(arena.finish(doc_id))
}

/// Build a node tree from an lxml-style host: comments/PIs outside the
/// root element attach to a synthesized Document node, and each
/// element's tail text becomes a Text node sibling at the element's
/// position slot (§4.3).
pub fn build_lxml_node_tree<'d, D: HostDocument<'d>>(doc: &D) -> Result<Tree, TreeError> {
    let mut arena = Arena::new();
    let doc_id = arena.alloc_root(NodeKind::Document);

    for misc in doc.leading_misc() {
        let mid = alloc_misc(&mut arena, doc_id, misc);
        arena.get_mut(doc_id).children.push(mid);
    }

    let base = base_namespaces();
    let root_elem = doc.root_element();
    let children = root_elem.children();
    let root_id = build_element(&mut arena, doc_id, root_elem, &base, children.into_iter())?;
    arena.get_mut(doc_id).children.push(root_id);

    for misc in doc.trailing_misc() {
        let mid = alloc_misc(&mut arena, doc_id, misc);
        arena.get_mut(doc_id).children.push(mid);
    }

    Ok(arena.finish(doc_id))
}

/// Build a node tree from an XSD schema-node host. Traversal walks the
/// same child structure a normal element tree would (the particle
/// expansion this is meant to follow is the `SchemaProxy`'s job, a
/// collaborator per §1/§4.5); every element allocated this way is
/// tagged `is_schema_node` so static analysis can recognize it as a
/// `SchemaElementNode` (§3.2).
pub fn build_schema_node_tree<'d, E: HostElement<'d>>(host_root: E) -> Result<Tree, TreeError> {
    let mut arena = Arena::new();
    let doc_id = arena.alloc_root(NodeKind::Document);
    let base = base_namespaces();
    let children = host_root.children();
    let root_id = build_element(&mut arena, doc_id, host_root, &base, children.into_iter())?;
    mark_schema_subtree(&mut arena, root_id);
    arena.get_mut(doc_id).children.push(root_id);
    Ok(arena.finish(doc_id))
}

fn mark_schema_subtree(arena: &mut Arena, id: NodeId) {
    arena.get_mut(id).is_schema_node = true;
    let kids = arena.get_mut(id).children.clone();
    for k in kids {
        if matches!(arena.get_mut(k).kind, NodeKind::Element) {
            mark_schema_subtree(arena, k);
        }
    }
}

/// Build a node tree from a host whose children are enumerated lazily.
/// The iterator is drained exactly once, in order, the first (and
/// only) time the builder visits each element — this is "on demand"
/// relative to the host, even though the resulting arena is fully
/// materialized and immutable like any other (§3.2, §9 "Lazy
/// sequences").
pub fn build_lazy_node_tree<'d, E: LazyHostElement<'d>>(host_root: E) -> Result<Tree, TreeError> {
    let mut arena = Arena::new();
    let doc_id = arena.alloc_root(NodeKind::Document);
    let base = base_namespaces();
    let root_id = build_element_lazy(&mut arena, doc_id, host_root, &base)?;
    arena.get_mut(doc_id).children.push(root_id);
    Ok(arena.finish(doc_id))
}

/// Merges this element's own tag/attribute namespace bindings into
/// `inherited`, returning the element-local scope. Rejects two bindings
/// for the same prefix declared directly on this element that disagree
/// (§3.3 "invalid namespace declaration"), and rejects rebinding the
/// reserved `xml` prefix to anything but its fixed URI. Shadowing an
/// *inherited* binding is ordinary XML and not checked here.
fn merge_namespaces(
    inherited: &IndexMap<Option<SmolStr>, SmolStr>,
    own: impl IntoIterator<Item = (Option<SmolStr>, SmolStr)>,
) -> Result<IndexMap<Option<SmolStr>, SmolStr>, TreeError> {
    let mut local_ns = inherited.clone();
    let mut declared_here: IndexMap<Option<SmolStr>, SmolStr> = IndexMap::new();
    for (prefix, uri) in own {
        if prefix.as_deref() == Some(XML_PREFIX) && uri != XML_NS_URI {
            return Err(TreeError::InvalidNamespaceDeclaration(format!(
                "prefix 'xml' cannot be rebound to '{}'",
                uri
            )));
        }
        if let Some(existing) = declared_here.get(&prefix) {
            if *existing != uri {
                return Err(TreeError::InvalidNamespaceDeclaration(format!(
                    "prefix {:?} bound to both '{}' and '{}' on the same element",
                    prefix, existing, uri
                )));
            }
        }
        declared_here.insert(prefix.clone(), uri.clone());
        local_ns.insert(prefix, uri);
    }
    Ok(local_ns)
}

/// Rejects two attributes sharing the same expanded name (§3.3
/// "duplicate attribute").
fn check_no_duplicate_attrs<'a>(names: impl Iterator<Item = (Option<&'a str>, &'a str)>) -> Result<(), TreeError> {
    let mut seen = std::collections::HashSet::new();
    for (ns_uri, local) in names {
        if !seen.insert((ns_uri, local)) {
            let qualified = match ns_uri {
                Some(ns) => format!("{{{}}}{}", ns, local),
                None => local.to_string(),
            };
            return Err(TreeError::DuplicateAttribute(qualified));
        }
    }
    Ok(())
}

/// Same traversal as `build_element`, but every descendant's children
/// are pulled through `LazyHostElement::lazy_children` instead of the
/// eager `HostElement::children`.
fn build_element_lazy<'d, E: LazyHostElement<'d>>(
    arena: &mut Arena,
    parent: NodeId,
    elem: E,
    inherited: &IndexMap<Option<SmolStr>, SmolStr>,
) -> Result<NodeId, TreeError> {
    let id = arena.alloc(NodeKind::Element, parent);

    let tag = QName::with_ns(
        elem.tag_prefix().map(SmolStr::from),
        elem.tag_ns_uri().map(SmolStr::from),
        elem.tag_local(),
    );
    arena.get_mut(id).name = Some(tag.clone());

    let attrs = elem.attributes();
    check_no_duplicate_attrs(attrs.iter().map(|a| (a.ns_uri, a.local)))?;

    let mut own_bindings: Vec<(Option<SmolStr>, SmolStr)> = Vec::new();
    if let Some(uri) = &tag.ns_uri {
        own_bindings.push((tag.prefix.clone(), uri.clone()));
    }
    for a in &attrs {
        if let Some(uri) = a.ns_uri {
            own_bindings.push((a.prefix.map(SmolStr::from), SmolStr::from(uri)));
        }
    }
    let local_ns = merge_namespaces(inherited, own_bindings)?;

    for (prefix, uri) in local_ns.iter() {
        let ns_id = arena.alloc(NodeKind::Namespace, id);
        let nd = arena.get_mut(ns_id);
        nd.name = prefix.clone().map(QName::new);
        nd.value = Some(uri.to_string());
        arena.get_mut(id).namespaces.push(ns_id);
    }

    for a in &attrs {
        let attr_id = arena.alloc(NodeKind::Attribute, id);
        let qn = QName::with_ns(a.prefix.map(SmolStr::from), a.ns_uri.map(SmolStr::from), a.local);
        let nd = arena.get_mut(attr_id);
        nd.name = Some(qn);
        nd.value = Some(a.value.to_string());
        arena.get_mut(id).attributes.push(attr_id);
    }

    if let Some(t) = elem.text() {
        if !t.is_empty() {
            push_text(arena, id, t);
        }
    }

    for child in elem.lazy_children() {
        match child {
            HostChild::Element(ce) => {
                let cid = build_element_lazy(arena, id, ce, &local_ns)?;
                arena.get_mut(id).children.push(cid);
                if let Some(tail) = ce.tail() {
                    if !tail.is_empty() {
                        push_text(arena, id, tail);
                    }
                }
            }
            HostChild::Comment(text) => {
                let cid = arena.alloc(NodeKind::Comment, id);
                arena.get_mut(cid).value = Some(text.to_string());
                arena.get_mut(id).children.push(cid);
            }
            HostChild::ProcessingInstruction(target, data) => {
                let pid = arena.alloc(NodeKind::ProcessingInstruction, id);
                let nd = arena.get_mut(pid);
                nd.pi_target = Some(target.to_string());
                nd.value = Some(data.to_string());
                arena.get_mut(id).children.push(pid);
            }
        }
    }

    Ok(id)
}

fn alloc_misc(arena: &mut Arena, parent: NodeId, misc: HostMisc<'_>) -> NodeId {
    match misc {
        HostMisc::Comment(text) => {
            let id = arena.alloc(NodeKind::Comment, parent);
            arena.get_mut(id).value = Some(text.to_string());
            id
        }
        HostMisc::ProcessingInstruction(target, data) => {
            let id = arena.alloc(NodeKind::ProcessingInstruction, parent);
            let nd = arena.get_mut(id);
            nd.pi_target = Some(target.to_string());
            nd.value = Some(data.to_string());
            id
        }
    }
}

fn build_element<'d, E: HostElement<'d>>(
    arena: &mut Arena,
    parent: NodeId,
    elem: E,
    inherited: &IndexMap<Option<SmolStr>, SmolStr>,
    children_iter: impl Iterator<Item = HostChild<'d, E>>,
) -> Result<NodeId, TreeError> {
    let id = arena.alloc(NodeKind::Element, parent);

    let tag = QName::with_ns(
        elem.tag_prefix().map(SmolStr::from),
        elem.tag_ns_uri().map(SmolStr::from),
        elem.tag_local(),
    );
    arena.get_mut(id).name = Some(tag.clone());

    let attrs = elem.attributes();
    check_no_duplicate_attrs(attrs.iter().map(|a| (a.ns_uri, a.local)))?;

    // In-scope namespaces: inherited, plus whatever prefix/URI bindings
    // this element's own tag and attributes actually use (§3.3).
    let mut own_bindings: Vec<(Option<SmolStr>, SmolStr)> = Vec::new();
    if let Some(uri) = &tag.ns_uri {
        own_bindings.push((tag.prefix.clone(), uri.clone()));
    }
    for a in &attrs {
        if let Some(uri) = a.ns_uri {
            own_bindings.push((a.prefix.map(SmolStr::from), SmolStr::from(uri)));
        }
    }
    let local_ns = merge_namespaces(inherited, own_bindings)?;

    for (prefix, uri) in local_ns.iter() {
        let ns_id = arena.alloc(NodeKind::Namespace, id);
        let nd = arena.get_mut(ns_id);
        nd.name = prefix.clone().map(QName::new);
        nd.value = Some(uri.to_string());
        arena.get_mut(id).namespaces.push(ns_id);
    }

    for a in &attrs {
        let attr_id = arena.alloc(NodeKind::Attribute, id);
        let qn = QName::with_ns(a.prefix.map(SmolStr::from), a.ns_uri.map(SmolStr::from), a.local);
        let nd = arena.get_mut(attr_id);
        nd.name = Some(qn);
        nd.value = Some(a.value.to_string());
        arena.get_mut(id).attributes.push(attr_id);
    }

    if let Some(t) = elem.text() {
        if !t.is_empty() {
            push_text(arena, id, t);
        }
    }

    for child in children_iter {
        match child {
            HostChild::Element(ce) => {
                let grandchildren = ce.children();
                let cid = build_element(arena, id, ce, &local_ns, grandchildren.into_iter())?;
                arena.get_mut(id).children.push(cid);
                if let Some(tail) = ce.tail() {
                    if !tail.is_empty() {
                        push_text(arena, id, tail);
                    }
                }
            }
            HostChild::Comment(text) => {
                let cid = arena.alloc(NodeKind::Comment, id);
                arena.get_mut(cid).value = Some(text.to_string());
                arena.get_mut(id).children.push(cid);
            }
            HostChild::ProcessingInstruction(target, data) => {
                let pid = arena.alloc(NodeKind::ProcessingInstruction, id);
                let nd = arena.get_mut(pid);
                nd.pi_target = Some(target.to_string());
                nd.value = Some(data.to_string());
                arena.get_mut(id).children.push(pid);
            }
        }
    }

    Ok(id)
}

fn push_text(arena: &mut Arena, parent: NodeId, text: &str) {
    let tid = arena.alloc(NodeKind::Text, parent);
    arena.get_mut(tid).value = Some(text.to_string());
    arena.get_mut(parent).children.push(tid);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simple::SimpleXml;

    #[test]
    fn accepts_a_single_ordinary_attribute() {
        let doc = SimpleXml::parse(r#"<a x="1"/>"#);
        assert!(build_node_tree(doc.root()).is_ok());
    }

    #[test]
    fn rejects_duplicate_attribute_on_same_element() {
        let doc = SimpleXml::parse(r#"<a x="1" x="2"/>"#);
        assert!(matches!(build_node_tree(doc.root()), Err(TreeError::DuplicateAttribute(_))));
    }

    #[test]
    fn accepts_shadowing_an_inherited_namespace_binding() {
        let doc = SimpleXml::parse(r#"<a xmlns:p="urn:one"><b xmlns:p="urn:two"/></a>"#);
        assert!(build_node_tree(doc.root()).is_ok());
    }
}
