//! The thirteen XPath axes (§4.3), each a lazy ordered traversal over a
//! `Tree`. Forward axes are produced in document order; reverse axes
//! (`ancestor`, `ancestor-or-self`, `preceding`, `preceding-sibling`)
//! are produced in reverse document order at the axis-step level, since
//! that is what `position()`/`last()` inside a predicate must see for
//! those axes — callers composing a path re-sort into document order
//! (`crate::arena::Tree::order` plus a final dedup), which the `xpath`
//! crate's evaluator does when it flattens a step's results back into
//! the main sequence.

use crate::arena::{NodeId, NodeKind, Tree};

pub fn child(tree: &Tree, node: NodeId) -> Vec<NodeId> {
    tree.children(node).to_vec()
}

pub fn attribute(tree: &Tree, node: NodeId) -> Vec<NodeId> {
    if tree.kind(node) == NodeKind::Element {
        tree.attributes(node).to_vec()
    } else {
        Vec::new()
    }
}

pub fn namespace(tree: &Tree, node: NodeId) -> Vec<NodeId> {
    if tree.kind(node) == NodeKind::Element {
        tree.namespaces(node).to_vec()
    } else {
        Vec::new()
    }
}

pub fn self_axis(_tree: &Tree, node: NodeId) -> Vec<NodeId> {
    vec![node]
}

pub fn parent(tree: &Tree, node: NodeId) -> Vec<NodeId> {
    tree.parent(node).into_iter().collect()
}

pub fn descendant(tree: &Tree, node: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    collect_descendants(tree, node, &mut out);
    out
}

pub fn descendant_or_self(tree: &Tree, node: NodeId) -> Vec<NodeId> {
    let mut out = vec![node];
    collect_descendants(tree, node, &mut out);
    out
}

fn collect_descendants(tree: &Tree, node: NodeId, out: &mut Vec<NodeId>) {
    for &child in tree.children(node) {
        out.push(child);
        collect_descendants(tree, child, out);
    }
}

/// Nearest ancestor first (reverse document order).
pub fn ancestor(tree: &Tree, node: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut cur = tree.parent(node);
    while let Some(id) = cur {
        out.push(id);
        cur = tree.parent(id);
    }
    out
}

/// `node` itself, then its ancestors nearest-first.
pub fn ancestor_or_self(tree: &Tree, node: NodeId) -> Vec<NodeId> {
    let mut out = vec![node];
    out.extend(ancestor(tree, node));
    out
}

pub fn following_sibling(tree: &Tree, node: NodeId) -> Vec<NodeId> {
    match tree.parent(node) {
        None => Vec::new(),
        Some(p) => {
            let siblings = tree.children(p);
            match siblings.iter().position(|&n| n == node) {
                Some(i) => siblings[i + 1..].to_vec(),
                None => Vec::new(),
            }
        }
    }
}

/// Nearest preceding sibling first (reverse document order).
pub fn preceding_sibling(tree: &Tree, node: NodeId) -> Vec<NodeId> {
    match tree.parent(node) {
        None => Vec::new(),
        Some(p) => {
            let siblings = tree.children(p);
            match siblings.iter().position(|&n| n == node) {
                Some(i) => siblings[..i].iter().rev().copied().collect(),
                None => Vec::new(),
            }
        }
    }
}

/// All nodes in document order that are after `node` and not its
/// descendant (§4.3 "document-order scan excluding ancestors/
/// descendants").
pub fn following(tree: &Tree, node: NodeId) -> Vec<NodeId> {
    let excluded: std::collections::HashSet<NodeId> = descendant_or_self(tree, node).into_iter().collect();
    let pos = tree.position(node);
    let mut out = Vec::new();
    collect_following(tree, tree.root(), pos, &excluded, &mut out);
    out
}

fn collect_following(
    tree: &Tree,
    node: NodeId,
    after: u32,
    excluded: &std::collections::HashSet<NodeId>,
    out: &mut Vec<NodeId>,
) {
    if !excluded.contains(&node) && tree.position(node) > after {
        out.push(node);
    }
    for &child in tree.children(node) {
        collect_following(tree, child, after, excluded, out);
    }
}

/// All nodes before `node`, not its ancestor, in reverse document
/// order (§4.3).
pub fn preceding(tree: &Tree, node: NodeId) -> Vec<NodeId> {
    let excluded: std::collections::HashSet<NodeId> = ancestor_or_self(tree, node).into_iter().collect();
    let pos = tree.position(node);
    let mut out = Vec::new();
    collect_preceding(tree, tree.root(), pos, &excluded, &mut out);
    out.sort_by(|a, b| tree.position(*b).cmp(&tree.position(*a)));
    out
}

fn collect_preceding(
    tree: &Tree,
    node: NodeId,
    before: u32,
    excluded: &std::collections::HashSet<NodeId>,
    out: &mut Vec<NodeId>,
) {
    if !excluded.contains(&node) && tree.position(node) < before {
        out.push(node);
    }
    for &child in tree.children(node) {
        collect_preceding(tree, child, before, excluded, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simple::SimpleXml;

    fn tree(xml: &str) -> Tree {
        let doc = SimpleXml::parse(xml);
        crate::build::build_node_tree(doc.root()).unwrap()
    }

    #[test]
    fn child_axis_lists_elements_in_order() {
        let t = tree("<A><B1/><B2><C1/><C2/><C3/></B2></A>");
        let root = t.children(t.root())[0];
        let b2 = t.children(root)[1];
        let kids = child(&t, b2);
        let names: Vec<_> = kids.iter().map(|&n| t.name(n).unwrap().local.to_string()).collect();
        assert_eq!(names, vec!["C1", "C2", "C3"]);
    }

    #[test]
    fn ancestor_then_child_round_trips_to_self() {
        let t = tree("<A><B><C/></B></A>");
        let root = t.children(t.root())[0];
        let b = t.children(root)[0];
        let c = t.children(b)[0];
        let back = ancestor(&t, c);
        assert_eq!(back, vec![b, root]);
        assert!(child(&t, b).contains(&c));
    }

    #[test]
    fn following_excludes_ancestors_and_descendants() {
        let t = tree("<A><B><C/></B><D/></A>");
        let root = t.children(t.root())[0];
        let b = t.children(root)[0];
        let d = t.children(root)[1];
        let c = t.children(b)[0];
        let f = following(&t, b);
        assert_eq!(f, vec![d]);
        assert!(!f.contains(&c));
    }
}
