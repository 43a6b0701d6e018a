//! The sequence-typed value (§3, §4.2 "Sequences"): a flat, ordered list
//! of items, each either an XDM node or an atomic value. Nested
//! sequences never exist as a runtime shape — `Sequence` construction
//! (the `,` operator) flattens eagerly at the point of construction.

use std::fmt;
use xdm::{NodeId, Tree, TypedValue};

/// A single atomic value, per XDM atomization (GLOSSARY). This engine's
/// in-scope type system (§1 non-goal: full XSD arithmetic) only needs
/// these four primitives plus untyped string for comparisons and the
/// core function library.
#[derive(Debug, Clone, PartialEq)]
pub enum Atomic {
    String(String),
    Double(f64),
    Integer(i64),
    Boolean(bool),
}

impl Atomic {
    pub fn as_f64(&self) -> f64 {
        match self {
            Atomic::String(s) => s.trim().parse().unwrap_or(f64::NAN),
            Atomic::Double(d) => *d,
            Atomic::Integer(i) => *i as f64,
            Atomic::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    pub fn as_string(&self) -> String {
        match self {
            Atomic::String(s) => s.clone(),
            Atomic::Double(d) => format_double(*d),
            Atomic::Integer(i) => i.to_string(),
            Atomic::Boolean(b) => b.to_string(),
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            Atomic::String(s) => !s.is_empty(),
            Atomic::Double(d) => *d != 0.0 && !d.is_nan(),
            Atomic::Integer(i) => *i != 0,
            Atomic::Boolean(b) => *b,
        }
    }
}

pub fn format_double(d: f64) -> String {
    if d.is_nan() {
        "NaN".to_string()
    } else if d.is_infinite() {
        if d > 0.0 {
            "INF".to_string()
        } else {
            "-INF".to_string()
        }
    } else if d == d.trunc() && d.abs() < 1e15 {
        format!("{}", d as i64)
    } else {
        format!("{}", d)
    }
}

impl From<TypedValue> for Atomic {
    fn from(v: TypedValue) -> Self {
        match v {
            TypedValue::String(s) => Atomic::String(s),
            TypedValue::Boolean(b) => Atomic::Boolean(b),
            TypedValue::Double(d) => Atomic::Double(d),
            TypedValue::Integer(i) => Atomic::Integer(i),
            TypedValue::Sequence(mut seq) => {
                seq.pop().map(Atomic::from).unwrap_or(Atomic::String(String::new()))
            }
        }
    }
}

/// One item of a sequence: a node (identified within some `Tree`) or an
/// atomic value. Items never nest.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Node(NodeId),
    Atomic(Atomic),
}

impl Item {
    pub fn is_node(&self) -> bool {
        matches!(self, Item::Node(_))
    }

    /// Atomize this item (§4.2, GLOSSARY "Atomization"). A node needs a
    /// tree to resolve; an atomic item never does — `tree` is `None`
    /// whenever this runs during static analysis, or before a node's
    /// owning tree exists.
    pub fn atomize(&self, tree: Option<&Tree>) -> Result<Atomic, ()> {
        match self {
            Item::Node(id) => tree.map(|t| Atomic::from(t.typed_value(*id))).ok_or(()),
            Item::Atomic(a) => Ok(a.clone()),
        }
    }

    pub fn string_value(&self, tree: Option<&Tree>) -> Result<String, ()> {
        match self {
            Item::Node(id) => tree.map(|t| t.string_value(*id)).ok_or(()),
            Item::Atomic(a) => Ok(a.as_string()),
        }
    }
}

/// A sequence of items, in the order they were produced. Runtime
/// equivalent of "value" in §3.1.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sequence(pub Vec<Item>);

impl Sequence {
    pub fn empty() -> Self {
        Sequence(Vec::new())
    }

    pub fn single(item: Item) -> Self {
        Sequence(vec![item])
    }

    pub fn nodes(ids: impl IntoIterator<Item = NodeId>) -> Self {
        Sequence(ids.into_iter().map(Item::Node).collect())
    }

    pub fn atomic(a: Atomic) -> Self {
        Sequence(vec![Item::Atomic(a)])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.0.iter()
    }

    /// `,` construction: operands flatten into one flat sequence (§4.2).
    pub fn concat(parts: impl IntoIterator<Item = Sequence>) -> Self {
        let mut out = Vec::new();
        for p in parts {
            out.extend(p.0);
        }
        Sequence(out)
    }

    /// Document-order, duplicate-free normalization for node sequences
    /// (§5 "Ordering guarantees"). Atomic-only or mixed sequences pass
    /// through unchanged — the guarantee is specific to node results.
    pub fn normalize_nodes(mut self, tree: &Tree) -> Self {
        if self.0.iter().all(|it| it.is_node()) && !self.0.is_empty() {
            let mut seen = std::collections::HashSet::new();
            self.0.retain(|it| match it {
                Item::Node(id) => seen.insert(*id),
                Item::Atomic(_) => true,
            });
            self.0.sort_by(|a, b| match (a, b) {
                (Item::Node(x), Item::Node(y)) => tree.order(*x, *y),
                _ => std::cmp::Ordering::Equal,
            });
        }
        self
    }

    /// Effective boolean value (§4.2, invariant 6: "a pure function of
    /// the result sequence" — deliberately takes no tree/context).
    pub fn effective_boolean_value(&self) -> Result<bool, &'static str> {
        match self.0.as_slice() {
            [] => Ok(false),
            [Item::Node(_)] => Ok(true),
            [Item::Atomic(Atomic::Boolean(b))] => Ok(*b),
            [Item::Atomic(Atomic::String(s))] => Ok(!s.is_empty()),
            [Item::Atomic(Atomic::Double(d))] => Ok(*d != 0.0 && !d.is_nan()),
            [Item::Atomic(Atomic::Integer(i))] => Ok(*i != 0),
            _ => Err("effective boolean value is undefined for this sequence"),
        }
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|it| match it {
                Item::Node(id) => format!("node#{}", id.index()),
                Item::Atomic(a) => a.as_string(),
            })
            .collect();
        write!(f, "({})", parts.join(", "))
    }
}

impl IntoIterator for Sequence {
    type Item = Item;
    type IntoIter = std::vec::IntoIter<Item>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
