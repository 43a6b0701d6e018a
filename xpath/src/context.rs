//! Static and dynamic contexts (§3.3, §3.4), plus the configuration
//! types a caller builds them from (§3.5).

use crate::error::{EvalError, EvalResult, Error, ErrorCode, MissingContextError, Position};
use crate::value::Sequence;
use chrono::{DateTime, FixedOffset, Utc};
use indexmap::IndexMap;
use smol_str::SmolStr;
use std::sync::Arc;
use xdm::{NodeId, QName, SchemaProxy, Tree};

const XML_PREFIX: &str = "xml";
const XML_NS_URI: &str = "http://www.w3.org/XML/1998/namespace";

/// prefix → URI, seeded with the implicit `xml` binding (§3.3).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NamespaceMap(IndexMap<SmolStr, SmolStr>);

impl NamespaceMap {
    pub fn new() -> Self {
        let mut m = IndexMap::new();
        m.insert(SmolStr::new(XML_PREFIX), SmolStr::new(XML_NS_URI));
        NamespaceMap(m)
    }

    /// Rebinding `xml` is a static error in every XPath version; callers
    /// get `None` back instead of silently overwriting it.
    pub fn bind(&mut self, prefix: impl Into<SmolStr>, uri: impl Into<SmolStr>) -> Option<()> {
        let prefix = prefix.into();
        if prefix == XML_PREFIX {
            return None;
        }
        self.0.insert(prefix, uri.into());
        Some(())
    }

    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        self.0.get(prefix).map(|s| s.as_str())
    }
}

impl Default for NamespaceMap {
    fn default() -> Self {
        Self::new()
    }
}

/// Occurrence-indicator-qualified item type (GLOSSARY "Sequence type").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceType {
    Item(ItemTypeSpec, Occurrence),
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemTypeSpec {
    AnyItem,
    Node,
    Element(Option<QName>),
    Attribute(Option<QName>),
    Atomic(QName),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurrence {
    ExactlyOne,
    ZeroOrOne,
    ZeroOrMore,
    OneOrMore,
}

/// Static in-scope variables: QName → declared sequence type (§3.3).
#[derive(Debug, Clone, Default)]
pub struct VariableTypes(pub IndexMap<QName, SequenceType>);

impl VariableTypes {
    pub fn new() -> Self {
        VariableTypes(IndexMap::new())
    }

    pub fn declare(&mut self, name: QName, ty: SequenceType) {
        self.0.insert(name, ty);
    }

    pub fn contains(&self, name: &QName) -> bool {
        self.0.contains_key(name)
    }
}

/// Constructor keyword arguments mirrored from §6.3's
/// `XPath1Parser(namespaces?, ...)` / `XPath2Parser(..., default_namespace,
/// function_namespace, compatibility_mode, ...)`.
#[derive(Debug, Clone)]
pub struct ParserOptions {
    pub default_element_namespace: Option<SmolStr>,
    pub default_function_namespace: Option<SmolStr>,
    pub compatibility_mode: bool,
    pub strict: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions {
            default_element_namespace: None,
            default_function_namespace: None,
            compatibility_mode: false,
            strict: true,
        }
    }
}

/// A parser's configuration (§3.3). Shared (not mutated) by every AST
/// node produced from it — tokens reference it through the owning
/// `Parser`/`Selector`, never by copying state into themselves (§9
/// "Token ↔ parser back-reference").
pub struct StaticContext {
    pub namespaces: NamespaceMap,
    pub variables: VariableTypes,
    pub schema: Option<Arc<dyn SchemaProxy>>,
    pub options: ParserOptions,
}

impl StaticContext {
    pub fn new(options: ParserOptions) -> Self {
        StaticContext {
            namespaces: NamespaceMap::new(),
            variables: VariableTypes::new(),
            schema: None,
            options,
        }
    }

    pub fn resolve_element_prefix(&self, prefix: Option<&str>) -> Result<Option<SmolStr>, Error> {
        match prefix {
            Some(p) => self
                .namespaces
                .resolve(p)
                .map(SmolStr::new)
                .map(Some)
                .ok_or_else(|| {
                    Error::name_resolution(
                        ErrorCode::XPST0081,
                        Position::start(),
                        format!("unbound namespace prefix '{}'", p),
                    )
                }),
            None => Ok(self.options.default_element_namespace.clone()),
        }
    }
}

/// One stack frame of bound variables (§5 "Resource discipline",
/// §4.2 "Quantifiers/FLWOR"): pushed on `for`/`some`/`every`/function
/// call entry, popped on every exit path including errors.
#[derive(Debug, Clone, Default)]
struct VariableFrame {
    bindings: Vec<(QName, Sequence)>,
}

/// A cursor over a node tree during evaluation (§3.4). One
/// `DynamicContext` is built per top-level `select`/`iter_select` call
/// (§4.4) and never shared across evaluations that should see
/// independent foci.
pub struct DynamicContext<'t> {
    /// `None` during static analysis (§4.1 point 4): no tree exists yet,
    /// so any operator that needs one must raise `MissingContextError`.
    pub tree: Option<&'t Tree>,
    pub root: Option<NodeId>,
    /// Current focus: (item, position, size). `item` is `None` outside
    /// any focus (e.g. before path evaluation begins, or during static
    /// analysis).
    pub item: Option<crate::value::Item>,
    pub position: usize,
    pub size: usize,
    frames: Vec<VariableFrame>,
    pub uri: Option<String>,
    pub fragment: Option<String>,
    pub timezone: FixedOffset,
    current_dt: DateTime<FixedOffset>,
}

impl<'t> DynamicContext<'t> {
    pub fn new(tree: &'t Tree, root: NodeId) -> Self {
        let now: DateTime<Utc> = Utc::now();
        DynamicContext {
            tree: Some(tree),
            root: Some(root),
            item: Some(crate::value::Item::Node(root)),
            position: 1,
            size: 1,
            frames: vec![VariableFrame::default()],
            uri: None,
            fragment: None,
            timezone: FixedOffset::east_opt(0).unwrap(),
            current_dt: now.into(),
        }
    }

    /// The context used for §4.1 point 4's static evaluation pass: no
    /// tree, no context item, an empty variable frame. Any token whose
    /// `evaluate` truly needs dynamic data raises `MissingContextError`,
    /// which the caller (`Parser::parse`) catches and suppresses.
    pub fn static_analysis() -> DynamicContext<'static> {
        let now: DateTime<Utc> = Utc::now();
        DynamicContext {
            tree: None,
            root: None,
            item: None,
            position: 1,
            size: 1,
            frames: vec![VariableFrame::default()],
            uri: None,
            fragment: None,
            timezone: FixedOffset::east_opt(0).unwrap(),
            current_dt: now.into(),
        }
    }

    pub fn require_tree(&self) -> EvalResult<&'t Tree> {
        self.tree.ok_or_else(|| EvalError::from(MissingContextError))
    }

    pub fn require_item(&self) -> EvalResult<crate::value::Item> {
        self.item.clone().ok_or_else(|| EvalError::from(MissingContextError))
    }

    /// §3.4 invariant: read once per top-level evaluation, never
    /// changes afterward.
    pub fn current_dt(&self) -> DateTime<FixedOffset> {
        self.current_dt
    }

    pub fn push_frame(&mut self) {
        self.frames.push(VariableFrame::default());
    }

    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    pub fn bind_variable(&mut self, name: QName, value: Sequence) {
        self.frames.last_mut().expect("frame stack never empty").bindings.push((name, value));
    }

    pub fn lookup_variable(&self, name: &QName) -> Option<&Sequence> {
        for frame in self.frames.iter().rev() {
            for (n, v) in frame.bindings.iter().rev() {
                if n == name {
                    return Some(v);
                }
            }
        }
        None
    }
}
