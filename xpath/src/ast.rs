//! The AST: a closed set of node kinds (§9 "Token classes as both
//! grammar and AST" — "model tokens as a closed set of variants with a
//! TokenSpec registry"). Each `Expr` pairs an `Op` discriminant with its
//! operand subtrees and source position; `Op` plays the role of the
//! spec's per-symbol `eval_fn` by being matched once, exhaustively, in
//! `crate::eval` rather than carrying a function pointer per node —
//! sound here because the operator set is closed at compile time and a
//! match arm per `Op` variant is the idiomatic equivalent.

use crate::error::Position;
use xdm::QName;

/// The thirteen axes (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    Attribute,
    SelfAxis,
    DescendantOrSelf,
    FollowingSibling,
    Following,
    Namespace,
    Parent,
    Ancestor,
    PrecedingSibling,
    Preceding,
    AncestorOrSelf,
}

impl Axis {
    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Axis::Ancestor | Axis::AncestorOrSelf | Axis::Preceding | Axis::PrecedingSibling
        )
    }

    /// Missing axis defaults to `child::`, except a leading `@` which
    /// defaults to `attribute::` (§4.2).
    pub fn default_principal_kind(self) -> xdm::NodeKind {
        match self {
            Axis::Attribute => xdm::NodeKind::Attribute,
            Axis::Namespace => xdm::NodeKind::Namespace,
            _ => xdm::NodeKind::Element,
        }
    }
}

/// Name tests and kind tests (§4.2).
#[derive(Debug, Clone, PartialEq)]
pub enum NodeTest {
    /// `ns:local`, `*:local` (prefix `None`, any namespace), or
    /// unprefixed (resolved against default element/attribute namespace
    /// per axis principal kind at static-analysis time, already baked
    /// into `ns_uri` here).
    Name { ns_uri: Option<NameNsFilter>, local: LocalNameFilter },
    Node,
    Text,
    Comment,
    ProcessingInstruction(Option<String>),
    Element,
    Attribute,
    DocumentNode,
    SchemaElement(QName),
    SchemaAttribute(QName),
}

#[derive(Debug, Clone, PartialEq)]
pub enum NameNsFilter {
    Any,
    Exact(Option<smol_str::SmolStr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocalNameFilter {
    Any,
    Exact(smol_str::SmolStr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    IDiv,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneralCompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueCompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeCompareOp {
    Is,
    Precedes,
    Follows,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqTypeOp {
    InstanceOf,
    CastableAs,
    CastAs,
    TreatAs,
}

#[derive(Debug, Clone)]
pub enum Op {
    NumberLit(f64),
    StringLit(String),

    /// `.`
    ContextItem,
    /// Leading `/`: denotes the document root.
    Root,
    /// Binary `/`: operands = [left-path, step].
    PathJoin,

    /// One axis step. `predicates` are filter expressions, applied
    /// left-to-right (§4.2 "Predicates").
    Step { axis: Axis, test: NodeTest, predicates: Vec<Expr> },

    Union,
    Intersect,
    Except,

    Arith(ArithOp),
    UnaryMinus,
    UnaryPlus,

    And,
    Or,

    GeneralCompare(GeneralCompareOp),
    ValueCompare(ValueCompareOp),
    NodeCompare(NodeCompareOp),

    /// `,` construction: flattens operands (§4.2 "Sequences").
    SequenceOp,
    /// `()`
    EmptySequence,
    /// `to`: operands = [lo, hi].
    RangeOp,

    /// A parenthesized or bracket-filtered primary. operands[0] is the
    /// base expression; the rest are predicate filters.
    FilterExpr { predicates: Vec<Expr> },

    VarRef(QName),
    FunctionCall { name: QName, args: Vec<Expr> },

    /// `for $v in E return B`. operands = [E, B].
    For { var: QName },
    /// `some $v in E satisfies P`. operands = [E, P].
    Some { var: QName },
    /// `every $v in E satisfies P`. operands = [E, P].
    Every { var: QName },
    /// `if (C) then T else E`. operands = [C, T, E].
    IfThenElse,

    SeqType { op: SeqTypeOp, ty: crate::context::SequenceType },
}

/// A parsed expression node (§3.1). `operands` carries the AST edges;
/// `position` is the source location used for error reporting.
#[derive(Debug, Clone)]
pub struct Expr {
    pub op: Op,
    pub operands: Vec<Expr>,
    pub position: Position,
}

impl Expr {
    pub fn new(op: Op, operands: Vec<Expr>, position: Position) -> Self {
        Expr { op, operands, position }
    }

    pub fn leaf(op: Op, position: Position) -> Self {
        Expr { op, operands: Vec::new(), position }
    }
}
