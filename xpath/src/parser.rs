//! The Pratt parsing engine (§4.1) and the concrete XPath 1.0/2.0
//! grammar built on top of it (§4.2). Binding powers are a `const`
//! table matching §4.2's ascending list; `nud`/`led` are implemented as
//! exhaustive matches over the current token rather than as function
//! pointers stored in a registry (§9's `TokenSpec` table collapses to a
//! lookup function here, since the symbol set is closed at compile
//! time — see DESIGN.md).

use crate::ast::{
    ArithOp, Axis, Expr, GeneralCompareOp, LocalNameFilter, NameNsFilter, NodeCompareOp, NodeTest, Op, SeqTypeOp,
    ValueCompareOp,
};
use crate::context::{ItemTypeSpec, Occurrence, SequenceType, StaticContext};
use crate::error::{Error, ErrorCode, Position};
use crate::lexer::{LexedToken, RawToken, Tokenizer};
use smol_str::SmolStr;
use xdm::QName;

const LBP_COMMA: u8 = 5;
const LBP_FLWOR: u8 = 20;
const LBP_OR: u8 = 25;
const LBP_AND: u8 = 30;
const LBP_COMPARE: u8 = 40;
const LBP_TO: u8 = 45;
const LBP_ADD_SUB: u8 = 50;
const LBP_MUL_DIV_MOD: u8 = 55;
const LBP_UNION: u8 = 60;
const LBP_INTERSECT_EXCEPT: u8 = 65;
const LBP_SEQTYPE: u8 = 70;
const RBP_UNARY: u8 = 75;
const LBP_PATH: u8 = 90;
const LBP_PREDICATE: u8 = 100;

fn axis_keyword(w: &str) -> Option<Axis> {
    Some(match w {
        "child" => Axis::Child,
        "descendant" => Axis::Descendant,
        "attribute" => Axis::Attribute,
        "self" => Axis::SelfAxis,
        "descendant-or-self" => Axis::DescendantOrSelf,
        "following-sibling" => Axis::FollowingSibling,
        "following" => Axis::Following,
        "namespace" => Axis::Namespace,
        "parent" => Axis::Parent,
        "ancestor" => Axis::Ancestor,
        "preceding-sibling" => Axis::PrecedingSibling,
        "preceding" => Axis::Preceding,
        "ancestor-or-self" => Axis::AncestorOrSelf,
        _ => return None,
    })
}

fn is_kind_test_word(w: &str) -> bool {
    matches!(
        w,
        "node" | "text" | "comment" | "processing-instruction" | "element" | "attribute" | "document-node" | "schema-element" | "schema-attribute"
    )
}

fn descendant_or_self_step(position: Position) -> Expr {
    Expr::new(
        Op::Step { axis: Axis::DescendantOrSelf, test: NodeTest::Node, predicates: Vec::new() },
        Vec::new(),
        position,
    )
}

/// Parses one expression string against a `StaticContext`. Not
/// reusable across expressions by design (§9 "Token ↔ parser
/// back-reference": no token stores a pointer back into this struct —
/// evaluation only ever sees the `Expr` tree plus an explicit
/// `DynamicContext`).
pub struct Parser<'ctx> {
    ctx: &'ctx StaticContext,
    tokens: Vec<LexedToken>,
    pos: usize,
}

impl<'ctx> Parser<'ctx> {
    pub fn parse_source(ctx: &'ctx StaticContext, source: &str) -> Result<Expr, Error> {
        let tokens = Tokenizer::tokenize(source)?;
        let mut parser = Parser { ctx, tokens, pos: 0 };
        let root = parser.expression(0)?;
        if parser.current().is_some() {
            return Err(parser.unexpected());
        }
        Ok(root)
    }

    fn peek(&self, offset: usize) -> Option<&RawToken> {
        self.tokens.get(self.pos + offset).map(|t| &t.raw)
    }

    fn current(&self) -> Option<&RawToken> {
        self.peek(0)
    }

    fn current_position(&self) -> Position {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.position)
            .unwrap_or_else(Position::start)
    }

    fn bump(&mut self) -> Option<LexedToken> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expect_token(&mut self, expected: &RawToken) -> Result<(), Error> {
        match self.current() {
            Some(t) if t == expected => {
                self.bump();
                Ok(())
            }
            _ => Err(self.expected(&format!("{:?}", expected))),
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<(), Error> {
        match self.current() {
            Some(RawToken::Name(w)) if w == word => {
                self.bump();
                Ok(())
            }
            _ => Err(self.expected(word)),
        }
    }

    fn describe_current(&self) -> String {
        match self.current() {
            Some(tok) => format!("{:?}", tok),
            None => "end of input".to_string(),
        }
    }

    // §4.1 "Error aids".
    fn expected(&self, what: &str) -> Error {
        Error::syntax(self.current_position(), format!("expected {}, found {}", what, self.describe_current()))
    }

    fn unexpected(&self) -> Error {
        Error::syntax(self.current_position(), format!("unexpected {}", self.describe_current()))
    }

    fn wrong_syntax(&self, msg: impl Into<String>) -> Error {
        Error::syntax(self.current_position(), msg)
    }

    /// The standard Pratt loop (§4.1): `nud` for the leading token,
    /// then `led` while the next token binds tighter than `rbp`.
    fn expression(&mut self, rbp: u8) -> Result<Expr, Error> {
        let mut left = self.nud()?;
        while rbp < self.lbp(self.current()) {
            left = self.led(left)?;
        }
        Ok(left)
    }

    fn lbp(&self, tok: Option<&RawToken>) -> u8 {
        match tok {
            None => 0,
            Some(RawToken::Comma) => LBP_COMMA,
            Some(RawToken::Eq) | Some(RawToken::Ne) | Some(RawToken::Lt) | Some(RawToken::Le) | Some(RawToken::Gt) | Some(RawToken::Ge) => LBP_COMPARE,
            Some(RawToken::Precedes) | Some(RawToken::Follows) => LBP_COMPARE,
            Some(RawToken::Plus) | Some(RawToken::Minus) => LBP_ADD_SUB,
            Some(RawToken::Star) => LBP_MUL_DIV_MOD,
            Some(RawToken::Pipe) => LBP_UNION,
            Some(RawToken::Slash) | Some(RawToken::SlashSlash) => LBP_PATH,
            Some(RawToken::LBracket) => LBP_PREDICATE,
            Some(RawToken::Name(w)) => match w.as_str() {
                "or" => LBP_OR,
                "and" => LBP_AND,
                "eq" | "ne" | "lt" | "le" | "gt" | "ge" | "is" => LBP_COMPARE,
                "to" => LBP_TO,
                "div" | "idiv" | "mod" => LBP_MUL_DIV_MOD,
                "union" => LBP_UNION,
                "intersect" | "except" => LBP_INTERSECT_EXCEPT,
                "instance" | "castable" | "cast" | "treat" => LBP_SEQTYPE,
                _ => 0,
            },
            _ => 0,
        }
    }

    fn qname_len(&self) -> usize {
        if matches!(self.peek(0), Some(RawToken::Name(_))) {
            if matches!(self.peek(1), Some(RawToken::Colon)) && matches!(self.peek(2), Some(RawToken::Name(_))) {
                3
            } else {
                1
            }
        } else {
            0
        }
    }

    fn looks_like_function_call(&self) -> bool {
        let n = self.qname_len();
        n > 0 && matches!(self.peek(n), Some(RawToken::LParen))
    }

    fn parse_qname(&mut self) -> Result<QName, Error> {
        match self.current().cloned() {
            Some(RawToken::Name(n1)) => {
                self.bump();
                if matches!(self.current(), Some(RawToken::Colon)) {
                    self.bump();
                    match self.current().cloned() {
                        Some(RawToken::Name(n2)) => {
                            self.bump();
                            let uri = self.resolve_prefix(&n1)?;
                            Ok(QName::with_ns(Some(SmolStr::new(&n1)), uri, n2))
                        }
                        _ => Err(self.expected("name after ':'")),
                    }
                } else {
                    Ok(QName::new(n1))
                }
            }
            _ => Err(self.expected("name")),
        }
    }

    fn resolve_prefix(&self, prefix: &str) -> Result<Option<SmolStr>, Error> {
        self.ctx
            .namespaces
            .resolve(prefix)
            .map(SmolStr::new)
            .map(Some)
            .ok_or_else(|| Error::name_resolution(ErrorCode::XPST0081, self.current_position(), format!("unbound namespace prefix '{}'", prefix)))
    }

    fn default_ns_for_axis(&self, axis: Axis) -> Option<SmolStr> {
        match axis {
            Axis::Attribute => None,
            _ => self.ctx.options.default_element_namespace.clone(),
        }
    }

    fn parse_node_test(&mut self, axis: Axis) -> Result<NodeTest, Error> {
        match self.current().cloned() {
            Some(RawToken::Star) => {
                self.bump();
                if matches!(self.current(), Some(RawToken::Colon)) {
                    self.bump();
                    match self.current().cloned() {
                        Some(RawToken::Star) => {
                            self.bump();
                            Ok(NodeTest::Name { ns_uri: Some(NameNsFilter::Any), local: LocalNameFilter::Any })
                        }
                        Some(RawToken::Name(local)) => {
                            self.bump();
                            Ok(NodeTest::Name { ns_uri: Some(NameNsFilter::Any), local: LocalNameFilter::Exact(local.into()) })
                        }
                        _ => Err(self.expected("name after '*:'")),
                    }
                } else {
                    Ok(NodeTest::Name { ns_uri: Some(NameNsFilter::Any), local: LocalNameFilter::Any })
                }
            }
            Some(RawToken::Name(w)) => {
                if is_kind_test_word(&w) && matches!(self.peek(1), Some(RawToken::LParen)) {
                    self.bump();
                    self.bump();
                    let result = match w.as_str() {
                        "node" => NodeTest::Node,
                        "text" => NodeTest::Text,
                        "comment" => NodeTest::Comment,
                        "element" => NodeTest::Element,
                        "attribute" => NodeTest::Attribute,
                        "document-node" => NodeTest::DocumentNode,
                        "processing-instruction" => {
                            if let Some(RawToken::StringLit(s)) = self.current().cloned() {
                                self.bump();
                                NodeTest::ProcessingInstruction(Some(s))
                            } else {
                                NodeTest::ProcessingInstruction(None)
                            }
                        }
                        "schema-element" => NodeTest::SchemaElement(self.parse_qname()?),
                        "schema-attribute" => NodeTest::SchemaAttribute(self.parse_qname()?),
                        _ => unreachable!(),
                    };
                    self.expect_token(&RawToken::RParen)?;
                    Ok(result)
                } else {
                    self.bump();
                    if matches!(self.current(), Some(RawToken::Colon)) {
                        self.bump();
                        match self.current().cloned() {
                            Some(RawToken::Star) => {
                                self.bump();
                                let uri = self.resolve_prefix(&w)?;
                                Ok(NodeTest::Name { ns_uri: Some(NameNsFilter::Exact(uri)), local: LocalNameFilter::Any })
                            }
                            Some(RawToken::Name(local)) => {
                                self.bump();
                                let uri = self.resolve_prefix(&w)?;
                                Ok(NodeTest::Name { ns_uri: Some(NameNsFilter::Exact(uri)), local: LocalNameFilter::Exact(local.into()) })
                            }
                            _ => Err(self.expected("name after ':'")),
                        }
                    } else {
                        let uri = self.default_ns_for_axis(axis);
                        Ok(NodeTest::Name { ns_uri: Some(NameNsFilter::Exact(uri)), local: LocalNameFilter::Exact(w.into()) })
                    }
                }
            }
            _ => Err(self.expected("node test")),
        }
    }

    fn parse_step(&mut self, axis: Axis) -> Result<Expr, Error> {
        let pos = self.current_position();
        let test = self.parse_node_test(axis)?;
        let mut predicates = Vec::new();
        while matches!(self.current(), Some(RawToken::LBracket)) {
            self.bump();
            let pred = self.expression(0)?;
            self.expect_token(&RawToken::RBracket)?;
            predicates.push(pred);
        }
        Ok(Expr::new(Op::Step { axis, test, predicates }, Vec::new(), pos))
    }

    fn nud_step(&mut self) -> Result<Expr, Error> {
        let pos = self.current_position();
        match self.current().cloned() {
            Some(RawToken::At) => {
                self.bump();
                self.parse_step(Axis::Attribute)
            }
            Some(RawToken::DotDot) => {
                self.bump();
                Ok(Expr::new(Op::Step { axis: Axis::Parent, test: NodeTest::Node, predicates: Vec::new() }, Vec::new(), pos))
            }
            Some(RawToken::Star) => self.parse_step(Axis::Child),
            Some(RawToken::Name(w)) => {
                if let Some(axis) = axis_keyword(&w) {
                    if matches!(self.peek(1), Some(RawToken::AxisSep)) {
                        self.bump();
                        self.bump();
                        return self.parse_step(axis);
                    }
                }
                self.parse_step(Axis::Child)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn can_start_step(&self) -> bool {
        matches!(
            self.current(),
            Some(RawToken::At) | Some(RawToken::Star) | Some(RawToken::DotDot) | Some(RawToken::Dot) | Some(RawToken::Name(_))
        )
    }

    /// Wraps a non-step primary (var ref, parenthesized expr, context
    /// item, function call) with any immediately following `[pred]`
    /// filters (§4.2 "Predicates" — `FilterExpr` case of `Step`).
    fn attach_filter(&mut self, base: Expr) -> Result<Expr, Error> {
        let mut predicates = Vec::new();
        while matches!(self.current(), Some(RawToken::LBracket)) {
            self.bump();
            let p = self.expression(0)?;
            self.expect_token(&RawToken::RBracket)?;
            predicates.push(p);
        }
        if predicates.is_empty() {
            Ok(base)
        } else {
            let pos = base.position;
            Ok(Expr::new(Op::FilterExpr { predicates }, vec![base], pos))
        }
    }

    fn parse_function_call(&mut self, pos: Position) -> Result<Expr, Error> {
        let name = self.parse_qname()?;
        self.expect_token(&RawToken::LParen)?;
        let mut args = Vec::new();
        if !matches!(self.current(), Some(RawToken::RParen)) {
            loop {
                args.push(self.expression(LBP_COMMA + 1)?);
                if matches!(self.current(), Some(RawToken::Comma)) {
                    self.bump();
                    continue;
                }
                break;
            }
        }
        self.expect_token(&RawToken::RParen)?;
        self.attach_filter(Expr::new(Op::FunctionCall { name, args }, Vec::new(), pos))
    }

    fn parse_for(&mut self, pos: Position) -> Result<Expr, Error> {
        self.bump();
        self.expect_token(&RawToken::Dollar)?;
        let var = self.parse_qname()?;
        self.expect_word("in")?;
        let seq = self.expression(LBP_FLWOR)?;
        self.expect_word("return")?;
        let body = self.expression(LBP_FLWOR)?;
        Ok(Expr::new(Op::For { var }, vec![seq, body], pos))
    }

    fn parse_quantified(&mut self, pos: Position, is_some: bool) -> Result<Expr, Error> {
        self.bump();
        self.expect_token(&RawToken::Dollar)?;
        let var = self.parse_qname()?;
        self.expect_word("in")?;
        let seq = self.expression(LBP_FLWOR)?;
        self.expect_word("satisfies")?;
        let pred = self.expression(LBP_FLWOR)?;
        let op = if is_some { Op::Some { var } } else { Op::Every { var } };
        Ok(Expr::new(op, vec![seq, pred], pos))
    }

    fn parse_if(&mut self, pos: Position) -> Result<Expr, Error> {
        self.bump();
        self.expect_token(&RawToken::LParen)?;
        let cond = self.expression(0)?;
        self.expect_token(&RawToken::RParen)?;
        self.expect_word("then")?;
        let then_e = self.expression(LBP_FLWOR)?;
        self.expect_word("else")?;
        let else_e = self.expression(LBP_FLWOR)?;
        Ok(Expr::new(Op::IfThenElse, vec![cond, then_e, else_e], pos))
    }

    fn parse_sequence_type(&mut self) -> Result<SequenceType, Error> {
        if matches!(self.current(), Some(RawToken::Name(w)) if w == "empty-sequence") && matches!(self.peek(1), Some(RawToken::LParen)) {
            self.bump();
            self.bump();
            self.expect_token(&RawToken::RParen)?;
            return Ok(SequenceType::Empty);
        }
        let item = match self.current().cloned() {
            Some(RawToken::Name(w)) if w == "item" && matches!(self.peek(1), Some(RawToken::LParen)) => {
                self.bump();
                self.bump();
                self.expect_token(&RawToken::RParen)?;
                ItemTypeSpec::AnyItem
            }
            Some(RawToken::Name(w)) if w == "node" && matches!(self.peek(1), Some(RawToken::LParen)) => {
                self.bump();
                self.bump();
                self.expect_token(&RawToken::RParen)?;
                ItemTypeSpec::Node
            }
            Some(RawToken::Name(w)) if w == "element" && matches!(self.peek(1), Some(RawToken::LParen)) => {
                self.bump();
                self.bump();
                self.expect_token(&RawToken::RParen)?;
                ItemTypeSpec::Element(None)
            }
            Some(RawToken::Name(w)) if w == "attribute" && matches!(self.peek(1), Some(RawToken::LParen)) => {
                self.bump();
                self.bump();
                self.expect_token(&RawToken::RParen)?;
                ItemTypeSpec::Attribute(None)
            }
            Some(RawToken::Name(_)) => {
                let qn = self.parse_qname()?;
                ItemTypeSpec::Atomic(qn)
            }
            _ => return Err(self.expected("sequence type")),
        };
        let occurrence = match self.current() {
            Some(RawToken::Question) => {
                self.bump();
                Occurrence::ZeroOrOne
            }
            Some(RawToken::Star) => {
                self.bump();
                Occurrence::ZeroOrMore
            }
            Some(RawToken::Plus) => {
                self.bump();
                Occurrence::OneOrMore
            }
            _ => Occurrence::ExactlyOne,
        };
        Ok(SequenceType::Item(item, occurrence))
    }

    fn nud(&mut self) -> Result<Expr, Error> {
        let pos = self.current_position();
        let tok = self.current().cloned().ok_or_else(|| self.unexpected())?;
        match tok {
            RawToken::Number(n) => {
                self.bump();
                Ok(Expr::leaf(Op::NumberLit(n), pos))
            }
            RawToken::StringLit(s) => {
                self.bump();
                Ok(Expr::leaf(Op::StringLit(s), pos))
            }
            RawToken::Minus => {
                self.bump();
                let operand = self.expression(RBP_UNARY)?;
                Ok(Expr::new(Op::UnaryMinus, vec![operand], pos))
            }
            RawToken::Plus => {
                self.bump();
                let operand = self.expression(RBP_UNARY)?;
                Ok(Expr::new(Op::UnaryPlus, vec![operand], pos))
            }
            RawToken::Dollar => {
                self.bump();
                let name = self.parse_qname()?;
                self.attach_filter(Expr::leaf(Op::VarRef(name), pos))
            }
            RawToken::LParen => {
                self.bump();
                if matches!(self.current(), Some(RawToken::RParen)) {
                    self.bump();
                    return self.attach_filter(Expr::leaf(Op::EmptySequence, pos));
                }
                let e = self.expression(0)?;
                self.expect_token(&RawToken::RParen)?;
                self.attach_filter(e)
            }
            RawToken::Dot => {
                self.bump();
                self.attach_filter(Expr::leaf(Op::ContextItem, pos))
            }
            RawToken::Slash => {
                self.bump();
                if self.can_start_step() {
                    let rhs = self.expression(LBP_PATH)?;
                    Ok(Expr::new(Op::PathJoin, vec![Expr::leaf(Op::Root, pos), rhs], pos))
                } else {
                    Ok(Expr::leaf(Op::Root, pos))
                }
            }
            RawToken::SlashSlash => {
                self.bump();
                let ds = descendant_or_self_step(pos);
                let joined = Expr::new(Op::PathJoin, vec![Expr::leaf(Op::Root, pos), ds], pos);
                let rhs = self.expression(LBP_PATH)?;
                Ok(Expr::new(Op::PathJoin, vec![joined, rhs], pos))
            }
            RawToken::At | RawToken::DotDot | RawToken::Star => self.nud_step(),
            RawToken::Name(ref w) => match w.as_str() {
                "for" => self.parse_for(pos),
                "some" => self.parse_quantified(pos, true),
                "every" => self.parse_quantified(pos, false),
                "if" => self.parse_if(pos),
                _ => {
                    if let Some(axis) = axis_keyword(w) {
                        if matches!(self.peek(1), Some(RawToken::AxisSep)) {
                            return self.nud_step();
                        }
                    }
                    if is_kind_test_word(w) && matches!(self.peek(1), Some(RawToken::LParen)) {
                        return self.nud_step();
                    }
                    if self.looks_like_function_call() {
                        return self.parse_function_call(pos);
                    }
                    self.nud_step()
                }
            },
            _ => Err(self.unexpected()),
        }
    }

    fn led(&mut self, left: Expr) -> Result<Expr, Error> {
        let pos = self.current_position();
        let tok = self.current().cloned().ok_or_else(|| self.unexpected())?;
        match tok {
            RawToken::Comma => {
                self.bump();
                let rhs = self.expression(LBP_COMMA)?;
                Ok(Expr::new(Op::SequenceOp, vec![left, rhs], pos))
            }
            RawToken::Slash => {
                self.bump();
                let rhs = self.expression(LBP_PATH)?;
                Ok(Expr::new(Op::PathJoin, vec![left, rhs], pos))
            }
            RawToken::SlashSlash => {
                self.bump();
                let ds = descendant_or_self_step(pos);
                let joined = Expr::new(Op::PathJoin, vec![left, ds], pos);
                let rhs = self.expression(LBP_PATH)?;
                Ok(Expr::new(Op::PathJoin, vec![joined, rhs], pos))
            }
            RawToken::LBracket => {
                self.bump();
                let p = self.expression(0)?;
                self.expect_token(&RawToken::RBracket)?;
                let left_position = left.position;
                match left.op {
                    Op::Step { axis, test, mut predicates } => {
                        predicates.push(p);
                        Ok(Expr::new(Op::Step { axis, test, predicates }, Vec::new(), left_position))
                    }
                    other_op => {
                        let base = Expr::new(other_op, left.operands, left_position);
                        Ok(Expr::new(Op::FilterExpr { predicates: vec![p] }, vec![base], left_position))
                    }
                }
            }
            RawToken::Plus => {
                self.bump();
                let rhs = self.expression(LBP_ADD_SUB)?;
                Ok(Expr::new(Op::Arith(ArithOp::Add), vec![left, rhs], pos))
            }
            RawToken::Minus => {
                self.bump();
                let rhs = self.expression(LBP_ADD_SUB)?;
                Ok(Expr::new(Op::Arith(ArithOp::Sub), vec![left, rhs], pos))
            }
            RawToken::Star => {
                self.bump();
                let rhs = self.expression(LBP_MUL_DIV_MOD)?;
                Ok(Expr::new(Op::Arith(ArithOp::Mul), vec![left, rhs], pos))
            }
            RawToken::Pipe => {
                self.bump();
                let rhs = self.expression(LBP_UNION)?;
                Ok(Expr::new(Op::Union, vec![left, rhs], pos))
            }
            RawToken::Eq => {
                self.bump();
                let rhs = self.expression(LBP_COMPARE)?;
                Ok(Expr::new(Op::GeneralCompare(GeneralCompareOp::Eq), vec![left, rhs], pos))
            }
            RawToken::Ne => {
                self.bump();
                let rhs = self.expression(LBP_COMPARE)?;
                Ok(Expr::new(Op::GeneralCompare(GeneralCompareOp::Ne), vec![left, rhs], pos))
            }
            RawToken::Lt => {
                self.bump();
                let rhs = self.expression(LBP_COMPARE)?;
                Ok(Expr::new(Op::GeneralCompare(GeneralCompareOp::Lt), vec![left, rhs], pos))
            }
            RawToken::Le => {
                self.bump();
                let rhs = self.expression(LBP_COMPARE)?;
                Ok(Expr::new(Op::GeneralCompare(GeneralCompareOp::Le), vec![left, rhs], pos))
            }
            RawToken::Gt => {
                self.bump();
                let rhs = self.expression(LBP_COMPARE)?;
                Ok(Expr::new(Op::GeneralCompare(GeneralCompareOp::Gt), vec![left, rhs], pos))
            }
            RawToken::Ge => {
                self.bump();
                let rhs = self.expression(LBP_COMPARE)?;
                Ok(Expr::new(Op::GeneralCompare(GeneralCompareOp::Ge), vec![left, rhs], pos))
            }
            RawToken::Precedes => {
                self.bump();
                let rhs = self.expression(LBP_COMPARE)?;
                Ok(Expr::new(Op::NodeCompare(NodeCompareOp::Precedes), vec![left, rhs], pos))
            }
            RawToken::Follows => {
                self.bump();
                let rhs = self.expression(LBP_COMPARE)?;
                Ok(Expr::new(Op::NodeCompare(NodeCompareOp::Follows), vec![left, rhs], pos))
            }
            RawToken::Name(w) => match w.as_str() {
                "or" => {
                    self.bump();
                    let rhs = self.expression(LBP_OR)?;
                    Ok(Expr::new(Op::Or, vec![left, rhs], pos))
                }
                "and" => {
                    self.bump();
                    let rhs = self.expression(LBP_AND)?;
                    Ok(Expr::new(Op::And, vec![left, rhs], pos))
                }
                "to" => {
                    self.bump();
                    let rhs = self.expression(LBP_TO)?;
                    Ok(Expr::new(Op::RangeOp, vec![left, rhs], pos))
                }
                "div" => {
                    self.bump();
                    let rhs = self.expression(LBP_MUL_DIV_MOD)?;
                    Ok(Expr::new(Op::Arith(ArithOp::Div), vec![left, rhs], pos))
                }
                "idiv" => {
                    self.bump();
                    let rhs = self.expression(LBP_MUL_DIV_MOD)?;
                    Ok(Expr::new(Op::Arith(ArithOp::IDiv), vec![left, rhs], pos))
                }
                "mod" => {
                    self.bump();
                    let rhs = self.expression(LBP_MUL_DIV_MOD)?;
                    Ok(Expr::new(Op::Arith(ArithOp::Mod), vec![left, rhs], pos))
                }
                "union" => {
                    self.bump();
                    let rhs = self.expression(LBP_UNION)?;
                    Ok(Expr::new(Op::Union, vec![left, rhs], pos))
                }
                "intersect" => {
                    self.bump();
                    let rhs = self.expression(LBP_INTERSECT_EXCEPT)?;
                    Ok(Expr::new(Op::Intersect, vec![left, rhs], pos))
                }
                "except" => {
                    self.bump();
                    let rhs = self.expression(LBP_INTERSECT_EXCEPT)?;
                    Ok(Expr::new(Op::Except, vec![left, rhs], pos))
                }
                "eq" | "ne" | "lt" | "le" | "gt" | "ge" => {
                    let op = match w.as_str() {
                        "eq" => ValueCompareOp::Eq,
                        "ne" => ValueCompareOp::Ne,
                        "lt" => ValueCompareOp::Lt,
                        "le" => ValueCompareOp::Le,
                        "gt" => ValueCompareOp::Gt,
                        _ => ValueCompareOp::Ge,
                    };
                    self.bump();
                    let rhs = self.expression(LBP_COMPARE)?;
                    Ok(Expr::new(Op::ValueCompare(op), vec![left, rhs], pos))
                }
                "is" => {
                    self.bump();
                    let rhs = self.expression(LBP_COMPARE)?;
                    Ok(Expr::new(Op::NodeCompare(NodeCompareOp::Is), vec![left, rhs], pos))
                }
                "instance" => {
                    self.bump();
                    self.expect_word("of")?;
                    let ty = self.parse_sequence_type()?;
                    Ok(Expr::new(Op::SeqType { op: SeqTypeOp::InstanceOf, ty }, vec![left], pos))
                }
                "castable" => {
                    self.bump();
                    self.expect_word("as")?;
                    let ty = self.parse_sequence_type()?;
                    Ok(Expr::new(Op::SeqType { op: SeqTypeOp::CastableAs, ty }, vec![left], pos))
                }
                "cast" => {
                    self.bump();
                    self.expect_word("as")?;
                    let ty = self.parse_sequence_type()?;
                    Ok(Expr::new(Op::SeqType { op: SeqTypeOp::CastAs, ty }, vec![left], pos))
                }
                "treat" => {
                    self.bump();
                    self.expect_word("as")?;
                    let ty = self.parse_sequence_type()?;
                    Ok(Expr::new(Op::SeqType { op: SeqTypeOp::TreatAs, ty }, vec![left], pos))
                }
                _ => Err(self.unexpected()),
            },
            _ => Err(self.wrong_syntax(format!("'{:?}' cannot follow an expression", tok))),
        }
    }
}
