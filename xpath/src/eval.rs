//! The dynamic evaluator (C6, §4.1 point 4, §4.2, §5): walks an `Expr`
//! tree driving axis traversal, predicate filtering, comparisons and
//! the function library against a `DynamicContext`. One `evaluate` call
//! handles every `Op` variant — the closed-AST equivalent of a
//! per-token `evaluate`/`select` method (§9).

use crate::ast::{ArithOp, Axis, Expr, GeneralCompareOp, LocalNameFilter, NameNsFilter, NodeCompareOp, NodeTest, Op, SeqTypeOp, ValueCompareOp};
use crate::context::{DynamicContext, ItemTypeSpec, Occurrence, SequenceType};
use crate::error::{Error, ErrorCode, EvalError, EvalResult, MissingContextError};
use crate::functions;
use crate::value::{Atomic, Item, Sequence};
use log::trace;
use std::collections::HashSet;
use xdm::{NodeId, NodeKind, Tree};

fn type_error(pos: crate::error::Position, msg: impl Into<String>) -> EvalError {
    EvalError::Real(Error::static_type(ErrorCode::XPTY0004, pos, msg))
}

fn name_error(pos: crate::error::Position, code: ErrorCode, msg: impl Into<String>) -> EvalError {
    EvalError::Real(Error::name_resolution(code, pos, msg))
}

fn atomize(item: &Item, ctx: &DynamicContext<'_>) -> EvalResult<Atomic> {
    item.atomize(ctx.tree).map_err(|_| EvalError::from(MissingContextError))
}

fn string_value_of(item: &Item, ctx: &DynamicContext<'_>) -> EvalResult<String> {
    item.string_value(ctx.tree).map_err(|_| EvalError::from(MissingContextError))
}

/// The top-level entry point every token's `evaluate` funnels through.
pub fn evaluate(expr: &Expr, ctx: &mut DynamicContext<'_>) -> EvalResult<Sequence> {
    match &expr.op {
        Op::NumberLit(n) => Ok(Sequence::atomic(number_literal(*n))),
        Op::StringLit(s) => Ok(Sequence::atomic(Atomic::String(s.clone()))),
        Op::ContextItem => Ok(Sequence::single(ctx.require_item()?)),
        Op::Root => {
            let root = ctx.root.ok_or_else(|| EvalError::from(MissingContextError))?;
            Ok(Sequence::single(Item::Node(root)))
        }
        Op::PathJoin => eval_path_join(expr, ctx),
        Op::Step { axis, test, predicates } => eval_step(*axis, test, predicates, ctx),
        Op::Union => eval_set_op(expr, ctx, SetOp::Union),
        Op::Intersect => eval_set_op(expr, ctx, SetOp::Intersect),
        Op::Except => eval_set_op(expr, ctx, SetOp::Except),
        Op::Arith(op) => eval_arith(*op, expr, ctx),
        Op::UnaryMinus => eval_unary(expr, ctx, -1.0),
        Op::UnaryPlus => eval_unary(expr, ctx, 1.0),
        Op::And => eval_and_or(expr, ctx, true),
        Op::Or => eval_and_or(expr, ctx, false),
        Op::GeneralCompare(op) => eval_general_compare(*op, expr, ctx),
        Op::ValueCompare(op) => eval_value_compare(*op, expr, ctx),
        Op::NodeCompare(op) => eval_node_compare(*op, expr, ctx),
        Op::SequenceOp => {
            let l = evaluate(&expr.operands[0], ctx)?;
            let r = evaluate(&expr.operands[1], ctx)?;
            Ok(Sequence::concat([l, r]))
        }
        Op::EmptySequence => Ok(Sequence::empty()),
        Op::RangeOp => eval_range(expr, ctx),
        Op::FilterExpr { predicates } => {
            let base = evaluate(&expr.operands[0], ctx)?;
            let kept = apply_predicates(base.0, predicates, ctx)?;
            Ok(Sequence(kept))
        }
        Op::VarRef(name) => ctx
            .lookup_variable(name)
            .cloned()
            .ok_or_else(|| {
                if ctx.tree.is_none() {
                    EvalError::from(MissingContextError)
                } else {
                    name_error(expr.position, ErrorCode::XPST0008, format!("unbound variable ${}", name))
                }
            }),
        Op::FunctionCall { name, args } => functions::call_function(name, args, expr.position, ctx),
        Op::For { var } => eval_for(var.clone(), expr, ctx),
        Op::Some { var } => eval_quantified(var.clone(), expr, ctx, true),
        Op::Every { var } => eval_quantified(var.clone(), expr, ctx, false),
        Op::IfThenElse => {
            let cond = evaluate(&expr.operands[0], ctx)?;
            let b = cond.effective_boolean_value().map_err(|m| type_error(expr.position, m))?;
            if b {
                evaluate(&expr.operands[1], ctx)
            } else {
                evaluate(&expr.operands[2], ctx)
            }
        }
        Op::SeqType { op, ty } => eval_seq_type(*op, ty.clone(), expr, ctx),
    }
}

fn number_literal(n: f64) -> Atomic {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        Atomic::Integer(n as i64)
    } else {
        Atomic::Double(n)
    }
}

fn eval_path_join(expr: &Expr, ctx: &mut DynamicContext<'_>) -> EvalResult<Sequence> {
    let left = evaluate(&expr.operands[0], ctx)?;
    let mut results = Vec::new();
    for item in left.0 {
        let node_id = match item {
            Item::Node(id) => id,
            Item::Atomic(_) => return Err(type_error(expr.position, "path step requires a node sequence on its left side")),
        };
        let saved = (ctx.item.take(), ctx.position, ctx.size);
        ctx.item = Some(Item::Node(node_id));
        ctx.position = 1;
        ctx.size = 1;
        let step_result = evaluate(&expr.operands[1], ctx);
        ctx.item = saved.0;
        ctx.position = saved.1;
        ctx.size = saved.2;
        results.extend(step_result?.0);
    }
    let seq = Sequence(results);
    match ctx.tree {
        Some(tree) => Ok(seq.normalize_nodes(tree)),
        None => Ok(seq),
    }
}

fn run_axis(axis: Axis, tree: &Tree, node: NodeId) -> Vec<NodeId> {
    trace!("axis {:?} from node#{}", axis, node.index());
    match axis {
        Axis::Child => xdm::axis::child(tree, node),
        Axis::Descendant => xdm::axis::descendant(tree, node),
        Axis::Attribute => xdm::axis::attribute(tree, node),
        Axis::SelfAxis => xdm::axis::self_axis(tree, node),
        Axis::DescendantOrSelf => xdm::axis::descendant_or_self(tree, node),
        Axis::FollowingSibling => xdm::axis::following_sibling(tree, node),
        Axis::Following => xdm::axis::following(tree, node),
        Axis::Namespace => xdm::axis::namespace(tree, node),
        Axis::Parent => xdm::axis::parent(tree, node),
        Axis::Ancestor => xdm::axis::ancestor(tree, node),
        Axis::PrecedingSibling => xdm::axis::preceding_sibling(tree, node),
        Axis::Preceding => xdm::axis::preceding(tree, node),
        Axis::AncestorOrSelf => xdm::axis::ancestor_or_self(tree, node),
    }
}

fn node_matches_test(tree: &Tree, id: NodeId, test: &NodeTest) -> bool {
    let kind = tree.kind(id);
    match test {
        NodeTest::Node => true,
        NodeTest::Text => kind == NodeKind::Text,
        NodeTest::Comment => kind == NodeKind::Comment,
        NodeTest::ProcessingInstruction(target) => {
            kind == NodeKind::ProcessingInstruction
                && target.as_deref().map_or(true, |t| tree.node(id).pi_target.as_deref() == Some(t))
        }
        NodeTest::Element => kind == NodeKind::Element,
        NodeTest::Attribute => kind == NodeKind::Attribute,
        NodeTest::DocumentNode => kind == NodeKind::Document,
        NodeTest::SchemaElement(_) => kind == NodeKind::Element && tree.node(id).is_schema_node,
        NodeTest::SchemaAttribute(_) => kind == NodeKind::Attribute && tree.node(id).is_schema_node,
        NodeTest::Name { ns_uri, local } => {
            if !matches!(kind, NodeKind::Element | NodeKind::Attribute | NodeKind::Namespace) {
                return false;
            }
            let name = match tree.name(id) {
                Some(n) => n,
                None => return false,
            };
            let local_ok = match local {
                LocalNameFilter::Any => true,
                LocalNameFilter::Exact(l) => name.local == *l,
            };
            let ns_ok = match ns_uri {
                None | Some(NameNsFilter::Any) => true,
                Some(NameNsFilter::Exact(u)) => name.ns_uri.as_deref() == u.as_deref(),
            };
            local_ok && ns_ok
        }
    }
}

fn eval_step(axis: Axis, test: &NodeTest, predicates: &[Expr], ctx: &mut DynamicContext<'_>) -> EvalResult<Sequence> {
    let focus_item = ctx.require_item()?;
    let start = match focus_item {
        Item::Node(id) => id,
        Item::Atomic(_) => return Err(EvalError::Real(Error::static_type(ErrorCode::XPTY0004, crate::error::Position::start(), "an axis step requires a node context item"))),
    };
    let tree = ctx.require_tree()?;
    let mut candidates: Vec<NodeId> = run_axis(axis, tree, start).into_iter().filter(|&id| node_matches_test(tree, id, test)).collect();

    for pred in predicates {
        let items: Vec<Item> = candidates.iter().copied().map(Item::Node).collect();
        let kept = apply_predicates(items, std::slice::from_ref(pred), ctx)?;
        candidates = kept
            .into_iter()
            .map(|it| match it {
                Item::Node(id) => id,
                Item::Atomic(_) => unreachable!("step candidates are always nodes"),
            })
            .collect();
    }

    let tree = ctx.require_tree()?;
    Ok(Sequence::nodes(candidates).normalize_nodes(tree))
}

/// §4.2 "Predicates": for each item at (position, size), evaluate
/// `expr` with that focus; numeric result keeps the item iff it equals
/// the 1-based position, otherwise the effective boolean value decides.
fn apply_predicates(mut items: Vec<Item>, predicates: &[Expr], ctx: &mut DynamicContext<'_>) -> EvalResult<Vec<Item>> {
    for pred in predicates {
        let n = items.len();
        let mut kept = Vec::with_capacity(n);
        for (i, item) in items.into_iter().enumerate() {
            let pos = i + 1;
            let saved = (ctx.item.take(), ctx.position, ctx.size);
            ctx.item = Some(item.clone());
            ctx.position = pos;
            ctx.size = n;
            let result = evaluate(pred, ctx);
            ctx.item = saved.0;
            ctx.position = saved.1;
            ctx.size = saved.2;
            let seq = result?;
            let keep = match seq.0.as_slice() {
                [Item::Atomic(Atomic::Integer(k))] => *k == pos as i64,
                [Item::Atomic(Atomic::Double(d))] => *d == pos as f64,
                _ => seq.effective_boolean_value().map_err(|m| type_error(pred.position, m))?,
            };
            if keep {
                kept.push(item);
            }
        }
        items = kept;
    }
    Ok(items)
}

#[derive(Clone, Copy)]
enum SetOp {
    Union,
    Intersect,
    Except,
}

fn eval_set_op(expr: &Expr, ctx: &mut DynamicContext<'_>, op: SetOp) -> EvalResult<Sequence> {
    let l = evaluate(&expr.operands[0], ctx)?;
    let r = evaluate(&expr.operands[1], ctx)?;
    if l.0.iter().any(|it| !it.is_node()) || r.0.iter().any(|it| !it.is_node()) {
        return Err(type_error(expr.position, "union/intersect/except require node sequences"));
    }
    let tree = ctx.require_tree()?;
    let out = match op {
        SetOp::Union => Sequence(l.0.into_iter().chain(r.0).collect()),
        SetOp::Intersect => {
            let rset: HashSet<NodeId> = r.0.iter().filter_map(|it| if let Item::Node(id) = it { Some(*id) } else { None }).collect();
            Sequence(l.0.into_iter().filter(|it| matches!(it, Item::Node(id) if rset.contains(id))).collect())
        }
        SetOp::Except => {
            let rset: HashSet<NodeId> = r.0.iter().filter_map(|it| if let Item::Node(id) = it { Some(*id) } else { None }).collect();
            Sequence(l.0.into_iter().filter(|it| matches!(it, Item::Node(id) if !rset.contains(id))).collect())
        }
    };
    Ok(out.normalize_nodes(tree))
}

fn singleton_atomic(seq: Sequence, ctx: &DynamicContext<'_>, pos: crate::error::Position) -> EvalResult<Option<Atomic>> {
    match seq.0.as_slice() {
        [] => Ok(None),
        [one] => Ok(Some(atomize(one, ctx)?)),
        _ => Err(EvalError::Real(Error::value_domain(ErrorCode::FORG0005, pos, "expected a singleton sequence"))),
    }
}

/// §6 "1 + \"1\" raises XPTY0004 at parse time" (scenario 6):
/// arithmetic is deliberately strict — operands must already be
/// numeric atomic values, with no string-to-number coercion. Compare
/// `eval_general_compare`, which does coerce (scenario 3).
fn eval_arith(op: ArithOp, expr: &Expr, ctx: &mut DynamicContext<'_>) -> EvalResult<Sequence> {
    let l = evaluate(&expr.operands[0], ctx)?;
    let r = evaluate(&expr.operands[1], ctx)?;
    let (la, ra) = match (singleton_atomic(l, ctx, expr.position)?, singleton_atomic(r, ctx, expr.position)?) {
        (Some(a), Some(b)) => (a, b),
        _ => return Ok(Sequence::empty()),
    };
    let (lf, both_int) = match &la {
        Atomic::Integer(i) => (*i as f64, matches!(ra, Atomic::Integer(_))),
        Atomic::Double(d) => (*d, false),
        _ => return Err(type_error(expr.position, "arithmetic requires numeric operands")),
    };
    let rf = match &ra {
        Atomic::Integer(i) => *i as f64,
        Atomic::Double(d) => *d,
        _ => return Err(type_error(expr.position, "arithmetic requires numeric operands")),
    };
    let result = match op {
        ArithOp::Add => lf + rf,
        ArithOp::Sub => lf - rf,
        ArithOp::Mul => lf * rf,
        ArithOp::Div => lf / rf,
        ArithOp::IDiv => {
            if rf == 0.0 {
                return Err(EvalError::Real(Error::value_domain(ErrorCode::FOAR0001, expr.position, "integer division by zero")));
            }
            return Ok(Sequence::atomic(Atomic::Integer((lf / rf).trunc() as i64)));
        }
        ArithOp::Mod => {
            if rf == 0.0 {
                return Err(EvalError::Real(Error::value_domain(ErrorCode::FOAR0001, expr.position, "modulo by zero")));
            }
            lf % rf
        }
    };
    if both_int && matches!(op, ArithOp::Add | ArithOp::Sub | ArithOp::Mul | ArithOp::Mod) {
        Ok(Sequence::atomic(Atomic::Integer(result as i64)))
    } else {
        Ok(Sequence::atomic(Atomic::Double(result)))
    }
}

fn eval_unary(expr: &Expr, ctx: &mut DynamicContext<'_>, sign: f64) -> EvalResult<Sequence> {
    let seq = evaluate(&expr.operands[0], ctx)?;
    let a = match singleton_atomic(seq, ctx, expr.position)? {
        Some(a) => a,
        None => return Ok(Sequence::empty()),
    };
    match a {
        Atomic::Integer(i) => Ok(Sequence::atomic(Atomic::Integer((i as f64 * sign) as i64))),
        Atomic::Double(d) => Ok(Sequence::atomic(Atomic::Double(d * sign))),
        _ => Err(type_error(expr.position, "unary +/- requires a numeric operand")),
    }
}

fn eval_and_or(expr: &Expr, ctx: &mut DynamicContext<'_>, is_and: bool) -> EvalResult<Sequence> {
    let l = evaluate(&expr.operands[0], ctx)?;
    let lb = l.effective_boolean_value().map_err(|m| type_error(expr.position, m))?;
    if is_and && !lb {
        return Ok(Sequence::atomic(Atomic::Boolean(false)));
    }
    if !is_and && lb {
        return Ok(Sequence::atomic(Atomic::Boolean(true)));
    }
    let r = evaluate(&expr.operands[1], ctx)?;
    let rb = r.effective_boolean_value().map_err(|m| type_error(expr.position, m))?;
    Ok(Sequence::atomic(Atomic::Boolean(rb)))
}

fn compare_general_atomics(op: GeneralCompareOp, a: &Atomic, b: &Atomic) -> bool {
    use std::cmp::Ordering;
    let ordering = if matches!(a, Atomic::Boolean(_)) || matches!(b, Atomic::Boolean(_)) {
        a.as_bool().cmp(&b.as_bool())
    } else if matches!(a, Atomic::Integer(_) | Atomic::Double(_)) || matches!(b, Atomic::Integer(_) | Atomic::Double(_)) {
        a.as_f64().partial_cmp(&b.as_f64()).unwrap_or(Ordering::Greater)
    } else {
        a.as_string().cmp(&b.as_string())
    };
    match op {
        GeneralCompareOp::Eq => ordering == Ordering::Equal,
        GeneralCompareOp::Ne => ordering != Ordering::Equal,
        GeneralCompareOp::Lt => ordering == Ordering::Less,
        GeneralCompareOp::Le => ordering != Ordering::Greater,
        GeneralCompareOp::Gt => ordering == Ordering::Greater,
        GeneralCompareOp::Ge => ordering != Ordering::Less,
    }
}

/// §4.2 "General comparison: existential; ... in XP1.0 compatibility
/// mode, numeric coercion applies" — implemented here unconditionally
/// leniently (coercing strings against numeric operands), which is
/// what scenario 3 (`@a>15` against an untyped string attribute) needs.
fn eval_general_compare(op: GeneralCompareOp, expr: &Expr, ctx: &mut DynamicContext<'_>) -> EvalResult<Sequence> {
    let l = evaluate(&expr.operands[0], ctx)?;
    let r = evaluate(&expr.operands[1], ctx)?;
    if l.is_empty() || r.is_empty() {
        return Ok(Sequence::atomic(Atomic::Boolean(false)));
    }
    let mut any = false;
    'outer: for litem in &l.0 {
        let la = atomize(litem, ctx)?;
        for ritem in &r.0 {
            let ra = atomize(ritem, ctx)?;
            if compare_general_atomics(op, &la, &ra) {
                any = true;
                break 'outer;
            }
        }
    }
    Ok(Sequence::atomic(Atomic::Boolean(any)))
}

fn eval_value_compare(op: ValueCompareOp, expr: &Expr, ctx: &mut DynamicContext<'_>) -> EvalResult<Sequence> {
    let l = evaluate(&expr.operands[0], ctx)?;
    let r = evaluate(&expr.operands[1], ctx)?;
    let (la, ra) = match (singleton_atomic(l, ctx, expr.position)?, singleton_atomic(r, ctx, expr.position)?) {
        (Some(a), Some(b)) => (a, b),
        _ => return Ok(Sequence::empty()),
    };
    let general_op = match op {
        ValueCompareOp::Eq => GeneralCompareOp::Eq,
        ValueCompareOp::Ne => GeneralCompareOp::Ne,
        ValueCompareOp::Lt => GeneralCompareOp::Lt,
        ValueCompareOp::Le => GeneralCompareOp::Le,
        ValueCompareOp::Gt => GeneralCompareOp::Gt,
        ValueCompareOp::Ge => GeneralCompareOp::Ge,
    };
    Ok(Sequence::atomic(Atomic::Boolean(compare_general_atomics(general_op, &la, &ra))))
}

fn eval_node_compare(op: NodeCompareOp, expr: &Expr, ctx: &mut DynamicContext<'_>) -> EvalResult<Sequence> {
    let l = evaluate(&expr.operands[0], ctx)?;
    let r = evaluate(&expr.operands[1], ctx)?;
    let (la, ra) = match (l.0.as_slice(), r.0.as_slice()) {
        ([], _) | (_, []) => return Ok(Sequence::empty()),
        ([Item::Node(a)], [Item::Node(b)]) => (*a, *b),
        _ => return Err(type_error(expr.position, "node comparison requires singleton nodes")),
    };
    let tree = ctx.require_tree()?;
    let result = match op {
        NodeCompareOp::Is => la == ra,
        NodeCompareOp::Precedes => tree.is_before(la, ra),
        NodeCompareOp::Follows => tree.is_before(ra, la),
    };
    Ok(Sequence::atomic(Atomic::Boolean(result)))
}

fn eval_range(expr: &Expr, ctx: &mut DynamicContext<'_>) -> EvalResult<Sequence> {
    let lo_seq = evaluate(&expr.operands[0], ctx)?;
    let hi_seq = evaluate(&expr.operands[1], ctx)?;
    let (lo, hi) = match (singleton_atomic(lo_seq, ctx, expr.position)?, singleton_atomic(hi_seq, ctx, expr.position)?) {
        (Some(a), Some(b)) => (a, b),
        _ => return Ok(Sequence::empty()),
    };
    let lo_i = lo.as_f64().round() as i64;
    let hi_i = hi.as_f64().round() as i64;
    if lo_i > hi_i {
        return Ok(Sequence::empty());
    }
    Ok(Sequence((lo_i..=hi_i).map(|n| Item::Atomic(Atomic::Integer(n))).collect()))
}

fn eval_for(var: xdm::QName, expr: &Expr, ctx: &mut DynamicContext<'_>) -> EvalResult<Sequence> {
    let driving = evaluate(&expr.operands[0], ctx)?;
    let mut out = Vec::new();
    for item in driving.0 {
        ctx.push_frame();
        ctx.bind_variable(var.clone(), Sequence::single(item));
        let result = evaluate(&expr.operands[1], ctx);
        ctx.pop_frame();
        out.extend(result?.0);
    }
    Ok(Sequence(out))
}

fn eval_quantified(var: xdm::QName, expr: &Expr, ctx: &mut DynamicContext<'_>, is_some: bool) -> EvalResult<Sequence> {
    let driving = evaluate(&expr.operands[0], ctx)?;
    let mut result = !is_some;
    for item in driving.0 {
        ctx.push_frame();
        ctx.bind_variable(var.clone(), Sequence::single(item));
        let pred_result = evaluate(&expr.operands[1], ctx);
        ctx.pop_frame();
        let seq = pred_result?;
        let b = seq.effective_boolean_value().map_err(|m| type_error(expr.position, m))?;
        if is_some && b {
            result = true;
            break;
        }
        if !is_some && !b {
            result = false;
            break;
        }
    }
    Ok(Sequence::atomic(Atomic::Boolean(result)))
}

fn item_type_matches(ty: &ItemTypeSpec, item: &Item, ctx: &DynamicContext<'_>) -> bool {
    match ty {
        ItemTypeSpec::AnyItem => true,
        ItemTypeSpec::Node => item.is_node(),
        ItemTypeSpec::Element(_) => matches!((item, ctx.tree), (Item::Node(id), Some(t)) if t.kind(*id) == NodeKind::Element),
        ItemTypeSpec::Attribute(_) => matches!((item, ctx.tree), (Item::Node(id), Some(t)) if t.kind(*id) == NodeKind::Attribute),
        ItemTypeSpec::Atomic(qn) => match item {
            Item::Atomic(a) => atomic_matches_xsd(a, qn),
            Item::Node(_) => false,
        },
    }
}

fn atomic_matches_xsd(a: &Atomic, qn: &xdm::QName) -> bool {
    match qn.local.as_str() {
        "string" => matches!(a, Atomic::String(_)),
        "boolean" => matches!(a, Atomic::Boolean(_)),
        "double" | "decimal" | "float" => matches!(a, Atomic::Double(_) | Atomic::Integer(_)),
        "integer" | "int" | "long" => matches!(a, Atomic::Integer(_)),
        _ => false,
    }
}

fn sequence_matches(ty: &SequenceType, seq: &Sequence, ctx: &DynamicContext<'_>) -> bool {
    match ty {
        SequenceType::Empty => seq.is_empty(),
        SequenceType::Item(item_ty, occurrence) => {
            let len_ok = match occurrence {
                Occurrence::ExactlyOne => seq.len() == 1,
                Occurrence::ZeroOrOne => seq.len() <= 1,
                Occurrence::ZeroOrMore => true,
                Occurrence::OneOrMore => seq.len() >= 1,
            };
            len_ok && seq.0.iter().all(|it| item_type_matches(item_ty, it, ctx))
        }
    }
}

fn cast_atomic(a: &Atomic, qn: &xdm::QName, pos: crate::error::Position) -> EvalResult<Atomic> {
    let fail = || EvalError::Real(Error::value_domain(ErrorCode::FORG0001, pos, format!("cannot cast to {}", qn)));
    Ok(match qn.local.as_str() {
        "string" => Atomic::String(a.as_string()),
        "boolean" => Atomic::Boolean(a.as_bool()),
        "double" | "decimal" | "float" => {
            let f = a.as_f64();
            if f.is_nan() && !matches!(a, Atomic::Double(_)) {
                return Err(fail());
            }
            Atomic::Double(f)
        }
        "integer" | "int" | "long" => match a {
            Atomic::Integer(i) => Atomic::Integer(*i),
            Atomic::Double(d) if d.fract() == 0.0 => Atomic::Integer(*d as i64),
            Atomic::String(s) => s.trim().parse::<i64>().map(Atomic::Integer).map_err(|_| fail())?,
            Atomic::Boolean(b) => Atomic::Integer(if *b { 1 } else { 0 }),
            _ => return Err(fail()),
        },
        _ => return Err(EvalError::Real(Error::unsupported(pos, format!("cast as {} is not a supported atomic type", qn)))),
    })
}

fn eval_seq_type(op: SeqTypeOp, ty: SequenceType, expr: &Expr, ctx: &mut DynamicContext<'_>) -> EvalResult<Sequence> {
    let base = &expr.operands[0];
    match op {
        SeqTypeOp::InstanceOf => {
            let seq = evaluate(base, ctx)?;
            Ok(Sequence::atomic(Atomic::Boolean(sequence_matches(&ty, &seq, ctx))))
        }
        SeqTypeOp::TreatAs => {
            let seq = evaluate(base, ctx)?;
            if sequence_matches(&ty, &seq, ctx) {
                Ok(seq)
            } else {
                Err(type_error(expr.position, "treat as: dynamic type does not match"))
            }
        }
        SeqTypeOp::CastableAs | SeqTypeOp::CastAs => {
            let seq = evaluate(base, ctx)?;
            let single = singleton_atomic(seq, ctx, expr.position)?;
            let atomic_qn = match &ty {
                SequenceType::Item(ItemTypeSpec::Atomic(qn), _) => qn.clone(),
                _ => return Err(EvalError::Real(Error::unsupported(expr.position, "cast/castable target must be an atomic type"))),
            };
            match (op, single) {
                (SeqTypeOp::CastableAs, None) => Ok(Sequence::atomic(Atomic::Boolean(matches!(ty, SequenceType::Item(_, Occurrence::ZeroOrOne | Occurrence::ZeroOrMore))))),
                (SeqTypeOp::CastableAs, Some(a)) => Ok(Sequence::atomic(Atomic::Boolean(cast_atomic(&a, &atomic_qn, expr.position).is_ok()))),
                (SeqTypeOp::CastAs, None) => Ok(Sequence::empty()),
                (SeqTypeOp::CastAs, Some(a)) => Ok(Sequence::atomic(cast_atomic(&a, &atomic_qn, expr.position)?)),
                _ => unreachable!(),
            }
        }
    }
}

/// §4.1 point 4: statically evaluate without a real dynamic context,
/// suppressing `MissingContextError` (it just means "no data yet", not
/// a genuine defect) while letting real `Error`s surface as parse-time
/// failures (scenario 6: `1 + "1"` is rejected at parse time).
pub fn static_check(expr: &Expr) -> Result<(), Error> {
    let mut ctx = DynamicContext::static_analysis();
    match evaluate(expr, &mut ctx) {
        Ok(_) => Ok(()),
        Err(EvalError::MissingContext(_)) => Ok(()),
        Err(EvalError::Real(e)) => Err(e),
    }
}
