//! The core function library (§4.2 "Functions", C5): the XPath 1.0
//! function set plus two XPath 2.0 integration points backed by
//! `chrono`. Dispatched by expanded QName (unprefixed names resolve
//! against the default function namespace, already folded into `name`
//! by the time it reaches here — this module just matches on
//! `name.local`).

use crate::ast::Expr;
use crate::context::DynamicContext;
use crate::error::{Error, ErrorCode, EvalError, EvalResult, Position};
use crate::eval::evaluate;
use crate::value::{Atomic, Item, Sequence};
use log::trace;
use xdm::QName;

fn arity_error(pos: Position, name: &str, expected: &str) -> EvalError {
    EvalError::Real(Error::name_resolution(ErrorCode::XPST0017, pos, format!("{}() expects {} argument(s)", name, expected)))
}

fn eval_args(args: &[Expr], ctx: &mut DynamicContext<'_>) -> EvalResult<Vec<Sequence>> {
    args.iter().map(|a| evaluate(a, ctx)).collect()
}

fn string_arg(seq: &Sequence, ctx: &DynamicContext<'_>) -> EvalResult<String> {
    match seq.0.as_slice() {
        [] => Ok(String::new()),
        [one] => one.string_value(ctx.tree).map_err(|_| EvalError::from(crate::error::MissingContextError)),
        _ => Err(EvalError::Real(Error::value_domain(ErrorCode::FORG0005, Position::start(), "expected a single string argument"))),
    }
}

/// Converts a singleton sequence to its numeric value, atomizing a node
/// item first (as `sum`/`number()`'s zero-arg form already do) rather
/// than treating every non-atomic item as NaN.
fn number_arg(seq: &Sequence, ctx: &DynamicContext<'_>) -> f64 {
    match seq.0.as_slice() {
        [item] => item.atomize(ctx.tree).map(|a| a.as_f64()).unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

/// Contextual-string-value default for functions whose argument is
/// optional (`string()`, `local-name()`, etc.): falls back to the
/// string value of the current context item.
fn context_string(ctx: &DynamicContext<'_>) -> EvalResult<String> {
    let item = ctx.require_item()?;
    item.string_value(ctx.tree).map_err(|_| EvalError::from(crate::error::MissingContextError))
}

pub fn call_function(name: &QName, args: &[Expr], pos: Position, ctx: &mut DynamicContext<'_>) -> EvalResult<Sequence> {
    let local = name.local.as_str();
    trace!("calling {}() with {} argument(s)", local, args.len());
    match local {
        "position" => {
            if !args.is_empty() {
                return Err(arity_error(pos, "position", "0"));
            }
            ctx.require_item()?;
            Ok(Sequence::atomic(Atomic::Integer(ctx.position as i64)))
        }
        "last" => {
            if !args.is_empty() {
                return Err(arity_error(pos, "last", "0"));
            }
            ctx.require_item()?;
            Ok(Sequence::atomic(Atomic::Integer(ctx.size as i64)))
        }
        "count" => {
            if args.len() != 1 {
                return Err(arity_error(pos, "count", "1"));
            }
            let seq = evaluate(&args[0], ctx)?;
            Ok(Sequence::atomic(Atomic::Integer(seq.len() as i64)))
        }
        "id" => {
            if args.len() != 1 {
                return Err(arity_error(pos, "id", "1"));
            }
            let seq = evaluate(&args[0], ctx)?;
            let tree = ctx.require_tree()?;
            let ids: Vec<String> = match seq.0.as_slice() {
                [] => Vec::new(),
                _ => {
                    let mut out = Vec::new();
                    for item in &seq.0 {
                        let s = item.string_value(Some(tree)).map_err(|_| EvalError::from(crate::error::MissingContextError))?;
                        out.extend(s.split_whitespace().map(str::to_string));
                    }
                    out
                }
            };
            // No schema-driven xs:ID typing here: an attribute counts as
            // an ID reference target only if it is literally named `id`.
            let mut matched = Vec::new();
            collect_by_id_attr(tree, tree.root(), &ids, &mut matched);
            Ok(Sequence::nodes(matched).normalize_nodes(tree))
        }
        "local-name" => {
            let target = one_node_or_context(args, ctx)?;
            let name = target.and_then(|id| ctx.tree.and_then(|t| t.name(id).cloned()));
            Ok(Sequence::atomic(Atomic::String(name.map(|n| n.local.to_string()).unwrap_or_default())))
        }
        "namespace-uri" => {
            let target = one_node_or_context(args, ctx)?;
            let name = target.and_then(|id| ctx.tree.and_then(|t| t.name(id).cloned()));
            Ok(Sequence::atomic(Atomic::String(name.and_then(|n| n.ns_uri.map(|u| u.to_string())).unwrap_or_default())))
        }
        "name" => {
            let target = one_node_or_context(args, ctx)?;
            let name = target.and_then(|id| ctx.tree.and_then(|t| t.name(id).cloned()));
            Ok(Sequence::atomic(Atomic::String(name.map(|n| n.to_string()).unwrap_or_default())))
        }
        "string" => {
            let s = if args.is_empty() {
                context_string(ctx)?
            } else if args.len() == 1 {
                let seq = evaluate(&args[0], ctx)?;
                string_arg(&seq, ctx)?
            } else {
                return Err(arity_error(pos, "string", "0 or 1"));
            };
            Ok(Sequence::atomic(Atomic::String(s)))
        }
        "concat" => {
            if args.len() < 2 {
                return Err(arity_error(pos, "concat", "2 or more"));
            }
            let mut out = String::new();
            for a in eval_args(args, ctx)? {
                out.push_str(&string_arg(&a, ctx)?);
            }
            Ok(Sequence::atomic(Atomic::String(out)))
        }
        "starts-with" => {
            let vals = eval_args(args, ctx)?;
            if vals.len() != 2 {
                return Err(arity_error(pos, "starts-with", "2"));
            }
            Ok(Sequence::atomic(Atomic::Boolean(string_arg(&vals[0], ctx)?.starts_with(&string_arg(&vals[1], ctx)?))))
        }
        "contains" => {
            let vals = eval_args(args, ctx)?;
            if vals.len() != 2 {
                return Err(arity_error(pos, "contains", "2"));
            }
            Ok(Sequence::atomic(Atomic::Boolean(string_arg(&vals[0], ctx)?.contains(&string_arg(&vals[1], ctx)?))))
        }
        "substring-before" => {
            let vals = eval_args(args, ctx)?;
            if vals.len() != 2 {
                return Err(arity_error(pos, "substring-before", "2"));
            }
            let (s, t) = (string_arg(&vals[0], ctx)?, string_arg(&vals[1], ctx)?);
            let out = s.find(&t).map(|i| s[..i].to_string()).unwrap_or_default();
            Ok(Sequence::atomic(Atomic::String(out)))
        }
        "substring-after" => {
            let vals = eval_args(args, ctx)?;
            if vals.len() != 2 {
                return Err(arity_error(pos, "substring-after", "2"));
            }
            let (s, t) = (string_arg(&vals[0], ctx)?, string_arg(&vals[1], ctx)?);
            let out = s.find(&t).map(|i| s[i + t.len()..].to_string()).unwrap_or_default();
            Ok(Sequence::atomic(Atomic::String(out)))
        }
        "substring" => {
            let vals = eval_args(args, ctx)?;
            if vals.len() < 2 || vals.len() > 3 {
                return Err(arity_error(pos, "substring", "2 or 3"));
            }
            let s: Vec<char> = string_arg(&vals[0], ctx)?.chars().collect();
            let start = number_arg(&vals[1], ctx).round();
            let len = if vals.len() == 3 { number_arg(&vals[2], ctx).round() } else { f64::INFINITY };
            let first = start.max(1.0);
            let last = if len.is_infinite() { f64::INFINITY } else { start + len };
            let out: String = s
                .into_iter()
                .enumerate()
                .filter(|(i, _)| {
                    let p = (*i + 1) as f64;
                    p >= first && p < last
                })
                .map(|(_, c)| c)
                .collect();
            Ok(Sequence::atomic(Atomic::String(out)))
        }
        "string-length" => {
            let s = if args.is_empty() { context_string(ctx)? } else { string_arg(&evaluate(&args[0], ctx)?, ctx)? };
            Ok(Sequence::atomic(Atomic::Integer(s.chars().count() as i64)))
        }
        "normalize-space" => {
            let s = if args.is_empty() { context_string(ctx)? } else { string_arg(&evaluate(&args[0], ctx)?, ctx)? };
            Ok(Sequence::atomic(Atomic::String(s.split_whitespace().collect::<Vec<_>>().join(" "))))
        }
        "translate" => {
            let vals = eval_args(args, ctx)?;
            if vals.len() != 3 {
                return Err(arity_error(pos, "translate", "3"));
            }
            let s = string_arg(&vals[0], ctx)?;
            let from: Vec<char> = string_arg(&vals[1], ctx)?.chars().collect();
            let to: Vec<char> = string_arg(&vals[2], ctx)?.chars().collect();
            let out: String = s
                .chars()
                .filter_map(|c| match from.iter().position(|&f| f == c) {
                    Some(i) => to.get(i).copied(),
                    None => Some(c),
                })
                .collect();
            Ok(Sequence::atomic(Atomic::String(out)))
        }
        "boolean" => {
            if args.len() != 1 {
                return Err(arity_error(pos, "boolean", "1"));
            }
            let seq = evaluate(&args[0], ctx)?;
            let b = seq.effective_boolean_value().map_err(|m| EvalError::Real(Error::static_type(ErrorCode::XPTY0004, pos, m)))?;
            Ok(Sequence::atomic(Atomic::Boolean(b)))
        }
        "not" => {
            if args.len() != 1 {
                return Err(arity_error(pos, "not", "1"));
            }
            let seq = evaluate(&args[0], ctx)?;
            let b = seq.effective_boolean_value().map_err(|m| EvalError::Real(Error::static_type(ErrorCode::XPTY0004, pos, m)))?;
            Ok(Sequence::atomic(Atomic::Boolean(!b)))
        }
        "true" => {
            if !args.is_empty() {
                return Err(arity_error(pos, "true", "0"));
            }
            Ok(Sequence::atomic(Atomic::Boolean(true)))
        }
        "false" => {
            if !args.is_empty() {
                return Err(arity_error(pos, "false", "0"));
            }
            Ok(Sequence::atomic(Atomic::Boolean(false)))
        }
        "lang" => {
            if args.len() != 1 {
                return Err(arity_error(pos, "lang", "1"));
            }
            let seq = evaluate(&args[0], ctx)?;
            let wanted = string_arg(&seq, ctx)?.to_ascii_lowercase();
            let tree = ctx.require_tree()?;
            let item = ctx.require_item()?;
            let mut cur = match item {
                Item::Node(id) => Some(id),
                Item::Atomic(_) => None,
            };
            let mut found = None;
            while let Some(id) = cur {
                if let Some(attr) = tree.attributes(id).iter().find(|&&a| tree.name(a).map(|n| n.local.as_str()) == Some("lang")) {
                    found = tree.node(*attr).value.clone();
                    break;
                }
                cur = tree.parent(id);
            }
            let matches = found.map(|v| v.to_ascii_lowercase().starts_with(&wanted)).unwrap_or(false);
            Ok(Sequence::atomic(Atomic::Boolean(matches)))
        }
        "number" => {
            let n = if args.is_empty() {
                let item = ctx.require_item()?;
                let a = item.atomize(ctx.tree).map_err(|_| EvalError::from(crate::error::MissingContextError))?;
                a.as_f64()
            } else if args.len() == 1 {
                number_arg(&evaluate(&args[0], ctx)?, ctx)
            } else {
                return Err(arity_error(pos, "number", "0 or 1"));
            };
            Ok(Sequence::atomic(Atomic::Double(n)))
        }
        "sum" => {
            if args.is_empty() || args.len() > 2 {
                return Err(arity_error(pos, "sum", "1 or 2"));
            }
            let seq = evaluate(&args[0], ctx)?;
            if seq.is_empty() {
                return match args.get(1) {
                    Some(zero) => evaluate(zero, ctx),
                    None => Ok(Sequence::atomic(Atomic::Integer(0))),
                };
            }
            let mut total = 0.0;
            let mut all_int = true;
            for item in &seq.0 {
                let a = item.atomize(ctx.tree).map_err(|_| EvalError::from(crate::error::MissingContextError))?;
                if !matches!(a, Atomic::Integer(_)) {
                    all_int = false;
                }
                total += a.as_f64();
            }
            Ok(Sequence::atomic(if all_int { Atomic::Integer(total as i64) } else { Atomic::Double(total) }))
        }
        "floor" => numeric_unary(args, pos, ctx, "floor", f64::floor),
        "ceiling" => numeric_unary(args, pos, ctx, "ceiling", f64::ceil),
        "round" => numeric_unary(args, pos, ctx, "round", |n| (n + 0.5).floor()),
        "current-dateTime" => {
            if !args.is_empty() {
                return Err(arity_error(pos, "current-dateTime", "0"));
            }
            Ok(Sequence::atomic(Atomic::String(ctx.current_dt().to_rfc3339())))
        }
        "implicit-timezone" => {
            if !args.is_empty() {
                return Err(arity_error(pos, "implicit-timezone", "0"));
            }
            Ok(Sequence::atomic(Atomic::String(ctx.timezone.to_string())))
        }
        other => Err(EvalError::Real(Error::name_resolution(ErrorCode::XPST0017, pos, format!("unknown function '{}'", other)))),
    }
}

fn numeric_unary(args: &[Expr], pos: Position, ctx: &mut DynamicContext<'_>, name: &str, f: impl Fn(f64) -> f64) -> EvalResult<Sequence> {
    if args.len() != 1 {
        return Err(arity_error(pos, name, "1"));
    }
    let seq = evaluate(&args[0], ctx)?;
    if seq.is_empty() {
        return Ok(Sequence::empty());
    }
    let n = number_arg(&seq, ctx);
    if n.is_nan() {
        return Ok(Sequence::atomic(Atomic::Double(f64::NAN)));
    }
    let result = f(n);
    if result.fract() == 0.0 && result.abs() < 1e15 {
        Ok(Sequence::atomic(Atomic::Integer(result as i64)))
    } else {
        Ok(Sequence::atomic(Atomic::Double(result)))
    }
}

fn one_node_or_context(args: &[Expr], ctx: &mut DynamicContext<'_>) -> EvalResult<Option<xdm::NodeId>> {
    if args.is_empty() {
        match ctx.require_item()? {
            Item::Node(id) => Ok(Some(id)),
            Item::Atomic(_) => Ok(None),
        }
    } else if args.len() == 1 {
        let seq = evaluate(&args[0], ctx)?;
        match seq.0.as_slice() {
            [] => Ok(None),
            [Item::Node(id)] => Ok(Some(*id)),
            _ => Err(EvalError::Real(Error::value_domain(ErrorCode::FORG0005, Position::start(), "expected a single node argument"))),
        }
    } else {
        Err(arity_error(Position::start(), "local-name/namespace-uri/name", "0 or 1"))
    }
}

fn collect_by_id_attr(tree: &xdm::Tree, node: xdm::NodeId, ids: &[String], out: &mut Vec<xdm::NodeId>) {
    if tree.kind(node) == xdm::NodeKind::Element {
        for &attr in tree.attributes(node) {
            if tree.name(attr).map(|n| n.local.as_str()) == Some("id") {
                if let Some(v) = &tree.node(attr).value {
                    if ids.iter().any(|id| id == v) {
                        out.push(node);
                    }
                }
            }
        }
    }
    for &child in tree.children(node) {
        collect_by_id_attr(tree, child, ids, out);
    }
}
