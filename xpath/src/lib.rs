//! XPath 1.0/2.0 selector engine over the `xdm` data model: a TDOP
//! parser (`parser`), a closed AST (`ast`), static/dynamic evaluation
//! contexts (`context`), the evaluator (`eval`), the core function
//! library (`functions`), and the `Parser1`/`Parser2`/`Selector` facade
//! (`selector`) callers actually use.

mod ast;
mod context;
mod error;
mod eval;
mod functions;
mod lexer;
mod parser;
mod selector;
mod value;

pub use ast::{Axis, NodeTest};
pub use context::{DynamicContext, ItemTypeSpec, NamespaceMap, Occurrence, ParserOptions, SequenceType, StaticContext, VariableTypes};
pub use error::{Error, ErrorCode, Position};
pub use selector::{iter_select, select, Parser1, Parser2, Selector, Variables};
pub use value::{Atomic, Item, Sequence};
