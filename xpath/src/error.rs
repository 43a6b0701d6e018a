//! The error hierarchy (§7, §6.4): every error carries a W3C error
//! code, a source position, and a message.

use std::fmt;
use thiserror::Error;

/// A (line, column) position into the parsed expression source (§3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn start() -> Self {
        Position { line: 1, column: 1 }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// W3C XPath/XQuery error codes actually emitted by this engine (§6.4,
/// §7). Not every code in the specification family is represented —
/// only the ones this implementation's static/dynamic analysis can
/// produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum ErrorCode {
    /// Syntax error in the expression grammar.
    XPST0003,
    /// Static type error: an operand's type is known to be wrong.
    XPTY0004,
    /// Static error: a function/operator used incorrectly.
    XPST0005,
    /// Dynamic context component required but absent.
    XPDY0002,
    /// Unknown variable or function name.
    XPST0008,
    /// Unknown namespace prefix.
    XPST0081,
    /// Wrong number of arguments to a function.
    XPST0017,
    /// Arithmetic: divide by zero.
    FOAR0001,
    /// Invalid lexical form for a cast.
    FORG0001,
    /// Argument error: exactly-one/zero-or-one cardinality violated.
    FORG0005,
    /// Invalid regular expression / flags.
    FORX0002,
    /// Unsupported / not-yet-implemented feature (graceful refusal).
    FOER0000,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        use ErrorCode::*;
        match self {
            XPST0003 => "err:XPST0003",
            XPTY0004 => "err:XPTY0004",
            XPST0005 => "err:XPST0005",
            XPDY0002 => "err:XPDY0002",
            XPST0008 => "err:XPST0008",
            XPST0081 => "err:XPST0081",
            XPST0017 => "err:XPST0017",
            FOAR0001 => "err:FOAR0001",
            FORG0001 => "err:FORG0001",
            FORG0005 => "err:FORG0005",
            FORX0002 => "err:FORX0002",
            FOER0000 => "err:FOER0000",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The public error type. One variant per semantic category in §7;
/// each still carries the concrete `ErrorCode` so callers can match on
/// the W3C code directly via `Error::code`.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("{code}: syntax error at {position}: {message}")]
    Syntax { code: ErrorCode, position: Position, message: String },

    #[error("{code}: static type error at {position}: {message}")]
    StaticType { code: ErrorCode, position: Position, message: String },

    #[error("{code}: missing dynamic context at {position}: {message}")]
    DynamicContextMissing { code: ErrorCode, position: Position, message: String },

    #[error("{code}: name resolution error at {position}: {message}")]
    NameResolution { code: ErrorCode, position: Position, message: String },

    #[error("{code}: value error at {position}: {message}")]
    ValueDomain { code: ErrorCode, position: Position, message: String },

    #[error("{code}: unsupported feature at {position}: {message}")]
    Unsupported { code: ErrorCode, position: Position, message: String },
}

impl Error {
    pub fn syntax(position: Position, message: impl Into<String>) -> Self {
        Error::Syntax { code: ErrorCode::XPST0003, position, message: message.into() }
    }

    pub fn static_type(code: ErrorCode, position: Position, message: impl Into<String>) -> Self {
        Error::StaticType { code, position, message: message.into() }
    }

    pub fn dynamic_context_missing(position: Position, message: impl Into<String>) -> Self {
        Error::DynamicContextMissing { code: ErrorCode::XPDY0002, position, message: message.into() }
    }

    pub fn name_resolution(code: ErrorCode, position: Position, message: impl Into<String>) -> Self {
        Error::NameResolution { code, position, message: message.into() }
    }

    pub fn value_domain(code: ErrorCode, position: Position, message: impl Into<String>) -> Self {
        Error::ValueDomain { code, position, message: message.into() }
    }

    pub fn unsupported(position: Position, message: impl Into<String>) -> Self {
        Error::Unsupported { code: ErrorCode::FOER0000, position, message: message.into() }
    }

    /// Folds a host-tree integrity problem (`xdm::TreeError`, raised
    /// while building the node tree, before any expression runs) into
    /// the public error type. There is no more specific W3C code for
    /// "the host tree itself is malformed", so this reuses
    /// `ValueDomain`/`FORG0001` the way a cast from an invalid lexical
    /// form would.
    pub fn from_tree_error(e: xdm::TreeError) -> Self {
        Error::value_domain(ErrorCode::FORG0001, Position::start(), e.to_string())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Syntax { code, .. }
            | Error::StaticType { code, .. }
            | Error::DynamicContextMissing { code, .. }
            | Error::NameResolution { code, .. }
            | Error::ValueDomain { code, .. }
            | Error::Unsupported { code, .. } => *code,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            Error::Syntax { position, .. }
            | Error::StaticType { position, .. }
            | Error::DynamicContextMissing { position, .. }
            | Error::NameResolution { position, .. }
            | Error::ValueDomain { position, .. }
            | Error::Unsupported { position, .. } => *position,
        }
    }
}

/// Raised internally when a token's `evaluate` needs dynamic data that
/// a static-analysis pass (no dynamic context) cannot supply. §4.1
/// "A token whose evaluation truly needs data throws
/// `MissingContextError`, which is caught and suppressed at the top
/// level of static analysis." Never part of the public `Error` enum —
/// if it escapes a real (dynamic) evaluation, it is a bug, and
/// `Parser::parse` converts any that slip through into
/// `Error::DynamicContextMissing`.
#[derive(Debug, Clone, Copy)]
pub struct MissingContextError;

impl fmt::Display for MissingContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dynamic context required but not available during static analysis")
    }
}

/// What a token's `evaluate`/`select` can fail with: a real `Error`, or
/// the internal missing-context signal.
#[derive(Debug, Clone)]
pub enum EvalError {
    Real(Error),
    MissingContext(MissingContextError),
}

impl From<Error> for EvalError {
    fn from(e: Error) -> Self {
        EvalError::Real(e)
    }
}

impl From<MissingContextError> for EvalError {
    fn from(e: MissingContextError) -> Self {
        EvalError::MissingContext(e)
    }
}

pub type EvalResult<T> = Result<T, EvalError>;

impl EvalError {
    /// Collapses the internal signal into the public error type for
    /// anything that escapes a real (dynamic) evaluation — a
    /// `MissingContextError` here means a token's `evaluate` assumed
    /// static analysis had already ruled this path out, which is a
    /// contract violation worth surfacing rather than panicking on.
    pub fn into_public(self, position: Position) -> Error {
        match self {
            EvalError::Real(e) => e,
            EvalError::MissingContext(_) => {
                Error::dynamic_context_missing(position, "required dynamic context (tree, focus, or variable) was not available")
            }
        }
    }
}
