use thiserror::Error;

/// Errors that can occur while building a node tree from a host. These
/// are host-integrity problems (malformed identity, not XPath errors);
/// XPath-level errors live in the `xpath` crate's `Error` type.
#[derive(Debug, Clone, Error)]
pub enum TreeError {
    #[error("invalid namespace declaration on element: {0}")]
    InvalidNamespaceDeclaration(String),
    #[error("duplicate attribute {0:?} on element")]
    DuplicateAttribute(String),
}
