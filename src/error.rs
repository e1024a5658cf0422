//! Structured errors produced by the reader and the evaluator.

use thiserror::Error;

use crate::location::Brand;
use crate::value::Value;

pub type Result<T> = std::result::Result<T, EvalError>;

/// An evaluation error, optionally branded with the AST node that raised it.
#[derive(Error, Debug, Clone)]
#[error("{kind}")]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub brand: Option<Brand>,
}

impl EvalError {
    pub fn new(kind: EvalErrorKind) -> Self {
        Self { kind, brand: None }
    }

    pub fn at(mut self, brand: Option<Brand>) -> Self {
        if self.brand.is_none() {
            self.brand = brand;
        }
        self
    }

    /// Renders as `<Kind>: <message> at line:L, col:C` when branded, for
    /// the host program to print directly to the user.
    pub fn render(&self) -> String {
        match &self.brand {
            Some(brand) => format!("{}: {} at {}", self.kind.label(), self.kind, brand),
            None => format!("{}: {}", self.kind.label(), self.kind),
        }
    }
}

impl From<EvalErrorKind> for EvalError {
    fn from(kind: EvalErrorKind) -> Self {
        EvalError::new(kind)
    }
}

#[derive(Error, Debug, Clone)]
pub enum EvalErrorKind {
    #[error("unbound reference '{0}'")]
    UnboundReference(String),

    #[error("arity mismatch: {0}")]
    ArityMismatch(String),

    #[error("cannot invoke '{0}' as a function")]
    NotCallable(String),

    #[error("malformed form: {0}")]
    MalformedForm(String),

    #[error("'{0}' is not bound in the local scope")]
    LocalAssignmentToUnbound(String),

    #[error("host error: {0}")]
    HostError(String),
}

impl EvalErrorKind {
    /// The `<Kind>` token in `render`'s `<Kind>: <message> at line:L,
    /// col:C` template, matching spec.md §7's named error kinds.
    pub fn label(&self) -> &'static str {
        match self {
            EvalErrorKind::UnboundReference(_) => "Unbound reference",
            EvalErrorKind::ArityMismatch(_) => "Arity mismatch",
            EvalErrorKind::NotCallable(_) => "Not callable",
            EvalErrorKind::MalformedForm(_) => "Malformed form",
            EvalErrorKind::LocalAssignmentToUnbound(_) => "Local assignment to unbound",
            EvalErrorKind::HostError(_) => "Host error during foreign call",
        }
    }
}

/// Errors raised while turning source text into AST nodes.
#[derive(Error, Debug, Clone)]
#[error("{kind}")]
pub struct ReadError {
    pub kind: ReadErrorKind,
    pub brand: Option<Brand>,
}

impl ReadError {
    pub fn new(kind: ReadErrorKind, brand: Option<Brand>) -> Self {
        Self { kind, brand }
    }

    /// Renders as `<Kind>: <message> at line:L, col:C` when branded, same
    /// template as `EvalError::render`; every `ReadErrorKind` variant is a
    /// *Parse error* per spec.md §7.
    pub fn render(&self) -> String {
        match &self.brand {
            Some(brand) => format!("Parse error: {} at {}", self.kind, brand),
            None => format!("Parse error: {}", self.kind),
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum ReadErrorKind {
    #[error("unmatched closing parenthesis")]
    UnmatchedParenthesis,

    #[error("unclosed parenthesis")]
    UnclosedParenthesis,

    #[error("unclosed string literal")]
    UnclosedString,

    #[error("reader macro '{0}' has nothing to quote")]
    DanglingReaderMacro(&'static str),

    #[error("invalid special form: {0}")]
    InvalidSpecialForm(String),
}

pub type ReadResult<T> = std::result::Result<T, ReadError>;

pub(crate) fn not_callable(v: &Value) -> EvalErrorKind {
    EvalErrorKind::NotCallable(v.repr_compact())
}
