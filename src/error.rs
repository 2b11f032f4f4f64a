use itertools::Itertools;
use thiserror::Error;

use crate::{formula::FormulaContext, header::Property, lexer::Position};

/// The kinds of errors the [`crate::lexer::Lexer`] can run into.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum LexErrorKind {
    /// A quoted string was opened but never closed.
    #[error("unterminated string")]
    UnterminatedString,
    /// A `/*` comment was opened but never closed.
    #[error("unterminated comment")]
    UnterminatedComment,
    /// A character that cannot start any token.
    #[error("unexpected character `{0}`")]
    UnexpectedChar(char),
    /// An integer literal that does not fit into 32 bits.
    #[error("integer literal is too large")]
    IntegerOverflow,
}

/// An error encountered while splitting the input into tokens. Always fatal for the
/// document it occurs in.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("{position}: {kind}")]
pub struct LexError {
    /// What went wrong.
    pub kind: LexErrorKind,
    /// Where the offending input starts.
    pub position: Position,
}

impl LexError {
    pub(crate) fn new(kind: LexErrorKind, position: Position) -> Self {
        Self { kind, position }
    }
}

/// The kinds of errors the header and body parsers can produce.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[allow(missing_docs)]
pub enum ParseErrorKind {
    #[error("missing mandatory header `{0}:`")]
    MissingRequiredHeader(String),
    #[error("header `{0}:` may only appear once")]
    DuplicateExclusiveHeader(String),
    #[error("alias `@{0}` is defined more than once")]
    DuplicateAlias(String),
    #[error("malformed formula, expected {expected} but found {found}")]
    MalformedFormula { expected: String, found: String },
    #[error("edge appears before the first `State:` line")]
    EdgeBeforeState,
    #[error("missing `--END--`")]
    MissingEnd,
    #[error("automaton was aborted with `--ABORT--`")]
    Aborted,
    #[error("expected {expected} but found {found}")]
    UnexpectedToken { expected: String, found: String },
}

/// A syntactic error, fatal for the document it occurs in.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("{position}: {kind}")]
pub struct ParseError {
    /// What went wrong.
    pub kind: ParseErrorKind,
    /// The position of the offending token, or the end of the document.
    pub position: Position,
}

impl ParseError {
    pub(crate) fn new(kind: ParseErrorKind, position: Position) -> Self {
        Self { kind, position }
    }
}

/// Distinguishes the different kinds of indices that are subject to range checks.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[allow(missing_docs)]
pub enum RangeKind {
    Proposition,
    AcceptanceSet,
    StartState,
    State,
    EdgeTarget,
}

impl std::fmt::Display for RangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RangeKind::Proposition => write!(f, "atomic proposition"),
            RangeKind::AcceptanceSet => write!(f, "acceptance set"),
            RangeKind::StartState => write!(f, "start state"),
            RangeKind::State => write!(f, "state"),
            RangeKind::EdgeTarget => write!(f, "edge target"),
        }
    }
}

/// Names the declared quantity a [`ValidationErrorKind::CardinalityMismatch`] refers to.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[allow(missing_docs)]
pub enum Cardinality {
    States,
    AtomicPropositions,
}

impl std::fmt::Display for Cardinality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cardinality::States => write!(f, "states"),
            Cardinality::AtomicPropositions => write!(f, "atomic propositions"),
        }
    }
}

/// The kinds of semantic errors found by the validator.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[allow(missing_docs)]
pub enum ValidationErrorKind {
    #[error("{kind} {index} is out of range, only {bound} are declared")]
    RangeViolation {
        kind: RangeKind,
        index: u32,
        bound: u32,
    },
    #[error("`{formula}` contains atoms that are not allowed in {context}")]
    MisplacedAtom {
        formula: String,
        context: FormulaContext,
    },
    #[error("alias `@{name}` is not defined")]
    UnresolvedAlias { name: String },
    #[error("aliases are defined cyclically: {}", .chain.iter().map(|name| format!("@{name}")).join(" -> "))]
    CyclicAlias { chain: Vec<String> },
    #[error("alias `@{name}` is used before it is defined")]
    AliasUsedBeforeDefinition { name: String },
    #[error("inconsistent labeling: {reason}")]
    InconsistentLabeling { reason: String },
    #[error("inconsistent placement of acceptance sets: {reason}")]
    InconsistentAcceptance { reason: String },
    #[error("property `{property}` does not hold: {reason}")]
    PropertyViolation { property: Property, reason: String },
    #[error("unknown property `{name}`")]
    UnknownProperty { name: String },
    #[error("declared {declared} {what}, but found {actual}")]
    CardinalityMismatch {
        what: Cardinality,
        declared: u32,
        actual: u32,
    },
    #[error("state {index} is defined more than once")]
    DuplicateState { index: u32 },
    #[error("atomic proposition \"{name}\" is declared more than once")]
    DuplicateProposition { name: String },
}

/// A semantic error. Validation errors are collected rather than short-circuited, so a
/// single run reports every independent problem of the first failing category.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ValidationError {
    /// What went wrong.
    pub kind: ValidationErrorKind,
    /// The line responsible for the error, if the automaton was parsed from text.
    pub position: Option<Position>,
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind, position: Option<Position>) -> Self {
        Self { kind, position }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.position {
            Some(position) => write!(f, "{position}: {}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Unifies the errors of all stages.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum Error {
    /// See [`LexError`].
    #[error(transparent)]
    Lex(#[from] LexError),
    /// See [`ParseError`].
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// See [`ValidationError`].
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl Error {
    /// The source position the error points to, if any.
    pub fn position(&self) -> Option<Position> {
        match self {
            Error::Lex(e) => Some(e.position),
            Error::Parse(e) => Some(e.position),
            Error::Validation(e) => e.position,
        }
    }
}

/// Everything that went wrong with a single document. An [`ErrorReport`] always contains
/// at least one error, and a document with an error report never produces an automaton.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ErrorReport {
    document: usize,
    errors: Vec<Error>,
}

impl ErrorReport {
    /// A report starting with `first`, which makes sure that it is never empty.
    pub(crate) fn new<I: IntoIterator<Item = Error>>(first: Error, rest: I) -> Self {
        Self {
            document: 0,
            errors: std::iter::once(first).chain(rest).collect(),
        }
    }

    pub(crate) fn in_document(mut self, document: usize) -> Self {
        self.document = document;
        self
    }

    /// The zero-based index of the document within the input stream.
    pub fn document(&self) -> usize {
        self.document
    }

    /// All errors that were found.
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    /// Consumes `self` and returns the contained errors.
    pub fn into_errors(self) -> Vec<Error> {
        self.errors
    }

    /// The first error, which is the most relevant one when errors are fixed one by one.
    pub fn first(&self) -> &Error {
        &self.errors[0]
    }

    /// Iterates over the validation errors only.
    pub fn validation_errors(&self) -> impl Iterator<Item = &ValidationErrorKind> + '_ {
        self.errors.iter().filter_map(|e| match e {
            Error::Validation(v) => Some(&v.kind),
            _ => None,
        })
    }
}

impl std::fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "document {} is invalid ({} error{}):",
            self.document,
            self.errors.len(),
            if self.errors.len() == 1 { "" } else { "s" }
        )?;
        for error in &self.errors {
            writeln!(f, "  {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorReport {}

impl From<LexError> for ErrorReport {
    fn from(value: LexError) -> Self {
        Self::new(value.into(), [])
    }
}

impl From<ParseError> for ErrorReport {
    fn from(value: ParseError) -> Self {
        Self::new(value.into(), [])
    }
}
