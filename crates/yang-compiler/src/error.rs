//! The loader's failure taxonomy.
//!
//! Every operation returns an explicit [`Result`]; a failed load reports one
//! [`Error`] and leaves the repository exactly as it was before the call.

use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Structured data about a loader failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    // Lexical.
    #[error("unexpected character: {data}")]
    UnexpectedChar { data: String },
    #[error("unterminated string")]
    UnterminatedString,
    #[error("bad escape sequence `{data}`")]
    BadEscape { data: String },

    // Structural.
    #[error("duplicate `{keyword}` statement")]
    DuplicateStatement { keyword: String },
    #[error("`{parent}` is missing its mandatory `{keyword}` substatement")]
    MissingRequiredChild { parent: String, keyword: String },
    #[error("`{keyword}` statement is not allowed here")]
    UnexpectedStatementInContext { keyword: String },
    #[error("invalid value `{value}` for `{keyword}`")]
    InvalidValue { keyword: String, value: String },

    // Semantic.
    #[error("duplicate identifier `{name}`")]
    DuplicateIdentifier { name: String },
    #[error("prefix `{prefix}` is not declared")]
    UnknownPrefix { prefix: String },
    #[error("cannot resolve {what} `{name}`")]
    UnresolvedReference { what: &'static str, name: String },
    #[error("leafref `{path}` forms a circular chain")]
    CircularLeafref { path: String },
    #[error("invalid range or length expression `{expr}`")]
    InvalidRange { expr: String },
    #[error("bit position overflows 4294967295")]
    BitPositionOverflow,
    #[error("enum value overflows 2147483647")]
    EnumValueOverflow,
    #[error("a mandatory node cannot have a default")]
    MandatoryWithDefault,

    // Integration.
    #[error("revision {existing} of module `{name}` is already implemented")]
    ConflictingImplementedRevision { name: String, existing: String },
    #[error("a module cannot deviate its own definitions")]
    DeviationOfOwnModule,
    #[error("deviate not-supported cannot remove list key `{name}`")]
    NotSupportedRemovesKey { name: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

/// A loader error: the structured kind plus a schema-path breadcrumb and,
/// when the failure maps back to the input, a byte offset into the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    /// Schema path of the statement that failed, e.g. `/interfaces/interface`.
    pub path: Option<String>,
    /// Byte offset into the source text being parsed.
    pub loc: Option<usize>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            path: None,
            loc: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_loc(mut self, loc: usize) -> Self {
        self.loc = Some(loc);
        self
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal {
            message: message.into(),
        })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)?;
        if let Some(path) = &self.path {
            write!(f, " (at {path})")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::new(kind)
    }
}

/// Map a syntax error from the parser onto the lexical/structural taxonomy.
pub(crate) fn from_syntax(error: &yang_parser::Error) -> Error {
    let kind = if error.message().contains("unterminated string") {
        ErrorKind::UnterminatedString
    } else if error.message().contains("unterminated block comment") {
        ErrorKind::UnterminatedString
    } else if error.message().contains("escape") {
        ErrorKind::BadEscape {
            data: error.data().to_string(),
        }
    } else {
        ErrorKind::UnexpectedChar {
            data: format!("{}: {}", error.message(), error.data()),
        }
    };
    Error::new(kind).with_loc(error.index())
}
