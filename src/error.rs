use std::{io, path::PathBuf};

use crate::ast::ValueType;

/// A literal that cannot be represented in the count-encoded tree.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EncodingError {
    #[error("integer literal {0} is outside [-2147483647, 4294967295]")]
    IntOutOfRange(i64),

    #[error("char literal must hold exactly one scalar, found {0}")]
    CharLength(usize),

    #[error("string literal is not valid UTF-8")]
    InvalidUtf8,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("malformed tree: {0}")]
    MalformedCtr(String),

    #[error("malformed tree at '{path}': {reason}", path = .0.display(), reason = .1)]
    MalformedStore(PathBuf, String),

    #[error("variable '{0}' is already declared")]
    DuplicateDeclaration(String),

    #[error("variable '{0}' is not declared")]
    UndeclaredVariable(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("string bytes are not valid UTF-8")]
    InvalidEncoding,

    #[error("division by zero")]
    DivisionByZero,

    #[error("cannot read {0:?} as {1}")]
    InvalidInput(String, ValueType),
}

impl Error {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Error::MalformedCtr(message.into())
    }

    pub(crate) fn invalid_operation(message: impl Into<String>) -> Self {
        Error::InvalidOperation(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_name_the_folder() {
        let err = Error::MalformedStore(PathBuf::from("build/a"), "missing child 'b'".into());
        assert_eq!(err.to_string(), "malformed tree at 'build/a': missing child 'b'");
    }

    #[test]
    fn io_errors_convert() {
        let err: Error = io::Error::new(io::ErrorKind::UnexpectedEof, "input exhausted").into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.to_string(), "input exhausted");
    }
}
