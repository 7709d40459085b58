use std::fmt;

use thiserror::Error as ThisError;

/// Every diagnostic the parser or the evaluator can report.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ErrorKind {
    // parse time
    #[error("expected name declaration but got \"{0}\"")]
    ExpectedIdent(String),
    #[error("expected opening parenthesis but got \"{0}\"")]
    ExpectedParen(String),
    #[error("expected opening brace but got \"{0}\"")]
    ExpectedBrace(String),
    #[error("expected \"{expected}\" but got \"{found}\"")]
    ExpectedTerminator { expected: String, found: String },
    #[error("expected initialization for loop variable")]
    ExpectedLoopInit,
    #[error("expected condition for loop action")]
    ExpectedLoopCondition,
    #[error("expected expression but got \"{0}\"")]
    ExpectedExpression(String),
    #[error("expected operator but got \"{0}\"")]
    ExpectedOperator(String),
    #[error("unexpected end of file, expected \"{0}\"")]
    UnexpectedEof(String),
    #[error("unexpected end of file in expression")]
    EofInExpression,
    #[error("unexpected \"{0}\"")]
    UnexpectedToken(String),
    #[error("\"{0}\" is not a valid number")]
    InvalidNumber(String),
    #[error("illegal character \"{0}\"")]
    IllegalCharacter(String),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("illegal operation attempt")]
    IllegalOperation,

    // evaluation time
    #[error("identifier not found: {0}")]
    IdentNotFound(String),
    #[error("invalid operator for object")]
    InvalidOperator,
    #[error("invalid operator combination of objects")]
    InvalidCombination,
    #[error("expected conditional or boolean")]
    ExpectedBoolean,
    #[error("expected {expected} function parameters but got {found}")]
    ArityMismatch { expected: usize, found: usize },
    #[error("\"{0}\" is not a function")]
    NotCallable(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    IntegerOverflow,
    #[error("expression produced no value")]
    MissingValue,
    #[error("maximum call depth of {0} exceeded")]
    CallDepthExceeded(usize),
    #[error("{builtin}: {message}")]
    Builtin {
        builtin: &'static str,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("* Error at L{line} {kind}")]
pub struct Error {
    pub line: usize,
    pub kind: ErrorKind,
}

impl Error {
    pub fn new(line: usize, kind: ErrorKind) -> Self {
        Error { line, kind }
    }
}

/// Ordered, append-only list of diagnostics for a single parse or evaluate call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Errors {
    errors: Vec<Error>,
}

impl Errors {
    pub fn new() -> Self {
        Errors::default()
    }

    pub fn add(&mut self, error: Error) {
        log::debug!("{}", error);
        self.errors.push(error);
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Error> {
        self.errors.iter()
    }

    pub fn kinds(&self) -> Vec<&ErrorKind> {
        self.errors.iter().map(|error| &error.kind).collect()
    }
}

impl<'a> IntoIterator for &'a Errors {
    type Item = &'a Error;
    type IntoIter = std::slice::Iter<'a, Error>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl fmt::Display for Errors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for error in &self.errors {
            writeln!(f, "{}", error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_one_diagnostic_per_line() {
        let mut errors = Errors::new();
        errors.add(Error::new(1, ErrorKind::IllegalOperation));
        errors.add(Error::new(3, ErrorKind::IdentNotFound("x".into())));

        assert_eq!(
            errors.to_string(),
            "* Error at L1 illegal operation attempt\n* Error at L3 identifier not found: x\n"
        );
    }

    #[test]
    fn arity_message_names_both_counts() {
        let error = Error::new(
            2,
            ErrorKind::ArityMismatch {
                expected: 2,
                found: 3,
            },
        );
        assert_eq!(
            error.to_string(),
            "* Error at L2 expected 2 function parameters but got 3"
        );
    }
}
