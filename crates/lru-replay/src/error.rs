//! Error types for trace parsing

use std::fmt;

/// Result type alias for trace operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while reading a trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Line is not `VERB arg...`
    Syntax {
        /// 1-based line number
        line: usize,
        /// Offending text
        text: String,
    },

    /// Verb is not one of the supported operations
    UnknownCommand {
        /// 1-based line number
        line: usize,
        /// Verb as written
        verb: String,
    },

    /// Verb takes a different number of arguments
    WrongArity {
        /// 1-based line number
        line: usize,
        /// Verb, upper-cased
        verb: String,
        /// Arguments the verb takes
        expected: usize,
        /// Arguments found
        found: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Syntax { line, text } => write!(f, "line {}: cannot parse '{}'", line, text),
            Error::UnknownCommand { line, verb } => {
                write!(f, "line {}: unknown command '{}'", line, verb)
            }
            Error::WrongArity {
                line,
                verb,
                expected,
                found,
            } => write!(
                f,
                "line {}: wrong number of arguments for '{}' (expected {}, got {})",
                line, verb, expected, found
            ),
        }
    }
}

impl std::error::Error for Error {}
