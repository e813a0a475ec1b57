use std::error;
use std::fmt;
use std::time::Duration;

/// An error that can occur when compiling or executing a regular expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// A syntax error in the pattern, with the scalar offset at which the
    /// parser gave up.
    Syntax {
        /// Human readable description of the problem.
        message: String,
        /// Offset into the pattern, in scalars.
        pos: usize,
    },
    /// The match deadline elapsed before the engine could decide. The
    /// pattern is echoed back so callers logging the error can tell which
    /// expression blew its budget.
    Timeout {
        /// The pattern whose match attempt was aborted.
        pattern: String,
        /// The configured timeout that was exceeded.
        duration: Duration,
    },
    /// A malformed or unresolvable group reference in a replacement
    /// template.
    Replacement {
        /// Human readable description of the problem.
        message: String,
    },
    /// A caller-supplied start position that is out of bounds or does not
    /// fall on a scalar boundary of the input.
    BadStart {
        /// The offending byte offset.
        offset: usize,
    },
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Syntax { ref message, pos } => {
                write!(f, "parse error at position {}: {}", pos, message)
            }
            Error::Timeout { ref pattern, duration } => {
                write!(
                    f,
                    "match timeout of {:?} exceeded while executing `{}`",
                    duration, pattern
                )
            }
            Error::Replacement { ref message } => {
                write!(f, "replacement template error: {}", message)
            }
            Error::BadStart { offset } => {
                write!(
                    f,
                    "start offset {} is out of bounds or splits a scalar",
                    offset
                )
            }
        }
    }
}

impl Error {
    pub(crate) fn syntax<S: Into<String>>(message: S, pos: usize) -> Error {
        Error::Syntax { message: message.into(), pos }
    }

    pub(crate) fn replacement<S: Into<String>>(message: S) -> Error {
        Error::Replacement { message: message.into() }
    }
}
