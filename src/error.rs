//! Unified infrastructure error type.

use thiserror::Error as ThisError;

/// The error type returned by the crate's fallible setup operations.
///
/// Request-level failures (404, 409, validation) are expressed as
/// [`ApiError`](crate::ApiError) values and rendered into responses. This type
/// surfaces the rest: binding to a port, accepting a connection, or editing
/// a parser that does not hold the named argument.
#[derive(Debug, ThisError)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{0}`")]
    InvalidAddress(String),

    #[error("argument `{0}` is not defined on this parser")]
    UnknownArgument(String),
}
