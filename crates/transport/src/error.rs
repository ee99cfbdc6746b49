use std::error::Error;

/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The remote side answered with a non-success status before any
    /// body was delivered.
    Rejected,
    /// The request could not be delivered at all.
    Unreachable,
    /// Reading the body failed after streaming had started.
    Interrupted,
    /// Any other errors.
    Other,
}

/// The error type for a transport.
pub trait TransportError: Error + Send + Sync + 'static {
    /// Returns the kind of this error.
    fn kind(&self) -> ErrorKind;
}
