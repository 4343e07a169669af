
//! Error type definitions.

use std::borrow::Cow;
use std::io::ErrorKind;
pub use std::io::Error as IoError;
pub use std::io::Result as IoResult;
use std::convert::TryFrom;
use std::error;
use std::fmt;
use std::num::TryFromIntError;


/// A result that may contain a lerc error.
pub type Result<T> = std::result::Result<T, Error>;

/// A result that, if ok, contains nothing, and otherwise contains a lerc error.
pub type UnitResult = Result<()>;


/// An error that may happen while reading or writing a lerc blob.
/// Distinguishes between three types of errors:
/// unsupported content, invalid content, and general io errors.
#[derive(Debug)]
pub enum Error {

    /// The contents of the blob are not supported by
    /// this implementation of lerc v1, but could still be a valid blob.
    NotSupported(Cow<'static, str>),

    /// The contents of the blob are not valid or corrupt,
    /// or the caller asked for something the blob cannot provide.
    Invalid(Cow<'static, str>),

    /// The underlying byte sink could not be written to.
    Io(IoError),
}


impl Error {

    /// Create an error of the variant `Invalid`.
    pub(crate) fn invalid(message: impl Into<Cow<'static, str>>) -> Self {
        Error::Invalid(message.into())
    }

    /// Create an error of the variant `NotSupported`.
    pub(crate) fn unsupported(message: impl Into<Cow<'static, str>>) -> Self {
        Error::NotSupported(message.into())
    }
}

/// Enable using the `?` operator on `std::io::Result`.
impl From<IoError> for Error {
    fn from(error: IoError) -> Self {
        if error.kind() == ErrorKind::UnexpectedEof {
            Error::invalid("reference to missing bytes")
        }
        else {
            Error::Io(error)
        }
    }
}

impl From<TryFromIntError> for Error {
    fn from(_: TryFromIntError) -> Self {
        Error::invalid("invalid size")
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(formatter),
            Error::NotSupported(message) => write!(formatter, "not supported: {}", message),
            Error::Invalid(message) => write!(formatter, "invalid: {}", message),
        }
    }
}


/// Return error on invalid range.
#[inline]
pub(crate) fn i32_to_usize(value: i32, error_message: &'static str) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::invalid(error_message))
}

/// Return error on values that do not fit into the 32 bit header fields.
#[inline]
pub(crate) fn usize_to_i32(value: usize, error_message: &'static str) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::invalid(error_message))
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unexpected_eof_is_invalid(){
        let error = Error::from(IoError::new(ErrorKind::UnexpectedEof, "eof"));
        assert!(matches!(error, Error::Invalid(_)));

        let error = Error::from(IoError::new(ErrorKind::PermissionDenied, "denied"));
        assert!(matches!(error, Error::Io(_)));
    }

    #[test]
    fn negative_sizes_are_rejected(){
        assert_eq!(i32_to_usize(17, "size").unwrap(), 17);
        assert!(i32_to_usize(-1, "size").is_err());
        assert!(usize_to_i32(usize::MAX, "size").is_err());
    }
}
