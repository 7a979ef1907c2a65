#![deny(missing_docs)]
#![feature(error_generic_member_access)]

//! Error handling for the Trimat workspace.
//!
//! All fallible operations return a [`TrimatResult`]. Errors are constructed with the
//! [`trimat_err`], [`trimat_bail`] and [`trimat_panic`] macros, which capture a backtrace
//! at the point of construction.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::fmt::{Debug, Display, Formatter};
use std::ops::Deref;
use std::{fmt, io};

/// A string that can be used as an error message.
#[derive(Debug)]
pub struct ErrString(Cow<'static, str>);

impl<T> From<T> for ErrString
where
    T: Into<Cow<'static, str>>,
{
    fn from(msg: T) -> Self {
        Self(msg.into())
    }
}

impl AsRef<str> for ErrString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for ErrString {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for ErrString {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// The top-level error type for Trimat.
#[derive(thiserror::Error)]
#[non_exhaustive]
pub enum TrimatError {
    /// A 1-based position fell outside the valid range `start..=stop`.
    #[error("index {0} out of bounds from {1} to {2}\nBacktrace:\n{3}")]
    OutOfBounds(usize, usize, usize, Backtrace),
    /// A label selector named a label that the layout does not carry.
    #[error("{0}\nBacktrace:\n{1}")]
    UnknownLabel(ErrString, Backtrace),
    /// A label selector was used against a layout without labels.
    #[error("{0}\nBacktrace:\n{1}")]
    MissingLabels(ErrString, Backtrace),
    /// A selector could not be interpreted for the requested axis.
    #[error("{0}\nBacktrace:\n{1}")]
    InvalidSelector(ErrString, Backtrace),
    /// The triangular block collection is malformed.
    #[error("{0}\nBacktrace:\n{1}")]
    InvalidLayout(ErrString, Backtrace),
    /// An input matrix or file set has the wrong shape.
    #[error("{0}\nBacktrace:\n{1}")]
    InvalidShape(ErrString, Backtrace),
    /// A block file does not declare exactly one matrix entry.
    #[error("{0}\nBacktrace:\n{1}")]
    Ambiguous(ErrString, Backtrace),
    /// The caller passed an argument that violates the operation's contract.
    #[error("{0}\nBacktrace:\n{1}")]
    InvalidArgument(ErrString, Backtrace),
    /// Persisted bytes could not be decoded.
    #[error("{0}\nBacktrace:\n{1}")]
    InvalidSerde(ErrString, Backtrace),
    /// A storage operation failed.
    #[error("{0}\nBacktrace:\n{1}")]
    IOError(io::Error, Backtrace),
    /// A layout descriptor could not be encoded or decoded.
    #[cfg(feature = "serde")]
    #[error("{0}\nBacktrace:\n{1}")]
    SerdeJsonError(serde_json::Error, Backtrace),
    /// Some other error wrapped with additional context.
    #[error("{0}: {1}")]
    Context(ErrString, #[source] Box<TrimatError>),
}

impl TrimatError {
    /// Adds additional context to an error.
    pub fn with_context<T: Into<ErrString>>(self, msg: T) -> Self {
        TrimatError::Context(msg.into(), Box::new(self))
    }

    /// Whether the error was raised because a selector referenced a position that does not
    /// exist, either numerically or by label.
    pub fn is_index_error(&self) -> bool {
        match self {
            Self::OutOfBounds(..) | Self::UnknownLabel(..) => true,
            Self::Context(_, inner) => inner.is_index_error(),
            _ => false,
        }
    }

    /// The [`io::ErrorKind`] of the underlying storage failure, if this is one.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::IOError(err, _) => Some(err.kind()),
            Self::Context(_, inner) => inner.io_kind(),
            _ => None,
        }
    }

    /// Strips any [`TrimatError::Context`] wrappers, returning the root cause.
    pub fn root(&self) -> &TrimatError {
        match self {
            Self::Context(_, inner) => inner.root(),
            other => other,
        }
    }
}

impl From<io::Error> for TrimatError {
    fn from(err: io::Error) -> Self {
        TrimatError::IOError(err, Backtrace::capture())
    }
}

#[cfg(feature = "serde")]
impl From<serde_json::Error> for TrimatError {
    fn from(err: serde_json::Error) -> Self {
        TrimatError::SerdeJsonError(err, Backtrace::capture())
    }
}

impl Debug for TrimatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

/// A type alias for Results that return [`TrimatError`]s as their error type.
pub type TrimatResult<T> = Result<T, TrimatError>;

/// Construct a [`TrimatError`].
///
/// The first token may name a variant, e.g. `trimat_err!(InvalidLayout: "bad row {}", r)`.
/// Without a variant the error is an [`TrimatError::InvalidArgument`].
#[macro_export]
macro_rules! trimat_err {
    (OutOfBounds: $idx:expr, $start:expr, $stop:expr) => {{
        use std::backtrace::Backtrace;
        $crate::TrimatError::OutOfBounds($idx, $start, $stop, Backtrace::capture())
    }};
    ($variant:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {{
        use std::backtrace::Backtrace;
        $crate::TrimatError::$variant(format!($fmt, $($arg),*).into(), Backtrace::capture())
    }};
    ($variant:ident: $err:expr $(,)?) => {{
        use std::backtrace::Backtrace;
        $crate::TrimatError::$variant($err.into(), Backtrace::capture())
    }};
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::trimat_err!(InvalidArgument: $fmt, $($arg),*)
    };
}

/// Return early with a [`TrimatError`], see [`trimat_err`].
#[macro_export]
macro_rules! trimat_bail {
    ($($tt:tt)+) => {
        return Err($crate::trimat_err!($($tt)+))
    };
}

/// Panic with a [`TrimatError`].
#[macro_export]
macro_rules! trimat_panic {
    (OutOfBounds: $idx:expr, $start:expr, $stop:expr) => {{
        $crate::trimat_panic!($crate::trimat_err!(OutOfBounds: $idx, $start, $stop))
    }};
    ($variant:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::trimat_panic!($crate::trimat_err!($variant: $fmt, $($arg),*))
    };
    ($err:expr, $fmt:literal $(, $arg:expr)* $(,)?) => {{
        let err: $crate::TrimatError = $err;
        panic!("{}", err.with_context(format!($fmt, $($arg),*)))
    }};
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::trimat_panic!($crate::trimat_err!($fmt, $($arg),*))
    };
    ($err:expr) => {{
        let err: $crate::TrimatError = $err;
        panic!("{}", err)
    }};
}

/// A trait for unwrapping a value while panicking with a [`TrimatError`] on failure.
pub trait TrimatExpect {
    /// The type of the value being expected.
    type Output;

    /// Returns the value, or panics with the given message attached as context.
    fn trimat_expect(self, msg: &str) -> Self::Output;
}

impl<T, E> TrimatExpect for Result<T, E>
where
    E: Into<TrimatError>,
{
    type Output = T;

    #[inline(always)]
    #[allow(clippy::panic)]
    fn trimat_expect(self, msg: &str) -> Self::Output {
        match self {
            Ok(value) => value,
            Err(err) => {
                let err: TrimatError = err.into();
                trimat_panic!(err.with_context(msg.to_string()))
            }
        }
    }
}

impl<T> TrimatExpect for Option<T> {
    type Output = T;

    #[inline(always)]
    #[allow(clippy::panic)]
    fn trimat_expect(self, msg: &str) -> Self::Output {
        self.unwrap_or_else(|| {
            let err = TrimatError::InvalidArgument(msg.to_string().into(), Backtrace::capture());
            trimat_panic!(err)
        })
    }
}
