//! Rejection reasons.
//!
//! Every rejected [`Deferred`](crate::Deferred) carries an [`Error`]. The
//! type is cheap to clone because one settlement may be observed by any
//! number of downstream values.

use std::fmt;
use std::io;
use std::sync::Arc;

/// The `deferred` result type.
pub type Result<T> = std::result::Result<T, Error>;

/// The reason a deferred value was rejected.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The resolver passed to [`Deferred::try_new`](crate::Deferred::try_new)
    /// failed before a deferred value existed to carry the failure.
    #[error("resolver failed: {0}")]
    Settlement(Arc<dyn std::error::Error + Send + Sync>),

    /// A deferred value was resolved with, or forwarded into, itself.
    #[error("chaining cycle detected: a deferred value cannot adopt itself")]
    Cycle,

    /// A handler, step or input iterator panicked while it was being run.
    #[error("handler panicked: {0}")]
    Propagation(String),

    /// Every entry passed to [`any`](crate::any) was rejected.
    #[error(transparent)]
    Aggregate(AggregateRejection),

    /// The IO service failed to read.
    #[error("io error: {0}")]
    Io(Arc<io::Error>),

    /// A rejection reason supplied by the caller.
    #[error("{0}")]
    Rejected(String),
}

impl Error {
    /// Create a rejection from a caller-supplied reason.
    pub fn reason(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }

    /// Wrap a resolver failure.
    pub fn settlement<E>(source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let source: Box<dyn std::error::Error + Send + Sync> = source.into();
        Self::Settlement(Arc::from(source))
    }

    /// Build a [`Error::Propagation`] from a caught panic payload.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "opaque panic payload".to_owned()
        };
        Self::Propagation(message)
    }

    /// Return the aggregate if this is an [`Error::Aggregate`].
    pub fn as_aggregate(&self) -> Option<&AggregateRejection> {
        match self {
            Self::Aggregate(aggregate) => Some(aggregate),
            _ => None,
        }
    }

    /// Return the kind of the underlying IO error, if any.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::Io(err) => Some(err.kind()),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Settlement(a), Self::Settlement(b)) => a.to_string() == b.to_string(),
            (Self::Cycle, Self::Cycle) => true,
            (Self::Propagation(a), Self::Propagation(b)) => a == b,
            (Self::Aggregate(a), Self::Aggregate(b)) => a == b,
            (Self::Io(a), Self::Io(b)) => a.kind() == b.kind(),
            (Self::Rejected(a), Self::Rejected(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(feature = "json")]
impl serde::Serialize for Error {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The composite failure produced when every branch of [`any`](crate::any)
/// rejects.
///
/// `reasons` is index-aligned with the input entries.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRejection {
    reasons: Vec<Error>,
    message: &'static str,
}

impl AggregateRejection {
    pub(crate) const ALL_REJECTED: &'static str = "all entries were rejected";
    pub(crate) const EMPTY: &'static str = "no entries to await";

    pub(crate) fn new(reasons: Vec<Error>, message: &'static str) -> Self {
        Self { reasons, message }
    }

    /// The per-entry rejection reasons, in input order.
    pub fn reasons(&self) -> &[Error] {
        &self.reasons
    }

    /// The summary message.
    pub fn message(&self) -> &str {
        self.message
    }
}

impl fmt::Display for AggregateRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} reasons)", self.message, self.reasons.len())
    }
}

impl std::error::Error for AggregateRejection {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_become_propagation_errors() {
        let err = Error::from_panic(Box::new("boom"));
        assert_eq!(err, Error::Propagation("boom".into()));

        let err = Error::from_panic(Box::new(String::from("bang")));
        assert_eq!(err.to_string(), "handler panicked: bang");

        let err = Error::from_panic(Box::new(42_u8));
        assert_eq!(err, Error::Propagation("opaque panic payload".into()));
    }

    #[test]
    fn io_errors_compare_by_kind() {
        let a = Error::from(io::Error::new(io::ErrorKind::NotFound, "a"));
        let b = Error::from(io::Error::new(io::ErrorKind::NotFound, "b"));
        assert_eq!(a, b);
        assert_eq!(a.io_kind(), Some(io::ErrorKind::NotFound));
        assert_ne!(a, Error::reason("a"));
    }

    #[test]
    fn aggregate_display() {
        let agg = AggregateRejection::new(
            vec![Error::reason("a"), Error::reason("b")],
            AggregateRejection::ALL_REJECTED,
        );
        assert_eq!(agg.to_string(), "all entries were rejected (2 reasons)");
        assert_eq!(Error::Aggregate(agg.clone()).as_aggregate(), Some(&agg));
    }
}
