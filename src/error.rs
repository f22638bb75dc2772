use std::{
    error::Error as StdError,
    fmt::{Debug, Display},
};

/// A shorthand for results produced by the mutators of this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

///
/// An error produced by a typed mutator of the scheduler or the
/// network model.
///
/// Validation always happens before mutation, so an operation
/// that returns an error has not changed any state.
///
#[derive(Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    internal: String,
}

impl Error {
    /// Creates a new error of the given kind.
    pub fn new(kind: ErrorKind, internal: impl Into<String>) -> Self {
        Self {
            kind,
            internal: internal.into(),
        }
    }

    /// Returns the kind of the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the human readable description of the error.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.internal
    }

    pub(crate) fn range(internal: impl Into<String>) -> Self {
        Self::new(ErrorKind::Range, internal)
    }

    pub(crate) fn permission(internal: impl Into<String>) -> Self {
        Self::new(ErrorKind::Permission, internal)
    }

    pub(crate) fn resource(internal: impl Into<String>) -> Self {
        Self::new(ErrorKind::Resource, internal)
    }

    pub(crate) fn name_in_use(name: &str) -> Self {
        Self::new(
            ErrorKind::NameInUse,
            format!("name '{name}' is allready in use"),
        )
    }

    pub(crate) fn not_found(internal: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, internal)
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.internal, self.kind)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.internal, self.kind)
    }
}

impl StdError for Error {}

///
/// The class of failure an [`Error`] belongs to.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A value lies outside the legal domain of its type,
    /// e.g. a zero ratio or a negative packet size.
    Range,
    /// A construction could not be completed or an internal
    /// consistency check failed.
    Resource,
    /// The operation is not allowed in the current state, e.g.
    /// deleting an executing activity or pairing an interface with itself.
    Permission,
    /// An object with the requested name allready exists.
    NameInUse,
    /// The referenced object does not exist (anymore).
    NotFound,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Range => write!(f, "ERANGE"),
            Self::Resource => write!(f, "ERESOURCE"),
            Self::Permission => write!(f, "EPERM"),
            Self::NameInUse => write!(f, "ENAMEINUSE"),
            Self::NotFound => write!(f, "ENOTFOUND"),
        }
    }
}
