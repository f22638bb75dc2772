use std::{any::Any, error::Error as StdError, fmt::Display};

/// An error returned by a notification callback.
///
/// Any [`std::error::Error`] converts into a `RuntimeError`, so callbacks
/// can use `?` freely. The scheduler logs these errors and continues.
#[derive(Debug)]
pub struct RuntimeError {
    inner: Box<dyn StdErrorAny>,
}

impl RuntimeError {
    /// Creates an error from a plain message.
    pub fn msg(msg: impl Display) -> Self {
        Self::from(MessageError(msg.to_string()))
    }

    /// Attempts to view the wrapped error as a concrete type.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.as_any().downcast_ref::<T>()
    }
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.inner.fmt(f)
    }
}

impl<T: StdError + Any + 'static> From<T> for RuntimeError {
    fn from(err: T) -> Self {
        RuntimeError {
            inner: Box::new(err),
        }
    }
}

#[derive(Debug)]
struct MessageError(String);

impl Display for MessageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl StdError for MessageError {}

trait StdErrorAny: StdError + Any {
    fn as_any(&self) -> &dyn Any;
}
impl<T: StdError + Any + 'static> StdErrorAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}
