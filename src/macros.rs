///
/// A decl. macro for creating numeric object handles.
///
/// Handles are allocated by the owning arena from a counter and
/// are never reused, so a stale handle fails to resolve instead of
/// aliasing a newer object.
///
macro_rules! create_handle {
    ($(
        $(#[$outer:meta])*
        $vis: vis $ident: ident($ty: ty) = $prefix: literal;
    )+) => {
        $(
            $(#[$outer])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
            #[repr(transparent)]
            $vis struct $ident($ty);

            impl $ident {
                /// Returns the raw numeric value of the handle.
                #[must_use]
                pub fn raw(self) -> $ty {
                    self.0
                }

                #[cfg(test)]
                pub(crate) fn from_raw(raw: $ty) -> Self {
                    Self(raw)
                }

                pub(crate) fn next(counter: &mut $ty) -> $crate::error::Result<Self> {
                    let id = Self(*counter);
                    *counter = counter.checked_add(1).ok_or_else(|| {
                        $crate::error::Error::resource(concat!("out of ", $prefix, " handles"))
                    })?;
                    Ok(id)
                }
            }

            impl std::fmt::Display for $ident {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, concat!($prefix, "#{}"), self.0)
                }
            }
        )+
    };
}

pub(crate) use create_handle;
