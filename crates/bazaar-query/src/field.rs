/// A named document field that filters and sorts may refer to.
///
/// Each entity declares its own field enum (see [`fields!`](crate::fields)),
/// so a filter can only name paths that the entity actually has.
pub trait Field: Copy {
    /// Dotted document path, e.g. `technicalDetails.brand`.
    fn path(self) -> &'static str;
}

/// Declare a field enum together with its [`Field`] impl.
///
/// ```
/// bazaar_query::fields! {
///     pub enum BrandField {
///         Name => "name",
///         Approved => "adminApproved",
///     }
/// }
/// ```
#[macro_export]
macro_rules! fields {
    ($(#[$meta:meta])* $vis:vis enum $name:ident { $($variant:ident => $path:literal),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        $vis enum $name {
            $($variant),*
        }

        impl $crate::Field for $name {
            fn path(self) -> &'static str {
                match self {
                    $($name::$variant => $path),*
                }
            }
        }
    };
}

fields! {
    /// Fields every stored document carries.
    pub enum CommonField {
        Id => "_id",
        CreatedAt => "createdAt",
        UpdatedAt => "updatedAt",
    }
}
