//! Identifier newtypes.
//!
//! All collaborators hand out dense `u32` indices. Wrapping each in its own
//! type keeps a class id from being passed where a routine id is expected.

use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// Create an id from a raw index.
            #[inline]
            pub const fn new(index: u32) -> Self {
                Self(index)
            }

            /// The raw index, for addressing a table.
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

define_id!(
    /// A class registered with the class registry.
    ClassId,
    "class"
);
define_id!(
    /// An interface registered with the class registry.
    InterfaceId,
    "interface"
);
define_id!(
    /// Identity of a type holder (generic parameter or not-yet-inferred type).
    HolderId,
    "holder"
);
define_id!(
    /// A routine stored in a compilation session.
    RoutineId,
    "routine"
);
define_id!(
    /// An overload set stored in a compilation session.
    OverloadId,
    "overloads"
);
define_id!(
    /// Canonical id of an interned type.
    TypeId,
    "type"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_format_with_prefix() {
        assert_eq!(format!("{}", ClassId::new(3)), "class#3");
        assert_eq!(format!("{:?}", RoutineId::new(0)), "routine#0");
        assert_eq!(HolderId::new(9).index(), 9);
    }
}
