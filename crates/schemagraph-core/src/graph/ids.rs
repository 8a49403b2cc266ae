//! Arena identifiers.
//!
//! Entities live in per-kind arenas on the [`Database`](crate::Database); every
//! parent back-reference and foreign-key link is one of these indices.

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u32);

        impl $name {
            /// Position of the entity in its arena.
            pub fn index(self) -> usize {
                self.0 as usize
            }

            /// Identifier for arena position `index`, `None` past `u32::MAX`.
            pub(crate) fn from_index(index: usize) -> Option<Self> {
                u32::try_from(index).ok().map(Self)
            }

            /// Raw identifier value.
            pub fn get(self) -> u32 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Identifier of a [`Schema`](crate::Schema).
    SchemaId,
    "schema"
);
define_id!(
    /// Identifier of a [`Table`](crate::Table).
    TableId,
    "table"
);
define_id!(
    /// Identifier of a [`Column`](crate::Column).
    ColumnId,
    "column"
);
define_id!(
    /// Identifier of a [`Constraint`](crate::Constraint).
    ConstraintId,
    "constraint"
);
define_id!(
    /// Identifier of an [`Index`](crate::Index).
    IndexId,
    "index"
);
