//! Arena handles.
//!
//! Every per-game entity lives in a fixed arena and is referenced by a
//! slot handle. Handles never own their referents: the holder pairs the
//! handle with an id snapshot where staleness matters, and a resolve
//! that finds the slot inactive or the id changed yields `None`. The
//! degraded path is always local (drop target, clear destination, skip
//! queued action).

use serde::{Deserialize, Serialize};

macro_rules! arena_handle {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i32);

        impl $name {
            /// The null handle.
            pub const NONE: $name = $name(-1);

            /// The slot index, if this is not the null handle.
            #[inline]
            pub fn index(self) -> Option<usize> {
                if self.0 >= 0 {
                    Some(self.0 as usize)
                } else {
                    None
                }
            }

            #[inline]
            pub fn is_none(self) -> bool {
                self.0 < 0
            }

            #[inline]
            pub fn is_some(self) -> bool {
                self.0 >= 0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::NONE
            }
        }
    };
}

arena_handle!(
    /// A slot in the space-object arena.
    ObjHandle
);
arena_handle!(
    /// A slot in the admiral table.
    AdmHandle
);
arena_handle!(
    /// A slot in the destination table.
    DestHandle
);
arena_handle!(
    /// A slot in the vector arena.
    VectorHandle
);
arena_handle!(
    /// A slot in the sprite arena.
    SpriteHandle
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_has_no_index() {
        assert!(ObjHandle::NONE.index().is_none());
        assert!(ObjHandle::NONE.is_none());
        assert_eq!(ObjHandle(3).index(), Some(3));
    }

    #[test]
    fn default_is_none() {
        assert_eq!(AdmHandle::default(), AdmHandle::NONE);
    }
}
