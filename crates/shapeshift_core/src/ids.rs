//! # Identifiers
//!
//! Small integer ids for shape kinds, materials and pools, plus the write-once
//! cell that guards them. Once a shape knows its type or its origin pool, that
//! fact never changes for the lifetime of its memory.

use crate::error::{CoreError, CoreResult};

/// Identifier of a shape kind within a pool (index into the pool's prefabs).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeType(pub u16);

/// Identifier of a material within a pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialType(pub u16);

/// Identifier of a pool (factory) within the shape store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolId(pub u16);

macro_rules! impl_id {
    ($($name:ident),*) => {$(
        impl $name {
            /// Returns the id as a slice index.
            #[inline]
            #[must_use]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> i64 {
                i64::from(id.0)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    )*};
}

impl_id!(ShapeType, MaterialType, PoolId);

/// A value that may be assigned exactly once.
///
/// A second assignment is refused with [`CoreError::IdentifierAlreadySet`] and
/// logged; the stored value is left as it was.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriteOnce<T> {
    value: Option<T>,
    what: &'static str,
}

impl<T: Copy + Into<i64>> WriteOnce<T> {
    /// Creates an unset cell. `what` names the identifier in error messages.
    #[must_use]
    pub const fn unset(what: &'static str) -> Self {
        Self { value: None, what }
    }

    /// Assigns the value if the cell is still unset.
    ///
    /// # Errors
    ///
    /// Returns `IdentifierAlreadySet` if a value was assigned before.
    pub fn set(&mut self, value: T) -> CoreResult<()> {
        if let Some(existing) = self.value {
            let err = CoreError::IdentifierAlreadySet {
                what: self.what,
                existing: existing.into(),
                attempted: value.into(),
            };
            tracing::error!("{err}");
            return Err(err);
        }
        self.value = Some(value);
        Ok(())
    }

    /// Returns the value, if assigned.
    #[inline]
    #[must_use]
    pub const fn get(&self) -> Option<T> {
        self.value
    }

    /// Returns true once a value has been assigned.
    #[inline]
    #[must_use]
    pub const fn is_set(&self) -> bool {
        self.value.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_once_refuses_second_write() {
        let mut cell = WriteOnce::unset("shape type");
        assert!(!cell.is_set());
        cell.set(ShapeType(3)).unwrap();

        let err = cell.set(ShapeType(4)).unwrap_err();
        assert_eq!(
            err,
            CoreError::IdentifierAlreadySet { what: "shape type", existing: 3, attempted: 4 }
        );
        assert_eq!(cell.get(), Some(ShapeType(3)));
    }

    #[test]
    fn test_same_value_is_still_a_rewrite() {
        let mut cell = WriteOnce::unset("pool id");
        cell.set(PoolId(1)).unwrap();
        assert!(cell.set(PoolId(1)).is_err());
    }
}
