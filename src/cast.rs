//! Recovering the stored type.
//!
//! Two styles are offered. `downcast_ref`/`downcast_mut` methods return `None` on mismatch
//! and leave the check to the caller. [`any_cast`] and [`any_cast_mut`] treat a mismatch
//! as an error and report both types in [`BadCast`].

use core::{any::TypeId, fmt};

use crate::table::{BehaviorList, Table};

pub(crate) mod sealed {
    pub trait Sealed {}
}

/// Error returned when the stored value is not of the requested type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BadCast {
    expected: &'static str,
    found: &'static str,
}

impl BadCast {
    /// Name of the requested type.
    pub fn expected(&self) -> &'static str {
        self.expected
    }

    /// Name of the stored type.
    pub fn found(&self) -> &'static str {
        self.found
    }
}

impl fmt::Display for BadCast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bad cast: stored `{}`, requested `{}`", self.found, self.expected)
    }
}

impl core::error::Error for BadCast {}

/// Type-erased value or view to a value.
///
/// This trait is sealed. Implemented by [`BasicErased`](crate::BasicErased),
/// [`Ref`](crate::Ref) and [`RefMut`](crate::RefMut).
pub trait Erasure: sealed::Sealed {
    type List: BehaviorList;

    /// Table the value was erased with.
    fn table(&self) -> &'static Table<Self::List>;

    #[doc(hidden)]
    fn payload(&self) -> *const u8;
}

/// Type-erased value or view that grants mutable access.
pub trait ErasureMut: Erasure {
    #[doc(hidden)]
    fn payload_mut(&mut self) -> *mut u8;
}

/// Returns `true` if the value is of type `T`.
///
/// # Example
///
/// ```
/// # use erased::{is, Erased};
/// let a: Erased<()> = Erased::new(42u32);
///
/// assert!(is::<u32>(&a));
/// assert!(!is::<u64>(&a));
/// ```
#[inline]
pub fn is<T: 'static>(erased: &(impl Erasure + ?Sized)) -> bool {
    erased.table().type_id() == TypeId::of::<T>()
}

/// Returns reference to the value if it is of type `T`.
///
/// # Errors
///
/// Returns [`BadCast`] if the value is of another type.
///
/// # Example
///
/// ```
/// # use erased::{any_cast, Erased};
/// let a: Erased<()> = Erased::new(42u32);
///
/// assert_eq!(any_cast::<u32>(&a), Ok(&42));
///
/// let err = any_cast::<u64>(&a).unwrap_err();
/// assert_eq!(err.found(), "u32");
/// ```
#[inline]
pub fn any_cast<T: 'static>(erased: &(impl Erasure + ?Sized)) -> Result<&T, BadCast> {
    if is::<T>(erased) {
        // Safety: The table belongs to `T`, so the payload is a `T`.
        Ok(unsafe { &*erased.payload().cast::<T>() })
    } else {
        Err(mismatch::<T>(erased))
    }
}

/// Returns mutable reference to the value if it is of type `T`.
///
/// # Errors
///
/// Returns [`BadCast`] if the value is of another type.
///
/// # Example
///
/// ```
/// # use erased::{any_cast_mut, Erased};
/// let mut a: Erased<()> = Erased::new(42u32);
///
/// *any_cast_mut::<u32>(&mut a).unwrap() += 1;
///
/// assert_eq!(a.downcast_ref::<u32>(), Some(&43));
/// ```
#[inline]
pub fn any_cast_mut<T: 'static>(erased: &mut (impl ErasureMut + ?Sized)) -> Result<&mut T, BadCast> {
    if is::<T>(&*erased) {
        // Safety: The table belongs to `T`, so the payload is a `T`.
        Ok(unsafe { &mut *erased.payload_mut().cast::<T>() })
    } else {
        Err(mismatch::<T>(&*erased))
    }
}

#[cold]
fn mismatch<T>(erased: &(impl Erasure + ?Sized)) -> BadCast {
    BadCast {
        expected: core::any::type_name::<T>(),
        found: erased.table().type_name(),
    }
}
