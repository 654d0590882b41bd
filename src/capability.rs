//! Copy and move capabilities.
//!
//! Listing [`Copy`] in a behavior list makes the container [`Clone`].
//! Listing [`Move`] lets the payload be relocated into a container with a different
//! inline capacity, see [`BasicErased::relocate`](crate::BasicErased::relocate).
//!
//! Both are ordinary behaviors: their table entries construct a payload into a [`Slot`].
//! Their receiver modes are private to this crate and admit no other behavior,
//! so the capabilities cannot be declared by user code.
//!
//! ```compile_fail
//! use erased::{capability, Behavior};
//!
//! struct Duplicate;
//!
//! impl Behavior for Duplicate {
//!     type Receiver = <capability::Copy as Behavior>::Receiver;
//!     type Args = capability::Slot;
//!     type Output = ();
//! }
//! ```
//!
//! Table entries come only from [`RefInvoker`](crate::RefInvoker) and
//! [`MutInvoker`](crate::MutInvoker) implementations.
//!
//! ```compile_fail
//! use erased::{Behavior, Entry, Shared, Trampoline};
//!
//! struct Duplicate;
//!
//! impl Behavior for Duplicate {
//!     type Receiver = Shared;
//!     type Args = ();
//!     type Output = ();
//! }
//!
//! unsafe fn skip(_: *const u8, (): ()) {}
//!
//! impl<T> Trampoline<Duplicate, T> for Shared {
//!     const ENTRY: Entry<Duplicate> = skip;
//! }
//! ```

use self::receiver::{Cloning, Relocating};
use crate::behavior::{sealed, Behavior, Entry, No, Receiver, Trampoline, Yes};

/// Copy capability.
///
/// Requires the stored type to implement [`Clone`].
#[derive(Clone, core::marker::Copy, Debug, Default)]
pub struct Copy;

/// Move capability.
#[derive(Clone, core::marker::Copy, Debug, Default)]
pub struct Move;

/// Uninitialized, suitably sized and aligned memory for one payload.
///
/// Only this crate can create slots.
pub struct Slot {
    ptr: *mut u8,
}

impl Slot {
    #[inline(always)]
    pub(crate) fn new(ptr: *mut u8) -> Self {
        Slot { ptr }
    }
}

mod receiver {
    /// Receiver mode of [`Copy`](super::Copy).
    pub enum Cloning {}

    /// Receiver mode of [`Move`](super::Move).
    pub enum Relocating {}
}

impl sealed::Sealed for Cloning {}
impl sealed::Sealed for Relocating {}

impl sealed::Admits<Copy> for Cloning {}
impl sealed::Admits<Move> for Relocating {}

impl Receiver for Cloning {
    type Ptr = *const u8;
    type Copies = Yes;
    type Moves = No;
}

impl Receiver for Relocating {
    type Ptr = *mut u8;
    type Copies = No;
    type Moves = Yes;
}

impl Behavior for Copy {
    type Receiver = Cloning;
    type Args = Slot;
    type Output = ();
}

impl Behavior for Move {
    type Receiver = Relocating;
    type Args = Slot;
    type Output = ();
}

unsafe fn copy_into<T: Clone>(source: *const u8, slot: Slot) {
    // Safety: `source` points to a live `T` and the slot fits `T`.
    unsafe {
        let value = (*source.cast::<T>()).clone();
        slot.ptr.cast::<T>().write(value);
    }
}

unsafe fn move_into<T>(source: *mut u8, slot: Slot) {
    // Safety: `source` points to a live `T` that the caller treats as moved-from afterwards.
    unsafe {
        let value = source.cast::<T>().read();
        slot.ptr.cast::<T>().write(value);
    }
}

impl<T: Clone> sealed::Constructors<Copy, T> for Cloning {
    const COPY: Option<Entry<Copy>> = Some(copy_into::<T>);
}

impl<T> sealed::Constructors<Move, T> for Relocating {
    const MOVE: Option<Entry<Move>> = Some(move_into::<T>);
}

impl<T: Clone> Trampoline<Copy, T> for Cloning {
    const ENTRY: Entry<Copy> = copy_into::<T>;
}

impl<T> Trampoline<Move, T> for Relocating {
    const ENTRY: Entry<Move> = move_into::<T>;
}
