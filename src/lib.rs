//! This crate provides type-erased containers that can be used through a fixed list of behaviors,
//! as replacement for `Box<dyn Trait>` that stores small values inline without heap allocation.
//!
//! [`Erased<L>`] always occupies [`DEFAULT_SIZE`] bytes, whatever type it stores.
//! `L` is a tuple of behaviors. Each behavior names one operation and every stored type
//! must implement all of them, which is checked at compile time.
//! Calls go through a constant per-type dispatch table.
//!
//! Copying and relocating are capabilities, listed in `L` like any other behavior.
//! See [`capability`].
//!
//! ## Usage
//!
//! ```
//! use erased::{behavior, capability, Erased, MutInvoker, RefInvoker};
//!
//! trait Shape {
//!     fn area(&self) -> f64;
//!     fn circumference(&self) -> f64;
//!     fn scale(&mut self, by: f64);
//! }
//!
//! struct Circle {
//!     radius: f64,
//! }
//!
//! impl Shape for Circle {
//!     fn area(&self) -> f64 {
//!         3.14 * self.radius * self.radius
//!     }
//!
//!     fn circumference(&self) -> f64 {
//!         6.28 * self.radius
//!     }
//!
//!     fn scale(&mut self, by: f64) {
//!         self.radius *= by;
//!     }
//! }
//!
//! behavior! {
//!     Area as AreaExt: fn area(&self) -> f64;
//! }
//!
//! behavior! {
//!     Scale as ScaleExt: fn scale(&mut self, by: f64);
//! }
//!
//! impl<T: Shape> RefInvoker<T> for Area {
//!     fn invoke(this: &T, (): ()) -> f64 {
//!         Shape::area(this)
//!     }
//! }
//!
//! impl<T: Shape> MutInvoker<T> for Scale {
//!     fn invoke(this: &mut T, (by,): (f64,)) {
//!         Shape::scale(this, by)
//!     }
//! }
//!
//! // `Circle` fits inline storage, so no allocation is performed.
//! let mut a: Erased<(Area, Scale)> = Erased::new(Circle { radius: 1.0 });
//!
//! // Call through the behavior tag.
//! assert_eq!(a.invoke(Area, ()), 3.14);
//!
//! // Or through the extension traits.
//! a.scale(2.0);
//! assert_eq!(a.area(), 3.14 * 4.0);
//!
//! // Get the value back.
//! assert_eq!(a.downcast_ref::<Circle>().unwrap().radius, 2.0);
//!
//! // Listing `capability::Copy` makes the container `Clone`.
//! let b: Erased<(capability::Copy,)> = Erased::new(vec![1, 2, 3]);
//! let c = b.clone();
//!
//! assert_eq!(c.downcast_ref::<Vec<i32>>(), Some(&vec![1, 2, 3]));
//! ```
//!
//! Containers without `capability::Copy` are not `Clone`.
//!
//! ```compile_fail
//! # use erased::Erased;
//! let a: Erased<()> = Erased::new(1u32);
//! let b: Erased<()> = Clone::clone(&a);
//! ```
//!
//! Relocation requires `capability::Move`.
//!
//! ```compile_fail
//! # use erased::{BasicErased, Erased};
//! let a: Erased<()> = Erased::new(1u32);
//! let b: BasicErased<(), 64> = a.relocate();
//! ```
//!
//! Only behaviors from the list can be called,
//! and behaviors taking `&mut self` need exclusive access.
//!
//! ```compile_fail
//! # use erased::{Erased, MutInvoker};
//! erased::behavior! {
//!     Bump as BumpExt: fn bump(&mut self);
//! }
//!
//! impl MutInvoker<u32> for Bump {
//!     fn invoke(this: &mut u32, (): ()) {
//!         *this += 1;
//!     }
//! }
//!
//! let a: Erased<(Bump,)> = Erased::new(1u32);
//! a.invoke(Bump, ());
//! ```
//!
//! Types lacking a listed behavior cannot be stored.
//!
//! ```compile_fail
//! # use erased::{Erased, RefInvoker};
//! erased::behavior! {
//!     Show as ShowExt: fn show(&self) -> u32;
//! }
//!
//! impl RefInvoker<u32> for Show {
//!     fn invoke(this: &u32, (): ()) -> u32 {
//!         *this
//!     }
//! }
//!
//! let a: Erased<(Show,)> = Erased::new(1u64);
//! ```
//!
//! Stored values may be `!Send` and `!Sync`, so containers are neither.
//!
//! ```compile_fail
//! # use erased::Erased;
//! fn assert_send<T: Send>() {}
//! assert_send::<Erased<()>>();
//! ```
//!
//! ```compile_fail
//! # use erased::Erased;
//! fn assert_sync<T: Sync>() {}
//! assert_sync::<Erased<()>>();
//! ```

#![no_std]

extern crate alloc;

mod behavior;
pub mod capability;
mod cast;
mod erased;
mod macros;
mod storage;
mod table;
mod view;

pub use self::{
    behavior::{
        Behavior, Callable, Dispatch, DispatchMut, Entry, Exclusive, Flag, Method, MutInvoker, No,
        Receiver, RefInvoker, Shared, Trampoline, Yes,
    },
    cast::{any_cast, any_cast_mut, is, BadCast, Erasure, ErasureMut},
    erased::{BasicErased, Erased, DEFAULT_CAPACITY, DEFAULT_SIZE},
    table::{BehaviorList, Build, Contains, Index, Table},
    view::{Ref, RefMut},
};

#[cfg(test)]
mod tests;
