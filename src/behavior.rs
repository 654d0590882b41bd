//! Behavior descriptors and the receiver modes their invokers take.
//!
//! A behavior is a zero-sized tag type that names one operation a stored value must support.
//! Everything the dispatch machinery needs to know about it is read from its associated types,
//! so the shape of a table entry is fixed before any value is ever erased.

use crate::capability;

pub(crate) mod sealed {
    use super::{Behavior, Entry};
    use crate::capability;

    pub trait Sealed {}

    /// Receiver modes that behavior `M` may declare.
    /// Capability receivers admit only their own capability.
    pub trait Admits<M: ?Sized> {}

    /// Constructors a receiver contributes to the table of `T`.
    /// Only the capability receivers override them.
    pub trait Constructors<M: Behavior, T> {
        const COPY: Option<Entry<capability::Copy>> = None;
        const MOVE: Option<Entry<capability::Move>> = None;
    }

    /// Behavior resolved for `T`, with the constructors of its receiver.
    pub trait Resolved<T> {
        const COPY: Option<Entry<capability::Copy>>;
        const MOVE: Option<Entry<capability::Move>>;
    }
}

/// Type-level boolean.
/// Used to fold capabilities over a behavior list.
pub trait Flag: sealed::Sealed {
    /// `Self || F`.
    type Or<F: Flag>: Flag;
}

/// Type-level `true`.
pub enum Yes {}

/// Type-level `false`.
pub enum No {}

impl sealed::Sealed for Yes {}
impl sealed::Sealed for No {}

impl Flag for Yes {
    type Or<F: Flag> = Yes;
}

impl Flag for No {
    type Or<F: Flag> = F;
}

/// How a behavior accesses the stored value.
///
/// This trait is sealed. User behaviors pick either [`Shared`] or [`Exclusive`].
pub trait Receiver: sealed::Sealed + 'static {
    /// Untyped pointer to the payload passed to the table entry.
    type Ptr: Copy;

    /// Whether a behavior with this receiver is the copy capability.
    type Copies: Flag;

    /// Whether a behavior with this receiver is the move capability.
    type Moves: Flag;
}

/// Receiver mode of behaviors that only read the value (`&T`).
pub enum Shared {}

/// Receiver mode of behaviors that may modify the value (`&mut T`).
pub enum Exclusive {}

impl sealed::Sealed for Shared {}
impl sealed::Sealed for Exclusive {}

impl<M: ?Sized> sealed::Admits<M> for Shared {}
impl<M: ?Sized> sealed::Admits<M> for Exclusive {}

impl Receiver for Shared {
    type Ptr = *const u8;
    type Copies = No;
    type Moves = No;
}

impl Receiver for Exclusive {
    type Ptr = *mut u8;
    type Copies = No;
    type Moves = No;
}

/// Receiver modes that user code may call through exclusive access.
pub trait Callable: Receiver {
    /// Narrows a mutable payload pointer to the pointer this receiver takes.
    fn from_mut(ptr: *mut u8) -> Self::Ptr;
}

impl Callable for Shared {
    #[inline(always)]
    fn from_mut(ptr: *mut u8) -> *const u8 {
        ptr.cast_const()
    }
}

impl Callable for Exclusive {
    #[inline(always)]
    fn from_mut(ptr: *mut u8) -> *mut u8 {
        ptr
    }
}

/// Descriptor of one operation a stored value must support.
///
/// Usually declared with the [`behavior!`](crate::behavior!) macro.
///
/// # Example
///
/// ```
/// use erased::{Behavior, RefInvoker, Shared};
///
/// struct Describe;
///
/// impl Behavior for Describe {
///     type Receiver = Shared;
///     type Args = (u32,);
///     type Output = u64;
/// }
///
/// impl RefInvoker<u64> for Describe {
///     fn invoke(this: &u64, (shift,): (u32,)) -> u64 {
///         *this << shift
///     }
/// }
/// ```
pub trait Behavior: 'static {
    /// Receiver mode, [`Shared`] or [`Exclusive`].
    type Receiver: Receiver + sealed::Admits<Self>;

    /// Arguments, as a tuple.
    type Args;

    /// Return type.
    type Output;
}

/// Table entry of behavior `M`.
///
/// Takes the untyped payload pointer and the arguments tuple.
pub type Entry<M> = unsafe fn(
    <<M as Behavior>::Receiver as Receiver>::Ptr,
    <M as Behavior>::Args,
) -> <M as Behavior>::Output;

/// Implementation of a [`Shared`] behavior for the value type `T`.
pub trait RefInvoker<T>: Behavior<Receiver = Shared> {
    fn invoke(this: &T, args: Self::Args) -> Self::Output;
}

/// Implementation of an [`Exclusive`] behavior for the value type `T`.
pub trait MutInvoker<T>: Behavior<Receiver = Exclusive> {
    fn invoke(this: &mut T, args: Self::Args) -> Self::Output;
}

/// Produces the table entry of behavior `M` for the value type `T`.
///
/// Implemented by each receiver mode. This trait is sealed:
/// implement [`RefInvoker`] or [`MutInvoker`] instead.
pub trait Trampoline<M: Behavior, T>: Receiver + sealed::Constructors<M, T> {
    const ENTRY: Entry<M>;
}

unsafe fn call_ref<M, T>(this: *const u8, args: M::Args) -> M::Output
where
    M: RefInvoker<T>,
{
    // Safety: Table entries are only called with a pointer to a live `T`.
    let this = unsafe { &*this.cast::<T>() };
    M::invoke(this, args)
}

unsafe fn call_mut<M, T>(this: *mut u8, args: M::Args) -> M::Output
where
    M: MutInvoker<T>,
{
    // Safety: Table entries are only called with a pointer to a live `T`
    // derived from exclusive access.
    let this = unsafe { &mut *this.cast::<T>() };
    M::invoke(this, args)
}

impl<M: RefInvoker<T>, T> sealed::Constructors<M, T> for Shared {}
impl<M: MutInvoker<T>, T> sealed::Constructors<M, T> for Exclusive {}

impl<M, T> Trampoline<M, T> for Shared
where
    M: RefInvoker<T>,
{
    const ENTRY: Entry<M> = call_ref::<M, T>;
}

impl<M, T> Trampoline<M, T> for Exclusive
where
    M: MutInvoker<T>,
{
    const ENTRY: Entry<M> = call_mut::<M, T>;
}

/// Behavior `Self` resolved for the value type `T`.
///
/// Implemented for every behavior whose invoker is implemented for `T`.
/// This trait is sealed.
pub trait Method<T>: Behavior + sealed::Resolved<T> {
    const ENTRY: Entry<Self>;
}

impl<M, T> sealed::Resolved<T> for M
where
    M: Behavior,
    M::Receiver: Trampoline<M, T>,
{
    const COPY: Option<Entry<capability::Copy>> =
        <M::Receiver as sealed::Constructors<M, T>>::COPY;
    const MOVE: Option<Entry<capability::Move>> =
        <M::Receiver as sealed::Constructors<M, T>>::MOVE;
}

impl<M, T> Method<T> for M
where
    M: Behavior,
    M::Receiver: Trampoline<M, T>,
{
    const ENTRY: Entry<M> = <M::Receiver as Trampoline<M, T>>::ENTRY;
}

/// Calls the [`Shared`] behavior `M` found at index `I`.
///
/// Implemented by [`BasicErased`](crate::BasicErased), [`Ref`](crate::Ref) and [`RefMut`](crate::RefMut).
/// Extension traits generated by [`behavior!`](crate::behavior!) go through it.
pub trait Dispatch<M: Behavior<Receiver = Shared>, I> {
    fn dispatch(&self, args: M::Args) -> M::Output;
}

/// Calls the [`Exclusive`] behavior `M` found at index `I`.
///
/// Implemented by [`BasicErased`](crate::BasicErased) and [`RefMut`](crate::RefMut).
pub trait DispatchMut<M: Behavior<Receiver = Exclusive>, I> {
    fn dispatch_mut(&mut self, args: M::Args) -> M::Output;
}
