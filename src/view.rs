//! Non-owning views.
//!
//! A view pairs a borrowed value with the table of its type.
//! It can be built from any reference whose type the behavior list supports,
//! or borrowed from a container with [`BasicErased::view`](crate::BasicErased::view).

use core::{any::TypeId, fmt, marker::PhantomData};

use crate::{
    behavior::{Behavior, Callable, Dispatch, DispatchMut, Exclusive, Shared},
    cast::{sealed, Erasure, ErasureMut},
    table::{BehaviorList, Build, Contains, Table},
};

/// Type-erased shared reference.
///
/// # Example
///
/// ```
/// # use erased::{Ref, RefInvoker};
/// erased::behavior! {
///     Len as LenExt: fn len(&self) -> usize;
/// }
///
/// impl RefInvoker<String> for Len {
///     fn invoke(this: &String, (): ()) -> usize {
///         this.len()
///     }
/// }
///
/// impl<T> RefInvoker<Vec<T>> for Len {
///     fn invoke(this: &Vec<T>, (): ()) -> usize {
///         this.len()
///     }
/// }
///
/// let s = String::from("hello");
/// let v = vec![1, 2, 3];
///
/// let views: [Ref<'_, (Len,)>; 2] = [Ref::new(&s), Ref::new(&v)];
/// let total: usize = views.iter().map(|v| v.len()).sum();
///
/// assert_eq!(total, 8);
/// ```
pub struct Ref<'a, L: BehaviorList> {
    ptr: *const u8,
    table: &'static Table<L>,
    marker: PhantomData<&'a ()>,
}

impl<L: BehaviorList> Clone for Ref<'_, L> {
    #[inline(always)]
    fn clone(&self) -> Self {
        *self
    }
}

impl<L: BehaviorList> Copy for Ref<'_, L> {}

impl<'a, L: BehaviorList> Ref<'a, L> {
    /// Borrows `value` behind a view.
    #[inline]
    pub fn new<T>(value: &'a T) -> Self
    where
        L: Build<T>,
    {
        Ref {
            ptr: (value as *const T).cast(),
            table: <L as Build<T>>::TABLE,
            marker: PhantomData,
        }
    }

    /// # Safety
    ///
    /// `ptr` must point to a value described by `table`,
    /// valid for reads during `'a`.
    #[inline(always)]
    pub(crate) unsafe fn from_raw(ptr: *const u8, table: &'static Table<L>) -> Self {
        Ref {
            ptr,
            table,
            marker: PhantomData,
        }
    }

    /// Calls the shared behavior `M` on the viewed value.
    #[inline(always)]
    pub fn invoke<M, I>(&self, _behavior: M, args: M::Args) -> M::Output
    where
        M: Behavior<Receiver = Shared>,
        L: Contains<M, I>,
    {
        self.call::<M, I>(args)
    }

    #[inline(always)]
    fn call<M, I>(&self, args: M::Args) -> M::Output
    where
        M: Behavior<Receiver = Shared>,
        L: Contains<M, I>,
    {
        let entry = self.table.entry::<M, I>();

        // Safety: The entry was built for the viewed type.
        unsafe { entry(self.ptr, args) }
    }

    /// Returns the type id of the viewed value.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.table.type_id()
    }

    /// Returns the name of the viewed type.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.table.type_name()
    }

    /// Returns the dispatch table of the viewed value.
    #[inline(always)]
    pub fn table(&self) -> &'static Table<L> {
        self.table
    }

    /// Returns `true` if the viewed value is of type `T`.
    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        self.table.is::<T>()
    }

    /// Returns some reference to the viewed value if it is of type `T`.
    /// Otherwise returns none.
    ///
    /// The reference lives as long as the original borrow.
    #[inline]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&'a T> {
        if self.is::<T>() {
            // Safety: Type was checked above.
            Some(unsafe { &*self.ptr.cast::<T>() })
        } else {
            None
        }
    }
}

impl<L: BehaviorList> fmt::Debug for Ref<'_, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("type", &self.type_name())
            .field("ptr", &self.ptr)
            .finish()
    }
}

/// Type-erased exclusive reference.
///
/// Unlike [`Ref`] it can call behaviors that take `&mut self`.
pub struct RefMut<'a, L: BehaviorList> {
    ptr: *mut u8,
    table: &'static Table<L>,
    marker: PhantomData<&'a mut ()>,
}

impl<'a, L: BehaviorList> RefMut<'a, L> {
    /// Borrows `value` behind a view.
    #[inline]
    pub fn new<T>(value: &'a mut T) -> Self
    where
        L: Build<T>,
    {
        RefMut {
            ptr: (value as *mut T).cast(),
            table: <L as Build<T>>::TABLE,
            marker: PhantomData,
        }
    }

    /// # Safety
    ///
    /// `ptr` must point to a value described by `table`,
    /// valid for reads and writes and not aliased during `'a`.
    #[inline(always)]
    pub(crate) unsafe fn from_raw(ptr: *mut u8, table: &'static Table<L>) -> Self {
        RefMut {
            ptr,
            table,
            marker: PhantomData,
        }
    }

    /// Calls the shared behavior `M` on the viewed value.
    #[inline(always)]
    pub fn invoke<M, I>(&self, _behavior: M, args: M::Args) -> M::Output
    where
        M: Behavior<Receiver = Shared>,
        L: Contains<M, I>,
    {
        self.as_ref().call::<M, I>(args)
    }

    /// Calls the behavior `M` on the viewed value through exclusive access.
    #[inline(always)]
    pub fn invoke_mut<M, I>(&mut self, _behavior: M, args: M::Args) -> M::Output
    where
        M: Behavior,
        M::Receiver: Callable,
        L: Contains<M, I>,
    {
        let entry = self.table.entry::<M, I>();
        let ptr = <M::Receiver as Callable>::from_mut(self.ptr);

        // Safety: The entry was built for the viewed type.
        unsafe { entry(ptr, args) }
    }

    /// Reborrows as a shared view.
    #[inline(always)]
    pub fn as_ref(&self) -> Ref<'_, L> {
        // Safety: Shared borrow of `self` keeps the value alive and unaliased by writers.
        unsafe { Ref::from_raw(self.ptr.cast_const(), self.table) }
    }

    /// Reborrows for a shorter lifetime.
    #[inline(always)]
    pub fn reborrow(&mut self) -> RefMut<'_, L> {
        // Safety: Exclusive borrow of `self` keeps the value alive and unaliased.
        unsafe { RefMut::from_raw(self.ptr, self.table) }
    }

    /// Returns the type id of the viewed value.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.table.type_id()
    }

    /// Returns the name of the viewed type.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.table.type_name()
    }

    /// Returns the dispatch table of the viewed value.
    #[inline(always)]
    pub fn table(&self) -> &'static Table<L> {
        self.table
    }

    /// Returns `true` if the viewed value is of type `T`.
    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        self.table.is::<T>()
    }

    /// Returns some reference to the viewed value if it is of type `T`.
    /// Otherwise returns none.
    #[inline]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        if self.is::<T>() {
            // Safety: Type was checked above.
            Some(unsafe { &*self.ptr.cast::<T>() })
        } else {
            None
        }
    }

    /// Returns some mutable reference to the viewed value if it is of type `T`.
    /// Otherwise returns none.
    #[inline]
    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        if self.is::<T>() {
            // Safety: Type was checked above.
            Some(unsafe { &mut *self.ptr.cast::<T>() })
        } else {
            None
        }
    }

    /// Converts into mutable reference to the viewed value if it is of type `T`.
    /// Otherwise returns the view back.
    #[inline]
    pub fn downcast<T: 'static>(self) -> Result<&'a mut T, Self> {
        if self.is::<T>() {
            // Safety: Type was checked above. The view is consumed.
            Ok(unsafe { &mut *self.ptr.cast::<T>() })
        } else {
            Err(self)
        }
    }
}

impl<'a, L: BehaviorList> From<RefMut<'a, L>> for Ref<'a, L> {
    #[inline(always)]
    fn from(value: RefMut<'a, L>) -> Self {
        // Safety: The exclusive borrow is given up for a shared one of the same lifetime.
        unsafe { Ref::from_raw(value.ptr.cast_const(), value.table) }
    }
}

impl<L: BehaviorList> fmt::Debug for RefMut<'_, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefMut")
            .field("type", &self.type_name())
            .field("ptr", &self.ptr)
            .finish()
    }
}

impl<L, M, I> Dispatch<M, I> for Ref<'_, L>
where
    M: Behavior<Receiver = Shared>,
    L: Contains<M, I>,
{
    #[inline(always)]
    fn dispatch(&self, args: M::Args) -> M::Output {
        self.call::<M, I>(args)
    }
}

impl<L, M, I> Dispatch<M, I> for RefMut<'_, L>
where
    M: Behavior<Receiver = Shared>,
    L: Contains<M, I>,
{
    #[inline(always)]
    fn dispatch(&self, args: M::Args) -> M::Output {
        self.as_ref().call::<M, I>(args)
    }
}

impl<L, M, I> DispatchMut<M, I> for RefMut<'_, L>
where
    M: Behavior<Receiver = Exclusive>,
    L: Contains<M, I>,
{
    #[inline(always)]
    fn dispatch_mut(&mut self, args: M::Args) -> M::Output {
        let entry = self.table.entry::<M, I>();

        // Safety: The entry was built for the viewed type.
        unsafe { entry(self.ptr, args) }
    }
}

impl<L: BehaviorList> sealed::Sealed for Ref<'_, L> {}
impl<L: BehaviorList> sealed::Sealed for RefMut<'_, L> {}

impl<L: BehaviorList> Erasure for Ref<'_, L> {
    type List = L;

    #[inline(always)]
    fn table(&self) -> &'static Table<L> {
        self.table
    }

    #[inline(always)]
    fn payload(&self) -> *const u8 {
        self.ptr
    }
}

impl<L: BehaviorList> Erasure for RefMut<'_, L> {
    type List = L;

    #[inline(always)]
    fn table(&self) -> &'static Table<L> {
        self.table
    }

    #[inline(always)]
    fn payload(&self) -> *const u8 {
        self.ptr.cast_const()
    }
}

impl<L: BehaviorList> ErasureMut for RefMut<'_, L> {
    #[inline(always)]
    fn payload_mut(&mut self) -> *mut u8 {
        self.ptr
    }
}
