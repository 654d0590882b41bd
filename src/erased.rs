use core::{
    alloc::Layout,
    any::TypeId,
    fmt,
    marker::PhantomData,
    mem::{size_of, ManuallyDrop},
};

use alloc::boxed::Box;

use crate::{
    behavior::{Behavior, Callable, Dispatch, DispatchMut, Exclusive, Shared, Yes},
    capability::Slot,
    cast::{sealed, Erasure, ErasureMut},
    storage::{InlineStorage, INLINE_ALIGN},
    table::{BehaviorList, Build, Contains, Table},
    view::{Ref, RefMut},
};

/// Size of [`Erased`] in bytes.
pub const DEFAULT_SIZE: usize = 32;

/// Inline capacity of [`Erased`], whatever is left of [`DEFAULT_SIZE`] after the table reference.
///
/// The reference is padded up to the storage alignment, so the capacity is the same
/// on 32-bit and 64-bit targets.
pub const DEFAULT_CAPACITY: usize = DEFAULT_SIZE - table_slot();

const fn table_slot() -> usize {
    let size = size_of::<&'static ()>();
    if size > INLINE_ALIGN {
        size
    } else {
        INLINE_ALIGN
    }
}

const _: () = assert!(size_of::<Erased<()>>() == DEFAULT_SIZE);

/// Type-erased value with fixed-size inline storage,
/// that can be used through the behaviors listed in `L`.
///
/// Values that fit in `N` bytes and are aligned to at most 8 are stored without allocation.
/// Larger values are boxed.
///
/// The container is [`Clone`] if `L` lists [`capability::Copy`](crate::capability::Copy).
/// Cloning into an existing container with [`Clone::clone_from`] builds the new value
/// before dropping the old one, so a panicking clone leaves the target untouched.
///
/// Stored types may not implement `Send` and `Sync`,
/// so neither does the container.
pub struct BasicErased<L: BehaviorList, const N: usize = DEFAULT_CAPACITY> {
    table: &'static Table<L>,
    storage: InlineStorage<N>,
    unsend: PhantomData<*mut u8>,
}

/// [`BasicErased`] that occupies [`DEFAULT_SIZE`] bytes.
pub type Erased<L> = BasicErased<L, DEFAULT_CAPACITY>;

impl<L: BehaviorList, const N: usize> Drop for BasicErased<L, N> {
    #[inline(always)]
    fn drop(&mut self) {
        // Safety: The storage holds a value described by the table.
        unsafe {
            self.storage
                .destroy(self.table.layout(), self.table.drop_fn());
        }
    }
}

impl<L: BehaviorList, const N: usize> BasicErased<L, N> {
    /// Size of the container in bytes.
    pub const SIZE: usize = size_of::<Self>();

    /// Number of bytes available for inline values.
    pub const CAPACITY: usize = N;

    /// Returns `true` if the type `T` fits and can be stored without allocation.
    /// If `true`, then `BasicErased::<L, N>::new::<T>` is guaranteed to not allocate.
    ///
    /// # Example
    ///
    /// ```
    /// # use erased::Erased;
    /// assert!(Erased::<()>::fits::<u32>());
    /// assert!(!Erased::<()>::fits::<[u64; 8]>());
    /// ```
    #[inline(always)]
    pub const fn fits<T>() -> bool {
        InlineStorage::<N>::fits(Layout::new::<T>())
    }

    /// Construct new container with the given value.
    ///
    /// If the type `T` fits in the storage, it is stored without allocation.
    /// Otherwise, it will be boxed.
    ///
    /// # Example
    ///
    /// ```
    /// # use erased::Erased;
    /// let a: Erased<()> = Erased::new(42u32);
    ///
    /// assert_eq!(a.downcast_ref::<u32>(), Some(&42));
    /// ```
    #[inline]
    pub fn new<T>(value: T) -> Self
    where
        L: Build<T>,
    {
        Self::new_with(|| value)
    }

    /// Construct new container with the value returned by `f`.
    ///
    /// The value is written straight into its final place, inline or boxed.
    #[inline]
    pub fn new_with<T>(f: impl FnOnce() -> T) -> Self
    where
        L: Build<T>,
    {
        let mut storage = InlineStorage::new();
        storage.put_with(f);

        BasicErased {
            table: <L as Build<T>>::TABLE,
            storage,
            unsend: PhantomData,
        }
    }

    /// Construct new container holding `T` built from `args`.
    ///
    /// # Example
    ///
    /// ```
    /// # use erased::Erased;
    /// struct Meters(f64);
    ///
    /// impl From<f64> for Meters {
    ///     fn from(value: f64) -> Self {
    ///         Meters(value)
    ///     }
    /// }
    ///
    /// let a: Erased<()> = Erased::in_place::<Meters, _>(2.5);
    ///
    /// assert_eq!(a.downcast_ref::<Meters>().unwrap().0, 2.5);
    /// ```
    #[inline]
    pub fn in_place<T, A>(args: A) -> Self
    where
        T: From<A>,
        L: Build<T>,
    {
        Self::new_with(|| T::from(args))
    }

    /// Construct new container from the given boxed value.
    ///
    /// If type fits in the storage, value will be unboxed.
    /// Otherwise the box allocation is reused and no allocation is performed.
    ///
    /// # Example
    ///
    /// ```
    /// # use erased::Erased;
    /// let boxed = Box::new([1u32; 42]);
    ///
    /// // No additional allocation is performed.
    /// let a: Erased<()> = Erased::from_box(boxed);
    ///
    /// assert_eq!(a.downcast_ref::<[u32; 42]>().unwrap(), &[1u32; 42]);
    /// ```
    #[inline]
    pub fn from_box<T>(boxed: Box<T>) -> Self
    where
        L: Build<T>,
    {
        let mut storage = InlineStorage::new();

        if Self::fits::<T>() {
            storage.put_with(|| *boxed);
        } else {
            storage.adopt(Box::into_raw(boxed).cast());
        }

        BasicErased {
            table: <L as Build<T>>::TABLE,
            storage,
            unsend: PhantomData,
        }
    }

    /// Calls the shared behavior `M` on the stored value.
    ///
    /// Behaviors that take `&mut self` are called with [`invoke_mut`](Self::invoke_mut).
    ///
    /// # Example
    ///
    /// ```
    /// # use erased::{Erased, RefInvoker};
    /// erased::behavior! {
    ///     Halve as HalveExt: fn halve(&self) -> u32;
    /// }
    ///
    /// impl RefInvoker<u32> for Halve {
    ///     fn invoke(this: &u32, (): ()) -> u32 {
    ///         this / 2
    ///     }
    /// }
    ///
    /// let a: Erased<(Halve,)> = Erased::new(42u32);
    ///
    /// assert_eq!(a.invoke(Halve, ()), 21);
    /// assert_eq!(a.halve(), 21);
    /// ```
    #[inline(always)]
    pub fn invoke<M, I>(&self, _behavior: M, args: M::Args) -> M::Output
    where
        M: Behavior<Receiver = Shared>,
        L: Contains<M, I>,
    {
        self.call::<M, I>(args)
    }

    /// Calls the behavior `M` on the stored value through exclusive access.
    ///
    /// Accepts both shared and exclusive behaviors.
    #[inline(always)]
    pub fn invoke_mut<M, I>(&mut self, _behavior: M, args: M::Args) -> M::Output
    where
        M: Behavior,
        M::Receiver: Callable,
        L: Contains<M, I>,
    {
        self.call_mut::<M, I>(args)
    }

    #[inline(always)]
    fn call<M, I>(&self, args: M::Args) -> M::Output
    where
        M: Behavior<Receiver = Shared>,
        L: Contains<M, I>,
    {
        let entry = self.table.entry::<M, I>();

        // Safety: The entry was built for the stored type.
        unsafe { entry(self.ptr(), args) }
    }

    #[inline(always)]
    fn call_mut<M, I>(&mut self, args: M::Args) -> M::Output
    where
        M: Behavior,
        M::Receiver: Callable,
        L: Contains<M, I>,
    {
        let entry = self.table.entry::<M, I>();
        let ptr = <M::Receiver as Callable>::from_mut(self.ptr_mut());

        // Safety: The entry was built for the stored type.
        unsafe { entry(ptr, args) }
    }

    /// Returns `true` if the stored value lives in the inline buffer.
    #[inline]
    pub fn is_inline(&self) -> bool {
        InlineStorage::<N>::fits(self.table.layout())
    }

    /// Returns the type id of the stored value.
    ///
    /// # Example
    ///
    /// ```
    /// # use erased::Erased;
    /// use core::any::TypeId;
    ///
    /// let a: Erased<()> = Erased::new(42u32);
    ///
    /// assert_eq!(a.type_id(), TypeId::of::<u32>());
    /// ```
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.table.type_id()
    }

    /// Returns the name of the stored type.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.table.type_name()
    }

    /// Returns the dispatch table of the stored value.
    #[inline(always)]
    pub fn table(&self) -> &'static Table<L> {
        self.table
    }

    /// Returns `true` if the stored value is of type `T`.
    ///
    /// # Example
    ///
    /// ```
    /// # use erased::Erased;
    /// let a: Erased<()> = Erased::new(42u32);
    /// assert!(a.is::<u32>());
    /// ```
    #[inline]
    pub fn is<T>(&self) -> bool
    where
        T: 'static,
    {
        self.table.is::<T>()
    }

    /// Returns some reference to the stored value if it is of type `T`.
    /// Otherwise returns none.
    ///
    /// # Example
    ///
    /// ```
    /// # use erased::Erased;
    /// let a: Erased<()> = Erased::new(42u32);
    ///
    /// assert_eq!(a.downcast_ref::<u32>(), Some(&42));
    /// assert_eq!(a.downcast_ref::<i32>(), None);
    /// ```
    #[inline]
    pub fn downcast_ref<T>(&self) -> Option<&T>
    where
        T: 'static,
    {
        if self.is::<T>() {
            Some(unsafe { self.downcast_ref_unchecked::<T>() })
        } else {
            None
        }
    }

    /// Returns some mutable reference to the stored value if it is of type `T`.
    /// Otherwise returns none.
    ///
    /// # Example
    ///
    /// ```
    /// # use erased::Erased;
    /// let mut a: Erased<()> = Erased::new(42u32);
    ///
    /// *a.downcast_mut::<u32>().unwrap() = 7;
    /// assert_eq!(a.downcast_ref::<u32>(), Some(&7));
    /// ```
    #[inline]
    pub fn downcast_mut<T>(&mut self) -> Option<&mut T>
    where
        T: 'static,
    {
        if self.is::<T>() {
            Some(unsafe { self.downcast_mut_unchecked::<T>() })
        } else {
            None
        }
    }

    /// Returns the stored value if it is of type `T`.
    /// Otherwise return self back.
    ///
    /// This will unbox the value if it was stored as boxed.
    ///
    /// # Example
    ///
    /// ```
    /// # use erased::Erased;
    /// let a: Erased<()> = Erased::new(42u32);
    ///
    /// let Err(a) = a.downcast::<u64>() else {
    ///     panic!();
    /// };
    ///
    /// assert_eq!(a.downcast::<u32>().ok(), Some(42));
    /// ```
    #[inline]
    pub fn downcast<T>(self) -> Result<T, Self>
    where
        T: 'static,
    {
        if self.is::<T>() {
            Ok(unsafe { self.downcast_unchecked() })
        } else {
            Err(self)
        }
    }

    /// Returns reference to the stored value without type checking.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the type is correct.
    #[inline]
    pub unsafe fn downcast_ref_unchecked<T>(&self) -> &T
    where
        T: 'static,
    {
        debug_assert!(self.is::<T>());
        unsafe { &*self.ptr().cast::<T>() }
    }

    /// Returns mutable reference to the stored value without type checking.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the type is correct.
    #[inline]
    pub unsafe fn downcast_mut_unchecked<T>(&mut self) -> &mut T
    where
        T: 'static,
    {
        debug_assert!(self.is::<T>());
        unsafe { &mut *self.ptr_mut().cast::<T>() }
    }

    /// Returns the stored value without type checking.
    ///
    /// This will unbox the value if it was stored as boxed.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the type is correct.
    #[inline]
    pub unsafe fn downcast_unchecked<T>(self) -> T
    where
        T: 'static,
    {
        debug_assert!(self.is::<T>());
        // Prevent dropping using the table's drop glue.
        let mut me = ManuallyDrop::new(self);
        let layout = me.table.layout();

        unsafe {
            let value = me.storage.as_ptr(layout).cast::<T>().read();
            me.storage.release(layout);
            value
        }
    }

    /// Borrows the stored value as a [`Ref`] view.
    #[inline]
    pub fn view(&self) -> Ref<'_, L> {
        // Safety: The pointer is valid for as long as `self` is borrowed.
        unsafe { Ref::from_raw(self.ptr(), self.table) }
    }

    /// Borrows the stored value as a [`RefMut`] view.
    #[inline]
    pub fn view_mut(&mut self) -> RefMut<'_, L> {
        let table = self.table;

        // Safety: The pointer is valid and unique for as long as `self` is borrowed.
        unsafe { RefMut::from_raw(self.ptr_mut(), table) }
    }

    #[inline(always)]
    fn ptr(&self) -> *const u8 {
        // Safety: The storage holds a value described by the table.
        unsafe { self.storage.as_ptr(self.table.layout()) }
    }

    #[inline(always)]
    fn ptr_mut(&mut self) -> *mut u8 {
        // Safety: The storage holds a value described by the table.
        unsafe { self.storage.as_mut_ptr(self.table.layout()) }
    }
}

impl<L, const N: usize> BasicErased<L, N>
where
    L: BehaviorList<Moves = Yes>,
{
    /// Moves the stored value into a container with inline capacity `C`.
    ///
    /// The destination decides on its own whether the value fits inline.
    /// A value boxed on both sides keeps its allocation.
    ///
    /// Requires [`capability::Move`](crate::capability::Move) in the behavior list.
    ///
    /// # Example
    ///
    /// ```
    /// # use erased::{capability, BasicErased, Erased};
    /// let a: Erased<(capability::Move,)> = Erased::new([7u64; 4]);
    /// assert!(!a.is_inline());
    ///
    /// let b: BasicErased<(capability::Move,), 64> = a.relocate();
    /// assert!(b.is_inline());
    /// assert_eq!(b.downcast_ref::<[u64; 4]>(), Some(&[7; 4]));
    /// ```
    pub fn relocate<const C: usize>(self) -> BasicErased<L, C> {
        // The value is moved out by hand below.
        let mut me = ManuallyDrop::new(self);
        let table = me.table;
        let layout = table.layout();
        let mut storage = InlineStorage::<C>::new();

        if !InlineStorage::<N>::fits(layout) && !InlineStorage::<C>::fits(layout) {
            // Safety: The storage holds a value described by the table.
            let block = unsafe { me.storage.as_mut_ptr(layout) };
            storage.adopt(block);
        } else {
            let relocate = match table.relocate_fn() {
                Some(relocate) => relocate,
                None => unreachable!("behavior list with `Move` lacks move constructor"),
            };

            // Safety: The storage holds a value described by the table.
            let source = unsafe { me.storage.as_mut_ptr(layout) };

            // Safety: The slot has the value's layout and the source is not used afterwards.
            let init = |slot| unsafe { relocate(source, Slot::new(slot)) };

            unsafe {
                storage.emplace(layout, init);
                me.storage.release(layout);
            }
        }

        BasicErased {
            table,
            storage,
            unsend: PhantomData,
        }
    }
}

impl<L, const N: usize> Clone for BasicErased<L, N>
where
    L: BehaviorList<Copies = Yes>,
{
    fn clone(&self) -> Self {
        let copy = match self.table.copy_fn() {
            Some(copy) => copy,
            None => unreachable!("behavior list with `Copy` lacks copy constructor"),
        };

        let source = self.ptr();
        let mut storage = InlineStorage::new();

        // Safety: The slot has the value's layout.
        let init = |slot| unsafe { copy(source, Slot::new(slot)) };
        unsafe { storage.emplace(self.table.layout(), init) };

        BasicErased {
            table: self.table,
            storage,
            unsend: PhantomData,
        }
    }

    #[inline]
    fn clone_from(&mut self, source: &Self) {
        // New value first, old one is dropped by the assignment.
        *self = source.clone();
    }
}

impl<L: BehaviorList, const N: usize> fmt::Debug for BasicErased<L, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Erased")
            .field("type", &self.type_name())
            .field("inline", &self.is_inline())
            .finish_non_exhaustive()
    }
}

impl<L, M, I, const N: usize> Dispatch<M, I> for BasicErased<L, N>
where
    M: Behavior<Receiver = Shared>,
    L: Contains<M, I>,
{
    #[inline(always)]
    fn dispatch(&self, args: M::Args) -> M::Output {
        self.call::<M, I>(args)
    }
}

impl<L, M, I, const N: usize> DispatchMut<M, I> for BasicErased<L, N>
where
    M: Behavior<Receiver = Exclusive>,
    L: Contains<M, I>,
{
    #[inline(always)]
    fn dispatch_mut(&mut self, args: M::Args) -> M::Output {
        self.call_mut::<M, I>(args)
    }
}

impl<L: BehaviorList, const N: usize> sealed::Sealed for BasicErased<L, N> {}

impl<L: BehaviorList, const N: usize> Erasure for BasicErased<L, N> {
    type List = L;

    #[inline(always)]
    fn table(&self) -> &'static Table<L> {
        self.table
    }

    #[inline(always)]
    fn payload(&self) -> *const u8 {
        self.ptr()
    }
}

impl<L: BehaviorList, const N: usize> ErasureMut for BasicErased<L, N> {
    #[inline(always)]
    fn payload_mut(&mut self) -> *mut u8 {
        self.ptr_mut()
    }
}
