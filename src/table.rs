//! Dispatch tables.
//!
//! A behavior list is a tuple of behaviors, `(ComputeArea, Perimeter, capability::Copy)`.
//! For every stored type `T` the list builds one constant [`Table`] holding
//! a trampoline per behavior, in list order, plus the drop glue and layout of `T`.

use core::{
    alloc::Layout,
    any::{type_name, TypeId},
    fmt,
};

use crate::{
    behavior::{sealed::Resolved, Behavior, Entry, Flag, Method, No, Receiver},
    capability,
};

/// Position of a behavior in a behavior list.
///
/// Inferred at call sites; never spelled out by users.
pub struct Index<const K: usize>;

/// Ordered list of behaviors, implemented for tuples of up to twelve behaviors.
pub trait BehaviorList: 'static {
    /// Tuple of table entries, one per behavior.
    type Entries: Copy + 'static;

    /// [`Yes`](crate::Yes) if the list contains [`capability::Copy`].
    type Copies: Flag;

    /// [`Yes`](crate::Yes) if the list contains [`capability::Move`].
    type Moves: Flag;
}

/// Behavior list that has `M` at position `I`.
///
/// Requesting a behavior that is not in the list fails to compile.
pub trait Contains<M: Behavior, I>: BehaviorList {
    fn entry(entries: &Self::Entries) -> Entry<M>;
}

/// Behavior list that can be built for the stored type `T`.
///
/// Implemented when every behavior in the list is implemented for `T`.
pub trait Build<T>: BehaviorList + Sized {
    /// The table of `T`.
    const TABLE: &'static Table<Self>;
}

/// Dispatch table of one stored type against the behavior list `L`.
pub struct Table<L: BehaviorList> {
    type_id: fn() -> TypeId,
    type_name: fn() -> &'static str,
    layout: Layout,
    drop: unsafe fn(*mut u8),
    copy: Option<Entry<capability::Copy>>,
    relocate: Option<Entry<capability::Move>>,
    entries: L::Entries,
}

impl<L: BehaviorList> Table<L> {
    /// Returns the table of `T`.
    ///
    /// # Example
    ///
    /// ```
    /// # use erased::{Erased, Table};
    /// let a: Erased<()> = Erased::new(42u32);
    ///
    /// assert!(a.table() == Table::of::<u32>());
    /// assert!(a.table() != Table::of::<u64>());
    /// ```
    #[inline(always)]
    pub fn of<T>() -> &'static Self
    where
        L: Build<T>,
    {
        <L as Build<T>>::TABLE
    }

    /// Returns `true` if this is the table of `T`.
    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id() == TypeId::of::<T>()
    }

    /// Type id of the stored type.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        (self.type_id)()
    }

    /// Name of the stored type, for diagnostics.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        (self.type_name)()
    }

    /// Layout of the stored type.
    #[inline(always)]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Returns the entry of behavior `M`.
    #[inline(always)]
    pub fn entry<M, I>(&self) -> Entry<M>
    where
        M: Behavior,
        L: Contains<M, I>,
    {
        <L as Contains<M, I>>::entry(&self.entries)
    }

    #[inline(always)]
    pub(crate) fn drop_fn(&self) -> unsafe fn(*mut u8) {
        self.drop
    }

    /// Copy constructor. Present whenever `L::Copies` is `Yes`.
    #[inline(always)]
    pub(crate) fn copy_fn(&self) -> Option<Entry<capability::Copy>> {
        self.copy
    }

    /// Move constructor. Present whenever `L::Moves` is `Yes`.
    #[inline(always)]
    pub(crate) fn relocate_fn(&self) -> Option<Entry<capability::Move>> {
        self.relocate
    }
}

impl<L: BehaviorList> PartialEq for Table<L> {
    fn eq(&self, other: &Self) -> bool {
        self.type_id() == other.type_id()
    }
}

impl<L: BehaviorList> Eq for Table<L> {}

impl<L: BehaviorList> fmt::Debug for Table<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("type", &self.type_name())
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

unsafe fn drop_payload<T>(ptr: *mut u8) {
    // Safety: It was initialized as `T`.
    unsafe { ptr.cast::<T>().drop_in_place() }
}

/// First constructor present in the list.
const fn first<F: Copy>(fns: &[Option<F>]) -> Option<F> {
    let mut i = 0;
    while i < fns.len() {
        if let Some(f) = fns[i] {
            return Some(f);
        }
        i += 1;
    }
    None
}

// Folds a receiver flag over the behaviors of a list.
macro_rules! any_flag {
    ($flag:ident;) => { No };
    ($flag:ident; $head:ident $(, $tail:ident)*) => {
        <<<$head as Behavior>::Receiver as Receiver>::$flag as Flag>::Or<any_flag!($flag; $($tail),*)>
    };
}

macro_rules! impl_behavior_list {
    (@contains $all:tt $($idx:tt: $m:ident),*) => {
        $(impl_behavior_list!(@at $all $idx: $m);)*
    };
    (@at [$($all:ident),*] $idx:tt: $m:ident) => {
        impl<$($all: Behavior),*> Contains<$m, Index<$idx>> for ($($all,)*) {
            #[inline(always)]
            fn entry(entries: &Self::Entries) -> Entry<$m> {
                entries.$idx
            }
        }
    };
    ($($idx:tt: $m:ident),*) => {
        impl<$($m: Behavior),*> BehaviorList for ($($m,)*) {
            type Entries = ($(Entry<$m>,)*);
            type Copies = any_flag!(Copies; $($m),*);
            type Moves = any_flag!(Moves; $($m),*);
        }

        impl<T: 'static, $($m: Method<T>),*> Build<T> for ($($m,)*) {
            const TABLE: &'static Table<Self> = &Table {
                type_id: TypeId::of::<T>,
                type_name: type_name::<T>,
                layout: Layout::new::<T>(),
                drop: drop_payload::<T>,
                copy: first::<Entry<capability::Copy>>(&[$(<$m as Resolved<T>>::COPY),*]),
                relocate: first::<Entry<capability::Move>>(&[$(<$m as Resolved<T>>::MOVE),*]),
                entries: ($(<$m as Method<T>>::ENTRY,)*),
            };
        }

        impl_behavior_list!(@contains [$($m),*] $($idx: $m),*);
    };
}

impl_behavior_list!();
impl_behavior_list!(0: M0);
impl_behavior_list!(0: M0, 1: M1);
impl_behavior_list!(0: M0, 1: M1, 2: M2);
impl_behavior_list!(0: M0, 1: M1, 2: M2, 3: M3);
impl_behavior_list!(0: M0, 1: M1, 2: M2, 3: M3, 4: M4);
impl_behavior_list!(0: M0, 1: M1, 2: M2, 3: M3, 4: M4, 5: M5);
impl_behavior_list!(0: M0, 1: M1, 2: M2, 3: M3, 4: M4, 5: M5, 6: M6);
impl_behavior_list!(0: M0, 1: M1, 2: M2, 3: M3, 4: M4, 5: M5, 6: M6, 7: M7);
impl_behavior_list!(0: M0, 1: M1, 2: M2, 3: M3, 4: M4, 5: M5, 6: M6, 7: M7, 8: M8);
impl_behavior_list!(0: M0, 1: M1, 2: M2, 3: M3, 4: M4, 5: M5, 6: M6, 7: M7, 8: M8, 9: M9);
impl_behavior_list!(
    0: M0, 1: M1, 2: M2, 3: M3, 4: M4, 5: M5, 6: M6, 7: M7, 8: M8, 9: M9, 10: M10
);
impl_behavior_list!(
    0: M0, 1: M1, 2: M2, 3: M3, 4: M4, 5: M5, 6: M6, 7: M7, 8: M8, 9: M9, 10: M10, 11: M11
);
