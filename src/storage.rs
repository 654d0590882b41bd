use core::{
    alloc::Layout,
    mem::{self, size_of, MaybeUninit},
    ptr,
};

use alloc::{
    alloc::{alloc, dealloc, handle_alloc_error},
    boxed::Box,
};

/// Alignment of the inline buffer.
/// Values aligned stricter than this are always boxed.
pub(crate) const INLINE_ALIGN: usize = 8;

/// Storage of `N` bytes that holds either the value itself or the address of its heap block.
///
/// Whether the value is inline is never stored: it follows from the value's layout
/// and `N`, see [`InlineStorage::fits`].
#[repr(C, align(8))] // alignment value is in sync with `INLINE_ALIGN`
pub(crate) struct InlineStorage<const N: usize> {
    bytes: MaybeUninit<[u8; N]>,
}

// Frees a fresh heap block if the constructor unwinds.
struct Dealloc {
    block: *mut u8,
    layout: Layout,
}

impl Drop for Dealloc {
    fn drop(&mut self) {
        // Safety: The block was allocated with this layout and holds no value.
        unsafe { dealloc(self.block, self.layout) }
    }
}

impl<const N: usize> InlineStorage<N> {
    /// Construct new storage without initializing any value in it.
    pub fn new() -> Self {
        const {
            assert!(
                N >= size_of::<*mut u8>(),
                "inline capacity must be able to hold a pointer"
            );
        }

        InlineStorage {
            bytes: MaybeUninit::uninit(),
        }
    }

    /// Returns `true` if a value with the given layout is stored without allocation.
    #[inline(always)]
    pub const fn fits(layout: Layout) -> bool {
        layout.size() <= N && layout.align() <= INLINE_ALIGN
    }

    /// Moves the value returned by `f` into the storage, boxing it if it does not fit.
    ///
    /// A value already in the storage is overwritten without being dropped.
    pub fn put_with<T>(&mut self, f: impl FnOnce() -> T) {
        if Self::fits(Layout::new::<T>()) {
            // Safety: Size and alignment were checked above.
            unsafe { self.bytes.as_mut_ptr().cast::<T>().write(f()) };
        } else {
            let block = Box::into_raw(Box::new(f()));
            self.adopt(block.cast());
        }
    }

    /// Records `block` as the heap address of the value.
    #[inline(always)]
    pub fn adopt(&mut self, block: *mut u8) {
        // Safety: The buffer holds at least one pointer and is aligned for it.
        unsafe { self.bytes.as_mut_ptr().cast::<*mut u8>().write(block) }
    }

    /// Reserves memory for a value with the given layout and lets `init` construct it there.
    ///
    /// # Safety
    ///
    /// `init` must initialize a value with the given layout at the pointer it receives.
    pub unsafe fn emplace(&mut self, layout: Layout, init: impl FnOnce(*mut u8)) {
        if Self::fits(layout) {
            init(self.bytes.as_mut_ptr().cast());
            return;
        }

        if layout.size() == 0 {
            // Over-aligned zero-sized value, any aligned address will do.
            let block = ptr::null_mut::<u8>().wrapping_add(layout.align());
            init(block);
            self.adopt(block);
            return;
        }

        // Safety: The layout has non-zero size.
        let block = unsafe { alloc(layout) };
        if block.is_null() {
            handle_alloc_error(layout);
        }

        let guard = Dealloc { block, layout };
        init(block);
        mem::forget(guard);

        self.adopt(block);
    }

    /// Returns pointer to the value.
    ///
    /// # Safety
    ///
    /// A value with the given layout must be stored.
    #[inline(always)]
    pub unsafe fn as_ptr(&self, layout: Layout) -> *const u8 {
        if Self::fits(layout) {
            self.bytes.as_ptr().cast()
        } else {
            // Safety: Boxed values leave their address in the buffer.
            unsafe { self.bytes.as_ptr().cast::<*mut u8>().read() }
        }
    }

    /// Returns mutable pointer to the value.
    ///
    /// # Safety
    ///
    /// A value with the given layout must be stored.
    #[inline(always)]
    pub unsafe fn as_mut_ptr(&mut self, layout: Layout) -> *mut u8 {
        if Self::fits(layout) {
            self.bytes.as_mut_ptr().cast()
        } else {
            // Safety: Boxed values leave their address in the buffer.
            unsafe { self.bytes.as_ptr().cast::<*mut u8>().read() }
        }
    }

    /// Drops the value using `drop` and frees its heap block.
    ///
    /// # Safety
    ///
    /// A value with the given layout must be stored, and `drop` must be its drop glue.
    /// The storage is left empty.
    pub unsafe fn destroy(&mut self, layout: Layout, drop: unsafe fn(*mut u8)) {
        unsafe {
            drop(self.as_mut_ptr(layout));
            self.release(layout);
        }
    }

    /// Frees the heap block of a value that was already moved out.
    ///
    /// # Safety
    ///
    /// The storage must have held a value with the given layout.
    /// The storage is left empty.
    pub unsafe fn release(&mut self, layout: Layout) {
        if !Self::fits(layout) && layout.size() != 0 {
            // Safety: Blocks of boxed values are allocated with the value's layout.
            unsafe { dealloc(self.as_mut_ptr(layout), layout) }
        }
    }
}
