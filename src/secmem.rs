//! Memory provider
//!
//! Aligned heap allocation with an optional "secret" strategy: secret
//! allocations are locked out of swap where the platform allows it and are
//! always wiped before the pages return to the allocator. The C-style
//! size/descriptor prefix header becomes fields of the owning handle here;
//! release goes through `Drop`, so a matching wipe-then-free cannot be
//! forgotten.
//!
//! The downgrade chain for secret memory is: locked pages -> plain pages.
//! A downgrade is silent (the allocation still succeeds) but the achieved
//! class stays queryable, and a downgraded allocation is still wiped on
//! free; the "secret" promise to wipe never degrades.
//!
//! This is the one module that touches raw allocation; every unsafe block
//! carries its invariant.
#![allow(unsafe_code)]

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ptr::NonNull;

use zeroize::Zeroize;

use crate::ct;
use crate::error::{Error, Result};

/// Achieved allocation class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemClass {
    /// Ordinary aligned heap memory
    Plain,
    /// mlock-backed: excluded from swap
    Locked,
}

/// Owned, aligned byte buffer from the provider.
#[derive(Debug)]
pub struct SecureBuf {
    ptr: NonNull<u8>,
    layout: Layout,
    class: MemClass,
    wipe_on_free: bool,
}

// The buffer is exclusively owned; moving it across threads is sound.
unsafe impl Send for SecureBuf {}
unsafe impl Sync for SecureBuf {}

impl SecureBuf {
    /// Plain aligned allocation. `align` must be a power of two, `len`
    /// nonzero.
    pub fn alloc_aligned(align: usize, len: usize) -> Result<Self> {
        Self::alloc_inner(align, len, false)
    }

    /// Secret allocation: attempts locked pages, silently downgrades to
    /// plain pages, always wipes before free.
    pub fn alloc_secret(align: usize, len: usize) -> Result<Self> {
        Self::alloc_inner(align, len, true)
    }

    fn alloc_inner(align: usize, len: usize, secret: bool) -> Result<Self> {
        if len == 0 {
            return Err(Error::InvalidArgument("zero-length allocation"));
        }
        let layout = Layout::from_size_align(len, align.max(1))
            .map_err(|_| Error::InvalidArgument("bad alignment"))?;
        // SAFETY: layout has nonzero size; the pointer is checked for null
        // before use and freed with the identical layout in Drop.
        let ptr = unsafe { alloc_zeroed(layout) };
        let ptr = NonNull::new(ptr).ok_or(Error::OutOfMemory)?;
        let class = if secret && lock_region(ptr.as_ptr(), len) {
            MemClass::Locked
        } else {
            MemClass::Plain
        };
        Ok(SecureBuf {
            ptr,
            layout,
            class,
            wipe_on_free: secret,
        })
    }

    /// Achieved class; callers that must not run on swappable memory check
    /// this after `alloc_secret`.
    pub fn class(&self) -> MemClass {
        self.class
    }

    pub fn len(&self) -> usize {
        self.layout.size()
    }

    pub fn is_empty(&self) -> bool {
        self.layout.size() == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: ptr is valid for layout.size() bytes for the lifetime of
        // self; the allocation is initialized (alloc_zeroed).
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.layout.size()) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as above, plus &mut self guarantees exclusivity.
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.layout.size()) }
    }
}

impl Drop for SecureBuf {
    fn drop(&mut self) {
        if self.wipe_on_free {
            ct::wipe(self.as_mut_slice());
        }
        if self.class == MemClass::Locked {
            unlock_region(self.ptr.as_ptr(), self.layout.size());
        }
        // SAFETY: allocated in alloc_inner with this exact layout.
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) };
    }
}

/// Heap-constructed primitive instance with wipe-on-drop and best-effort
/// page locking. This is the `ALG_alloc` / `ALG_zero_free` pairing: the
/// wipe is bound to `Drop`, not to caller discipline.
pub struct SecureBox<T: Zeroize> {
    inner: Box<T>,
    locked: bool,
}

impl<T: Zeroize + Default> SecureBox<T> {
    pub fn new() -> Result<Self> {
        Self::new_from(T::default())
    }
}

impl<T: Zeroize> SecureBox<T> {
    /// Move an already-built instance onto provider-backed storage.
    pub fn new_from(value: T) -> Result<Self> {
        let layout = Layout::new::<T>();
        if layout.size() == 0 {
            return Ok(SecureBox {
                inner: Box::new(value),
                locked: false,
            });
        }
        // SAFETY: nonzero size; null is handled; the value is written before
        // the Box takes ownership, and Box::from_raw matches the global
        // allocator and layout used here.
        unsafe {
            let p = alloc_zeroed(layout) as *mut T;
            if p.is_null() {
                return Err(Error::OutOfMemory);
            }
            p.write(value);
            let locked = lock_region(p as *mut u8, layout.size());
            Ok(SecureBox {
                inner: Box::from_raw(p),
                locked,
            })
        }
    }
}

impl<T: Zeroize> core::ops::Deref for SecureBox<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: Zeroize> core::ops::DerefMut for SecureBox<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

impl<T: Zeroize> Drop for SecureBox<T> {
    fn drop(&mut self) {
        self.inner.zeroize();
        if self.locked {
            let layout = Layout::new::<T>();
            unlock_region(self.inner.as_ref() as *const T as *const u8, layout.size());
        }
    }
}

#[cfg(unix)]
fn lock_region(ptr: *const u8, len: usize) -> bool {
    // SAFETY: the region [ptr, ptr+len) is a live allocation owned by the
    // caller.
    unsafe { libc::mlock(ptr as *const libc::c_void, len) == 0 }
}

#[cfg(unix)]
fn unlock_region(ptr: *const u8, len: usize) {
    // SAFETY: as lock_region; munlock failure is ignorable on release.
    unsafe {
        let _ = libc::munlock(ptr as *const libc::c_void, len);
    }
}

#[cfg(not(unix))]
fn lock_region(_ptr: *const u8, _len: usize) -> bool {
    false
}

#[cfg(not(unix))]
fn unlock_region(_ptr: *const u8, _len: usize) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligned_allocation_is_aligned() {
        let buf = SecureBuf::alloc_aligned(64, 200).unwrap();
        assert_eq!(buf.as_slice().as_ptr() as usize % 64, 0);
        assert_eq!(buf.len(), 200);
    }

    #[test]
    fn zero_length_rejected() {
        assert_eq!(
            SecureBuf::alloc_aligned(8, 0).unwrap_err(),
            Error::InvalidArgument("zero-length allocation")
        );
    }

    #[test]
    fn secret_allocation_succeeds_with_some_class() {
        let buf = SecureBuf::alloc_secret(32, 4096).unwrap();
        // Locked when the platform permits, Plain after a silent downgrade.
        assert!(matches!(buf.class(), MemClass::Locked | MemClass::Plain));
    }

    #[test]
    fn secure_box_constructs_default() {
        #[derive(Default, Zeroize)]
        struct K([u8; 32]);
        let mut b = SecureBox::<K>::new().unwrap();
        b.0[0] = 7;
        assert_eq!(b.0[0], 7);
    }
}
