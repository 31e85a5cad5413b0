use std::{
  mem,
  ptr::{self, NonNull},
};

/// The memory the allocator carves blocks out of. A region only ever grows,
/// and every growth must continue exactly where the previous one stopped.
///
/// # Safety
///
/// A span returned by [`Region::extend`] must be valid for reads and writes
/// of `n` bytes, must start at the value [`Region::end`] reported before the
/// call, and must stay valid for as long as the region is alive.
pub unsafe trait Region {
  /// Grows the region by `n` bytes and returns the start of the new span, or
  /// `None` if the region cannot grow.
  fn extend(
    &mut self,
    n: usize,
  ) -> Option<NonNull<u8>>;

  /// Current end of the region.
  fn end(&self) -> *mut u8;
}

/// The process data segment, grown with `sbrk(2)`.
///
/// ```text
///   High Address ┌─────────────────────┐
///                │       Stack         │ ↓ grows down
///                │                     │
///                │       Heap          │ ↑ grows up (sbrk)
///                ├─────────────────────┤ ← Program Break
///                │   Data / Text       │
///   Low Address  └─────────────────────┘
/// ```
///
/// Nothing else in the process may move the program break while an allocator
/// is using it, otherwise blocks are no longer back to back.
#[cfg(unix)]
#[derive(Debug, Default, Clone, Copy)]
pub struct Sbrk;

#[cfg(unix)]
unsafe impl Region for Sbrk {
  fn extend(
    &mut self,
    n: usize,
  ) -> Option<NonNull<u8>> {
    let increment = libc::intptr_t::try_from(n).ok()?;
    let address = unsafe { libc::sbrk(increment) };

    if address as usize == usize::MAX {
      return None;
    }

    NonNull::new(address.cast())
  }

  fn end(&self) -> *mut u8 {
    unsafe { libc::sbrk(0).cast() }
  }
}

/// Fixed-capacity, word-aligned buffer handed out front to back. Lets a
/// program run several independent heaps, and gives tests a region whose
/// exhaustion point is known in advance.
pub struct Arena {
  base: NonNull<usize>,
  words: usize,
  used: usize,
}

impl Arena {
  /// Reserves `capacity` bytes, rounded up to whole words.
  pub fn with_capacity(capacity: usize) -> Self {
    let words = capacity.div_ceil(mem::size_of::<usize>());
    let memory: Box<[usize]> = vec![0; words].into_boxed_slice();
    let base = NonNull::from(Box::leak(memory)).cast::<usize>();

    Self {
      base,
      words,
      used: 0,
    }
  }

  pub fn capacity(&self) -> usize {
    self.words * mem::size_of::<usize>()
  }

  /// Bytes handed out so far.
  pub fn used(&self) -> usize {
    self.used
  }
}

unsafe impl Region for Arena {
  fn extend(
    &mut self,
    n: usize,
  ) -> Option<NonNull<u8>> {
    let end = self.used.checked_add(n)?;
    if end > self.capacity() {
      return None;
    }

    let start = self.end();
    self.used = end;
    NonNull::new(start)
  }

  fn end(&self) -> *mut u8 {
    unsafe { self.base.as_ptr().cast::<u8>().add(self.used) }
  }
}

impl Drop for Arena {
  fn drop(&mut self) {
    let memory = ptr::slice_from_raw_parts_mut(self.base.as_ptr(), self.words);
    drop(unsafe { Box::from_raw(memory) });
  }
}
