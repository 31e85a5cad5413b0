use thiserror::Error;

/// Failures surfaced by the allocation operations. None of them leave the
/// heap in a modified state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
  /// The region could not grow, or growing it would exceed the configured
  /// heap limit.
  #[error("out of memory: region refused to grow by {requested} bytes")]
  OutOfMemory { requested: usize },

  /// The request size does not fit in `usize` once multiplied, rounded or
  /// combined with a header.
  #[error("requested size overflows usize")]
  SizeOverflow,
}

/// Broken heap invariants reported by
/// [`FreeListAllocator::verify`](crate::FreeListAllocator::verify).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HeapError {
  #[error("heap walk stopped at {found:#x}, region ends at {end:#x}")]
  BrokenWalk { found: usize, end: usize },

  #[error("free list contains used block at {0:#x}")]
  UsedInFreeList(usize),

  #[error("free list is not in ascending address order at {0:#x}")]
  Unordered(usize),

  #[error("free blocks at {0:#x} and {1:#x} are contiguous")]
  Uncoalesced(usize, usize),

  #[error("free list holds {listed} blocks but the heap has {free} free blocks")]
  Membership { listed: usize, free: usize },
}
