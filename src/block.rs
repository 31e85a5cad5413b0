use std::{mem, ptr};

/// Header placed in front of every payload.
///
/// ```text
///   ┌───────────────────────┬────────────────────────────────┐
///   │    Block Header       │           Payload              │
///   │  size | used | next   │        `size` bytes            │
///   └───────────────────────┴────────────────────────────────┘
///   ▲                       ▲                                ▲
///   block                   Block::payload(block)            Block::end(block)
/// ```
///
/// `next_free` is only meaningful while `used == false`.
#[repr(C)]
pub(crate) struct Block {
  pub size: usize,
  pub used: bool,
  pub next_free: *mut Block,
}

/// Bytes occupied by a header. Always a whole number of machine words.
pub(crate) const HEADER_SIZE: usize = mem::size_of::<Block>();

const _: () = assert!(HEADER_SIZE % mem::size_of::<usize>() == 0);

impl Block {
  /// Writes a fresh header at `address` and returns it.
  ///
  /// # Safety
  ///
  /// `address` must be word aligned and valid for `HEADER_SIZE + size`
  /// bytes of writes.
  pub unsafe fn init(
    address: *mut u8,
    size: usize,
    used: bool,
  ) -> *mut Block {
    let block = address.cast::<Block>();
    unsafe {
      block.write(Block {
        size,
        used,
        next_free: ptr::null_mut(),
      });
    }
    block
  }

  /// First payload byte of `block`.
  #[inline]
  pub unsafe fn payload(block: *mut Block) -> *mut u8 {
    unsafe { block.cast::<u8>().add(HEADER_SIZE) }
  }

  /// Header owning the payload at `address`.
  ///
  /// # Safety
  ///
  /// `address` must have been produced by [`Block::payload`].
  #[inline]
  pub unsafe fn from_payload(address: *mut u8) -> *mut Block {
    unsafe { address.sub(HEADER_SIZE).cast() }
  }

  /// One past the last payload byte, which is where the next block starts.
  #[inline]
  pub unsafe fn end(block: *mut Block) -> *mut u8 {
    unsafe { Block::payload(block).add((*block).size) }
  }

  /// Whether `next` starts exactly where `block` ends.
  #[inline]
  pub unsafe fn precedes(
    block: *mut Block,
    next: *mut Block,
  ) -> bool {
    unsafe { Block::end(block) == next.cast::<u8>() }
  }

  /// Folds `next` into `block`: `block` takes over the bytes of `next`
  /// (header included) and its place in the free list.
  ///
  /// # Safety
  ///
  /// `next` must directly follow `block` in memory.
  pub unsafe fn absorb(
    block: *mut Block,
    next: *mut Block,
  ) {
    unsafe {
      debug_assert!(Block::precedes(block, next));
      (*block).size += HEADER_SIZE + (*next).size;
      (*block).next_free = (*next).next_free;
    }
  }

  /// Shrinks `block` to `size` bytes and carves the rest into a new free
  /// block, but only if the rest can hold a header plus some payload.
  /// Returns the carved block, unlinked.
  ///
  /// # Safety
  ///
  /// `block` must be a valid header with `(*block).size >= size` and `size`
  /// must be word rounded.
  pub unsafe fn split(
    block: *mut Block,
    size: usize,
  ) -> Option<*mut Block> {
    unsafe {
      let surplus = (*block).size - size;
      if surplus <= HEADER_SIZE {
        return None;
      }

      let tail = Block::init(Block::payload(block).add(size), surplus - HEADER_SIZE, false);
      (*block).size = size;

      log::debug!(
        "split {:?} into {} + {} bytes at {:?}",
        block,
        size,
        (*tail).size,
        tail
      );

      Some(tail)
    }
  }
}
