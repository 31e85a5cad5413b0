use std::ptr::{self, NonNull};

use crate::{
  align::{self, WORD},
  block::{Block, HEADER_SIZE},
  config::Config,
  error::AllocError,
  freelist::FreeList,
  region::Region,
};

#[cfg(unix)]
use crate::region::Sbrk;

/// First-fit allocator over a single growable [`Region`].
///
/// All state lives in this struct, so independent heaps can coexist and
/// nothing is synchronized: callers sharing one across threads must wrap the
/// whole allocator in a lock.
///
/// Payloads are handed out as raw pointers into the region. They stay valid
/// until released, resized away, or until the allocator (and with it the
/// region) is dropped.
pub struct FreeListAllocator<R: Region> {
  region: R,
  config: Config,
  heap_start: *mut u8,
  free: FreeList,
}

#[cfg(unix)]
impl FreeListAllocator<Sbrk> {
  /// Allocator over the process data segment.
  pub fn sbrk() -> Self {
    Self::new(Sbrk)
  }
}

impl<R: Region> FreeListAllocator<R> {
  pub fn new(region: R) -> Self {
    Self::with_config(region, Config::default())
  }

  pub fn with_config(
    region: R,
    config: Config,
  ) -> Self {
    Self {
      region,
      config,
      heap_start: ptr::null_mut(),
      free: FreeList::new(),
    }
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn region(&self) -> &R {
    &self.region
  }

  /// First byte of the first block, or null before the first growth.
  pub fn heap_start(&self) -> *mut u8 {
    self.heap_start
  }

  /// Current end of the underlying region.
  pub fn heap_end(&self) -> *mut u8 {
    self.region.end()
  }

  /// Bytes obtained from the region so far, alignment padding excluded.
  pub fn heap_size(&self) -> usize {
    if self.heap_start.is_null() {
      return 0;
    }
    self.heap_end() as usize - self.heap_start as usize
  }

  pub(crate) fn free_list(&self) -> &FreeList {
    &self.free
  }

  /// Returns at least `size` uninitialized bytes, reusing the first free block
  /// that fits before growing the region.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    let rounded = align::payload_size(size).ok_or(AllocError::SizeOverflow)?;

    let block = match unsafe { self.free.take_first_fit(rounded) } {
      Some(block) => block,
      None => self.grow(rounded)?,
    };

    let payload = unsafe { Block::payload(block) };
    log::trace!("allocate({}) -> {:?}", size, payload);

    NonNull::new(payload).ok_or(AllocError::OutOfMemory { requested: size })
  }

  /// Same as [`FreeListAllocator::allocate`] for `count * elem_size` bytes,
  /// all set to zero. The product is computed in `usize` and checked.
  pub fn zero_allocate(
    &mut self,
    count: usize,
    elem_size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    let size = count.checked_mul(elem_size).ok_or(AllocError::SizeOverflow)?;
    let payload = self.allocate(size)?;

    unsafe { payload.as_ptr().write_bytes(0, size) };
    Ok(payload)
  }

  /// Gives the block owning `address` back to the free list. Null pointers
  /// and blocks that are already free are ignored.
  ///
  /// # Safety
  ///
  /// `address` must be null or a pointer returned by this allocator. Passing
  /// anything else reads a header from arbitrary memory.
  pub unsafe fn release(
    &mut self,
    address: *mut u8,
  ) {
    if address.is_null() {
      return;
    }

    unsafe {
      let block = Block::from_payload(address);
      if !(*block).used {
        log::warn!("release({:?}): block already free", address);
        return;
      }

      if let Some(byte) = self.config.poison_byte() {
        address.write_bytes(byte, (*block).size);
      }

      log::trace!("release({:?}) of {} bytes", address, (*block).size);
      self.free.insert(block);
    }
  }

  /// Changes the capacity behind `address` to at least `new_size` bytes,
  /// keeping the first `min(old, new_size)` bytes.
  ///
  /// - Null `address` behaves like [`FreeListAllocator::allocate`].
  /// - `new_size == 0` releases `address` and returns `Ok(None)`.
  /// - A block that is already large enough is returned untouched, slack
  ///   included.
  /// - Otherwise the block grows into a free neighbour when one follows it,
  ///   or moves to a fresh allocation. If that allocation fails the original
  ///   block is left as it was.
  ///
  /// # Safety
  ///
  /// Same contract as [`FreeListAllocator::release`]. When a different
  /// address comes back, the old one must no longer be used.
  pub unsafe fn resize(
    &mut self,
    address: *mut u8,
    new_size: usize,
  ) -> Result<Option<NonNull<u8>>, AllocError> {
    if address.is_null() {
      return self.allocate(new_size).map(Some);
    }

    if new_size == 0 {
      unsafe { self.release(address) };
      return Ok(None);
    }

    unsafe {
      let block = Block::from_payload(address);
      let old_size = (*block).size;

      if old_size >= new_size {
        log::trace!("resize({:?}, {}) fits in {} bytes", address, new_size, old_size);
        return Ok(NonNull::new(address));
      }

      let rounded = align::payload_size(new_size).ok_or(AllocError::SizeOverflow)?;
      if self.free.grow_in_place(block, rounded) {
        log::trace!("resize({:?}, {}) in place", address, new_size);
        return Ok(NonNull::new(address));
      }

      let moved = self.allocate(new_size)?;
      ptr::copy_nonoverlapping(address, moved.as_ptr(), old_size);
      self.release(address);

      log::trace!("resize({:?}, {}) moved to {:?}", address, new_size, moved);
      Ok(Some(moved))
    }
  }

  /// Appends a new used block of `size` payload bytes at the end of the
  /// region.
  fn grow(
    &mut self,
    size: usize,
  ) -> Result<*mut Block, AllocError> {
    let total = size.checked_add(HEADER_SIZE).ok_or(AllocError::SizeOverflow)?;

    if self.heap_start.is_null() {
      self.establish_start()?;
    }

    if let Some(limit) = self.config.limit() {
      if self.heap_size().saturating_add(total) > limit {
        log::warn!("heap limit of {} bytes reached, refusing {} more", limit, total);
        return Err(AllocError::OutOfMemory { requested: total });
      }
    }

    let Some(address) = self.region.extend(total) else {
      log::warn!("region refused to grow by {} bytes", total);
      return Err(AllocError::OutOfMemory { requested: total });
    };

    log::debug!("region grew by {} bytes at {:?}", total, address);
    Ok(unsafe { Block::init(address.as_ptr(), size, true) })
  }

  /// Fixes `heap_start` at the first word boundary at or past the region end,
  /// padding the region once if it does not start on one.
  fn establish_start(&mut self) -> Result<(), AllocError> {
    let end = self.region.end();
    let padding = crate::align!(end as usize) - end as usize;

    if padding > 0 && self.region.extend(padding).is_none() {
      return Err(AllocError::OutOfMemory { requested: padding });
    }

    self.heap_start = unsafe { end.add(padding) };
    debug_assert_eq!(self.heap_start as usize % WORD, 0);
    log::debug!("heap starts at {:?}", self.heap_start);
    Ok(())
  }
}
