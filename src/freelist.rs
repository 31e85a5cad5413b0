use std::ptr;

use crate::block::{Block, HEADER_SIZE};

/// Intrusive singly linked list threaded through the headers of every unused
/// block, kept in ascending address order.
///
/// ```text
///   head
///    │
///    ▼
///   ┌──────┬──────┐   ┌──────┬──────┐   ┌──────┬──────┬──────┐   ┌──────┐
///   │ Free │ Used │──▶│ Free │ Used │   │ Used │ Used │ Free │──▶ null
///   └──────┴──────┘   └──────┴──────┘   └──────┴──────┴──────┘
///     low addresses ──────────────────────────────▶ high addresses
/// ```
///
/// No two listed blocks are ever back to back in memory: [`FreeList::insert`]
/// merges them as soon as the second one is released.
pub(crate) struct FreeList {
  head: *mut Block,
}

/// Where a released block lands relative to the blocks already listed.
enum Position {
  /// Lower than every listed block.
  BeforeHead,
  /// After `prev` and before `next`.
  Between { prev: *mut Block, next: *mut Block },
  /// Higher than every listed block.
  AfterTail { tail: *mut Block },
}

impl FreeList {
  pub const fn new() -> Self {
    Self {
      head: ptr::null_mut(),
    }
  }

  #[cfg(test)]
  pub fn head(&self) -> *mut Block {
    self.head
  }

  /// Points the link that used to lead to a removed block at `to` instead.
  unsafe fn relink(
    &mut self,
    prev: *mut Block,
    to: *mut Block,
  ) {
    if prev.is_null() {
      self.head = to;
    } else {
      unsafe { (*prev).next_free = to };
    }
  }

  /// First-fit search. Detaches the lowest block able to hold `size` bytes,
  /// splitting off the surplus when it can stand as a block of its own. The
  /// remainder takes the detached block's place in the list, which keeps the
  /// order intact because it sits right after it in memory.
  ///
  /// # Safety
  ///
  /// Every listed header must be valid and `size` must be word rounded.
  pub unsafe fn take_first_fit(
    &mut self,
    size: usize,
  ) -> Option<*mut Block> {
    unsafe {
      let mut prev: *mut Block = ptr::null_mut();
      let mut current = self.head;

      while !current.is_null() {
        if (*current).size >= size {
          let next = (*current).next_free;

          let replacement = match Block::split(current, size) {
            Some(tail) => {
              (*tail).next_free = next;
              tail
            }
            None => next,
          };
          self.relink(prev, replacement);

          (*current).used = true;
          (*current).next_free = ptr::null_mut();
          return Some(current);
        }

        prev = current;
        current = (*current).next_free;
      }

      None
    }
  }

  /// Finds where `block` belongs by address.
  unsafe fn locate(
    &self,
    block: *mut Block,
  ) -> Position {
    unsafe {
      if block < self.head {
        return Position::BeforeHead;
      }

      let mut prev = self.head;
      loop {
        let next = (*prev).next_free;
        if next.is_null() {
          return Position::AfterTail { tail: prev };
        }
        if block < next {
          return Position::Between { prev, next };
        }
        prev = next;
      }
    }
  }

  /// Lists a released block, merging it with whichever listed neighbours
  /// touch it so the list stays maximally coalesced.
  ///
  /// # Safety
  ///
  /// `block` must be a valid header that is not currently listed.
  pub unsafe fn insert(
    &mut self,
    block: *mut Block,
  ) {
    unsafe {
      (*block).used = false;
      (*block).next_free = ptr::null_mut();

      if self.head.is_null() {
        self.head = block;
        return;
      }

      match self.locate(block) {
        Position::BeforeHead => {
          let head = self.head;
          (*block).next_free = head;
          if Block::precedes(block, head) {
            log::debug!("coalesce {:?} with head {:?}", block, head);
            Block::absorb(block, head);
          }
          self.head = block;
        }
        Position::Between { prev, next } => {
          (*block).next_free = next;
          (*prev).next_free = block;
          if Block::precedes(block, next) {
            log::debug!("coalesce {:?} with following {:?}", block, next);
            Block::absorb(block, next);
          }
          if Block::precedes(prev, block) {
            log::debug!("coalesce {:?} into preceding {:?}", block, prev);
            Block::absorb(prev, block);
          }
        }
        Position::AfterTail { tail } => {
          (*tail).next_free = block;
          if Block::precedes(tail, block) {
            log::debug!("coalesce {:?} into tail {:?}", block, tail);
            Block::absorb(tail, block);
          }
        }
      }
    }
  }

  /// Grows the used `block` in place by taking over the free block that
  /// starts right where it ends, if the two together hold `size` bytes. Any
  /// surplus is split back into the list. Returns whether it grew.
  ///
  /// # Safety
  ///
  /// `block` must be a valid used header and `size` must be word rounded.
  pub unsafe fn grow_in_place(
    &mut self,
    block: *mut Block,
    size: usize,
  ) -> bool {
    unsafe {
      let end = Block::end(block);

      let mut prev: *mut Block = ptr::null_mut();
      let mut current = self.head;
      while !current.is_null() && current.cast::<u8>() < end {
        prev = current;
        current = (*current).next_free;
      }

      if current.is_null() || current.cast::<u8>() != end {
        return false;
      }

      let combined = (*block).size + HEADER_SIZE + (*current).size;
      if combined < size {
        return false;
      }

      let next = (*current).next_free;
      (*block).size = combined;

      let replacement = match Block::split(block, size) {
        Some(tail) => {
          (*tail).next_free = next;
          tail
        }
        None => next,
      };
      self.relink(prev, replacement);

      log::debug!("grew {:?} in place to {} bytes", block, (*block).size);
      true
    }
  }

  /// Walks the list front to back.
  pub fn iter(&self) -> Iter {
    Iter {
      current: self.head,
    }
  }
}

pub(crate) struct Iter {
  current: *mut Block,
}

impl Iterator for Iter {
  type Item = *mut Block;

  fn next(&mut self) -> Option<Self::Item> {
    if self.current.is_null() {
      return None;
    }

    let block = self.current;
    self.current = unsafe { (*block).next_free };
    Some(block)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const PAYLOAD: usize = 64;
  const STRIDE: usize = HEADER_SIZE + PAYLOAD;

  /// Lays out `count` used blocks of `PAYLOAD` bytes back to back.
  fn carve(
    memory: &mut [usize],
    count: usize,
  ) -> Vec<*mut Block> {
    let base = memory.as_mut_ptr().cast::<u8>();
    (0..count)
      .map(|i| unsafe { Block::init(base.add(i * STRIDE), PAYLOAD, true) })
      .collect()
  }

  fn listed(list: &FreeList) -> Vec<(*mut Block, usize)> {
    list.iter().map(|block| (block, unsafe { (*block).size })).collect()
  }

  #[test]
  fn test_insert_keeps_address_order() {
    let mut memory = vec![0usize; 256];
    let blocks = carve(&mut memory, 5);
    let mut list = FreeList::new();

    unsafe {
      list.insert(blocks[3]);
      list.insert(blocks[1]);
    }

    assert_eq!(listed(&list), vec![(blocks[1], PAYLOAD), (blocks[3], PAYLOAD)]);
  }

  #[test]
  fn test_insert_before_head_merges() {
    let mut memory = vec![0usize; 256];
    let blocks = carve(&mut memory, 4);
    let mut list = FreeList::new();

    unsafe {
      list.insert(blocks[3]);
      list.insert(blocks[2]);
    }

    assert_eq!(listed(&list), vec![(blocks[2], STRIDE + PAYLOAD)]);
  }

  #[test]
  fn test_insert_between_merges_both_sides() {
    let mut memory = vec![0usize; 256];
    let blocks = carve(&mut memory, 5);
    let mut list = FreeList::new();

    unsafe {
      list.insert(blocks[0]);
      list.insert(blocks[2]);
      list.insert(blocks[4]);
      list.insert(blocks[1]);
    }

    assert_eq!(
      listed(&list),
      vec![(blocks[0], 2 * STRIDE + PAYLOAD), (blocks[4], PAYLOAD)]
    );
  }

  #[test]
  fn test_insert_between_merges_following_only() {
    let mut memory = vec![0usize; 256];
    let blocks = carve(&mut memory, 5);
    let mut list = FreeList::new();

    unsafe {
      list.insert(blocks[0]);
      list.insert(blocks[3]);
      list.insert(blocks[2]);
    }

    assert_eq!(
      listed(&list),
      vec![(blocks[0], PAYLOAD), (blocks[2], STRIDE + PAYLOAD)]
    );
  }

  #[test]
  fn test_insert_between_merges_preceding_only() {
    let mut memory = vec![0usize; 256];
    let blocks = carve(&mut memory, 5);
    let mut list = FreeList::new();

    unsafe {
      list.insert(blocks[0]);
      list.insert(blocks[3]);
      list.insert(blocks[1]);
    }

    assert_eq!(
      listed(&list),
      vec![(blocks[0], STRIDE + PAYLOAD), (blocks[3], PAYLOAD)]
    );
  }

  #[test]
  fn test_insert_after_tail() {
    let mut memory = vec![0usize; 256];
    let blocks = carve(&mut memory, 4);
    let mut list = FreeList::new();

    unsafe {
      list.insert(blocks[0]);
      list.insert(blocks[2]);
      list.insert(blocks[3]);
    }

    assert_eq!(
      listed(&list),
      vec![(blocks[0], PAYLOAD), (blocks[2], STRIDE + PAYLOAD)]
    );
  }

  #[test]
  fn test_first_fit_takes_lowest_match_and_splits() {
    let mut memory = vec![0usize; 256];
    let blocks = carve(&mut memory, 4);
    let mut list = FreeList::new();

    unsafe {
      list.insert(blocks[0]);
      list.insert(blocks[2]);

      let taken = list.take_first_fit(16).unwrap();
      assert_eq!(taken, blocks[0]);
      assert!((*taken).used);
      assert_eq!((*taken).size, 16);
    }

    let remainder = unsafe { Block::payload(blocks[0]).add(16).cast::<Block>() };
    assert_eq!(
      listed(&list),
      vec![(remainder, PAYLOAD - 16 - HEADER_SIZE), (blocks[2], PAYLOAD)]
    );
  }

  #[test]
  fn test_first_fit_unlinks_whole_block() {
    let mut memory = vec![0usize; 256];
    let blocks = carve(&mut memory, 4);
    let mut list = FreeList::new();

    unsafe {
      list.insert(blocks[0]);
      list.insert(blocks[2]);

      assert_eq!(list.take_first_fit(PAYLOAD), Some(blocks[0]));
      assert_eq!(list.take_first_fit(PAYLOAD), Some(blocks[2]));
      assert_eq!(list.take_first_fit(8), None);
    }

    assert!(list.head().is_null());
  }

  #[test]
  fn test_grow_in_place() {
    let mut memory = vec![0usize; 256];
    let blocks = carve(&mut memory, 4);
    let mut list = FreeList::new();

    unsafe {
      list.insert(blocks[1]);
      list.insert(blocks[3]);

      assert!(!list.grow_in_place(blocks[2], 2 * PAYLOAD + HEADER_SIZE + 8));
      assert!(list.grow_in_place(blocks[0], PAYLOAD + 16));
      assert_eq!((*blocks[0]).size, PAYLOAD + 16);
    }

    let remainder = unsafe { Block::payload(blocks[0]).add(PAYLOAD + 16).cast::<Block>() };
    assert_eq!(
      listed(&list),
      vec![(remainder, PAYLOAD - 16), (blocks[3], PAYLOAD)]
    );
  }
}
