//! Read-only views over an allocator's heap: the block walk, the free list,
//! summary statistics and an invariant check.
//!
//! The walk steps from `heap_start` to the region end one header plus one
//! payload at a time, so it is only meaningful while the allocator is the
//! sole user of its region. An [`Arena`](crate::Arena) always is; the program
//! break is only if nothing else in the process calls `sbrk`.

use std::collections::HashSet;

use crate::{
  allocator::FreeListAllocator,
  block::{Block, HEADER_SIZE},
  error::HeapError,
  freelist,
  region::Region,
};

/// Snapshot of one block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  /// Address of the header.
  pub address: usize,
  /// Payload bytes owned by the block.
  pub size: usize,
  pub used: bool,
}

impl BlockInfo {
  unsafe fn read(block: *mut Block) -> Self {
    unsafe {
      Self {
        address: block as usize,
        size: (*block).size,
        used: (*block).used,
      }
    }
  }

  /// Address handed out to (or reclaimed from) the caller.
  pub fn payload(&self) -> usize {
    self.address + HEADER_SIZE
  }

  /// Address right after the payload.
  pub fn end(&self) -> usize {
    self.payload() + self.size
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
  pub heap_bytes: usize,
  pub blocks: usize,
  pub used_blocks: usize,
  pub used_bytes: usize,
  pub free_blocks: usize,
  pub free_bytes: usize,
  pub largest_free: usize,
}

/// Every block in address order.
pub struct Blocks {
  current: *mut u8,
  end: *mut u8,
}

impl Iterator for Blocks {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<Self::Item> {
    if self.current.is_null() || self.current >= self.end {
      return None;
    }

    unsafe {
      let block = self.current.cast::<Block>();
      self.current = Block::end(block);
      Some(BlockInfo::read(block))
    }
  }
}

/// Free blocks in list order.
pub struct FreeBlocks(freelist::Iter);

impl Iterator for FreeBlocks {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<Self::Item> {
    self.0.next().map(|block| unsafe { BlockInfo::read(block) })
  }
}

impl<R: Region> FreeListAllocator<R> {
  pub fn blocks(&self) -> Blocks {
    Blocks {
      current: self.heap_start(),
      end: self.heap_end(),
    }
  }

  pub fn free_blocks(&self) -> FreeBlocks {
    FreeBlocks(self.free_list().iter())
  }

  pub fn stats(&self) -> HeapStats {
    let mut stats = HeapStats {
      heap_bytes: self.heap_size(),
      ..HeapStats::default()
    };

    for block in self.blocks() {
      stats.blocks += 1;
      if block.used {
        stats.used_blocks += 1;
        stats.used_bytes += block.size;
      } else {
        stats.free_blocks += 1;
        stats.free_bytes += block.size;
        stats.largest_free = stats.largest_free.max(block.size);
      }
    }

    stats
  }

  /// Checks that the blocks tile the heap exactly and that the free list
  /// holds exactly the free blocks, in ascending order, none of them
  /// touching the next.
  pub fn verify(&self) -> Result<(), HeapError> {
    let end = self.heap_end() as usize;
    let mut cursor = self.heap_start() as usize;
    let mut free = HashSet::new();

    if cursor != 0 {
      for block in self.blocks() {
        if !block.used {
          free.insert(block.address);
        }
        cursor = block.end();
      }

      if cursor != end {
        return Err(HeapError::BrokenWalk { found: cursor, end });
      }
    }

    let mut listed = 0;
    let mut previous: Option<BlockInfo> = None;

    for block in self.free_blocks() {
      if block.used {
        return Err(HeapError::UsedInFreeList(block.address));
      }
      if let Some(previous) = previous {
        if previous.address >= block.address {
          return Err(HeapError::Unordered(block.address));
        }
        if previous.end() == block.address {
          return Err(HeapError::Uncoalesced(previous.address, block.address));
        }
      }
      if !free.contains(&block.address) {
        return Err(HeapError::Membership {
          listed: listed + 1,
          free: free.len(),
        });
      }

      listed += 1;
      previous = Some(block);
    }

    if listed != free.len() {
      return Err(HeapError::Membership {
        listed,
        free: free.len(),
      });
    }

    Ok(())
  }
}
