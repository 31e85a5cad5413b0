//! # rfreelist - A First-Fit Free-List Allocator
//!
//! This crate provides a **first-fit free-list allocator** that manages a
//! single, ever-growing memory region, by default the process data segment
//! grown with the `sbrk` system call.
//!
//! ## Overview
//!
//! The heap is a sequence of back-to-back blocks. Every block starts with a
//! small header, and the headers of the unused blocks double as the nodes of
//! a singly linked list sorted by address:
//!
//! ```text
//!   heap_start                                                    heap_end
//!   ▼                                                                    ▼
//!   ┌─────┬────────┬─────┬────────┬─────┬────────────┬─────┬────────────┐
//!   │ Hdr │  Used  │ Hdr │  Free  │ Hdr │    Used    │ Hdr │    Free    │
//!   └─────┴────────┴─────┴────────┴─────┴────────────┴─────┴────────────┘
//!                    ▲       │                         ▲
//!                    │       └─────── next_free ───────┘
//!                free_head
//! ```
//!
//! - **allocate** takes the first free block that fits, splitting off the
//!   surplus when it can stand as a block of its own, and grows the region
//!   only when nothing fits.
//! - **release** puts the block back in address order and merges it with any
//!   free neighbour it touches, so no two free blocks are ever adjacent.
//! - **resize** keeps the block when it is already large enough, grows it
//!   into a free block that follows it when possible, and moves it otherwise.
//! - **zero_allocate** is allocate plus zero fill.
//!
//! ## Crate Structure
//!
//! ```text
//!   rfreelist
//!   ├── align      - Word rounding (align!)
//!   ├── block      - Block header layout and address arithmetic (internal)
//!   ├── freelist   - Address-ordered free list (internal)
//!   ├── allocator  - FreeListAllocator and its four operations
//!   ├── inspect    - Heap walk, statistics and invariant checks
//!   ├── region     - Region trait, Sbrk and Arena
//!   ├── config     - Config
//!   └── error      - AllocError and HeapError
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use rfreelist::{Arena, FreeListAllocator};
//!
//! let mut allocator = FreeListAllocator::new(Arena::with_capacity(4096));
//!
//! let ptr = allocator.allocate(8).unwrap().as_ptr() as *mut u64;
//!
//! unsafe {
//!     *ptr = 42;
//!     assert_eq!(*ptr, 42);
//!
//!     allocator.release(ptr as *mut u8);
//! }
//!
//! assert_eq!(allocator.verify(), Ok(()));
//! ```
//!
//! ## Limitations
//!
//! - **Single-threaded only**: No synchronization primitives
//! - **Grow only**: Memory is never handed back to the OS
//! - **Word alignment**: Payloads are aligned to `usize`, nothing more
//!
//! ## Safety
//!
//! Allocation is safe to call. Releasing and resizing take raw pointers and
//! trust them to come from the same allocator, so both are `unsafe`.

pub mod align;
mod allocator;
mod block;
mod config;
mod error;
mod freelist;
mod inspect;
mod region;

pub use allocator::FreeListAllocator;
pub use config::Config;
pub use error::{AllocError, HeapError};
pub use inspect::{BlockInfo, Blocks, FreeBlocks, HeapStats};
#[cfg(unix)]
pub use region::Sbrk;
pub use region::{Arena, Region};

/// Size in bytes of the header in front of every payload.
pub const HEADER_SIZE: usize = block::HEADER_SIZE;
