use proptest::prelude::*;
use rfreelist::{AllocError, Arena, Config, FreeListAllocator};

#[derive(Debug, Clone)]
enum Op {
  Allocate(usize),
  ZeroAllocate(usize, usize),
  Release(usize),
  Resize(usize, usize),
}

fn op() -> impl Strategy<Value = Op> {
  prop_oneof![
    4 => (0usize..600).prop_map(Op::Allocate),
    1 => (0usize..16, 0usize..40).prop_map(|(count, size)| Op::ZeroAllocate(count, size)),
    3 => any::<usize>().prop_map(Op::Release),
    2 => (any::<usize>(), 0usize..1200).prop_map(|(index, size)| Op::Resize(index, size)),
  ]
}

/// A live payload together with the bytes the test wrote into it.
struct Live {
  ptr: *mut u8,
  size: usize,
  tag: u8,
}

impl Live {
  fn fill(&self) {
    unsafe { self.ptr.write_bytes(self.tag, self.size) };
  }

  fn intact(&self) -> bool {
    unsafe { std::slice::from_raw_parts(self.ptr, self.size) }
      .iter()
      .all(|&byte| byte == self.tag)
  }
}

fn check(
  allocator: &FreeListAllocator<Arena>,
  live: &[Live],
) -> Result<(), TestCaseError> {
  prop_assert_eq!(allocator.verify(), Ok(()));

  let mut ranges: Vec<(usize, usize)> = live
    .iter()
    .map(|entry| (entry.ptr as usize, entry.ptr as usize + entry.size))
    .collect();
  ranges.sort_unstable();
  for pair in ranges.windows(2) {
    prop_assert!(pair[0].1 <= pair[1].0, "overlapping payloads {:?}", pair);
  }

  for entry in live {
    prop_assert!(entry.intact(), "payload at {:?} was clobbered", entry.ptr);
  }

  let stats = allocator.stats();
  prop_assert_eq!(stats.used_blocks, live.len());
  prop_assert_eq!(stats.free_blocks, allocator.free_blocks().count());

  Ok(())
}

proptest! {
  #![proptest_config(ProptestConfig::with_cases(128))]

  #[test]
  fn prop_random_operations_keep_heap_consistent(ops in prop::collection::vec(op(), 1..80)) {
    let config = Config::default().poison(0xDD);
    let mut allocator = FreeListAllocator::with_config(Arena::with_capacity(256 * 1024), config);
    let mut live: Vec<Live> = Vec::new();
    let mut next_tag: u8 = 0;

    for op in ops {
      next_tag = next_tag.wrapping_add(1).max(1);

      match op {
        Op::Allocate(size) => {
          let ptr = allocator.allocate(size).unwrap().as_ptr();
          let entry = Live { ptr, size, tag: next_tag };
          entry.fill();
          live.push(entry);
        }
        Op::ZeroAllocate(count, size) => {
          let ptr = allocator.zero_allocate(count, size).unwrap().as_ptr();
          let entry = Live { ptr, size: count * size, tag: 0 };
          prop_assert!(entry.intact());
          live.push(entry);
        }
        Op::Release(index) => {
          if live.is_empty() {
            continue;
          }
          let entry = live.swap_remove(index % live.len());
          unsafe {
            allocator.release(entry.ptr);
            allocator.release(entry.ptr);
          }
        }
        Op::Resize(index, size) => {
          if live.is_empty() {
            continue;
          }
          let index = index % live.len();
          let old = &live[index];
          let kept = old.size.min(size);
          let tag = old.tag;

          match unsafe { allocator.resize(old.ptr, size) }.unwrap() {
            None => {
              prop_assert_eq!(size, 0);
              live.swap_remove(index);
            }
            Some(ptr) => {
              let ptr = ptr.as_ptr();
              let preserved = unsafe { std::slice::from_raw_parts(ptr, kept) };
              prop_assert!(preserved.iter().all(|&byte| byte == tag));

              let entry = Live { ptr, size, tag: next_tag };
              entry.fill();
              live[index] = entry;
            }
          }
        }
      }

      check(&allocator, &live)?;
    }
  }

  #[test]
  fn prop_reallocating_same_sizes_does_not_grow(sizes in prop::collection::vec(0usize..2048, 1..40)) {
    let mut allocator = FreeListAllocator::new(Arena::with_capacity(512 * 1024));

    let first: Vec<_> = sizes.iter().map(|&size| allocator.allocate(size).unwrap()).collect();
    let heap = allocator.heap_size();

    for ptr in first {
      unsafe { allocator.release(ptr.as_ptr()) };
    }
    for &size in &sizes {
      allocator.allocate(size).unwrap();
    }

    prop_assert_eq!(allocator.heap_size(), heap);
    prop_assert_eq!(allocator.verify(), Ok(()));
  }

  #[test]
  fn prop_failed_allocation_changes_nothing(sizes in prop::collection::vec(1usize..256, 1..16)) {
    let mut allocator = FreeListAllocator::new(Arena::with_capacity(8 * 1024));

    let ptrs: Vec<_> = sizes.iter().map(|&size| allocator.allocate(size).unwrap()).collect();
    for ptr in ptrs.iter().step_by(2) {
      unsafe { allocator.release(ptr.as_ptr()) };
    }

    let before: Vec<_> = allocator.blocks().collect();
    let result = allocator.allocate(64 * 1024);

    let refused = matches!(result, Err(AllocError::OutOfMemory { .. }));
    prop_assert!(refused, "expected out of memory, got {:?}", result);
    prop_assert_eq!(allocator.blocks().collect::<Vec<_>>(), before);
    prop_assert_eq!(allocator.verify(), Ok(()));
  }
}
