use std::io::Read;

use libc::sbrk;
use rfreelist::{Arena, FreeListAllocator, HeapStats, Region, Sbrk};

/// Waits until the user presses ENTER when the demo runs with `--step`.
/// Useful for inspecting the process with `pmap` or `gdb` between stages.
fn pause(step: bool) {
  if step {
    println!("\n>>> Press ENTER to continue...");
    let _ = std::io::stdin().bytes().next();
  }
}

/// Prints the current program break using `sbrk(0)`.
fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    unsafe { sbrk(0) },
  );
}

/// Prints the free list. Unlike a heap walk this only follows our own
/// headers, so it stays valid when `malloc` moves the break as well.
fn print_free_list<R: Region>(allocator: &FreeListAllocator<R>) {
  for block in allocator.free_blocks() {
    println!("    free block at {:#x}: {} bytes", block.address, block.size);
  }
}

fn print_stats(stats: HeapStats) {
  println!(
    "    heap = {} bytes, {} blocks ({} used / {} free), largest free = {}",
    stats.heap_bytes, stats.blocks, stats.used_blocks, stats.free_blocks, stats.largest_free
  );
}

fn main() {
  env_logger::init();
  let step = std::env::args().any(|arg| arg == "--step");

  let mut allocator = FreeListAllocator::<Sbrk>::sbrk();

  print_program_break("start");
  pause(step);

  // --------------------------------------------------------------------
  // 1) Allocate a u32 and a 12 byte buffer.
  // --------------------------------------------------------------------
  let first = allocator.allocate(4).expect("allocate u32").as_ptr();
  let second = allocator.allocate(12).expect("allocate [u8; 12]").as_ptr();

  unsafe {
    (first as *mut u32).write(0xDEADBEEF);
    second.write_bytes(0xAB, 12);
    println!("\n[1] first = {:?} (0x{:X}), second = {:?}", first, (first as *mut u32).read(), second);
  }
  pause(step);

  // --------------------------------------------------------------------
  // 2) Release the first block and allocate 2 bytes. First fit hands the
  //    same block back.
  // --------------------------------------------------------------------
  unsafe { allocator.release(first) };
  let third = allocator.allocate(2).expect("allocate [u8; 2]").as_ptr();
  println!("\n[2] reused freed block? {}", third == first);
  print_free_list(&allocator);
  pause(step);

  // --------------------------------------------------------------------
  // 3) Allocate 1000 bytes, release them and carve two smaller blocks out
  //    of the hole. The break stays put.
  // --------------------------------------------------------------------
  let big = allocator.allocate(1000).expect("allocate 1000 bytes").as_ptr();
  unsafe { allocator.release(big) };
  print_program_break("after release");

  let small = allocator.allocate(10).expect("allocate 10 bytes").as_ptr();
  let medium = allocator.allocate(900).expect("allocate 900 bytes").as_ptr();
  println!("\n[3] split 1000 bytes into {:?} and {:?}", small, medium);
  print_program_break("after split");
  print_free_list(&allocator);
  pause(step);

  // --------------------------------------------------------------------
  // 4) Grow the 10 byte block. Its neighbour is in use, so it moves.
  // --------------------------------------------------------------------
  unsafe {
    small.write_bytes(0x11, 10);
    let moved = allocator
      .resize(small, 64 * 1024)
      .expect("resize to 64 KiB")
      .expect("non-zero resize returns a block");
    println!("\n[4] resize moved {:?} -> {:?}, first byte = 0x{:X}", small, moved, *moved.as_ptr());
  }
  print_program_break("after large resize");
  print_free_list(&allocator);
  pause(step);

  // --------------------------------------------------------------------
  // 5) Replay the split on an arena. Nothing else touches it, so the full
  //    heap walk and the invariant check are meaningful here.
  // --------------------------------------------------------------------
  let mut arena = FreeListAllocator::new(Arena::with_capacity(4096));
  let big = arena.allocate(1000).expect("allocate 1000 bytes").as_ptr();
  unsafe { arena.release(big) };
  arena.allocate(10).expect("allocate 10 bytes");
  arena.allocate(900).expect("allocate 900 bytes");

  println!("\n[5] arena heap after the split");
  print_stats(arena.stats());
  match arena.verify() {
    Ok(()) => println!("    heap invariants hold"),
    Err(error) => println!("    heap check failed: {error}"),
  }

  // The OS reclaims the data segment when the process exits.
}
