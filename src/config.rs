/// Tunables for a [`FreeListAllocator`](crate::FreeListAllocator).
///
/// ```rust
/// use rfreelist::Config;
///
/// let config = Config::default().heap_limit(64 * 1024).poison(0xAA);
/// assert_eq!(config.limit(), Some(64 * 1024));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
  heap_limit: Option<usize>,
  poison: Option<u8>,
}

impl Config {
  pub fn new() -> Self {
    Self::default()
  }

  /// Caps the number of bytes the allocator may obtain from its region,
  /// headers included. The one-off padding that aligns the heap start does
  /// not count.
  pub fn heap_limit(
    mut self,
    bytes: usize,
  ) -> Self {
    self.heap_limit = Some(bytes);
    self
  }

  /// Fills every released payload with `byte`, which makes reads through
  /// stale pointers easy to spot.
  pub fn poison(
    mut self,
    byte: u8,
  ) -> Self {
    self.poison = Some(byte);
    self
  }

  pub fn limit(&self) -> Option<usize> {
    self.heap_limit
  }

  pub fn poison_byte(&self) -> Option<u8> {
    self.poison
  }
}
