/// Rounds `value` up to the next multiple of the machine word.
///
/// Block headers are themselves a whole number of words, so rounding every
/// payload keeps every header that follows it word aligned.
///
/// # Examples
///
/// ```rust
/// use rfreelist::align;
///
/// match std::mem::size_of::<usize>() {
///     8 => assert_eq!(align!(13), 16), // 64 bit machine.
///     4 => assert_eq!(align!(11), 12), // 32 bit machine.
///     _ => {},
/// };
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + ::core::mem::size_of::<usize>() - 1) & !(::core::mem::size_of::<usize>() - 1)
  };
}

/// Word-rounded payload size for a request, or `None` if rounding overflows.
/// Zero-byte requests still get one word so every block owns some payload.
#[inline]
pub(crate) fn payload_size(request: usize) -> Option<usize> {
  let request = request.max(1);
  request.checked_add(WORD - 1)?;
  Some(align!(request))
}

pub(crate) const WORD: usize = core::mem::size_of::<usize>();
