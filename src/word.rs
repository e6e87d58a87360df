use std::fmt;

/// A single machine word, always kept below the active [`Modulus`]
pub type Word = u64;

/// The size of the word space.
///
/// The zero value is reserved as the "native" sentinel: words use the full
/// 64-bit width and every operation simply wraps. Any other value `m` keeps
/// words in `[0, m)`, which lets hand-written library routines be checked
/// exhaustively at tiny word sizes.
///
/// Every helper below branches on the sentinel explicitly. `m - b` and friends
/// are only meaningful for a finite modulus, and a native modulus of zero would
/// silently turn them into nonsense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modulus(u64);

impl Modulus {
  /// Full 64-bit wraparound.
  pub const NATIVE: Self = Self(0);

  /// Create a modulus, where `0` means [`Modulus::NATIVE`]
  pub const fn new(m: u64) -> Self {
    Self(m)
  }

  /// The raw modulus, `0` when native
  pub const fn get(self) -> u64 {
    self.0
  }

  pub const fn is_native(self) -> bool {
    self.0 == 0
  }

  /// Whether `x` is a valid word under this modulus
  pub const fn contains(self, x: u64) -> bool {
    self.is_native() || x < self.0
  }

  /// Reduce an arbitrary integer into the word space.
  pub const fn reduce(self, x: u64) -> Word {
    if self.is_native() {
      x
    } else {
      x % self.0
    }
  }

  /// `(a + b) mod M`
  pub fn add(self, a: Word, b: Word) -> Word {
    debug_assert!(self.contains(a) && self.contains(b));
    if self.is_native() {
      return a.wrapping_add(b);
    }
    let m = self.0;
    // a + b >= m  <=>  a >= m - b, without overflowing
    if b != 0 && a >= m - b {
      a - (m - b)
    } else {
      a + b
    }
  }

  /// `(a - b) mod M`
  pub fn sub(self, a: Word, b: Word) -> Word {
    debug_assert!(self.contains(a) && self.contains(b));
    if self.is_native() {
      return a.wrapping_sub(b);
    }
    if a < b {
      a + (self.0 - b)
    } else {
      a - b
    }
  }

  /// `-a mod M`
  pub fn neg(self, a: Word) -> Word {
    debug_assert!(self.contains(a));
    if self.is_native() {
      return a.wrapping_neg();
    }
    if a == 0 {
      0
    } else {
      self.0 - a
    }
  }

  /// `(a * b) mod M`
  pub fn mul(self, a: Word, b: Word) -> Word {
    debug_assert!(self.contains(a) && self.contains(b));
    if self.is_native() {
      return a.wrapping_mul(b);
    }
    ((a as u128 * b as u128) % self.0 as u128) as Word
  }

  /// The first of the top `ports` addresses, `M - ports`.
  pub fn io_start(self, ports: u64) -> Word {
    if self.is_native() {
      0u64.wrapping_sub(ports)
    } else {
      self.0.saturating_sub(ports)
    }
  }

  /// How far `addr` sits below the top of the address space, `M - addr`.
  ///
  /// Zero maps to zero, which never names a port.
  pub fn distance_from_top(self, addr: Word) -> u64 {
    self.neg(addr)
  }
}

impl fmt::Display for Modulus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.is_native() {
      write!(f, "2^64")
    } else {
      write!(f, "{}", self.0)
    }
  }
}
