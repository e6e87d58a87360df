/// A memory-mapped host port.
///
/// Ports are identified by their distance from the top of the address space,
/// so `Halt` is `M - 1` whatever the modulus is. When a port is used as the `A`
/// operand the machine acts as if `mem[A] = 0`, so the jump to `C` is always
/// taken.
#[repr(u64)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Port {
  /// Ends execution.
  ///
  /// | Operand | Effect                 | Assembly    |
  /// |---------|------------------------|-------------|
  /// | `A`     | `state ← Completed`    | `0-1 0 0`   |
  Halt = 1,

  /// Writes the low byte of `mem[B]` to stdout.
  ///
  /// | Operand | Effect                 | Assembly       |
  /// |---------|------------------------|----------------|
  /// | `A`     | `stdout ← mem[B] & 255`| `0-2 chr ?+1`  |
  Stdout = 2,

  /// Reads the next byte of stdin, or 0 once input is exhausted.
  ///
  /// | Operand | Effect                 | Assembly       |
  /// |---------|------------------------|----------------|
  /// | `B`     | `mem[A] -= stdin`      | `tmp 0-3 ?+1`  |
  Stdin = 3,

  /// Reads the timer frequency: `2^32` ticks per second.
  ///
  /// | Operand | Effect                 | Assembly       |
  /// |---------|------------------------|----------------|
  /// | `B`     | `mem[A] -= 2^32`       | `tmp 0-4 ?+1`  |
  Frequency = 4,

  /// Reads the wall clock as seconds since 1970 in 32.32 fixed point.
  ///
  /// | Operand | Effect                 | Assembly       |
  /// |---------|------------------------|----------------|
  /// | `B`     | `mem[A] -= time × 2^32`| `tmp 0-5 ?+1`  |
  Clock = 5,

  /// Sleeps for `mem[B] / 2^32` seconds.
  ///
  /// | Operand | Effect                 | Assembly       |
  /// |---------|------------------------|----------------|
  /// | `A`     | `sleep(mem[B] / freq)` | `0-6 dur ?+1`  |
  Sleep = 6,

  /// Hands the frame described at `mem[B]` (`[width, height, pixels]`) to the
  /// host's display.
  ///
  /// | Operand | Effect                 | Assembly       |
  /// |---------|------------------------|----------------|
  /// | `A`     | `draw(mem[B])`         | `0-7 img ?+1`  |
  Draw = 7,
}

impl Port {
  /// Number of ports with a defined role
  pub const COUNT: u64 = 7;

  /// Distance of this port from the top of the address space
  pub const fn offset(self) -> u64 {
    self as u64
  }

  /// Whether the port is read through the `B` operand
  pub const fn is_input(self) -> bool {
    matches!(self, Self::Stdin | Self::Frequency | Self::Clock)
  }
}

impl TryFrom<u64> for Port {
  type Error = u64;

  fn try_from(offset: u64) -> Result<Self, Self::Error> {
    match offset {
      1 => Ok(Self::Halt),
      2 => Ok(Self::Stdout),
      3 => Ok(Self::Stdin),
      4 => Ok(Self::Frequency),
      5 => Ok(Self::Clock),
      6 => Ok(Self::Sleep),
      7 => Ok(Self::Draw),
      other => Err(other),
    }
  }
}
