use std::mem;

use crate::error::MemoryError;
use crate::port::Port;
use crate::word::{Modulus, Word};

/// Conceptually infinite, zero-initialised memory.
///
/// Only a dense prefix `[0, capacity)` is backed by storage. Reads past it
/// yield 0 and writing 0 past it does nothing, so programs can scatter data
/// across the address space without paying for the gaps. The top of the
/// address space, `[io_start, M)`, is the I/O band and is never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
  cells: Vec<Word>,
  modulus: Modulus,
  io_start: Word,
}

impl Memory {
  /// Create an empty memory whose top `io_ports` addresses are reserved
  pub fn new(modulus: Modulus, io_ports: u64) -> Self {
    Self {
      cells: Vec::new(),
      modulus,
      io_start: modulus.io_start(io_ports),
    }
  }

  pub fn modulus(&self) -> Modulus {
    self.modulus
  }

  /// First address of the I/O band
  pub fn io_start(&self) -> Word {
    self.io_start
  }

  /// Number of addresses currently backed by storage
  pub fn capacity(&self) -> Word {
    self.cells.len() as Word
  }

  /// The backed prefix of memory
  pub fn as_slice(&self) -> &[Word] {
    &self.cells
  }

  /// Whether `addr` lies in the I/O band
  pub fn is_special(&self, addr: Word) -> bool {
    addr >= self.io_start
  }

  /// The port at `addr`, if `addr` is in the I/O band and has a role
  pub fn port(&self, addr: Word) -> Option<Port> {
    if !self.is_special(addr) {
      return None;
    }
    Port::try_from(self.modulus.distance_from_top(addr)).ok()
  }

  pub fn read(&self, addr: Word) -> Word {
    usize::try_from(addr)
      .ok()
      .and_then(|idx| self.cells.get(idx))
      .copied()
      .unwrap_or(0)
  }

  /// Store `value` at the normal address `addr`, growing storage if needed.
  pub fn write(&mut self, addr: Word, value: Word) -> Result<(), MemoryError> {
    debug_assert!(self.modulus.contains(value));
    debug_assert!(!self.is_special(addr));
    if addr >= self.capacity() {
      if value == 0 {
        return Ok(());
      }
      self.grow(addr)?;
    }
    // grow guarantees addr < capacity <= usize::MAX
    self.cells[addr as usize] = value;
    Ok(())
  }

  /// Drop all storage.
  pub fn clear(&mut self) {
    self.cells = Vec::new();
  }

  // doubles from 1 until `addr` fits, capped by what a Vec can address and by
  // the start of the I/O band
  fn grow(&mut self, addr: Word) -> Result<(), MemoryError> {
    let mut alloc: u64 = 1;
    while alloc != 0 && alloc <= addr {
      alloc = alloc.wrapping_add(alloc);
    }
    if alloc == 0 {
      alloc = u64::MAX;
    }
    let platform = (isize::MAX as usize / mem::size_of::<Word>()) as u64;
    let alloc = alloc.min(platform).min(self.io_start);
    if alloc <= addr {
      return Err(MemoryError { addr });
    }
    let alloc = alloc as usize;
    self
      .cells
      .try_reserve_exact(alloc - self.cells.len())
      .map_err(|_| MemoryError { addr })?;
    self.cells.resize(alloc, 0);
    Ok(())
  }
}
