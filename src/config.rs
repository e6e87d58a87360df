use crate::word::{Modulus, Word};

/// Default number of reserved addresses at the top of the address space
pub const DEFAULT_IO_PORTS: u64 = 7;

/// Sources of this many bytes or more are rejected
pub const DEFAULT_MAX_SOURCE_LEN: usize = 1 << 30;

/// Instructions between two host polls
pub const DEFAULT_POLL_INTERVAL: u64 = 1 << 20;

/// Machine configuration, fixed for the lifetime of a [`Vm`](crate::vm::Vm).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
  pub modulus: Modulus,
  /// Size of the I/O band at the top of the address space
  pub io_ports: u64,
  pub max_source_len: usize,
  pub poll_interval: u64,
}

impl Config {
  pub fn with_modulus(mut self, modulus: Modulus) -> Self {
    self.modulus = modulus;
    self
  }

  pub fn with_io_ports(mut self, io_ports: u64) -> Self {
    self.io_ports = io_ports;
    self
  }

  pub fn with_max_source_len(mut self, max_source_len: usize) -> Self {
    self.max_source_len = max_source_len;
    self
  }

  pub fn with_poll_interval(mut self, poll_interval: u64) -> Self {
    self.poll_interval = poll_interval;
    self
  }

  /// First address of the I/O band
  pub fn io_start(&self) -> Word {
    self.modulus.io_start(self.io_ports)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.io_ports == 0 {
      return Err(ConfigError::NoPorts);
    }
    if !self.modulus.is_native() && self.modulus.get() <= self.io_ports {
      return Err(ConfigError::ModulusTooSmall {
        modulus: self.modulus.get(),
        io_ports: self.io_ports,
      });
    }
    if self.poll_interval == 0 {
      return Err(ConfigError::ZeroPollInterval);
    }
    Ok(())
  }
}

impl Default for Config {
  fn default() -> Self {
    Self {
      modulus: Modulus::NATIVE,
      io_ports: DEFAULT_IO_PORTS,
      max_source_len: DEFAULT_MAX_SOURCE_LEN,
      poll_interval: DEFAULT_POLL_INTERVAL,
    }
  }
}

/// A configuration that cannot describe a working machine
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
  #[error("the I/O band needs at least one port")]
  NoPorts,

  #[error("modulus {modulus} leaves no addresses below {io_ports} I/O ports")]
  ModulusTooSmall { modulus: u64, io_ports: u64 },

  #[error("the host poll interval must be non-zero")]
  ZeroPollInterval,
}
