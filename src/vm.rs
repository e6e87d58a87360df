use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::assembler;
use crate::config::Config;
use crate::error::{Error, MemoryError};
use crate::frame::Frame;
use crate::host::{Host, Poll};
use crate::label::Labels;
use crate::memory::Memory;
use crate::port::Port;
use crate::word::{Modulus, Word};

/// An instruction budget that never runs out
pub const UNBOUNDED: u64 = u64::MAX;

/// Value of the frequency port: one second is 2^32 ticks
pub const FREQUENCY: u64 = 1 << 32;

/// Where the machine is in its life.
///
/// Only `Running` can execute instructions. The others are terminal until the
/// machine is cleared or handed a new program.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
  Completed = 0,
  Running = 1,
  ParseError = 2,
  MemoryError = 3,
}

impl State {
  /// Numeric code, also used as the process exit status
  pub const fn code(self) -> u32 {
    self as u32
  }
}

/// A single instruction computer.
///
/// Every instruction is three words `A B C` read at the instruction pointer:
///
/// ```text
/// IP += 3
/// if mem[A] <= mem[B]: IP = C
/// mem[A] -= mem[B]
/// ```
///
/// Addresses in the I/O band at the top of the address space are
/// [ports](crate::port::Port) serviced by a [`Host`] instead of memory.
#[derive(Debug)]
pub struct Vm {
  ip: Word,
  memory: Memory,
  labels: Labels,
  state: State,
  error: Option<Error>,
  config: Config,
  // instructions executed since the last clear
  instructions: u64,
  // instructions left until the host is polled, kept across runs
  poll_countdown: u64,
}

impl Vm {
  /// Create an empty machine with a 64-bit word and the standard ports
  pub fn new() -> Self {
    Self::from_config(Config::default())
  }

  pub fn with_config(config: Config) -> Result<Self, Error> {
    config.validate()?;
    Ok(Self::from_config(config))
  }

  fn from_config(config: Config) -> Self {
    Self {
      ip: 0,
      memory: Memory::new(config.modulus, config.io_ports),
      labels: Labels::new(),
      state: State::Running,
      error: None,
      config,
      instructions: 0,
      poll_countdown: config.poll_interval,
    }
  }

  /// Reset to an empty, running machine with the same configuration.
  pub fn clear(&mut self) {
    self.ip = 0;
    self.memory.clear();
    self.labels = Labels::new();
    self.state = State::Running;
    self.error = None;
    self.instructions = 0;
    self.poll_countdown = self.config.poll_interval;
  }

  /// Replace the machine's program with `source`.
  pub fn assemble(&mut self, source: impl AsRef<[u8]>) -> State {
    self.clear();
    let result = assembler::assemble(
      source.as_ref(),
      &mut self.memory,
      &mut self.labels,
      &self.config,
    );
    if let Err(err) = result {
      self.fail(err);
    }
    self.state
  }

  /// Read and assemble the source file at `path`.
  pub fn parse_file(&mut self, path: impl AsRef<Path>) -> State {
    let path = path.as_ref();
    match fs::read(path) {
      Ok(source) => self.assemble(source),
      Err(source) => {
        self.clear();
        self.fail(Error::Io {
          path: path.to_path_buf(),
          source,
        });
        self.state
      }
    }
  }

  pub fn state(&self) -> State {
    self.state
  }

  /// The error that stopped the machine, if any
  pub fn error(&self) -> Option<&Error> {
    self.error.as_ref()
  }

  /// Human-readable description of the error, or an empty string
  pub fn status(&self) -> String {
    self
      .error
      .as_ref()
      .map(ToString::to_string)
      .unwrap_or_default()
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn ip(&self) -> Word {
    self.ip
  }

  pub fn set_ip(&mut self, ip: Word) {
    self.ip = self.config.modulus.reduce(ip);
  }

  /// Instructions executed since the machine was last cleared
  pub fn instructions(&self) -> u64 {
    self.instructions
  }

  pub fn memory(&self) -> &Memory {
    &self.memory
  }

  /// The address of a fully qualified label such as `main.loop`
  pub fn find_label(&self, name: &str) -> Option<Word> {
    self.labels.find(name)
  }

  pub fn read(&self, addr: Word) -> Word {
    self.memory.read(self.config.modulus.reduce(addr))
  }

  /// Store `value` at `addr`, as a host poking memory directly would.
  ///
  /// Writes into the I/O band are ignored. A write that needs more memory
  /// than can be allocated moves the machine to [`State::MemoryError`].
  pub fn write(&mut self, addr: Word, value: Word) {
    let m = self.config.modulus;
    let (addr, value) = (m.reduce(addr), m.reduce(value));
    if self.memory.is_special(addr) {
      return;
    }
    if let Err(err) = self.memory.write(addr, value) {
      self.fail(err.into());
    }
  }

  /// Execute a single instruction
  pub fn step<H>(&mut self, host: &mut H) -> State
  where
    H: Host,
  {
    self.run(host, 1)
  }

  /// Execute up to `budget` instructions, stopping early if the machine leaves
  /// the running state. [`UNBOUNDED`] runs until it does.
  pub fn run<H>(&mut self, host: &mut H, budget: u64) -> State
  where
    H: Host,
  {
    if self.state != State::Running {
      return self.state;
    }
    let result = Task::new(self, host).run(budget);
    if let Err(err) = result {
      self.fail(err.into());
    }
    self.state
  }

  fn fail(&mut self, err: Error) {
    self.state = match err {
      Error::Memory(_) => State::MemoryError,
      Error::Parse(_) | Error::Io { .. } | Error::Config(_) => State::ParseError,
    };
    log::debug!("{}", err.to_string().trim_end());
    self.error = Some(err);
  }
}

impl Default for Vm {
  fn default() -> Self {
    Self::new()
  }
}

struct Task<'vm, 'host, H> {
  vm: &'vm mut Vm,
  host: &'host mut H,
}

impl<'vm, 'host, H> Task<'vm, 'host, H>
where
  H: Host,
{
  fn new(vm: &'vm mut Vm, host: &'host mut H) -> Self {
    Self { vm, host }
  }

  fn run(&mut self, budget: u64) -> Result<(), MemoryError> {
    let mut left = budget;
    while self.vm.state == State::Running && left > 0 {
      if budget != UNBOUNDED {
        left -= 1;
      }
      if self.poll() == Poll::Quit {
        log::debug!("host asked to quit");
        self.vm.state = State::Completed;
        break;
      }
      self.vm.instructions += 1;
      self.execute()?;
    }
    Ok(())
  }

  fn poll(&mut self) -> Poll {
    let vm = &mut *self.vm;
    if vm.poll_countdown == 0 {
      vm.poll_countdown = vm.config.poll_interval;
      if self.host.poll() == Poll::Quit {
        return Poll::Quit;
      }
    }
    vm.poll_countdown -= 1;
    Poll::Continue
  }

  #[inline]
  fn fetch(&mut self) -> Word {
    let word = self.vm.memory.read(self.vm.ip);
    self.vm.ip = self.modulus().add(self.vm.ip, 1);
    word
  }

  fn modulus(&self) -> Modulus {
    self.vm.config.modulus
  }

  fn execute(&mut self) -> Result<(), MemoryError> {
    let a = self.fetch();
    let b = self.fetch();
    let c = self.fetch();
    let mb = self.load(b);

    if !self.vm.memory.is_special(a) {
      let ma = self.vm.memory.read(a);
      if ma <= mb {
        self.vm.ip = c;
      }
      let diff = self.modulus().sub(ma, mb);
      return self.vm.memory.write(a, diff);
    }

    // ports act as if mem[A] = 0, so the jump is always taken
    self.vm.ip = c;
    match self.vm.memory.port(a) {
      Some(Port::Halt) => {
        log::trace!("halt");
        self.vm.state = State::Completed;
      }
      Some(Port::Stdout) => {
        log::trace!("stdout <- {mb}");
        self.host.write_byte(mb as u8);
      }
      Some(Port::Sleep) => {
        let duration = sleep_duration(mb);
        log::trace!("sleep {duration:?}");
        self.host.sleep(duration);
      }
      Some(Port::Draw) => {
        match Frame::read(&self.vm.memory, mb) {
          Some(frame) => self.host.draw(&frame),
          None => log::warn!("ignoring oversized frame described at {mb}"),
        }
        // give the host a chance to present it straight away
        self.vm.poll_countdown = 0;
      }
      Some(port) => log::trace!("write to input port {port:?} ignored"),
      None => {}
    }
    Ok(())
  }

  // the value of mem[B], with ports answered by the host
  fn load(&mut self, b: Word) -> Word {
    let m = self.modulus();
    let port = match self.vm.memory.port(b) {
      Some(port) if port.is_input() => port,
      Some(_) => return 0,
      None => return self.vm.memory.read(b),
    };
    let value = match port {
      Port::Stdin => self.host.read_byte().map_or(0, Word::from),
      Port::Frequency => FREQUENCY,
      Port::Clock => clock_ticks(self.host.now()),
      _ => 0,
    };
    log::trace!("{port:?} -> {value}");
    m.reduce(value)
  }
}

// 32.32 fixed-point seconds
fn clock_ticks(time: Duration) -> u64 {
  let frac = (u64::from(time.subsec_nanos()) << 32) / 1_000_000_000;
  (time.as_secs() << 32).wrapping_add(frac)
}

fn sleep_duration(ticks: Word) -> Duration {
  let nanos = ((ticks & 0xffff_ffff) * 1_000_000_000) >> 32;
  Duration::new(ticks >> 32, nanos as u32)
}
