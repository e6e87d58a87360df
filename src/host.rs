use std::collections::VecDeque;
use std::io::{self, BufWriter, Read, Stdout, Write};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::frame::{Frame, Image};

/// What the host wants after being polled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
  Continue,
  /// Stop the program as if it had halted
  Quit,
}

/// The outside world, as seen through the I/O ports.
///
/// The machine calls into the host whenever a program touches a port, and
/// calls [`Host::poll`] every few million instructions (and right after a
/// frame is drawn) so a windowed host can pump its events.
pub trait Host {
  /// Next byte of input, or `None` once input is exhausted
  fn read_byte(&mut self) -> Option<u8>;

  fn write_byte(&mut self, byte: u8);

  /// Wall-clock time since the UNIX epoch
  fn now(&mut self) -> Duration {
    SystemTime::now()
      .duration_since(UNIX_EPOCH)
      .unwrap_or_default()
  }

  fn sleep(&mut self, duration: Duration) {
    thread::sleep(duration);
  }

  fn draw(&mut self, frame: &Frame<'_>) {
    log::debug!("dropping {}x{} frame", frame.width(), frame.height());
  }

  fn poll(&mut self) -> Poll {
    Poll::Continue
  }
}

/// A host wired to the process's stdin and stdout.
///
/// Output is buffered and flushed on newlines, before blocking on input, and
/// before sleeping. There is no display, so frames are logged and dropped.
#[derive(Debug)]
pub struct StdHost {
  stdout: BufWriter<Stdout>,
}

impl StdHost {
  pub fn new() -> Self {
    Self {
      stdout: BufWriter::new(io::stdout()),
    }
  }

  pub fn flush(&mut self) {
    if let Err(err) = self.stdout.flush() {
      log::warn!("failed to flush stdout: {err}");
    }
  }
}

impl Default for StdHost {
  fn default() -> Self {
    Self::new()
  }
}

impl Host for StdHost {
  fn read_byte(&mut self) -> Option<u8> {
    self.flush();
    read_one(&mut io::stdin().lock())
  }

  fn write_byte(&mut self, byte: u8) {
    if let Err(err) = self.stdout.write_all(&[byte]) {
      log::warn!("failed to write stdout: {err}");
      return;
    }
    if byte == b'\n' {
      self.flush();
    }
  }

  fn sleep(&mut self, duration: Duration) {
    self.flush();
    thread::sleep(duration);
  }
}

// one byte, retrying interrupted reads; errors end the input
fn read_one(reader: &mut impl Read) -> Option<u8> {
  let mut byte = [0u8; 1];
  loop {
    return match reader.read(&mut byte) {
      Ok(1) => Some(byte[0]),
      Ok(_) => None,
      Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
      Err(err) => {
        log::warn!("failed to read stdin: {err}");
        None
      }
    };
  }
}

/// Frames with more pixels than this are counted but not copied by
/// [`BufferHost`]
pub const MAX_IMAGE_PIXELS: usize = 1 << 22;

/// An in-memory host with scripted input and a fake clock.
///
/// Sleeping advances the clock instead of blocking, so timing-dependent
/// programs run instantly and deterministically. Drawn frames are copied out
/// as [`Image`]s.
#[derive(Debug, Clone, Default)]
pub struct BufferHost {
  input: VecDeque<u8>,
  output: Vec<u8>,
  clock: Duration,
  sleeps: Vec<Duration>,
  frames: Vec<Image>,
  skipped_frames: usize,
  polls: usize,
  quit_after: Option<usize>,
}

impl BufferHost {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_input(mut self, input: impl AsRef<[u8]>) -> Self {
    self.input.extend(input.as_ref());
    self
  }

  pub fn with_clock(mut self, clock: Duration) -> Self {
    self.clock = clock;
    self
  }

  /// Answer [`Poll::Quit`] from the `polls`-th poll on
  pub fn quit_after(mut self, polls: usize) -> Self {
    self.quit_after = Some(polls);
    self
  }

  pub fn output(&self) -> &[u8] {
    &self.output
  }

  pub fn output_lossy(&self) -> String {
    String::from_utf8_lossy(&self.output).into_owned()
  }

  pub fn sleeps(&self) -> &[Duration] {
    &self.sleeps
  }

  pub fn frames(&self) -> &[Image] {
    &self.frames
  }

  /// Frames drawn but too large to copy
  pub fn skipped_frames(&self) -> usize {
    self.skipped_frames
  }

  pub fn polls(&self) -> usize {
    self.polls
  }
}

impl Host for BufferHost {
  fn read_byte(&mut self) -> Option<u8> {
    self.input.pop_front()
  }

  fn write_byte(&mut self, byte: u8) {
    self.output.push(byte);
  }

  fn now(&mut self) -> Duration {
    self.clock
  }

  fn sleep(&mut self, duration: Duration) {
    self.clock += duration;
    self.sleeps.push(duration);
  }

  fn draw(&mut self, frame: &Frame<'_>) {
    match frame.to_image(MAX_IMAGE_PIXELS) {
      Some(image) => self.frames.push(image),
      None => {
        log::warn!("not copying {}x{} frame", frame.width(), frame.height());
        self.skipped_frames += 1;
      }
    }
  }

  fn poll(&mut self) -> Poll {
    self.polls += 1;
    match self.quit_after {
      Some(limit) if self.polls >= limit => Poll::Quit,
      _ => Poll::Continue,
    }
  }
}
