use crate::memory::Memory;
use crate::word::Word;

/// Frames wider or taller than this are ignored
pub const MAX_DIMENSION: Word = 65536;

/// A frame handed to the host by a write to the draw port.
///
/// In memory a frame is described by three words, `[width, height, pixels]`,
/// where `pixels` points at `width * height` row-major pixel words. Each pixel
/// word packs 16-bit alpha, red, green and blue channels, alpha highest.
///
/// The frame borrows the machine's memory and decodes pixels on demand, so a
/// host only pays for what it actually presents.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'mem> {
  memory: &'mem Memory,
  width: usize,
  height: usize,
  pixels: Word,
}

impl<'mem> Frame<'mem> {
  /// View the frame described at `addr`, or `None` if its dimensions are out
  /// of range.
  pub fn read(memory: &'mem Memory, addr: Word) -> Option<Self> {
    let m = memory.modulus();
    let width = memory.read(addr);
    let height = memory.read(m.add(addr, m.reduce(1)));
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
      return None;
    }
    Some(Self {
      memory,
      width: width as usize,
      height: height as usize,
      pixels: memory.read(m.add(addr, m.reduce(2))),
    })
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn height(&self) -> usize {
    self.height
  }

  /// Number of pixels, `width * height`
  pub fn len(&self) -> usize {
    self.width * self.height
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// 8-bit RGB of the pixel at column `x`, row `y`
  pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
    debug_assert!(x < self.width && y < self.height);
    let m = self.memory.modulus();
    let offset = m.reduce(y as Word * self.width as Word + x as Word);
    to_rgb(self.memory.read(m.add(self.pixels, offset)))
  }

  /// Copy the frame out of memory, or `None` if it has more than `max_pixels`
  /// pixels or the copy cannot be allocated.
  pub fn to_image(&self, max_pixels: usize) -> Option<Image> {
    if self.len() > max_pixels {
      return None;
    }
    let mut rgb = Vec::new();
    rgb.try_reserve_exact(self.len() * 3).ok()?;
    for y in 0..self.height {
      for x in 0..self.width {
        rgb.extend(self.pixel(x, y));
      }
    }
    Some(Image {
      width: self.width,
      height: self.height,
      rgb,
    })
  }
}

/// An owned copy of a drawn frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
  width: usize,
  height: usize,
  rgb: Vec<u8>,
}

impl Image {
  pub fn width(&self) -> usize {
    self.width
  }

  pub fn height(&self) -> usize {
    self.height
  }

  /// Packed 8-bit RGB, row-major
  pub fn rgb(&self) -> &[u8] {
    &self.rgb
  }
}

/// Scale the 16-bit colour channels of an ARGB pixel by its alpha and narrow
/// them to 8 bits.
pub fn to_rgb(argb: Word) -> [u8; 3] {
  // c * a * 0x80008001 >> 55 narrows the 32-bit product c * a to 8 bits
  let alpha = argb >> 48;
  let scale = alpha + (alpha << 15) + (alpha << 31);
  let channel = |shift: u32| (((argb >> shift) & 0xffff) * scale >> 55) as u8;
  [channel(32), channel(16), channel(0)]
}
