/// A small, caller-owned pseudo-random generator.
///
/// A counter stepped by a large odd constant and passed through an integer
/// hash. Good enough to shuffle test inputs and pick random instruction
/// budgets, and reproducible from its seed.
#[derive(Debug, Clone)]
pub struct Rng {
  state: u64,
}

const STEP: u64 = 0x9464_b849_fa90_1cd9;

impl Rng {
  pub fn new(seed: u64) -> Self {
    Self { state: seed }
  }

  pub fn next_u64(&mut self) -> u64 {
    self.state = self.state.wrapping_add(STEP);
    hash(self.state)
  }

  pub fn next_u32(&mut self) -> u32 {
    self.next_u64() as u32
  }

  /// A value in `[0, n)`, or 0 if `n` is 0
  pub fn below(&mut self, n: u64) -> u64 {
    ((self.next_u64() as u128 * n as u128) >> 64) as u64
  }

  /// Fisher-Yates shuffle
  pub fn shuffle<T>(&mut self, items: &mut [T]) {
    for i in 1..items.len() {
      let j = self.below(i as u64 + 1) as usize;
      items.swap(i, j);
    }
  }
}

fn hash(mut h: u64) -> u64 {
  h ^= 0x0add_415f_3976_9dbf;
  h = h.wrapping_add(h << 21);
  h ^= h >> 44;
  h = h.wrapping_add(h << 18);
  h ^= h >> 30;
  h = h.wrapping_add(h << 25);
  h ^= h >> 33;
  h = h.wrapping_add(h << 40);
  h ^= h >> 5;
  h = h.wrapping_add(h << 10);
  h ^= h >> 16;
  h
}
