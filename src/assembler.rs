//! Two-pass assembler for SICO assembly.
//!
//! | Construct          | Syntax                                    |
//! |--------------------|-------------------------------------------|
//! | Line comment       | `# comment`                               |
//! | Block comment      | `#\| comment \|#`                         |
//! | Label declaration  | `label:`                                  |
//! | Label recall       | `label`                                   |
//! | Sub-label          | `label: .sub:` is the same as `label.sub:`|
//! | Current address    | `?`                                       |
//! | Number             | `123` or `0xabc`                          |
//! | ASCII literal      | `'A 'B 'C` evaluates to `65 66 67`        |
//! | Operator           | `+` or `-`, as in `len-txt+1`             |
//!
//! The first pass only binds labels to addresses. The second pass walks the
//! source identically and commits every folded word to memory, by which time
//! forward references have all been bound.

use std::ops::Range;

use crate::config::Config;
use crate::error::{Error, ParseError, ParseErrorKind};
use crate::label::{LabelId, Labels};
use crate::memory::Memory;
use crate::word::{Modulus, Word};

/// Assemble `source` into `memory`, binding its labels in `labels`.
///
/// `memory` and `labels` are expected to be empty. Returns the number of words
/// in the program, which occupy `[0, len)`.
pub fn assemble(
  source: &[u8],
  memory: &mut Memory,
  labels: &mut Labels,
  config: &Config,
) -> Result<Word, Error> {
  if source.len() >= config.max_source_len {
    return Err(ParseError::unlocated(ParseErrorKind::InputTooLong).into());
  }
  Pass::new(source, labels, config, None).run()?;
  let len = Pass::new(source, labels, config, Some(memory)).run()?;
  log::debug!("assembled {len} words, {} label nodes", labels.len());
  Ok(len)
}

/// Whether `byte` may appear in a label name
pub fn is_label_byte(byte: u8) -> bool {
  byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'.' || byte >= 0x80
}

// the operator waiting for its right-hand side, or what the last token left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
  None,
  Add(usize),
  Sub(usize),
  Declared,
}

impl Op {
  fn pending(self) -> Option<usize> {
    match self {
      Op::Add(at) | Op::Sub(at) => Some(at),
      Op::None | Op::Declared => None,
    }
  }
}

struct Pass<'src, 'asm> {
  source: &'src [u8],
  labels: &'asm mut Labels,
  // only the second pass writes
  memory: Option<&'asm mut Memory>,
  modulus: Modulus,
  io_start: Word,
  pos: usize,
  // address the next new word will occupy
  addr: Word,
  // value of the word at `addr - 1`, still open to operators
  acc: Word,
  op: Op,
  scope: LabelId,
}

impl<'src, 'asm> Pass<'src, 'asm> {
  fn new(
    source: &'src [u8],
    labels: &'asm mut Labels,
    config: &Config,
    memory: Option<&'asm mut Memory>,
  ) -> Self {
    Self {
      source,
      labels,
      memory,
      modulus: config.modulus,
      io_start: config.io_start(),
      pos: 0,
      addr: 0,
      acc: 0,
      op: Op::None,
      scope: LabelId::ROOT,
    }
  }

  fn run(mut self) -> Result<Word, Error> {
    while let Some(&byte) = self.source.get(self.pos) {
      let start = self.pos;
      match byte {
        b' ' | b'\t' | b'\r' | b'\n' => self.pos += 1,
        b'#' => self.comment()?,
        b'+' | b'-' => self.operator(byte)?,
        b'0'..=b'9' => {
          let value = self.number();
          self.push(value, start)?;
        }
        b'\'' => {
          let value = self.peek(1).unwrap_or(0);
          self.pos = (self.pos + 2).min(self.source.len());
          self.push(self.modulus.reduce(value as Word), start)?;
        }
        b'?' => {
          let here = self.here();
          self.pos += 1;
          self.push(here, start)?;
        }
        b if is_label_byte(b) => self.label()?,
        _ => return Err(self.error(ParseErrorKind::UnexpectedToken, start..start + 1)),
      }
    }
    if let Some(at) = self.op.pending() {
      let end = self.source.len();
      return Err(self.error(ParseErrorKind::TrailingOperator, at..end));
    }
    self.flush()?;
    Ok(self.addr)
  }

  fn peek(&self, ahead: usize) -> Option<u8> {
    self.source.get(self.pos + ahead).copied()
  }

  fn error(&self, kind: ParseErrorKind, span: Range<usize>) -> Error {
    ParseError::at(kind, self.source, span).into()
  }

  // the address of the word the next value lands in
  fn here(&self) -> Word {
    match self.op {
      Op::Add(_) | Op::Sub(_) => self.addr - 1,
      Op::None | Op::Declared => self.addr,
    }
  }

  fn comment(&mut self) -> Result<(), Error> {
    let start = self.pos;
    if self.peek(1) == Some(b'|') {
      let body = start + 2;
      let end = self.source[body..]
        .windows(2)
        .position(|pair| pair == b"|#")
        .map(|p| body + p + 2);
      match end {
        Some(end) => self.pos = end,
        None => {
          let end = self.source.len();
          return Err(self.error(ParseErrorKind::UnterminatedComment, start..end));
        }
      }
    } else {
      self.pos = self.source[start..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(self.source.len(), |p| start + p);
    }
    Ok(())
  }

  fn operator(&mut self, byte: u8) -> Result<(), Error> {
    let at = self.pos;
    let kind = match self.op {
      Op::Declared => Some(ParseErrorKind::OperatingOnDeclaration),
      Op::Add(_) | Op::Sub(_) => Some(ParseErrorKind::DoubleOperator),
      Op::None if self.addr == 0 => Some(ParseErrorKind::LeadingOperator),
      Op::None => None,
    };
    if let Some(kind) = kind {
      return Err(self.error(kind, at..at + 1));
    }
    self.op = if byte == b'+' { Op::Add(at) } else { Op::Sub(at) };
    self.pos += 1;
    Ok(())
  }

  // decimal, or hexadecimal after 0x; "0x" alone is zero
  fn number(&mut self) -> Word {
    let m = self.modulus;
    let radix = if self.peek(0) == Some(b'0') && matches!(self.peek(1), Some(b'x' | b'X')) {
      self.pos += 2;
      16
    } else {
      10
    };
    let base = m.reduce(radix as Word);
    let mut value = 0;
    while let Some(digit) = self.peek(0).and_then(|b| (b as char).to_digit(radix)) {
      value = m.add(m.mul(value, base), m.reduce(digit as Word));
      self.pos += 1;
    }
    value
  }

  fn label(&mut self) -> Result<(), Error> {
    let start = self.pos;
    let end = self.source[start..]
      .iter()
      .position(|&b| !is_label_byte(b))
      .map_or(self.source.len(), |p| start + p);
    let name = &self.source[start..end];
    let id = self.labels.add(self.scope, name);
    self.pos = end;

    if self.peek(0) != Some(b':') {
      // forward references only need to resolve once every label is bound
      let value = match self.labels.resolve(id) {
        Some(addr) => addr,
        None if self.memory.is_none() => 0,
        None => return Err(self.error(ParseErrorKind::UnknownLabel, start..end)),
      };
      return self.push(value, start);
    }

    self.pos += 1;
    let span = start..self.pos;
    if self.op.pending().is_some() {
      return Err(self.error(ParseErrorKind::OperatingOnDeclaration, span));
    }
    if self.memory.is_none() && self.labels.declare(id, self.addr).is_err() {
      return Err(self.error(ParseErrorKind::DuplicateLabel, span));
    }
    if name[0] != b'.' {
      self.scope = id;
    }
    self.op = Op::Declared;
    Ok(())
  }

  // fold a value into the open word, or start a new one
  fn push(&mut self, value: Word, start: usize) -> Result<(), Error> {
    let m = self.modulus;
    self.acc = match self.op {
      Op::Add(_) => m.add(self.acc, value),
      Op::Sub(_) => m.sub(self.acc, value),
      Op::None | Op::Declared => {
        self.flush()?;
        if self.addr >= self.io_start {
          return Err(self.error(ParseErrorKind::ProgramTooLong, start..self.pos));
        }
        self.addr += 1;
        value
      }
    };
    self.op = Op::None;
    if matches!(self.peek(0), Some(b) if is_label_byte(b) || b == b'?' || b == b'\'') {
      return Err(self.error(ParseErrorKind::UnseparatedTokens, start..self.pos));
    }
    Ok(())
  }

  // commit the open word
  fn flush(&mut self) -> Result<(), Error> {
    if let (Some(memory), Some(last)) = (self.memory.as_deref_mut(), self.addr.checked_sub(1)) {
      memory.write(last, self.acc)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn build(source: &str) -> Result<(Memory, Labels), Error> {
    build_with(source, &Config::default())
  }

  fn build_with(source: &str, config: &Config) -> Result<(Memory, Labels), Error> {
    let mut memory = Memory::new(config.modulus, config.io_ports);
    let mut labels = Labels::new();
    assemble(source.as_bytes(), &mut memory, &mut labels, config)?;
    Ok((memory, labels))
  }

  fn image(source: &str) -> Vec<Word> {
    let (memory, _) = build(source).unwrap();
    memory.as_slice().to_vec()
  }

  fn words(memory: &Memory, len: Word) -> Vec<Word> {
    (0..len).map(|addr| memory.read(addr)).collect()
  }

  fn parse_error(source: &str) -> ParseError {
    match build(source) {
      Err(Error::Parse(err)) => err,
      other => panic!("expected a parse error for {source:?}, got {other:?}"),
    }
  }

  mod values {
    use super::*;

    #[test]
    fn numbers() {
      let (memory, _) = build("1 22 0x1f 0XAbC 0x").unwrap();
      assert_eq!(words(&memory, 5), [1, 22, 0x1f, 0xabc, 0]);
    }

    #[test]
    fn numbers_wrap() {
      let (memory, _) = build("18446744073709551616 0x10000000000000001").unwrap();
      assert_eq!(words(&memory, 2), [0, 1]);
    }

    #[test]
    fn ascii() {
      let (memory, _) = build("'A 'b '' '#").unwrap();
      assert_eq!(words(&memory, 4), [65, 98, 39, 35]);
    }

    #[test]
    fn current_address() {
      let (memory, _) = build("? ? ?+1 0-1+?").unwrap();
      assert_eq!(words(&memory, 4), [0, 1, 3, 2]);
    }

    #[test]
    fn operators() {
      let (memory, _) = build("1+2 5-7 0-1 1-2+0x21").unwrap();
      assert_eq!(words(&memory, 4), [3, u64::MAX - 1, u64::MAX, 32]);
    }

    #[test]
    fn operator_across_comment() {
      let (memory, _) = build("1 - #comment\n2 5").unwrap();
      assert_eq!(words(&memory, 2), [u64::MAX, 5]);
      let (memory, _) = build("1 - #||#2").unwrap();
      assert_eq!(words(&memory, 1), [u64::MAX]);
    }

    #[test]
    fn trailing_zeros_are_not_stored() {
      let (memory, _) = build("7 0 0 0").unwrap();
      assert_eq!(memory.capacity(), 1);
      assert_eq!(memory.read(3), 0);
    }

    #[test]
    fn small_modulus_wraps() {
      let config = Config::default().with_modulus(Modulus::new(13));
      let (memory, _) = build_with("0-1 20 0xff 'A 5+9", &config).unwrap();
      assert_eq!(words(&memory, 5), [12, 7, 255 % 13, 65 % 13, 1]);
    }
  }

  mod labels {
    use super::*;

    #[test]
    fn forward_and_backward() {
      let (memory, labels) = build("start: end 1 start end: 0").unwrap();
      assert_eq!(words(&memory, 4), [3, 1, 0, 0]);
      assert_eq!(labels.find("start"), Some(0));
      assert_eq!(labels.find("end"), Some(3));
    }

    #[test]
    fn label_arithmetic() {
      let (memory, _) = build("txt: 'a 'b len: len-txt+1").unwrap();
      assert_eq!(memory.read(2), 3);
    }

    #[test]
    fn chained_declarations() {
      let (_, labels) = build("a:b: 5 c:").unwrap();
      assert_eq!(labels.find("a"), Some(0));
      assert_eq!(labels.find("b"), Some(0));
      assert_eq!(labels.find("c"), Some(1));
    }

    #[test]
    fn sub_labels() {
      let (memory, labels) = build("A: .B: 1 A.B .B").unwrap();
      assert_eq!(labels.find("A.B"), Some(0));
      assert_eq!(words(&memory, 3), [1, 0, 0]);

      let (_, labels) = build("f: .x: 1 g: .x: 2").unwrap();
      assert_eq!(labels.find("f.x"), Some(0));
      assert_eq!(labels.find("g.x"), Some(1));
    }

    #[test]
    fn sub_label_does_not_change_scope() {
      let (_, labels) = build("a: .b: 0 .c: 0").unwrap();
      assert_eq!(labels.find("a.c"), Some(1));
      assert_eq!(labels.find("a.b.c"), None);
    }

    #[test]
    fn dotted_top_level_becomes_scope() {
      let (memory, _) = build("lbl.tmp: .x-2 lbl.tmp.x:0 0").unwrap();
      assert_eq!(memory.read(0), u64::MAX);
    }

    #[test]
    fn utf8() {
      let (_, labels) = build("måin: 0 måin.x: 0").unwrap();
      assert_eq!(labels.find("måin"), Some(0));
      assert_eq!(labels.find("måin.x"), Some(1));
    }
  }

  mod errors {
    use super::*;

    fn check(source: &str, kind: ParseErrorKind, span: Range<usize>) {
      let err = parse_error(source);
      assert_eq!(err.kind, kind, "{source:?}");
      assert_eq!(err.span, Some(span), "{source:?}");
    }

    #[test]
    fn operators() {
      check("+1", ParseErrorKind::LeadingOperator, 0..1);
      check("1+-2", ParseErrorKind::DoubleOperator, 2..3);
      check("1+", ParseErrorKind::TrailingOperator, 1..2);
      check("1 - #comment\n", ParseErrorKind::TrailingOperator, 2..13);
      check("0+lbl:0", ParseErrorKind::OperatingOnDeclaration, 2..6);
      check("0 lbl:+0", ParseErrorKind::OperatingOnDeclaration, 6..7);
      check("lbl: 0+lbl:", ParseErrorKind::OperatingOnDeclaration, 7..11);
    }

    #[test]
    fn labels() {
      check("lbl", ParseErrorKind::UnknownLabel, 0..3);
      check("lbl: .", ParseErrorKind::UnknownLabel, 5..6);
      check("lbl: lbl: 0", ParseErrorKind::DuplicateLabel, 5..9);
      check("lbl: .x:0-1 lbl.x:0 0", ParseErrorKind::DuplicateLabel, 12..18);
    }

    #[test]
    fn unseparated() {
      check("0xefg", ParseErrorKind::UnseparatedTokens, 0..4);
      check("'A'b", ParseErrorKind::UnseparatedTokens, 0..2);
      check("?lbl", ParseErrorKind::UnseparatedTokens, 0..1);
      check("lbl?", ParseErrorKind::UnseparatedTokens, 0..3);
      check("12abc", ParseErrorKind::UnseparatedTokens, 0..2);
    }

    #[test]
    fn unexpected() {
      check(":", ParseErrorKind::UnexpectedToken, 0..1);
      check("?:", ParseErrorKind::UnexpectedToken, 1..2);
      check("|#0-1 0 0", ParseErrorKind::UnexpectedToken, 0..1);
      check("\x7f", ParseErrorKind::UnexpectedToken, 0..1);
    }

    #[test]
    fn unterminated_comment() {
      check("#|", ParseErrorKind::UnterminatedComment, 0..2);
      check("#|#0-1 0 0", ParseErrorKind::UnterminatedComment, 0..10);
    }

    #[test]
    fn input_too_long() {
      let config = Config::default().with_max_source_len(4);
      match build_with("1 2 3", &config) {
        Err(Error::Parse(err)) => {
          assert_eq!(err.kind, ParseErrorKind::InputTooLong);
          assert_eq!(err.span, None);
        }
        other => panic!("unexpected {other:?}"),
      }
    }

    #[test]
    fn program_length_limit() {
      // M = 16, K = 7: the I/O band starts at 9, so the last usable address is 8
      let config = Config::default().with_modulus(Modulus::new(16));
      let fits = "0 ".repeat(9);
      assert!(build_with(&fits, &config).is_ok());

      let overflows = "0 ".repeat(10);
      match build_with(&overflows, &config) {
        Err(Error::Parse(err)) => {
          assert_eq!(err.kind, ParseErrorKind::ProgramTooLong);
          assert_eq!(err.span, Some(18..19));
        }
        other => panic!("unexpected {other:?}"),
      }
    }

    #[test]
    fn first_error_wins() {
      check("+ lbl", ParseErrorKind::LeadingOperator, 0..1);
    }
  }

  #[test]
  fn deterministic() {
    let source = "loop: len one exit 0-2 txt ?+1 ?-2 neg loop exit: 0-1 0 0 \
                  txt: 'H 'i 10 len: len-txt+1 neg: 0-1 one: 1";
    assert_eq!(image(source), image(source));
  }
}
