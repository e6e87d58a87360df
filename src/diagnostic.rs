use std::fmt;
use std::ops::Range;

/// Longest excerpt shown for a line
pub const EXCERPT_LEN: usize = 60;

/// How far before the error the excerpt may start
const LEAD: usize = 30;

/// The located, human-readable part of a parse error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
  /// 1-based line of the span's start
  pub line: usize,
  pub excerpt: String,
  /// One byte per excerpt byte, `^` under the span
  pub underline: String,
}

/// Locate `span` within `source` and render an underlined excerpt of its line.
///
/// The line is trimmed of whitespace and control bytes on both ends. Long lines
/// are cut on the left so the excerpt starts at most 30 bytes before the span,
/// and on the right after 60 bytes. Whitespace bytes are copied into the
/// underline so tabs stay aligned.
pub fn format_diagnostic(source: &[u8], span: Range<usize>) -> Diagnostic {
  let start = span.start.min(source.len());
  let before = &source[..start];
  let line = 1 + before.iter().filter(|&&b| b == b'\n').count();

  let mut lo = before.iter().rposition(|&b| b == b'\n').map_or(0, |p| p + 1);
  let mut hi = source[start..]
    .iter()
    .position(|&b| b == b'\n')
    .map_or(source.len(), |p| start + p);
  while lo < hi && source[lo] <= b' ' {
    lo += 1;
  }
  while hi > lo && source[hi - 1] <= b' ' {
    hi -= 1;
  }
  if start > lo + LEAD {
    lo = start - LEAD;
  }
  let mut hi = hi.min(lo + EXCERPT_LEN).max(lo);
  // keep multibyte characters whole at both cuts
  while lo < hi && is_continuation(source[lo]) {
    lo += 1;
  }
  while hi > lo && hi < source.len() && is_continuation(source[hi]) {
    hi -= 1;
  }

  let window = &source[lo..hi];
  let underline = window
    .iter()
    .enumerate()
    .map(|(k, &b)| {
      if span.contains(&(lo + k)) {
        '^'
      } else if b <= b' ' {
        b as char
      } else {
        ' '
      }
    })
    .collect();

  Diagnostic {
    line,
    excerpt: String::from_utf8_lossy(window).into_owned(),
    underline,
  }
}

fn is_continuation(byte: u8) -> bool {
  byte & 0xc0 == 0x80
}

impl fmt::Display for Diagnostic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "Line  : {}\n\n\t{}\n\t{}\n\n",
      self.line, self.excerpt, self.underline
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn single_line() {
    let diag = format_diagnostic(b"1 + ", 2..4);
    assert_eq!(diag.line, 1);
    assert_eq!(diag.excerpt, "1 +");
    assert_eq!(diag.underline, "  ^");
  }

  #[test]
  fn counts_lines() {
    let diag = format_diagnostic(b"1 - #comment\n+ 2", 13..14);
    assert_eq!(diag.line, 2);
    assert_eq!(diag.excerpt, "+ 2");
    assert_eq!(diag.underline, "^  ");
  }

  #[test]
  fn span_past_line_end() {
    let diag = format_diagnostic(b"1 - #comment\n", 2..13);
    assert_eq!(diag.excerpt, "1 - #comment");
    assert_eq!(diag.underline, "  ^^^^^^^^^^");
  }

  #[test]
  fn control_bytes_are_trimmed() {
    let diag = format_diagnostic(b"\x01", 0..1);
    assert_eq!(diag.excerpt, "");
    assert_eq!(diag.underline, "");
  }

  #[test]
  fn tabs_keep_alignment() {
    let diag = format_diagnostic(b"a\tbad", 2..5);
    assert_eq!(diag.excerpt, "a\tbad");
    assert_eq!(diag.underline, " \t^^^");
  }

  #[test]
  fn long_lines_are_windowed() {
    let mut source = b"   \r \t  \n   ".to_vec();
    source.extend(std::iter::repeat(b'a').take(61));
    source.extend(b" b  \n");
    let b = source.iter().position(|&c| c == b'b').unwrap();
    let diag = format_diagnostic(&source, b..b + 1);
    assert_eq!(diag.line, 2);
    assert_eq!(diag.excerpt, format!("{} b", "a".repeat(29)));
    assert_eq!(diag.underline, format!("{}^", " ".repeat(30)));
  }

  #[test]
  fn left_cut_skips_partial_character() {
    // 'å' is two bytes; the window would otherwise start on its second
    let source = format!("å{} q", "b".repeat(28));
    let diag = format_diagnostic(source.as_bytes(), 31..32);
    assert_eq!(diag.excerpt, format!("{} q", "b".repeat(28)));
    assert_eq!(diag.underline, format!("{}^", " ".repeat(29)));
  }

  #[test]
  fn right_cut_skips_partial_character() {
    let source = format!("{}å", "b".repeat(59));
    let diag = format_diagnostic(source.as_bytes(), 0..1);
    assert_eq!(diag.excerpt, "b".repeat(59));
    assert_eq!(diag.underline.len(), 59);
  }

  #[test]
  fn whole_characters_are_kept() {
    let diag = format_diagnostic("måin x".as_bytes(), 6..7);
    assert_eq!(diag.excerpt, "måin x");
    assert!(!diag.excerpt.contains('\u{fffd}'));
  }

  #[test]
  fn excerpt_is_capped() {
    let source = "x".repeat(100);
    let diag = format_diagnostic(source.as_bytes(), 0..100);
    assert_eq!(diag.excerpt.len(), EXCERPT_LEN);
    assert_eq!(diag.underline, "^".repeat(EXCERPT_LEN));
  }

  #[test]
  fn display() {
    let diag = format_diagnostic(b"!", 0..1);
    assert_eq!(diag.to_string(), "Line  : 1\n\n\t!\n\t^\n\n");
  }
}
