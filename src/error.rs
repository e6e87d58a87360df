use std::fmt;
use std::io;
use std::ops::Range;
use std::path::PathBuf;

use crate::config::ConfigError;
use crate::diagnostic::{format_diagnostic, Diagnostic};
use crate::word::Word;

/// Everything the assembler can reject, in the words the user sees.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
  #[error("Leading operator")]
  LeadingOperator,

  #[error("Double operator")]
  DoubleOperator,

  #[error("Operating on declaration")]
  OperatingOnDeclaration,

  #[error("Trailing operator")]
  TrailingOperator,

  #[error("Duplicate label declaration")]
  DuplicateLabel,

  #[error("Unable to find label")]
  UnknownLabel,

  #[error("Unexpected token")]
  UnexpectedToken,

  #[error("Unseparated tokens")]
  UnseparatedTokens,

  #[error("Unterminated block quote")]
  UnterminatedComment,

  #[error("Input string too long")]
  InputTooLong,

  #[error("Program too long for mod")]
  ProgramTooLong,
}

/// The first error found while assembling a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
  pub kind: ParseErrorKind,
  /// Bytes of the source that the underline covers
  pub span: Option<Range<usize>>,
  pub diagnostic: Option<Diagnostic>,
}

impl ParseError {
  /// An error located at `span` within `source`
  pub fn at(kind: ParseErrorKind, source: &[u8], span: Range<usize>) -> Self {
    let diagnostic = format_diagnostic(source, span.clone());
    Self {
      kind,
      span: Some(span),
      diagnostic: Some(diagnostic),
    }
  }

  /// An error about the source as a whole
  pub fn unlocated(kind: ParseErrorKind) -> Self {
    Self {
      kind,
      span: None,
      diagnostic: None,
    }
  }

  pub fn line(&self) -> Option<usize> {
    self.diagnostic.as_ref().map(|diag| diag.line)
  }
}

impl fmt::Display for ParseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "Parser: {}", self.kind)?;
    if let Some(diag) = &self.diagnostic {
      write!(f, "{diag}")?;
    }
    Ok(())
  }
}

impl std::error::Error for ParseError {}

/// Memory could not grow to hold a non-zero write.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Failed to allocate memory.\nIndex: {addr}\n")]
pub struct MemoryError {
  pub addr: Word,
}

/// An error that moved the machine out of the running state
#[derive(thiserror::Error, Debug)]
pub enum Error {
  #[error(transparent)]
  Parse(#[from] ParseError),

  #[error(transparent)]
  Memory(#[from] MemoryError),

  #[error("Could not open file \"{}\"\n", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error(transparent)]
  Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn located_message() {
    let err = ParseError::at(ParseErrorKind::LeadingOperator, b"+1", 0..1);
    assert_eq!(err.line(), Some(1));
    assert_eq!(
      err.to_string(),
      "Parser: Leading operator\nLine  : 1\n\n\t+1\n\t^ \n\n"
    );
  }

  #[test]
  fn unlocated_message() {
    let err = ParseError::unlocated(ParseErrorKind::InputTooLong);
    assert_eq!(err.line(), None);
    assert_eq!(err.to_string(), "Parser: Input string too long\n");
  }

  #[test]
  fn memory_message() {
    let err = MemoryError {
      addr: 0x7fff_ffff_ffff_ffff,
    };
    assert_eq!(
      err.to_string(),
      "Failed to allocate memory.\nIndex: 9223372036854775807\n"
    );
  }

  #[test]
  fn io_message() {
    let err = Error::Io {
      path: PathBuf::from("missing.sico"),
      source: io::Error::from(io::ErrorKind::NotFound),
    };
    assert_eq!(err.to_string(), "Could not open file \"missing.sico\"\n");
  }
}
