//! Problems found while assembling, tagged with the source line.
use std::fmt;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Literal {
    Str,
    Char,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum DiagnosticKind {
    UnknownInstruction(String),
    DuplicateLabel(String),
    InvalidLabel(String),
    TooManyLabels,
    InvalidValue(String),
    InvalidCharLiteral,
    EmptyString,
    UnterminatedLiteral,
    MisplacedLiteral(Literal),
    UnterminatedInstruction,
    UnresolvedLabel(String),
    LabelOutOfRange(String),
    OutOfMemory,
    Io(String),
}

impl DiagnosticKind {
    /// Whether assembly stops as soon as this is reported.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DiagnosticKind::UnterminatedLiteral | DiagnosticKind::OutOfMemory | DiagnosticKind::Io(_)
        )
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use DiagnosticKind::*;
        match self {
            UnknownInstruction(s) => write!(f, "unknown instruction '{}'", s),
            DuplicateLabel(s) => write!(f, "duplicate label '{}'", s),
            InvalidLabel(s) => write!(f, "invalid label name '{}'", s),
            TooManyLabels => write!(f, "too many labels"),
            InvalidValue(s) => write!(f, "invalid value '{}'", s),
            InvalidCharLiteral => write!(f, "invalid character literal"),
            EmptyString => write!(f, "empty string literal"),
            UnterminatedLiteral => write!(f, "unterminated literal"),
            MisplacedLiteral(Literal::Str) => {
                write!(f, "string literal not permitted outside of data definition")
            }
            MisplacedLiteral(Literal::Char) => {
                write!(f, "character literal not permitted outside of data definition")
            }
            UnterminatedInstruction => write!(f, "unexpected end of input while reading instruction data"),
            UnresolvedLabel(s) => write!(f, "unknown label '{}'", s),
            LabelOutOfRange(s) => write!(f, "label '{}' is outside of memory", s),
            OutOfMemory => write!(f, "program is larger than the available memory"),
            Io(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Diagnostic {
    pub line: usize,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn new(line: usize, kind: DiagnosticKind) -> Self {
        Diagnostic { line, kind }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.line, self.kind)
    }
}
