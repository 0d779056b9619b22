//! This lexer tokenizes LMC source.
//!
//! Input is pulled from a reader through a fixed size buffer, so
//! source of any length is handled one token at a time. A token
//! borrows the buffer and must be copied out before the next one
//! is requested.
//!
//! Three kinds of token exist, told apart by their first byte:
//!
//! ```text
//! "text"   string literal, ends at the next unescaped "
//! 'c'      character literal, ends at the next unescaped '
//! word     anything else, ends at whitespace
//! ```
//!
//! A `#` at the start of a token begins a comment running to the
//! end of the line.
use std::fmt;
use std::io::{self, Read};

pub const BUFFER_SIZE: usize = 2048;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TokenKind {
    Word,
    Str,
    Char,
}

impl TokenKind {
    fn of(first: u8) -> Self {
        match first {
            b'"' => TokenKind::Str,
            b'\'' => TokenKind::Char,
            _ => TokenKind::Word,
        }
    }

    fn delimiter(self) -> Option<u8> {
        match self {
            TokenKind::Word => None,
            TokenKind::Str => Some(b'"'),
            TokenKind::Char => Some(b'\''),
        }
    }
}

/// A slice of the lexer's buffer together with the line it started on.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Token<'a> {
    pub text: &'a [u8],
    pub line: usize,
}

impl<'a> Token<'a> {
    pub fn kind(&self) -> TokenKind {
        TokenKind::of(self.text[0])
    }
}

#[derive(Debug)]
pub enum LexError {
    /// The input ended inside a quoted literal.
    Unterminated(usize),
    /// A single token did not fit into the read buffer.
    TooLong(usize),
    Io(io::Error),
}

impl LexError {
    pub fn line(&self) -> Option<usize> {
        match self {
            LexError::Unterminated(line) | LexError::TooLong(line) => Some(*line),
            LexError::Io(_) => None,
        }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LexError::Unterminated(_) => write!(f, "unterminated literal at end of input"),
            LexError::TooLong(_) => write!(f, "token does not fit into {} bytes", BUFFER_SIZE),
            LexError::Io(e) => write!(f, "unable to read input: {}", e),
        }
    }
}

impl std::error::Error for LexError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LexError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for LexError {
    fn from(e: io::Error) -> Self {
        LexError::Io(e)
    }
}

/// Same set the C library's `isspace` accepts.
fn is_space(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | b'\x0B' | b'\x0C' | b'\r')
}

pub struct Lexer<R> {
    reader: R,
    buffer: Vec<u8>,
    filled: usize,
    pos: usize,
    line: usize,
    eof: bool,
}

impl<R: Read> Lexer<R> {
    pub fn new(reader: R) -> Self {
        Self::with_capacity(reader, BUFFER_SIZE)
    }

    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        Lexer {
            reader,
            buffer: vec![0; capacity.max(1)],
            filled: 0,
            pos: 0,
            line: 1,
            eof: false,
        }
    }

    /// The line the lexer is currently on, starting at 1.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Returns the next token, or `None` once the input is used up.
    pub fn next_token(&mut self) -> Result<Option<Token<'_>>, LexError> {
        if !self.skip_blanks()? {
            return Ok(None);
        }

        let line = self.line;
        let mut start = self.pos;
        let kind = TokenKind::of(self.buffer[start]);
        let delimiter = kind.delimiter();
        let mut escaped = false;
        self.pos += 1;

        loop {
            if self.pos == self.filled {
                let read = self.refill(start, line)?;
                start = 0;
                if read == 0 {
                    if kind == TokenKind::Word {
                        break;
                    }
                    return Err(LexError::Unterminated(line));
                }
            }

            let c = self.buffer[self.pos];
            match delimiter {
                None => {
                    if is_space(c) {
                        break;
                    }
                    self.pos += 1;
                }
                Some(delimiter) => {
                    if c == b'\n' {
                        self.line += 1;
                    }
                    self.pos += 1;
                    if escaped {
                        escaped = false;
                    } else if c == b'\\' {
                        escaped = true;
                    } else if c == delimiter {
                        break;
                    }
                }
            }
        }

        Ok(Some(Token { text: &self.buffer[start..self.pos], line }))
    }

    /// Advances past whitespace and comments. Returns false at end of input.
    fn skip_blanks(&mut self) -> Result<bool, LexError> {
        let mut in_comment = false;
        loop {
            if self.pos == self.filled && self.refill(self.pos, self.line)? == 0 {
                return Ok(false);
            }

            let c = self.buffer[self.pos];
            if c == b'\n' {
                self.line += 1;
                in_comment = false;
            } else if in_comment || c == b'#' {
                in_comment = true;
            } else if !is_space(c) {
                return Ok(true);
            }
            self.pos += 1;
        }
    }

    /// Moves everything from `keep` onward to the front of the buffer,
    /// then reads more input behind it. Returns the number of bytes read.
    fn refill(&mut self, keep: usize, line: usize) -> Result<usize, LexError> {
        self.buffer.copy_within(keep..self.filled, 0);
        self.filled -= keep;
        self.pos -= keep;

        if self.eof {
            return Ok(0);
        }
        if self.filled == self.buffer.len() {
            return Err(LexError::TooLong(line));
        }

        let read = loop {
            match self.reader.read(&mut self.buffer[self.filled..]) {
                Ok(n) => break n,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };
        if read == 0 {
            self.eof = true;
        }
        self.filled += read;
        Ok(read)
    }
}
