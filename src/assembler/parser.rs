//! The Parser pulls tokens from the Lexer and writes encoded cells
//! straight into a memory image in a single pass.
//!
//! Each cell is built by a small state machine: an opcode or label is
//! expected first, then, depending on the opcode, an address operand
//! or a data operand. Label references that cannot be resolved yet are
//! remembered as patch sites and filled in when the label is defined.
use std::io::Read;

use regex::Regex;

use super::diagnostic::{Diagnostic, DiagnosticKind, Literal};
use super::lexer::{LexError, Lexer, TokenKind};
use super::mnemonic::{Mnemonic, Operand};
use super::symbols::{self, PatchSite, Reference, SymbolError, SymbolTable};
use super::{Assembly, Options};
use crate::machine::memory::{Cell, Memory, MAX_CELL};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Mode {
    /// Expecting an opcode or a label definition.
    Idle,
    /// Expecting the address of an instruction.
    Address,
    /// Expecting the value of a DAT directive.
    Data,
}

/// Assembly cannot continue; the cause is already in the diagnostics.
struct Abort;

pub struct Parser<R> {
    lexer: Lexer<R>,
    memory: Memory,
    symbols: SymbolTable,
    cursor: usize,
    mode: Mode,
    decimal: Regex,
    diagnostics: Vec<Diagnostic>,
}

impl<R: Read> Parser<R> {
    pub fn new(lexer: Lexer<R>, memory: Memory, options: &Options) -> Self {
        Parser {
            lexer,
            memory,
            symbols: SymbolTable::new(options.max_label_len, options.max_labels),
            cursor: 0,
            mode: Mode::Idle,
            decimal: Regex::new(r"^[0-9]+$").expect("decimal literal pattern is valid"),
            diagnostics: Vec::new(),
        }
    }

    /// Run the parser, consuming itself and returning the filled memory
    /// image along with everything that went wrong.
    pub fn run(mut self) -> Assembly {
        if self.pass().is_ok() {
            for (name, label) in self.symbols.unresolved() {
                let line = label.pending.first().map_or(0, |site| site.line);
                self.diagnostics.push(Diagnostic::new(line, DiagnosticKind::UnresolvedLabel(name.to_owned())));
            }
        }

        info!(
            "assembled {} cell(s), {} label(s), {} error(s)",
            self.cursor,
            self.symbols.len(),
            self.diagnostics.len()
        );
        Assembly { memory: self.memory, diagnostics: self.diagnostics }
    }

    fn pass(&mut self) -> Result<(), Abort> {
        loop {
            // Tokens borrow the lexer's buffer, so take a copy before
            // touching anything else.
            let next = self
                .lexer
                .next_token()
                .map(|token| token.map(|t| (t.kind(), t.text.to_vec(), t.line)));
            let (kind, text, line) = match next {
                Ok(Some(token)) => token,
                Ok(None) => break,
                Err(e) => {
                    self.lex_error(e)?;
                    break;
                }
            };

            match self.mode {
                Mode::Idle => self.instruction(&text, line)?,
                Mode::Address | Mode::Data => self.operand(kind, &text, line)?,
            }
        }

        if self.mode != Mode::Idle {
            let line = self.lexer.line();
            self.error(line, DiagnosticKind::UnterminatedInstruction);
        } else if self.cursor > 0 && self.memory.get(self.cursor - 1) != 0 {
            // Programs that do not end in HLT get one.
            self.memory.set(self.cursor, 0);
        }
        Ok(())
    }

    fn instruction(&mut self, text: &[u8], line: usize) -> Result<(), Abort> {
        if let Some((&b':', name)) = text.split_last() {
            self.define(name, line);
            return Ok(());
        }

        let mnemonic = match Mnemonic::parse(text) {
            Some(m) => m,
            None => {
                self.error(line, DiagnosticKind::UnknownInstruction(lossy(text)));
                return Ok(());
            }
        };

        self.emit(mnemonic.emit(), line)?;
        match mnemonic.operand() {
            Operand::None => self.cursor += 1,
            Operand::Address => self.mode = Mode::Address,
            Operand::Data => self.mode = Mode::Data,
        }
        Ok(())
    }

    fn operand(&mut self, kind: TokenKind, text: &[u8], line: usize) -> Result<(), Abort> {
        let mode = std::mem::replace(&mut self.mode, Mode::Idle);
        match kind {
            TokenKind::Str => return self.string(text, mode, line),
            TokenKind::Char => self.character(text, mode, line),
            TokenKind::Word => match text.split_first() {
                Some((&b'&', name)) => self.reference(name, line),
                _ => self.number(text, mode, line),
            },
        }
        Ok(())
    }

    fn define(&mut self, name: &[u8], line: usize) {
        let name = lossy(name);
        match self.symbols.define(&name, self.cursor) {
            // A label after the last cell has no address an operand can hold.
            Ok(sites) if self.cursor >= self.memory.len() => {
                for site in sites {
                    self.error(site.line, DiagnosticKind::LabelOutOfRange(name.clone()));
                }
            }
            Ok(sites) => {
                trace!("label `{}` at {}, patching {} site(s)", name, self.cursor, sites.len());
                for site in sites {
                    let cell = self.memory.get(site.address);
                    self.memory.set(site.address, symbols::resolve(cell, self.cursor));
                }
            }
            Err(e) => self.symbol_error(e, name, line),
        }
    }

    fn reference(&mut self, name: &[u8], line: usize) {
        let name = lossy(name);
        let site = PatchSite { address: self.cursor, line };
        match self.symbols.reference(&name, site) {
            Ok(Reference::Known(address)) if address >= self.memory.len() => {
                self.error(line, DiagnosticKind::LabelOutOfRange(name))
            }
            Ok(Reference::Known(address)) => self.add(address as Cell),
            Ok(Reference::Deferred) => trace!("label `{}` pending at {}", name, self.cursor),
            Err(e) => self.symbol_error(e, name, line),
        }
        self.cursor += 1;
    }

    fn string(&mut self, text: &[u8], mode: Mode, line: usize) -> Result<(), Abort> {
        if mode != Mode::Data {
            self.error(line, DiagnosticKind::MisplacedLiteral(Literal::Str));
            return Ok(());
        }

        // The lexer only ends a quoted token on its closing delimiter.
        let bytes = match unescape(&text[1..text.len() - 1]) {
            Some(bytes) => bytes,
            None => {
                self.error(line, DiagnosticKind::InvalidValue(lossy(text)));
                return Ok(());
            }
        };
        if bytes.is_empty() {
            self.error(line, DiagnosticKind::EmptyString);
            return Ok(());
        }

        for byte in bytes {
            self.emit(Cell::from(byte), line)?;
            self.cursor += 1;
        }
        Ok(())
    }

    fn character(&mut self, text: &[u8], mode: Mode, line: usize) {
        if mode != Mode::Data {
            self.error(line, DiagnosticKind::MisplacedLiteral(Literal::Char));
            return;
        }

        match unescape(&text[1..text.len() - 1]).as_deref() {
            Some(&[byte]) => {
                self.add(Cell::from(byte));
                self.cursor += 1;
            }
            _ => self.error(line, DiagnosticKind::InvalidCharLiteral),
        }
    }

    fn number(&mut self, text: &[u8], mode: Mode, line: usize) {
        // Instruction operands are addresses and must name a real cell.
        let max = match mode {
            Mode::Data => u32::from(MAX_CELL),
            _ => self.memory.len().saturating_sub(1) as u32,
        };

        let value = std::str::from_utf8(text)
            .ok()
            .filter(|s| self.decimal.is_match(s))
            .and_then(|s| s.parse::<u32>().ok())
            .filter(|v| *v <= max);

        match value {
            Some(v) => {
                self.add(v as Cell);
                self.cursor += 1;
            }
            None => self.error(line, DiagnosticKind::InvalidValue(lossy(text))),
        }
    }

    /// Writes `value` into the cell under the cursor.
    fn emit(&mut self, value: Cell, line: usize) -> Result<(), Abort> {
        if self.memory.set(self.cursor, value) {
            Ok(())
        } else {
            self.check(line, DiagnosticKind::OutOfMemory)
        }
    }

    /// Adds an operand into the cell under the cursor. The opcode has
    /// already been emitted there, so the cursor is in range.
    fn add(&mut self, value: Cell) {
        let cell = self.memory.get(self.cursor);
        self.memory.set(self.cursor, cell + value);
    }

    fn symbol_error(&mut self, e: SymbolError, name: String, line: usize) {
        let kind = match e {
            SymbolError::Duplicate => DiagnosticKind::DuplicateLabel(name),
            SymbolError::InvalidName => DiagnosticKind::InvalidLabel(name),
            SymbolError::TooMany => DiagnosticKind::TooManyLabels,
        };
        self.error(line, kind);
    }

    fn lex_error(&mut self, e: LexError) -> Result<(), Abort> {
        let line = e.line().unwrap_or_else(|| self.lexer.line());
        let kind = match e {
            LexError::Unterminated(_) => DiagnosticKind::UnterminatedLiteral,
            other => DiagnosticKind::Io(other.to_string()),
        };
        self.check(line, kind)
    }

    fn error(&mut self, line: usize, kind: DiagnosticKind) {
        debug!("line {}: {}", line, kind);
        self.diagnostics.push(Diagnostic::new(line, kind));
    }

    /// Reports `kind` and stops the pass if it is fatal.
    fn check(&mut self, line: usize, kind: DiagnosticKind) -> Result<(), Abort> {
        let fatal = kind.is_fatal();
        self.error(line, kind);
        if fatal {
            Err(Abort)
        } else {
            Ok(())
        }
    }
}

fn lossy(text: &[u8]) -> String {
    String::from_utf8_lossy(text).into_owned()
}

/// Decodes backslash escapes inside a quoted literal.
fn unescape(body: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(body.len());
    let mut bytes = body.iter();
    while let Some(&c) = bytes.next() {
        if c != b'\\' {
            out.push(c);
            continue;
        }
        out.push(match *bytes.next()? {
            b'n' => b'\n',
            b't' => b'\t',
            b'0' => 0,
            c @ b'\\' | c @ b'"' | c @ b'\'' => c,
            _ => return None,
        });
    }
    Some(out)
}
