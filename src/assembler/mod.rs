//! The Assembler module is in charge of taking an
//! LMC source file and producing a filled memory image.
//!
//! It does this with a streaming tokenizer feeding a
//! single-pass parser that back-patches forward label
//! references as their definitions are found.

pub mod diagnostic;
pub mod lexer;
pub mod mnemonic;
pub mod parser;
pub mod symbols;

use std::io::Read;

use crate::machine::memory::{CapacityError, Memory, MAX_MEMORY};

pub use self::diagnostic::{Diagnostic, DiagnosticKind};

#[derive(Clone, Debug)]
pub struct Options {
    /// Usable memory cells, 1 to 100.
    pub memory_size: usize,
    /// Longest label name accepted, in bytes.
    pub max_label_len: usize,
    /// Upper bound on distinct labels, if any.
    pub max_labels: Option<usize>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            memory_size: MAX_MEMORY,
            max_label_len: symbols::MAX_LABEL_LEN,
            max_labels: None,
        }
    }
}

/// The outcome of assembling one source. The memory image is only fit
/// to run when there are no diagnostics.
#[derive(Clone, Debug)]
pub struct Assembly {
    pub memory: Memory,
    pub diagnostics: Vec<Diagnostic>,
}

impl Assembly {
    pub fn is_ok(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

pub fn assemble<R: Read>(reader: R, options: &Options) -> Result<Assembly, CapacityError> {
    let memory = Memory::new(options.memory_size)?;
    let parser = parser::Parser::new(lexer::Lexer::new(reader), memory, options);
    Ok(parser.run())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::{Halt, Machine};

    fn run(src: &str, input: &[u8]) -> (Halt, Vec<u8>) {
        let assembly = assemble(src.as_bytes(), &Options::default()).unwrap();
        assert!(assembly.is_ok(), "{:?}", assembly.diagnostics);

        let mut machine = Machine::new(assembly.memory);
        let mut input = input;
        let mut output = Vec::new();
        let reason = machine.run(&mut input, &mut output);
        (reason, output)
    }

    #[test]
    fn test_echo() {
        assert_eq!(run("INP\nOUT\nHLT", &[65]), (Halt::Instruction, b"A".to_vec()));
    }

    #[test]
    fn test_echo_until_exhausted() {
        let src = "loop: INP\n OUT\n BRA &loop";
        assert_eq!(run(src, b"hey"), (Halt::InputExhausted, b"hey".to_vec()));
    }

    #[test]
    fn test_hello_world() {
        let src = r#"
# Walk a zero-terminated string, printing each byte.
loop:   LDA &text       # patched each round
        BRZ &done
        OUT
        LDA &loop
        ADD &one
        STA &loop
        BRA &loop
done:   HLT
one:    DAT 1
text:   DAT "Hello, World!\n"
        DAT 0
"#;
        assert_eq!(run(src, &[]), (Halt::Instruction, b"Hello, World!\n".to_vec()));
    }

    #[test]
    fn test_countdown() {
        let src = "
        INP
        SUB &zero
loop:   BRZ &end
        OUT
        SUB &one
        BRA &loop
end:    HLT
zero:   DAT '0'
one:    DAT 1
";
        // '3' minus '0' leaves 3, printed as raw bytes 3, 2, 1.
        assert_eq!(run(src, b"3"), (Halt::Instruction, vec![3, 2, 1]));
    }

    #[test]
    fn test_rejects_bad_memory_size() {
        let options = Options { memory_size: 101, ..Options::default() };
        assert!(assemble("HLT".as_bytes(), &options).is_err());
    }
}
