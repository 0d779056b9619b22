//! Encoding of LMC cells.
//!
//! Every cell is a plain number. Instructions are packed as
//! `opcode * 100 + operand`, so the hundreds digit selects the
//! operation and the remaining two digits hold an address:
//!
//! ```text
//! 000     HLT        halt the program
//! 1xx     ADD xx     register += memory[xx]
//! 2xx     SUB xx     register -= memory[xx]
//! 3xx     STA xx     memory[xx] = register
//! 5xx     LDA xx     register = memory[xx]
//! 6xx     BRA xx     pc = xx
//! 7xx     BRZ xx     pc = xx if register == 0
//! 8xx     BRP xx     pc = xx if register > 0
//! 901     INP        read one byte into the register
//! 902     OUT        write the register's low byte
//! ```
//!
//! Opcode 4 is unassigned. Nothing marks a cell as data, so the
//! interpreter decodes whatever it fetches.

use std::fmt;

use super::memory::Cell;

/// Sub-operation selector for opcode 9.
pub const IO_INPUT: Cell = 1;
pub const IO_OUTPUT: Cell = 2;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Opcode {
    Halt,
    Add,
    Sub,
    Store,
    Load,
    Branch,
    BranchZero,
    BranchPositive,
    Io,
}

impl Opcode {
    /// The hundreds digit of the encoded cell.
    pub fn digit(self) -> Cell {
        use Opcode::*;
        match self {
            Halt           => 0,
            Add            => 1,
            Sub            => 2,
            Store          => 3,
            Load           => 5,
            Branch         => 6,
            BranchZero     => 7,
            BranchPositive => 8,
            Io             => 9,
        }
    }

    /// Maps an opcode digit back to an opcode. Digit 4 and anything
    /// above 9 have no meaning.
    pub fn from_digit(digit: Cell) -> Option<Opcode> {
        use Opcode::*;
        match digit {
            0 => Some(Halt),
            1 => Some(Add),
            2 => Some(Sub),
            3 => Some(Store),
            5 => Some(Load),
            6 => Some(Branch),
            7 => Some(BranchZero),
            8 => Some(BranchPositive),
            9 => Some(Io),
            _ => None,
        }
    }

    /// The value emitted into a cell before its operand is added.
    pub fn prefix(self) -> Cell {
        self.digit() * 100
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Opcode::*;
        let text = match self {
            Halt           => "hlt",
            Add            => "add",
            Sub            => "sub",
            Store          => "sta",
            Load           => "lda",
            Branch         => "bra",
            BranchZero     => "brz",
            BranchPositive => "brp",
            Io             => "io",
        };
        f.write_str(text)
    }
}

pub fn encode(opcode: Opcode, operand: Cell) -> Cell {
    opcode.prefix() + operand
}

/// Splits a cell into its opcode digit and operand. The opcode digit is
/// returned raw because data cells routinely carry digits with no
/// instruction behind them.
pub fn decode(code: Cell) -> (Cell, Cell) {
    (code / 100, code % 100)
}

/// Renders a cell for the debug memory view. Values below 100 and
/// cells whose opcode digit has no instruction are shown as data.
pub fn describe(code: Cell) -> String {
    let (digit, operand) = decode(code);
    match Opcode::from_digit(digit) {
        Some(Opcode::Io) => {
            let name = match operand {
                IO_INPUT => "inp",
                IO_OUTPUT => "out",
                _ => "io",
            };
            format!("{{{} ({} {})}}", code, name, operand)
        }
        Some(op) if code >= 100 => format!("{{{} ({} {})}}", code, op, operand),
        _ => format!("{{{}}}", code),
    }
}
