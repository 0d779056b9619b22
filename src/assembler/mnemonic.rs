//! Source mnemonics and what they emit.
//!
//! ```text
//! HLT            halt
//! ADD addr       add memory[addr] to the register
//! SUB addr       subtract memory[addr] from the register
//! STA addr       store the register into memory[addr]
//! LDA addr       load memory[addr] into the register
//! BRA addr       branch always
//! BRZ addr       branch if the register is zero
//! BRP addr       branch if the register is positive
//! INP            read a byte into the register
//! OUT            write the register as a byte
//! DAT value...   place data, one cell per value or string byte
//! ```
//!
//! Mnemonics are case-insensitive. `addr` is a number or `&label`.

use crate::machine::memory::Cell;
use crate::machine::opcode::{self, Opcode, IO_INPUT, IO_OUTPUT};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Mnemonic {
    HLT,
    ADD,
    SUB,
    STA,
    LDA,
    BRA,
    BRZ,
    BRP,
    INP,
    OUT,
    DAT,
}

/// What the assembler expects after a mnemonic.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Operand {
    None,
    Address,
    Data,
}

impl Mnemonic {
    pub fn parse(text: &[u8]) -> Option<Mnemonic> {
        use Mnemonic::*;
        if text.len() != 3 {
            return None;
        }
        let mut upper = [0u8; 3];
        upper.copy_from_slice(text);
        upper.make_ascii_uppercase();
        match &upper {
            b"HLT" => Some(HLT),
            b"ADD" => Some(ADD),
            b"SUB" => Some(SUB),
            b"STA" => Some(STA),
            b"LDA" => Some(LDA),
            b"BRA" => Some(BRA),
            b"BRZ" => Some(BRZ),
            b"BRP" => Some(BRP),
            b"INP" => Some(INP),
            b"OUT" => Some(OUT),
            b"DAT" => Some(DAT),
            _ => None,
        }
    }

    /// The cell value written when the mnemonic is read. Operands are
    /// added on top of it.
    pub fn emit(self) -> Cell {
        use Mnemonic::*;
        match self {
            HLT => Opcode::Halt.prefix(),
            ADD => Opcode::Add.prefix(),
            SUB => Opcode::Sub.prefix(),
            STA => Opcode::Store.prefix(),
            LDA => Opcode::Load.prefix(),
            BRA => Opcode::Branch.prefix(),
            BRZ => Opcode::BranchZero.prefix(),
            BRP => Opcode::BranchPositive.prefix(),
            INP => opcode::encode(Opcode::Io, IO_INPUT),
            OUT => opcode::encode(Opcode::Io, IO_OUTPUT),
            DAT => 0,
        }
    }

    pub fn operand(self) -> Operand {
        use Mnemonic::*;
        match self {
            HLT | INP | OUT => Operand::None,
            DAT => Operand::Data,
            _ => Operand::Address,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(Mnemonic::parse(b"LDA"), Some(Mnemonic::LDA));
        assert_eq!(Mnemonic::parse(b"lda"), Some(Mnemonic::LDA));
        assert_eq!(Mnemonic::parse(b"bRz"), Some(Mnemonic::BRZ));
        assert_eq!(Mnemonic::parse(b"dat"), Some(Mnemonic::DAT));
        assert_eq!(Mnemonic::parse(b"NOP"), None);
        assert_eq!(Mnemonic::parse(b"LDAX"), None);
        assert_eq!(Mnemonic::parse(b"LD"), None);
        assert_eq!(Mnemonic::parse(b""), None);
    }

    #[test]
    fn test_emit() {
        assert_eq!(Mnemonic::HLT.emit(), 0);
        assert_eq!(Mnemonic::ADD.emit(), 100);
        assert_eq!(Mnemonic::SUB.emit(), 200);
        assert_eq!(Mnemonic::STA.emit(), 300);
        assert_eq!(Mnemonic::LDA.emit(), 500);
        assert_eq!(Mnemonic::BRA.emit(), 600);
        assert_eq!(Mnemonic::BRZ.emit(), 700);
        assert_eq!(Mnemonic::BRP.emit(), 800);
        assert_eq!(Mnemonic::INP.emit(), 901);
        assert_eq!(Mnemonic::OUT.emit(), 902);
        assert_eq!(Mnemonic::DAT.emit(), 0);
    }

    #[test]
    fn test_operand() {
        assert_eq!(Mnemonic::HLT.operand(), Operand::None);
        assert_eq!(Mnemonic::INP.operand(), Operand::None);
        assert_eq!(Mnemonic::OUT.operand(), Operand::None);
        assert_eq!(Mnemonic::DAT.operand(), Operand::Data);
        assert_eq!(Mnemonic::BRP.operand(), Operand::Address);
    }
}
