//! Fetch-decode-execute loop over a memory image.
use std::fmt;
use std::io::{self, Read, Write};

use super::memory::{Cell, Memory};
use super::opcode::{self, Opcode, IO_INPUT, IO_OUTPUT};

/// Why a machine stopped. Only `Instruction` is a program asking to stop,
/// every other variant means execution ran off the rails.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Halt {
    Instruction,
    PcOutOfRange,
    OperandOutOfRange,
    InvalidOpcode,
    InvalidIo,
    InputExhausted,
    InputFailed,
    OutputFailed,
}

impl Halt {
    pub fn is_clean(self) -> bool {
        self == Halt::Instruction
    }
}

impl fmt::Display for Halt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Halt::*;
        let text = match self {
            Instruction       => "halted",
            PcOutOfRange      => "program counter left memory",
            OperandOutOfRange => "operand outside of memory",
            InvalidOpcode     => "invalid opcode",
            InvalidIo         => "invalid I/O operation",
            InputExhausted    => "input exhausted",
            InputFailed       => "reading input failed",
            OutputFailed      => "writing output failed",
        };
        f.write_str(text)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Step {
    Continue,
    Halted(Halt),
}

/// One LMC: memory, accumulator and program counter. Once halted it
/// stays halted.
#[derive(Clone, Debug)]
pub struct Machine {
    memory: Memory,
    register: Cell,
    pc: usize,
    halted: Option<Halt>,
}

impl Machine {
    pub fn new(memory: Memory) -> Self {
        Machine { memory, register: 0, pc: 0, halted: None }
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn register(&self) -> Cell {
        self.register
    }

    pub fn set_register(&mut self, value: Cell) {
        self.register = value;
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn set_pc(&mut self, pc: usize) {
        self.pc = pc;
    }

    /// Executes a single cell.
    pub fn step<I: Read, O: Write>(&mut self, input: &mut I, output: &mut O) -> Step {
        if let Some(reason) = self.halted {
            return Step::Halted(reason);
        }

        match self.execute(input, output) {
            Ok(()) => Step::Continue,
            Err(reason) => {
                debug!("machine stopped at pc {}: {}", self.pc, reason);
                self.halted = Some(reason);
                Step::Halted(reason)
            }
        }
    }

    /// Steps until the machine halts, flushing the output once done.
    pub fn run<I: Read, O: Write>(&mut self, input: &mut I, output: &mut O) -> Halt {
        let reason = loop {
            if let Step::Halted(reason) = self.step(input, output) {
                break reason;
            }
        };
        if let Err(e) = output.flush() {
            warn!("unable to flush output: {}", e);
        }
        reason
    }

    fn execute<I: Read, O: Write>(&mut self, input: &mut I, output: &mut O) -> Result<(), Halt> {
        let memlen = self.memory.len();
        if self.pc >= memlen {
            return Err(Halt::PcOutOfRange);
        }

        let code = self.memory.get(self.pc);
        self.pc += 1;

        let (digit, operand) = opcode::decode(code);
        let address = operand as usize;
        if address >= memlen {
            return Err(Halt::OperandOutOfRange);
        }

        let op = Opcode::from_digit(digit).ok_or(Halt::InvalidOpcode)?;
        trace!("{:02}: {} (reg {})", self.pc - 1, opcode::describe(code), self.register);

        match op {
            Opcode::Halt => return Err(Halt::Instruction),
            Opcode::Add => self.register = self.register.wrapping_add(self.memory.get(address)),
            Opcode::Sub => self.register = self.register.wrapping_sub(self.memory.get(address)),
            Opcode::Store => {
                self.memory.set(address, self.register);
            }
            Opcode::Load => self.register = self.memory.get(address),
            Opcode::Branch => self.pc = address,
            Opcode::BranchZero => {
                if self.register == 0 {
                    self.pc = address;
                }
            }
            Opcode::BranchPositive => {
                if self.register > 0 {
                    self.pc = address;
                }
            }
            Opcode::Io => match operand {
                IO_INPUT => self.register = read_input(input, output)?,
                IO_OUTPUT => write_output(output, self.register)?,
                _ => return Err(Halt::InvalidIo),
            },
        }
        Ok(())
    }
}

/// Pending output is flushed first so prompts are visible before blocking.
fn read_input<I: Read, O: Write>(input: &mut I, output: &mut O) -> Result<Cell, Halt> {
    if let Err(e) = output.flush() {
        warn!("unable to flush output before reading input: {}", e);
    }

    let mut byte = [0u8; 1];
    loop {
        match input.read(&mut byte) {
            Ok(0) => return Err(Halt::InputExhausted),
            Ok(_) => break,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("unable to read input: {}", e);
                return Err(Halt::InputFailed);
            }
        }
    }

    Ok(Cell::from(byte[0]))
}

fn write_output<O: Write>(output: &mut O, register: Cell) -> Result<(), Halt> {
    output.write_all(&[register as u8]).map_err(|e| {
        warn!("unable to write output: {}", e);
        Halt::OutputFailed
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::memory::MAX_MEMORY;

    fn machine(cells: &[Cell]) -> Machine {
        let mut memory = Memory::new(cells.len().max(1)).unwrap();
        for (i, c) in cells.iter().enumerate() {
            memory.set(i, *c);
        }
        Machine::new(memory)
    }

    fn run(m: &mut Machine, input: &[u8]) -> (Halt, Vec<u8>) {
        let mut input = input;
        let mut output = Vec::new();
        let reason = m.run(&mut input, &mut output);
        (reason, output)
    }

    #[test]
    fn test_io_echo() {
        let mut m = machine(&[901, 902, 0]);
        let (reason, out) = run(&mut m, &[65]);
        assert_eq!(reason, Halt::Instruction);
        assert_eq!(out, b"A");
        assert_eq!(m.register(), 65);
        assert_eq!(m.pc(), 3);
    }

    #[test]
    fn test_input_exhausted() {
        let mut m = machine(&[901, 902, 0]);
        let (reason, out) = run(&mut m, &[]);
        assert_eq!(reason, Halt::InputExhausted);
        assert!(out.is_empty());
        assert!(!reason.is_clean());
    }

    #[test]
    fn test_output_low_byte() {
        // LDA 3, OUT, HLT, DAT 321
        let mut m = machine(&[503, 902, 0, 321]);
        let (_, out) = run(&mut m, &[]);
        assert_eq!(out, vec![(321u16 & 0xFF) as u8]);
    }

    #[test]
    fn test_halt_is_terminal() {
        let mut m = machine(&[0, 902, 0]);
        let mut input: &[u8] = &[];
        let mut output = Vec::new();
        assert_eq!(m.step(&mut input, &mut output), Step::Halted(Halt::Instruction));
        let pc = m.pc();
        let reg = m.register();
        for _ in 0..5 {
            assert_eq!(m.step(&mut input, &mut output), Step::Halted(Halt::Instruction));
        }
        assert_eq!(m.pc(), pc);
        assert_eq!(m.register(), reg);
        assert!(output.is_empty());
    }

    #[test]
    fn test_pc_at_boundary_halts() {
        let mut input: &[u8] = &[];
        let mut output = Vec::new();
        for size in 1..=MAX_MEMORY {
            // Fill memory with ADD 0 so nothing halts on its own.
            let mut m = machine(&vec![100; size]);
            m.set_pc(size);
            assert_eq!(m.step(&mut input, &mut output), Step::Halted(Halt::PcOutOfRange));
            assert_eq!(m.pc(), size);

            let mut m = machine(&vec![100; size]);
            assert_eq!(m.run(&mut input, &mut output), Halt::PcOutOfRange);
            assert_eq!(m.pc(), size);
        }
    }

    #[test]
    fn test_operand_out_of_range() {
        // LDA 5 in a 3 cell machine.
        let mut m = machine(&[505, 0, 0]);
        let (reason, _) = run(&mut m, &[]);
        assert_eq!(reason, Halt::OperandOutOfRange);
        assert_eq!(m.register(), 0);
    }

    #[test]
    fn test_invalid_opcodes() {
        let mut m = machine(&[401, 0]);
        assert_eq!(run(&mut m, &[]).0, Halt::InvalidOpcode);

        let mut m = machine(&[903, 0, 0, 0]);
        assert_eq!(run(&mut m, &[]).0, Halt::InvalidIo);

        let mut m = machine(&[900, 0]);
        assert_eq!(run(&mut m, &[]).0, Halt::InvalidIo);
    }

    #[test]
    fn test_add_sub_store_load() {
        // LDA 6, ADD 7, STA 8, SUB 6, HLT, 0, 40, 2, 0
        let mut m = machine(&[506, 107, 308, 206, 0, 0, 40, 2, 0]);
        let (reason, _) = run(&mut m, &[]);
        assert_eq!(reason, Halt::Instruction);
        assert_eq!(m.memory().get(8), 42);
        assert_eq!(m.register(), 2);
    }

    #[test]
    fn test_arithmetic_wraps() {
        // LDA 4, SUB 5, HLT, 0, 0, 1
        let mut m = machine(&[504, 205, 0, 0, 0, 1]);
        run(&mut m, &[]);
        assert_eq!(m.register(), Cell::MAX);

        let mut m = machine(&[103, 0, 0, 1]);
        m.set_register(Cell::MAX);
        run(&mut m, &[]);
        assert_eq!(m.register(), 0);

        // 999 + 999 does not wrap at 999.
        let mut m = machine(&[503, 103, 0, 999]);
        run(&mut m, &[]);
        assert_eq!(m.register(), 1998);
    }

    #[test]
    fn test_branch() {
        let mut m = machine(&[603, 0, 0, 0]);
        let mut input: &[u8] = &[];
        let mut output = Vec::new();
        assert_eq!(m.step(&mut input, &mut output), Step::Continue);
        assert_eq!(m.pc(), 3);
    }

    fn branch_taken(code: Cell, register: Cell) -> bool {
        let mut m = machine(&[code, 0, 0, 0, 0]);
        m.set_register(register);
        let mut input: &[u8] = &[];
        let mut output = Vec::new();
        assert_eq!(m.step(&mut input, &mut output), Step::Continue);
        m.pc() == 4
    }

    #[test]
    fn test_branch_zero() {
        assert!(branch_taken(704, 0));
        assert!(!branch_taken(704, 1));
        assert!(!branch_taken(704, Cell::MAX));
    }

    #[test]
    fn test_branch_positive() {
        assert!(!branch_taken(804, 0));
        assert!(branch_taken(804, 1));
        assert!(branch_taken(804, Cell::MAX));
    }

    #[test]
    fn test_countdown_loop() {
        // Prints 'C', 'B', 'A' by counting the register down from 67.
        // 0: LDA 9   1: OUT   2: SUB 10   3: STA 9   4: SUB 11
        // 5: BRP 0   6: HLT   9: 67   10: 1   11: 64
        let mut m = machine(&[509, 902, 210, 309, 211, 800, 0, 0, 0, 67, 1, 64]);
        let (reason, out) = run(&mut m, &[]);
        assert_eq!(reason, Halt::Instruction);
        assert_eq!(out, b"CBA");
    }
}
