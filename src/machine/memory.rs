//! The memory image shared by the assembler and the interpreter.
use std::fmt;

/// Storage width of both memory cells and the register. Only 0..=999
/// is ever assembled, the extra headroom is where ADD/SUB wrap.
pub type Cell = u16;

/// Largest value a source literal may place in a cell.
pub const MAX_CELL: Cell = 999;

/// Two operand digits cannot address more than this.
pub const MAX_MEMORY: usize = 100;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CapacityError(pub usize);

impl fmt::Display for CapacityError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "memory size must be between 1 and {} cells, got {}", MAX_MEMORY, self.0)
    }
}

impl std::error::Error for CapacityError {}

/// A fixed number of cells followed by a guard cell that always holds
/// HLT, so execution can never fall off the end of valid memory.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Memory {
    cells: Vec<Cell>,
}

impl Memory {
    pub fn new(size: usize) -> Result<Self, CapacityError> {
        if size == 0 || size > MAX_MEMORY {
            return Err(CapacityError(size));
        }
        Ok(Memory { cells: vec![0; size + 1] })
    }

    /// Usable capacity, not counting the guard cell.
    pub fn len(&self) -> usize {
        self.cells.len() - 1
    }

    /// Reads a cell. Out-of-range reads, including the guard, give HLT.
    pub fn get(&self, address: usize) -> Cell {
        if address < self.len() {
            self.cells[address]
        } else {
            0
        }
    }

    /// Writes a cell. Writes outside the usable range are dropped so the
    /// guard keeps holding HLT; returns whether the write landed.
    pub fn set(&mut self, address: usize, value: Cell) -> bool {
        if address < self.len() {
            self.cells[address] = value;
            true
        } else {
            false
        }
    }

    /// The usable cells, without the guard.
    pub fn cells(&self) -> &[Cell] {
        &self.cells[..self.len()]
    }
}
