//! The Little Man Computer itself: cell encoding, the memory image
//! and the interpreter that executes it.

pub mod interpreter;
pub mod memory;
pub mod opcode;

pub use self::interpreter::{Halt, Machine, Step};
pub use self::memory::{Cell, Memory};
