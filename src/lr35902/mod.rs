pub mod alu;
pub mod cpu;
mod handlers;
pub mod irq;
pub mod registers;
pub mod sm83;

pub const T_CYCLES_PER_SECOND: usize = 4_194_304;
pub const T_CYCLES_PER_FRAME: usize = 70_224;

/// Cost of pushing PC and jumping to an interrupt vector.
pub const INTERRUPT_DISPATCH_CYCLES: usize = 20;
/// A halted CPU burns one machine cycle per step.
pub const HALT_IDLE_CYCLES: usize = 4;
