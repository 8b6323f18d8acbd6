pub mod error;
pub mod gameboy;
pub mod lr35902;
pub mod memory;
