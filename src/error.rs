use crate::lr35902::sm83::Operand;
use snafu::prelude::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AyyError {
    #[snafu(display("Failed to decode instruction ({:02x}) at address: ${:04x}", opcode, address))]
    DecoderFailure { opcode: u8, address: u16 },
    #[snafu(display("Unknown register bits: {:03b}", data))]
    UnknownRegisterBits { data: u8 },
    #[snafu(display("Unknown condition bits: {:02b}", data))]
    UnknownConditionBits { data: u8 },
    #[snafu(display("Invalid operand for {}: {:?}", handler, operand))]
    InvalidOperand { handler: &'static str, operand: Option<Operand> },
    #[snafu(display("Unknown cartridge type: ${:02x}", code))]
    UnknownCartridgeType { code: u8 },
    #[snafu(display("Unknown ROM size code: ${:02x}", code))]
    UnknownRomSize { code: u8 },
    #[snafu(display("Unknown RAM size code: ${:02x}", code))]
    UnknownRamSize { code: u8 },
    #[snafu(display("ROM image is too small to contain a header ({} bytes)", length))]
    MissingHeader { length: usize },
    #[snafu(display("ROM image is truncated: header declares {} bytes, got {}", declared, actual))]
    TruncatedRom { declared: usize, actual: usize },
}
