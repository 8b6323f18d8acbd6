use bitflags::bitflags;

bitflags! {
    /// Interrupt sources as laid out in IE ($FFFF) and IF ($FF0F). Bit order
    /// is also dispatch priority, lowest bit first.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct InterruptFlags: u8 {
        const VBLANK    = 0b00001;
        const LCD_STAT  = 0b00010;
        const TIMER     = 0b00100;
        const SERIAL    = 0b01000;
        const JOYPAD    = 0b10000;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct LcdControl: u8 {
        const BG_DISPLAY = 0b0000_0001;
        const OBJ_DISPLAY = 0b0000_0010;
        const OBJ_SIZE = 0b0000_0100;
        const BG_TILE_MAP = 0b0000_1000;
        const BG_TILE_DATA = 0b0001_0000;
        const WINDOW_DISPLAY = 0b0010_0000;
        const WINDOW_TILE_MAP = 0b0100_0000;
        const LCD_DISPLAY = 0b1000_0000;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct SerialControl: u8 {
        const INTERNAL_CLOCK = 0b0000_0001;
        const TRANSFER_ENABLE = 0b1000_0000;
    }
}

impl From<u8> for InterruptFlags {
    fn from(byte: u8) -> Self {
        Self::from_bits_truncate(byte)
    }
}

impl From<u8> for LcdControl {
    fn from(byte: u8) -> Self {
        Self::from_bits_truncate(byte)
    }
}

impl From<u8> for SerialControl {
    fn from(byte: u8) -> Self {
        Self::from_bits_truncate(byte)
    }
}

/// Bits of each I/O port ($FF00-$FF7F) that read back as 1 on a DMG no
/// matter what was written. Unmapped ports read as $FF.
#[rustfmt::skip]
pub const IO_READ_MASKS: [u8; 0x80] = [
    // $FF00: P1 SB SC -- DIV TIMA TMA TAC -- -- -- -- -- -- -- IF
    0xc0, 0x00, 0x7e, 0xff, 0x00, 0x00, 0x00, 0xf8, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xe0,
    // $FF10: NR10-NR14, --, NR21-NR24, NR30-NR34, --
    0x80, 0x3f, 0x00, 0xff, 0xbf, 0xff, 0x3f, 0x00, 0xff, 0xbf, 0x7f, 0xff, 0x9f, 0xff, 0xbf, 0xff,
    // $FF20: NR41-NR44, NR50-NR52, --
    0xff, 0x00, 0x00, 0xbf, 0x00, 0x00, 0x70, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    // $FF30: wave RAM
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    // $FF40: LCDC STAT SCY SCX LY LYC DMA BGP OBP0 OBP1 WY WX, then CGB-only ports
    0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff,
    // $FF50: boot ROM switch and CGB-only ports
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
];

/// I/O port contents left behind by the DMG boot ROM.
#[rustfmt::skip]
pub const IO_POST_BOOT: [(u16, u8); 21] = [
    (0xff00, 0xcf), (0xff02, 0x7e), (0xff04, 0xab), (0xff07, 0xf8), (0xff0f, 0xe1),
    (0xff10, 0x80), (0xff11, 0xbf), (0xff12, 0xf3), (0xff14, 0xbf), (0xff16, 0x3f),
    (0xff19, 0xbf), (0xff1a, 0x7f), (0xff1c, 0x9f), (0xff1e, 0xbf), (0xff24, 0x77),
    (0xff25, 0xf3), (0xff26, 0xf1), (0xff40, 0x91), (0xff41, 0x85), (0xff47, 0xfc),
    (0xff50, 0x01),
];
