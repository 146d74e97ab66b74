//! Register data bytes for the 2.9" panel

pub struct Flag;
impl Flag {
    /// Soft start phases A, B and C
    pub const BOOSTER_SOFT_START: [u8; 3] = [0xD7, 0xD6, 0x9D];
    /// VCOM = -3.2V
    pub const VCOM: u8 = 0xA8;
    /// 4 dummy lines per gate
    pub const DUMMY_LINE_PERIOD: u8 = 0x1A;
    /// 2us per line
    pub const GATE_TIME: u8 = 0x08;
    /// Follow LUT, keep the border white
    pub const BORDER_WAVEFORM: u8 = 0x03;
    /// X increment, Y increment, counter moves along X first
    pub const DATA_ENTRY_INCRY_INCRX: u8 = 0x03;
    /// Driver output control, third byte: GD=0, SM=0, TB=0
    pub const DRIVER_OUTPUT_SCAN: u8 = 0x00;
    /// Enable clock and analog, display with the full LUT, disable both
    pub const DISPLAY_UPDATE_FULL: u8 = 0xC4;
    /// Deep sleep mode 1, RAM retained
    pub const DEEP_SLEEP_MODE_1: u8 = 0x01;

    /// Full update waveform
    pub const LUT_FULL_UPDATE: [u8; 30] = [
        0x02, 0x02, 0x01, 0x11, 0x12, 0x12, 0x22, 0x22, // VS phases
        0x66, 0x69, 0x69, 0x59, 0x58, 0x99, 0x99, 0x88, //
        0x00, 0x00, 0x00, 0x00, // padding
        0xF8, 0xB4, 0x13, 0x51, 0x35, 0x51, 0x51, 0x19, 0x01, 0x00, // TP phases
    ];
}
