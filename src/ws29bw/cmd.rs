//! Controller command bytes, sent with D/C low

pub struct Cmd;
impl Cmd {
    // Init
    pub const DRIVER_OUTPUT_CONTROL: u8 = 0x01;
    pub const BOOSTER_SOFT_START_CONTROL: u8 = 0x0C;
    pub const DEEP_SLEEP_MODE: u8 = 0x10;
    pub const DATA_ENTRY_MODE: u8 = 0x11;
    pub const WRITE_VCOM_REGISTER: u8 = 0x2C;
    pub const WRITE_LUT_REGISTER: u8 = 0x32;
    pub const SET_DUMMY_LINE_PERIOD: u8 = 0x3A;
    pub const SET_GATE_TIME: u8 = 0x3B;
    pub const BORDER_WAVEFORM_CONTROL: u8 = 0x3C;

    // RAM addressing
    pub const SET_RAMX_START_END: u8 = 0x44;
    pub const SET_RAMY_START_END: u8 = 0x45;
    pub const SET_RAMX_COUNTER: u8 = 0x4E;
    pub const SET_RAMY_COUNTER: u8 = 0x4F;

    // Update
    pub const WRITE_RAM: u8 = 0x24;
    pub const DISPLAY_UPDATE_CTRL2: u8 = 0x22;
    pub const MASTER_ACTIVATE: u8 = 0x20;
    pub const TERMINATE_FRAME_READ_WRITE: u8 = 0xFF;
}
