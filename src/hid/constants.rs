//! HID class codes and class requests (HID 1.11, section 7.2)

use crate::transfer::SetupPacket;

/// HID interface class code
pub const HID_CLASS: u8 = 0x03;

/// Boot interface subclass
pub const HID_SUBCLASS_BOOT: u8 = 0x01;

/// Boot keyboard report length
pub const BOOT_REPORT_LEN: usize = 8;

/// bmRequestType for class requests to an interface, OUT
const CLASS_INTERFACE_OUT: u8 = 0x21;

/// HID protocol codes (bInterfaceProtocol)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum HidProtocol {
    /// No protocol
    None = 0x00,
    /// Keyboard protocol
    Keyboard = 0x01,
    /// Mouse protocol
    Mouse = 0x02,
}

/// HID class-specific requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum HidRequest {
    /// GET_REPORT
    GetReport = 0x01,
    /// GET_IDLE
    GetIdle = 0x02,
    /// GET_PROTOCOL
    GetProtocol = 0x03,
    /// SET_REPORT
    SetReport = 0x09,
    /// SET_IDLE
    SetIdle = 0x0A,
    /// SET_PROTOCOL
    SetProtocol = 0x0B,
}

/// HID protocol modes for SET_PROTOCOL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum HidProtocolMode {
    /// Boot protocol
    Boot = 0x00,
    /// Report protocol
    Report = 0x01,
}

/// SET_PROTOCOL on `interface`
pub const fn set_protocol(interface: u8, mode: HidProtocolMode) -> SetupPacket {
    SetupPacket::new(
        CLASS_INTERFACE_OUT,
        HidRequest::SetProtocol as u8,
        mode as u16,
        interface as u16,
        0,
    )
}

/// SET_IDLE on `interface`; duration 0 reports only on change
pub const fn set_idle(interface: u8, duration: u8, report_id: u8) -> SetupPacket {
    SetupPacket::new(
        CLASS_INTERFACE_OUT,
        HidRequest::SetIdle as u8,
        ((duration as u16) << 8) | report_id as u16,
        interface as u16,
        0,
    )
}
