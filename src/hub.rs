//! USB hub class support
//!
//! Port status decoding, port feature selectors, the hub descriptor and the
//! class requests the enumeration engine issues against hub ports. The root
//! port's HPRT register is normalized into the same [`PortStatus`] so one
//! port state machine serves both.
//!
//! # Port bring-up
//!
//! ```text
//! SET_FEATURE(PORT_POWER) → wait → GET_STATUS → connected?
//!   → SET_FEATURE(PORT_RESET) → wait → GET_STATUS
//!   → CLEAR_FEATURE(C_PORT_RESET) → enabled? → decode speed
//! ```

use crate::dwc2::HPrt;
use crate::error::{Result, UsbError};
use crate::transfer::{descriptor_type, request, SetupPacket};

/// USB Hub Class Code
pub const HUB_CLASS: u8 = 0x09;

/// bmRequestType for hub class requests to the hub itself
const HUB_CLASS_IN: u8 = 0xA0;
/// bmRequestType for class requests to a hub port, IN
const PORT_CLASS_IN: u8 = 0xA3;
/// bmRequestType for class requests to a hub port, OUT
const PORT_CLASS_OUT: u8 = 0x23;

/// Port feature selectors for SET_FEATURE/CLEAR_FEATURE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum PortFeature {
    /// PORT_CONNECTION
    PortConnection = 0,
    /// PORT_ENABLE
    PortEnable = 1,
    /// PORT_SUSPEND
    PortSuspend = 2,
    /// PORT_OVER_CURRENT
    PortOverCurrent = 3,
    /// PORT_RESET
    PortReset = 4,
    /// PORT_POWER
    PortPower = 8,
    /// PORT_LOW_SPEED
    PortLowSpeed = 9,
    /// C_PORT_CONNECTION
    CPortConnection = 16,
    /// C_PORT_ENABLE
    CPortEnable = 17,
    /// C_PORT_SUSPEND
    CPortSuspend = 18,
    /// C_PORT_OVER_CURRENT
    CPortOverCurrent = 19,
    /// C_PORT_RESET
    CPortReset = 20,
}

/// USB device speeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceSpeed {
    /// 1.5 Mbps
    Low,
    /// 12 Mbps
    Full,
    /// 480 Mbps
    High,
}

/// Port status (wPortStatus) and change (wPortChange) words
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortStatus {
    /// wPortStatus
    pub status: u16,
    /// wPortChange
    pub change: u16,
}

impl PortStatus {
    /// PORT_CONNECTION
    pub const CONNECTION: u16 = 1 << 0;
    /// PORT_ENABLE
    pub const ENABLE: u16 = 1 << 1;
    /// PORT_OVER_CURRENT
    pub const OVER_CURRENT: u16 = 1 << 3;
    /// PORT_RESET
    pub const RESET: u16 = 1 << 4;
    /// PORT_POWER
    pub const POWER: u16 = 1 << 8;
    /// PORT_LOW_SPEED
    pub const LOW_SPEED: u16 = 1 << 9;
    /// PORT_HIGH_SPEED
    pub const HIGH_SPEED: u16 = 1 << 10;
    /// C_PORT_RESET in wPortChange
    pub const C_RESET: u16 = 1 << 4;

    /// Parse the 4-byte GET_STATUS response
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < 4 {
            return Err(UsbError::ShortTransfer);
        }
        Ok(Self {
            status: u16::from_le_bytes([data[0], data[1]]),
            change: u16::from_le_bytes([data[2], data[3]]),
        })
    }

    /// Normalize the root port register (speed field 0 = high, 1 = full,
    /// 2 = low)
    pub fn from_root(hprt: HPrt) -> Self {
        let mut status = 0;
        if hprt.contains(HPrt::CONNSTS) {
            status |= Self::CONNECTION;
        }
        if hprt.contains(HPrt::ENA) {
            status |= Self::ENABLE;
        }
        if hprt.contains(HPrt::OVRCURRACT) {
            status |= Self::OVER_CURRENT;
        }
        if hprt.contains(HPrt::RST) {
            status |= Self::RESET;
        }
        if hprt.contains(HPrt::PWR) {
            status |= Self::POWER;
        }
        match hprt.speed_field() {
            0 => status |= Self::HIGH_SPEED,
            2 => status |= Self::LOW_SPEED,
            _ => {}
        }
        let mut change = 0;
        if hprt.contains(HPrt::CONNDET) {
            change |= 1 << 0;
        }
        if hprt.contains(HPrt::ENCHNG) {
            change |= 1 << 1;
        }
        Self { status, change }
    }

    /// A device is attached
    pub const fn connected(&self) -> bool {
        self.status & Self::CONNECTION != 0
    }

    /// The port is enabled
    pub const fn enabled(&self) -> bool {
        self.status & Self::ENABLE != 0
    }

    /// Speed of the attached device
    ///
    /// Low and high are exclusive on real hardware; if both are reported the
    /// port is treated as full speed.
    pub const fn speed(&self) -> DeviceSpeed {
        let low = self.status & Self::LOW_SPEED != 0;
        let high = self.status & Self::HIGH_SPEED != 0;
        match (low, high) {
            (true, false) => DeviceSpeed::Low,
            (false, true) => DeviceSpeed::High,
            (false, false) | (true, true) => DeviceSpeed::Full,
        }
    }
}

/// Hub descriptor (USB 2.0, 11.23.2.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HubDescriptor {
    /// bNbrPorts
    pub num_ports: u8,
    /// wHubCharacteristics
    pub characteristics: u16,
    /// bPwrOn2PwrGood, in 2 ms units
    pub power_on_to_good: u8,
    /// bHubContrCurrent
    pub hub_control_current: u8,
}

impl HubDescriptor {
    /// Smallest valid hub descriptor
    pub const MIN_LENGTH: usize = 7;
    /// Bytes requested from the hub
    pub const REQUEST_LENGTH: u16 = 9;

    /// Parse a hub descriptor
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::MIN_LENGTH {
            return Err(UsbError::ShortTransfer);
        }
        if data[1] != descriptor_type::HUB {
            return Err(UsbError::InvalidDescriptor);
        }
        Ok(Self {
            num_ports: data[2],
            characteristics: u16::from_le_bytes([data[3], data[4]]),
            power_on_to_good: data[5],
            hub_control_current: data[6],
        })
    }
}

/// GET_DESCRIPTOR(HUB)
pub const fn get_hub_descriptor(length: u16) -> SetupPacket {
    SetupPacket::new(
        HUB_CLASS_IN,
        request::GET_DESCRIPTOR,
        (descriptor_type::HUB as u16) << 8,
        0,
        length,
    )
}

/// GET_STATUS on a hub port
pub const fn get_port_status(port: u8) -> SetupPacket {
    SetupPacket::new(PORT_CLASS_IN, request::GET_STATUS, 0, port as u16, 4)
}

/// SET_FEATURE on a hub port
pub const fn set_port_feature(port: u8, feature: PortFeature) -> SetupPacket {
    SetupPacket::new(PORT_CLASS_OUT, request::SET_FEATURE, feature as u16, port as u16, 0)
}

/// CLEAR_FEATURE on a hub port
pub const fn clear_port_feature(port: u8, feature: PortFeature) -> SetupPacket {
    SetupPacket::new(PORT_CLASS_OUT, request::CLEAR_FEATURE, feature as u16, port as u16, 0)
}
