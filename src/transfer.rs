//! USB transfers over DWC2 host channels
//!
//! [`executor`] runs one DMA-backed transaction on a channel and classifies
//! how it ended; [`control`] composes those into SETUP/DATA/STATUS control
//! transfers. The request encodings here are bit-exact USB 2.0 chapter 9.

pub mod executor;
pub mod control;

pub use control::{packet_count, ControlPipe, ControlTarget};
pub use executor::{classify, ChannelExecutor, Completion, Payload, RetryPolicy};

/// Transfer direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Device to host
    In,
    /// Host to device
    Out,
}

impl Direction {
    /// The other direction
    pub const fn opposite(self) -> Self {
        match self {
            Self::In => Self::Out,
            Self::Out => Self::In,
        }
    }
}

/// Packet identifier as encoded in HCTSIZ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum Pid {
    /// DATA0
    Data0 = 0,
    /// DATA2 (high-bandwidth isochronous only)
    Data2 = 1,
    /// DATA1
    Data1 = 2,
    /// SETUP (MDATA on non-control endpoints)
    Setup = 3,
}

impl Pid {
    /// DATA0/DATA1 for a toggle bit
    pub const fn from_toggle(toggle: bool) -> Self {
        if toggle {
            Self::Data1
        } else {
            Self::Data0
        }
    }
}

/// Standard request codes (bRequest)
pub mod request {
    /// GET_STATUS
    pub const GET_STATUS: u8 = 0x00;
    /// CLEAR_FEATURE
    pub const CLEAR_FEATURE: u8 = 0x01;
    /// SET_FEATURE
    pub const SET_FEATURE: u8 = 0x03;
    /// SET_ADDRESS
    pub const SET_ADDRESS: u8 = 0x05;
    /// GET_DESCRIPTOR
    pub const GET_DESCRIPTOR: u8 = 0x06;
    /// SET_CONFIGURATION
    pub const SET_CONFIGURATION: u8 = 0x09;
}

/// Descriptor type codes
pub mod descriptor_type {
    /// Device descriptor
    pub const DEVICE: u8 = 0x01;
    /// Configuration descriptor
    pub const CONFIGURATION: u8 = 0x02;
    /// Interface descriptor
    pub const INTERFACE: u8 = 0x04;
    /// Endpoint descriptor
    pub const ENDPOINT: u8 = 0x05;
    /// HID class descriptor
    pub const HID: u8 = 0x21;
    /// Hub class descriptor
    pub const HUB: u8 = 0x29;
}

/// USB Setup packet for control transfers
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SetupPacket {
    /// bmRequestType
    pub request_type: u8,
    /// bRequest
    pub request: u8,
    /// wValue
    pub value: u16,
    /// wIndex
    pub index: u16,
    /// wLength
    pub length: u16,
}

impl SetupPacket {
    /// Wire size of a setup packet
    pub const SIZE: usize = 8;

    /// Arbitrary request
    pub const fn new(request_type: u8, request: u8, value: u16, index: u16, length: u16) -> Self {
        Self {
            request_type,
            request,
            value,
            index,
            length,
        }
    }

    /// GET_DESCRIPTOR (standard, device recipient)
    pub const fn get_descriptor(desc_type: u8, desc_index: u8, length: u16) -> Self {
        Self::new(
            0x80,
            request::GET_DESCRIPTOR,
            ((desc_type as u16) << 8) | desc_index as u16,
            0,
            length,
        )
    }

    /// GET_DESCRIPTOR(DEVICE)
    pub const fn get_device_descriptor(length: u16) -> Self {
        Self::get_descriptor(descriptor_type::DEVICE, 0, length)
    }

    /// GET_DESCRIPTOR(CONFIGURATION, 0)
    pub const fn get_configuration_descriptor(length: u16) -> Self {
        Self::get_descriptor(descriptor_type::CONFIGURATION, 0, length)
    }

    /// SET_ADDRESS
    pub const fn set_address(address: u8) -> Self {
        Self::new(0x00, request::SET_ADDRESS, address as u16, 0, 0)
    }

    /// SET_CONFIGURATION
    pub const fn set_configuration(config: u8) -> Self {
        Self::new(0x00, request::SET_CONFIGURATION, config as u16, 0, 0)
    }

    /// Direction of the DATA stage as encoded in bmRequestType bit 7
    pub const fn direction(&self) -> Direction {
        if self.request_type & 0x80 != 0 {
            Direction::In
        } else {
            Direction::Out
        }
    }

    /// Little-endian wire encoding
    pub const fn to_bytes(&self) -> [u8; 8] {
        let value = self.value.to_le_bytes();
        let index = self.index.to_le_bytes();
        let length = self.length.to_le_bytes();
        [
            self.request_type,
            self.request,
            value[0],
            value[1],
            index[0],
            index[1],
            length[0],
            length[1],
        ]
    }
}

/// Optional DATA stage of a control transfer
#[derive(Debug)]
pub enum DataStage<'a> {
    /// No DATA stage
    None,
    /// Device to host into this buffer
    In(&'a mut [u8]),
    /// Host to device from this buffer
    Out(&'a [u8]),
}

impl DataStage<'_> {
    /// Requested length
    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::In(buf) => buf.len(),
            Self::Out(buf) => buf.len(),
        }
    }

    /// Stage carries no bytes
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
