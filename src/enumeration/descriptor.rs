//! Standard descriptors and the configuration descriptor walk

use crate::config::CONFIG_DESCRIPTOR_CAP;
use crate::error::{Result, UsbError};
use crate::hid::{HidProtocol, HID_CLASS};
use crate::hub::HUB_CLASS;
use crate::transfer::descriptor_type;

/// Bytes of the device descriptor needed to learn bMaxPacketSize0
pub const DEVICE_DESCRIPTOR_PREFIX: usize = 8;

/// Device descriptor (USB 2.0, 9.6.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(missing_docs)]
pub struct DeviceDescriptor {
    pub bcd_usb: u16,
    pub b_device_class: u8,
    pub b_device_sub_class: u8,
    pub b_device_protocol: u8,
    pub b_max_packet_size0: u8,
    pub id_vendor: u16,
    pub id_product: u16,
    pub bcd_device: u16,
    pub b_num_configurations: u8,
}

impl DeviceDescriptor {
    /// Full descriptor length
    pub const LENGTH: usize = 18;

    /// Parse a full 18-byte device descriptor
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::LENGTH {
            return Err(UsbError::ShortTransfer);
        }
        if data[1] != descriptor_type::DEVICE {
            return Err(UsbError::InvalidDescriptor);
        }
        Ok(Self {
            bcd_usb: u16::from_le_bytes([data[2], data[3]]),
            b_device_class: data[4],
            b_device_sub_class: data[5],
            b_device_protocol: data[6],
            b_max_packet_size0: data[7],
            id_vendor: u16::from_le_bytes([data[8], data[9]]),
            id_product: u16::from_le_bytes([data[10], data[11]]),
            bcd_device: u16::from_le_bytes([data[12], data[13]]),
            b_num_configurations: data[17],
        })
    }

    /// bMaxPacketSize0 from the first 8 bytes, all a device must answer
    /// with before it has an address
    pub fn max_packet_size_from_prefix(data: &[u8]) -> Result<u8> {
        if data.len() < DEVICE_DESCRIPTOR_PREFIX {
            return Err(UsbError::ShortTransfer);
        }
        if data[1] != descriptor_type::DEVICE {
            return Err(UsbError::InvalidDescriptor);
        }
        Ok(data[7])
    }

    /// Device-level class is Hub
    pub fn is_hub(&self) -> bool {
        self.b_device_class == HUB_CLASS
    }
}

/// Configuration descriptor header (USB 2.0, 9.6.3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(missing_docs)]
pub struct ConfigurationDescriptor {
    pub b_length: u8,
    pub w_total_length: u16,
    pub b_num_interfaces: u8,
    pub b_configuration_value: u8,
    pub bm_attributes: u8,
    pub b_max_power: u8,
}

impl ConfigurationDescriptor {
    /// Header length
    pub const LENGTH: usize = 9;

    /// Parse the header
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::LENGTH {
            return Err(UsbError::ShortTransfer);
        }
        if data[1] != descriptor_type::CONFIGURATION || (data[0] as usize) < Self::LENGTH {
            return Err(UsbError::InvalidDescriptor);
        }
        Ok(Self {
            b_length: data[0],
            w_total_length: u16::from_le_bytes([data[2], data[3]]),
            b_num_interfaces: data[4],
            b_configuration_value: data[5],
            bm_attributes: data[7],
            b_max_power: data[8],
        })
    }
}

/// Interface descriptor (USB 2.0, 9.6.5)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(missing_docs)]
pub struct InterfaceDescriptor {
    pub b_interface_number: u8,
    pub b_alternate_setting: u8,
    pub b_num_endpoints: u8,
    pub b_interface_class: u8,
    pub b_interface_sub_class: u8,
    pub b_interface_protocol: u8,
}

impl InterfaceDescriptor {
    /// Descriptor length
    pub const LENGTH: usize = 9;

    /// Parse an interface descriptor
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::LENGTH {
            return Err(UsbError::ShortTransfer);
        }
        if data[1] != descriptor_type::INTERFACE {
            return Err(UsbError::InvalidDescriptor);
        }
        Ok(Self {
            b_interface_number: data[2],
            b_alternate_setting: data[3],
            b_num_endpoints: data[4],
            b_interface_class: data[5],
            b_interface_sub_class: data[6],
            b_interface_protocol: data[7],
        })
    }

    /// HID interface speaking the keyboard boot protocol
    pub fn is_boot_keyboard(&self) -> bool {
        self.b_interface_class == HID_CLASS
            && self.b_interface_protocol == HidProtocol::Keyboard as u8
    }
}

/// Endpoint descriptor (USB 2.0, 9.6.6)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(missing_docs)]
pub struct EndpointDescriptor {
    pub b_endpoint_address: u8,
    pub bm_attributes: u8,
    pub w_max_packet_size: u16,
    pub b_interval: u8,
}

impl EndpointDescriptor {
    /// Descriptor length
    pub const LENGTH: usize = 7;

    /// Parse an endpoint descriptor
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::LENGTH {
            return Err(UsbError::ShortTransfer);
        }
        if data[1] != descriptor_type::ENDPOINT {
            return Err(UsbError::InvalidDescriptor);
        }
        Ok(Self {
            b_endpoint_address: data[2],
            bm_attributes: data[3],
            w_max_packet_size: u16::from_le_bytes([data[4], data[5]]),
            b_interval: data[6],
        })
    }

    /// Endpoint number without the direction bit
    pub fn number(&self) -> u8 {
        self.b_endpoint_address & 0x0F
    }

    /// Interrupt transfer type with IN direction
    pub fn is_interrupt_in(&self) -> bool {
        self.bm_attributes & 0x03 == 0x03 && self.b_endpoint_address & 0x80 != 0
    }
}

/// Boot keyboard found in a configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardInterface {
    /// bInterfaceNumber
    pub interface: u8,
    /// Interrupt-IN endpoint, if one followed the interface
    pub endpoint: Option<EndpointDescriptor>,
}

/// What the enumeration engine needs from a configuration descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigSummary {
    /// Header
    pub config: ConfigurationDescriptor,
    /// Some interface has the Hub class
    pub has_hub_interface: bool,
    /// First boot keyboard interface
    pub keyboard: Option<KeyboardInterface>,
}

impl ConfigSummary {
    /// Walk the sub-descriptor chain
    ///
    /// The walk ends at the first entry shorter than its own two-byte
    /// header, at wTotalLength, or at
    /// the end of `data` (capped at the configuration read size), whichever
    /// comes first. Entries that would extend past that end are ignored.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let config = ConfigurationDescriptor::from_bytes(data)?;
        let end = data
            .len()
            .min(config.w_total_length as usize)
            .min(CONFIG_DESCRIPTOR_CAP);

        let mut summary = Self {
            config,
            has_hub_interface: false,
            keyboard: None,
        };
        let mut in_keyboard_interface = false;
        let mut offset = config.b_length as usize;

        while offset + 2 <= end {
            let len = data[offset] as usize;
            if len < 2 || offset + len > end {
                break;
            }
            let entry = &data[offset..offset + len];

            match entry[1] {
                descriptor_type::INTERFACE => {
                    if let Ok(iface) = InterfaceDescriptor::from_bytes(entry) {
                        in_keyboard_interface = false;
                        if iface.b_interface_class == HUB_CLASS {
                            summary.has_hub_interface = true;
                        } else if iface.is_boot_keyboard() && summary.keyboard.is_none() {
                            summary.keyboard = Some(KeyboardInterface {
                                interface: iface.b_interface_number,
                                endpoint: None,
                            });
                            in_keyboard_interface = true;
                        }
                    }
                }
                descriptor_type::ENDPOINT if in_keyboard_interface => {
                    if let (Ok(ep), Some(keyboard)) =
                        (EndpointDescriptor::from_bytes(entry), summary.keyboard.as_mut())
                    {
                        if keyboard.endpoint.is_none() && ep.is_interrupt_in() {
                            keyboard.endpoint = Some(ep);
                        }
                    }
                }
                _ => {}
            }

            offset += len;
        }

        Ok(summary)
    }
}
