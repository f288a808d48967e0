//! HID boot keyboard support
//!
//! The keyboard is driven entirely from interrupt context: the poller keeps
//! one interrupt-IN transfer in flight on the keyboard channel, the channel
//! interrupt pushes each report into a single-producer single-consumer ring,
//! and the application drains the ring through [`KeyboardReports`].
//!
//! # Boot Protocol
//!
//! Boot keyboards send a fixed 8-byte report (modifiers, reserved, six key
//! slots), so no report descriptor parsing is needed. Enumeration switches
//! the interface to boot protocol with SET_PROTOCOL and silences idle
//! repeats with SET_IDLE(0).
//!
//! ```text
//! channel IRQ ──push──▶ [ ring, 16 slots ] ──pop──▶ poll_report()
//!   (producer)                                      (consumer)
//! ```

pub mod constants;
pub mod keyboard;
pub mod poller;
pub mod ring;

pub use constants::{
    set_idle, set_protocol, HidProtocol, HidProtocolMode, HidRequest, BOOT_REPORT_LEN,
    HID_CLASS, HID_SUBCLASS_BOOT,
};
pub use keyboard::{KeyCode, KeyModifiers, KeyboardReport, RawReport};
pub use poller::{ChannelEvent, KeyboardPoller};
pub use ring::{KeyboardReports, ReportConsumer, ReportProducer, ReportQueue};

use crate::hub::DeviceSpeed;

/// The registered keyboard's interrupt-IN endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardEndpoint {
    /// Device address
    pub address: u8,
    /// HID interface number
    pub interface: u8,
    /// Endpoint number (1-15)
    pub endpoint: u8,
    /// wMaxPacketSize as reported; 0 is treated as 8
    pub max_packet_size: u16,
    /// bInterval
    pub interval: u8,
    /// Device speed
    pub speed: DeviceSpeed,
}

impl KeyboardEndpoint {
    /// Packet size to program into the channel
    pub const fn packet_size(&self) -> u16 {
        if self.max_packet_size == 0 {
            BOOT_REPORT_LEN as u16
        } else {
            self.max_packet_size
        }
    }
}
