#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

//! USB host driver for the Synopsys DWC2 OTG core (BCM2837, Raspberry Pi Zero 2 W)
//!
//! Enumerates a tree of USB 2.0 devices behind the root port, including
//! hubs, and keeps a boot-protocol HID keyboard polled from interrupt context
//! so its reports are available to ordinary code through a lock-free ring.
//!
//! # Core Components
//!
//! - [`dwc2`] - register map, typed channel and root port access, core bring-up
//! - [`hal`] - cache maintenance, bus addresses and delays supplied by the platform
//! - [`dma`] - cache-line aligned DMA bounce buffers
//! - [`transfer`] - single transactions and SETUP/DATA/STATUS control transfers
//! - [`enumeration`] - descriptors, the device table and the port state machine
//! - [`hub`] - hub class requests and port status decoding
//! - [`hid`] - boot keyboard reports, the report ring and the interrupt poller
//! - [`recovery`] - root port reset recovery driven by the timer tick
//! - [`host`] - the [`UsbHost`] subsystem context tying it together
//!
//! # Execution contexts
//!
//! | Entry point | Context |
//! |---|---|
//! | [`UsbHost::init`], [`UsbHost::enumerate`] | ordinary, blocking with bounded polls |
//! | [`UsbHost::irq_handler`] | interrupt, never logs |
//! | [`UsbHost::timer_tick`] | periodic timer, non-blocking |
//! | [`KeyboardReports::poll_report`] | ordinary, non-blocking |

#[cfg(feature = "defmt")]
use defmt as _;

pub mod config;
pub mod dma;
pub mod dwc2;
pub mod enumeration;
pub mod error;
pub mod hal;
pub mod hid;
pub mod host;
pub mod hub;
pub mod interrupt;
pub mod recovery;
pub mod stats;
pub mod transfer;

pub use config::HostConfig;
pub use dwc2::{Mmio, RegisterIo, BCM2837_USB_BASE};
pub use enumeration::{DeviceRecord, DeviceTable, HostBus};
pub use error::{Result, UsbError};
pub use hal::Platform;
pub use hid::{KeyboardEndpoint, KeyboardReport, KeyboardReports};
pub use host::{HostResources, HostShared, UsbHost};
pub use hub::DeviceSpeed;
pub use stats::{DebugStats, StatsSnapshot};
