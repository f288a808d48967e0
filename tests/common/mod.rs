//! Helpers shared by the integration tests

#![allow(dead_code)]

pub mod mock_hardware;

pub use mock_hardware::{
    decode_tsiz, CacheOp, MockPlatform, Reaction, SimBus, SimDevice, SimRegisters,
};

use dwc2_usbh::hub::DeviceSpeed;
use dwc2_usbh::{HostConfig, HostResources, KeyboardReports, UsbHost};

/// Simulated host with a full-speed keyboard on the root port, enumerated
/// and ready for interrupt polling
pub fn keyboard_host<'a>(
    resources: &'a mut HostResources,
    regs: &'a SimRegisters,
    platform: &'a MockPlatform,
    config: HostConfig,
) -> (UsbHost<'a, &'a SimRegisters, &'a MockPlatform>, KeyboardReports<'a>) {
    let (mut host, reports) = UsbHost::new(resources, regs, platform, config);
    let mut bus = SimBus::new(Some(SimDevice::Keyboard(DeviceSpeed::Full)));
    host.enumerate_on(&mut bus).expect("keyboard enumerates");
    (host, reports)
}

/// Boot report with `key` pressed
pub fn key_report(key: u8) -> Vec<u8> {
    vec![0x00, 0x00, key, 0x00, 0x00, 0x00, 0x00, 0x00]
}
