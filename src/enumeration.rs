//! USB device enumeration
//!
//! One state machine brings up a port and the device behind it, either for
//! the root port or for a hub port; hubs re-enter it once per downstream
//! port. A failure aborts only the port being enumerated, never its
//! siblings.
//!
//! ```text
//! PowerOff → PowerOn → AwaitingConnect → Resetting → AwaitingReset
//!   → Addressing → DescriptorRead → ConfigParse → HubDescent | Configured
//!   → Done
//! ```
//!
//! Only one device may answer at address 0 at a time, so the walk is strictly
//! depth-first and sequential.

pub mod descriptor;
pub mod table;

pub use descriptor::{
    ConfigSummary, ConfigurationDescriptor, DeviceDescriptor, EndpointDescriptor,
    InterfaceDescriptor, KeyboardInterface, DEVICE_DESCRIPTOR_PREFIX,
};
pub use table::{DeviceHandle, DeviceRecord, DeviceTable, MAX_ADDRESS};

use crate::config::{HostConfig, CONFIG_DESCRIPTOR_CAP};
use crate::error::{Result, UsbError};
use crate::hid::{self, HidProtocolMode, KeyboardEndpoint};
use crate::hub::{self, DeviceSpeed, HubDescriptor, PortFeature, PortStatus};
use crate::transfer::{ControlPipe, ControlTarget, DataStage, SetupPacket};

/// Bus operations enumeration needs beyond control transfers
pub trait HostBus: ControlPipe {
    /// Power the root port
    fn root_port_power_on(&mut self);

    /// Current root port status
    fn root_port_status(&mut self) -> PortStatus;

    /// Drive or release reset on the root port
    fn set_root_port_reset(&mut self, asserted: bool);

    /// Blocking delay for hardware settle times
    fn delay_ms(&mut self, ms: u32);
}

/// A port the state machine can run on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PortRef {
    /// Host controller root port
    Root,
    /// Downstream port of an enumerated hub
    Hub {
        /// Hub address
        hub_address: u8,
        /// Port number, 1-based
        port: u8,
    },
}

impl PortRef {
    /// (parent address, parent port) recorded for a device on this port
    pub const fn parent(&self) -> (u8, u8) {
        match *self {
            Self::Root => (0, 0),
            Self::Hub { hub_address, port } => (hub_address, port),
        }
    }
}

/// Enumeration state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EnumerationState {
    /// Nothing started
    PowerOff,
    /// Port power requested
    PowerOn,
    /// Waiting for a connection
    AwaitingConnect,
    /// Reset asserted
    Resetting,
    /// Reset released, waiting for enable
    AwaitingReset,
    /// Talking to address 0
    Addressing,
    /// Reading the full device descriptor
    DescriptorRead,
    /// Reading and walking the configuration
    ConfigParse,
    /// Enumerating hub ports
    HubDescent,
    /// Device configured
    Configured,
    /// Whole tree finished
    Done,
}

/// How one port's enumeration ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PortOutcome {
    /// Nothing connected
    Empty,
    /// Connected but did not enable after reset
    NotEnabled,
    /// Device enumerated and configured
    Enumerated(DeviceHandle),
    /// Enumeration of this port failed
    Failed(UsbError),
}

/// Depth-first enumerator over a device table
pub struct Enumerator<'t> {
    devices: &'t mut DeviceTable,
    config: HostConfig,
    keyboard: Option<KeyboardEndpoint>,
    state: EnumerationState,
}

impl<'t> Enumerator<'t> {
    /// Enumerator filling `devices`
    pub fn new(devices: &'t mut DeviceTable, config: HostConfig) -> Self {
        Self {
            devices,
            config,
            keyboard: None,
            state: EnumerationState::PowerOff,
        }
    }

    /// Current state
    pub fn state(&self) -> EnumerationState {
        self.state
    }

    /// Keyboard registered during the walk (the last one found wins)
    pub fn keyboard(&self) -> Option<KeyboardEndpoint> {
        self.keyboard
    }

    fn transition(&mut self, next: EnumerationState) {
        log::trace!("enumeration {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Reset the table and enumerate the tree behind the root port
    pub fn enumerate_root<B: HostBus>(&mut self, bus: &mut B) -> PortOutcome {
        self.devices.reset();
        self.keyboard = None;
        self.transition(EnumerationState::PowerOff);
        let outcome = self.enumerate_port(bus, PortRef::Root);
        self.transition(EnumerationState::Done);
        log::info!(
            "enumeration finished: {} device(s), keyboard {}",
            self.devices.len(),
            if self.keyboard.is_some() { "present" } else { "absent" }
        );
        outcome
    }

    /// Run the port state machine on one port
    pub fn enumerate_port<B: HostBus>(&mut self, bus: &mut B, port: PortRef) -> PortOutcome {
        let outcome = match self.bring_up_port(bus, port) {
            Ok(Some(speed)) => match self.enumerate_device(bus, port, speed) {
                Ok(handle) => PortOutcome::Enumerated(handle),
                Err(error) => PortOutcome::Failed(error),
            },
            Ok(None) => PortOutcome::Empty,
            Err(UsbError::PortError) => PortOutcome::NotEnabled,
            Err(error) => PortOutcome::Failed(error),
        };
        match outcome {
            PortOutcome::Failed(error) => log::warn!("{:?}: enumeration failed: {}", port, error),
            PortOutcome::NotEnabled => log::debug!("{:?}: not enabled after reset", port),
            _ => {}
        }
        outcome
    }

    /// Power, detect, reset; returns the attached device's speed, or `None`
    /// for an empty port
    fn bring_up_port<B: HostBus>(
        &mut self,
        bus: &mut B,
        port: PortRef,
    ) -> Result<Option<DeviceSpeed>> {
        self.transition(EnumerationState::PowerOn);
        match port {
            PortRef::Root => bus.root_port_power_on(),
            PortRef::Hub { hub_address, port } => {
                self.hub_request(bus, hub_address, &hub::set_port_feature(port, PortFeature::PortPower))?
            }
        }
        bus.delay_ms(self.config.port_power_settle_ms);

        self.transition(EnumerationState::AwaitingConnect);
        if !self.port_status(bus, port)?.connected() {
            return Ok(None);
        }

        self.transition(EnumerationState::Resetting);
        match port {
            PortRef::Root => bus.set_root_port_reset(true),
            PortRef::Hub { hub_address, port } => {
                self.hub_request(bus, hub_address, &hub::set_port_feature(port, PortFeature::PortReset))?
            }
        }
        bus.delay_ms(self.config.port_reset_hold_ms);

        self.transition(EnumerationState::AwaitingReset);
        let status = match port {
            PortRef::Root => {
                bus.set_root_port_reset(false);
                bus.delay_ms(self.config.post_reset_settle_ms);
                self.port_status(bus, port)?
            }
            PortRef::Hub { hub_address, port: number } => {
                let status = self.port_status(bus, port)?;
                self.hub_request(
                    bus,
                    hub_address,
                    &hub::clear_port_feature(number, PortFeature::CPortReset),
                )?;
                status
            }
        };
        if !status.enabled() {
            return Err(UsbError::PortError);
        }

        let speed = status.speed();
        bus.delay_ms(self.config.post_reset_settle_ms);
        Ok(Some(speed))
    }

    fn port_status<B: HostBus>(&self, bus: &mut B, port: PortRef) -> Result<PortStatus> {
        match port {
            PortRef::Root => Ok(bus.root_port_status()),
            PortRef::Hub { hub_address, port } => {
                let mut raw = [0u8; 4];
                let target = self.devices.control_target(hub_address, DeviceSpeed::Full);
                let n = bus.control_transfer(
                    target,
                    &hub::get_port_status(port),
                    DataStage::In(&mut raw),
                )?;
                PortStatus::from_bytes(&raw[..n])
            }
        }
    }

    fn hub_request<B: HostBus>(
        &self,
        bus: &mut B,
        hub_address: u8,
        setup: &SetupPacket,
    ) -> Result<()> {
        let target = self.devices.control_target(hub_address, DeviceSpeed::Full);
        bus.control_transfer(target, setup, DataStage::None).map(|_| ())
    }

    /// Address, describe and configure the device now answering at address 0
    fn enumerate_device<B: HostBus>(
        &mut self,
        bus: &mut B,
        port: PortRef,
        speed: DeviceSpeed,
    ) -> Result<DeviceHandle> {
        if self.devices.is_full() {
            return Err(UsbError::NoResources);
        }

        self.transition(EnumerationState::Addressing);
        let default_target = ControlTarget::default_address(speed);
        let mut prefix = [0u8; DEVICE_DESCRIPTOR_PREFIX];
        let n = bus.control_transfer(
            default_target,
            &SetupPacket::get_device_descriptor(DEVICE_DESCRIPTOR_PREFIX as u16),
            DataStage::In(&mut prefix),
        )?;
        let max_packet_size = DeviceDescriptor::max_packet_size_from_prefix(&prefix[..n])?;

        let address = self.devices.allocate_address()?;
        bus.delay_ms(self.config.set_address_settle_ms);
        bus.control_transfer(default_target, &SetupPacket::set_address(address), DataStage::None)?;
        bus.delay_ms(self.config.set_address_settle_ms);

        let (parent_address, parent_port) = port.parent();
        let handle = self.devices.insert(DeviceRecord {
            address,
            max_packet_size,
            speed,
            is_hub: false,
            hub_ports: 0,
            parent_address,
            parent_port,
        })?;
        let target = self.devices.control_target(address, speed);

        self.transition(EnumerationState::DescriptorRead);
        let mut raw = [0u8; DeviceDescriptor::LENGTH];
        let n = bus.control_transfer(
            target,
            &SetupPacket::get_device_descriptor(DeviceDescriptor::LENGTH as u16),
            DataStage::In(&mut raw),
        )?;
        let device = DeviceDescriptor::from_bytes(&raw[..n])?;
        log::info!(
            "device {} ({:?} speed): {:04x}:{:04x} class {:#04x}",
            address,
            speed,
            device.id_vendor,
            device.id_product,
            device.b_device_class
        );

        self.transition(EnumerationState::ConfigParse);
        let mut config = [0u8; CONFIG_DESCRIPTOR_CAP];
        let n = bus.control_transfer(
            target,
            &SetupPacket::get_configuration_descriptor(CONFIG_DESCRIPTOR_CAP as u16),
            DataStage::In(&mut config),
        )?;
        let summary = ConfigSummary::parse(&config[..n])?;
        bus.control_transfer(
            target,
            &SetupPacket::set_configuration(summary.config.b_configuration_value),
            DataStage::None,
        )?;

        if device.is_hub() || summary.has_hub_interface {
            self.transition(EnumerationState::HubDescent);
            self.enumerate_hub(bus, handle, target);
        }

        if let Some(keyboard) = summary.keyboard {
            if let Some(endpoint) = keyboard.endpoint.filter(|ep| ep.number() != 0) {
                self.configure_keyboard(bus, target, keyboard.interface, endpoint);
            }
        }

        self.transition(EnumerationState::Configured);
        Ok(handle)
    }

    /// Read the hub descriptor and enumerate ports 1..=N
    fn enumerate_hub<B: HostBus>(&mut self, bus: &mut B, handle: DeviceHandle, target: ControlTarget) {
        if let Some(record) = self.devices.get_mut(handle) {
            record.is_hub = true;
        }

        let mut raw = [0u8; HubDescriptor::REQUEST_LENGTH as usize];
        let descriptor = bus
            .control_transfer(
                target,
                &hub::get_hub_descriptor(HubDescriptor::REQUEST_LENGTH),
                DataStage::In(&mut raw),
            )
            .and_then(|n| HubDescriptor::parse(&raw[..n]));
        let descriptor = match descriptor {
            Ok(descriptor) => descriptor,
            Err(error) => {
                log::warn!("hub {}: no hub descriptor: {}", target.address, error);
                return;
            }
        };

        if let Some(record) = self.devices.get_mut(handle) {
            record.hub_ports = descriptor.num_ports;
        }
        log::info!("hub {} has {} port(s)", target.address, descriptor.num_ports);

        #[cfg(feature = "hub")]
        for port in 1..=descriptor.num_ports {
            if self.devices.is_full() {
                log::warn!("device table full, skipping remaining hub ports");
                break;
            }
            self.enumerate_port(
                bus,
                PortRef::Hub {
                    hub_address: target.address,
                    port,
                },
            );
        }
    }

    /// Put the keyboard in boot protocol and register it
    fn configure_keyboard<B: HostBus>(
        &mut self,
        bus: &mut B,
        target: ControlTarget,
        interface: u8,
        endpoint: EndpointDescriptor,
    ) {
        if let Err(error) = bus.control_transfer(
            target,
            &hid::set_protocol(interface, HidProtocolMode::Boot),
            DataStage::None,
        ) {
            log::info!("SET_PROTOCOL failed ({}), keyboard may already be in boot mode", error);
        }
        if let Err(error) = bus.control_transfer(target, &hid::set_idle(interface, 0, 0), DataStage::None) {
            log::debug!("SET_IDLE failed: {}", error);
        }

        if let Some(previous) = self.keyboard {
            log::warn!("keyboard at {} replaces keyboard at {}", target.address, previous.address);
        }
        let keyboard = KeyboardEndpoint {
            address: target.address,
            interface,
            endpoint: endpoint.number(),
            max_packet_size: endpoint.w_max_packet_size,
            interval: endpoint.b_interval,
            speed: target.speed,
        };
        log::info!("keyboard ready at address {} endpoint {}", keyboard.address, keyboard.endpoint);
        self.keyboard = Some(keyboard);
    }
}
