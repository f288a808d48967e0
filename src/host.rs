//! USB host subsystem context
//!
//! [`UsbHost`] owns everything the host stack mutates: the register window,
//! the platform, the device table, the keyboard poller, the recovery state
//! machine and the producer half of the report ring. The interrupt handler
//! and the timer tick both take `&mut UsbHost`, so the platform glue must
//! call them from contexts that never nest, which is how a single-core
//! kernel dispatches them anyway.
//!
//! The application side gets a [`KeyboardReports`] handle holding the ring's
//! consumer half and a shared reference to [`HostShared`], whose atomics are
//! the only state both sides read.
//!
//! # Example
//!
//! ```no_run
//! use dwc2_usbh::{HostConfig, HostResources, Mmio, UsbHost, BCM2837_USB_BASE};
//! # use dwc2_usbh::hal::Platform;
//! # struct Board;
//! # impl Platform for Board {
//! #     fn invalidate_range(&self, _: usize, _: usize) {}
//! #     fn clean_range(&self, _: usize, _: usize) {}
//! #     fn bus_address(&self, a: usize) -> u32 { a as u32 }
//! #     fn sleep_ms(&self, _: u32) {}
//! #     fn sleep_us(&self, _: u32) {}
//! # }
//! # fn run(resources: &'static mut HostResources) -> dwc2_usbh::Result<()> {
//! // SAFETY: the DWC2 window is mapped and owned by this driver
//! let regs = unsafe { Mmio::new(BCM2837_USB_BASE) };
//! let (mut host, mut reports) = UsbHost::new(resources, regs, Board, HostConfig::default());
//! host.init()?;
//! host.enumerate()?;
//! host.start_keyboard_transfer();
//!
//! let mut report = [0u8; 8];
//! if reports.poll_report(&mut report)? > 0 {
//!     // decode with KeyboardReport::parse
//! }
//! # Ok(())
//! # }
//! ```

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::config::HostConfig;
use crate::dma::{DmaBuffer, DMA_MAX_TRANSFER};
use crate::dwc2::{Channel, Dwc2Controller, RegisterIo, RootPort, KEYBOARD_CHANNEL};
use crate::enumeration::{DeviceTable, Enumerator, HostBus, PortOutcome};
use crate::error::{Result, UsbError};
use crate::hal::Platform;
use crate::hid::ring::{KeyboardReports, ReportProducer, ReportQueue};
use crate::hid::{KeyboardEndpoint, KeyboardPoller};
use crate::hub::PortStatus;
use crate::recovery::{PortRecovery, RecoveryPhase, RecoveryStep};
use crate::stats::{DebugStats, StatsSnapshot};
use crate::transfer::control::ControlChannel;
use crate::transfer::{ControlPipe, ControlTarget, DataStage, SetupPacket};

/// Size of the keyboard channel's DMA buffer (one cache line)
pub const INTERRUPT_BUFFER_LEN: usize = 64;

/// State read by both the interrupt side and the application side
pub struct HostShared {
    initialized: AtomicBool,
    device_connected: AtomicBool,
    keyboard_address: AtomicU8,
    stats: DebugStats,
}

impl HostShared {
    /// Nothing initialized, nothing connected
    pub const fn new() -> Self {
        Self {
            initialized: AtomicBool::new(false),
            device_connected: AtomicBool::new(false),
            keyboard_address: AtomicU8::new(0),
            stats: DebugStats::new(),
        }
    }

    /// Core brought up and enumeration run
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub(crate) fn set_initialized(&self, value: bool) {
        self.initialized.store(value, Ordering::Release);
    }

    /// Something is attached to the root port
    pub fn is_connected(&self) -> bool {
        self.device_connected.load(Ordering::Acquire)
    }

    pub(crate) fn set_connected(&self, value: bool) {
        self.device_connected.store(value, Ordering::Release);
    }

    /// Address of the registered keyboard
    pub fn keyboard_address(&self) -> Option<u8> {
        match self.keyboard_address.load(Ordering::Acquire) {
            0 => None,
            address => Some(address),
        }
    }

    pub(crate) fn set_keyboard_address(&self, address: u8) {
        self.keyboard_address.store(address, Ordering::Release);
    }

    pub(crate) fn clear_keyboard(&self) {
        self.keyboard_address.store(0, Ordering::Release);
    }

    /// Initialized, connected and a keyboard registered
    pub fn keyboard_ready(&self) -> bool {
        self.is_initialized() && self.is_connected() && self.keyboard_address().is_some()
    }

    /// Debug counters
    pub fn stats(&self) -> &DebugStats {
        &self.stats
    }
}

impl Default for HostShared {
    fn default() -> Self {
        Self::new()
    }
}

/// Storage the host borrows for its whole life
///
/// Holds the DMA buffers, whose addresses are handed to the hardware and so
/// must not move, and the report ring. Typically placed in a `static`.
pub struct HostResources {
    shared: HostShared,
    queue: ReportQueue,
    control_buffer: DmaBuffer<DMA_MAX_TRANSFER>,
    interrupt_buffer: DmaBuffer<INTERRUPT_BUFFER_LEN>,
}

impl HostResources {
    /// Empty resources
    pub const fn new() -> Self {
        Self {
            shared: HostShared::new(),
            queue: ReportQueue::new(),
            control_buffer: DmaBuffer::new(),
            interrupt_buffer: DmaBuffer::new(),
        }
    }
}

impl Default for HostResources {
    fn default() -> Self {
        Self::new()
    }
}

/// USB host subsystem
pub struct UsbHost<'a, R: RegisterIo, P: Platform> {
    pub(crate) regs: R,
    pub(crate) platform: P,
    pub(crate) config: HostConfig,
    pub(crate) devices: DeviceTable,
    pub(crate) keyboard: KeyboardPoller,
    pub(crate) recovery: PortRecovery,
    pub(crate) producer: ReportProducer<'a>,
    pub(crate) shared: &'a HostShared,
    pub(crate) control_buffer: &'a mut DmaBuffer<DMA_MAX_TRANSFER>,
    pub(crate) interrupt_buffer: &'a mut DmaBuffer<INTERRUPT_BUFFER_LEN>,
    pub(crate) ticks: u32,
}

impl<'a, R: RegisterIo, P: Platform> UsbHost<'a, R, P> {
    /// Build the host over `resources`, returning it and the application's
    /// report handle
    pub fn new(
        resources: &'a mut HostResources,
        regs: R,
        platform: P,
        config: HostConfig,
    ) -> (Self, KeyboardReports<'a>) {
        let HostResources {
            shared,
            queue,
            control_buffer,
            interrupt_buffer,
        } = resources;
        let shared: &'a HostShared = shared;
        let (producer, consumer) = queue.split();

        let host = Self {
            regs,
            platform,
            config,
            devices: DeviceTable::new(),
            keyboard: KeyboardPoller::new(),
            recovery: PortRecovery::new(),
            producer,
            shared,
            control_buffer,
            interrupt_buffer,
            ticks: 0,
        };
        (host, KeyboardReports::new(consumer, shared))
    }

    /// Bring the core up in host mode and power the root port
    pub fn init(&mut self) -> Result<()> {
        Dwc2Controller::new(&self.regs)
            .initialize(&self.platform)?
            .start();
        self.shared.set_initialized(true);
        Ok(())
    }

    /// Enumerate the tree behind the root port through the DWC2 core
    pub fn enumerate(&mut self) -> Result<usize> {
        let mut bus = Dwc2Bus {
            control: ControlChannel::new(
                &self.regs,
                &self.platform,
                &mut *self.control_buffer,
                &self.config,
            ),
            port: RootPort::new(&self.regs),
            platform: &self.platform,
        };
        Self::run_enumeration(
            &mut self.devices,
            &mut self.keyboard,
            self.shared,
            self.config,
            &mut bus,
        )
    }

    /// Enumerate the tree behind the root port over an arbitrary bus
    ///
    /// Resets the device table, the address counter and the keyboard
    /// registration first. Returns the number of devices enumerated.
    pub fn enumerate_on<B: HostBus>(&mut self, bus: &mut B) -> Result<usize> {
        Self::run_enumeration(
            &mut self.devices,
            &mut self.keyboard,
            self.shared,
            self.config,
            bus,
        )
    }

    fn run_enumeration<B: HostBus>(
        devices: &mut DeviceTable,
        keyboard: &mut KeyboardPoller,
        shared: &HostShared,
        config: HostConfig,
        bus: &mut B,
    ) -> Result<usize> {
        keyboard.register(None);
        shared.clear_keyboard();

        let mut enumerator = Enumerator::new(devices, config);
        let outcome = enumerator.enumerate_root(bus);
        let found = enumerator.keyboard();

        keyboard.register(found);
        if let Some(endpoint) = found {
            shared.set_keyboard_address(endpoint.address);
        }
        shared.set_connected(bus.root_port_status().connected());
        shared.set_initialized(true);

        match outcome {
            PortOutcome::Failed(error) => Err(error),
            PortOutcome::NotEnabled => Err(UsbError::PortError),
            PortOutcome::Empty | PortOutcome::Enumerated(_) => Ok(devices.len()),
        }
    }

    /// Control transfer to `address` on channel 0
    ///
    /// Packet size and speed come from the device table. Address 0 and
    /// unknown addresses take the root port's current speed, with the
    /// default EP0 size for address 0 and 64 otherwise. Only call this from
    /// ordinary context while no enumeration is running.
    pub fn control_transfer(
        &mut self,
        address: u8,
        setup: &SetupPacket,
        data: DataStage<'_>,
    ) -> Result<usize> {
        let root_speed = RootPort::new(&self.regs).status().speed();
        let target = self.devices.control_target(address, root_speed);
        ControlChannel::new(
            &self.regs,
            &self.platform,
            &mut *self.control_buffer,
            &self.config,
        )
        .control_transfer(target, setup, data)
    }

    /// Kick off interrupt polling of the registered keyboard
    ///
    /// Does nothing if a transfer is already pending or no keyboard is
    /// registered. If the channel is still enabled from an earlier transfer
    /// it is asked to halt instead; the halt interrupt then restarts it.
    pub fn start_keyboard_transfer(&mut self) {
        if self.keyboard.is_pending() || self.keyboard.endpoint().is_none() {
            return;
        }
        let channel = Channel::new(&self.regs, KEYBOARD_CHANNEL);
        if channel.is_enabled() {
            channel.request_disable();
            return;
        }
        log::info!("Starting keyboard transfers");
        self.submit_keyboard();
    }

    pub(crate) fn submit_keyboard(&mut self) {
        self.keyboard.submit(
            &self.regs,
            &self.platform,
            &mut *self.interrupt_buffer,
            self.ticks,
            self.shared.stats(),
        );
    }

    /// Periodic housekeeping, nominally every 10 ms
    ///
    /// Advances port recovery if one is running (and does nothing else that
    /// tick), otherwise runs the keyboard watchdog and the idle fallback.
    pub fn timer_tick(&mut self) {
        self.ticks = self.ticks.wrapping_add(1);
        let now = self.ticks;

        let step = self
            .recovery
            .advance(&RootPort::new(&self.regs), now, &self.config);
        match step {
            RecoveryStep::Inactive => {}
            RecoveryStep::Reenabled => {
                log::info!("root port re-enabled after recovery reset");
                if self.keyboard.endpoint().is_some() {
                    self.keyboard.clear_pending();
                    self.submit_keyboard();
                }
                return;
            }
            RecoveryStep::TimedOut => {
                log::warn!(
                    "root port did not re-enable within {} ticks",
                    self.config.recovery_enable_ticks
                );
                return;
            }
            RecoveryStep::Holding | RecoveryStep::Released | RecoveryStep::Waiting => return,
        }

        if !self.shared.keyboard_ready() || self.keyboard.endpoint().is_none() {
            return;
        }

        if self.keyboard.check_watchdog(
            &self.regs,
            now,
            self.config.watchdog_ticks,
            self.config.halt_poll_limit,
            self.shared.stats(),
        ) {
            self.submit_keyboard();
            return;
        }

        if self.keyboard.is_idle(&self.regs) {
            self.submit_keyboard();
        }
    }

    /// Counter snapshot
    pub fn debug_stats(&self) -> StatsSnapshot {
        self.shared.stats().snapshot()
    }

    /// Log the counters as one line
    pub fn log_stats(&self) {
        log::info!("usb stats: {}", self.debug_stats());
    }

    /// Shared flags and counters
    pub fn shared(&self) -> &'a HostShared {
        self.shared
    }

    /// Enumerated devices
    pub fn devices(&self) -> &DeviceTable {
        &self.devices
    }

    /// Registered keyboard
    pub fn keyboard(&self) -> Option<KeyboardEndpoint> {
        self.keyboard.endpoint()
    }

    /// A keyboard transfer is believed to be in flight
    pub fn keyboard_transfer_pending(&self) -> bool {
        self.keyboard.is_pending()
    }

    /// Port recovery phase
    pub fn recovery_phase(&self) -> RecoveryPhase {
        self.recovery.phase()
    }

    /// Ticks seen so far
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Active configuration
    pub fn config(&self) -> &HostConfig {
        &self.config
    }
}

/// Enumeration bus over the DWC2 core: channel 0 plus the root port
struct Dwc2Bus<'b, R: RegisterIo, P: Platform> {
    control: ControlChannel<'b, R, P>,
    port: RootPort<'b, R>,
    platform: &'b P,
}

impl<R: RegisterIo, P: Platform> ControlPipe for Dwc2Bus<'_, R, P> {
    fn control_transfer(
        &mut self,
        target: ControlTarget,
        setup: &SetupPacket,
        data: DataStage<'_>,
    ) -> Result<usize> {
        self.control.control_transfer(target, setup, data)
    }
}

impl<R: RegisterIo, P: Platform> HostBus for Dwc2Bus<'_, R, P> {
    fn root_port_power_on(&mut self) {
        self.port.power_on();
    }

    fn root_port_status(&mut self) -> PortStatus {
        self.port.status()
    }

    fn set_root_port_reset(&mut self, asserted: bool) {
        self.port.set_reset(asserted);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.platform.sleep_ms(ms);
    }
}
