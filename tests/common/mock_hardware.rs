//! Simulated hardware for running the host stack without a DWC2 core
//!
//! - [`MockPlatform`] records cache maintenance, hands out bus address tokens
//!   for DMA buffers and accumulates virtual sleep time.
//! - [`SimRegisters`] is a DWC2 register file with the write-1-to-clear and
//!   write-1-to-disable semantics the driver depends on. Enabling a channel
//!   applies the next scripted [`Reaction`] for it.
//! - [`SimBus`] answers control requests for a tree of simulated devices
//!   and implements the enumeration `HostBus` trait.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use dwc2_usbh::dwc2::{hctsiz, offsets, GIntSts, GRstCtl, HPrt, HcChar, HcInt, RegisterIo};
use dwc2_usbh::enumeration::HostBus;
use dwc2_usbh::hal::Platform;
use dwc2_usbh::hub::{DeviceSpeed, PortStatus};
use dwc2_usbh::transfer::{descriptor_type, request, ControlPipe, ControlTarget, DataStage, SetupPacket};
use dwc2_usbh::{Result, UsbError};

const TOKEN_BASE: u32 = 0x1000_0000;
const TOKEN_STRIDE: u32 = 0x0001_0000;

type TokenTable = Rc<RefCell<Vec<usize>>>;

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

/// One recorded cache maintenance call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOp {
    /// clean_range(addr, len)
    Clean(usize, usize),
    /// invalidate_range(addr, len)
    Invalidate(usize, usize),
}

/// Recording platform
pub struct MockPlatform {
    cache_ops: RefCell<Vec<CacheOp>>,
    tokens: TokenTable,
    slept_us: Cell<u64>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            cache_ops: RefCell::new(Vec::new()),
            tokens: Rc::new(RefCell::new(Vec::new())),
            slept_us: Cell::new(0),
        }
    }

    pub fn cache_ops(&self) -> Vec<CacheOp> {
        self.cache_ops.borrow().clone()
    }

    pub fn clear_cache_ops(&self) {
        self.cache_ops.borrow_mut().clear();
    }

    pub fn slept_us(&self) -> u64 {
        self.slept_us.get()
    }
}

impl Platform for MockPlatform {
    fn invalidate_range(&self, addr: usize, len: usize) {
        self.cache_ops.borrow_mut().push(CacheOp::Invalidate(addr, len));
    }

    fn clean_range(&self, addr: usize, len: usize) {
        self.cache_ops.borrow_mut().push(CacheOp::Clean(addr, len));
    }

    fn bus_address(&self, cpu_addr: usize) -> u32 {
        let mut tokens = self.tokens.borrow_mut();
        let index = match tokens.iter().position(|&addr| addr == cpu_addr) {
            Some(index) => index,
            None => {
                tokens.push(cpu_addr);
                tokens.len() - 1
            }
        };
        TOKEN_BASE + index as u32 * TOKEN_STRIDE
    }

    fn sleep_ms(&self, ms: u32) {
        self.slept_us.set(self.slept_us.get() + u64::from(ms) * 1000);
    }

    fn sleep_us(&self, us: u32) {
        self.slept_us.set(self.slept_us.get() + u64::from(us));
    }
}

// ---------------------------------------------------------------------------
// Register file
// ---------------------------------------------------------------------------

/// How a simulated channel answers when it is enabled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    /// ACK and complete; IN transfers receive these bytes
    Complete(Vec<u8>),
    /// NAK and halt
    Nak,
    /// STALL and halt
    Stall,
    /// Transaction error and halt
    TransactionError,
    /// Stay enabled without raising anything
    Wedge,
}

/// Simulated DWC2 register file
pub struct SimRegisters {
    regs: RefCell<BTreeMap<usize, u32>>,
    scripts: RefCell<[VecDeque<Reaction>; 2]>,
    defaults: RefCell<[Reaction; 2]>,
    writes: RefCell<Vec<(usize, u32)>>,
    tokens: TokenTable,
    halt_on_disable: Cell<bool>,
}

impl SimRegisters {
    /// Register file resolving DMA addresses through `platform`'s tokens
    ///
    /// Channel 0 completes by default; channel 1 wedges, so an interrupt
    /// transfer stays in flight until a test finishes it.
    pub fn new(platform: &MockPlatform) -> Self {
        let sim = Self {
            regs: RefCell::new(BTreeMap::new()),
            scripts: RefCell::new([VecDeque::new(), VecDeque::new()]),
            defaults: RefCell::new([Reaction::Complete(Vec::new()), Reaction::Wedge]),
            writes: RefCell::new(Vec::new()),
            tokens: Rc::clone(&platform.tokens),
            halt_on_disable: Cell::new(true),
        };
        sim.poke(offsets::GRSTCTL, GRstCtl::AHBIDL.bits());
        sim.poke(offsets::GINTSTS, GIntSts::CURMOD.bits());
        sim
    }

    /// Set a register without side effects
    pub fn poke(&self, offset: usize, value: u32) {
        self.regs.borrow_mut().insert(offset, value);
    }

    /// Read a register without side effects
    pub fn peek(&self, offset: usize) -> u32 {
        self.regs.borrow().get(&offset).copied().unwrap_or(0)
    }

    /// Queue the reaction for the next enable of `channel`
    pub fn script(&self, channel: usize, reaction: Reaction) {
        self.scripts.borrow_mut()[channel].push_back(reaction);
    }

    /// Reaction used once the script for `channel` is exhausted
    pub fn set_default_reaction(&self, channel: usize, reaction: Reaction) {
        self.defaults.borrow_mut()[channel] = reaction;
    }

    /// Whether a CHDIS request halts the channel (a truly stuck channel
    /// never does)
    pub fn set_halt_on_disable(&self, halts: bool) {
        self.halt_on_disable.set(halts);
    }

    /// Every value written to `offset`, oldest first
    pub fn writes_to(&self, offset: usize) -> Vec<u32> {
        self.writes
            .borrow()
            .iter()
            .filter(|(o, _)| *o == offset)
            .map(|&(_, v)| v)
            .collect()
    }

    pub fn clear_log(&self) {
        self.writes.borrow_mut().clear();
    }

    /// HCTSIZ values programmed on `channel`
    pub fn programmed_sizes(&self, channel: usize) -> Vec<u32> {
        self.writes_to(offsets::channel(channel, offsets::HCTSIZ))
    }

    /// Number of times `channel` was handed to hardware
    pub fn enables(&self, channel: usize) -> usize {
        self.writes_to(offsets::channel(channel, offsets::HCCHAR))
            .iter()
            .filter(|&&v| v & HcChar::CHENA.bits() != 0 && v & HcChar::CHDIS.bits() == 0)
            .count()
    }

    pub fn channel_enabled(&self, channel: usize) -> bool {
        self.peek(offsets::channel(channel, offsets::HCCHAR)) & HcChar::CHENA.bits() != 0
    }

    /// Finish the transfer in flight on `channel` and raise its interrupt
    pub fn finish(&self, channel: usize, reaction: Reaction) {
        let hcchar = self.peek(offsets::channel(channel, offsets::HCCHAR));
        self.react(channel, hcchar, reaction);
        self.raise_channel_interrupt(channel);
    }

    fn raise_channel_interrupt(&self, channel: usize) {
        self.poke(offsets::HAINT, self.peek(offsets::HAINT) | 1 << channel);
        self.poke(
            offsets::GINTSTS,
            self.peek(offsets::GINTSTS) | GIntSts::HCINT.bits(),
        );
    }

    /// Latch a root port event and raise the port interrupt
    pub fn port_event(&self, hprt: HPrt) {
        self.poke(offsets::HPRT, hprt.bits());
        self.poke(
            offsets::GINTSTS,
            self.peek(offsets::GINTSTS) | GIntSts::PRTINT.bits(),
        );
    }

    fn channel_of(offset: usize) -> Option<(usize, usize)> {
        if offset < offsets::HC_BASE {
            return None;
        }
        let relative = offset - offsets::HC_BASE;
        let channel = relative / offsets::HC_STRIDE;
        (channel < 2).then_some((channel, relative % offsets::HC_STRIDE))
    }

    fn write_hprt(&self, value: u32) {
        let current = self.peek(offsets::HPRT);
        let w1c = (HPrt::CONNDET | HPrt::ENCHNG | HPrt::OVRCURRCHNG).bits();
        let mut next = current & !(value & w1c);
        if value & HPrt::ENA.bits() != 0 {
            next &= !HPrt::ENA.bits();
        }
        let writable = (HPrt::PWR | HPrt::RST).bits();
        next = (next & !writable) | (value & writable);
        self.poke(offsets::HPRT, next);
    }

    fn write_hcint(&self, channel: usize, value: u32) {
        let offset = offsets::channel(channel, offsets::HCINT);
        let remaining = self.peek(offset) & !value;
        self.poke(offset, remaining);
        if remaining == 0 {
            self.poke(offsets::HAINT, self.peek(offsets::HAINT) & !(1 << channel));
        }
    }

    fn write_hcchar(&self, channel: usize, value: u32) {
        let offset = offsets::channel(channel, offsets::HCCHAR);
        let previous = self.peek(offset);
        let enable = HcChar::CHENA.bits();
        let disable = HcChar::CHDIS.bits();

        if value & disable != 0 {
            if previous & enable != 0 && self.halt_on_disable.get() {
                self.poke(offset, value & !(enable | disable));
                self.raise(channel, HcInt::CHHLTD);
                self.raise_channel_interrupt(channel);
            } else {
                self.poke(offset, value);
            }
            return;
        }

        self.poke(offset, value);
        if value & enable != 0 {
            let reaction = self.scripts.borrow_mut()[channel]
                .pop_front()
                .unwrap_or_else(|| self.defaults.borrow()[channel].clone());
            self.react(channel, value, reaction);
        }
    }

    fn raise(&self, channel: usize, bits: HcInt) {
        let offset = offsets::channel(channel, offsets::HCINT);
        self.poke(offset, self.peek(offset) | bits.bits());
    }

    fn halt(&self, channel: usize, bits: HcInt) {
        let offset = offsets::channel(channel, offsets::HCCHAR);
        self.poke(offset, self.peek(offset) & !HcChar::CHENA.bits());
        self.raise(channel, HcInt::CHHLTD | bits);
    }

    fn react(&self, channel: usize, hcchar: u32, reaction: Reaction) {
        match reaction {
            Reaction::Complete(data) => {
                let tsiz_offset = offsets::channel(channel, offsets::HCTSIZ);
                let tsiz = self.peek(tsiz_offset);
                let requested = (tsiz & hctsiz::XFERSIZE_MASK) as usize;
                let moved = if hcchar & HcChar::EPDIR.bits() != 0 {
                    let n = data.len().min(requested);
                    let bus = self.peek(offsets::channel(channel, offsets::HCDMA));
                    self.dma_write(bus, &data[..n]);
                    n
                } else {
                    requested
                };
                self.poke(
                    tsiz_offset,
                    (tsiz & !hctsiz::XFERSIZE_MASK) | (requested - moved) as u32,
                );
                self.halt(channel, HcInt::XFERCOMPL | HcInt::ACK);
            }
            Reaction::Nak => self.halt(channel, HcInt::NAK),
            Reaction::Stall => self.halt(channel, HcInt::STALL),
            Reaction::TransactionError => self.halt(channel, HcInt::XACTERR),
            Reaction::Wedge => {}
        }
    }

    fn dma_write(&self, bus: u32, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        let relative = bus - TOKEN_BASE;
        let index = (relative / TOKEN_STRIDE) as usize;
        let offset = (relative % TOKEN_STRIDE) as usize;
        let cpu = self.tokens.borrow()[index] + offset;
        // SAFETY: the token was issued for a live DmaBuffer owned by the test
        // and the length is bounded by the programmed transfer size. This
        // stands in for the DMA master writing behind the CPU's back.
        unsafe { std::ptr::copy_nonoverlapping(data.as_ptr(), cpu as *mut u8, data.len()) };
    }
}

impl RegisterIo for SimRegisters {
    fn read(&self, offset: usize) -> u32 {
        self.peek(offset)
    }

    fn write(&self, offset: usize, value: u32) {
        self.writes.borrow_mut().push((offset, value));
        match offset {
            offsets::GINTSTS => {
                let w1c = value & !GIntSts::CURMOD.bits();
                self.poke(offset, self.peek(offset) & !w1c);
            }
            // Resets and flushes finish instantly; the AHB master is always idle
            offsets::GRSTCTL => {
                let self_clearing = (GRstCtl::CSFTRST | GRstCtl::TXFFLSH | GRstCtl::RXFFLSH).bits();
                self.poke(offset, (value & !self_clearing) | GRstCtl::AHBIDL.bits());
            }
            offsets::HPRT => self.write_hprt(value),
            _ => match Self::channel_of(offset) {
                Some((channel, offsets::HCINT)) => self.write_hcint(channel, value),
                Some((channel, offsets::HCCHAR)) => self.write_hcchar(channel, value),
                _ => self.poke(offset, value),
            },
        }
    }
}

/// Decoded HCTSIZ: (bytes, packets, pid)
pub fn decode_tsiz(value: u32) -> (u32, u32, u32) {
    (
        value & hctsiz::XFERSIZE_MASK,
        (value >> hctsiz::PKTCNT_SHIFT) & hctsiz::PKTCNT_MASK,
        value >> hctsiz::PID_SHIFT,
    )
}

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

pub fn device_descriptor(class: u8, max_packet_size0: u8, product: u16) -> [u8; 18] {
    let product = product.to_le_bytes();
    [
        0x12,       // bLength
        0x01,       // bDescriptorType (DEVICE)
        0x00, 0x02, // bcdUSB 2.0
        class,      // bDeviceClass
        0x00,       // bDeviceSubClass
        0x00,       // bDeviceProtocol
        max_packet_size0,
        0x34, 0x12, // idVendor 0x1234
        product[0], product[1],
        0x00, 0x01, // bcdDevice 1.0
        0x00, 0x00, 0x00, // no strings
        0x01,       // bNumConfigurations
    ]
}

/// Boot keyboard: one HID interface, interrupt-IN endpoint 0x81, 8 bytes, 10 ms
pub fn keyboard_config() -> Vec<u8> {
    vec![
        0x09, 0x02, 0x22, 0x00, 0x01, 0x01, 0x00, 0xA0, 0x32, // configuration, 34 bytes total
        0x09, 0x04, 0x00, 0x00, 0x01, 0x03, 0x01, 0x01, 0x00, // interface 0: HID, boot, keyboard
        0x09, 0x21, 0x11, 0x01, 0x00, 0x01, 0x22, 0x3F, 0x00, // HID descriptor
        0x07, 0x05, 0x81, 0x03, 0x08, 0x00, 0x0A, // endpoint 0x81 interrupt, 8 bytes
    ]
}

/// Hub: one hub-class interface with its status change endpoint
pub fn hub_config() -> Vec<u8> {
    vec![
        0x09, 0x02, 0x19, 0x00, 0x01, 0x01, 0x00, 0xE0, 0x00, // configuration, 25 bytes total
        0x09, 0x04, 0x00, 0x00, 0x01, 0x09, 0x00, 0x00, 0x00, // interface 0: hub
        0x07, 0x05, 0x81, 0x03, 0x01, 0x00, 0x0C, // status change endpoint
    ]
}

/// Vendor-specific device with a bulk endpoint pair
pub fn vendor_config() -> Vec<u8> {
    vec![
        0x09, 0x02, 0x20, 0x00, 0x01, 0x01, 0x00, 0x80, 0x32, // configuration, 32 bytes total
        0x09, 0x04, 0x00, 0x00, 0x02, 0xFF, 0x00, 0x00, 0x00, // interface 0: vendor
        0x07, 0x05, 0x81, 0x02, 0x40, 0x00, 0x00, // bulk IN
        0x07, 0x05, 0x02, 0x02, 0x40, 0x00, 0x00, // bulk OUT
    ]
}

pub fn hub_descriptor(ports: u8) -> [u8; 9] {
    [
        0x09,       // bDescLength
        0x29,       // bDescriptorType (HUB)
        ports,      // bNbrPorts
        0x00, 0x00, // wHubCharacteristics
        0x32,       // bPwrOn2PwrGood (100 ms)
        0x64,       // bHubContrCurrent
        0x00, 0xFF, // DeviceRemovable, PortPwrCtrlMask
    ]
}

// ---------------------------------------------------------------------------
// Request-level bus
// ---------------------------------------------------------------------------

/// A simulated device to attach to a port
#[derive(Debug, Clone)]
pub enum SimDevice {
    /// Boot keyboard
    Keyboard(DeviceSpeed),
    /// Hub with one entry per downstream port
    Hub(Vec<Option<SimDevice>>),
    /// Vendor-specific full-speed device
    Vendor,
    /// Connects and enables but never answers a control request
    Unresponsive,
}

#[derive(Debug, Clone, Default)]
struct SimPort {
    child: Option<usize>,
    powered: bool,
    enabled: bool,
    reset_changed: bool,
}

struct SimNode {
    device: [u8; 18],
    config: Vec<u8>,
    speed: DeviceSpeed,
    address: u8,
    configuration: Option<u8>,
    ports: Vec<SimPort>,
    responsive: bool,
}

/// Topology answering control requests by address
pub struct SimBus {
    nodes: Vec<SimNode>,
    root: Option<usize>,
    root_powered: bool,
    root_enabled: bool,
    default_device: Option<usize>,
    /// Every control request issued, with the target address
    pub requests: Vec<(u8, SetupPacket)>,
    /// Virtual time spent in `delay_ms`
    pub delayed_ms: u64,
    /// Answer SET_PROTOCOL with STALL
    pub stall_set_protocol: bool,
}

impl SimBus {
    pub fn new(root: Option<SimDevice>) -> Self {
        let mut bus = Self {
            nodes: Vec::new(),
            root: None,
            root_powered: false,
            root_enabled: false,
            default_device: None,
            requests: Vec::new(),
            delayed_ms: 0,
            stall_set_protocol: false,
        };
        bus.root = root.map(|device| bus.build(device));
        bus
    }

    fn build(&mut self, device: SimDevice) -> usize {
        let responsive = !matches!(device, SimDevice::Unresponsive);
        let (descriptor, config, speed, children) = match device {
            SimDevice::Keyboard(speed) => {
                let mps = if matches!(speed, DeviceSpeed::Low) { 8 } else { 64 };
                (device_descriptor(0x00, mps, 0x0001), keyboard_config(), speed, Vec::new())
            }
            SimDevice::Hub(ports) => (
                device_descriptor(0x09, 64, 0x0002),
                hub_config(),
                DeviceSpeed::High,
                ports,
            ),
            SimDevice::Vendor | SimDevice::Unresponsive => (
                device_descriptor(0xFF, 64, 0x0003),
                vendor_config(),
                DeviceSpeed::Full,
                Vec::new(),
            ),
        };
        let ports = children
            .into_iter()
            .map(|child| SimPort {
                child: child.map(|device| self.build(device)),
                ..SimPort::default()
            })
            .collect();
        self.nodes.push(SimNode {
            device: descriptor,
            config,
            speed,
            address: 0,
            configuration: None,
            ports,
            responsive,
        });
        self.nodes.len() - 1
    }

    fn find(&self, address: u8) -> Option<usize> {
        self.nodes.iter().position(|node| node.address == address)
    }

    /// Address assigned to the root device
    pub fn root_address(&self) -> Option<u8> {
        self.root.map(|index| self.nodes[index].address)
    }

    /// Configuration selected on the device at `address`
    pub fn configuration_of(&self, address: u8) -> Option<u8> {
        self.find(address).and_then(|index| self.nodes[index].configuration)
    }

    /// Requests sent to `address` matching `(bmRequestType, bRequest, wValue)`
    pub fn count_requests(&self, address: u8, request_type: u8, request: u8, value: u16) -> usize {
        self.requests
            .iter()
            .filter(|(a, s)| {
                *a == address && s.request_type == request_type && s.request == request && s.value == value
            })
            .count()
    }

    /// SET_FEATURE(PORT_POWER) requests sent to a hub, one per port attempt
    pub fn port_power_requests(&self, hub_address: u8) -> usize {
        self.count_requests(hub_address, 0x23, request::SET_FEATURE, 8)
    }

    fn speed_bits(speed: DeviceSpeed) -> u16 {
        match speed {
            DeviceSpeed::Low => PortStatus::LOW_SPEED,
            DeviceSpeed::Full => 0,
            DeviceSpeed::High => PortStatus::HIGH_SPEED,
        }
    }

    fn copy_in(data: DataStage<'_>, source: &[u8]) -> Result<usize> {
        match data {
            DataStage::In(buf) => {
                let n = buf.len().min(source.len());
                buf[..n].copy_from_slice(&source[..n]);
                Ok(n)
            }
            _ => Err(UsbError::InvalidParameter),
        }
    }

    fn hub_port(&mut self, node: usize, port: u16) -> Result<&mut SimPort> {
        let index = usize::from(port).checked_sub(1).ok_or(UsbError::Stall)?;
        self.nodes[node].ports.get_mut(index).ok_or(UsbError::Stall)
    }
}

impl ControlPipe for SimBus {
    fn control_transfer(
        &mut self,
        target: ControlTarget,
        setup: &SetupPacket,
        data: DataStage<'_>,
    ) -> Result<usize> {
        self.requests.push((target.address, *setup));
        let node = if target.address == 0 {
            self.default_device
        } else {
            self.find(target.address)
        }
        .ok_or(UsbError::Timeout)?;
        if !self.nodes[node].responsive {
            return Err(UsbError::Timeout);
        }

        match (setup.request_type, setup.request) {
            (0x80, request::GET_DESCRIPTOR) => match (setup.value >> 8) as u8 {
                descriptor_type::DEVICE => {
                    let device = self.nodes[node].device;
                    Self::copy_in(data, &device)
                }
                descriptor_type::CONFIGURATION => {
                    let config = self.nodes[node].config.clone();
                    Self::copy_in(data, &config)
                }
                _ => Err(UsbError::Stall),
            },
            (0x00, request::SET_ADDRESS) => {
                self.nodes[node].address = setup.value as u8;
                self.default_device = None;
                Ok(0)
            }
            (0x00, request::SET_CONFIGURATION) => {
                self.nodes[node].configuration = Some(setup.value as u8);
                Ok(0)
            }
            (0xA0, request::GET_DESCRIPTOR) if !self.nodes[node].ports.is_empty() => {
                let ports = self.nodes[node].ports.len() as u8;
                Self::copy_in(data, &hub_descriptor(ports))
            }
            (0xA3, request::GET_STATUS) => {
                let port = self.hub_port(node, setup.index)?.clone();
                let mut status = 0;
                if port.powered {
                    status |= PortStatus::POWER;
                    if let Some(child) = port.child {
                        status |= PortStatus::CONNECTION | Self::speed_bits(self.nodes[child].speed);
                    }
                }
                if port.enabled {
                    status |= PortStatus::ENABLE;
                }
                let change = if port.reset_changed { PortStatus::C_RESET } else { 0 };
                let mut bytes = [0u8; 4];
                bytes[..2].copy_from_slice(&status.to_le_bytes());
                bytes[2..].copy_from_slice(&change.to_le_bytes());
                Self::copy_in(data, &bytes)
            }
            (0x23, request::SET_FEATURE) => {
                let feature = setup.value;
                let port = self.hub_port(node, setup.index)?;
                match feature {
                    8 => port.powered = true,
                    4 => {
                        if let (true, Some(child)) = (port.powered, port.child) {
                            port.enabled = true;
                            port.reset_changed = true;
                            self.default_device = Some(child);
                        }
                    }
                    _ => return Err(UsbError::Stall),
                }
                Ok(0)
            }
            (0x23, request::CLEAR_FEATURE) => {
                let port = self.hub_port(node, setup.index)?;
                if setup.value == 20 {
                    port.reset_changed = false;
                }
                Ok(0)
            }
            (0x21, 0x0B) if self.stall_set_protocol => Err(UsbError::Stall),
            (0x21, 0x0B) | (0x21, 0x0A) => Ok(0),
            _ => Err(UsbError::Stall),
        }
    }
}

impl HostBus for SimBus {
    fn root_port_power_on(&mut self) {
        self.root_powered = true;
    }

    fn root_port_status(&mut self) -> PortStatus {
        let mut status = 0;
        if self.root_powered {
            status |= PortStatus::POWER;
            if let Some(root) = self.root {
                status |= PortStatus::CONNECTION | Self::speed_bits(self.nodes[root].speed);
            }
        }
        if self.root_enabled {
            status |= PortStatus::ENABLE;
        }
        PortStatus { status, change: 0 }
    }

    fn set_root_port_reset(&mut self, asserted: bool) {
        if asserted {
            self.root_enabled = false;
        } else if let (true, Some(root)) = (self.root_powered, self.root) {
            self.root_enabled = true;
            self.default_device = Some(root);
        }
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delayed_ms += u64::from(ms);
    }
}
