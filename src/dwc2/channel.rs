//! Typed host channel register block
//!
//! A channel goes idle → configured → enabled → halted → acknowledged → idle.
//! [`Channel`] exposes exactly the operations those transitions need; it
//! never decides when to perform them.

use super::{hctsiz, offsets, HcChar, HcInt, PollBudget, RegisterIo};
use crate::error::Result;
use crate::transfer::{Direction, Pid};

/// Endpoint type field of HCCHAR
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum EndpointType {
    /// Control endpoint
    Control = 0,
    /// Isochronous endpoint
    Isochronous = 1,
    /// Bulk endpoint
    Bulk = 2,
    /// Interrupt endpoint
    Interrupt = 3,
}

/// Everything HCCHAR encodes about the target endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Device address (0-127)
    pub device_address: u8,
    /// Endpoint number (0-15)
    pub endpoint: u8,
    /// Endpoint max packet size
    pub max_packet_size: u16,
    /// Endpoint type
    pub endpoint_type: EndpointType,
    /// Transfer direction
    pub direction: Direction,
    /// Target is a low-speed device
    pub low_speed: bool,
    /// Schedule in the next odd frame
    pub odd_frame: bool,
}

impl ChannelConfig {
    const MPS_MASK: u32 = 0x7FF;
    const EPNUM_SHIFT: u32 = 11;
    const EPTYPE_SHIFT: u32 = 18;
    const MC_SHIFT: u32 = 20;
    const DEVADDR_SHIFT: u32 = 22;

    /// Control endpoint 0 of `device_address`
    pub const fn control(device_address: u8, max_packet_size: u16, low_speed: bool) -> Self {
        Self {
            device_address,
            endpoint: 0,
            max_packet_size,
            endpoint_type: EndpointType::Control,
            direction: Direction::Out,
            low_speed,
            odd_frame: false,
        }
    }

    /// Same endpoint, other direction
    pub const fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// HCCHAR value with CHENA clear
    pub const fn characteristics(&self) -> u32 {
        let mut value = (self.max_packet_size as u32 & Self::MPS_MASK)
            | ((self.endpoint as u32 & 0xF) << Self::EPNUM_SHIFT)
            | ((self.endpoint_type as u32) << Self::EPTYPE_SHIFT)
            | (1 << Self::MC_SHIFT)
            | ((self.device_address as u32 & 0x7F) << Self::DEVADDR_SHIFT);
        if matches!(self.direction, Direction::In) {
            value |= HcChar::EPDIR.bits();
        }
        if self.low_speed {
            value |= HcChar::LSDEV.bits();
        }
        if self.odd_frame {
            value |= HcChar::ODDFRM.bits();
        }
        value
    }
}

/// HCTSIZ value for one transfer
#[inline(always)]
pub const fn transfer_size(bytes: u32, packets: u32, pid: Pid) -> u32 {
    (bytes & hctsiz::XFERSIZE_MASK)
        | ((packets & hctsiz::PKTCNT_MASK) << hctsiz::PKTCNT_SHIFT)
        | ((pid as u32) << hctsiz::PID_SHIFT)
}

/// One host channel's register block
pub struct Channel<'r, R: RegisterIo> {
    regs: &'r R,
    index: usize,
}

impl<'r, R: RegisterIo> Channel<'r, R> {
    /// Channel `index` of the core behind `regs`
    pub const fn new(regs: &'r R, index: usize) -> Self {
        Self { regs, index }
    }

    /// Channel number
    pub const fn index(&self) -> usize {
        self.index
    }

    #[inline(always)]
    fn offset(&self, reg: usize) -> usize {
        offsets::channel(self.index, reg)
    }

    /// Raw HCCHAR
    pub fn characteristics(&self) -> u32 {
        self.regs.read(self.offset(offsets::HCCHAR))
    }

    /// Hardware is still executing a transaction
    pub fn is_enabled(&self) -> bool {
        self.characteristics() & HcChar::CHENA.bits() != 0
    }

    /// Pending interrupt conditions
    pub fn interrupts(&self) -> HcInt {
        HcInt::from_bits_retain(self.regs.read(self.offset(offsets::HCINT)))
    }

    /// Acknowledge every pending interrupt condition
    pub fn clear_interrupts(&self) {
        self.regs.write(self.offset(offsets::HCINT), HcInt::CLEAR_ALL);
    }

    /// Choose which conditions raise the channel interrupt
    pub fn set_interrupt_mask(&self, mask: HcInt) {
        self.regs.write(self.offset(offsets::HCINTMSK), mask.bits());
    }

    /// Program transfer size, packet count and PID
    pub fn set_transfer_size(&self, bytes: u32, packets: u32, pid: Pid) {
        self.regs
            .write(self.offset(offsets::HCTSIZ), transfer_size(bytes, packets, pid));
    }

    /// Bytes the hardware did not transfer
    pub fn remaining_bytes(&self) -> u32 {
        self.regs.read(self.offset(offsets::HCTSIZ)) & hctsiz::XFERSIZE_MASK
    }

    /// Program the DMA bus address
    pub fn set_dma_address(&self, bus_address: u32) {
        self.regs.write(self.offset(offsets::HCDMA), bus_address);
    }

    /// Write HCCHAR with CHENA set, handing the transaction to hardware
    pub fn enable(&self, characteristics: u32) {
        let value = (characteristics | HcChar::CHENA.bits()) & !HcChar::CHDIS.bits();
        self.regs.write(self.offset(offsets::HCCHAR), value);
    }

    /// Re-arm the transaction already programmed, used after a NAK
    pub fn reenable(&self) {
        self.regs.modify(self.offset(offsets::HCCHAR), |v| {
            (v | HcChar::CHENA.bits()) & !HcChar::CHDIS.bits()
        });
    }

    /// Ask the hardware to halt; completion is signalled by CHHLTD
    pub fn request_disable(&self) {
        self.regs
            .set_bits(self.offset(offsets::HCCHAR), HcChar::CHDIS.bits());
    }

    /// Force the channel idle: request a disable if it is enabled, wait a
    /// bounded number of polls for CHHLTD, then acknowledge everything.
    ///
    /// Returns `Err(Timeout)` if the halt was never observed; the interrupt
    /// bits are cleared regardless.
    pub fn halt(&self, max_polls: u32) -> Result<()> {
        let result = if self.is_enabled() {
            self.regs.set_bits(
                self.offset(offsets::HCCHAR),
                HcChar::CHDIS.bits() | HcChar::CHENA.bits(),
            );
            PollBudget::new(max_polls).wait_for(|| self.interrupts().contains(HcInt::CHHLTD))
        } else {
            Ok(())
        };
        self.clear_interrupts();
        result
    }
}
