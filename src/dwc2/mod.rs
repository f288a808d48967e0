//! Synopsys DesignWare USB 2.0 OTG (DWC2) register map
//!
//! Offsets and bit definitions for the subset of the core used in host mode
//! with internal DMA: the global block, the host block, the root port and the
//! host channels. Every access goes through [`RegisterIo`], so tests can swap
//! the MMIO window for a simulated register file.
//!
//! # Register Memory Layout
//!
//! - Global registers (0x000-0x3FF)
//! - Host registers (0x400-0x4FF), root port control at 0x440
//! - Host channels (0x500 + 0x20 * n)

pub mod register;
pub mod channel;
pub mod port;
pub mod controller;

pub use register::{Mmio, PollBudget, RegisterIo};
pub use channel::{Channel, ChannelConfig, EndpointType};
pub use port::RootPort;
pub use controller::Dwc2Controller;

use bitflags::bitflags;

/// DWC2 base address on the BCM2837 (Raspberry Pi Zero 2 W)
pub const BCM2837_USB_BASE: usize = 0x3F98_0000;

/// Host channel reserved for control transfers
pub const CONTROL_CHANNEL: usize = 0;

/// Host channel reserved for keyboard interrupt-IN polling
pub const KEYBOARD_CHANNEL: usize = 1;

/// Number of host channels this driver touches
pub const CHANNELS_USED: usize = 2;

/// Register offsets relative to the core base
pub mod offsets {
    /// OTG control and status
    pub const GOTGCTL: usize = 0x000;
    /// AHB configuration
    pub const GAHBCFG: usize = 0x008;
    /// USB configuration
    pub const GUSBCFG: usize = 0x00C;
    /// Reset control
    pub const GRSTCTL: usize = 0x010;
    /// Core interrupt status
    pub const GINTSTS: usize = 0x014;
    /// Core interrupt mask
    pub const GINTMSK: usize = 0x018;
    /// Host configuration
    pub const HCFG: usize = 0x400;
    /// Host frame interval
    pub const HFIR: usize = 0x404;
    /// Host frame number / frame time remaining
    pub const HFNUM: usize = 0x408;
    /// Host all-channels interrupt
    pub const HAINT: usize = 0x414;
    /// Host all-channels interrupt mask
    pub const HAINTMSK: usize = 0x418;
    /// Host port control and status
    pub const HPRT: usize = 0x440;

    /// First host channel block
    pub const HC_BASE: usize = 0x500;
    /// Distance between host channel blocks
    pub const HC_STRIDE: usize = 0x20;

    /// Channel characteristics (within a channel block)
    pub const HCCHAR: usize = 0x00;
    /// Channel split control
    pub const HCSPLT: usize = 0x04;
    /// Channel interrupt
    pub const HCINT: usize = 0x08;
    /// Channel interrupt mask
    pub const HCINTMSK: usize = 0x0C;
    /// Channel transfer size
    pub const HCTSIZ: usize = 0x10;
    /// Channel DMA address
    pub const HCDMA: usize = 0x14;

    /// Absolute offset of a register inside channel `ch`'s block
    #[inline(always)]
    pub const fn channel(ch: usize, reg: usize) -> usize {
        HC_BASE + ch * HC_STRIDE + reg
    }
}

bitflags! {
    /// Core interrupt status (GINTSTS) bit definitions
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GIntSts: u32 {
        /// Current mode of operation (1 = host)
        const CURMOD = 1 << 0;
        /// Start of frame
        const SOF = 1 << 3;
        /// Host port interrupt
        const PRTINT = 1 << 24;
        /// Host channels interrupt
        const HCINT = 1 << 25;
        /// Disconnect detected
        const DISCONNINT = 1 << 29;
    }
}

bitflags! {
    /// AHB configuration (GAHBCFG) bit definitions
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GAhbCfg: u32 {
        /// Global interrupt unmask
        const GLBLINTRMSK = 1 << 0;
        /// Internal DMA enable
        const DMAEN = 1 << 5;
    }
}

bitflags! {
    /// USB configuration (GUSBCFG) bit definitions
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GUsbCfg: u32 {
        /// Force host mode
        const FHMOD = 1 << 29;
        /// Force device mode
        const FDMOD = 1 << 30;
    }
}

bitflags! {
    /// Reset control (GRSTCTL) bit definitions
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GRstCtl: u32 {
        /// Core soft reset, self-clearing
        const CSFTRST = 1 << 0;
        /// RX FIFO flush
        const RXFFLSH = 1 << 4;
        /// TX FIFO flush
        const TXFFLSH = 1 << 5;
        /// TX FIFO number field; 0x10 selects every FIFO
        const TXFNUM_ALL = 0x10 << 6;
        /// AHB master idle
        const AHBIDL = 1 << 31;
    }
}

bitflags! {
    /// Host port control and status (HPRT) bit definitions
    ///
    /// CONNDET, ENCHNG and OVRCURRCHNG are write-1-to-clear. ENA is
    /// write-1-to-disable and must never be written back as read.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HPrt: u32 {
        /// Port connect status
        const CONNSTS = 1 << 0;
        /// Port connect detected (W1C)
        const CONNDET = 1 << 1;
        /// Port enable (write 1 disables)
        const ENA = 1 << 2;
        /// Port enable changed (W1C)
        const ENCHNG = 1 << 3;
        /// Over-current active
        const OVRCURRACT = 1 << 4;
        /// Over-current changed (W1C)
        const OVRCURRCHNG = 1 << 5;
        /// Port reset
        const RST = 1 << 8;
        /// Port power
        const PWR = 1 << 12;
        /// Port speed field, bits [18:17]
        const SPD_MASK = 0b11 << 17;
    }
}

impl HPrt {
    /// Bits that must be masked off any read-modify-write that is not meant
    /// to acknowledge a change or disable the port
    pub const WRITE_SENSITIVE: Self = Self::CONNDET
        .union(Self::ENA)
        .union(Self::ENCHNG)
        .union(Self::OVRCURRCHNG);

    /// Raw two-bit speed field (0 = high, 1 = full, 2 = low)
    #[inline(always)]
    pub const fn speed_field(self) -> u32 {
        (self.bits() & Self::SPD_MASK.bits()) >> 17
    }
}

bitflags! {
    /// Host channel interrupt (HCINT / HCINTMSK) bit definitions
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HcInt: u32 {
        /// Transfer completed
        const XFERCOMPL = 1 << 0;
        /// Channel halted
        const CHHLTD = 1 << 1;
        /// AHB error
        const AHBERR = 1 << 2;
        /// STALL response received
        const STALL = 1 << 3;
        /// NAK response received
        const NAK = 1 << 4;
        /// ACK response received
        const ACK = 1 << 5;
        /// NYET response received
        const NYET = 1 << 6;
        /// Transaction error
        const XACTERR = 1 << 7;
        /// Babble error
        const BBLERR = 1 << 8;
        /// Frame overrun
        const FRMOVRUN = 1 << 9;
        /// Data toggle error
        const DATATGLERR = 1 << 10;
    }
}

impl HcInt {
    /// Value written to HCINT to acknowledge every pending bit
    pub const CLEAR_ALL: u32 = 0xFFFF_FFFF;

    /// Conditions that end a transaction with a hard failure
    pub const HARD_ERRORS: Self = Self::STALL
        .union(Self::XACTERR)
        .union(Self::BBLERR)
        .union(Self::AHBERR);
}

bitflags! {
    /// Host channel characteristics (HCCHAR) single-bit flags
    ///
    /// Multi-bit fields are packed by [`ChannelConfig`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HcChar: u32 {
        /// Endpoint direction (1 = IN)
        const EPDIR = 1 << 15;
        /// Low-speed device
        const LSDEV = 1 << 17;
        /// Schedule in odd frames
        const ODDFRM = 1 << 29;
        /// Channel disable
        const CHDIS = 1 << 30;
        /// Channel enable
        const CHENA = 1 << 31;
    }
}

/// Host channel transfer size (HCTSIZ) field layout
pub mod hctsiz {
    /// Transfer size in bytes, bits [18:0]
    pub const XFERSIZE_MASK: u32 = 0x7_FFFF;
    /// Packet count shift, bits [28:19]
    pub const PKTCNT_SHIFT: u32 = 19;
    /// Packet count mask (after shifting)
    pub const PKTCNT_MASK: u32 = 0x3FF;
    /// PID shift, bits [30:29]
    pub const PID_SHIFT: u32 = 29;
}

/// HFNUM frame number mask
pub const HFNUM_FRNUM_MASK: u32 = 0xFFFF;

const _: () = {
    assert!(offsets::channel(1, offsets::HCCHAR) == 0x520);
    assert!(offsets::channel(0, offsets::HCDMA) == 0x514);
};
