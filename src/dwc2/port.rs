//! Root port (HPRT) access
//!
//! Every write to HPRT is built from a read with the write-sensitive bits
//! masked off. Writing ENA back as read would disable the port.

use super::{offsets, HPrt, RegisterIo};
use crate::hub::PortStatus;

/// Host root port
pub struct RootPort<'r, R: RegisterIo> {
    regs: &'r R,
}

impl<'r, R: RegisterIo> RootPort<'r, R> {
    /// Root port of the core behind `regs`
    pub const fn new(regs: &'r R) -> Self {
        Self { regs }
    }

    /// Raw HPRT
    pub fn read(&self) -> HPrt {
        HPrt::from_bits_retain(self.regs.read(offsets::HPRT))
    }

    /// Root port status in the same shape a hub reports for its ports
    pub fn status(&self) -> PortStatus {
        PortStatus::from_root(self.read())
    }

    /// Write `value` with the write-sensitive bits removed
    fn write_preserving(&self, value: HPrt) {
        self.regs
            .write(offsets::HPRT, value.difference(HPrt::WRITE_SENSITIVE).bits());
    }

    /// Turn on VBUS
    pub fn power_on(&self) {
        self.write_preserving(self.read() | HPrt::PWR);
    }

    /// Drive or release bus reset
    pub fn set_reset(&self, asserted: bool) {
        let hprt = self.read();
        if asserted {
            self.write_preserving(hprt | HPrt::RST);
        } else {
            self.write_preserving(hprt - HPrt::RST);
        }
    }

    /// Acknowledge the change bits in `observed` without disabling the port
    pub fn acknowledge(&self, observed: HPrt) {
        self.regs.write(offsets::HPRT, (observed - HPrt::ENA).bits());
    }
}
