//! DWC2 core bring-up for host mode with internal DMA
//!
//! The lifecycle is tracked in the type: a core must be reset into host mode
//! (`initialize`) before its interrupts are unmasked and the root port is
//! powered (`start`).

use core::marker::PhantomData;

use super::{
    offsets, GAhbCfg, GIntSts, GRstCtl, GUsbCfg, PollBudget, RegisterIo, RootPort,
    KEYBOARD_CHANNEL,
};
use crate::config::timing;
use crate::error::{Result, UsbError};
use crate::hal::Platform;

/// Core not yet reset
pub struct Uninitialized;
/// Core reset, in host mode, DMA enabled
pub struct Initialized;
/// Interrupts unmasked, root port powered
pub struct Running;

/// DWC2 core with compile-time lifecycle state
pub struct Dwc2Controller<'r, R: RegisterIo, State = Uninitialized> {
    regs: &'r R,
    _state: PhantomData<State>,
}

impl<'r, R: RegisterIo> Dwc2Controller<'r, R, Uninitialized> {
    /// Core behind `regs`
    pub const fn new(regs: &'r R) -> Self {
        Self {
            regs,
            _state: PhantomData,
        }
    }

    /// Soft-reset the core, force host mode, enable DMA, flush FIFOs
    pub fn initialize<P: Platform>(self, platform: &P) -> Result<Dwc2Controller<'r, R, Initialized>> {
        self.wait_ahb_idle()?;

        self.regs.set_bits(offsets::GRSTCTL, GRstCtl::CSFTRST.bits());
        PollBudget::new(timing::CORE_RESET_POLLS)
            .wait_for(|| self.regs.read(offsets::GRSTCTL) & GRstCtl::CSFTRST.bits() == 0)
            .map_err(|_| UsbError::CoreResetTimeout)?;
        self.wait_ahb_idle()?;
        log::debug!("DWC2 core reset complete");

        self.regs.modify(offsets::GUSBCFG, |v| {
            (v & !GUsbCfg::FDMOD.bits()) | GUsbCfg::FHMOD.bits()
        });
        platform.sleep_ms(timing::FORCE_HOST_SETTLE_MS);

        self.regs.set_bits(
            offsets::GAHBCFG,
            (GAhbCfg::DMAEN | GAhbCfg::GLBLINTRMSK).bits(),
        );

        self.flush_fifos()?;

        if self.regs.read(offsets::GINTSTS) & GIntSts::CURMOD.bits() == 0 {
            log::warn!("DWC2 core does not report host mode after reset");
        }
        log::info!("DWC2 core in host mode, DMA enabled");

        Ok(Dwc2Controller {
            regs: self.regs,
            _state: PhantomData,
        })
    }

    fn wait_ahb_idle(&self) -> Result<()> {
        PollBudget::new(timing::CORE_RESET_POLLS)
            .wait_for(|| self.regs.read(offsets::GRSTCTL) & GRstCtl::AHBIDL.bits() != 0)
            .map_err(|_| UsbError::CoreResetTimeout)
    }

    fn flush_fifos(&self) -> Result<()> {
        self.regs.write(
            offsets::GRSTCTL,
            (GRstCtl::TXFFLSH | GRstCtl::TXFNUM_ALL).bits(),
        );
        PollBudget::new(timing::CORE_RESET_POLLS)
            .wait_for(|| self.regs.read(offsets::GRSTCTL) & GRstCtl::TXFFLSH.bits() == 0)
            .map_err(|_| UsbError::CoreResetTimeout)?;

        self.regs.write(offsets::GRSTCTL, GRstCtl::RXFFLSH.bits());
        PollBudget::new(timing::CORE_RESET_POLLS)
            .wait_for(|| self.regs.read(offsets::GRSTCTL) & GRstCtl::RXFFLSH.bits() == 0)
            .map_err(|_| UsbError::CoreResetTimeout)
    }
}

impl<'r, R: RegisterIo> Dwc2Controller<'r, R, Initialized> {
    /// Unmask port and channel interrupts and power the root port
    pub fn start(self) -> Dwc2Controller<'r, R, Running> {
        self.regs
            .write(offsets::GINTMSK, (GIntSts::PRTINT | GIntSts::HCINT).bits());
        // Channel 0 is busy-polled by control transfers
        self.regs.write(offsets::HAINTMSK, 1u32 << KEYBOARD_CHANNEL);
        self.regs.write(offsets::GINTSTS, u32::MAX);
        RootPort::new(self.regs).power_on();

        Dwc2Controller {
            regs: self.regs,
            _state: PhantomData,
        }
    }
}

impl<'r, R: RegisterIo, State> Dwc2Controller<'r, R, State> {
    /// Root port
    pub fn root_port(&self) -> RootPort<'r, R> {
        RootPort::new(self.regs)
    }
}
