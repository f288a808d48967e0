//! Controller interrupt dispatch
//!
//! Runs in interrupt context: bounded work, no logging, no blocking. Root
//! port events are acknowledged without ever writing ENA back (that would
//! disable the port), and a port that drops its enable while the device is
//! still attached is handed to [`crate::recovery`] instead of being treated
//! as a disconnect.

use crate::dwc2::{offsets, Channel, GIntSts, HPrt, RegisterIo, RootPort, KEYBOARD_CHANNEL};
use crate::hal::Platform;
use crate::host::UsbHost;

/// HAINT carries one bit per host channel in its low half
const HAINT_CHANNEL_MASK: u32 = 0xFFFF;

impl<R: RegisterIo, P: Platform> UsbHost<'_, R, P> {
    /// Service the DWC2 interrupt line
    pub fn irq_handler(&mut self) {
        self.shared.stats().record_irq();
        let gintsts = GIntSts::from_bits_retain(self.regs.read(offsets::GINTSTS));

        if gintsts.contains(GIntSts::PRTINT) {
            self.handle_port_interrupt();
        }
        if gintsts.contains(GIntSts::HCINT) {
            self.handle_channel_interrupts();
        }

        self.regs.write(offsets::GINTSTS, gintsts.bits());
    }

    fn handle_port_interrupt(&mut self) {
        self.shared.stats().record_port_irq();
        let port = RootPort::new(&self.regs);
        let hprt = port.read();
        port.acknowledge(hprt);

        // Enable dropped with the device still attached: reset and let the
        // tick bring the port back.
        if hprt.contains(HPrt::ENCHNG)
            && !hprt.contains(HPrt::ENA)
            && hprt.contains(HPrt::CONNSTS)
            && self.recovery.begin(&port)
        {
            self.keyboard.clear_pending();
        }

        if hprt.contains(HPrt::CONNDET) && !hprt.contains(HPrt::CONNSTS) {
            self.recovery.cancel(&port);
            self.shared.set_connected(false);
            self.shared.clear_keyboard();
            self.keyboard.register(None);
            if self.config.evict_on_disconnect {
                self.devices.reset();
            }
        }
    }

    fn handle_channel_interrupts(&mut self) {
        let mut haint = self.regs.read(offsets::HAINT) & HAINT_CHANNEL_MASK;
        while haint != 0 {
            let channel = haint.trailing_zeros() as usize;
            haint &= haint - 1;

            if channel == KEYBOARD_CHANNEL && self.shared.keyboard_address().is_some() {
                self.keyboard.on_channel_interrupt(
                    &self.regs,
                    &self.platform,
                    &*self.interrupt_buffer,
                    &mut self.producer,
                    self.shared.stats(),
                );
                self.submit_keyboard();
            } else {
                Channel::new(&self.regs, channel).clear_interrupts();
            }
        }
    }
}
