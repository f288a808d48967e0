//! Keyboard interrupt-IN lifecycle on host channel 1
//!
//! At most one transfer is in flight. The channel interrupt handler
//! classifies the outcome, pushes any report into the ring and re-arms the
//! channel immediately, so input latency is roughly one frame rather than the
//! endpoint's polling interval. The timer tick backs this up twice: a
//! watchdog reaps a transfer that has been pending too long, and a fallback
//! starts one if nothing is pending and the channel is idle.
//!
//! Nothing here logs; this code runs in interrupt context.

use crate::dma::DmaBuffer;
use crate::dwc2::{
    offsets, Channel, ChannelConfig, EndpointType, HcInt, RegisterIo, HFNUM_FRNUM_MASK,
    KEYBOARD_CHANNEL,
};
use crate::hal::Platform;
use crate::hid::ring::{push_report, ReportProducer};
use crate::hid::{KeyboardEndpoint, RawReport, BOOT_REPORT_LEN};
use crate::hub::DeviceSpeed;
use crate::stats::DebugStats;
use crate::transfer::{Direction, Pid};

/// Outcome of one keyboard channel interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelEvent {
    /// Transfer completed; bytes received
    Data(usize),
    /// Device had nothing new
    Nak,
    /// STALL, transaction error or babble
    Error,
    /// Halted without a recognised status (forced disable)
    Halted,
}

/// Keyboard polling state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyboardPoller {
    endpoint: Option<KeyboardEndpoint>,
    data1: bool,
    pending: bool,
    last_tick: u32,
}

impl KeyboardPoller {
    /// No keyboard registered
    pub const fn new() -> Self {
        Self {
            endpoint: None,
            data1: false,
            pending: false,
            last_tick: 0,
        }
    }

    /// Register (or clear) the keyboard; the toggle restarts at DATA0
    pub fn register(&mut self, endpoint: Option<KeyboardEndpoint>) {
        self.endpoint = endpoint;
        self.data1 = false;
        self.pending = false;
    }

    /// Registered keyboard
    pub fn endpoint(&self) -> Option<KeyboardEndpoint> {
        self.endpoint
    }

    /// A transfer is believed to be in flight
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Forget the in-flight transfer
    pub fn clear_pending(&mut self) {
        self.pending = false;
    }

    /// PID the next transfer will use
    pub fn next_pid(&self) -> Pid {
        Pid::from_toggle(self.data1)
    }

    /// Tick at which the current transfer was started
    pub fn last_tick(&self) -> u32 {
        self.last_tick
    }

    /// Program and enable one 8-byte interrupt-IN transfer
    ///
    /// Counts a restart even when it backs off because the channel is still
    /// enabled; the caller decides whether a start is wanted at all.
    pub fn submit<R: RegisterIo, P: Platform, const N: usize>(
        &mut self,
        regs: &R,
        platform: &P,
        buffer: &mut DmaBuffer<N>,
        now: u32,
        stats: &DebugStats,
    ) {
        stats.record_keyboard_restart();
        let Some(keyboard) = self.endpoint else {
            return;
        };
        let channel = Channel::new(regs, KEYBOARD_CHANNEL);
        if channel.is_enabled() {
            return;
        }
        if buffer.prepare_in(platform, BOOT_REPORT_LEN).is_err() {
            return;
        }

        self.pending = true;
        self.last_tick = now;

        let frame = regs.read(offsets::HFNUM) & HFNUM_FRNUM_MASK;
        let config = ChannelConfig {
            device_address: keyboard.address,
            endpoint: keyboard.endpoint,
            max_packet_size: keyboard.packet_size(),
            endpoint_type: EndpointType::Interrupt,
            direction: Direction::In,
            low_speed: matches!(keyboard.speed, DeviceSpeed::Low),
            odd_frame: frame & 1 == 1,
        };

        channel.clear_interrupts();
        channel.set_interrupt_mask(HcInt::CHHLTD | HcInt::XACTERR | HcInt::BBLERR);
        channel.set_dma_address(buffer.bus_address(platform));
        channel.set_transfer_size(BOOT_REPORT_LEN as u32, 1, self.next_pid());
        channel.enable(config.characteristics());
    }

    /// Handle the keyboard channel's interrupt
    ///
    /// Flips the toggle and pushes the report on success, counts NAKs and
    /// errors, then acknowledges the channel and clears `pending`. The
    /// caller restarts the transfer.
    pub fn on_channel_interrupt<R: RegisterIo, P: Platform, const N: usize>(
        &mut self,
        regs: &R,
        platform: &P,
        buffer: &DmaBuffer<N>,
        producer: &mut ReportProducer<'_>,
        stats: &DebugStats,
    ) -> ChannelEvent {
        let channel = Channel::new(regs, KEYBOARD_CHANNEL);
        let hcint = channel.interrupts();
        stats.record_keyboard_irq();

        let event = if hcint.contains(HcInt::XFERCOMPL)
            || hcint.contains(HcInt::CHHLTD | HcInt::ACK)
        {
            self.data1 = !self.data1;
            let remaining = channel.remaining_bytes() as usize;
            let received = BOOT_REPORT_LEN.saturating_sub(remaining);
            if received > 0 {
                let mut report = RawReport::default();
                buffer.complete_in(platform, &mut report[..received]);
                if !push_report(producer, report) {
                    stats.record_report_dropped();
                }
                stats.record_keyboard_data();
            }
            ChannelEvent::Data(received)
        } else if hcint.contains(HcInt::NAK) {
            stats.record_keyboard_nak();
            ChannelEvent::Nak
        } else if hcint.intersects(HcInt::STALL | HcInt::XACTERR | HcInt::BBLERR) {
            stats.record_keyboard_error();
            ChannelEvent::Error
        } else {
            ChannelEvent::Halted
        };

        channel.clear_interrupts();
        self.pending = false;
        event
    }

    /// Reap a transfer pending for `threshold` ticks or more
    ///
    /// Returns `true` if the watchdog fired; the channel is then idle with
    /// its interrupts cleared and the caller must restart.
    pub fn check_watchdog<R: RegisterIo>(
        &mut self,
        regs: &R,
        now: u32,
        threshold: u32,
        halt_polls: u32,
        stats: &DebugStats,
    ) -> bool {
        if !self.pending || now.wrapping_sub(self.last_tick) < threshold {
            return false;
        }
        stats.record_watchdog_kick();
        // A channel that never reports CHHLTD is reprogrammed anyway.
        let _ = Channel::new(regs, KEYBOARD_CHANNEL).halt(halt_polls);
        self.pending = false;
        true
    }

    /// Nothing pending and the channel is idle
    pub fn is_idle<R: RegisterIo>(&self, regs: &R) -> bool {
        !self.pending && !Channel::new(regs, KEYBOARD_CHANNEL).is_enabled()
    }
}

impl Default for KeyboardPoller {
    fn default() -> Self {
        Self::new()
    }
}
