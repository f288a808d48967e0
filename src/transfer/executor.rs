//! Single-transaction execution on a host channel
//!
//! One call programs the channel for one SETUP, DATA or STATUS phase, hands
//! it to the DMA engine and busy-waits with a bounded budget until the
//! interrupt status says how it ended. The wait never blocks forever: a
//! transaction that neither completes nor fails becomes `UsbError::Timeout`.

use crate::dma::{DmaBuffer, DMA_MAX_TRANSFER};
use crate::dwc2::{Channel, ChannelConfig, HcInt, RegisterIo};
use crate::error::{Result, UsbError};
use crate::hal::Platform;
use crate::transfer::{packet_count, Direction, Pid};

/// Retry budget for one transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Rounds of polling, each ended by a NAK or by poll exhaustion. Only a
    /// halted channel is re-armed between rounds.
    pub max_retries: u32,
    /// Status polls per attempt, each followed by a 1 µs yield
    pub polls_per_retry: u32,
    /// Pause before re-enabling the channel
    pub backoff_us: u32,
}

impl RetryPolicy {
    /// Budget for a given retry count with the standard poll ceiling
    pub const fn with_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            polls_per_retry: crate::config::timing::POLLS_PER_RETRY,
            backoff_us: crate::config::timing::RETRY_BACKOFF_US,
        }
    }
}

/// How the channel's interrupt status classifies the transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Nothing terminal yet
    Pending,
    /// Transaction finished successfully
    Done,
    /// Device NAKed; re-enable and try again
    Retry,
    /// Hard failure, no retry
    Failed(UsbError),
}

/// Classify a channel interrupt status
///
/// Priority: XFERCOMPL, halted with ACK, halted with NAK, halted with an
/// error, other halts (treated as done), then bare error bits.
pub fn classify(hcint: HcInt) -> Completion {
    if hcint.contains(HcInt::XFERCOMPL) {
        return Completion::Done;
    }
    if hcint.contains(HcInt::CHHLTD) {
        if hcint.contains(HcInt::ACK) {
            return Completion::Done;
        }
        if hcint.contains(HcInt::NAK) {
            return Completion::Retry;
        }
        if let Some(error) = hard_error(hcint) {
            return Completion::Failed(error);
        }
        return Completion::Done;
    }
    match hard_error(hcint) {
        Some(error) => Completion::Failed(error),
        None => Completion::Pending,
    }
}

fn hard_error(hcint: HcInt) -> Option<UsbError> {
    if hcint.contains(HcInt::AHBERR) {
        Some(UsbError::HostSystemError)
    } else if hcint.contains(HcInt::STALL) {
        Some(UsbError::Stall)
    } else if hcint.contains(HcInt::BBLERR) {
        Some(UsbError::Babble)
    } else if hcint.contains(HcInt::XACTERR) {
        Some(UsbError::TransactionError)
    } else {
        None
    }
}

/// Payload of one transaction; the variant fixes its direction
#[derive(Debug)]
pub enum Payload<'a> {
    /// Receive into this buffer (may be empty for a zero-length STATUS)
    In(&'a mut [u8]),
    /// Send these bytes (may be empty)
    Out(&'a [u8]),
}

impl Payload<'_> {
    /// Requested length
    pub fn len(&self) -> usize {
        match self {
            Self::In(buf) => buf.len(),
            Self::Out(buf) => buf.len(),
        }
    }

    /// Zero-length transaction
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Direction implied by the variant
    pub fn direction(&self) -> Direction {
        match self {
            Self::In(_) => Direction::In,
            Self::Out(_) => Direction::Out,
        }
    }
}

/// Runs transactions on one channel through one DMA bounce buffer
pub struct ChannelExecutor<'a, R: RegisterIo, P: Platform, const N: usize> {
    channel: Channel<'a, R>,
    platform: &'a P,
    buffer: &'a mut DmaBuffer<N>,
}

impl<'a, R: RegisterIo, P: Platform, const N: usize> ChannelExecutor<'a, R, P, N> {
    /// Executor for channel `index`
    pub fn new(regs: &'a R, platform: &'a P, buffer: &'a mut DmaBuffer<N>, index: usize) -> Self {
        Self {
            channel: Channel::new(regs, index),
            platform,
            buffer,
        }
    }

    /// Underlying channel
    pub fn channel(&self) -> &Channel<'a, R> {
        &self.channel
    }

    /// Execute one transaction and return the bytes moved
    ///
    /// OUT payloads are cleaned to memory before the channel is enabled. IN
    /// payloads are invalidated before enabling and again before the CPU
    /// reads them; the count is the request minus the hardware's remaining
    /// byte count, so short reads are reported as such.
    pub fn execute(
        &mut self,
        config: ChannelConfig,
        pid: Pid,
        payload: Payload<'_>,
        policy: &RetryPolicy,
    ) -> Result<usize> {
        let len = payload.len();
        if len > N.min(DMA_MAX_TRANSFER) {
            return Err(UsbError::BufferOverflow);
        }

        match &payload {
            Payload::Out(bytes) => self.buffer.prepare_out(self.platform, bytes)?,
            Payload::In(_) => self.buffer.prepare_in(self.platform, len)?,
        }

        let config = config.with_direction(payload.direction());
        let packets = packet_count(len, config.max_packet_size);

        self.channel.clear_interrupts();
        self.channel.set_interrupt_mask(
            HcInt::XFERCOMPL | HcInt::CHHLTD | HcInt::HARD_ERRORS | HcInt::NAK | HcInt::ACK,
        );
        self.channel
            .set_dma_address(self.buffer.bus_address(self.platform));
        self.channel.set_transfer_size(len as u32, packets, pid);
        self.channel.enable(config.characteristics());

        self.wait_for_completion(policy)?;

        match payload {
            Payload::Out(_) => Ok(len),
            Payload::In(out) => {
                let remaining = self.channel.remaining_bytes() as usize;
                let received = len.saturating_sub(remaining);
                self.buffer.complete_in(self.platform, &mut out[..received]);
                Ok(received)
            }
        }
    }

    /// Poll the channel until the transaction ends or the budget runs out
    pub fn wait_for_completion(&self, policy: &RetryPolicy) -> Result<()> {
        for attempt in 0..policy.max_retries {
            for _ in 0..policy.polls_per_retry {
                match classify(self.channel.interrupts()) {
                    Completion::Pending => self.platform.sleep_us(1),
                    Completion::Done => {
                        self.channel.clear_interrupts();
                        return Ok(());
                    }
                    Completion::Failed(error) => {
                        self.channel.clear_interrupts();
                        log::debug!(
                            "channel {} transaction failed: {}",
                            self.channel.index(),
                            error
                        );
                        return Err(error);
                    }
                    Completion::Retry => {
                        self.channel.clear_interrupts();
                        break;
                    }
                }
            }

            if attempt + 1 < policy.max_retries {
                // A round that ran dry without a halt leaves the transaction
                // in flight; writing CHENA again would double-start it.
                if !self.channel.is_enabled() {
                    self.channel.reenable();
                }
                self.platform.sleep_us(policy.backoff_us);
            }
        }

        log::debug!(
            "channel {} timed out after {} retries",
            self.channel.index(),
            policy.max_retries
        );
        Err(UsbError::Timeout)
    }
}
