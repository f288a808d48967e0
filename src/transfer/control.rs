//! Control transfers (SETUP, optional DATA, STATUS) on channel 0

use crate::config::HostConfig;
use crate::dma::{DmaBuffer, DMA_MAX_TRANSFER};
use crate::dwc2::{ChannelConfig, RegisterIo, CONTROL_CHANNEL};
use crate::error::Result;
use crate::hal::Platform;
use crate::hub::DeviceSpeed;
use crate::transfer::executor::{ChannelExecutor, Payload, RetryPolicy};
use crate::transfer::{DataStage, Direction, Pid, SetupPacket};

/// Number of packets needed to move `len` bytes; a zero-length transfer is
/// still one packet
#[inline]
pub const fn packet_count(len: usize, max_packet_size: u16) -> u32 {
    let mps = if max_packet_size == 0 { 1 } else { max_packet_size as usize };
    if len == 0 {
        1
    } else {
        ((len + mps - 1) / mps) as u32
    }
}

/// Endpoint-0 parameters of the device a control transfer targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlTarget {
    /// Device address (0 during the addressing window)
    pub address: u8,
    /// Endpoint 0 max packet size
    pub max_packet_size: u16,
    /// Device speed
    pub speed: DeviceSpeed,
}

impl ControlTarget {
    /// Target for the unaddressed device currently answering at address 0
    pub const fn default_address(speed: DeviceSpeed) -> Self {
        Self {
            address: 0,
            max_packet_size: if matches!(speed, DeviceSpeed::Low) { 8 } else { 64 },
            speed,
        }
    }
}

/// Anything that can run a complete control transfer
pub trait ControlPipe {
    /// Run SETUP, the optional DATA stage and STATUS against `target`.
    /// Returns the bytes moved in the DATA stage.
    fn control_transfer(
        &mut self,
        target: ControlTarget,
        setup: &SetupPacket,
        data: DataStage<'_>,
    ) -> Result<usize>;
}

/// Channel-0 control pipe over the DWC2 core
pub struct ControlChannel<'a, R: RegisterIo, P: Platform> {
    executor: ChannelExecutor<'a, R, P, DMA_MAX_TRANSFER>,
    stage_policy: RetryPolicy,
    data_policy: RetryPolicy,
    halt_polls: u32,
}

impl<'a, R: RegisterIo, P: Platform> ControlChannel<'a, R, P> {
    /// Control pipe using `buffer` as the DMA bounce buffer
    pub fn new(
        regs: &'a R,
        platform: &'a P,
        buffer: &'a mut DmaBuffer<DMA_MAX_TRANSFER>,
        config: &HostConfig,
    ) -> Self {
        Self {
            executor: ChannelExecutor::new(regs, platform, buffer, CONTROL_CHANNEL),
            stage_policy: RetryPolicy {
                max_retries: config.control_stage_retries,
                polls_per_retry: config.polls_per_retry,
                backoff_us: config.retry_backoff_us,
            },
            data_policy: RetryPolicy {
                max_retries: config.control_data_retries,
                polls_per_retry: config.polls_per_retry,
                backoff_us: config.retry_backoff_us,
            },
            halt_polls: config.halt_poll_limit,
        }
    }
}

impl<R: RegisterIo, P: Platform> ControlPipe for ControlChannel<'_, R, P> {
    fn control_transfer(
        &mut self,
        target: ControlTarget,
        setup: &SetupPacket,
        data: DataStage<'_>,
    ) -> Result<usize> {
        if self.executor.channel().halt(self.halt_polls).is_err() {
            log::warn!("control channel did not halt before transfer");
        }

        let config = ChannelConfig::control(
            target.address,
            target.max_packet_size,
            matches!(target.speed, DeviceSpeed::Low),
        );

        let setup_bytes = setup.to_bytes();
        self.executor
            .execute(config, Pid::Setup, Payload::Out(&setup_bytes), &self.stage_policy)?;

        // SETUP resets the toggle, so the first DATA packet is always DATA1.
        let (moved, status_direction) = match data {
            DataStage::In(buf) if !buf.is_empty() => {
                let received =
                    self.executor
                        .execute(config, Pid::Data1, Payload::In(buf), &self.data_policy)?;
                (received, Direction::Out)
            }
            DataStage::Out(buf) if !buf.is_empty() => {
                let sent =
                    self.executor
                        .execute(config, Pid::Data1, Payload::Out(buf), &self.data_policy)?;
                (sent, Direction::In)
            }
            _ => (0, Direction::In),
        };

        let status = match status_direction {
            Direction::In => Payload::In(&mut []),
            Direction::Out => Payload::Out(&[]),
        };
        self.executor
            .execute(config, Pid::Data1, status, &self.stage_policy)?;

        Ok(moved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_count_law() {
        assert_eq!(packet_count(200, 64), 4);
        assert_eq!(packet_count(0, 64), 1);
        assert_eq!(packet_count(64, 64), 1);
        assert_eq!(packet_count(65, 64), 2);
        assert_eq!(packet_count(18, 8), 3);
    }

    #[test]
    fn test_packet_count_zero_mps_does_not_divide_by_zero() {
        assert_eq!(packet_count(3, 0), 3);
    }

    #[test]
    fn test_default_address_packet_size() {
        assert_eq!(ControlTarget::default_address(DeviceSpeed::Low).max_packet_size, 8);
        assert_eq!(ControlTarget::default_address(DeviceSpeed::Full).max_packet_size, 64);
        assert_eq!(ControlTarget::default_address(DeviceSpeed::High).max_packet_size, 64);
    }
}
