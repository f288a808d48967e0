//! Host stack configuration
//!
//! Fixed settle times come from USB 2.0 chapter 7/9 and hub class timing;
//! tick-based thresholds assume a 10 ms `timer_tick` period.

/// Default timing values
pub mod timing {
    /// Port power-on settle before the first status read
    pub const PORT_POWER_SETTLE_MS: u32 = 100;
    /// Bus reset hold time
    pub const PORT_RESET_HOLD_MS: u32 = 50;
    /// Settle after reset before talking to address 0
    pub const POST_RESET_SETTLE_MS: u32 = 10;
    /// Settle before and after SET_ADDRESS
    pub const SET_ADDRESS_SETTLE_MS: u32 = 10;
    /// Core settle after forcing host mode
    pub const FORCE_HOST_SETTLE_MS: u32 = 50;

    /// Retry budget for SETUP and STATUS stages
    pub const CONTROL_STAGE_RETRIES: u32 = 5;
    /// Retry budget for DATA stages
    pub const CONTROL_DATA_RETRIES: u32 = 10;
    /// Status polls per retry
    pub const POLLS_PER_RETRY: u32 = 100_000;
    /// Pause before re-enabling a NAKed transaction
    pub const RETRY_BACKOFF_US: u32 = 1_000;
    /// Polls for CHHLTD after a forced channel disable
    pub const HALT_POLL_LIMIT: u32 = 1_000;
    /// Polls for core reset and FIFO flush bits
    pub const CORE_RESET_POLLS: u32 = 100_000;

    /// Ticks a keyboard transfer may stay pending before the watchdog fires
    pub const WATCHDOG_TICKS: u32 = 5;
    /// Ticks port reset stays asserted during recovery
    pub const RECOVERY_RESET_TICKS: u32 = 5;
    /// Ticks to wait for the port to re-enable after recovery reset
    pub const RECOVERY_ENABLE_TICKS: u32 = 10;
}

/// Maximum number of device records
pub const MAX_DEVICES: usize = 16;

/// Slots in the keyboard report ring (one stays empty)
pub const REPORT_RING_SLOTS: usize = 16;

/// Cap on the configuration descriptor read
pub const CONFIG_DESCRIPTOR_CAP: usize = 256;

/// Tunables for one host instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HostConfig {
    /// Port power-on settle (ms)
    pub port_power_settle_ms: u32,
    /// Bus reset hold (ms)
    pub port_reset_hold_ms: u32,
    /// Settle after reset (ms)
    pub post_reset_settle_ms: u32,
    /// Settle around SET_ADDRESS (ms)
    pub set_address_settle_ms: u32,
    /// SETUP/STATUS retry budget
    pub control_stage_retries: u32,
    /// DATA retry budget
    pub control_data_retries: u32,
    /// Polls per retry
    pub polls_per_retry: u32,
    /// Backoff between retries (µs)
    pub retry_backoff_us: u32,
    /// Polls for the halt bit after a forced disable
    pub halt_poll_limit: u32,
    /// Watchdog threshold (ticks)
    pub watchdog_ticks: u32,
    /// Recovery reset hold (ticks)
    pub recovery_reset_ticks: u32,
    /// Recovery enable timeout (ticks)
    pub recovery_enable_ticks: u32,
    /// Drop every device record when the root port reports a disconnect.
    /// Off by default: records live until the next full enumeration.
    pub evict_on_disconnect: bool,
}

impl HostConfig {
    /// Defaults from [`timing`]
    pub const fn new() -> Self {
        Self {
            port_power_settle_ms: timing::PORT_POWER_SETTLE_MS,
            port_reset_hold_ms: timing::PORT_RESET_HOLD_MS,
            post_reset_settle_ms: timing::POST_RESET_SETTLE_MS,
            set_address_settle_ms: timing::SET_ADDRESS_SETTLE_MS,
            control_stage_retries: timing::CONTROL_STAGE_RETRIES,
            control_data_retries: timing::CONTROL_DATA_RETRIES,
            polls_per_retry: timing::POLLS_PER_RETRY,
            retry_backoff_us: timing::RETRY_BACKOFF_US,
            halt_poll_limit: timing::HALT_POLL_LIMIT,
            watchdog_ticks: timing::WATCHDOG_TICKS,
            recovery_reset_ticks: timing::RECOVERY_RESET_TICKS,
            recovery_enable_ticks: timing::RECOVERY_ENABLE_TICKS,
            evict_on_disconnect: false,
        }
    }

    /// Same configuration with the eviction policy set
    pub const fn with_evict_on_disconnect(mut self, evict: bool) -> Self {
        self.evict_on_disconnect = evict;
        self
    }

    /// Same configuration with a smaller per-retry poll ceiling
    pub const fn with_polls_per_retry(mut self, polls: u32) -> Self {
        self.polls_per_retry = polls;
        self
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self::new()
    }
}
