//! Diagnostic counters
//!
//! Counters are bumped from interrupt and tick context with relaxed
//! `fetch_add` and read from anywhere. They are monotonic and never feed
//! back into control flow; a lost update under a race only undercounts.

use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

/// Host stack debug counters
pub struct DebugStats {
    irq_count: AtomicU32,
    port_irq_count: AtomicU32,
    kbd_irq_count: AtomicU32,
    kbd_data_count: AtomicU32,
    kbd_nak_count: AtomicU32,
    kbd_error_count: AtomicU32,
    kbd_restart_count: AtomicU32,
    kbd_dropped_count: AtomicU32,
    watchdog_kicks: AtomicU32,
}

macro_rules! counter {
    ($(#[$doc:meta])* $name:ident => $field:ident) => {
        $(#[$doc])*
        #[inline(always)]
        pub fn $name(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
        }
    };
}

impl DebugStats {
    /// All counters at zero
    pub const fn new() -> Self {
        Self {
            irq_count: AtomicU32::new(0),
            port_irq_count: AtomicU32::new(0),
            kbd_irq_count: AtomicU32::new(0),
            kbd_data_count: AtomicU32::new(0),
            kbd_nak_count: AtomicU32::new(0),
            kbd_error_count: AtomicU32::new(0),
            kbd_restart_count: AtomicU32::new(0),
            kbd_dropped_count: AtomicU32::new(0),
            watchdog_kicks: AtomicU32::new(0),
        }
    }

    counter!(
        /// Controller interrupt entered
        record_irq => irq_count
    );
    counter!(
        /// Root port interrupt handled
        record_port_irq => port_irq_count
    );
    counter!(
        /// Keyboard channel interrupt handled
        record_keyboard_irq => kbd_irq_count
    );
    counter!(
        /// Keyboard transfer completed with data
        record_keyboard_data => kbd_data_count
    );
    counter!(
        /// Keyboard NAKed (no new report)
        record_keyboard_nak => kbd_nak_count
    );
    counter!(
        /// Keyboard transfer ended in STALL, XACTERR or BBLERR
        record_keyboard_error => kbd_error_count
    );
    counter!(
        /// Keyboard transfer (re)start attempted
        record_keyboard_restart => kbd_restart_count
    );
    counter!(
        /// Report dropped because the ring was full
        record_report_dropped => kbd_dropped_count
    );
    counter!(
        /// Watchdog reaped a wedged keyboard transfer
        record_watchdog_kick => watchdog_kicks
    );

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            irq_count: self.irq_count.load(Ordering::Relaxed),
            port_irq_count: self.port_irq_count.load(Ordering::Relaxed),
            kbd_irq_count: self.kbd_irq_count.load(Ordering::Relaxed),
            kbd_data_count: self.kbd_data_count.load(Ordering::Relaxed),
            kbd_nak_count: self.kbd_nak_count.load(Ordering::Relaxed),
            kbd_error_count: self.kbd_error_count.load(Ordering::Relaxed),
            kbd_restart_count: self.kbd_restart_count.load(Ordering::Relaxed),
            kbd_dropped_count: self.kbd_dropped_count.load(Ordering::Relaxed),
            watchdog_kicks: self.watchdog_kicks.load(Ordering::Relaxed),
        }
    }
}

impl Default for DebugStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy of [`DebugStats`] taken by [`DebugStats::snapshot`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatsSnapshot {
    /// Controller interrupts
    pub irq_count: u32,
    /// Root port interrupts
    pub port_irq_count: u32,
    /// Keyboard channel interrupts
    pub kbd_irq_count: u32,
    /// Keyboard completions with data
    pub kbd_data_count: u32,
    /// Keyboard NAKs
    pub kbd_nak_count: u32,
    /// Keyboard transfer errors
    pub kbd_error_count: u32,
    /// Keyboard transfer starts
    pub kbd_restart_count: u32,
    /// Reports dropped on a full ring
    pub kbd_dropped_count: u32,
    /// Watchdog firings
    pub watchdog_kicks: u32,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "irq={} port={} kbd_irq={} data={} nak={} err={} restart={} dropped={} watchdog={}",
            self.irq_count,
            self.port_irq_count,
            self.kbd_irq_count,
            self.kbd_data_count,
            self.kbd_nak_count,
            self.kbd_error_count,
            self.kbd_restart_count,
            self.kbd_dropped_count,
            self.watchdog_kicks
        )
    }
}
