//! Root port reset recovery
//!
//! Some hubs and keyboards make the root port drop its enable bit while the
//! device stays connected. The interrupt handler notices that pattern,
//! asserts port reset and hands over to the timer tick, which holds reset
//! for a few ticks, releases it and waits a bounded number of ticks for the
//! port to come back.
//!
//! ```text
//! Idle ──ISR──▶ ResetAsserted(start unset) ──tick──▶ ResetAsserted(T0)
//!   ──tick ≥ T0+hold──▶ WaitingForEnable(T1) ──ENA──▶ Idle
//!                                            ──tick ≥ T1+timeout──▶ Idle
//! ```
//!
//! The interrupt handler only ever leaves `Idle`, or drops straight back to
//! it when the device is unplugged; every other transition belongs to the
//! tick.

use crate::config::HostConfig;
use crate::dwc2::{HPrt, RegisterIo, RootPort};

/// Recovery phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecoveryPhase {
    /// No recovery in progress
    Idle,
    /// Reset is asserted; `start` is recorded by the first tick that sees it
    ResetAsserted {
        /// Tick at which the hold started
        start: Option<u32>,
    },
    /// Reset released, waiting for the port to enable
    WaitingForEnable {
        /// Tick at which reset was released
        since: u32,
    },
}

/// What one tick did to the recovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecoveryStep {
    /// Not recovering; the tick continues with normal work
    Inactive,
    /// Still holding reset
    Holding,
    /// Reset released this tick
    Released,
    /// Still waiting for enable
    Waiting,
    /// Port enabled again
    Reenabled,
    /// Port did not enable in time
    TimedOut,
}

/// Port reset recovery state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRecovery {
    phase: RecoveryPhase,
}

impl PortRecovery {
    /// Idle
    pub const fn new() -> Self {
        Self {
            phase: RecoveryPhase::Idle,
        }
    }

    /// Current phase
    pub fn phase(&self) -> RecoveryPhase {
        self.phase
    }

    /// A recovery is in progress
    pub fn is_active(&self) -> bool {
        self.phase != RecoveryPhase::Idle
    }

    /// Assert port reset and start a recovery; does nothing unless idle
    pub fn begin<R: RegisterIo>(&mut self, port: &RootPort<'_, R>) -> bool {
        if self.is_active() {
            return false;
        }
        port.set_reset(true);
        self.phase = RecoveryPhase::ResetAsserted { start: None };
        true
    }

    /// Abandon any recovery, releasing reset if it is still held
    pub fn cancel<R: RegisterIo>(&mut self, port: &RootPort<'_, R>) {
        if let RecoveryPhase::ResetAsserted { .. } = self.phase {
            port.set_reset(false);
        }
        self.phase = RecoveryPhase::Idle;
    }

    /// Advance by one tick
    pub fn advance<R: RegisterIo>(
        &mut self,
        port: &RootPort<'_, R>,
        now: u32,
        config: &HostConfig,
    ) -> RecoveryStep {
        match self.phase {
            RecoveryPhase::Idle => RecoveryStep::Inactive,
            RecoveryPhase::ResetAsserted { start: None } => {
                self.phase = RecoveryPhase::ResetAsserted { start: Some(now) };
                RecoveryStep::Holding
            }
            RecoveryPhase::ResetAsserted { start: Some(start) } => {
                if now.wrapping_sub(start) < config.recovery_reset_ticks {
                    return RecoveryStep::Holding;
                }
                port.set_reset(false);
                self.phase = RecoveryPhase::WaitingForEnable { since: now };
                RecoveryStep::Released
            }
            RecoveryPhase::WaitingForEnable { since } => {
                if port.read().contains(HPrt::ENA) {
                    self.phase = RecoveryPhase::Idle;
                    RecoveryStep::Reenabled
                } else if now.wrapping_sub(since) >= config.recovery_enable_ticks {
                    self.phase = RecoveryPhase::Idle;
                    RecoveryStep::TimedOut
                } else {
                    RecoveryStep::Waiting
                }
            }
        }
    }
}

impl Default for PortRecovery {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dwc2::offsets;
    use core::cell::Cell;

    struct Hprt(Cell<u32>);

    impl RegisterIo for Hprt {
        fn read(&self, offset: usize) -> u32 {
            assert_eq!(offset, offsets::HPRT);
            self.0.get()
        }
        fn write(&self, offset: usize, value: u32) {
            assert_eq!(offset, offsets::HPRT);
            assert_eq!(value & HPrt::ENA.bits(), 0, "ENA written to HPRT");
            self.0.set(value);
        }
    }

    #[test]
    fn test_full_recovery_cycle() {
        let regs = Hprt(Cell::new((HPrt::CONNSTS | HPrt::PWR).bits()));
        let port = RootPort::new(&regs);
        let config = HostConfig::default();
        let mut recovery = PortRecovery::new();

        assert!(recovery.begin(&port));
        assert!(!recovery.begin(&port));
        assert!(port.read().contains(HPrt::RST));

        assert_eq!(recovery.advance(&port, 10, &config), RecoveryStep::Holding);
        assert_eq!(recovery.advance(&port, 14, &config), RecoveryStep::Holding);
        assert_eq!(recovery.advance(&port, 15, &config), RecoveryStep::Released);
        assert!(!port.read().contains(HPrt::RST));
        assert_eq!(
            recovery.phase(),
            RecoveryPhase::WaitingForEnable { since: 15 }
        );

        assert_eq!(recovery.advance(&port, 16, &config), RecoveryStep::Waiting);
        regs.0.set(regs.0.get() | HPrt::ENA.bits());
        assert_eq!(recovery.advance(&port, 17, &config), RecoveryStep::Reenabled);
        assert!(!recovery.is_active());
        assert_eq!(recovery.advance(&port, 18, &config), RecoveryStep::Inactive);
    }

    #[test]
    fn test_enable_timeout() {
        let regs = Hprt(Cell::new(HPrt::CONNSTS.bits()));
        let port = RootPort::new(&regs);
        let config = HostConfig::default();
        let mut recovery = PortRecovery::new();

        recovery.begin(&port);
        recovery.advance(&port, 0, &config);
        assert_eq!(recovery.advance(&port, 5, &config), RecoveryStep::Released);
        assert_eq!(recovery.advance(&port, 14, &config), RecoveryStep::Waiting);
        assert_eq!(recovery.advance(&port, 15, &config), RecoveryStep::TimedOut);
        assert_eq!(recovery.phase(), RecoveryPhase::Idle);
    }
}
