//! Raspberry Pi Zero 2 W (BCM2837, Cortex-A53)

use aarch64_cpu::asm::barrier;
use aarch64_cpu::registers::{Readable, CNTFRQ_EL0, CNTPCT_EL0};

use super::Platform;

/// Cache line size of the Cortex-A53 L1 data cache
const CACHE_LINE: usize = 64;

/// VideoCore bus alias for uncached SDRAM, which the DWC2 DMA master uses
const BUS_ALIAS_UNCACHED: u32 = 0xC000_0000;

/// BCM2837 platform services
pub struct Bcm2837 {
    _private: (),
}

impl Bcm2837 {
    /// Platform handle
    ///
    /// # Safety
    ///
    /// The caller must be running at EL1 on a BCM2837 with the generic timer
    /// enabled and identity-mapped SDRAM.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }

    fn for_each_line(addr: usize, len: usize, mut op: impl FnMut(usize)) {
        let start = addr & !(CACHE_LINE - 1);
        let end = (addr + len + CACHE_LINE - 1) & !(CACHE_LINE - 1);
        for line in (start..end).step_by(CACHE_LINE) {
            op(line);
        }
        barrier::dsb(barrier::SY);
    }

    fn ticks_per_us() -> u64 {
        (CNTFRQ_EL0.get() / 1_000_000).max(1)
    }
}

impl Platform for Bcm2837 {
    fn invalidate_range(&self, addr: usize, len: usize) {
        Self::for_each_line(addr, len, |line| {
            // SAFETY: clean+invalidate by VA on a mapped line has no effect
            // beyond cache state.
            unsafe { core::arch::asm!("dc civac, {}", in(reg) line, options(nostack)) };
        });
    }

    fn clean_range(&self, addr: usize, len: usize) {
        Self::for_each_line(addr, len, |line| {
            // SAFETY: clean by VA only writes back dirty data.
            unsafe { core::arch::asm!("dc cvac, {}", in(reg) line, options(nostack)) };
        });
    }

    fn bus_address(&self, cpu_addr: usize) -> u32 {
        (cpu_addr as u32 & 0x3FFF_FFFF) | BUS_ALIAS_UNCACHED
    }

    fn sleep_ms(&self, ms: u32) {
        self.sleep_us(ms.saturating_mul(1000));
    }

    fn sleep_us(&self, us: u32) {
        let start = CNTPCT_EL0.get();
        let ticks = u64::from(us) * Self::ticks_per_us();
        while CNTPCT_EL0.get().wrapping_sub(start) < ticks {
            core::hint::spin_loop();
        }
    }
}
