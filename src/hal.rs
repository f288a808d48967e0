//! Platform services the host stack consumes
//!
//! Cache maintenance, DMA address translation and fixed delays. Everything
//! above this module is platform-neutral; a board provides one [`Platform`]
//! implementation and tests provide a recording mock.

#[cfg(target_arch = "aarch64")]
pub mod pizero2w;

/// Per-platform indirection used by every layer of the stack
pub trait Platform {
    /// Discard cached lines over `[addr, addr + len)` so the next CPU read
    /// observes memory written by DMA
    fn invalidate_range(&self, addr: usize, len: usize);

    /// Write back cached lines over `[addr, addr + len)` so DMA reads what
    /// the CPU wrote
    fn clean_range(&self, addr: usize, len: usize);

    /// Address the DMA engine must be programmed with for `cpu_addr`
    fn bus_address(&self, cpu_addr: usize) -> u32;

    /// Sleep at least `ms` milliseconds
    fn sleep_ms(&self, ms: u32);

    /// Sleep at least `us` microseconds
    fn sleep_us(&self, us: u32);
}

impl<P: Platform + ?Sized> Platform for &P {
    fn invalidate_range(&self, addr: usize, len: usize) {
        (**self).invalidate_range(addr, len)
    }

    fn clean_range(&self, addr: usize, len: usize) {
        (**self).clean_range(addr, len)
    }

    fn bus_address(&self, cpu_addr: usize) -> u32 {
        (**self).bus_address(cpu_addr)
    }

    fn sleep_ms(&self, ms: u32) {
        (**self).sleep_ms(ms)
    }

    fn sleep_us(&self, us: u32) {
        (**self).sleep_us(us)
    }
}
