//! Register access for the DWC2 core
//!
//! [`RegisterIo`] is the only path to the hardware. [`Mmio`] implements it
//! over a physical window with volatile accesses fenced by data barriers;
//! tests implement it over a simulated register file.

use core::ptr::{read_volatile, write_volatile};

use crate::error::{Result, UsbError};

/// Word-sized access to a block of 32-bit registers by byte offset
pub trait RegisterIo {
    /// Read the register at `offset`
    fn read(&self, offset: usize) -> u32;

    /// Write the register at `offset`
    fn write(&self, offset: usize, value: u32);

    /// Read-modify-write
    #[inline(always)]
    fn modify<F>(&self, offset: usize, f: F)
    where
        F: FnOnce(u32) -> u32,
    {
        let current = self.read(offset);
        self.write(offset, f(current));
    }

    /// Set bits with a read-modify-write
    #[inline(always)]
    fn set_bits(&self, offset: usize, mask: u32) {
        self.modify(offset, |v| v | mask);
    }

    /// Clear bits with a read-modify-write
    #[inline(always)]
    fn clear_bits(&self, offset: usize, mask: u32) {
        self.modify(offset, |v| v & !mask);
    }
}

impl<T: RegisterIo + ?Sized> RegisterIo for &T {
    #[inline(always)]
    fn read(&self, offset: usize) -> u32 {
        (**self).read(offset)
    }

    #[inline(always)]
    fn write(&self, offset: usize, value: u32) {
        (**self).write(offset, value)
    }
}

/// Memory-mapped DWC2 register window
pub struct Mmio {
    base: usize,
}

impl Mmio {
    /// Wrap the register window starting at `base`
    ///
    /// # Safety
    ///
    /// `base` must be the mapped, device-memory address of a DWC2 core and
    /// the caller must not create a second owner for the same window.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    /// Base address of the window
    pub const fn base(&self) -> usize {
        self.base
    }
}

impl RegisterIo for Mmio {
    #[inline(always)]
    fn read(&self, offset: usize) -> u32 {
        let addr = (self.base + offset) as *const u32;
        dmb();
        // SAFETY: `new` requires `base` to be a valid register window, and
        // every offset used by this crate lies inside the DWC2 block.
        let value = unsafe { read_volatile(addr) };
        dmb();
        value
    }

    #[inline(always)]
    fn write(&self, offset: usize, value: u32) {
        let addr = (self.base + offset) as *mut u32;
        dmb();
        // SAFETY: see `read`.
        unsafe { write_volatile(addr, value) };
        dsb();
    }
}

/// Data memory barrier
#[inline(always)]
pub fn dmb() {
    #[cfg(target_arch = "aarch64")]
    aarch64_cpu::asm::barrier::dmb(aarch64_cpu::asm::barrier::SY);
    #[cfg(not(target_arch = "aarch64"))]
    core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
}

/// Data synchronization barrier, completes outstanding writes
#[inline(always)]
pub fn dsb() {
    #[cfg(target_arch = "aarch64")]
    aarch64_cpu::asm::barrier::dsb(aarch64_cpu::asm::barrier::SY);
    #[cfg(not(target_arch = "aarch64"))]
    core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
}

/// Iteration-bounded busy wait
///
/// Counts polls rather than time so it works before any timer is running and
/// behaves identically under simulation.
pub struct PollBudget {
    remaining: u32,
}

impl PollBudget {
    /// Budget of `polls` condition checks
    pub const fn new(polls: u32) -> Self {
        Self { remaining: polls }
    }

    /// Polls left
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Spin until `condition` holds or the budget runs out
    pub fn wait_for<F>(&mut self, mut condition: F) -> Result<()>
    where
        F: FnMut() -> bool,
    {
        loop {
            if condition() {
                return Ok(());
            }
            if self.remaining == 0 {
                return Err(UsbError::Timeout);
            }
            self.remaining -= 1;
            core::hint::spin_loop();
        }
    }
}
