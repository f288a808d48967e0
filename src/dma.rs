//! DMA bounce buffers with cache maintenance
//!
//! The DWC2 core masters the bus itself, so every buffer it touches must be
//! cache-line aligned and must be cleaned before OUT transfers and
//! invalidated around IN transfers. [`DmaBuffer`] ties those steps to the
//! direction of the transfer so callers cannot forget one.

use crate::error::{Result, UsbError};
use crate::hal::Platform;

/// DMA buffer alignment (Cortex-A53 cache line)
pub const DMA_ALIGNMENT: usize = 64;

/// Largest single transfer the control path accepts
pub const DMA_MAX_TRANSFER: usize = 512;

/// Cache-line aligned DMA buffer of `N` bytes
#[repr(C, align(64))]
pub struct DmaBuffer<const N: usize> {
    data: [u8; N],
}

impl<const N: usize> DmaBuffer<N> {
    /// Zeroed buffer
    pub const fn new() -> Self {
        Self { data: [0; N] }
    }

    /// Capacity in bytes
    pub const fn capacity(&self) -> usize {
        N
    }

    /// CPU address of the first byte
    pub fn addr(&self) -> usize {
        self.data.as_ptr() as usize
    }

    /// Address to program into HCDMA
    pub fn bus_address<P: Platform>(&self, platform: &P) -> u32 {
        platform.bus_address(self.addr())
    }

    /// Stage outgoing bytes and clean them to memory
    pub fn prepare_out<P: Platform>(&mut self, platform: &P, bytes: &[u8]) -> Result<()> {
        if bytes.len() > N {
            return Err(UsbError::BufferOverflow);
        }
        self.data[..bytes.len()].copy_from_slice(bytes);
        platform.clean_range(self.addr(), bytes.len().max(1));
        Ok(())
    }

    /// Zero the first `len` bytes and invalidate them ahead of an IN transfer
    pub fn prepare_in<P: Platform>(&mut self, platform: &P, len: usize) -> Result<()> {
        if len > N {
            return Err(UsbError::BufferOverflow);
        }
        self.data[..len].fill(0);
        platform.invalidate_range(self.addr(), len.max(1));
        Ok(())
    }

    /// Invalidate after an IN transfer and copy `out.len()` bytes out
    pub fn complete_in<P: Platform>(&self, platform: &P, out: &mut [u8]) {
        let len = out.len().min(N);
        platform.invalidate_range(self.addr(), len.max(1));
        core::sync::atomic::compiler_fence(core::sync::atomic::Ordering::SeqCst);
        for (i, byte) in out[..len].iter_mut().enumerate() {
            // SAFETY: `i < N`; volatile so the read is not folded into the
            // values written by `prepare_in`, the device wrote them since.
            *byte = unsafe { core::ptr::read_volatile(self.data.as_ptr().add(i)) };
        }
    }
}

impl<const N: usize> Default for DmaBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Address is DMA aligned
pub const fn is_dma_aligned(addr: usize) -> bool {
    addr % DMA_ALIGNMENT == 0
}
