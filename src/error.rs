//! USB host error types

use core::fmt;

/// USB operation result type
pub type Result<T> = core::result::Result<T, UsbError>;

/// USB error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsbError {
    /// Endpoint answered with STALL
    Stall,
    /// Retry or poll budget exhausted without a terminal status
    Timeout,
    /// Babble detected (device sent more than requested)
    Babble,
    /// Transaction error (CRC, bit stuffing, missing handshake)
    TransactionError,
    /// AHB error while the channel was mastering DMA
    HostSystemError,
    /// Transfer larger than the DMA bounce buffer
    BufferOverflow,
    /// Invalid parameter
    InvalidParameter,
    /// Invalid state for operation
    InvalidState,
    /// Fixed-capacity table is full
    NoResources,
    /// Descriptor failed length or type validation
    InvalidDescriptor,
    /// Device returned fewer bytes than the operation needs
    ShortTransfer,
    /// No device (or no keyboard) is attached
    NoDevice,
    /// Port did not connect or enable
    PortError,
    /// Host channel still enabled when a new transfer was requested
    ChannelBusy,
    /// Core soft reset did not complete
    CoreResetTimeout,
}

impl UsbError {
    /// Hardware protocol errors are never retried
    pub const fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::Stall | Self::Babble | Self::TransactionError | Self::HostSystemError
        )
    }
}

impl fmt::Display for UsbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stall => write!(f, "USB stall"),
            Self::Timeout => write!(f, "Timeout"),
            Self::Babble => write!(f, "Babble detected"),
            Self::TransactionError => write!(f, "Transaction error"),
            Self::HostSystemError => write!(f, "AHB error"),
            Self::BufferOverflow => write!(f, "Buffer overflow"),
            Self::InvalidParameter => write!(f, "Invalid parameter"),
            Self::InvalidState => write!(f, "Invalid state"),
            Self::NoResources => write!(f, "No resources available"),
            Self::InvalidDescriptor => write!(f, "Invalid descriptor"),
            Self::ShortTransfer => write!(f, "Short transfer"),
            Self::NoDevice => write!(f, "No device"),
            Self::PortError => write!(f, "Port error"),
            Self::ChannelBusy => write!(f, "Channel busy"),
            Self::CoreResetTimeout => write!(f, "Core reset timeout"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_classification() {
        assert!(UsbError::Stall.is_protocol_error());
        assert!(UsbError::HostSystemError.is_protocol_error());
        assert!(!UsbError::Timeout.is_protocol_error());
        assert!(!UsbError::NoDevice.is_protocol_error());
    }
}
