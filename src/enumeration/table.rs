//! Device record arena
//!
//! Records live in a fixed-capacity vector and are referred to by index
//! handles. Addresses are handed out sequentially from 1 and only rewind when
//! the whole table is reset for a fresh enumeration.

use heapless::Vec;

use crate::config::MAX_DEVICES;
use crate::error::{Result, UsbError};
use crate::hub::DeviceSpeed;
use crate::transfer::ControlTarget;

/// Highest assignable USB address
pub const MAX_ADDRESS: u8 = 127;

/// Stable index of a record in a [`DeviceTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceHandle(u8);

impl DeviceHandle {
    /// Index into the table
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// One enumerated device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceRecord {
    /// Assigned address, never 0
    pub address: u8,
    /// Endpoint 0 max packet size as reported (0 means unknown)
    pub max_packet_size: u8,
    /// Negotiated speed
    pub speed: DeviceSpeed,
    /// Device is a hub
    pub is_hub: bool,
    /// Downstream port count (0 unless a hub)
    pub hub_ports: u8,
    /// Parent hub address (0 = root port)
    pub parent_address: u8,
    /// Port on the parent (0 = root port)
    pub parent_port: u8,
}

/// Fixed-capacity device table
pub struct DeviceTable {
    records: Vec<DeviceRecord, MAX_DEVICES>,
    last_address: u8,
}

impl DeviceTable {
    /// Empty table
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
            last_address: 0,
        }
    }

    /// Drop every record and rewind the address counter
    pub fn reset(&mut self) {
        self.records.clear();
        self.last_address = 0;
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// No records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// No room for another record
    pub fn is_full(&self) -> bool {
        self.records.is_full()
    }

    /// Last address handed out (0 if none)
    pub fn last_address(&self) -> u8 {
        self.last_address
    }

    /// Take the next sequential address
    pub fn allocate_address(&mut self) -> Result<u8> {
        if self.last_address >= MAX_ADDRESS {
            return Err(UsbError::NoResources);
        }
        self.last_address += 1;
        Ok(self.last_address)
    }

    /// Store a record for a freshly addressed device
    pub fn insert(&mut self, record: DeviceRecord) -> Result<DeviceHandle> {
        if record.address == 0 || self.find(record.address).is_some() {
            return Err(UsbError::InvalidParameter);
        }
        if record.parent_address != 0 && self.find(record.parent_address).is_none() {
            return Err(UsbError::InvalidParameter);
        }
        let handle = DeviceHandle(self.records.len() as u8);
        self.records
            .push(record)
            .map_err(|_| UsbError::NoResources)?;
        Ok(handle)
    }

    /// Record behind a handle
    pub fn get(&self, handle: DeviceHandle) -> Option<&DeviceRecord> {
        self.records.get(handle.index())
    }

    /// Mutable record behind a handle
    pub fn get_mut(&mut self, handle: DeviceHandle) -> Option<&mut DeviceRecord> {
        self.records.get_mut(handle.index())
    }

    /// Record with a given address
    pub fn find(&self, address: u8) -> Option<&DeviceRecord> {
        self.records.iter().find(|r| r.address == address)
    }

    /// All records in enumeration order
    pub fn iter(&self) -> impl Iterator<Item = &DeviceRecord> {
        self.records.iter()
    }

    /// Endpoint-0 parameters for a control transfer to `address`
    ///
    /// Address 0 uses the speed of the port being enumerated and the default
    /// packet size for it. Known devices use their stored packet size (64 if
    /// it was reported as 0); unknown addresses fall back to `speed` and 64.
    pub fn control_target(&self, address: u8, speed: DeviceSpeed) -> ControlTarget {
        if address == 0 {
            return ControlTarget::default_address(speed);
        }
        match self.find(address) {
            Some(record) => ControlTarget {
                address,
                max_packet_size: match record.max_packet_size {
                    0 => 64,
                    mps => mps as u16,
                },
                speed: record.speed,
            },
            None => ControlTarget {
                address,
                max_packet_size: 64,
                speed,
            },
        }
    }
}

impl Default for DeviceTable {
    fn default() -> Self {
        Self::new()
    }
}
