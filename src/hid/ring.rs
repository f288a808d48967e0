//! Keyboard report ring
//!
//! A `heapless` SPSC queue with [`REPORT_RING_SLOTS`] slots. One slot always
//! stays empty to tell full from empty, so at most 15 reports are buffered.
//! The interrupt handler owns the producer half; the application owns the
//! consumer half through [`KeyboardReports`]. When the ring is full the new
//! report is dropped and the buffered ones are kept.

use heapless::spsc::{Consumer, Producer, Queue};

use crate::config::REPORT_RING_SLOTS;
use crate::error::{Result, UsbError};
use crate::hid::keyboard::{KeyboardReport, RawReport};
use crate::host::HostShared;

/// Backing storage for the report ring
pub type ReportQueue = Queue<RawReport, REPORT_RING_SLOTS>;

/// Interrupt-side half of the ring
pub type ReportProducer<'q> = Producer<'q, RawReport, REPORT_RING_SLOTS>;

/// Application-side half of the ring
pub type ReportConsumer<'q> = Consumer<'q, RawReport, REPORT_RING_SLOTS>;

/// Push a report, dropping it if the ring is full. Returns whether it was
/// stored.
#[inline]
pub fn push_report(producer: &mut ReportProducer<'_>, report: RawReport) -> bool {
    producer.enqueue(report).is_ok()
}

/// Application handle for reading keyboard reports
pub struct KeyboardReports<'q> {
    consumer: ReportConsumer<'q>,
    shared: &'q HostShared,
}

impl<'q> KeyboardReports<'q> {
    pub(crate) fn new(consumer: ReportConsumer<'q>, shared: &'q HostShared) -> Self {
        Self { consumer, shared }
    }

    /// Copy the oldest buffered report into `buf`
    ///
    /// Returns the number of bytes copied (at most 8), `Ok(0)` when no
    /// report is waiting, or `Err(NoDevice)` when the host is not
    /// initialized, nothing is connected, or no keyboard is registered.
    pub fn poll_report(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.shared.keyboard_ready() {
            return Err(UsbError::NoDevice);
        }
        match self.consumer.dequeue() {
            Some(report) => {
                let n = buf.len().min(report.len());
                buf[..n].copy_from_slice(&report[..n]);
                Ok(n)
            }
            None => Ok(0),
        }
    }

    /// Next buffered report, decoded
    pub fn next_report(&mut self) -> Result<Option<KeyboardReport>> {
        let mut raw = RawReport::default();
        match self.poll_report(&mut raw)? {
            0 => Ok(None),
            _ => KeyboardReport::parse(&raw).map(Some),
        }
    }

    /// Reports waiting in the ring
    pub fn pending(&self) -> usize {
        self.consumer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(tag: u8) -> RawReport {
        [0, 0, tag, 0, 0, 0, 0, 0]
    }

    #[test]
    fn test_fifo_order_and_capacity() {
        let mut queue = ReportQueue::new();
        let (mut producer, mut consumer) = queue.split();

        for tag in 0..REPORT_RING_SLOTS as u8 - 1 {
            assert!(push_report(&mut producer, report(tag)));
        }
        // 16th push is dropped, the buffered 15 survive
        assert!(!push_report(&mut producer, report(0xFF)));

        for tag in 0..REPORT_RING_SLOTS as u8 - 1 {
            assert_eq!(consumer.dequeue(), Some(report(tag)));
        }
        assert_eq!(consumer.dequeue(), None);
    }

    #[test]
    fn test_poll_report_requires_keyboard() {
        let shared = HostShared::new();
        let mut queue = ReportQueue::new();
        let (mut producer, consumer) = queue.split();
        let mut reports = KeyboardReports::new(consumer, &shared);
        let mut buf = [0u8; 8];

        assert_eq!(reports.poll_report(&mut buf), Err(UsbError::NoDevice));

        shared.set_initialized(true);
        shared.set_connected(true);
        shared.set_keyboard_address(3);
        assert_eq!(reports.poll_report(&mut buf), Ok(0));

        push_report(&mut producer, [0x02, 0, 0x04, 0, 0, 0, 0, 0]);
        let mut short = [0u8; 4];
        assert_eq!(reports.poll_report(&mut short), Ok(4));
        assert_eq!(short, [0x02, 0, 0x04, 0]);

        push_report(&mut producer, [0x02, 0, 0x04, 0, 0, 0, 0, 0]);
        let decoded = reports.next_report().unwrap().unwrap();
        assert!(decoded.modifiers.shift());
        assert_eq!(reports.pending(), 0);
    }
}
