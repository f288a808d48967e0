//! Report ring behavior seen from both ends

mod common;

use common::{MockPlatform, SimRegisters};
use dwc2_usbh::hid::ring::{push_report, ReportQueue};
use dwc2_usbh::hid::RawReport;
use dwc2_usbh::{HostConfig, HostResources, UsbError, UsbHost};
use proptest::prelude::*;

fn tagged(tag: u32) -> RawReport {
    let mut report = [0u8; 8];
    report[..4].copy_from_slice(&tag.to_le_bytes());
    report
}

fn tag_of(report: &RawReport) -> u32 {
    u32::from_le_bytes([report[0], report[1], report[2], report[3]])
}

#[test]
fn test_overflow_keeps_oldest_fifteen() {
    let mut queue = ReportQueue::new();
    let (mut producer, mut consumer) = queue.split();

    let accepted = (0..20).filter(|&tag| push_report(&mut producer, tagged(tag))).count();
    assert_eq!(accepted, 15);

    let drained: Vec<u32> = core::iter::from_fn(|| consumer.dequeue())
        .map(|report| tag_of(&report))
        .collect();
    assert_eq!(drained, (0..15).collect::<Vec<_>>());
}

#[test]
fn test_slot_freed_by_pop_is_reused() {
    let mut queue = ReportQueue::new();
    let (mut producer, mut consumer) = queue.split();

    for tag in 0..15 {
        assert!(push_report(&mut producer, tagged(tag)));
    }
    assert!(!push_report(&mut producer, tagged(99)));
    assert_eq!(consumer.dequeue().map(|r| tag_of(&r)), Some(0));
    assert!(push_report(&mut producer, tagged(15)));
    assert_eq!(consumer.len(), 15);
}

#[test]
fn test_poll_report_without_keyboard_is_no_device() {
    let platform = MockPlatform::new();
    let regs = SimRegisters::new(&platform);
    let mut resources = HostResources::new();
    let (_host, mut reports) = UsbHost::new(&mut resources, &regs, &platform, HostConfig::default());

    let mut buf = [0u8; 8];
    assert_eq!(reports.poll_report(&mut buf), Err(UsbError::NoDevice));
    assert_eq!(reports.next_report(), Err(UsbError::NoDevice));
}

proptest! {
    /// Pops return a subsequence of pushes in order, and a push only fails
    /// when fifteen reports are already buffered.
    #[test]
    fn prop_fifo_never_overwrites(ops in proptest::collection::vec(any::<bool>(), 0..200)) {
        let mut queue = ReportQueue::new();
        let (mut producer, mut consumer) = queue.split();
        let mut model = std::collections::VecDeque::new();
        let mut next_tag = 0u32;

        for push in ops {
            if push {
                let buffered = model.len();
                let accepted = push_report(&mut producer, tagged(next_tag));
                prop_assert_eq!(accepted, buffered < 15);
                if accepted {
                    model.push_back(next_tag);
                }
                next_tag += 1;
            } else {
                let popped = consumer.dequeue().map(|report| tag_of(&report));
                prop_assert_eq!(popped, model.pop_front());
            }
        }
    }
}
