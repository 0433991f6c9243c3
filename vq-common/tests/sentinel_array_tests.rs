//! Layout invariant tests for SentinelArray
//!
//! Drives long deterministic operation sequences and checks after every step
//! that occupied slots stay a contiguous prefix and that the count matches the
//! first empty slot.

use vq_common::{HasSentinel, PlayerId, QueueSlot, SentinelArray, VideoUrl};

/// Small deterministic generator so sequences are reproducible
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound
    }
}

fn slot(n: usize) -> QueueSlot {
    QueueSlot::new(
        VideoUrl::new(format!("https://videos.example/{}", n)),
        format!("Video {}", n),
        (n % 5) as PlayerId,
    )
}

fn assert_layout(array: &SentinelArray<QueueSlot>) {
    assert!(array.is_contiguous(), "empty slot precedes occupied slot");

    let first_empty = array
        .as_slice()
        .iter()
        .position(HasSentinel::is_sentinel)
        .unwrap_or(array.capacity());
    assert_eq!(array.count(), first_empty);
    assert_eq!(array.iter().count(), array.count());
}

#[test]
fn test_invariants_hold_under_mixed_operations() {
    let mut rng = Lcg(0x5eed);
    let mut array = SentinelArray::new(8);
    let mut next_id = 0;

    for _ in 0..2_000 {
        let before = array.count();
        match rng.next(5) {
            0 | 1 => {
                let accepted = array.enqueue(slot(next_id));
                next_id += 1;
                assert_eq!(accepted, before < array.capacity());
            }
            2 => {
                let index = rng.next(10);
                let removed = array.remove(index);
                assert_eq!(removed.is_some(), index < before);
            }
            3 => {
                let index = rng.next(10);
                array.move_up(index);
                assert_eq!(array.count(), before);
            }
            _ => {
                let index = rng.next(10);
                array.move_down(index);
                assert_eq!(array.count(), before);
            }
        }
        assert_layout(&array);
    }
}

#[test]
fn test_enqueue_on_full_changes_nothing() {
    let mut array = SentinelArray::new(3);
    for n in 0..3 {
        assert!(array.enqueue(slot(n)));
    }
    let before = array.clone();

    assert!(!array.enqueue(slot(99)));
    assert_eq!(array, before);
}

#[test]
fn test_remove_beyond_count_is_noop() {
    let mut array = SentinelArray::new(4);
    array.enqueue(slot(0));
    array.enqueue(slot(1));
    let before = array.clone();

    assert!(array.remove(2).is_none());
    assert!(array.remove(3).is_none());
    assert_eq!(array, before);
}

#[test]
fn test_remove_keeps_fields_aligned() {
    let mut array = SentinelArray::new(4);
    for n in 0..4 {
        array.enqueue(slot(n));
    }

    array.remove(1);

    let remaining: Vec<_> = array.iter().cloned().collect();
    assert_eq!(remaining, vec![slot(0), slot(2), slot(3)]);
    assert!(array.as_slice()[3].is_sentinel());
}

#[test]
fn test_operations_on_empty_array_are_safe() {
    let mut array: SentinelArray<QueueSlot> = SentinelArray::new(4);
    assert!(array.remove(0).is_none());
    assert!(!array.move_up(1));
    assert!(!array.move_down(0));
    array.clear();
    assert!(array.is_empty());
    assert!(array.front().is_none());
}
