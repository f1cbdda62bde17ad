//! Queue policy properties exercised through the public API.

mod common;

use evse_sim::sim::event::ChargeEvent;
use evse_sim::sim::queue::{ChargeEventQueue, QueuingMode};

fn limited(max_allowed_overlap_secs: f64) -> ChargeEventQueue {
    ChargeEventQueue::new(QueuingMode::OverlapLimited {
        max_allowed_overlap_secs,
    })
}

fn ids(queue: &ChargeEventQueue) -> Vec<u64> {
    queue.iter().map(|e| e.charge_event_id).collect()
}

#[test]
fn newer_event_evicts_heavily_overlapping_one() {
    let mut queue = limited(60.0);
    let first = ChargeEvent::new(1, "compact_bev", 0.0, 3600.0, 20.0, 80.0);
    let second = ChargeEvent::new(2, "compact_bev", 1800.0, 5400.0, 20.0, 80.0);

    assert!(queue.insert(first).is_empty());
    let evicted = queue.insert(second);

    assert_eq!(evicted.len(), 1);
    assert_eq!(evicted[0].charge_event_id, 1);
    assert_eq!(ids(&queue), vec![2]);
}

#[test]
fn overlap_at_threshold_keeps_both() {
    let mut queue = limited(60.0);
    queue.insert(ChargeEvent::new(1, "phev", 0.0, 3600.0, 20.0, 80.0));
    let evicted = queue.insert(ChargeEvent::new(2, "phev", 3540.0, 7200.0, 20.0, 80.0));
    assert!(evicted.is_empty());
    assert_eq!(ids(&queue), vec![1, 2]);

    let evicted = queue.insert(ChargeEvent::new(3, "phev", 7139.0, 9000.0, 20.0, 80.0));
    assert_eq!(evicted.len(), 1);
    assert_eq!(ids(&queue), vec![1, 3]);
}

#[test]
fn disjoint_events_are_order_independent() {
    let events = [
        common::hour_event(1, 0.0),
        common::hour_event(2, 7200.0),
        common::hour_event(3, 14_400.0),
    ];
    let orders = [[0, 1, 2], [2, 1, 0], [1, 2, 0], [2, 0, 1]];

    for mode in [QueuingMode::default(), QueuingMode::OverlapAllowed] {
        let contents: Vec<Vec<u64>> = orders
            .iter()
            .map(|order| {
                let mut queue = ChargeEventQueue::new(mode);
                for &i in order {
                    queue.insert(events[i].clone());
                }
                ids(&queue)
            })
            .collect();
        assert!(contents.iter().all(|c| c == &vec![1, 2, 3]), "{mode:?}: {contents:?}");
    }
}

#[test]
fn identical_arrivals_are_both_kept_in_submission_order() {
    let mut queue = ChargeEventQueue::new(QueuingMode::OverlapAllowed);
    for id in 1..=3 {
        assert!(queue.insert(common::hour_event(id, 600.0)).is_empty());
    }

    assert_eq!(queue.len(), 3);
    assert_eq!(ids(&queue), vec![1, 2, 3]);
    let arrivals: Vec<f64> = queue.iter().map(|e| e.arrival_unix_time).collect();
    assert_eq!(arrivals[0], 600.0);
    assert!(arrivals.windows(2).all(|w| w[0] < w[1]));
    assert!(arrivals[2] - 600.0 < 0.01);
}

#[test]
fn next_available_tracks_the_head() {
    let mut queue = ChargeEventQueue::new(QueuingMode::OverlapAllowed);
    assert!(!queue.next_available(0.0));

    queue.insert(common::hour_event(1, 1000.0));
    assert!(!queue.next_available(999.0));
    assert!(queue.next_available(1000.0));
    assert_eq!(queue.dequeue().map(|e| e.charge_event_id), Some(1));
    assert!(!queue.next_available(1000.0));
}

#[test]
fn next_available_purges_events_about_to_leave() {
    let mut queue = ChargeEventQueue::new(QueuingMode::OverlapAllowed);
    queue.insert(ChargeEvent::new(1, "phev", 0.0, 100.0, 20.0, 80.0));
    queue.insert(ChargeEvent::new(2, "phev", 50.0, 4000.0, 20.0, 80.0));

    assert!(queue.next_available(60.0));
    assert_eq!(ids(&queue), vec![2]);
}
