//! Pending charge events for one port, ordered by arrival time.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::warn;

use super::event::ChargeEvent;

/// Nudge applied to an arrival time that collides with a queued event (s).
pub const ARRIVAL_TIE_EPSILON_SECS: f64 = 1e-3;
/// Events leaving sooner than this after `now` are purged from the head (s).
pub const DEFAULT_MIN_REMAINING_CHARGE_SECS: f64 = 60.0;

/// Conflict policy applied on insertion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueuingMode {
    /// Most recent insertion wins: queued events overlapping the new one by
    /// more than `max_allowed_overlap_secs` are evicted.
    OverlapLimited { max_allowed_overlap_secs: f64 },
    /// Keep everything; earlier arrivals keep precedence on exact ties.
    OverlapAllowed,
}

impl Default for QueuingMode {
    fn default() -> Self {
        Self::OverlapLimited {
            max_allowed_overlap_secs: 60.0,
        }
    }
}

/// Moves a finite arrival time later by the tie epsilon, or by one ulp where
/// the epsilon is below the float's resolution.
fn nudge_forward(t: f64) -> f64 {
    let nudged = t + ARRIVAL_TIE_EPSILON_SECS;
    if nudged > t {
        nudged
    } else if t > 0.0 {
        f64::from_bits(t.to_bits() + 1)
    } else {
        f64::from_bits(t.to_bits() - 1)
    }
}

/// Arrival time with a total order, used as the map key.
#[derive(Debug, Clone, Copy)]
struct ArrivalKey(f64);

impl PartialEq for ArrivalKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ArrivalKey {}

impl PartialOrd for ArrivalKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ArrivalKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Ordered queue of charge events awaiting a free port.
///
/// No two queued events share an arrival time: ties are broken on insertion
/// by nudging the newcomer forward by [`ARRIVAL_TIE_EPSILON_SECS`].
///
/// # Examples
///
/// ```
/// use evse_sim::sim::event::ChargeEvent;
/// use evse_sim::sim::queue::{ChargeEventQueue, QueuingMode};
///
/// let mut queue = ChargeEventQueue::new(QueuingMode::OverlapLimited {
///     max_allowed_overlap_secs: 60.0,
/// });
/// queue.insert(ChargeEvent::new(1, "ev", 0.0, 3600.0, 20.0, 80.0));
/// let evicted = queue.insert(ChargeEvent::new(2, "ev", 1800.0, 5400.0, 20.0, 80.0));
///
/// assert_eq!(evicted.len(), 1);
/// assert_eq!(queue.peek().unwrap().charge_event_id, 2);
/// ```
#[derive(Debug, Clone)]
pub struct ChargeEventQueue {
    events: BTreeMap<ArrivalKey, ChargeEvent>,
    mode: QueuingMode,
    min_remaining_charge_secs: f64,
}

impl ChargeEventQueue {
    pub fn new(mode: QueuingMode) -> Self {
        Self {
            events: BTreeMap::new(),
            mode,
            min_remaining_charge_secs: DEFAULT_MIN_REMAINING_CHARGE_SECS,
        }
    }

    /// Overrides the purge threshold used by [`Self::next_available`].
    pub fn with_min_remaining_charge_secs(mut self, secs: f64) -> Self {
        self.min_remaining_charge_secs = secs.max(0.0);
        self
    }

    pub fn mode(&self) -> QueuingMode {
        self.mode
    }

    /// Inserts `event` under the queue's policy.
    ///
    /// Returns the events evicted to make room, in arrival order. An event
    /// whose times are not finite is not queued and comes back alone.
    pub fn insert(&mut self, mut event: ChargeEvent) -> Vec<ChargeEvent> {
        if !event.arrival_unix_time.is_finite() || !event.departure_unix_time.is_finite() {
            warn!(
                id = event.charge_event_id,
                arrival = event.arrival_unix_time,
                departure = event.departure_unix_time,
                "charge event rejected: non-finite time"
            );
            return vec![event];
        }

        let mut evicted = Vec::new();

        if let QueuingMode::OverlapLimited {
            max_allowed_overlap_secs,
        } = self.mode
        {
            let key = ArrivalKey(event.arrival_unix_time);
            // Start from the latest event arriving at or before the newcomer.
            let start = self
                .events
                .range(..=key)
                .next_back()
                .map(|(k, _)| *k)
                .or_else(|| self.events.keys().next().copied());

            let victims: Vec<ArrivalKey> = match start {
                Some(start) => self
                    .events
                    .range(start..)
                    .take_while(|(_, queued)| queued.arrival_unix_time <= event.departure_unix_time)
                    .filter(|(_, queued)| queued.overlap_secs(&event) > max_allowed_overlap_secs)
                    .map(|(k, _)| *k)
                    .collect(),
                None => Vec::new(),
            };

            for key in victims {
                if let Some(removed) = self.events.remove(&key) {
                    warn!(
                        removed_id = removed.charge_event_id,
                        kept_id = event.charge_event_id,
                        overlap_secs = removed.overlap_secs(&event),
                        "charge event removed from queue: overlaps a newer event"
                    );
                    evicted.push(removed);
                }
            }
        }

        while self.events.contains_key(&ArrivalKey(event.arrival_unix_time)) {
            event.arrival_unix_time = nudge_forward(event.arrival_unix_time);
        }
        self.events.insert(ArrivalKey(event.arrival_unix_time), event);

        evicted
    }

    /// Purges head events that leave too soon, then reports whether the
    /// earliest remaining event has arrived by `now_unix_time`.
    ///
    /// Only the head is purged; an event further back that also leaves soon
    /// stays until it reaches the head.
    pub fn next_available(&mut self, now_unix_time: f64) -> bool {
        while let Some(head) = self.events.first_entry() {
            let remaining = head.get().departure_unix_time - now_unix_time;
            if remaining >= self.min_remaining_charge_secs {
                break;
            }
            let removed = head.remove();
            warn!(
                charge_event_id = removed.charge_event_id,
                remaining_secs = remaining,
                "charge event removed from queue: too little time left to charge"
            );
        }

        self.events
            .first_key_value()
            .is_some_and(|(_, event)| event.arrival_unix_time <= now_unix_time)
    }

    /// Removes and returns the earliest event.
    ///
    /// Callers check [`Self::next_available`] first; `None` means the queue
    /// was empty.
    pub fn dequeue(&mut self) -> Option<ChargeEvent> {
        self.events.pop_first().map(|(_, event)| event)
    }

    pub fn peek(&self) -> Option<&ChargeEvent> {
        self.events.first_key_value().map(|(_, event)| event)
    }

    pub fn next_arrival_unix_time(&self) -> Option<f64> {
        self.peek().map(|event| event.arrival_unix_time)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Queued events in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &ChargeEvent> {
        self.events.values()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Default for ChargeEventQueue {
    fn default() -> Self {
        Self::new(QueuingMode::default())
    }
}

impl Extend<ChargeEvent> for ChargeEventQueue {
    fn extend<T: IntoIterator<Item = ChargeEvent>>(&mut self, iter: T) {
        for event in iter {
            self.insert(event);
        }
    }
}
