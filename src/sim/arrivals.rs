use rand::{Rng, SeedableRng, rngs::StdRng};

use super::event::{ChargeEvent, ControlStrategy, EnergyControl};

/// Distribution of randomly generated charge events.
///
/// Times are hours after the start of each day.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrivalProfile {
    pub sessions_per_day: usize,
    pub earliest_arrival_hr: f64,
    pub latest_arrival_hr: f64,
    pub dwell_hrs_min: f64,
    pub dwell_hrs_max: f64,
    pub arrival_soc_min: f64,
    pub arrival_soc_max: f64,
    pub departure_soc: f64,
    /// Drawn uniformly for each event.
    pub vehicle_types: Vec<String>,
    /// Probability that an event expects an external P3 setpoint.
    pub managed_fraction: f64,
}

/// Seeded generator of daily charge events.
///
/// Each simulated day gets `sessions_per_day` events with:
/// - random arrival time inside the arrival window
/// - random dwell duration (which sets departure)
/// - random arrival SOC
#[derive(Debug, Clone)]
pub struct ArrivalSampler {
    profile: ArrivalProfile,
    next_id: u64,
    rng: StdRng,
}

impl ArrivalSampler {
    /// Creates a sampler with the given profile.
    ///
    /// # Arguments
    ///
    /// * `profile` - Event distribution
    /// * `seed` - Random seed for reproducible event generation
    ///
    /// # Panics
    ///
    /// Panics if a range is inverted, dwell is not positive, SOC bounds leave
    /// `[0, 100]`, `managed_fraction` leaves `[0, 1]`, or no vehicle type is given.
    pub fn new(profile: ArrivalProfile, seed: u64) -> Self {
        assert!(profile.earliest_arrival_hr >= 0.0);
        assert!(profile.latest_arrival_hr >= profile.earliest_arrival_hr);
        assert!(profile.dwell_hrs_min > 0.0);
        assert!(profile.dwell_hrs_max >= profile.dwell_hrs_min);
        assert!(profile.arrival_soc_min >= 0.0);
        assert!(profile.arrival_soc_max >= profile.arrival_soc_min);
        assert!(profile.arrival_soc_max <= 100.0);
        assert!((0.0..=100.0).contains(&profile.departure_soc));
        assert!((0.0..=1.0).contains(&profile.managed_fraction));
        assert!(!profile.vehicle_types.is_empty());

        Self {
            profile,
            next_id: 1,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Numbers generated events from `first_id` upwards.
    pub fn with_first_id(mut self, first_id: u64) -> Self {
        self.next_id = first_id;
        self
    }

    /// Events for the day starting at `day_start_unix_time`, in arrival order.
    pub fn sample_day(&mut self, day_start_unix_time: f64) -> Vec<ChargeEvent> {
        let mut events: Vec<ChargeEvent> = (0..self.profile.sessions_per_day)
            .map(|_| self.sample_event(day_start_unix_time))
            .collect();
        events.sort_by(|a, b| a.arrival_unix_time.total_cmp(&b.arrival_unix_time));
        events
    }

    /// Events for `days` consecutive days.
    pub fn sample(&mut self, start_unix_time: f64, days: usize) -> Vec<ChargeEvent> {
        (0..days)
            .flat_map(|day| self.sample_day(start_unix_time + day as f64 * 86_400.0))
            .collect()
    }

    fn sample_event(&mut self, day_start_unix_time: f64) -> ChargeEvent {
        let p = &self.profile;
        let arrival_hr = self
            .rng
            .random_range(p.earliest_arrival_hr..=p.latest_arrival_hr);
        let dwell_hr = self.rng.random_range(p.dwell_hrs_min..=p.dwell_hrs_max);
        let arrival_soc = self
            .rng
            .random_range(p.arrival_soc_min..=p.arrival_soc_max);
        let vehicle_type = &p.vehicle_types[self.rng.random_range(0..p.vehicle_types.len())];
        let managed = self.rng.random_bool(p.managed_fraction);

        let arrival = day_start_unix_time + arrival_hr * 3600.0;
        let departure = arrival + dwell_hr * 3600.0;
        let departure_soc = p.departure_soc.max(arrival_soc);

        let id = self.next_id;
        self.next_id += 1;

        let control = ControlStrategy {
            energy: if managed {
                EnergyControl::External
            } else {
                EnergyControl::Uncontrolled
            },
            ..ControlStrategy::default()
        };
        ChargeEvent::new(id, vehicle_type.clone(), arrival, departure, arrival_soc, departure_soc)
            .with_control(control)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> ArrivalProfile {
        ArrivalProfile {
            sessions_per_day: 4,
            earliest_arrival_hr: 6.0,
            latest_arrival_hr: 20.0,
            dwell_hrs_min: 1.0,
            dwell_hrs_max: 4.0,
            arrival_soc_min: 10.0,
            arrival_soc_max: 60.0,
            departure_soc: 80.0,
            vehicle_types: vec!["compact_bev".to_string(), "phev".to_string()],
            managed_fraction: 0.5,
        }
    }

    #[test]
    fn same_seed_same_events() {
        let a = ArrivalSampler::new(profile(), 7).sample(0.0, 2);
        let b = ArrivalSampler::new(profile(), 7).sample(0.0, 2);
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
    }

    #[test]
    fn events_respect_the_profile() {
        let events = ArrivalSampler::new(profile(), 3).sample(86_400.0, 3);
        for (i, e) in events.iter().enumerate() {
            let day = (i / 4) as f64;
            let hr = (e.arrival_unix_time - 86_400.0 * (1.0 + day)) / 3600.0;
            assert!((6.0 - 1e-9..=20.0 + 1e-9).contains(&hr), "arrival hour {hr}");
            let dwell = e.duration_secs() / 3600.0;
            assert!((1.0 - 1e-9..=4.0 + 1e-9).contains(&dwell));
            assert!((10.0..=60.0).contains(&e.arrival_soc));
            assert_eq!(e.departure_soc, 80.0);
        }
    }

    #[test]
    fn ids_are_sequential() {
        let events = ArrivalSampler::new(profile(), 1).with_first_id(100).sample_day(0.0);
        let mut ids: Vec<u64> = events.iter().map(|e| e.charge_event_id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![100, 101, 102, 103]);
    }

    #[test]
    fn day_is_sorted_by_arrival() {
        let events = ArrivalSampler::new(profile(), 11).sample_day(0.0);
        assert!(
            events
                .windows(2)
                .all(|w| w[0].arrival_unix_time <= w[1].arrival_unix_time)
        );
    }

    #[test]
    #[should_panic]
    fn empty_vehicle_list_panics() {
        let mut p = profile();
        p.vehicle_types.clear();
        ArrivalSampler::new(p, 0);
    }
}
