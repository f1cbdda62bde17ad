//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use evse_sim::devices::Inventory;
use evse_sim::sim::event::ChargeEvent;
use evse_sim::sim::port::{PortConfig, PortStep, SupplyEquipment};
use evse_sim::sim::queue::{ChargeEventQueue, QueuingMode};

/// Built-in inventory (three vehicle types, L1/L2/DC-fast chargers).
pub fn reference_inventory() -> Arc<Inventory> {
    Arc::new(Inventory::reference().expect("built-in catalog is valid"))
}

/// Port with the given built-in charger and an empty queue.
pub fn port(charger_type: &str, mode: QueuingMode) -> SupplyEquipment {
    let inventory = reference_inventory();
    let charger = inventory
        .charger(charger_type)
        .expect("charger is in the built-in catalog");
    let config = PortConfig::from_charger(1, charger);
    SupplyEquipment::new(config, inventory, ChargeEventQueue::new(mode))
}

/// L2 port with `events` queued under the default 60 s overlap limit.
pub fn l2_port_with(events: Vec<ChargeEvent>) -> SupplyEquipment {
    let mut port = port("L2", QueuingMode::default());
    for event in events {
        port.add_charge_event(event);
    }
    port
}

/// One-hour event for the compact vehicle starting at `arrival`.
pub fn hour_event(id: u64, arrival: f64) -> ChargeEvent {
    ChargeEvent::new(id, "compact_bev", arrival, arrival + 3600.0, 20.0, 80.0)
}

/// Steps `port` over `steps` fixed intervals of `step_secs`, starting at `start`.
pub fn step_port(
    port: &mut SupplyEquipment,
    start: f64,
    step_secs: f64,
    steps: usize,
) -> Vec<PortStep> {
    (0..steps)
        .map(|i| {
            let prev = start + i as f64 * step_secs;
            port.advance(prev, prev + step_secs, 1.0)
                .expect("monotonic stepping succeeds")
        })
        .collect()
}
