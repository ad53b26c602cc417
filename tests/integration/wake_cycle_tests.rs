//! Wake-cycle integration: discovery, resolution, conversion and delivery
//! across deep sleep and power loss.

use serde_json::json;

use super::mock_hw::{Board, deliver, id, msg};
use thermonode::adapters::sim::SimBus;
use thermonode::app::ports::{BusSensorPort, ConfigError, ConfigStorePort, StoragePort};
use thermonode::store::PersistentStore;
use thermonode::protocol::Message;
use thermonode::{Error, Feature};

// ── Cold boot ─────────────────────────────────────────────────

#[test]
fn empty_config_two_probes_delivers_only_temperatures() {
    let mut node = Board::two_probes().wake();

    let state = node.state();
    assert_eq!(state.sensor_count(), 2);
    assert_eq!(state.bus[0].offset, 0.0);
    assert_eq!(state.bus[1].offset, 0.0);
    assert!(node.is_cold_boot());

    let out = deliver(&mut node);
    assert_eq!(out.keys().collect::<Vec<_>>(), vec!["t"], "no p or c without a request");
    assert_eq!(out["t"], json!([["a1", 20.0], ["a2", 21.0]]));
}

#[test]
fn stored_correction_is_resolved_and_applied() {
    let mut node = Board::two_probes().with_offset("a1", 1.5).wake();
    assert_eq!(node.state().bus[0].offset, 1.5);
    assert_eq!(node.state().bus[1].offset, 0.0);

    let out = deliver(&mut node);
    assert_eq!(out["t"], json!([["a1", 21.5], ["a2", 21.0]]));
}

#[test]
fn fixed_sensors_follow_bus_sensors_in_order() {
    let mut node = Board::full().with_offset("deadbeef", -0.5).wake();
    let out = deliver(&mut node);
    assert_eq!(
        out["t"],
        json!([["a1", 20.0], ["a2", 21.0], ["108000000001", 23.0], ["deadbeef", 22.0]])
    );
}

#[test]
fn slow_fixed_sensor_is_found_at_cold_boot() {
    let mut board = Board::full();
    board.sensors.sht4x.fails_first_probes = 1;
    let node = board.wake();
    assert!(node.state().sht4x.is_connected());
    assert!(node.delay().elapsed_ms() >= 15);
}

#[test]
fn more_than_eight_probes_truncated() {
    let probes: Vec<(u8, f32)> = (0..11u8).map(|i| (0x30 + i, 20.0)).collect();
    let mut board = Board::two_probes();
    board.sensors.bus = SimBus::with_probes(&probes);
    let mut node = board.wake();
    assert_eq!(node.state().sensor_count(), 8);
    let out = deliver(&mut node);
    assert_eq!(out["t"].as_array().unwrap().len(), 8);
}

#[test]
fn cold_boot_settles_at_resolved_precision() {
    let mut board = Board::two_probes();
    {
        let mut store = PersistentStore::open(board.storage).unwrap();
        store.set_precision(9).unwrap();
        board.storage = store.into_backend();
    }
    board.sensors.bus.set_resolution(12);
    let node = board.wake();
    assert_eq!(node.state().precision, 9);
    assert_eq!(node.sensors().bus.resolution, 9);
    assert_eq!(node.sensors().bus.conversions, 2);
}

// ── Warm wake ─────────────────────────────────────────────────

#[test]
fn warm_wake_reuses_cycle_state_without_rediscovery() {
    let mut board = Board::sleep(Board::two_probes().wake());
    board.sensors.bus.attach(id(0xa3), 25.0);

    let node = board.wake();
    assert!(!node.is_cold_boot());
    assert_eq!(node.state().sensor_count(), 2, "new probe ignored until cold boot");

    let board = Board::sleep(node).power_cycle();
    let node = board.wake();
    assert!(node.is_cold_boot());
    assert_eq!(node.state().sensor_count(), 3);
}

#[test]
fn warm_wake_drops_fixed_sensor_that_stopped_answering() {
    let mut board = Board::sleep(Board::full().wake());
    board.sensors.sht4x.present = false;

    let mut node = board.wake();
    let out = deliver(&mut node);
    let keys: Vec<&str> = out["t"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e[0].as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["a1", "a2", "108000000001"]);
}

#[test]
fn fixed_sensor_appearing_on_warm_wake_is_not_reported() {
    let mut board = Board::sleep(Board::two_probes().wake());
    board.sensors.hdc1080.present = true;

    let mut node = board.wake();
    let out = deliver(&mut node);
    assert_eq!(out["t"].as_array().unwrap().len(), 2);
}

#[test]
fn explicit_invalidation_forces_rediscovery() {
    let mut node = Board::two_probes().wake();
    node.invalidate_cycle_state();
    assert!(matches!(node.deliver(&mut Message::new()), Err(Error::Init(_))));

    let mut board = Board::sleep(node);
    board.sensors.bus.attach(id(0xa3), 25.0);
    let node = board.wake();
    assert!(node.is_cold_boot());
    assert_eq!(node.state().sensor_count(), 3);
}

// ── Delivery ──────────────────────────────────────────────────

#[test]
fn ordering_is_stable_within_a_cycle() {
    let mut node = Board::full().wake();
    let first = deliver(&mut node);
    let second = deliver(&mut node);
    assert_eq!(first["t"], second["t"]);
}

#[test]
fn delivery_appends_to_other_contributors() {
    let mut node = Board::two_probes().wake();
    let mut out = msg(json!({"t": [["hum", 40.0]], "v": 3.3}));
    node.deliver(&mut out).unwrap();
    assert_eq!(out["t"], json!([["hum", 40.0], ["a1", 20.0], ["a2", 21.0]]));
    assert_eq!(out["v"], json!(3.3));
}

#[test]
fn unreadable_probe_is_left_out() {
    let mut node = Board::two_probes().wake();
    node.sensors_mut().bus.probe_mut(&id(0xa2)).unwrap().attached = false;
    let out = deliver(&mut node);
    assert_eq!(out["t"], json!([["a1", 20.0]]));
}

#[test]
fn stuck_conversion_times_out_instead_of_hanging() {
    let mut board = Board::two_probes();
    board.sensors.bus.polls_until_complete = u32::MAX;
    let mut node = board.wake();

    let mut out = Message::new();
    assert!(matches!(
        node.deliver(&mut out),
        Err(Error::ConversionTimeout { .. })
    ));
    assert!(!out.contains_key("t"));
}

#[test]
fn resolution_limits_reported_precision() {
    let mut board = Board::two_probes();
    board.sensors.bus = SimBus::with_probes(&[(0xa1, 20.3)]);
    let mut node = board.wake();
    node.feedback(&msg(json!({"p": 9}))).unwrap();
    let out = deliver(&mut node);
    assert_eq!(out["t"], json!([["a1", 20.5]]));
}

// ── Config store faults ───────────────────────────────────────

#[test]
fn failed_config_read_keeps_stored_calibration() {
    let mut board = Board::two_probes().with_offset("a1", 1.5);
    {
        let mut store = PersistentStore::open(board.storage).unwrap();
        store.set_precision(10).unwrap();
        board.storage = store.into_backend();
    }
    let flash = board.storage.clone();

    board.storage.fail_reads.set(1);
    assert!(matches!(board.try_boot(), Err(ConfigError::IoError)));

    let store = PersistentStore::open(flash.clone()).unwrap();
    assert_eq!(store.precision(), Some(10));
    assert_eq!(store.offset("a1"), Some(1.5));

    // Next boot reads cleanly and resolves the stored values.
    let mut board = Board::two_probes();
    board.storage = flash;
    let node = board.wake();
    assert_eq!(node.state().precision, 10);
    assert_eq!(node.state().bus[0].offset, 1.5);
}

#[test]
fn corrupted_config_is_fatal_and_left_in_place() {
    let board = Board::two_probes();
    let mut flash = board.storage.clone();
    flash.write("temp", "cfg", &[0xff; 7]).unwrap();

    assert!(matches!(board.try_boot(), Err(ConfigError::Corrupted)));

    let mut buf = [0u8; 16];
    assert_eq!(flash.read("temp", "cfg", &mut buf), Ok(7));
    assert_eq!(buf[..7], [0xff; 7]);
}
