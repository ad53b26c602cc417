//! Setup console: corrections, precision, identify and the menu loop.

use serde_json::json;

use super::mock_hw::{Board, deliver, id, msg};
use thermonode::adapters::console_io::ScriptedConsole;
use thermonode::adapters::sim::Touch;
use thermonode::app::console::CorrectionScope;
use thermonode::app::ports::ConfigStorePort;
use thermonode::identity::SensorClass;
use thermonode::{Error, Feature};

// ── Corrections ───────────────────────────────────────────────

#[test]
fn console_correction_round_trips_through_protocol() {
    let mut node = Board::two_probes().wake();
    let mut con = ScriptedConsole::new(["5", "A1", "-0.25", "9"]);
    node.setup_handover(&mut con).unwrap();
    assert!(con.output().contains("Correction applied"));

    node.feedback(&msg(json!({"r": [4]}))).unwrap();
    let out = deliver(&mut node);
    assert_eq!(out["c"], json!([["a1", -0.25], ["a2", 0.0]]));
    assert_eq!(out["t"], json!([["a1", 19.75], ["a2", 21.0]]));
    assert_eq!(node.config_store().offset("a1"), Some(-0.25));
}

#[test]
fn correction_for_absent_sensor_is_stored_for_later() {
    let mut node = Board::two_probes().wake();
    assert_eq!(
        node.set_correction("28ff4c1e6116043a", 0.75),
        Ok(CorrectionScope::StoredOnly)
    );
    assert_eq!(node.config_store().offset("28ff4c1e6116043a"), Some(0.75));
    assert!(node.state().bus.iter().all(|s| s.offset == 0.0));
}

#[test]
fn malformed_identity_changes_nothing() {
    let mut node = Board::two_probes().wake();
    assert_eq!(
        node.set_correction("not-hex", 1.0),
        Err(Error::InvalidInput("malformed sensor identity"))
    );
    assert!(node.set_correction("a1", f32::INFINITY).is_err());
    assert!(node.config_store().config().offsets.is_empty());

    let mut con = ScriptedConsole::new(["5", "a1", "warm", "9"]);
    node.setup_handover(&mut con).unwrap();
    assert!(con.output().contains("Error: invalid input"));
    assert_eq!(node.state().bus[0].offset, 0.0);
}

#[test]
fn delete_resets_live_and_stored_correction() {
    let mut node = Board::two_probes().with_offset("a2", 0.5).wake();
    assert_eq!(node.state().bus[1].offset, 0.5);

    assert_eq!(node.delete_correction("A2"), Ok(true));
    assert_eq!(node.state().bus[1].offset, 0.0);
    assert!(!node.config_store().has_offset("a2"));

    let mut con = ScriptedConsole::new(["6", "ff", "9"]);
    node.setup_handover(&mut con).unwrap();
    assert!(con.output().contains("No correction stored"));
}

#[test]
fn console_corrections_survive_power_loss() {
    let mut node = Board::two_probes().wake();
    node.set_correction("a2", -1.0).unwrap();

    let node = Board::sleep(node).power_cycle().wake();
    assert!(node.is_cold_boot());
    assert_eq!(node.state().bus[1].offset, -1.0);
}

// ── Precision ─────────────────────────────────────────────────

#[test]
fn console_accepts_eight_bit_precision() {
    let mut node = Board::two_probes().wake();
    node.set_default_precision(8).unwrap();
    assert_eq!(node.state().precision, 8);
    assert_eq!(node.config_store().precision(), Some(8));

    assert!(matches!(
        node.set_default_precision(13),
        Err(Error::InvalidInput(_))
    ));
    assert_eq!(node.state().precision, 8);
}

#[test]
fn menu_precision_rejects_garbage() {
    let mut node = Board::two_probes().wake();
    let mut con = ScriptedConsole::new(["4", "twelve", "4", "12", "9"]);
    node.setup_handover(&mut con).unwrap();
    assert!(con.output().contains("Error: invalid input: precision must be a number"));
    assert!(con.output().contains("Precision set to 12 bit"));
    assert_eq!(node.state().precision, 12);
}

// ── Reads and identify ────────────────────────────────────────

#[test]
fn read_raw_and_corrected() {
    let mut node = Board::full().with_offset("a1", 2.0).wake();
    let readings = node.read_sensors().unwrap();
    assert_eq!(readings.len(), 4);
    assert_eq!(readings[0].raw, Ok(20.0));
    assert_eq!(readings[0].corrected(), Ok(22.0));
    assert_eq!(readings[3].class, SensorClass::Sht4x);
    assert!(node.sensors().sht4x.reads >= 2, "dummy read precedes the measured one");

    let mut con = ScriptedConsole::new(["2", "3", "9"]);
    node.setup_handover(&mut con).unwrap();
    assert!(con.output().contains("a1 (Bus): 20.0000 C"));
    assert!(con.output().contains("a1 (Bus): 22.0000 C"));
}

#[test]
fn identify_finds_warmed_sensor() {
    let mut board = Board::two_probes();
    board.sensors.bus.probe_mut(&id(0xa2)).unwrap().touch = Some(Touch {
        after_reads: 3,
        rise_c: 2.5,
    });
    let mut node = board.wake();
    let before = node.delay().elapsed_ms();

    assert_eq!(node.identify_touched(), Ok(Some((SensorClass::Bus, id(0xa2)))));
    assert!(node.delay().elapsed_ms() - before >= 300);
}

#[test]
fn identify_gives_up_after_round_limit() {
    let mut node = Board::two_probes().wake();
    let before = node.delay().elapsed_ms();
    assert_eq!(node.identify_touched(), Ok(None));
    assert!(node.delay().elapsed_ms() - before >= 20 * 300);
}

#[test]
fn menu_identify_waits_for_enter() {
    let mut board = Board::two_probes();
    board.sensors.bus.probe_mut(&id(0xa2)).unwrap().touch = Some(Touch {
        after_reads: 2,
        rise_c: 3.0,
    });
    let mut node = board.wake();

    // Input ends at the prompt: baseline taken, no polling.
    let before = node.delay().elapsed_ms();
    let mut con = ScriptedConsole::new(["1"]);
    node.setup_handover(&mut con).unwrap();
    assert!(con.output().contains("Hit <enter> to start identification"));
    assert!(!con.output().contains("Watching"));
    assert!(node.delay().elapsed_ms() - before < 300);

    let mut con = ScriptedConsole::new(["1", "", "9"]);
    node.setup_handover(&mut con).unwrap();
    assert!(con.output().contains("Touched: a2 (Bus)"));
    assert_eq!(con.remaining(), 0);
}

#[test]
fn identify_ignores_rise_below_threshold() {
    let mut board = Board::two_probes();
    board.sensors.bus.probe_mut(&id(0xa1)).unwrap().touch = Some(Touch {
        after_reads: 1,
        rise_c: 1.5,
    });
    let mut node = board.wake();
    assert_eq!(node.identify_touched(), Ok(None));
}

// ── Menu loop ─────────────────────────────────────────────────

#[test]
fn invalid_choice_reprints_menu() {
    let mut node = Board::two_probes().wake();
    let mut con = ScriptedConsole::new(["7", "9", "1"]);
    node.setup_handover(&mut con).unwrap();
    assert!(con.output().contains("Invalid choice '7'"));
    assert_eq!(con.output().matches("Temperature setup").count(), 2);
    assert_eq!(con.remaining(), 1, "nothing read after return");
}

#[test]
fn end_of_input_leaves_menu() {
    let mut node = Board::two_probes().wake();
    let mut con = ScriptedConsole::new(Vec::<String>::new());
    assert!(node.setup_handover(&mut con).is_ok());
}

#[test]
fn dumps_show_state_and_config() {
    let mut node = Board::two_probes().with_offset("a1", 1.5).wake();
    node.feedback(&msg(json!({"r": [6]}))).unwrap();

    let mut con = ScriptedConsole::default();
    node.print_cycle_state(&mut con).unwrap();
    node.print_persistent(&mut con).unwrap();
    let out = con.output();
    assert!(out.contains("precision requested:   yes"));
    assert!(out.contains("[0] a1 offset 1.5000"));
    assert!(out.contains("hdc1080: absent"));
    assert!(out.contains("default precision: 11 bit"));
    assert!(out.contains("a1 1.5000"));
}

#[test]
fn console_operations_need_begin() {
    let mut node = Board::two_probes().boot();
    assert!(matches!(node.read_sensors(), Err(Error::Init(_))));
    assert!(matches!(node.set_correction("a1", 1.0), Err(Error::Init(_))));
}
