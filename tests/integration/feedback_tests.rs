//! Controller feedback → one-shot flags → next delivery.

use serde_json::json;

use super::mock_hw::{Board, deliver, msg};
use thermonode::app::ports::{ConfigError, ConfigStorePort};
use thermonode::{Error, Feature};

#[test]
fn corrections_request_emits_table_before_temperatures() {
    let mut node = Board::two_probes().with_offset("a1", 1.5).wake();
    node.feedback(&msg(json!({"r": [4]}))).unwrap();

    let out = deliver(&mut node);
    assert_eq!(out["c"], json!([["a1", 1.5], ["a2", 0.0]]));
    assert_eq!(out.keys().collect::<Vec<_>>(), vec!["c", "t"]);
    assert!(!out.contains_key("p"));
}

#[test]
fn precision_request_is_one_shot() {
    let mut node = Board::two_probes().wake();
    node.feedback(&msg(json!({"r": [6]}))).unwrap();

    let first = deliver(&mut node);
    assert_eq!(first["p"], json!(11));

    let second = deliver(&mut node);
    assert!(!second.contains_key("p"));
    assert!(second.contains_key("t"));
}

#[test]
fn corrections_request_is_one_shot() {
    let mut node = Board::two_probes().wake();
    node.feedback(&msg(json!({"r": [4, 4]}))).unwrap();
    assert!(deliver(&mut node).contains_key("c"));
    assert!(!deliver(&mut node).contains_key("c"));
}

#[test]
fn armed_flags_survive_deep_sleep() {
    let mut node = Board::two_probes().wake();
    node.feedback(&msg(json!({"r": [4, 6]}))).unwrap();

    let mut node = Board::sleep(node).wake();
    assert!(!node.is_cold_boot());
    let out = deliver(&mut node);
    assert!(out.contains_key("p"));
    assert!(out.contains_key("c"));

    let mut node = Board::sleep(node).wake();
    let out = deliver(&mut node);
    assert!(!out.contains_key("p"), "flags consumed in the previous wake");
}

#[test]
fn out_of_range_precision_is_ignored() {
    let mut node = Board::two_probes().wake();
    for bad in [json!(13), json!(8), json!(0), json!("10"), json!(10.5)] {
        node.feedback(&msg(json!({ "p": bad }))).unwrap();
        assert_eq!(node.state().precision, 11);
    }
    assert_eq!(node.config_store().precision(), Some(11));
}

#[test]
fn valid_precision_is_persisted_and_applied() {
    let mut node = Board::two_probes().wake();
    let conversions = node.sensors().bus.conversions;
    node.feedback(&msg(json!({"p": 10}))).unwrap();

    assert_eq!(node.state().precision, 10);
    assert_eq!(node.config_store().precision(), Some(10));
    assert_eq!(node.sensors().bus.resolution, 10);
    assert_eq!(node.sensors().bus.conversions, conversions + 1, "non-blocking apply pass");

    // Power loss: the new precision comes back from flash.
    let node = Board::sleep(node).power_cycle().wake();
    assert!(node.is_cold_boot());
    assert_eq!(node.state().precision, 10);
}

#[test]
fn unknown_keys_and_codes_are_ignored() {
    let mut node = Board::two_probes().wake();
    node.feedback(&msg(json!({"r": [1, 2, 99], "x": true, "t": []})))
        .unwrap();
    let out = deliver(&mut node);
    assert_eq!(out.keys().collect::<Vec<_>>(), vec!["t"]);
}

#[test]
fn failed_persist_keeps_precision_but_arms_requests() {
    let mut node = Board::two_probes().wake();
    let mut board = Board::sleep(node);
    board.storage.fail_writes = true;
    node = board.wake();

    let result = node.feedback(&msg(json!({"p": 10, "r": [4]})));
    assert_eq!(result, Err(Error::Config(ConfigError::IoError)));
    assert_eq!(node.state().precision, 11);
    assert!(node.state().corrections_requested);
    assert!(deliver(&mut node).contains_key("c"));
}

#[test]
fn float_encoded_numbers_are_accepted() {
    let mut node = Board::two_probes().wake();
    node.feedback(&msg(json!({"p": 10.0, "r": [6.0]}))).unwrap();
    assert_eq!(node.state().precision, 10);
    assert_eq!(deliver(&mut node)["p"], json!(10));
}
