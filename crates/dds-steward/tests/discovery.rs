// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Discovery waits and address lookups: bounded polling against scheduled
//! matched-status counters.

mod common;

use common::joined_with_topic;
use dds_steward::runtime::mock::MockRuntime;
use dds_steward::QosPreset;
use std::sync::Arc;
use std::time::{Duration, Instant};

const TOPIC: &str = "fleet/positions";

#[test]
fn test_wait_for_publishers_returns_once_matched() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = joined_with_topic(&runtime, TOPIC, QosPreset::LatestReliable);
    steward
        .create_subscriber(TOPIC, "R", "", &[])
        .expect("reader");

    // The stub reports a match on the third poll.
    let reader = steward.reader(TOPIC, "R").expect("reader");
    runtime.schedule_subscription_matches(reader, &[0, 0, 2]);

    let found = steward.wait_for_publishers(TOPIC, "R", 1, Duration::from_secs(5));
    assert_eq!(found, 2, "count becomes available on the third poll");
}

#[test]
fn test_wait_for_publishers_times_out_at_zero() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = joined_with_topic(&runtime, TOPIC, QosPreset::LatestReliable);
    steward
        .create_subscriber(TOPIC, "R", "", &[])
        .expect("reader");

    let start = Instant::now();
    let found = steward.wait_for_publishers(TOPIC, "R", 1, Duration::from_millis(300));
    assert_eq!(found, 0);
    assert!(
        start.elapsed() >= Duration::from_millis(300),
        "the full deadline is honored before giving up"
    );
}

#[test]
fn test_wait_for_subscribers_polls_the_writer_side() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = joined_with_topic(&runtime, TOPIC, QosPreset::LatestReliable);
    steward.create_publisher(TOPIC).expect("publisher");

    let writer = steward.writer(TOPIC).expect("writer");
    runtime.schedule_publication_matches(writer, &[0, 1]);

    let found = steward.wait_for_subscribers(TOPIC, 1, Duration::from_secs(5));
    assert_eq!(found, 1);
}

#[test]
fn test_wait_without_entities_reports_zero() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = joined_with_topic(&runtime, TOPIC, QosPreset::LatestReliable);

    // No writer and no reader exist yet: both waits short-circuit.
    assert_eq!(
        steward.wait_for_subscribers(TOPIC, 1, Duration::from_secs(5)),
        0
    );
    assert_eq!(
        steward.wait_for_publishers(TOPIC, "R", 1, Duration::from_secs(5)),
        0
    );
}

#[test]
fn test_wait_for_zero_reports_current_count_immediately() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = joined_with_topic(&runtime, TOPIC, QosPreset::LatestReliable);
    steward.create_publisher(TOPIC).expect("publisher");

    // min_count 0 is the "have I lost everyone?" probe: returns at once.
    let start = Instant::now();
    let found = steward.wait_for_subscribers(TOPIC, 0, Duration::from_secs(30));
    assert_eq!(found, 0);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_writer_address_joins_locators_with_commas() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = joined_with_topic(&runtime, TOPIC, QosPreset::LatestReliable);
    steward.create_publisher(TOPIC).expect("publisher");

    let writer = steward.writer(TOPIC).expect("writer");
    runtime.set_writer_locators(
        writer,
        vec![
            "udp:239.255.0.1:8401".to_string(),
            "udp:192.168.1.10:7411".to_string(),
        ],
    );

    assert_eq!(
        steward.writer_address(TOPIC).expect("address"),
        "udp:239.255.0.1:8401,udp:192.168.1.10:7411"
    );
}

#[test]
fn test_reader_address_joins_locators_with_commas() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = joined_with_topic(&runtime, TOPIC, QosPreset::LatestReliable);
    steward
        .create_subscriber(TOPIC, "R", "", &[])
        .expect("reader");

    let reader = steward.reader(TOPIC, "R").expect("reader");
    runtime.set_reader_locators(reader, vec!["udp:10.0.0.2:7661".to_string()]);

    assert_eq!(
        steward.reader_address(TOPIC, "R").expect("address"),
        "udp:10.0.0.2:7661"
    );
}

#[test]
fn test_address_lookup_for_missing_entities_fails() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = joined_with_topic(&runtime, TOPIC, QosPreset::LatestReliable);

    assert!(steward.writer_address(TOPIC).is_err());
    assert!(steward.reader_address(TOPIC, "R").is_err());
}
