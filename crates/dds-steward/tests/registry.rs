// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Registry and topic-group behavior against the instrumented mock runtime:
//! preset idempotence, reader-name exclusivity, filter replacement,
//! teardown ordering and bulk cleanup.

mod common;

use common::{joined_with_topic, steward};
use dds_steward::runtime::mock::MockRuntime;
use dds_steward::runtime::{ParticipantRuntime, RetCode};
use dds_steward::{Error, QosPreset};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const TOPIC: &str = "vehicle/state";

fn first_position(log: &[String], prefix: &str) -> usize {
    log.iter()
        .position(|call| call.starts_with(prefix))
        .unwrap_or_else(|| panic!("no '{}' call recorded in {:?}", prefix, log))
}

#[test]
fn test_register_qos_is_idempotent_and_first_wins() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = joined_with_topic(&runtime, TOPIC, QosPreset::LatestReliable);

    let group = steward.registry().group(TOPIC).expect("group exists");
    assert_eq!(group.qos_preset(), Some(QosPreset::LatestReliable));
    let qos_before = steward.reader_qos(TOPIC);

    // Same preset again: no-op success.
    steward
        .register_qos(TOPIC, QosPreset::LatestReliable)
        .expect("repeat registration succeeds");
    assert_eq!(group.qos_preset(), Some(QosPreset::LatestReliable));
    assert_eq!(steward.reader_qos(TOPIC), qos_before);

    // Different preset after one is set: success, but nothing changes.
    steward
        .register_qos(TOPIC, QosPreset::BestEffort)
        .expect("conflicting registration still reports success");
    assert_eq!(group.qos_preset(), Some(QosPreset::LatestReliable));
    assert_eq!(steward.reader_qos(TOPIC), qos_before);
}

#[test]
fn test_register_qos_requires_an_existing_group() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = steward(&runtime);
    steward.join_domain(0).expect("join");

    let err = steward
        .register_qos("never/created", QosPreset::BestEffort)
        .unwrap_err();
    assert!(matches!(err, Error::UnknownTopic(_)));
}

#[test]
fn test_qos_setter_precreates_the_group() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = steward(&runtime);

    // Raw setter before join: stores QoS in a fresh group, no entities.
    let mut qos = steward.topic_qos("early/topic");
    qos.deadline = Some(Duration::from_secs(1));
    steward.set_topic_qos("early/topic", qos);
    assert!(runtime.live_entities().is_empty());

    // The pre-created group satisfies register_qos.
    steward
        .register_qos("early/topic", QosPreset::BestEffort)
        .expect("preset applies to pre-created group");
    assert_eq!(
        steward.topic_qos("early/topic").reliability,
        dds_steward::qos::Reliability::BestEffort
    );
}

#[test]
fn test_create_publisher_is_idempotent() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = joined_with_topic(&runtime, TOPIC, QosPreset::LatestReliable);

    steward.create_publisher(TOPIC).expect("first create");
    let writer = steward.writer(TOPIC).expect("writer exists");
    steward.create_publisher(TOPIC).expect("second create");

    assert_eq!(steward.writer(TOPIC), Some(writer));
    let live = runtime.live_entities();
    assert_eq!(live.publishers, 1);
    assert_eq!(live.writers, 1);
}

#[test]
fn test_create_publisher_rolls_back_on_writer_failure() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = joined_with_topic(&runtime, TOPIC, QosPreset::LatestReliable);

    runtime.fail_next("create_writer", RetCode::OutOfResources);
    let err = steward.create_publisher(TOPIC).unwrap_err();
    assert!(matches!(
        err,
        Error::Runtime {
            op: "create_writer",
            ..
        }
    ));

    // No half-built publisher is exposed.
    assert_eq!(runtime.live_entities().publishers, 0);
    assert!(steward.writer(TOPIC).is_none());

    // A retry succeeds from the clean state.
    steward.create_publisher(TOPIC).expect("retry succeeds");
}

#[test]
fn test_duplicate_reader_name_is_rejected() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = joined_with_topic(&runtime, TOPIC, QosPreset::LatestReliable);

    steward
        .create_subscriber(TOPIC, "R", "", &[])
        .expect("first reader");
    let original = steward.reader(TOPIC, "R").expect("reader registered");

    let err = steward.create_subscriber(TOPIC, "R", "", &[]).unwrap_err();
    assert!(matches!(err, Error::DuplicateReader { .. }));

    // The first reader is intact.
    assert_eq!(steward.reader(TOPIC, "R"), Some(original));
    assert_eq!(runtime.live_entities().readers, 1);
}

#[test]
fn test_empty_reader_name_is_rejected() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = joined_with_topic(&runtime, TOPIC, QosPreset::LatestReliable);

    let err = steward.create_subscriber(TOPIC, "", "", &[]).unwrap_err();
    assert!(matches!(err, Error::EmptyReaderName(_)));
}

#[test]
fn test_create_subscriber_on_unregistered_topic_fails() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = steward(&runtime);
    steward.join_domain(0).expect("join");

    let err = steward
        .create_subscriber("missing/topic", "R", "", &[])
        .unwrap_err();
    assert!(matches!(err, Error::UnknownTopic(_)));
}

#[test]
fn test_failed_filtered_reader_leaves_nothing_registered() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = joined_with_topic(&runtime, TOPIC, QosPreset::LatestReliable);

    runtime.fail_next("create_reader", RetCode::OutOfResources);
    let err = steward
        .create_subscriber(TOPIC, "R", "speed > 10", &[])
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Runtime {
            op: "create_reader",
            ..
        }
    ));

    assert!(steward.reader(TOPIC, "R").is_none());
    // The filter topic created mid-operation was unwound with it.
    assert!(runtime.filter_names().is_empty());

    // The name is free again.
    steward
        .create_subscriber(TOPIC, "R", "speed > 10", &[])
        .expect("retry succeeds");
    assert_eq!(runtime.filter_names(), vec![format!("{}_R_0", TOPIC)]);
}

#[test]
fn test_replace_filter_preserves_reader_identity() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = joined_with_topic(&runtime, TOPIC, QosPreset::LatestReliable);

    steward
        .create_subscriber(TOPIC, "R", "speed > 10", &[])
        .expect("filtered reader");
    let group = steward.registry().group(TOPIC).expect("group");
    let names_before = group.reader_names();

    steward
        .replace_filter(TOPIC, "R", "speed > 99")
        .expect("replacement succeeds");

    // Same name set, non-null handle under the same key.
    assert!(steward.reader(TOPIC, "R").is_some());
    assert_eq!(group.reader_names(), names_before);
    assert_eq!(runtime.live_entities().readers, 1);
}

#[test]
fn test_replace_filter_sequences_filter_names() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = joined_with_topic(&runtime, TOPIC, QosPreset::LatestReliable);

    steward
        .create_subscriber(TOPIC, "R", "speed > 0", &[])
        .expect("filtered reader");
    assert_eq!(runtime.filter_names(), vec![format!("{}_R_0", TOPIC)]);

    for expected in 1..=3u32 {
        steward
            .replace_filter(TOPIC, "R", &format!("speed > {}", expected))
            .expect("replacement succeeds");
        assert_eq!(
            runtime.filter_names(),
            vec![format!("{}_R_{}", TOPIC, expected)],
            "replacement {} should produce exactly one live filter",
            expected
        );
    }
}

#[test]
fn test_replace_filter_starts_sequence_for_unfiltered_reader() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = joined_with_topic(&runtime, TOPIC, QosPreset::LatestReliable);

    steward
        .create_subscriber(TOPIC, "R", "", &[])
        .expect("plain reader");
    assert!(runtime.filter_names().is_empty());

    steward
        .replace_filter(TOPIC, "R", "speed > 1")
        .expect("filter added");
    assert_eq!(runtime.filter_names(), vec![format!("{}_R_1", TOPIC)]);

    // An empty expression removes the filter again.
    steward
        .replace_filter(TOPIC, "R", "")
        .expect("filter removed");
    assert!(runtime.filter_names().is_empty());
    assert!(steward.reader(TOPIC, "R").is_some());
}

#[test]
fn test_replace_filter_unknown_reader_fails() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = joined_with_topic(&runtime, TOPIC, QosPreset::LatestReliable);

    let err = steward.replace_filter(TOPIC, "ghost", "x > 1").unwrap_err();
    assert!(matches!(err, Error::UnknownReader { .. }));
}

#[test]
fn test_replace_filter_params_updates_in_place() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = joined_with_topic(&runtime, TOPIC, QosPreset::LatestReliable);

    steward
        .create_subscriber(TOPIC, "R", "speed > %0", &["10".to_string()])
        .expect("filtered reader");
    let reader = steward.reader(TOPIC, "R").expect("reader");
    let filter = runtime
        .reader_filter_topic(reader)
        .expect("reader is filtered");

    steward
        .replace_filter_params(TOPIC, "R", &["99".to_string()])
        .expect("param swap succeeds");

    // Same reader, same filter topic, new parameters.
    assert_eq!(steward.reader(TOPIC, "R"), Some(reader));
    assert_eq!(runtime.filter_params(filter), Some(vec!["99".to_string()]));
}

#[test]
fn test_replace_filter_params_requires_a_filtered_reader() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = joined_with_topic(&runtime, TOPIC, QosPreset::LatestReliable);

    steward
        .create_subscriber(TOPIC, "R", "", &[])
        .expect("plain reader");
    let err = steward
        .replace_filter_params(TOPIC, "R", &["1".to_string()])
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn test_replace_filter_rebinds_and_restarts_worker() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = joined_with_topic(&runtime, TOPIC, QosPreset::LatestReliable);

    steward
        .create_subscriber(TOPIC, "R", "speed > 0", &[])
        .expect("filtered reader");

    let delivered = Arc::new(AtomicUsize::new(0));
    let delivered_clone = Arc::clone(&delivered);
    steward
        .add_callback(
            TOPIC,
            "R",
            Arc::new(move |_payload| {
                delivered_clone.fetch_add(1, Ordering::SeqCst);
            }),
            false,
            false,
        )
        .expect("callback bound, worker running");

    steward
        .replace_filter(TOPIC, "R", "speed > 50")
        .expect("replacement succeeds");

    // The worker survived the swap and drains the replacement reader.
    let new_reader = steward.reader(TOPIC, "R").expect("replacement reader");
    runtime.push_sample(new_reader, b"sample".to_vec());

    let deadline = Instant::now() + Duration::from_secs(2);
    while delivered.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(delivered.load(Ordering::SeqCst), 1);
}

#[test]
fn test_queued_callbacks_deliver_on_read() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = joined_with_topic(&runtime, TOPIC, QosPreset::LatestReliable);

    steward
        .create_subscriber(TOPIC, "R", "", &[])
        .expect("reader");
    let delivered = Arc::new(AtomicUsize::new(0));
    let delivered_clone = Arc::clone(&delivered);
    steward
        .add_callback(
            TOPIC,
            "R",
            Arc::new(move |_payload| {
                delivered_clone.fetch_add(1, Ordering::SeqCst);
            }),
            true,
            false,
        )
        .expect("queued callback bound");

    let reader = steward.reader(TOPIC, "R").expect("reader");
    runtime.push_sample(reader, b"a".to_vec());
    runtime.push_sample(reader, b"b".to_vec());

    // Nothing delivered until the caller drains.
    assert_eq!(delivered.load(Ordering::SeqCst), 0);
    steward.read_callbacks(TOPIC, "R").expect("drain");
    assert_eq!(delivered.load(Ordering::SeqCst), 2);
}

#[test]
fn test_reader_qos_propagates_to_every_reader() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = joined_with_topic(&runtime, TOPIC, QosPreset::LatestReliable);

    steward
        .create_subscriber(TOPIC, "R1", "", &[])
        .expect("first reader");
    steward
        .create_subscriber(TOPIC, "R2", "", &[])
        .expect("second reader");

    runtime.clear_call_log();
    steward.set_reader_qos(TOPIC, steward.reader_qos(TOPIC));

    let applied = runtime
        .call_log()
        .iter()
        .filter(|call| call.starts_with("set_reader_qos"))
        .count();
    assert_eq!(applied, 2, "both readers should receive the new QoS");
}

#[test]
fn test_set_max_receive_rate_validates_and_applies() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = joined_with_topic(&runtime, TOPIC, QosPreset::LatestReliable);
    steward
        .create_subscriber(TOPIC, "R", "", &[])
        .expect("reader");

    let err = steward
        .set_max_receive_rate(TOPIC, "R", Duration::ZERO)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    let err = steward
        .set_max_receive_rate(TOPIC, "ghost", Duration::from_millis(100))
        .unwrap_err();
    assert!(matches!(err, Error::UnknownReader { .. }));

    runtime.clear_call_log();
    steward
        .set_max_receive_rate(TOPIC, "R", Duration::from_millis(100))
        .expect("rate applied");
    assert_eq!(
        runtime
            .call_log()
            .iter()
            .filter(|c| c.starts_with("set_reader_qos"))
            .count(),
        1
    );

    // The stored base QoS is untouched: the limit was reader-local.
    assert!(steward.reader_qos(TOPIC).time_based_filter.is_disabled());
}

#[test]
fn test_partition_lands_in_stored_group_qos() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = joined_with_topic(&runtime, TOPIC, QosPreset::LatestReliable);

    steward
        .add_partition(TOPIC, "east-wing")
        .expect("partition added");

    assert_eq!(steward.publisher_qos(TOPIC).partitions, vec!["east-wing"]);
    assert_eq!(steward.subscriber_qos(TOPIC).partitions, vec!["east-wing"]);
}

#[test]
fn test_event_handlers_receive_entity_identity() {
    use dds_steward::listeners::{ReaderEventHandler, WriterEventHandler};
    use dds_steward::runtime::MatchedStatus;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }
    impl ReaderEventHandler for Recorder {
        fn on_subscription_matched(&self, topic: &str, reader: &str, status: MatchedStatus) {
            self.events
                .lock()
                .push(format!("sub:{}/{}:{}", topic, reader, status.current_count));
        }
    }
    impl WriterEventHandler for Recorder {
        fn on_publication_matched(&self, topic: &str, status: MatchedStatus) {
            self.events
                .lock()
                .push(format!("pub:{}:{}", topic, status.current_count));
        }
    }

    let runtime = Arc::new(MockRuntime::new());
    let steward = joined_with_topic(&runtime, TOPIC, QosPreset::LatestReliable);
    steward.create_publisher(TOPIC).expect("publisher");
    steward
        .create_subscriber(TOPIC, "R", "", &[])
        .expect("reader");

    // Handlers installed after the entities exist still see their events:
    // every listener forwards through the shared slot.
    let recorder = Arc::new(Recorder::default());
    steward.set_reader_event_handler(Some(Arc::clone(&recorder) as _));
    steward.set_writer_event_handler(Some(Arc::clone(&recorder) as _));

    let reader = steward.reader(TOPIC, "R").expect("reader");
    let writer = steward.writer(TOPIC).expect("writer");
    let status = MatchedStatus {
        total_count: 1,
        current_count: 1,
    };
    runtime.fire_subscription_matched(reader, status);
    runtime.fire_publication_matched(writer, status);

    let events = recorder.events.lock().clone();
    assert!(events.contains(&format!("sub:{}/R:1", TOPIC)));
    assert!(events.contains(&format!("pub:{}:1", TOPIC)));
}

#[test]
fn test_teardown_deletes_in_dependency_order() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = joined_with_topic(&runtime, TOPIC, QosPreset::LatestReliable);

    steward.create_publisher(TOPIC).expect("publisher");
    steward
        .create_subscriber(TOPIC, "R", "speed > 1", &[])
        .expect("filtered reader");

    runtime.clear_call_log();
    steward.unregister_topic(TOPIC).expect("teardown succeeds");

    let log = runtime.call_log();
    let reader = first_position(&log, "delete_reader(");
    let writer = first_position(&log, "delete_writer(");
    let publisher = first_position(&log, "delete_publisher(");
    let subscriber = first_position(&log, "delete_subscriber(");
    let filter = first_position(&log, "delete_filter_topic(");
    let topic = first_position(&log, "delete_topic(");

    assert!(reader < writer, "readers go before the writer: {:?}", log);
    assert!(writer < publisher, "writer before publisher: {:?}", log);
    assert!(
        publisher < subscriber,
        "publisher before subscriber: {:?}",
        log
    );
    assert!(
        subscriber < filter,
        "subscriber before filter topics: {:?}",
        log
    );
    assert!(filter < topic, "filter topics before the topic: {:?}", log);

    // Nothing owned by the group is left behind.
    let live = runtime.live_entities();
    assert_eq!(live.readers, 0);
    assert_eq!(live.writers, 0);
    assert_eq!(live.topics, 0);
    assert_eq!(live.filters, 0);
}

#[test]
fn test_unregister_unknown_topic_fails() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = steward(&runtime);
    steward.join_domain(0).expect("join");

    let err = steward.unregister_topic("never/registered").unwrap_err();
    assert!(matches!(err, Error::UnknownTopic(_)));
}

#[test]
fn test_cleanup_all_tears_down_every_topic() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = steward(&runtime);
    steward.join_domain(0).expect("join");

    for index in 0..4 {
        let topic = format!("fleet/{}", index);
        steward
            .register_topic(&topic, "FleetState", QosPreset::BestEffort)
            .expect("register");
        steward.create_publisher(&topic).expect("publisher");
        steward
            .create_subscriber(&topic, "R", "", &[])
            .expect("reader");
    }
    assert_eq!(steward.registry().len(), 4);

    steward.cleanup_all().expect("all teardowns succeed");

    assert!(steward.registry().is_empty());
    let live = runtime.live_entities();
    assert_eq!(live.topics, 0);
    assert_eq!(live.readers, 0);
    assert_eq!(live.writers, 0);
    assert_eq!(live.publishers, 0);
    assert_eq!(live.subscribers, 0);
    // The participant survives: only topics were cleaned up.
    assert_eq!(live.participants, 1);
}

#[test]
fn test_cleanup_all_reports_partial_failure_but_empties_registry() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = steward(&runtime);
    steward.join_domain(0).expect("join");

    for index in 0..3 {
        let topic = format!("fleet/{}", index);
        steward
            .register_topic(&topic, "FleetState", QosPreset::BestEffort)
            .expect("register");
    }

    runtime.fail_next("delete_topic", RetCode::PreconditionNotMet);
    let err = steward.cleanup_all().unwrap_err();
    assert!(matches!(err, Error::PartialTeardown(1)));

    // The registry is cleared regardless, as a safety net.
    assert!(steward.registry().is_empty());
}

#[test]
fn test_dropping_the_steward_releases_everything() {
    let runtime = Arc::new(MockRuntime::new());
    {
        let steward = joined_with_topic(&runtime, TOPIC, QosPreset::LatestReliable);
        steward.create_publisher(TOPIC).expect("publisher");
        steward
            .create_subscriber(TOPIC, "R", "speed > 1", &[])
            .expect("reader");
    }
    assert!(runtime.live_entities().is_empty());
}
