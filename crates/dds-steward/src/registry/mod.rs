// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Topic group registry: the concurrent table of per-topic resource bundles.
//!
//! The table maps topic name to [`TopicGroup`] and enforces at-most-one
//! group per name. Lookups and QoS reads take the shared side of the
//! reader/writer lock; insertion and erasure take the exclusive side.
//!
//! # Lock discipline
//!
//! The registry lock covers only the map. It is released before any call
//! into the Participant Runtime that might block (entity creation and
//! deletion can wait on in-flight traffic), because holding it across a
//! runtime call inverts lock order against the runtime's internal locks.
//! That is a hard invariant of this module, not an optimization. Multi-step
//! mutations are serialized by the per-group mutex instead.
//!
//! Teardown follows the same rule: `unregister_topic` erases the map entry
//! under the exclusive lock, releases it, and only then runs the group's
//! ordered teardown. `cleanup_all` snapshots the groups under the lock and
//! fans the teardowns out on the worker pool, one task per topic, so total
//! latency is bounded by the slowest topic rather than their sum.

mod group;

pub use group::{GroupQos, TopicGroup};

use crate::emitter::{SampleCallback, WorkerPool};
use crate::error::{Error, Result};
use crate::listeners::{
    ReaderEventHandler, ReaderHandlerSlot, WriterEventHandler, WriterHandlerSlot,
};
use crate::logging::Sink;
use crate::qos::{
    dictionary, PublisherQos, QosPreset, ReaderQos, SubscriberQos, TopicQos, WriterQos,
};
use crate::runtime::{ParticipantHandle, ParticipantRuntime, ReaderHandle, WriterHandle};
use crate::session::DomainSession;
use crossbeam::sync::WaitGroup;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Poll interval of the discovery-wait loops.
const MATCH_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Concurrent mapping from topic name to its resource bundle.
pub struct TopicRegistry {
    runtime: Arc<dyn ParticipantRuntime>,
    session: Arc<DomainSession>,
    pool: Arc<WorkerPool>,
    sink: Sink,
    reader_handlers: ReaderHandlerSlot,
    writer_handlers: WriterHandlerSlot,
    groups: RwLock<HashMap<String, Arc<TopicGroup>>>,
}

impl TopicRegistry {
    /// New empty registry.
    pub fn new(
        runtime: Arc<dyn ParticipantRuntime>,
        session: Arc<DomainSession>,
        pool: Arc<WorkerPool>,
        sink: Sink,
    ) -> Self {
        Self {
            runtime,
            session,
            pool,
            sink,
            reader_handlers: Arc::new(RwLock::new(None)),
            writer_handlers: Arc::new(RwLock::new(None)),
            groups: RwLock::new(HashMap::new()),
        }
    }

    // --- handler slots ----------------------------------------------------

    /// Install (or clear) the process-wide reader event handler.
    ///
    /// Every generic reader listener shares one slot, so the swap re-points
    /// existing listeners without touching any entity.
    pub fn set_reader_event_handler(&self, handler: Option<Arc<dyn ReaderEventHandler>>) {
        *self.reader_handlers.write() = handler;
    }

    /// Install (or clear) the process-wide writer event handler.
    pub fn set_writer_event_handler(&self, handler: Option<Arc<dyn WriterEventHandler>>) {
        *self.writer_handlers.write() = handler;
    }

    // --- registration -----------------------------------------------------

    /// Register a topic: materialize the topic entity under `type_name` and
    /// apply the preset.
    ///
    /// Succeeds trivially for a topic whose entity already exists.
    pub fn register_topic(&self, topic: &str, type_name: &str, preset: QosPreset) -> Result<()> {
        let participant = self.require_participant()?;
        let group = self.ensure_group(topic);
        group.ensure_topic(participant, type_name)?;
        group.register_qos(preset)
    }

    /// Apply a QoS preset to an existing topic. First preset wins.
    pub fn register_qos(&self, topic: &str, preset: QosPreset) -> Result<()> {
        let group = self.lookup(topic).ok_or_else(|| {
            self.sink.error(&format!(
                "Unable to register the QoS for '{}': the topic has not been created",
                topic
            ));
            Error::UnknownTopic(topic.to_string())
        })?;
        group.register_qos(preset)
    }

    /// Remove one topic and tear its entities down.
    ///
    /// The map entry is erased under the exclusive lock; the teardown runs
    /// after the lock is released so concurrent lookups never wait on
    /// entity deletion.
    pub fn unregister_topic(&self, topic: &str) -> Result<()> {
        let removed = self.groups.write().remove(topic);
        match removed {
            Some(group) => group.teardown(),
            None => {
                self.sink.error(&format!(
                    "Unable to unregister '{}': the topic has not been registered",
                    topic
                ));
                Err(Error::UnknownTopic(topic.to_string()))
            }
        }
    }

    /// Tear down every topic concurrently and clear the table.
    ///
    /// Succeeds only if every per-topic teardown succeeded. The map is
    /// cleared afterwards regardless, as a safety net.
    pub fn cleanup_all(&self) -> Result<()> {
        let snapshot: Vec<Arc<TopicGroup>> = self.groups.read().values().cloned().collect();

        let failures = Arc::new(AtomicUsize::new(0));
        let wait_group = WaitGroup::new();
        for group in snapshot {
            let failures = Arc::clone(&failures);
            let wait_group = wait_group.clone();
            self.pool.execute(move || {
                if group.teardown().is_err() {
                    failures.fetch_add(1, Ordering::SeqCst);
                }
                drop(wait_group);
            });
        }
        wait_group.wait();

        self.groups.write().clear();

        let failed = failures.load(Ordering::SeqCst);
        if failed == 0 {
            Ok(())
        } else {
            self.sink.error(&format!(
                "{} topic teardown(s) reported failure during cleanup",
                failed
            ));
            Err(Error::PartialTeardown(failed))
        }
    }

    /// Number of registered topics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    /// Whether no topic is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }

    /// Registered topic names, sorted.
    #[must_use]
    pub fn topic_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.read().keys().cloned().collect();
        names.sort();
        names
    }

    // --- entity creation --------------------------------------------------

    /// Create the publisher/writer pair for a topic. Idempotent.
    pub fn create_publisher(&self, topic: &str) -> Result<()> {
        let participant = self.require_participant()?;
        let group = self.require_registered(topic, "creating publisher")?;
        group.create_publisher(participant)
    }

    /// Create a named reader, optionally content-filtered.
    pub fn create_subscriber(
        &self,
        topic: &str,
        reader_name: &str,
        filter: &str,
        filter_params: &[String],
    ) -> Result<()> {
        if reader_name.is_empty() {
            self.sink.error(&format!(
                "Error creating subscriber for '{}': the reader name must not be empty",
                topic
            ));
            return Err(Error::EmptyReaderName(topic.to_string()));
        }
        let participant = self.require_participant()?;
        let group = self.require_registered(topic, "creating subscriber")?;
        group.create_subscriber(participant, reader_name, filter, filter_params)
    }

    /// Create both sides for a topic, failing on the first failure.
    pub fn create_publisher_subscriber(
        &self,
        topic: &str,
        reader_name: &str,
        filter: &str,
        filter_params: &[String],
    ) -> Result<()> {
        self.create_publisher(topic)?;
        self.create_subscriber(topic, reader_name, filter, filter_params)
    }

    // --- filter management ------------------------------------------------

    /// Replace the content filter on a live reader, keeping its name.
    pub fn replace_filter(&self, topic: &str, reader_name: &str, filter: &str) -> Result<()> {
        if reader_name.is_empty() {
            self.sink.error(&format!(
                "Error replacing topic filter for '{}': the reader name must not be empty",
                topic
            ));
            return Err(Error::EmptyReaderName(topic.to_string()));
        }
        let participant = self.require_participant()?;
        let group = self.require_registered(topic, "replacing filter")?;
        group.replace_filter(participant, reader_name, filter)
    }

    /// Swap only the filter's parameter values, without reader teardown.
    pub fn replace_filter_params(
        &self,
        topic: &str,
        reader_name: &str,
        params: &[String],
    ) -> Result<()> {
        if reader_name.is_empty() {
            self.sink.error(&format!(
                "Error replacing filter params for '{}': the reader name must not be empty",
                topic
            ));
            return Err(Error::EmptyReaderName(topic.to_string()));
        }
        let group = self.require_registered(topic, "replacing filter params")?;
        group.replace_filter_params(reader_name, params)
    }

    /// Cap the receive rate of one named reader via minimum separation.
    pub fn set_max_receive_rate(
        &self,
        topic: &str,
        reader_name: &str,
        interval: Duration,
    ) -> Result<()> {
        let group = self.require_registered(topic, "setting max receive rate")?;
        group.set_max_receive_rate(reader_name, interval)
    }

    // --- callbacks --------------------------------------------------------

    /// Bind a sample callback to a reader through its delivery worker.
    pub fn add_callback(
        &self,
        topic: &str,
        reader_name: &str,
        callback: SampleCallback,
        queued: bool,
        asynchronous: bool,
    ) -> Result<()> {
        let group = self.require_registered(topic, "adding callback")?;
        group.add_callback(reader_name, callback, queued, asynchronous)
    }

    /// Drain a queued delivery worker now.
    pub fn read_callbacks(&self, topic: &str, reader_name: &str) -> Result<()> {
        let group = self.require_registered(topic, "reading callbacks")?;
        group.read_callbacks(reader_name)
    }

    // --- QoS accessors ----------------------------------------------------

    /// Stored topic QoS, or the profile-table default for unknown topics.
    #[must_use]
    pub fn topic_qos(&self, topic: &str) -> TopicQos {
        self.lookup(topic)
            .map(|g| g.topic_qos())
            .unwrap_or_else(|| dictionary::topic(QosPreset::LatestReliableTransient))
    }

    /// Store topic QoS, lazily creating the group, and propagate.
    pub fn set_topic_qos(&self, topic: &str, qos: TopicQos) {
        self.ensure_group(topic).set_topic_qos(qos);
    }

    /// Stored reader QoS, or the profile-table default for unknown topics.
    #[must_use]
    pub fn reader_qos(&self, topic: &str) -> ReaderQos {
        self.lookup(topic)
            .map(|g| g.reader_qos())
            .unwrap_or_else(|| dictionary::reader(QosPreset::LatestReliableTransient))
    }

    /// Store reader QoS and propagate to every reader of the topic.
    pub fn set_reader_qos(&self, topic: &str, qos: ReaderQos) {
        self.ensure_group(topic).set_reader_qos(qos);
    }

    /// Stored writer QoS, or the profile-table default for unknown topics.
    #[must_use]
    pub fn writer_qos(&self, topic: &str) -> WriterQos {
        self.lookup(topic)
            .map(|g| g.writer_qos())
            .unwrap_or_else(|| dictionary::writer(QosPreset::LatestReliableTransient))
    }

    /// Store writer QoS and propagate to the live writer.
    pub fn set_writer_qos(&self, topic: &str, qos: WriterQos) {
        self.ensure_group(topic).set_writer_qos(qos);
    }

    /// Stored publisher QoS, or the default for unknown topics.
    #[must_use]
    pub fn publisher_qos(&self, topic: &str) -> PublisherQos {
        self.lookup(topic)
            .map(|g| g.publisher_qos())
            .unwrap_or_else(|| dictionary::publisher(QosPreset::LatestReliableTransient))
    }

    /// Store publisher QoS and propagate to the live publisher.
    pub fn set_publisher_qos(&self, topic: &str, qos: PublisherQos) {
        self.ensure_group(topic).set_publisher_qos(qos);
    }

    /// Stored subscriber QoS, or the default for unknown topics.
    #[must_use]
    pub fn subscriber_qos(&self, topic: &str) -> SubscriberQos {
        self.lookup(topic)
            .map(|g| g.subscriber_qos())
            .unwrap_or_else(|| dictionary::subscriber(QosPreset::LatestReliableTransient))
    }

    /// Store subscriber QoS and propagate to the live subscriber.
    pub fn set_subscriber_qos(&self, topic: &str, qos: SubscriberQos) {
        self.ensure_group(topic).set_subscriber_qos(qos);
    }

    /// Add a partition to a topic's stored publisher and subscriber QoS.
    pub fn add_partition(&self, topic: &str, partition: &str) -> Result<()> {
        let group = self.require_registered(topic, "adding partition")?;
        group.add_partition(partition);
        Ok(())
    }

    // --- lookups ----------------------------------------------------------

    /// The group for a topic, if registered.
    #[must_use]
    pub fn group(&self, topic: &str) -> Option<Arc<TopicGroup>> {
        self.lookup(topic)
    }

    /// Handle of a named reader.
    #[must_use]
    pub fn reader(&self, topic: &str, reader_name: &str) -> Option<ReaderHandle> {
        if reader_name.is_empty() {
            return None;
        }
        self.lookup(topic).and_then(|g| g.reader(reader_name))
    }

    /// Handle of a topic's writer.
    #[must_use]
    pub fn writer(&self, topic: &str) -> Option<WriterHandle> {
        self.lookup(topic).and_then(|g| g.writer())
    }

    /// Comma-joined locators of a topic's writer.
    pub fn writer_address(&self, topic: &str) -> Result<String> {
        let writer = self.writer(topic).ok_or_else(|| {
            self.sink
                .error(&format!("No writer found for '{}'", topic));
            Error::UnknownTopic(topic.to_string())
        })?;
        Ok(self.runtime.writer_locators(writer).join(","))
    }

    /// Comma-joined locators of a named reader.
    pub fn reader_address(&self, topic: &str, reader_name: &str) -> Result<String> {
        let reader = self.reader(topic, reader_name).ok_or_else(|| {
            self.sink.error(&format!(
                "No reader '{}' found for '{}'",
                reader_name, topic
            ));
            Error::UnknownReader {
                topic: topic.to_string(),
                reader: reader_name.to_string(),
            }
        })?;
        Ok(self.runtime.reader_locators(reader).join(","))
    }

    // --- discovery waits --------------------------------------------------

    /// Poll until the topic's writer sees `min_count` matched subscribers or
    /// the deadline passes. Returns the best count observed; never errors.
    pub fn wait_for_subscribers(&self, topic: &str, min_count: u32, max_wait: Duration) -> u32 {
        let Some(writer) = self.writer(topic) else {
            self.sink
                .error(&format!("No writer found for '{}'", topic));
            return 0;
        };
        self.sink.info(&format!(
            "Waiting a max of {} ms for {} subscriber(s) of topic '{}'",
            max_wait.as_millis(),
            min_count,
            topic
        ));

        let start = Instant::now();
        loop {
            let status = self.runtime.publication_matched(writer);
            if status.current_count >= min_count {
                return status.current_count;
            }
            if start.elapsed() >= max_wait {
                self.sink.info(&format!(
                    "Found only {} subscriber(s) of topic '{}' before the deadline",
                    status.current_count, topic
                ));
                return status.current_count;
            }
            std::thread::sleep(MATCH_POLL_INTERVAL);
        }
    }

    /// Poll until a named reader sees `min_count` matched publishers or the
    /// deadline passes. Returns the best count observed; never errors.
    pub fn wait_for_publishers(
        &self,
        topic: &str,
        reader_name: &str,
        min_count: u32,
        max_wait: Duration,
    ) -> u32 {
        let Some(reader) = self.reader(topic, reader_name) else {
            self.sink.error(&format!(
                "No reader '{}' found for '{}'",
                reader_name, topic
            ));
            return 0;
        };
        self.sink.info(&format!(
            "Waiting a max of {} ms for {} publisher(s) of topic '{}'",
            max_wait.as_millis(),
            min_count,
            topic
        ));

        let start = Instant::now();
        loop {
            let status = self.runtime.subscription_matched(reader);
            if status.current_count >= min_count {
                return status.current_count;
            }
            if start.elapsed() >= max_wait {
                self.sink.info(&format!(
                    "Found only {} publisher(s) of topic '{}' before the deadline",
                    status.current_count, topic
                ));
                return status.current_count;
            }
            std::thread::sleep(MATCH_POLL_INTERVAL);
        }
    }

    // --- internals --------------------------------------------------------

    fn lookup(&self, topic: &str) -> Option<Arc<TopicGroup>> {
        self.groups.read().get(topic).cloned()
    }

    /// Get or lazily create the group for a topic.
    fn ensure_group(&self, topic: &str) -> Arc<TopicGroup> {
        if let Some(group) = self.lookup(topic) {
            return group;
        }
        let mut groups = self.groups.write();
        Arc::clone(groups.entry(topic.to_string()).or_insert_with(|| {
            Arc::new(TopicGroup::new(
                topic,
                Arc::clone(&self.runtime),
                Arc::clone(&self.pool),
                self.sink.clone(),
                Arc::clone(&self.reader_handlers),
                Arc::clone(&self.writer_handlers),
            ))
        }))
    }

    fn require_registered(&self, topic: &str, action: &str) -> Result<Arc<TopicGroup>> {
        self.lookup(topic).ok_or_else(|| {
            self.sink.error(&format!(
                "Error {} for '{}': the topic has not been registered",
                action, topic
            ));
            Error::UnknownTopic(topic.to_string())
        })
    }

    fn require_participant(&self) -> Result<ParticipantHandle> {
        self.session.participant().ok_or_else(|| {
            self.sink
                .error("No domain has been joined; call join_domain first");
            Error::NotJoined
        })
    }
}

impl std::fmt::Debug for TopicRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicRegistry")
            .field("topics", &self.len())
            .finish_non_exhaustive()
    }
}
