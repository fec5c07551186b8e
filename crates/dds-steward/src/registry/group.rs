// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Topic group: the resource bundle for one topic name.
//!
//! A group owns everything the runtime materialized for its topic: the topic
//! entity, at most one publisher/writer pair, at most one subscriber, the
//! named readers, the named content-filter variants and the delivery workers.
//! It is exposed as a single destructible unit; [`TopicGroup::teardown`]
//! enforces the externally mandated order
//!
//! ```text
//! stop workers -> readers -> writer -> publisher -> subscriber
//!              -> filter topics -> topic
//! ```
//!
//! because the runtime refuses to delete an entity that still has dependents.
//!
//! Group state lives under one mutex, so operations on a single topic are
//! serialized; this is what makes reader-name registration exclusive and the
//! filter-replacement protocol atomic with respect to other callers. Sample
//! callbacks must not call back into operations on their own topic.

use crate::emitter::{DeliveryWorker, SampleCallback, WorkerPool};
use crate::error::{Error, Result};
use crate::listeners::{
    GenericReaderListener, GenericWriterListener, ReaderHandlerSlot, WriterHandlerSlot,
};
use crate::logging::Sink;
use crate::qos::{
    dictionary, PublisherQos, QosPreset, ReaderQos, SubscriberQos, TimeBasedFilter, TopicQos,
    WriterQos,
};
use crate::runtime::{
    ParticipantHandle, ParticipantRuntime, ReaderHandle, ReaderSource, StatusMask, TopicHandle,
    WriterHandle,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Stored QoS values for every entity kind of one topic.
#[derive(Debug, Clone)]
pub struct GroupQos {
    pub topic: TopicQos,
    pub reader: ReaderQos,
    pub writer: WriterQos,
    pub publisher: PublisherQos,
    pub subscriber: SubscriberQos,
}

impl Default for GroupQos {
    /// Seed from the transient-reliable profile, matching what a topic gets
    /// when nobody registers a preset explicitly.
    fn default() -> Self {
        Self {
            topic: dictionary::topic(QosPreset::LatestReliableTransient),
            reader: dictionary::reader(QosPreset::LatestReliableTransient),
            writer: dictionary::writer(QosPreset::LatestReliableTransient),
            publisher: dictionary::publisher(QosPreset::LatestReliableTransient),
            subscriber: dictionary::subscriber(QosPreset::LatestReliableTransient),
        }
    }
}

struct GroupState {
    qos: GroupQos,
    qos_preset: Option<QosPreset>,
    participant: Option<ParticipantHandle>,
    topic: Option<TopicHandle>,
    publisher: Option<crate::runtime::PublisherHandle>,
    subscriber: Option<crate::runtime::SubscriberHandle>,
    writer: Option<WriterHandle>,
    readers: HashMap<String, ReaderHandle>,
    filtered_topics: HashMap<String, crate::runtime::FilterTopicHandle>,
    workers: HashMap<String, Arc<DeliveryWorker>>,
    torn_down: bool,
}

/// The resource bundle for one registered topic name.
pub struct TopicGroup {
    name: String,
    runtime: Arc<dyn ParticipantRuntime>,
    pool: Arc<WorkerPool>,
    sink: Sink,
    reader_handlers: ReaderHandlerSlot,
    writer_handlers: WriterHandlerSlot,
    state: Mutex<GroupState>,
}

impl TopicGroup {
    /// New group with no runtime entities yet.
    pub fn new(
        name: impl Into<String>,
        runtime: Arc<dyn ParticipantRuntime>,
        pool: Arc<WorkerPool>,
        sink: Sink,
        reader_handlers: ReaderHandlerSlot,
        writer_handlers: WriterHandlerSlot,
    ) -> Self {
        Self {
            name: name.into(),
            runtime,
            pool,
            sink,
            reader_handlers,
            writer_handlers,
            state: Mutex::new(GroupState {
                qos: GroupQos::default(),
                qos_preset: None,
                participant: None,
                topic: None,
                publisher: None,
                subscriber: None,
                writer: None,
                readers: HashMap::new(),
                filtered_topics: HashMap::new(),
                workers: HashMap::new(),
                torn_down: false,
            }),
        }
    }

    /// The topic name this group manages.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    // --- registration ----------------------------------------------------

    /// Create the topic entity if it does not exist yet.
    ///
    /// Succeeds trivially when the topic is already materialized.
    pub fn ensure_topic(
        &self,
        participant: ParticipantHandle,
        type_name: &str,
    ) -> Result<TopicHandle> {
        let mut state = self.state.lock();
        if let Some(topic) = state.topic {
            return Ok(topic);
        }
        match self
            .runtime
            .create_topic(participant, &self.name, type_name, &state.qos.topic)
        {
            Ok(topic) => {
                state.topic = Some(topic);
                state.participant = Some(participant);
                log::debug!("[TopicGroup] Created topic '{}'", self.name);
                Ok(topic)
            }
            Err(code) => {
                self.sink.error(&format!(
                    "Error creating new topic '{}': {}",
                    self.name,
                    code.name()
                ));
                Err(Error::Runtime {
                    op: "create_topic",
                    code,
                })
            }
        }
    }

    /// Apply a QoS preset to the topic/reader/writer values.
    ///
    /// First preset wins: once one is recorded, later calls succeed without
    /// reapplying anything.
    pub fn register_qos(&self, preset: QosPreset) -> Result<()> {
        let mut state = self.state.lock();
        if state.qos_preset.is_some() {
            return Ok(());
        }
        self.apply_topic_qos(&mut state, dictionary::topic(preset));
        self.apply_reader_qos(&mut state, dictionary::reader(preset));
        self.apply_writer_qos(&mut state, dictionary::writer(preset));
        state.qos_preset = Some(preset);
        Ok(())
    }

    /// The recorded preset, if any.
    #[must_use]
    pub fn qos_preset(&self) -> Option<QosPreset> {
        self.state.lock().qos_preset
    }

    /// Whether the topic entity has been materialized.
    #[must_use]
    pub fn has_topic(&self) -> bool {
        self.state.lock().topic.is_some()
    }

    // --- QoS storage and propagation -------------------------------------

    pub fn topic_qos(&self) -> TopicQos {
        self.state.lock().qos.topic.clone()
    }

    pub fn reader_qos(&self) -> ReaderQos {
        self.state.lock().qos.reader.clone()
    }

    pub fn writer_qos(&self) -> WriterQos {
        self.state.lock().qos.writer.clone()
    }

    pub fn publisher_qos(&self) -> PublisherQos {
        self.state.lock().qos.publisher.clone()
    }

    pub fn subscriber_qos(&self) -> SubscriberQos {
        self.state.lock().qos.subscriber.clone()
    }

    /// Store new topic QoS and re-apply it to the live topic entity.
    pub fn set_topic_qos(&self, qos: TopicQos) {
        let mut state = self.state.lock();
        self.apply_topic_qos(&mut state, qos);
    }

    /// Store new reader QoS and re-apply it to every registered reader.
    pub fn set_reader_qos(&self, qos: ReaderQos) {
        let mut state = self.state.lock();
        self.apply_reader_qos(&mut state, qos);
    }

    /// Store new writer QoS and re-apply it to the live writer.
    pub fn set_writer_qos(&self, qos: WriterQos) {
        let mut state = self.state.lock();
        self.apply_writer_qos(&mut state, qos);
    }

    /// Store new publisher QoS and re-apply it to the live publisher.
    pub fn set_publisher_qos(&self, qos: PublisherQos) {
        let mut state = self.state.lock();
        if let Some(publisher) = state.publisher {
            let code = self.runtime.set_publisher_qos(publisher, &qos);
            if !code.is_ok() {
                self.sink.warning(&format!(
                    "set_publisher_qos rejected for '{}': {}",
                    self.name,
                    code.name()
                ));
            }
        }
        state.qos.publisher = qos;
    }

    /// Store new subscriber QoS and re-apply it to the live subscriber.
    pub fn set_subscriber_qos(&self, qos: SubscriberQos) {
        let mut state = self.state.lock();
        if let Some(subscriber) = state.subscriber {
            let code = self.runtime.set_subscriber_qos(subscriber, &qos);
            if !code.is_ok() {
                self.sink.warning(&format!(
                    "set_subscriber_qos rejected for '{}': {}",
                    self.name,
                    code.name()
                ));
            }
        }
        state.qos.subscriber = qos;
    }

    /// Append a partition to the stored publisher and subscriber QoS.
    ///
    /// Call before creating either entity; existing entities keep the
    /// partitions they were created with.
    pub fn add_partition(&self, partition: &str) {
        let mut state = self.state.lock();
        state.qos.publisher.partitions.push(partition.to_string());
        state.qos.subscriber.partitions.push(partition.to_string());
    }

    fn apply_topic_qos(&self, state: &mut GroupState, qos: TopicQos) {
        if let Some(topic) = state.topic {
            let code = self.runtime.set_topic_qos(topic, &qos);
            if !code.is_ok() {
                self.sink.warning(&format!(
                    "set_topic_qos rejected for '{}': {}",
                    self.name,
                    code.name()
                ));
            }
        }
        state.qos.topic = qos;
    }

    fn apply_reader_qos(&self, state: &mut GroupState, qos: ReaderQos) {
        // A topic may have several named readers sharing one base reader
        // QoS: propagate to all of them.
        for (reader_name, reader) in &state.readers {
            let code = self.runtime.set_reader_qos(*reader, &qos);
            if !code.is_ok() {
                self.sink.warning(&format!(
                    "set_reader_qos rejected for '{}'/'{}': {}",
                    self.name,
                    reader_name,
                    code.name()
                ));
            }
        }
        state.qos.reader = qos;
    }

    fn apply_writer_qos(&self, state: &mut GroupState, qos: WriterQos) {
        if let Some(writer) = state.writer {
            let code = self.runtime.set_writer_qos(writer, &qos);
            if !code.is_ok() {
                self.sink.warning(&format!(
                    "set_writer_qos rejected for '{}': {}",
                    self.name,
                    code.name()
                ));
            }
        }
        state.qos.writer = qos;
    }

    // --- entity creation -------------------------------------------------

    /// Create the publisher/writer pair. Idempotent once both exist.
    ///
    /// A publisher without a writer is never exposed as success: if the
    /// writer fails, a publisher created on this call is rolled back.
    pub fn create_publisher(&self, participant: ParticipantHandle) -> Result<()> {
        let mut state = self.state.lock();
        let topic = self.require_topic(&state)?;
        state.participant = Some(participant);

        if state.publisher.is_some() && state.writer.is_some() {
            return Ok(());
        }

        let (publisher, created_now) = match state.publisher {
            Some(publisher) => (publisher, false),
            None => {
                let publisher = self
                    .runtime
                    .create_publisher(participant, &state.qos.publisher)
                    .map_err(|code| {
                        self.sink.error(&format!(
                            "Error creating publisher for '{}': {}",
                            self.name,
                            code.name()
                        ));
                        Error::Runtime {
                            op: "create_publisher",
                            code,
                        }
                    })?;
                (publisher, true)
            }
        };

        let listener = Arc::new(GenericWriterListener::new(
            self.name.clone(),
            Arc::clone(&self.writer_handlers),
        ));
        match self.runtime.create_writer(
            publisher,
            topic,
            &state.qos.writer,
            listener,
            StatusMask::writer_defaults(),
        ) {
            Ok(writer) => {
                state.publisher = Some(publisher);
                state.writer = Some(writer);
                Ok(())
            }
            Err(code) => {
                if created_now {
                    self.runtime.delete_publisher(participant, publisher);
                }
                self.sink.error(&format!(
                    "Error creating data writer for '{}': {}",
                    self.name,
                    code.name()
                ));
                Err(Error::Runtime {
                    op: "create_writer",
                    code,
                })
            }
        }
    }

    /// Create a named reader, optionally bound to a content filter.
    ///
    /// Reader names are exclusive per group; a name already present fails
    /// without touching the existing reader. Replacement is the distinct
    /// [`TopicGroup::replace_filter`] operation.
    pub fn create_subscriber(
        &self,
        participant: ParticipantHandle,
        reader_name: &str,
        filter: &str,
        filter_params: &[String],
    ) -> Result<()> {
        let mut state = self.state.lock();
        let topic = self.require_topic(&state)?;
        state.participant = Some(participant);

        if state.readers.contains_key(reader_name) {
            self.sink.error(&format!(
                "Reader '{}' already registered for topic '{}'",
                reader_name, self.name
            ));
            return Err(Error::DuplicateReader {
                topic: self.name.clone(),
                reader: reader_name.to_string(),
            });
        }

        let subscriber = match state.subscriber {
            Some(subscriber) => subscriber,
            None => {
                let subscriber = self
                    .runtime
                    .create_subscriber(participant, &state.qos.subscriber)
                    .map_err(|code| {
                        self.sink.error(&format!(
                            "Error creating subscriber for '{}': {}",
                            self.name,
                            code.name()
                        ));
                        Error::Runtime {
                            op: "create_subscriber",
                            code,
                        }
                    })?;
                state.subscriber = Some(subscriber);
                subscriber
            }
        };

        let (source, filter_entry) = if filter.is_empty() {
            (ReaderSource::Topic(topic), None)
        } else {
            let filter_name = format!("{}_{}_0", self.name, reader_name);
            let handle = self
                .runtime
                .create_filter_topic(participant, &filter_name, topic, filter, filter_params)
                .map_err(|code| {
                    self.sink.error(&format!(
                        "Error creating content filtered topic '{}' with the filter [{}]: {}",
                        self.name,
                        filter,
                        code.name()
                    ));
                    Error::Runtime {
                        op: "create_filter_topic",
                        code,
                    }
                })?;
            (ReaderSource::Filtered(handle), Some((filter_name, handle)))
        };

        let listener = Arc::new(GenericReaderListener::new(
            self.name.clone(),
            reader_name.to_string(),
            Arc::clone(&self.reader_handlers),
        ));
        match self.runtime.create_reader(
            subscriber,
            source,
            &state.qos.reader,
            listener,
            StatusMask::reader_defaults(),
        ) {
            Ok(reader) => {
                if let Some((filter_name, handle)) = filter_entry {
                    state.filtered_topics.insert(filter_name, handle);
                }
                state.readers.insert(reader_name.to_string(), reader);
                Ok(())
            }
            Err(code) => {
                // Unwind the filter topic so the name is free for a retry.
                if let Some((_, handle)) = filter_entry {
                    self.runtime.delete_filter_topic(participant, handle);
                }
                self.sink.error(&format!(
                    "Error creating data reader for '{}': {}",
                    self.name,
                    code.name()
                ));
                Err(Error::Runtime {
                    op: "create_reader",
                    code,
                })
            }
        }
    }

    // --- filter replacement ----------------------------------------------

    /// Swap the content filter on a live reader, preserving its name.
    ///
    /// The reader is torn down and rebuilt: a bound running delivery worker
    /// is stopped first, the old filter topic is deleted only after the
    /// reader that referenced it, and the replacement reader is stored under
    /// the same key. On a partial failure the group is left without a reader
    /// for this name and the caller must re-attempt creation.
    pub fn replace_filter(
        &self,
        participant: ParticipantHandle,
        reader_name: &str,
        filter: &str,
    ) -> Result<()> {
        let mut state = self.state.lock();
        let topic = self.require_topic(&state)?;
        let reader = *state.readers.get(reader_name).ok_or_else(|| {
            self.sink.error(&format!(
                "Error replacing topic filter for '{}': the data reader named '{}' does not exist",
                self.name, reader_name
            ));
            Error::UnknownReader {
                topic: self.name.clone(),
                reader: reader_name.to_string(),
            }
        })?;
        let subscriber = state.subscriber.ok_or_else(|| {
            self.sink.error(&format!(
                "Error replacing topic filter for '{}': the subscriber has not been created",
                self.name
            ));
            Error::UnknownReader {
                topic: self.name.clone(),
                reader: reader_name.to_string(),
            }
        })?;

        // Mutating entities under a running consumer is unsafe: stop the
        // worker before anything is torn down.
        let worker = state.workers.get(reader_name).cloned();
        if let Some(worker) = &worker {
            if worker.is_running() {
                log::debug!(
                    "[TopicGroup] Stopping delivery worker for '{}'/'{}'",
                    self.name,
                    reader_name
                );
                worker.stop();
            }
        }

        let old_filter = self.runtime.reader_filter_topic(reader);

        let code = self.runtime.delete_reader_conditions(reader);
        if !code.is_ok() {
            self.sink.error(&format!(
                "delete_reader_conditions failed for '{}'/'{}': {}",
                self.name,
                reader_name,
                code.name()
            ));
            return Err(Error::Runtime {
                op: "delete_reader_conditions",
                code,
            });
        }
        let code = self.runtime.delete_reader(subscriber, reader);
        if !code.is_ok() {
            self.sink.error(&format!(
                "delete_reader failed for '{}'/'{}': {}",
                self.name,
                reader_name,
                code.name()
            ));
            return Err(Error::Runtime {
                op: "delete_reader",
                code,
            });
        }
        // From here the old reader is gone; the map must not keep pointing
        // at it even if a later step fails.
        state.readers.remove(reader_name);

        // The filter topic can only go once the reader referencing it is
        // deleted. Remember its name: the next sequence number comes from it.
        let mut previous_name = None;
        if let Some(handle) = old_filter {
            let map_name = state
                .filtered_topics
                .iter()
                .find(|(_, &f)| f == handle)
                .map(|(name, _)| name.clone());
            if let Some(name) = map_name {
                let code = self.runtime.delete_filter_topic(participant, handle);
                if code.is_ok() {
                    state.filtered_topics.remove(&name);
                } else {
                    self.sink.error(&format!(
                        "delete_filter_topic failed for '{}': {}",
                        name,
                        code.name()
                    ));
                }
                previous_name = Some(name);
            }
        }

        let sequence = next_filter_sequence(previous_name.as_deref());

        let source = if filter.is_empty() {
            ReaderSource::Topic(topic)
        } else {
            let filter_name = format!("{}_{}_{}", self.name, reader_name, sequence);
            let handle = self
                .runtime
                .create_filter_topic(participant, &filter_name, topic, filter, &[])
                .map_err(|code| {
                    self.sink.error(&format!(
                        "Error updating content filtered topic '{}' with the filter [{}]: {}",
                        self.name,
                        filter,
                        code.name()
                    ));
                    Error::Runtime {
                        op: "create_filter_topic",
                        code,
                    }
                })?;
            state.filtered_topics.insert(filter_name, handle);
            ReaderSource::Filtered(handle)
        };

        let listener = Arc::new(GenericReaderListener::new(
            self.name.clone(),
            reader_name.to_string(),
            Arc::clone(&self.reader_handlers),
        ));
        let new_reader = self
            .runtime
            .create_reader(
                subscriber,
                source,
                &state.qos.reader,
                listener,
                StatusMask::reader_defaults(),
            )
            .map_err(|code| {
                self.sink.error(&format!(
                    "Error creating data reader for '{}': {}",
                    self.name,
                    code.name()
                ));
                Error::Runtime {
                    op: "create_reader",
                    code,
                }
            })?;

        // Same key: callers holding the name never see a different one.
        state.readers.insert(reader_name.to_string(), new_reader);

        if let Some(worker) = worker {
            worker.set_source(new_reader);
            worker.start();
        }

        Ok(())
    }

    /// Update the filter's parameter values without tearing the reader down.
    ///
    /// Only valid while the reader is bound to a content-filter topic.
    pub fn replace_filter_params(&self, reader_name: &str, params: &[String]) -> Result<()> {
        let state = self.state.lock();
        let reader = *state.readers.get(reader_name).ok_or_else(|| {
            self.sink.error(&format!(
                "Error replacing filter params for '{}': the data reader named '{}' does not exist",
                self.name, reader_name
            ));
            Error::UnknownReader {
                topic: self.name.clone(),
                reader: reader_name.to_string(),
            }
        })?;

        let Some(filter) = self.runtime.reader_filter_topic(reader) else {
            self.sink.error(&format!(
                "Reader '{}'/'{}' is not bound to a content filter",
                self.name, reader_name
            ));
            return Err(Error::InvalidArgument(format!(
                "reader '{}' has no content filter",
                reader_name
            )));
        };

        let code = self.runtime.set_filter_params(filter, params);
        if code.is_ok() {
            Ok(())
        } else {
            self.sink.error(&format!(
                "set_filter_params rejected for '{}'/'{}': {}",
                self.name,
                reader_name,
                code.name()
            ));
            Err(Error::Runtime {
                op: "set_filter_params",
                code,
            })
        }
    }

    /// Apply a minimum-separation filter to one named reader only.
    pub fn set_max_receive_rate(&self, reader_name: &str, interval: Duration) -> Result<()> {
        if interval.is_zero() {
            self.sink.error(&format!(
                "Invalid data receive interval for topic '{}' reader '{}'",
                self.name, reader_name
            ));
            return Err(Error::InvalidArgument(
                "receive interval must be at least 1ms".to_string(),
            ));
        }
        let state = self.state.lock();
        let reader = *state.readers.get(reader_name).ok_or_else(|| {
            self.sink.error(&format!(
                "Error setting the max receive rate for topic '{}': reader '{}' has not been created",
                self.name, reader_name
            ));
            Error::UnknownReader {
                topic: self.name.clone(),
                reader: reader_name.to_string(),
            }
        })?;

        // The stored base QoS stays untouched: the rate limit applies to
        // this reader alone.
        let mut qos = state.qos.reader.clone();
        qos.time_based_filter = TimeBasedFilter::new(interval);
        let code = self.runtime.set_reader_qos(reader, &qos);
        if code.is_ok() {
            Ok(())
        } else {
            self.sink.error(&format!(
                "set_reader_qos rejected for '{}'/'{}': {}",
                self.name,
                reader_name,
                code.name()
            ));
            Err(Error::Runtime {
                op: "set_reader_qos",
                code,
            })
        }
    }

    // --- delivery workers -------------------------------------------------

    /// Bind a sample callback to a reader through a delivery worker.
    ///
    /// The worker is created on first use and reused afterwards. In queued
    /// mode delivery happens on [`TopicGroup::read_callbacks`]; otherwise
    /// the worker starts draining immediately.
    pub fn add_callback(
        &self,
        reader_name: &str,
        callback: SampleCallback,
        queued: bool,
        asynchronous: bool,
    ) -> Result<()> {
        let mut state = self.state.lock();
        let reader = *state.readers.get(reader_name).ok_or_else(|| {
            self.sink.error(&format!(
                "No data reader '{}' available for '{}'",
                reader_name, self.name
            ));
            Error::UnknownReader {
                topic: self.name.clone(),
                reader: reader_name.to_string(),
            }
        })?;

        let worker = state
            .workers
            .entry(reader_name.to_string())
            .or_insert_with(|| {
                Arc::new(DeliveryWorker::new(
                    Arc::clone(&self.runtime),
                    Arc::clone(&self.pool),
                    reader,
                ))
            })
            .clone();
        worker.add_callback(callback);
        worker.set_async(asynchronous);
        if !queued {
            worker.start();
        }
        Ok(())
    }

    /// Drain a queued worker now.
    pub fn read_callbacks(&self, reader_name: &str) -> Result<()> {
        let worker = self
            .state
            .lock()
            .workers
            .get(reader_name)
            .cloned()
            .ok_or_else(|| Error::UnknownReader {
                topic: self.name.clone(),
                reader: reader_name.to_string(),
            })?;
        worker.poll();
        Ok(())
    }

    // --- lookups ----------------------------------------------------------

    /// Handle of a named reader.
    #[must_use]
    pub fn reader(&self, reader_name: &str) -> Option<ReaderHandle> {
        self.state.lock().readers.get(reader_name).copied()
    }

    /// Handle of the writer, if created.
    #[must_use]
    pub fn writer(&self) -> Option<WriterHandle> {
        self.state.lock().writer
    }

    /// Registered reader names, sorted.
    #[must_use]
    pub fn reader_names(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut names: Vec<String> = state.readers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Live filter-topic names, sorted.
    #[must_use]
    pub fn filter_topic_names(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut names: Vec<String> = state.filtered_topics.keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether a delivery worker exists for the reader.
    #[must_use]
    pub fn has_worker(&self, reader_name: &str) -> bool {
        self.state.lock().workers.contains_key(reader_name)
    }

    // --- teardown ---------------------------------------------------------

    /// Destroy every owned entity in the mandated order.
    ///
    /// Idempotent: the first call does the work, later calls return the
    /// cached success. Failures are logged and teardown continues; the
    /// first failure is reported at the end.
    pub fn teardown(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.torn_down {
            return Ok(());
        }
        state.torn_down = true;

        let mut first_error: Option<Error> = None;
        let mut note = |this: &Self, op: &'static str, what: &str, code: crate::runtime::RetCode| {
            if !code.is_ok() {
                this.sink
                    .error(&format!("Error in {} for {}: {}", op, what, code.name()));
                if first_error.is_none() {
                    first_error = Some(Error::Runtime { op, code });
                }
            }
        };

        for (_, worker) in state.workers.drain() {
            worker.stop();
        }

        let Some(participant) = state.participant else {
            // Nothing was ever materialized; only stored QoS to discard.
            return Ok(());
        };

        if let Some(subscriber) = state.subscriber {
            let readers: Vec<(String, ReaderHandle)> = state.readers.drain().collect();
            for (reader_name, reader) in readers {
                note(
                    self,
                    "delete_reader",
                    &format!("'{}'/'{}'", self.name, reader_name),
                    self.runtime.delete_reader(subscriber, reader),
                );
            }
        }

        if let (Some(publisher), Some(writer)) = (state.publisher, state.writer.take()) {
            note(
                self,
                "delete_writer",
                &format!("'{}'", self.name),
                self.runtime.delete_writer(publisher, writer),
            );
        }

        if let Some(publisher) = state.publisher.take() {
            note(
                self,
                "delete_publisher",
                &format!("'{}'", self.name),
                self.runtime.delete_publisher(participant, publisher),
            );
        }

        if let Some(subscriber) = state.subscriber.take() {
            note(
                self,
                "delete_subscriber",
                &format!("'{}'", self.name),
                self.runtime.delete_subscriber(participant, subscriber),
            );
        }

        let filters: Vec<(String, crate::runtime::FilterTopicHandle)> =
            state.filtered_topics.drain().collect();
        for (filter_name, filter) in filters {
            note(
                self,
                "delete_filter_topic",
                &format!("'{}'", filter_name),
                self.runtime.delete_filter_topic(participant, filter),
            );
        }

        if let Some(topic) = state.topic.take() {
            note(
                self,
                "delete_topic",
                &format!("'{}'", self.name),
                self.runtime.delete_topic(participant, topic),
            );
        }

        match first_error {
            None => Ok(()),
            Some(error) => Err(error),
        }
    }

    fn require_topic(&self, state: &GroupState) -> Result<TopicHandle> {
        state.topic.ok_or_else(|| {
            self.sink.error(&format!(
                "The topic '{}' has not been registered",
                self.name
            ));
            Error::UnknownTopic(self.name.clone())
        })
    }
}

impl Drop for TopicGroup {
    fn drop(&mut self) {
        // Covers groups that were never explicitly torn down.
        let _ = self.teardown();
    }
}

impl std::fmt::Debug for TopicGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TopicGroup")
            .field("name", &self.name)
            .field("preset", &state.qos_preset)
            .field("readers", &state.readers.len())
            .field("filters", &state.filtered_topics.len())
            .field("has_writer", &state.writer.is_some())
            .finish_non_exhaustive()
    }
}

/// Next filter-topic sequence number.
///
/// Parsed off the trailing `_<n>` of the previous filter-topic name; a
/// reader that never had a filter starts the replacement sequence at 1.
fn next_filter_sequence(previous_name: Option<&str>) -> u32 {
    let previous = previous_name
        .and_then(|name| name.rsplit('_').next())
        .and_then(|tail| tail.parse::<u32>().ok())
        .unwrap_or(0);
    previous + 1
}
