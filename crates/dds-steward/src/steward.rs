// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The steward facade: one object tying session, registry and workers
//! together.
//!
//! The order of operations mirrors how applications actually use a data
//! space:
//!
//! 1. join the domain with [`Steward::join_domain`];
//! 2. register topics with [`Steward::register_topic`] (or a raw QoS setter
//!    followed by [`Steward::register_qos`]);
//! 3. create publishers and subscribers;
//! 4. optionally bind callbacks, filters and rate limits;
//! 5. enable the domain with [`Steward::enable_domain`];
//! 6. tear down single topics or everything at once.
//!
//! Dropping the steward cleans up every topic, then the participant.

use crate::config::Config;
use crate::emitter::{SampleCallback, WorkerPool};
use crate::error::Result;
use crate::listeners::{ReaderEventHandler, WriterEventHandler};
use crate::logging::{MessageHandler, Sink};
use crate::qos::{PublisherQos, QosPreset, ReaderQos, SubscriberQos, TopicQos, WriterQos};
use crate::registry::TopicRegistry;
use crate::runtime::{
    DomainId, ParticipantCallback, ParticipantRuntime, ReaderHandle, WriterHandle,
};
use crate::session::{DomainSession, SecurityArtifacts};
use crate::transport::TransportAllocator;
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

/// Default size of the shared worker pool.
pub const DEFAULT_WORKER_THREADS: usize = 5;

/// Builder for [`Steward`].
pub struct StewardBuilder {
    runtime: Arc<dyn ParticipantRuntime>,
    handler: Option<MessageHandler>,
    allocator: Option<Arc<TransportAllocator>>,
    worker_threads: usize,
    config: Option<Config>,
}

impl StewardBuilder {
    /// Override the diagnostics handler (default: stdout/stderr).
    #[must_use]
    pub fn message_handler(mut self, handler: MessageHandler) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Share a transport allocator between stewards.
    ///
    /// Stewards in one process must share an allocator when they may join
    /// the same domain; separate allocators are for isolated tests.
    #[must_use]
    pub fn allocator(mut self, allocator: Arc<TransportAllocator>) -> Self {
        self.allocator = Some(allocator);
        self
    }

    /// Size of the worker pool used for callbacks and bulk teardown.
    #[must_use]
    pub fn worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    /// Inject an already-loaded transport configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Assemble the steward.
    #[must_use]
    pub fn build(self) -> Steward {
        let sink = match self.handler {
            Some(handler) => Sink::new(handler),
            None => Sink::stdio(),
        };
        let allocator = self
            .allocator
            .unwrap_or_else(|| Arc::new(TransportAllocator::new()));
        let pool = Arc::new(WorkerPool::new(self.worker_threads));
        let session = Arc::new(DomainSession::new(
            Arc::clone(&self.runtime),
            allocator,
            sink.clone(),
        ));
        if let Some(config) = self.config {
            session.preload_config(config);
        }
        let registry = TopicRegistry::new(
            Arc::clone(&self.runtime),
            Arc::clone(&session),
            Arc::clone(&pool),
            sink.clone(),
        );
        Steward {
            sink,
            session,
            registry,
        }
    }
}

/// Lifecycle manager over one Participant Runtime connection.
pub struct Steward {
    sink: Sink,
    session: Arc<DomainSession>,
    registry: TopicRegistry,
}

impl Steward {
    /// Start building a steward over the given runtime.
    #[must_use]
    pub fn builder(runtime: Arc<dyn ParticipantRuntime>) -> StewardBuilder {
        StewardBuilder {
            runtime,
            handler: None,
            allocator: None,
            worker_threads: DEFAULT_WORKER_THREADS,
            config: None,
        }
    }

    // --- domain lifecycle -------------------------------------------------

    /// Join a domain, logging peer joins and leaves.
    ///
    /// Equivalent to [`Steward::join_domain_with`] with callbacks that
    /// report each discovered or departed participant through the message
    /// handler.
    pub fn join_domain(&self, domain: DomainId) -> Result<()> {
        let joined_sink = self.sink.clone();
        let left_sink = self.sink.clone();
        let on_add: ParticipantCallback = Arc::new(move |info| {
            joined_sink.info(&format!(
                "New participant joined domain {}. Address: {} guid: {} at {}s",
                domain,
                info.ip_address,
                info.guid,
                info.discovered_at
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0)
            ));
        });
        let on_remove: ParticipantCallback = Arc::new(move |info| {
            left_sink.info(&format!(
                "Participant left domain {}. Address: {} guid: {}",
                domain, info.ip_address, info.guid
            ));
        });
        self.session
            .join(domain, None, Some(on_add), Some(on_remove))
    }

    /// Join a domain with an optional named transport section and optional
    /// discovery callbacks.
    pub fn join_domain_with(
        &self,
        domain: DomainId,
        section: Option<&str>,
        on_add: Option<ParticipantCallback>,
        on_remove: Option<ParticipantCallback>,
    ) -> Result<()> {
        self.session.join(domain, section, on_add, on_remove)
    }

    /// Enable the participant after entity setup.
    pub fn enable_domain(&self) -> Result<()> {
        self.session.enable()
    }

    /// Enable security for subsequent joins.
    pub fn enable_security(
        &self,
        identity_ca: &str,
        permissions_ca: &str,
        identity_cert: &str,
        identity_key: &str,
        governance: &str,
        permissions: &str,
    ) {
        self.session.enable_security(SecurityArtifacts::from_files(
            identity_ca,
            permissions_ca,
            identity_cert,
            identity_key,
            governance,
            permissions,
        ));
    }

    /// The domain id this steward is bound to, once joined.
    #[must_use]
    pub fn domain_id(&self) -> Option<DomainId> {
        self.session.domain_id()
    }

    /// The domain session (join state, participant handle).
    #[must_use]
    pub fn session(&self) -> &Arc<DomainSession> {
        &self.session
    }

    /// The topic registry, for operations not re-exported here.
    #[must_use]
    pub fn registry(&self) -> &TopicRegistry {
        &self.registry
    }

    // --- topics -----------------------------------------------------------

    /// Register a topic under a type name and QoS preset.
    pub fn register_topic(&self, topic: &str, type_name: &str, preset: QosPreset) -> Result<()> {
        self.registry.register_topic(topic, type_name, preset)
    }

    /// Apply a QoS preset to an existing topic. First preset wins.
    pub fn register_qos(&self, topic: &str, preset: QosPreset) -> Result<()> {
        self.registry.register_qos(topic, preset)
    }

    /// Unregister one topic, tearing its entities down in order.
    pub fn unregister_topic(&self, topic: &str) -> Result<()> {
        self.registry.unregister_topic(topic)
    }

    /// Tear down all topics concurrently.
    pub fn cleanup_all(&self) -> Result<()> {
        self.registry.cleanup_all()
    }

    // --- entities ---------------------------------------------------------

    /// Create the publisher/writer pair for a topic.
    pub fn create_publisher(&self, topic: &str) -> Result<()> {
        self.registry.create_publisher(topic)
    }

    /// Create a named reader, optionally content-filtered.
    pub fn create_subscriber(
        &self,
        topic: &str,
        reader_name: &str,
        filter: &str,
        filter_params: &[String],
    ) -> Result<()> {
        self.registry
            .create_subscriber(topic, reader_name, filter, filter_params)
    }

    /// Create both sides for a topic.
    pub fn create_publisher_subscriber(
        &self,
        topic: &str,
        reader_name: &str,
        filter: &str,
        filter_params: &[String],
    ) -> Result<()> {
        self.registry
            .create_publisher_subscriber(topic, reader_name, filter, filter_params)
    }

    // --- filters and delivery ---------------------------------------------

    /// Replace a reader's content filter, preserving its name.
    pub fn replace_filter(&self, topic: &str, reader_name: &str, filter: &str) -> Result<()> {
        self.registry.replace_filter(topic, reader_name, filter)
    }

    /// Swap only the filter's parameter values.
    pub fn replace_filter_params(
        &self,
        topic: &str,
        reader_name: &str,
        params: &[String],
    ) -> Result<()> {
        self.registry.replace_filter_params(topic, reader_name, params)
    }

    /// Cap a reader's receive rate via minimum sample separation.
    pub fn set_max_receive_rate(
        &self,
        topic: &str,
        reader_name: &str,
        interval: Duration,
    ) -> Result<()> {
        self.registry
            .set_max_receive_rate(topic, reader_name, interval)
    }

    /// Bind a sample callback to a reader.
    pub fn add_callback(
        &self,
        topic: &str,
        reader_name: &str,
        callback: SampleCallback,
        queued: bool,
        asynchronous: bool,
    ) -> Result<()> {
        self.registry
            .add_callback(topic, reader_name, callback, queued, asynchronous)
    }

    /// Drain a queued delivery worker now.
    pub fn read_callbacks(&self, topic: &str, reader_name: &str) -> Result<()> {
        self.registry.read_callbacks(topic, reader_name)
    }

    // --- status handlers --------------------------------------------------

    /// Install (or clear) the process-wide reader event handler.
    pub fn set_reader_event_handler(&self, handler: Option<Arc<dyn ReaderEventHandler>>) {
        self.registry.set_reader_event_handler(handler);
    }

    /// Install (or clear) the process-wide writer event handler.
    pub fn set_writer_event_handler(&self, handler: Option<Arc<dyn WriterEventHandler>>) {
        self.registry.set_writer_event_handler(handler);
    }

    // --- QoS --------------------------------------------------------------

    pub fn topic_qos(&self, topic: &str) -> TopicQos {
        self.registry.topic_qos(topic)
    }

    pub fn set_topic_qos(&self, topic: &str, qos: TopicQos) {
        self.registry.set_topic_qos(topic, qos);
    }

    pub fn reader_qos(&self, topic: &str) -> ReaderQos {
        self.registry.reader_qos(topic)
    }

    pub fn set_reader_qos(&self, topic: &str, qos: ReaderQos) {
        self.registry.set_reader_qos(topic, qos);
    }

    pub fn writer_qos(&self, topic: &str) -> WriterQos {
        self.registry.writer_qos(topic)
    }

    pub fn set_writer_qos(&self, topic: &str, qos: WriterQos) {
        self.registry.set_writer_qos(topic, qos);
    }

    pub fn publisher_qos(&self, topic: &str) -> PublisherQos {
        self.registry.publisher_qos(topic)
    }

    pub fn set_publisher_qos(&self, topic: &str, qos: PublisherQos) {
        self.registry.set_publisher_qos(topic, qos);
    }

    pub fn subscriber_qos(&self, topic: &str) -> SubscriberQos {
        self.registry.subscriber_qos(topic)
    }

    pub fn set_subscriber_qos(&self, topic: &str, qos: SubscriberQos) {
        self.registry.set_subscriber_qos(topic, qos);
    }

    /// Add a partition to a topic's publisher and subscriber QoS.
    pub fn add_partition(&self, topic: &str, partition: &str) -> Result<()> {
        self.registry.add_partition(topic, partition)
    }

    // --- lookups and discovery --------------------------------------------

    /// Handle of a named reader.
    #[must_use]
    pub fn reader(&self, topic: &str, reader_name: &str) -> Option<ReaderHandle> {
        self.registry.reader(topic, reader_name)
    }

    /// Handle of a topic's writer.
    #[must_use]
    pub fn writer(&self, topic: &str) -> Option<WriterHandle> {
        self.registry.writer(topic)
    }

    /// Comma-joined locators of a topic's writer.
    pub fn writer_address(&self, topic: &str) -> Result<String> {
        self.registry.writer_address(topic)
    }

    /// Comma-joined locators of a named reader.
    pub fn reader_address(&self, topic: &str, reader_name: &str) -> Result<String> {
        self.registry.reader_address(topic, reader_name)
    }

    /// Wait for matched subscribers on a topic's writer.
    pub fn wait_for_subscribers(&self, topic: &str, min_count: u32, max_wait: Duration) -> u32 {
        self.registry.wait_for_subscribers(topic, min_count, max_wait)
    }

    /// Wait for matched publishers on a named reader.
    pub fn wait_for_publishers(
        &self,
        topic: &str,
        reader_name: &str,
        min_count: u32,
        max_wait: Duration,
    ) -> u32 {
        self.registry
            .wait_for_publishers(topic, reader_name, min_count, max_wait)
    }
}

impl Drop for Steward {
    fn drop(&mut self) {
        if self.registry.cleanup_all().is_err() {
            self.sink
                .warning("Cleanup reported failures while dropping the steward");
        }
        self.session.shutdown();
        self.sink.info("Steward deleted");
    }
}

impl std::fmt::Debug for Steward {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Steward")
            .field("domain", &self.session.domain_id())
            .field("topics", &self.registry.len())
            .finish_non_exhaustive()
    }
}
