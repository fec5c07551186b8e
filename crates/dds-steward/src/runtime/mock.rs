// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Instrumented in-memory Participant Runtime.
//!
//! Backs the test suites and lets embedders exercise the lifecycle layer
//! without a wire transport. Behaviors that matter to the steward are
//! faithful:
//!
//! - deletion is refused with `PreconditionNotMet` while dependents exist
//!   (readers/writers under a topic, readers under a filter topic or
//!   subscriber, writers under a publisher);
//! - deleting an entity that is already gone is a tolerated no-op;
//! - every mutating call is appended to a call log for ordering assertions;
//! - failures can be injected per operation name;
//! - matched-status counters can be scheduled per poll to drive the
//!   discovery-wait paths.

use super::{
    DomainId, FilterTopicHandle, MatchedStatus, ParticipantCallback, ParticipantHandle,
    ParticipantInfo, ParticipantRuntime, Property, PublisherHandle, ReaderHandle, ReaderSource,
    ReaderStatusListener, RetCode, Sample, StatusMask, SubscriberHandle, TopicHandle,
    WriterHandle, WriterStatusListener,
};
use crate::qos::{PublisherQos, ReaderQos, SubscriberQos, TopicQos, WriterQos};
use crate::transport::TransportConfig;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

struct TopicRec {
    participant: u64,
    name: String,
}

struct FilterRec {
    participant: u64,
    base: u64,
    name: String,
    expression: String,
    params: Vec<String>,
}

struct WriterRec {
    publisher: u64,
    topic: u64,
    listener: Arc<dyn WriterStatusListener>,
}

struct ReaderRec {
    subscriber: Option<u64>,
    source: ReaderSource,
    listener: Option<Arc<dyn ReaderStatusListener>>,
    queue: VecDeque<Sample>,
}

struct Monitor {
    on_add: Option<ParticipantCallback>,
    on_remove: Option<ParticipantCallback>,
}

/// Per-entity schedule of matched counts, one entry consumed per poll; the
/// last entry repeats forever.
#[derive(Default)]
struct MatchSchedule {
    pending: VecDeque<u32>,
    current: u32,
}

impl MatchSchedule {
    fn poll(&mut self) -> u32 {
        if let Some(next) = self.pending.pop_front() {
            self.current = next;
        }
        self.current
    }
}

#[derive(Default)]
struct MockState {
    next_id: u64,
    participants: HashMap<u64, DomainId>,
    topics: HashMap<u64, TopicRec>,
    filters: HashMap<u64, FilterRec>,
    publishers: HashMap<u64, u64>,
    subscribers: HashMap<u64, u64>,
    writers: HashMap<u64, WriterRec>,
    readers: HashMap<u64, ReaderRec>,
    monitors: HashMap<u64, Monitor>,
    transport_configs: HashMap<String, TransportConfig>,
    calls: Vec<String>,
    failures: HashMap<&'static str, VecDeque<RetCode>>,
    sub_matches: HashMap<u64, MatchSchedule>,
    pub_matches: HashMap<u64, MatchSchedule>,
    reader_locators: HashMap<u64, Vec<String>>,
    writer_locators: HashMap<u64, Vec<String>>,
    participant_limit: Option<usize>,
    participants_created: usize,
    security_supported: bool,
}

impl MockState {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn injected(&mut self, op: &'static str) -> Option<RetCode> {
        let queue = self.failures.get_mut(op)?;
        let code = queue.pop_front();
        if queue.is_empty() {
            self.failures.remove(op);
        }
        code
    }

    fn record(&mut self, call: String) {
        log::debug!("[MockRuntime] {}", call);
        self.calls.push(call);
    }
}

/// Live-entity counters, handy for leak assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntityCounts {
    pub participants: usize,
    pub topics: usize,
    pub filters: usize,
    pub publishers: usize,
    pub subscribers: usize,
    pub readers: usize,
    pub writers: usize,
}

impl EntityCounts {
    /// Whether nothing is left alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == EntityCounts::default()
    }
}

/// In-memory [`ParticipantRuntime`] with call-order instrumentation.
pub struct MockRuntime {
    state: Mutex<MockState>,
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRuntime {
    /// New empty runtime with security support enabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                security_supported: true,
                ..MockState::default()
            }),
        }
    }

    // --- test instrumentation -------------------------------------------

    /// Snapshot of the recorded call log.
    #[must_use]
    pub fn call_log(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    /// Forget all recorded calls.
    pub fn clear_call_log(&self) {
        self.state.lock().calls.clear();
    }

    /// Inject a failure for the next invocation of `op`.
    ///
    /// Repeated calls queue up: one injected code per invocation.
    pub fn fail_next(&self, op: &'static str, code: RetCode) {
        self.state
            .lock()
            .failures
            .entry(op)
            .or_default()
            .push_back(code);
    }

    /// Schedule subscription-matched counts for a reader, one per poll.
    pub fn schedule_subscription_matches(&self, reader: ReaderHandle, counts: &[u32]) {
        let mut state = self.state.lock();
        let schedule = state.sub_matches.entry(reader.0).or_default();
        schedule.pending.extend(counts.iter().copied());
    }

    /// Schedule publication-matched counts for a writer, one per poll.
    pub fn schedule_publication_matches(&self, writer: WriterHandle, counts: &[u32]) {
        let mut state = self.state.lock();
        let schedule = state.pub_matches.entry(writer.0).or_default();
        schedule.pending.extend(counts.iter().copied());
    }

    /// Override the locators reported for a reader.
    pub fn set_reader_locators(&self, reader: ReaderHandle, locators: Vec<String>) {
        self.state.lock().reader_locators.insert(reader.0, locators);
    }

    /// Override the locators reported for a writer.
    pub fn set_writer_locators(&self, writer: WriterHandle, locators: Vec<String>) {
        self.state.lock().writer_locators.insert(writer.0, locators);
    }

    /// Cap the number of participants the factory will create.
    pub fn set_participant_limit(&self, limit: usize) {
        self.state.lock().participant_limit = Some(limit);
    }

    /// Toggle the security-support answer.
    pub fn set_security_supported(&self, supported: bool) {
        self.state.lock().security_supported = supported;
    }

    /// Queue a sample on a reader for the delivery paths.
    pub fn push_sample(&self, reader: ReaderHandle, payload: Sample) {
        if let Some(rec) = self.state.lock().readers.get_mut(&reader.0) {
            rec.queue.push_back(payload);
        }
    }

    /// Create a bare reader with no subscriber, for worker-level tests.
    #[must_use]
    pub fn raw_reader(&self) -> ReaderHandle {
        let mut state = self.state.lock();
        let id = state.allocate();
        state.readers.insert(
            id,
            ReaderRec {
                subscriber: None,
                source: ReaderSource::Topic(TopicHandle(0)),
                listener: None,
                queue: VecDeque::new(),
            },
        );
        ReaderHandle(id)
    }

    /// Live-entity counters.
    #[must_use]
    pub fn live_entities(&self) -> EntityCounts {
        let state = self.state.lock();
        EntityCounts {
            participants: state.participants.len(),
            topics: state.topics.len(),
            filters: state.filters.len(),
            publishers: state.publishers.len(),
            subscribers: state.subscribers.len(),
            readers: state.readers.len(),
            writers: state.writers.len(),
        }
    }

    /// A transport configuration previously installed under `name`.
    #[must_use]
    pub fn transport_config(&self, name: &str) -> Option<TransportConfig> {
        self.state.lock().transport_configs.get(name).cloned()
    }

    /// Names of the filter topics currently alive.
    #[must_use]
    pub fn filter_names(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut names: Vec<String> = state.filters.values().map(|f| f.name.clone()).collect();
        names.sort();
        names
    }

    /// Expression of a live filter topic.
    #[must_use]
    pub fn filter_expression(&self, filter: FilterTopicHandle) -> Option<String> {
        self.state
            .lock()
            .filters
            .get(&filter.0)
            .map(|f| f.expression.clone())
    }

    /// Parameters of a live filter topic.
    #[must_use]
    pub fn filter_params(&self, filter: FilterTopicHandle) -> Option<Vec<String>> {
        self.state
            .lock()
            .filters
            .get(&filter.0)
            .map(|f| f.params.clone())
    }

    /// Fire a subscription-matched event at a reader's listener.
    pub fn fire_subscription_matched(&self, reader: ReaderHandle, status: MatchedStatus) {
        let listener = self
            .state
            .lock()
            .readers
            .get(&reader.0)
            .and_then(|r| r.listener.clone());
        if let Some(listener) = listener {
            listener.on_subscription_matched(status);
        }
    }

    /// Fire a publication-matched event at a writer's listener.
    pub fn fire_publication_matched(&self, writer: WriterHandle, status: MatchedStatus) {
        let listener = self
            .state
            .lock()
            .writers
            .get(&writer.0)
            .map(|w| Arc::clone(&w.listener));
        if let Some(listener) = listener {
            listener.on_publication_matched(status);
        }
    }

    /// Announce a peer participant to every monitor on the domain.
    pub fn announce_participant(&self, info: &ParticipantInfo) {
        let callbacks: Vec<ParticipantCallback> = {
            let state = self.state.lock();
            state
                .monitors
                .values()
                .filter_map(|m| m.on_add.clone())
                .collect()
        };
        for callback in callbacks {
            callback(info);
        }
    }

    /// Report a peer participant leaving to every monitor on the domain.
    pub fn depart_participant(&self, info: &ParticipantInfo) {
        let callbacks: Vec<ParticipantCallback> = {
            let state = self.state.lock();
            state
                .monitors
                .values()
                .filter_map(|m| m.on_remove.clone())
                .collect()
        };
        for callback in callbacks {
            callback(info);
        }
    }
}

impl ParticipantRuntime for MockRuntime {
    fn create_participant(
        &self,
        domain: DomainId,
        _properties: &[Property],
    ) -> Result<ParticipantHandle, RetCode> {
        let mut state = self.state.lock();
        if let Some(code) = state.injected("create_participant") {
            return Err(code);
        }
        if let Some(limit) = state.participant_limit {
            if state.participants_created >= limit {
                return Err(RetCode::OutOfResources);
            }
        }
        let id = state.allocate();
        state.participants.insert(id, domain);
        state.participants_created += 1;
        state.record(format!("create_participant({})", id));
        Ok(ParticipantHandle(id))
    }

    fn delete_participant(&self, participant: ParticipantHandle) -> RetCode {
        let mut state = self.state.lock();
        if let Some(code) = state.injected("delete_participant") {
            return code;
        }
        if !state.participants.contains_key(&participant.0) {
            return RetCode::Ok; // tolerated double delete
        }
        let p = participant.0;
        let contained = state.topics.values().any(|t| t.participant == p)
            || state.filters.values().any(|f| f.participant == p)
            || state.publishers.values().any(|&owner| owner == p)
            || state.subscribers.values().any(|&owner| owner == p);
        if contained {
            return RetCode::PreconditionNotMet;
        }
        state.participants.remove(&p);
        state.monitors.remove(&p);
        state.record(format!("delete_participant({})", p));
        RetCode::Ok
    }

    fn delete_contained_entities(&self, participant: ParticipantHandle) -> RetCode {
        let mut state = self.state.lock();
        if let Some(code) = state.injected("delete_contained_entities") {
            return code;
        }
        let p = participant.0;
        let subscribers: Vec<u64> = state
            .subscribers
            .iter()
            .filter(|(_, &owner)| owner == p)
            .map(|(&id, _)| id)
            .collect();
        let publishers: Vec<u64> = state
            .publishers
            .iter()
            .filter(|(_, &owner)| owner == p)
            .map(|(&id, _)| id)
            .collect();
        state
            .readers
            .retain(|_, r| !r.subscriber.is_some_and(|s| subscribers.contains(&s)));
        state.writers.retain(|_, w| !publishers.contains(&w.publisher));
        state.subscribers.retain(|_, &mut owner| owner != p);
        state.publishers.retain(|_, &mut owner| owner != p);
        state.filters.retain(|_, f| f.participant != p);
        state.topics.retain(|_, t| t.participant != p);
        state.record(format!("delete_contained_entities({})", p));
        RetCode::Ok
    }

    fn enable_participant(&self, participant: ParticipantHandle) -> RetCode {
        let mut state = self.state.lock();
        if let Some(code) = state.injected("enable_participant") {
            return code;
        }
        if !state.participants.contains_key(&participant.0) {
            return RetCode::AlreadyDeleted;
        }
        state.record(format!("enable_participant({})", participant.0));
        RetCode::Ok
    }

    fn security_supported(&self) -> bool {
        self.state.lock().security_supported
    }

    fn attach_discovery_monitor(
        &self,
        participant: ParticipantHandle,
        on_add: Option<ParticipantCallback>,
        on_remove: Option<ParticipantCallback>,
    ) -> RetCode {
        let mut state = self.state.lock();
        if !state.participants.contains_key(&participant.0) {
            return RetCode::AlreadyDeleted;
        }
        state
            .monitors
            .insert(participant.0, Monitor { on_add, on_remove });
        state.record(format!("attach_discovery_monitor({})", participant.0));
        RetCode::Ok
    }

    fn create_topic(
        &self,
        participant: ParticipantHandle,
        name: &str,
        _type_name: &str,
        _qos: &TopicQos,
    ) -> Result<TopicHandle, RetCode> {
        let mut state = self.state.lock();
        if let Some(code) = state.injected("create_topic") {
            return Err(code);
        }
        if !state.participants.contains_key(&participant.0) {
            return Err(RetCode::AlreadyDeleted);
        }
        let duplicate = state
            .topics
            .values()
            .any(|t| t.participant == participant.0 && t.name == name);
        if duplicate {
            return Err(RetCode::PreconditionNotMet);
        }
        let id = state.allocate();
        state.topics.insert(
            id,
            TopicRec {
                participant: participant.0,
                name: name.to_string(),
            },
        );
        state.record(format!("create_topic({})", id));
        Ok(TopicHandle(id))
    }

    fn delete_topic(&self, _participant: ParticipantHandle, topic: TopicHandle) -> RetCode {
        let mut state = self.state.lock();
        if let Some(code) = state.injected("delete_topic") {
            return code;
        }
        if !state.topics.contains_key(&topic.0) {
            return RetCode::Ok; // tolerated double delete
        }
        let referenced = state
            .writers
            .values()
            .any(|w| w.topic == topic.0)
            || state
                .readers
                .values()
                .any(|r| matches!(r.source, ReaderSource::Topic(t) if t.0 == topic.0))
            || state.filters.values().any(|f| f.base == topic.0);
        if referenced {
            return RetCode::PreconditionNotMet;
        }
        state.topics.remove(&topic.0);
        state.record(format!("delete_topic({})", topic.0));
        RetCode::Ok
    }

    fn set_topic_qos(&self, topic: TopicHandle, _qos: &TopicQos) -> RetCode {
        let mut state = self.state.lock();
        if let Some(code) = state.injected("set_topic_qos") {
            return code;
        }
        if !state.topics.contains_key(&topic.0) {
            return RetCode::AlreadyDeleted;
        }
        state.record(format!("set_topic_qos({})", topic.0));
        RetCode::Ok
    }

    fn create_filter_topic(
        &self,
        participant: ParticipantHandle,
        name: &str,
        base: TopicHandle,
        expression: &str,
        params: &[String],
    ) -> Result<FilterTopicHandle, RetCode> {
        let mut state = self.state.lock();
        if let Some(code) = state.injected("create_filter_topic") {
            return Err(code);
        }
        if !state.topics.contains_key(&base.0) {
            return Err(RetCode::BadParameter);
        }
        // Filter-topic names must be unique while the old one is alive,
        // which is what forces the sequence suffix in replacements.
        if state.filters.values().any(|f| f.name == name) {
            return Err(RetCode::PreconditionNotMet);
        }
        let id = state.allocate();
        state.filters.insert(
            id,
            FilterRec {
                participant: participant.0,
                base: base.0,
                name: name.to_string(),
                expression: expression.to_string(),
                params: params.to_vec(),
            },
        );
        state.record(format!("create_filter_topic({})", id));
        Ok(FilterTopicHandle(id))
    }

    fn delete_filter_topic(
        &self,
        _participant: ParticipantHandle,
        filter: FilterTopicHandle,
    ) -> RetCode {
        let mut state = self.state.lock();
        if let Some(code) = state.injected("delete_filter_topic") {
            return code;
        }
        if !state.filters.contains_key(&filter.0) {
            return RetCode::Ok; // tolerated double delete
        }
        let attached = state
            .readers
            .values()
            .any(|r| matches!(r.source, ReaderSource::Filtered(f) if f.0 == filter.0));
        if attached {
            return RetCode::PreconditionNotMet;
        }
        state.filters.remove(&filter.0);
        state.record(format!("delete_filter_topic({})", filter.0));
        RetCode::Ok
    }

    fn set_filter_params(&self, filter: FilterTopicHandle, params: &[String]) -> RetCode {
        let mut state = self.state.lock();
        if let Some(code) = state.injected("set_filter_params") {
            return code;
        }
        match state.filters.get_mut(&filter.0) {
            Some(rec) => {
                rec.params = params.to_vec();
                state.record(format!("set_filter_params({})", filter.0));
                RetCode::Ok
            }
            None => RetCode::AlreadyDeleted,
        }
    }

    fn create_publisher(
        &self,
        participant: ParticipantHandle,
        _qos: &PublisherQos,
    ) -> Result<PublisherHandle, RetCode> {
        let mut state = self.state.lock();
        if let Some(code) = state.injected("create_publisher") {
            return Err(code);
        }
        if !state.participants.contains_key(&participant.0) {
            return Err(RetCode::AlreadyDeleted);
        }
        let id = state.allocate();
        state.publishers.insert(id, participant.0);
        state.record(format!("create_publisher({})", id));
        Ok(PublisherHandle(id))
    }

    fn delete_publisher(
        &self,
        _participant: ParticipantHandle,
        publisher: PublisherHandle,
    ) -> RetCode {
        let mut state = self.state.lock();
        if let Some(code) = state.injected("delete_publisher") {
            return code;
        }
        if !state.publishers.contains_key(&publisher.0) {
            return RetCode::Ok; // tolerated double delete
        }
        if state.writers.values().any(|w| w.publisher == publisher.0) {
            return RetCode::PreconditionNotMet;
        }
        state.publishers.remove(&publisher.0);
        state.record(format!("delete_publisher({})", publisher.0));
        RetCode::Ok
    }

    fn set_publisher_qos(&self, publisher: PublisherHandle, _qos: &PublisherQos) -> RetCode {
        let mut state = self.state.lock();
        if !state.publishers.contains_key(&publisher.0) {
            return RetCode::AlreadyDeleted;
        }
        state.record(format!("set_publisher_qos({})", publisher.0));
        RetCode::Ok
    }

    fn create_writer(
        &self,
        publisher: PublisherHandle,
        topic: TopicHandle,
        _qos: &WriterQos,
        listener: Arc<dyn WriterStatusListener>,
        _mask: StatusMask,
    ) -> Result<WriterHandle, RetCode> {
        let mut state = self.state.lock();
        if let Some(code) = state.injected("create_writer") {
            return Err(code);
        }
        if !state.publishers.contains_key(&publisher.0) || !state.topics.contains_key(&topic.0) {
            return Err(RetCode::BadParameter);
        }
        let id = state.allocate();
        state.writers.insert(
            id,
            WriterRec {
                publisher: publisher.0,
                topic: topic.0,
                listener,
            },
        );
        state.record(format!("create_writer({})", id));
        Ok(WriterHandle(id))
    }

    fn delete_writer(&self, _publisher: PublisherHandle, writer: WriterHandle) -> RetCode {
        let mut state = self.state.lock();
        if let Some(code) = state.injected("delete_writer") {
            return code;
        }
        if state.writers.remove(&writer.0).is_none() {
            return RetCode::Ok; // tolerated double delete
        }
        state.record(format!("delete_writer({})", writer.0));
        RetCode::Ok
    }

    fn set_writer_qos(&self, writer: WriterHandle, _qos: &WriterQos) -> RetCode {
        let mut state = self.state.lock();
        if !state.writers.contains_key(&writer.0) {
            return RetCode::AlreadyDeleted;
        }
        state.record(format!("set_writer_qos({})", writer.0));
        RetCode::Ok
    }

    fn publication_matched(&self, writer: WriterHandle) -> MatchedStatus {
        let mut state = self.state.lock();
        let current = state.pub_matches.entry(writer.0).or_default().poll();
        MatchedStatus {
            total_count: current,
            current_count: current,
        }
    }

    fn writer_locators(&self, writer: WriterHandle) -> Vec<String> {
        let state = self.state.lock();
        if !state.writers.contains_key(&writer.0) {
            return Vec::new();
        }
        state
            .writer_locators
            .get(&writer.0)
            .cloned()
            .unwrap_or_else(|| vec![format!("udp:239.255.0.1:{}", 7400 + writer.0)])
    }

    fn create_subscriber(
        &self,
        participant: ParticipantHandle,
        _qos: &SubscriberQos,
    ) -> Result<SubscriberHandle, RetCode> {
        let mut state = self.state.lock();
        if let Some(code) = state.injected("create_subscriber") {
            return Err(code);
        }
        if !state.participants.contains_key(&participant.0) {
            return Err(RetCode::AlreadyDeleted);
        }
        let id = state.allocate();
        state.subscribers.insert(id, participant.0);
        state.record(format!("create_subscriber({})", id));
        Ok(SubscriberHandle(id))
    }

    fn delete_subscriber(
        &self,
        _participant: ParticipantHandle,
        subscriber: SubscriberHandle,
    ) -> RetCode {
        let mut state = self.state.lock();
        if let Some(code) = state.injected("delete_subscriber") {
            return code;
        }
        if !state.subscribers.contains_key(&subscriber.0) {
            return RetCode::Ok; // tolerated double delete
        }
        let owning = state
            .readers
            .values()
            .any(|r| r.subscriber == Some(subscriber.0));
        if owning {
            return RetCode::PreconditionNotMet;
        }
        state.subscribers.remove(&subscriber.0);
        state.record(format!("delete_subscriber({})", subscriber.0));
        RetCode::Ok
    }

    fn set_subscriber_qos(&self, subscriber: SubscriberHandle, _qos: &SubscriberQos) -> RetCode {
        let mut state = self.state.lock();
        if !state.subscribers.contains_key(&subscriber.0) {
            return RetCode::AlreadyDeleted;
        }
        state.record(format!("set_subscriber_qos({})", subscriber.0));
        RetCode::Ok
    }

    fn create_reader(
        &self,
        subscriber: SubscriberHandle,
        source: ReaderSource,
        _qos: &ReaderQos,
        listener: Arc<dyn ReaderStatusListener>,
        _mask: StatusMask,
    ) -> Result<ReaderHandle, RetCode> {
        let mut state = self.state.lock();
        if let Some(code) = state.injected("create_reader") {
            return Err(code);
        }
        if !state.subscribers.contains_key(&subscriber.0) {
            return Err(RetCode::AlreadyDeleted);
        }
        let source_alive = match source {
            ReaderSource::Topic(t) => state.topics.contains_key(&t.0),
            ReaderSource::Filtered(f) => state.filters.contains_key(&f.0),
        };
        if !source_alive {
            return Err(RetCode::BadParameter);
        }
        let id = state.allocate();
        state.readers.insert(
            id,
            ReaderRec {
                subscriber: Some(subscriber.0),
                source,
                listener: Some(listener),
                queue: VecDeque::new(),
            },
        );
        state.record(format!("create_reader({})", id));
        Ok(ReaderHandle(id))
    }

    fn delete_reader(&self, _subscriber: SubscriberHandle, reader: ReaderHandle) -> RetCode {
        let mut state = self.state.lock();
        if let Some(code) = state.injected("delete_reader") {
            return code;
        }
        if state.readers.remove(&reader.0).is_none() {
            return RetCode::Ok; // tolerated double delete
        }
        state.record(format!("delete_reader({})", reader.0));
        RetCode::Ok
    }

    fn delete_reader_conditions(&self, reader: ReaderHandle) -> RetCode {
        let mut state = self.state.lock();
        if let Some(code) = state.injected("delete_reader_conditions") {
            return code;
        }
        // No-op on a reader that is already gone: replacement's guard path.
        if state.readers.contains_key(&reader.0) {
            state.record(format!("delete_reader_conditions({})", reader.0));
        }
        RetCode::Ok
    }

    fn set_reader_qos(&self, reader: ReaderHandle, _qos: &ReaderQos) -> RetCode {
        let mut state = self.state.lock();
        if let Some(code) = state.injected("set_reader_qos") {
            return code;
        }
        if !state.readers.contains_key(&reader.0) {
            return RetCode::AlreadyDeleted;
        }
        state.record(format!("set_reader_qos({})", reader.0));
        RetCode::Ok
    }

    fn subscription_matched(&self, reader: ReaderHandle) -> MatchedStatus {
        let mut state = self.state.lock();
        let current = state.sub_matches.entry(reader.0).or_default().poll();
        MatchedStatus {
            total_count: current,
            current_count: current,
        }
    }

    fn reader_locators(&self, reader: ReaderHandle) -> Vec<String> {
        let state = self.state.lock();
        if !state.readers.contains_key(&reader.0) {
            return Vec::new();
        }
        state
            .reader_locators
            .get(&reader.0)
            .cloned()
            .unwrap_or_else(|| vec![format!("udp:239.255.0.1:{}", 7400 + reader.0)])
    }

    fn reader_filter_topic(&self, reader: ReaderHandle) -> Option<FilterTopicHandle> {
        let state = self.state.lock();
        match state.readers.get(&reader.0)?.source {
            ReaderSource::Filtered(filter) => Some(filter),
            ReaderSource::Topic(_) => None,
        }
    }

    fn take_samples(&self, reader: ReaderHandle, max: usize) -> Result<Vec<Sample>, RetCode> {
        let mut state = self.state.lock();
        let rec = state
            .readers
            .get_mut(&reader.0)
            .ok_or(RetCode::AlreadyDeleted)?;
        let count = rec.queue.len().min(max);
        Ok(rec.queue.drain(..count).collect())
    }

    fn has_transport_config(&self, name: &str) -> bool {
        self.state.lock().transport_configs.contains_key(name)
    }

    fn install_transport_config(&self, config: TransportConfig) -> RetCode {
        let mut state = self.state.lock();
        if let Some(code) = state.injected("install_transport_config") {
            return code;
        }
        state.record(format!("install_transport_config({})", config.name));
        state.transport_configs.insert(config.name.clone(), config);
        RetCode::Ok
    }

    fn bind_transport_config(&self, participant: ParticipantHandle, name: &str) -> RetCode {
        let mut state = self.state.lock();
        if let Some(code) = state.injected("bind_transport_config") {
            return code;
        }
        if !state.participants.contains_key(&participant.0) {
            return RetCode::AlreadyDeleted;
        }
        if !state.transport_configs.contains_key(name) {
            return RetCode::BadParameter;
        }
        state.record(format!("bind_transport_config({}, {})", participant.0, name));
        RetCode::Ok
    }
}

impl std::fmt::Debug for MockRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockRuntime")
            .field("entities", &self.live_entities())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopListener;
    impl ReaderStatusListener for NoopListener {}
    impl WriterStatusListener for NoopListener {}

    fn qos_defaults() -> (TopicQos, ReaderQos) {
        use crate::qos::{dictionary, QosPreset};
        (
            dictionary::topic(QosPreset::BestEffort),
            dictionary::reader(QosPreset::BestEffort),
        )
    }

    #[test]
    fn test_delete_topic_refused_while_reader_attached() {
        let runtime = MockRuntime::new();
        let (topic_qos, reader_qos) = qos_defaults();
        let participant = runtime.create_participant(0, &[]).unwrap();
        let topic = runtime
            .create_topic(participant, "t", "T", &topic_qos)
            .unwrap();
        let subscriber = runtime
            .create_subscriber(participant, &crate::qos::dictionary::subscriber(crate::qos::QosPreset::BestEffort))
            .unwrap();
        let reader = runtime
            .create_reader(
                subscriber,
                ReaderSource::Topic(topic),
                &reader_qos,
                Arc::new(NoopListener),
                StatusMask::reader_defaults(),
            )
            .unwrap();

        assert_eq!(
            runtime.delete_topic(participant, topic),
            RetCode::PreconditionNotMet
        );
        assert_eq!(runtime.delete_reader(subscriber, reader), RetCode::Ok);
        assert_eq!(runtime.delete_topic(participant, topic), RetCode::Ok);
        // Double delete is a tolerated no-op.
        assert_eq!(runtime.delete_topic(participant, topic), RetCode::Ok);
    }

    #[test]
    fn test_match_schedule_consumes_then_repeats_last() {
        let runtime = MockRuntime::new();
        let reader = runtime.raw_reader();
        runtime.schedule_subscription_matches(reader, &[0, 0, 2]);

        assert_eq!(runtime.subscription_matched(reader).current_count, 0);
        assert_eq!(runtime.subscription_matched(reader).current_count, 0);
        assert_eq!(runtime.subscription_matched(reader).current_count, 2);
        assert_eq!(runtime.subscription_matched(reader).current_count, 2);
    }

    #[test]
    fn test_injected_failure_fires_once() {
        let runtime = MockRuntime::new();
        runtime.fail_next("create_participant", RetCode::OutOfResources);

        assert_eq!(
            runtime.create_participant(0, &[]).unwrap_err(),
            RetCode::OutOfResources
        );
        assert!(runtime.create_participant(0, &[]).is_ok());
    }
}
