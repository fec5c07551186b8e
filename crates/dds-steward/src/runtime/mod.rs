// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Participant Runtime boundary.
//!
//! The steward never talks to a wire protocol itself; everything below the
//! lifecycle layer is reached through [`ParticipantRuntime`]. The trait is
//! the contract an actual transport implementation has to satisfy: entity
//! factories and their delete counterparts, QoS application, status-mask
//! based listener registration at creation time, matched-status polling,
//! content-filter topic management and transport-config binding.
//!
//! # Entity graph
//!
//! ```text
//! Participant
//! +-- Topic                    (one per registered topic name)
//! +-- FilterTopic              (derived, named "<topic>_<reader>_<seq>")
//! +-- Publisher
//! |   +-- Writer   ----------> Topic
//! +-- Subscriber
//!     +-- Reader   ----------> Topic | FilterTopic
//! ```
//!
//! Deletion is refused (`PreconditionNotMet`) while dependents exist, which
//! is exactly why the topic group enforces its fixed teardown order.
//!
//! [`mock`] provides an instrumented in-memory implementation used by the
//! test suites.

pub mod mock;

use crate::qos::{PublisherQos, ReaderQos, SubscriberQos, TopicQos, WriterQos};
use crate::transport::TransportConfig;
use std::sync::Arc;
use std::time::SystemTime;

/// Domain id partitioning independent pub-sub networks in one process.
pub type DomainId = u32;

/// Return codes produced by the Participant Runtime.
///
/// `Ok` and `NoData` are non-errors; everything else is a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetCode {
    Ok,
    Error,
    Unsupported,
    BadParameter,
    PreconditionNotMet,
    OutOfResources,
    NotEnabled,
    ImmutablePolicy,
    InconsistentPolicy,
    AlreadyDeleted,
    Timeout,
    NoData,
    IllegalOperation,
}

impl RetCode {
    /// Symbolic name used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            RetCode::Ok => "OK",
            RetCode::Error => "ERROR",
            RetCode::Unsupported => "UNSUPPORTED",
            RetCode::BadParameter => "BAD_PARAMETER",
            RetCode::PreconditionNotMet => "PRECONDITION_NOT_MET",
            RetCode::OutOfResources => "OUT_OF_RESOURCES",
            RetCode::NotEnabled => "NOT_ENABLED",
            RetCode::ImmutablePolicy => "IMMUTABLE_POLICY",
            RetCode::InconsistentPolicy => "INCONSISTENT_POLICY",
            RetCode::AlreadyDeleted => "ALREADY_DELETED",
            RetCode::Timeout => "TIMEOUT",
            RetCode::NoData => "NO_DATA",
            RetCode::IllegalOperation => "ILLEGAL_OPERATION",
        }
    }

    /// Whether the code counts as success (`Ok` or `NoData`).
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, RetCode::Ok | RetCode::NoData)
    }
}

macro_rules! entity_handle {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub u64);
    };
}

entity_handle!(
    /// Handle to a domain participant.
    ParticipantHandle
);
entity_handle!(
    /// Handle to a topic entity.
    TopicHandle
);
entity_handle!(
    /// Handle to a content-filter topic derived from a base topic.
    FilterTopicHandle
);
entity_handle!(
    /// Handle to a publisher.
    PublisherHandle
);
entity_handle!(
    /// Handle to a subscriber.
    SubscriberHandle
);
entity_handle!(
    /// Handle to a data reader.
    ReaderHandle
);
entity_handle!(
    /// Handle to a data writer.
    WriterHandle
);

/// Status mask selecting which listener callbacks an entity receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusMask(pub u32);

impl StatusMask {
    pub const NONE: StatusMask = StatusMask(0);
    pub const INCONSISTENT_TOPIC: StatusMask = StatusMask(1 << 0);
    pub const REQUESTED_INCOMPATIBLE_QOS: StatusMask = StatusMask(1 << 1);
    pub const OFFERED_INCOMPATIBLE_QOS: StatusMask = StatusMask(1 << 2);
    pub const SUBSCRIPTION_MATCHED: StatusMask = StatusMask(1 << 3);
    pub const PUBLICATION_MATCHED: StatusMask = StatusMask(1 << 4);
    pub const SAMPLE_LOST: StatusMask = StatusMask(1 << 5);
    pub const SAMPLE_REJECTED: StatusMask = StatusMask(1 << 6);

    /// Mask the steward attaches to every reader it creates.
    #[must_use]
    pub fn reader_defaults() -> StatusMask {
        Self::INCONSISTENT_TOPIC
            | Self::REQUESTED_INCOMPATIBLE_QOS
            | Self::SUBSCRIPTION_MATCHED
            | Self::SAMPLE_LOST
    }

    /// Mask the steward attaches to every writer it creates.
    #[must_use]
    pub fn writer_defaults() -> StatusMask {
        Self::INCONSISTENT_TOPIC
            | Self::OFFERED_INCOMPATIBLE_QOS
            | Self::PUBLICATION_MATCHED
            | Self::SAMPLE_LOST
            | Self::SAMPLE_REJECTED
    }

    /// Whether all bits of `other` are set in `self`.
    #[must_use]
    pub fn contains(&self, other: StatusMask) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for StatusMask {
    type Output = StatusMask;

    fn bitor(self, rhs: StatusMask) -> StatusMask {
        StatusMask(self.0 | rhs.0)
    }
}

/// Matched-endpoint counters reported by the runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchedStatus {
    /// Cumulative count of matches over the entity's lifetime.
    pub total_count: u32,
    /// Currently matched remote endpoints.
    pub current_count: u32,
}

/// Information about a peer participant joining or leaving the domain.
#[derive(Debug, Clone)]
pub struct ParticipantInfo {
    /// Peer network address as reported by discovery.
    pub ip_address: String,
    /// Peer GUID rendered as a hex string.
    pub guid: String,
    /// When the discovery event was observed.
    pub discovered_at: SystemTime,
}

/// Callback invoked for each peer join/leave event.
pub type ParticipantCallback = Arc<dyn Fn(&ParticipantInfo) + Send + Sync>;

/// Opaque property passed through to participant creation.
///
/// Security artifacts and the bind-address override travel this way; the
/// steward never interprets the values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub value: String,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// What a reader is bound to: the base topic or a filter variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderSource {
    /// Bind directly to the base topic.
    Topic(TopicHandle),
    /// Bind to a content-filter topic.
    Filtered(FilterTopicHandle),
}

/// One opaque sample drained from a reader queue.
pub type Sample = Vec<u8>;

/// Listener attached to a reader at creation time.
///
/// The runtime invokes these from its own threads; implementations must not
/// block. All methods default to no-ops. The steward's generic listener
/// carries the topic/reader identity and forwards to the process-wide
/// handler slot.
pub trait ReaderStatusListener: Send + Sync {
    /// The reader matched or unmatched a remote writer.
    fn on_subscription_matched(&self, status: MatchedStatus) {
        let _ = status;
    }

    /// A remote writer offered QoS this reader cannot accept.
    fn on_requested_incompatible_qos(&self) {}

    /// A gap was detected in the incoming sample stream.
    fn on_sample_lost(&self) {}

    /// A remote topic definition conflicts with the local one.
    fn on_inconsistent_topic(&self) {}
}

/// Listener attached to a writer at creation time.
pub trait WriterStatusListener: Send + Sync {
    /// The writer matched or unmatched a remote reader.
    fn on_publication_matched(&self, status: MatchedStatus) {
        let _ = status;
    }

    /// A remote reader requested QoS this writer cannot offer.
    fn on_offered_incompatible_qos(&self) {}

    /// A sample was dropped before delivery.
    fn on_sample_lost(&self) {}

    /// A sample was rejected by a remote reader's resource limits.
    fn on_sample_rejected(&self) {}

    /// A remote topic definition conflicts with the local one.
    fn on_inconsistent_topic(&self) {}
}

/// The external pub-sub transport the steward orchestrates.
///
/// Implementations must be safe to call from arbitrary threads; entity
/// create/delete calls may block on in-flight traffic. Deleting an entity
/// that still has dependents returns [`RetCode::PreconditionNotMet`];
/// deleting one that is already gone is a tolerated no-op.
pub trait ParticipantRuntime: Send + Sync {
    // --- participant ----------------------------------------------------

    /// Create a participant for the domain, applying the given properties.
    fn create_participant(
        &self,
        domain: DomainId,
        properties: &[Property],
    ) -> Result<ParticipantHandle, RetCode>;

    /// Delete a participant. All contained entities must already be gone.
    fn delete_participant(&self, participant: ParticipantHandle) -> RetCode;

    /// Delete everything still contained in the participant.
    fn delete_contained_entities(&self, participant: ParticipantHandle) -> RetCode;

    /// Enable the participant (starts discovery and traffic).
    fn enable_participant(&self, participant: ParticipantHandle) -> RetCode;

    /// Whether this runtime build carries security support.
    fn security_supported(&self) -> bool;

    /// Attach a discovery monitor reporting peer joins/leaves.
    fn attach_discovery_monitor(
        &self,
        participant: ParticipantHandle,
        on_add: Option<ParticipantCallback>,
        on_remove: Option<ParticipantCallback>,
    ) -> RetCode;

    // --- topics ---------------------------------------------------------

    /// Create a topic entity with the given type name and QoS.
    fn create_topic(
        &self,
        participant: ParticipantHandle,
        name: &str,
        type_name: &str,
        qos: &TopicQos,
    ) -> Result<TopicHandle, RetCode>;

    /// Delete a topic. Fails while readers or writers reference it.
    fn delete_topic(&self, participant: ParticipantHandle, topic: TopicHandle) -> RetCode;

    /// Apply new QoS to a live topic.
    fn set_topic_qos(&self, topic: TopicHandle, qos: &TopicQos) -> RetCode;

    // --- content filters ------------------------------------------------

    /// Create a named content-filter topic over a base topic.
    fn create_filter_topic(
        &self,
        participant: ParticipantHandle,
        name: &str,
        base: TopicHandle,
        expression: &str,
        params: &[String],
    ) -> Result<FilterTopicHandle, RetCode>;

    /// Delete a filter topic. Fails while a reader is bound to it.
    fn delete_filter_topic(
        &self,
        participant: ParticipantHandle,
        filter: FilterTopicHandle,
    ) -> RetCode;

    /// Replace the filter's parameter values in place.
    fn set_filter_params(&self, filter: FilterTopicHandle, params: &[String]) -> RetCode;

    // --- publisher / writer ---------------------------------------------

    /// Create a publisher.
    fn create_publisher(
        &self,
        participant: ParticipantHandle,
        qos: &PublisherQos,
    ) -> Result<PublisherHandle, RetCode>;

    /// Delete a publisher. Fails while it still owns a writer.
    fn delete_publisher(
        &self,
        participant: ParticipantHandle,
        publisher: PublisherHandle,
    ) -> RetCode;

    /// Apply new QoS to a live publisher.
    fn set_publisher_qos(&self, publisher: PublisherHandle, qos: &PublisherQos) -> RetCode;

    /// Create a writer under a publisher, listener bound at creation.
    fn create_writer(
        &self,
        publisher: PublisherHandle,
        topic: TopicHandle,
        qos: &WriterQos,
        listener: Arc<dyn WriterStatusListener>,
        mask: StatusMask,
    ) -> Result<WriterHandle, RetCode>;

    /// Delete a writer.
    fn delete_writer(&self, publisher: PublisherHandle, writer: WriterHandle) -> RetCode;

    /// Apply new QoS to a live writer.
    fn set_writer_qos(&self, writer: WriterHandle, qos: &WriterQos) -> RetCode;

    /// Current publication-matched counters for a writer.
    fn publication_matched(&self, writer: WriterHandle) -> MatchedStatus;

    /// Locators the writer is reachable on.
    fn writer_locators(&self, writer: WriterHandle) -> Vec<String>;

    // --- subscriber / reader --------------------------------------------

    /// Create a subscriber.
    fn create_subscriber(
        &self,
        participant: ParticipantHandle,
        qos: &SubscriberQos,
    ) -> Result<SubscriberHandle, RetCode>;

    /// Delete a subscriber. Fails while it still owns readers.
    fn delete_subscriber(
        &self,
        participant: ParticipantHandle,
        subscriber: SubscriberHandle,
    ) -> RetCode;

    /// Apply new QoS to a live subscriber.
    fn set_subscriber_qos(&self, subscriber: SubscriberHandle, qos: &SubscriberQos) -> RetCode;

    /// Create a reader bound to a topic or filter topic, listener bound at
    /// creation.
    fn create_reader(
        &self,
        subscriber: SubscriberHandle,
        source: ReaderSource,
        qos: &ReaderQos,
        listener: Arc<dyn ReaderStatusListener>,
        mask: StatusMask,
    ) -> Result<ReaderHandle, RetCode>;

    /// Delete a reader. Its conditions must already be gone.
    fn delete_reader(&self, subscriber: SubscriberHandle, reader: ReaderHandle) -> RetCode;

    /// Delete the reader's contained read/query conditions.
    ///
    /// Calling this on a reader with no conditions (or one already emptied)
    /// is a no-op returning `Ok`.
    fn delete_reader_conditions(&self, reader: ReaderHandle) -> RetCode;

    /// Apply new QoS to a live reader.
    fn set_reader_qos(&self, reader: ReaderHandle, qos: &ReaderQos) -> RetCode;

    /// Current subscription-matched counters for a reader.
    fn subscription_matched(&self, reader: ReaderHandle) -> MatchedStatus;

    /// Locators the reader listens on.
    fn reader_locators(&self, reader: ReaderHandle) -> Vec<String>;

    /// The filter topic the reader is bound to, if any.
    fn reader_filter_topic(&self, reader: ReaderHandle) -> Option<FilterTopicHandle>;

    /// Drain up to `max` pending samples from the reader queue.
    ///
    /// An empty queue yields an empty vec, not `NoData`; `Err` is reserved
    /// for real rejections.
    fn take_samples(&self, reader: ReaderHandle, max: usize) -> Result<Vec<Sample>, RetCode>;

    // --- transport configs ----------------------------------------------

    /// Whether a transport configuration with this exact name exists.
    fn has_transport_config(&self, name: &str) -> bool;

    /// Install a transport configuration under its name.
    fn install_transport_config(&self, config: TransportConfig) -> RetCode;

    /// Bind a previously installed configuration to a participant.
    fn bind_transport_config(&self, participant: ParticipantHandle, name: &str) -> RetCode;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retcode_ok_and_no_data_are_non_errors() {
        assert!(RetCode::Ok.is_ok());
        assert!(RetCode::NoData.is_ok());
        assert!(!RetCode::PreconditionNotMet.is_ok());
        assert!(!RetCode::AlreadyDeleted.is_ok());
    }

    #[test]
    fn test_retcode_names_are_symbolic() {
        assert_eq!(RetCode::OutOfResources.name(), "OUT_OF_RESOURCES");
        assert_eq!(RetCode::IllegalOperation.name(), "ILLEGAL_OPERATION");
    }

    #[test]
    fn test_status_mask_composition() {
        let mask = StatusMask::reader_defaults();
        assert!(mask.contains(StatusMask::SUBSCRIPTION_MATCHED));
        assert!(mask.contains(StatusMask::SAMPLE_LOST));
        assert!(!mask.contains(StatusMask::PUBLICATION_MATCHED));
    }
}
