// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! QoS policies and per-entity QoS values.
//!
//! The steward stores one QoS value per entity kind (topic, reader, writer,
//! publisher, subscriber) in every topic group. The values are seeded from a
//! preset in [`dictionary`] at registration time and remain mutable through
//! the registry's `set_*_qos` operations, which also propagate to any live
//! runtime entity.

pub mod dictionary;

pub use dictionary::QosPreset;

use std::time::Duration;

/// RELIABILITY policy kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reliability {
    /// Fire-and-forget delivery.
    BestEffort,
    /// NACK-driven retransmission.
    Reliable,
}

/// DURABILITY policy kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Durability {
    /// Samples exist only while in flight.
    Volatile,
    /// Writers keep history for late joiners.
    TransientLocal,
}

/// HISTORY policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum History {
    /// Bounded queue of the most recent n samples.
    KeepLast(u32),
    /// Keep everything within resource limits.
    KeepAll,
}

/// DESTINATION_ORDER policy kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationOrder {
    /// Order samples by arrival time at the reader.
    ByReceptionTimestamp,
    /// Order samples by the writer's source timestamp.
    BySourceTimestamp,
}

/// OWNERSHIP policy kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Any writer may update any instance.
    Shared,
    /// Highest-strength writer owns each instance.
    Exclusive,
}

/// PRESENTATION access scope for publisher/subscriber groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationScope {
    /// Coherency and ordering per instance.
    Instance,
    /// Coherency and ordering per topic.
    Topic,
    /// Coherency and ordering across the group.
    Group,
}

/// TIME_BASED_FILTER policy: minimum separation between delivered samples.
///
/// A zero separation disables filtering. `set_max_receive_rate` writes this
/// policy onto a single named reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeBasedFilter {
    /// Minimum time between successive accepted samples.
    pub minimum_separation: Duration,
}

impl TimeBasedFilter {
    /// Filter with the requested minimum separation.
    #[must_use]
    pub fn new(minimum_separation: Duration) -> Self {
        Self { minimum_separation }
    }

    /// Whether filtering is disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.minimum_separation == Duration::ZERO
    }
}

/// QoS applied to a topic entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicQos {
    pub durability: Durability,
    pub reliability: Reliability,
    pub history: History,
    pub destination_order: DestinationOrder,
    pub ownership: Ownership,
    /// Expected update period; `None` means no deadline.
    pub deadline: Option<Duration>,
    /// Sample expiry; `None` means samples never expire.
    pub lifespan: Option<Duration>,
}

/// QoS applied to a data reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderQos {
    pub durability: Durability,
    pub reliability: Reliability,
    pub history: History,
    pub destination_order: DestinationOrder,
    pub ownership: Ownership,
    pub deadline: Option<Duration>,
    pub time_based_filter: TimeBasedFilter,
    /// Purge delay for samples whose writer disappeared.
    pub autopurge_nowriter_delay: Duration,
    /// Purge delay for disposed samples.
    pub autopurge_disposed_delay: Duration,
}

/// QoS applied to a data writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterQos {
    pub durability: Durability,
    pub reliability: Reliability,
    pub history: History,
    pub destination_order: DestinationOrder,
    pub ownership: Ownership,
    pub deadline: Option<Duration>,
    pub lifespan: Option<Duration>,
    /// Strength used when ownership is exclusive.
    pub ownership_strength: i32,
    /// Maximum blocking time for reliable writes.
    pub max_blocking_time: Duration,
    /// Dispose instances automatically when they are unregistered.
    pub autodispose_unregistered: bool,
}

/// QoS applied to a publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherQos {
    pub presentation: PresentationScope,
    /// Logical partitions the publisher's writers join.
    pub partitions: Vec<String>,
    /// Enable created writers automatically.
    pub autoenable: bool,
}

/// QoS applied to a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberQos {
    pub presentation: PresentationScope,
    /// Logical partitions the subscriber's readers join.
    pub partitions: Vec<String>,
    /// Enable created readers automatically.
    pub autoenable: bool,
}
