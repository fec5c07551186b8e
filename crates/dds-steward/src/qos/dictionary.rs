// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! QoS profile table: preset id -> concrete QoS per entity kind.
//!
//! Pure lookups, no state. Presets differ only in durability, reliability and
//! history; everything else comes from the shared baseline below. An unknown
//! preset name is a configuration error surfaced at parse time
//! ([`QosPreset::from_str`]) and must never fall back to a different profile.

use super::{
    DestinationOrder, Durability, History, Ownership, PresentationScope, PublisherQos, ReaderQos,
    Reliability, SubscriberQos, TimeBasedFilter, TopicQos, WriterQos,
};
use crate::error::Error;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

/// Named QoS profile applied atomically to a topic's entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QosPreset {
    /// Volatile, best-effort, latest sample only.
    BestEffort,
    /// Volatile, reliable, latest sample only.
    LatestReliable,
    /// Transient-local, reliable, latest sample only.
    LatestReliableTransient,
    /// Volatile, reliable, full history.
    StrictReliable,
}

impl QosPreset {
    /// Canonical lower-case name of the preset.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            QosPreset::BestEffort => "best_effort",
            QosPreset::LatestReliable => "latest_reliable",
            QosPreset::LatestReliableTransient => "latest_reliable_transient",
            QosPreset::StrictReliable => "strict_reliable",
        }
    }
}

impl FromStr for QosPreset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "best_effort" => Ok(QosPreset::BestEffort),
            "latest_reliable" => Ok(QosPreset::LatestReliable),
            "latest_reliable_transient" => Ok(QosPreset::LatestReliableTransient),
            "strict_reliable" => Ok(QosPreset::StrictReliable),
            other => Err(Error::UnknownQosPreset(other.to_string())),
        }
    }
}

/// Destination-order policy for every QoS value this table hands out.
///
/// Source timestamps keep sample order stable across readers, but hosts with
/// unsynchronized clocks can starve readers of fresh data. Setting the
/// `STEWARD_DISTRUST_TIMESTAMPS` environment variable to anything other than
/// empty/`0`/`false` switches to reception timestamps. Resolved once per
/// process.
pub fn timestamp_policy() -> DestinationOrder {
    static POLICY: OnceLock<DestinationOrder> = OnceLock::new();
    *POLICY.get_or_init(|| {
        let distrust = std::env::var("STEWARD_DISTRUST_TIMESTAMPS")
            .map(|v| {
                let v = v.to_ascii_lowercase();
                !v.is_empty() && v != "0" && v != "false"
            })
            .unwrap_or(false);
        if distrust {
            log::info!("[QosDictionary] STEWARD_DISTRUST_TIMESTAMPS set, ordering by reception timestamp");
            DestinationOrder::ByReceptionTimestamp
        } else {
            DestinationOrder::BySourceTimestamp
        }
    })
}

fn preset_triplet(preset: QosPreset) -> (Durability, Reliability, History) {
    match preset {
        QosPreset::BestEffort => (
            Durability::Volatile,
            Reliability::BestEffort,
            History::KeepLast(1),
        ),
        QosPreset::LatestReliable => (
            Durability::Volatile,
            Reliability::Reliable,
            History::KeepLast(1),
        ),
        QosPreset::LatestReliableTransient => (
            Durability::TransientLocal,
            Reliability::Reliable,
            History::KeepLast(1),
        ),
        // Do not change strict_reliable history without checking every
        // monitoring consumer that special-cases KeepAll topics.
        QosPreset::StrictReliable => (
            Durability::Volatile,
            Reliability::Reliable,
            History::KeepAll,
        ),
    }
}

/// Topic QoS for a preset.
#[must_use]
pub fn topic(preset: QosPreset) -> TopicQos {
    let (durability, reliability, history) = preset_triplet(preset);
    TopicQos {
        durability,
        reliability,
        history,
        destination_order: timestamp_policy(),
        ownership: Ownership::Shared,
        deadline: None,
        lifespan: None,
    }
}

/// Reader QoS for a preset.
#[must_use]
pub fn reader(preset: QosPreset) -> ReaderQos {
    let (durability, reliability, history) = preset_triplet(preset);
    ReaderQos {
        durability,
        reliability,
        history,
        destination_order: timestamp_policy(),
        ownership: Ownership::Shared,
        deadline: None,
        time_based_filter: TimeBasedFilter::default(),
        autopurge_nowriter_delay: Duration::from_secs(5),
        autopurge_disposed_delay: Duration::from_secs(5),
    }
}

/// Writer QoS for a preset.
#[must_use]
pub fn writer(preset: QosPreset) -> WriterQos {
    let (durability, reliability, history) = preset_triplet(preset);
    WriterQos {
        durability,
        reliability,
        history,
        destination_order: timestamp_policy(),
        ownership: Ownership::Shared,
        deadline: None,
        lifespan: None,
        ownership_strength: 0,
        max_blocking_time: Duration::from_millis(100),
        autodispose_unregistered: true,
    }
}

/// Publisher QoS; identical for every preset.
#[must_use]
pub fn publisher(_preset: QosPreset) -> PublisherQos {
    PublisherQos {
        presentation: PresentationScope::Instance,
        partitions: Vec::new(),
        autoenable: true,
    }
}

/// Subscriber QoS; identical for every preset.
#[must_use]
pub fn subscriber(_preset: QosPreset) -> SubscriberQos {
    SubscriberQos {
        presentation: PresentationScope::Instance,
        partitions: Vec::new(),
        autoenable: true,
    }
}
