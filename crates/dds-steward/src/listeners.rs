// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Generic status listeners and the process-wide handler slots.
//!
//! Every reader and writer the steward creates gets a generic listener bound
//! at creation time. The listener knows which topic (and reader name) it
//! belongs to and forwards events to a process-wide handler slot, so an
//! application installs one [`ReaderEventHandler`] / [`WriterEventHandler`]
//! and sees every entity's events with full identity attached. Swapping the
//! handler re-points all existing listeners at once; no entity is recreated.

use crate::runtime::{MatchedStatus, ReaderStatusListener, WriterStatusListener};
use parking_lot::RwLock;
use std::sync::Arc;

/// Process-wide handler for reader-side status events.
///
/// All methods default to no-ops.
pub trait ReaderEventHandler: Send + Sync {
    /// A reader matched or unmatched a remote writer.
    fn on_subscription_matched(&self, topic: &str, reader: &str, status: MatchedStatus) {
        let _ = (topic, reader, status);
    }

    /// A remote writer offered QoS a reader cannot accept.
    fn on_requested_incompatible_qos(&self, topic: &str, reader: &str) {
        let _ = (topic, reader);
    }

    /// A gap was detected in a reader's sample stream.
    fn on_sample_lost(&self, topic: &str, reader: &str) {
        let _ = (topic, reader);
    }

    /// A remote topic definition conflicts with the local one.
    fn on_inconsistent_topic(&self, topic: &str) {
        let _ = topic;
    }
}

/// Process-wide handler for writer-side status events.
pub trait WriterEventHandler: Send + Sync {
    /// A writer matched or unmatched a remote reader.
    fn on_publication_matched(&self, topic: &str, status: MatchedStatus) {
        let _ = (topic, status);
    }

    /// A remote reader requested QoS a writer cannot offer.
    fn on_offered_incompatible_qos(&self, topic: &str) {
        let _ = topic;
    }

    /// A sample was dropped before delivery.
    fn on_sample_lost(&self, topic: &str) {
        let _ = topic;
    }

    /// A sample was rejected by a remote reader's resource limits.
    fn on_sample_rejected(&self, topic: &str) {
        let _ = topic;
    }

    /// A remote topic definition conflicts with the local one.
    fn on_inconsistent_topic(&self, topic: &str) {
        let _ = topic;
    }
}

/// Shared, swappable handler slot.
pub type HandlerSlot<H> = Arc<RwLock<Option<Arc<H>>>>;

/// Reader-side handler slot shared by every generic reader listener.
pub type ReaderHandlerSlot = HandlerSlot<dyn ReaderEventHandler>;

/// Writer-side handler slot shared by every generic writer listener.
pub type WriterHandlerSlot = HandlerSlot<dyn WriterEventHandler>;

/// Listener bound to one reader; forwards to the shared handler slot.
pub struct GenericReaderListener {
    topic: String,
    reader: String,
    handler: ReaderHandlerSlot,
}

impl GenericReaderListener {
    /// Listener for `reader` under `topic`, forwarding to `handler`.
    pub fn new(topic: impl Into<String>, reader: impl Into<String>, handler: ReaderHandlerSlot) -> Self {
        Self {
            topic: topic.into(),
            reader: reader.into(),
            handler,
        }
    }
}

impl ReaderStatusListener for GenericReaderListener {
    fn on_subscription_matched(&self, status: MatchedStatus) {
        log::debug!(
            "[Listener] subscription matched on '{}'/'{}': current={}",
            self.topic,
            self.reader,
            status.current_count
        );
        if let Some(handler) = self.handler.read().as_ref() {
            handler.on_subscription_matched(&self.topic, &self.reader, status);
        }
    }

    fn on_requested_incompatible_qos(&self) {
        if let Some(handler) = self.handler.read().as_ref() {
            handler.on_requested_incompatible_qos(&self.topic, &self.reader);
        }
    }

    fn on_sample_lost(&self) {
        if let Some(handler) = self.handler.read().as_ref() {
            handler.on_sample_lost(&self.topic, &self.reader);
        }
    }

    fn on_inconsistent_topic(&self) {
        if let Some(handler) = self.handler.read().as_ref() {
            handler.on_inconsistent_topic(&self.topic);
        }
    }
}

/// Listener bound to one writer; forwards to the shared handler slot.
pub struct GenericWriterListener {
    topic: String,
    handler: WriterHandlerSlot,
}

impl GenericWriterListener {
    /// Listener for the writer under `topic`, forwarding to `handler`.
    pub fn new(topic: impl Into<String>, handler: WriterHandlerSlot) -> Self {
        Self {
            topic: topic.into(),
            handler,
        }
    }
}

impl WriterStatusListener for GenericWriterListener {
    fn on_publication_matched(&self, status: MatchedStatus) {
        log::debug!(
            "[Listener] publication matched on '{}': current={}",
            self.topic,
            status.current_count
        );
        if let Some(handler) = self.handler.read().as_ref() {
            handler.on_publication_matched(&self.topic, status);
        }
    }

    fn on_offered_incompatible_qos(&self) {
        if let Some(handler) = self.handler.read().as_ref() {
            handler.on_offered_incompatible_qos(&self.topic);
        }
    }

    fn on_sample_lost(&self) {
        if let Some(handler) = self.handler.read().as_ref() {
            handler.on_sample_lost(&self.topic);
        }
    }

    fn on_sample_rejected(&self) {
        if let Some(handler) = self.handler.read().as_ref() {
            handler.on_sample_rejected(&self.topic);
        }
    }

    fn on_inconsistent_topic(&self) {
        if let Some(handler) = self.handler.read().as_ref() {
            handler.on_inconsistent_topic(&self.topic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recording {
        events: Mutex<Vec<String>>,
    }

    impl ReaderEventHandler for Recording {
        fn on_subscription_matched(&self, topic: &str, reader: &str, status: MatchedStatus) {
            self.events
                .lock()
                .push(format!("{}/{}:{}", topic, reader, status.current_count));
        }
    }

    #[test]
    fn test_listener_forwards_with_identity() {
        let slot: ReaderHandlerSlot = Arc::new(RwLock::new(None));
        let listener = GenericReaderListener::new("sensors", "R1", Arc::clone(&slot));

        // No handler installed yet: event is dropped, not a panic.
        listener.on_subscription_matched(MatchedStatus {
            total_count: 1,
            current_count: 1,
        });

        let recording = Arc::new(Recording::default());
        *slot.write() = Some(Arc::clone(&recording) as Arc<dyn ReaderEventHandler>);

        listener.on_subscription_matched(MatchedStatus {
            total_count: 2,
            current_count: 2,
        });

        assert_eq!(recording.events.lock().as_slice(), ["sensors/R1:2"]);
    }

    #[test]
    fn test_swapping_the_slot_repoints_existing_listeners() {
        let slot: ReaderHandlerSlot = Arc::new(RwLock::new(None));
        let listener = GenericReaderListener::new("sensors", "R1", Arc::clone(&slot));

        let first = Arc::new(Recording::default());
        *slot.write() = Some(Arc::clone(&first) as Arc<dyn ReaderEventHandler>);
        listener.on_subscription_matched(MatchedStatus::default());

        let second = Arc::new(Recording::default());
        *slot.write() = Some(Arc::clone(&second) as Arc<dyn ReaderEventHandler>);
        listener.on_subscription_matched(MatchedStatus::default());

        assert_eq!(first.events.lock().len(), 1);
        assert_eq!(second.events.lock().len(), 1);
    }
}
