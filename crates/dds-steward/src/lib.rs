// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # dds-steward: lifecycle manager for DDS entities
//!
//! A lifecycle layer over a publish-subscribe Participant Runtime. The
//! steward turns string-keyed operations ("register this topic", "subscribe
//! to it with this filter", "publish to it") into correctly sequenced,
//! correctly synchronized calls into the runtime, and tracks ownership so
//! resources are destroyed in the dependency order the runtime requires and
//! never concurrently double-destroyed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dds_steward::{QosPreset, Steward};
//! use dds_steward::runtime::mock::MockRuntime;
//! use std::sync::Arc;
//!
//! # fn main() -> dds_steward::Result<()> {
//! let steward = Steward::builder(Arc::new(MockRuntime::new())).build();
//!
//! steward.join_domain(0)?;
//! steward.register_topic("sensors/temperature", "Temperature", QosPreset::LatestReliable)?;
//! steward.create_publisher("sensors/temperature")?;
//! steward.create_subscriber("sensors/temperature", "dashboard", "value > 25", &[])?;
//! steward.enable_domain()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------------+
//! |                           Steward (facade)                         |
//! +--------------------------------------------------------------------+
//! |  DomainSession          |  TopicRegistry                           |
//! |  join / enable /        |  topic name -> TopicGroup                |
//! |  security / discovery   |  (QoS, publisher, subscriber, readers,   |
//! |                         |   filter variants, delivery workers)     |
//! +-------------------------+------------------------------------------+
//! |  TransportAllocator     |  QoS dictionary   |  WorkerPool          |
//! +--------------------------------------------------------------------+
//! |              ParticipantRuntime (external transport)               |
//! +--------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Steward`] | Entry point: join, register, create, tear down |
//! | [`registry::TopicRegistry`] | Concurrent table of per-topic bundles |
//! | [`registry::TopicGroup`] | One topic's entities and teardown order |
//! | [`session::DomainSession`] | Join protocol and transport binding |
//! | [`runtime::ParticipantRuntime`] | Boundary to the actual transport |
//! | [`QosPreset`] | Named QoS profile applied atomically |
//!
//! ## Guarantees
//!
//! - Within one topic group, destruction always follows
//!   workers -> readers -> writer -> publisher -> subscriber
//!   -> filter topics -> topic.
//! - Reader names are exclusive per topic; replacing a reader's filter
//!   preserves its name and external identity.
//! - The registry lock is never held across a blocking runtime call.
//! - One transport configuration per participant instance, ever, via the
//!   per-domain instance counter.

/// Transport configuration source (YAML sections, env-var resolution).
pub mod config;
/// Delivery workers and the shared worker pool.
pub mod emitter;
/// Error type and result alias.
pub mod error;
/// Generic status listeners and process-wide handler slots.
pub mod listeners;
/// Operator-facing diagnostics sink.
pub mod logging;
/// QoS policies, per-entity values and the preset dictionary.
pub mod qos;
/// Topic group registry and per-topic resource bundles.
pub mod registry;
/// Participant Runtime boundary and the instrumented mock.
pub mod runtime;
/// Domain session: join protocol, security, transport binding.
pub mod session;
/// The public facade.
mod steward;
/// Transport isolation: instance counters and the port formula.
pub mod transport;

pub use error::{Error, Result};
pub use logging::{default_handler, MessageHandler, Severity};
pub use qos::{PublisherQos, QosPreset, ReaderQos, SubscriberQos, TopicQos, WriterQos};
pub use steward::{Steward, StewardBuilder, DEFAULT_WORKER_THREADS};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
