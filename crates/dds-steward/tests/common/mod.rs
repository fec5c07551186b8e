// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared helpers for the integration suites.
#![allow(dead_code)]

use dds_steward::config::Config;
use dds_steward::logging::MessageHandler;
use dds_steward::runtime::mock::MockRuntime;
use dds_steward::runtime::ParticipantRuntime;
use dds_steward::transport::TransportAllocator;
use dds_steward::{QosPreset, Steward};
use parking_lot::Mutex;
use std::sync::Arc;

/// Handler that swallows diagnostics to keep test output clean.
pub fn quiet_handler() -> MessageHandler {
    Arc::new(|_, _| {})
}

/// Handler that records every diagnostic line.
pub fn capture_handler() -> (MessageHandler, Arc<Mutex<Vec<String>>>) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let lines_clone = Arc::clone(&lines);
    let handler: MessageHandler = Arc::new(move |_severity, message: &str| {
        lines_clone.lock().push(message.to_string());
    });
    (handler, lines)
}

/// Steward over a mock runtime with an empty injected config.
pub fn steward(runtime: &Arc<MockRuntime>) -> Steward {
    Steward::builder(Arc::clone(runtime) as Arc<dyn ParticipantRuntime>)
        .message_handler(quiet_handler())
        .config(Config::empty())
        .build()
}

/// Steward sharing an allocator with other stewards in the test.
pub fn steward_sharing(
    runtime: &Arc<MockRuntime>,
    allocator: &Arc<TransportAllocator>,
) -> Steward {
    Steward::builder(Arc::clone(runtime) as Arc<dyn ParticipantRuntime>)
        .message_handler(quiet_handler())
        .allocator(Arc::clone(allocator))
        .config(Config::empty())
        .build()
}

/// Join domain 0 and register one topic under the given preset.
pub fn joined_with_topic(runtime: &Arc<MockRuntime>, topic: &str, preset: QosPreset) -> Steward {
    let steward = steward(runtime);
    steward.join_domain(0).expect("join domain 0");
    steward
        .register_topic(topic, "SampleType", preset)
        .expect("register topic");
    steward
}
