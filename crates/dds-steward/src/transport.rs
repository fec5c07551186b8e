// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport isolation: per-domain config derivation and instance counting.
//!
//! The underlying transport type forbids two live participants from sharing
//! one transport instance, and that includes a destroyed-then-recreated
//! participant for the same domain. A process-wide counter per domain id is
//! the minimal state that guarantees globally unique config names, so each
//! join derives `"config-<domain>-<instance>"` from [`TransportAllocator`]
//! and builds a fresh config patched from the default section.
//!
//! Port derivation follows the standard per-domain multicast relation
//! `port = PB + DG * domain_id + D2`. Every other parameter is copied
//! verbatim from the default section; non-multicast transport kinds pass
//! through unmodified.

use crate::runtime::DomainId;
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;

/// Base port of the per-domain multicast formula.
pub const PORT_BASE: u16 = 7400;

/// Domain gain of the per-domain multicast formula.
pub const DOMAIN_ID_GAIN: u16 = 250;

/// Fixed offset of the per-domain multicast formula.
pub const PORT_OFFSET_D2: u16 = 1;

/// Multicast port for a domain id: `7400 + 250 * domain + 1`.
///
/// Domain 0 maps to 7401, domain 4 to 8401.
#[must_use]
pub fn multicast_port(domain: DomainId) -> u16 {
    PORT_BASE + DOMAIN_ID_GAIN * domain as u16 + PORT_OFFSET_D2
}

/// Transport kinds a configuration section may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// RTPS over UDP with multicast discovery; subject to the port formula.
    RtpsUdp,
    /// Point-to-point TCP; copied through unmodified.
    Tcp,
    /// Intra-host shared memory; copied through unmodified.
    SharedMemory,
}

/// One transport instance inside a configuration section.
///
/// The field set mirrors what the default section is allowed to tune; the
/// per-domain derivation copies all of it and overrides only the multicast
/// port (and the instance name) for [`TransportKind::RtpsUdp`] instances.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransportInstance {
    pub name: String,
    pub kind: TransportKind,
    pub multicast_group: String,
    pub multicast_port: u16,
    pub multicast_interface: String,
    pub ttl: u8,
    pub use_multicast: bool,
    pub rcv_buffer_size: u32,
    pub send_buffer_size: u32,
    pub max_message_size: u32,
    pub max_packet_size: u32,
    pub optimum_packet_size: u32,
    pub max_samples_per_packet: u32,
    pub anticipated_fragments: u32,
    pub heartbeat_period_ms: u64,
    pub nak_depth: u32,
    pub nak_response_delay_ms: u64,
    pub send_delay_ms: u64,
    pub receive_address_duration_ms: u64,
    pub thread_per_connection: bool,
    pub responsive_mode: bool,
}

impl Default for TransportInstance {
    fn default() -> Self {
        Self {
            name: "rtps_main".to_string(),
            kind: TransportKind::RtpsUdp,
            multicast_group: "239.255.0.1".to_string(),
            multicast_port: PORT_BASE,
            multicast_interface: String::new(),
            ttl: 1,
            use_multicast: true,
            rcv_buffer_size: 65_536,
            send_buffer_size: 65_536,
            max_message_size: 65_466,
            max_packet_size: 65_466,
            optimum_packet_size: 4_096,
            max_samples_per_packet: 10,
            anticipated_fragments: 4,
            heartbeat_period_ms: 1_000,
            nak_depth: 32,
            nak_response_delay_ms: 200,
            send_delay_ms: 10,
            receive_address_duration_ms: 5_000,
            thread_per_connection: false,
            responsive_mode: false,
        }
    }
}

/// A named transport configuration bindable to a participant.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransportConfig {
    pub name: String,
    pub instances: Vec<TransportInstance>,
}

impl TransportConfig {
    /// Derive the per-domain variant of this configuration.
    ///
    /// Multicast instances are renamed `"rtps_udp-<domain>-<instance>"` and
    /// their port replaced by the formula value; everything else is copied
    /// verbatim.
    #[must_use]
    pub fn derive_for_domain(&self, name: String, domain: DomainId, instance: u32) -> Self {
        let port = multicast_port(domain);
        let instances = self
            .instances
            .iter()
            .map(|inst| {
                if inst.kind == TransportKind::RtpsUdp {
                    let mut patched = inst.clone();
                    patched.name = format!("rtps_udp-{}-{}", domain, instance);
                    patched.multicast_port = port;
                    patched
                } else {
                    inst.clone()
                }
            })
            .collect();

        TransportConfig { name, instances }
    }
}

/// Process-wide counter of transport instances per domain.
///
/// Allocation is serialized under its own mutex, independent of the topic
/// registry lock: it happens once per domain join and must not block topic
/// operations on other domains. Injected into the session rather than kept
/// as a true global so tests can reset it between cases.
#[derive(Debug, Default)]
pub struct TransportAllocator {
    counters: Mutex<HashMap<DomainId, u32>>,
}

impl TransportAllocator {
    /// New allocator with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the counter for a domain and derive the next config name.
    ///
    /// Returns the name and the instance number it encodes.
    pub fn next_config_name(&self, domain: DomainId) -> (String, u32) {
        let mut counters = self.counters.lock();
        let counter = counters.entry(domain).or_insert(0);
        *counter += 1;
        let instance = *counter;
        (format!("config-{}-{}", domain, instance), instance)
    }

    /// Instances allocated so far for a domain.
    #[must_use]
    pub fn instance_count(&self, domain: DomainId) -> u32 {
        self.counters.lock().get(&domain).copied().unwrap_or(0)
    }
}
