// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Join protocol and transport isolation: idempotence, domain binding,
//! config-name uniqueness, the port formula and security handling.

mod common;

use common::{capture_handler, steward, steward_sharing};
use dds_steward::config::Config;
use dds_steward::runtime::mock::MockRuntime;
use dds_steward::runtime::{ParticipantInfo, ParticipantRuntime};
use dds_steward::transport::{multicast_port, TransportAllocator};
use dds_steward::{Error, Steward};
use std::sync::Arc;
use std::time::SystemTime;

const SECTIONED: &str = r#"
transports:
  default:
    instances:
      - name: rtps_main
        kind: rtps_udp
        rcv_buffer_size: 1048576
  low_latency:
    instances:
      - name: rtps_fast
        kind: rtps_udp
        multicast_port: 9400
        heartbeat_period_ms: 50
"#;

#[test]
fn test_join_is_idempotent_for_the_same_domain() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = steward(&runtime);

    steward.join_domain(7).expect("first join");
    steward.join_domain(7).expect("repeat join is a no-op");

    let participants = runtime
        .call_log()
        .iter()
        .filter(|call| call.starts_with("create_participant"))
        .count();
    assert_eq!(participants, 1, "repeat join must not create a participant");
    assert_eq!(steward.domain_id(), Some(7));
}

#[test]
fn test_join_for_a_different_domain_is_rejected() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = steward(&runtime);

    steward.join_domain(1).expect("first join");
    let err = steward.join_domain(2).unwrap_err();
    assert!(matches!(
        err,
        Error::DomainMismatch {
            joined: 1,
            requested: 2
        }
    ));

    // No side effects: still bound to the original domain.
    assert_eq!(steward.domain_id(), Some(1));
    assert_eq!(runtime.live_entities().participants, 1);
}

#[test]
fn test_sequential_joins_derive_unique_monotonic_config_names() {
    let runtime = Arc::new(MockRuntime::new());
    let allocator = Arc::new(TransportAllocator::new());

    // Three sessions join the same domain in one process; each must get
    // its own transport config.
    let stewards: Vec<Steward> = (0..3)
        .map(|_| steward_sharing(&runtime, &allocator))
        .collect();
    for steward in &stewards {
        steward.join_domain(5).expect("join");
    }

    let installed: Vec<String> = runtime
        .call_log()
        .iter()
        .filter(|call| call.starts_with("install_transport_config"))
        .cloned()
        .collect();
    assert_eq!(
        installed,
        vec![
            "install_transport_config(config-5-1)".to_string(),
            "install_transport_config(config-5-2)".to_string(),
            "install_transport_config(config-5-3)".to_string(),
        ]
    );
}

#[test]
fn test_derived_config_applies_the_port_formula() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = steward(&runtime);

    steward.join_domain(4).expect("join");

    let config = runtime
        .transport_config("config-4-1")
        .expect("derived config installed");
    assert_eq!(config.instances.len(), 1);
    let instance = &config.instances[0];
    assert_eq!(instance.name, "rtps_udp-4-1");
    assert_eq!(instance.multicast_port, 8401);
    assert_eq!(instance.multicast_port, multicast_port(4));
}

#[test]
fn test_derived_config_copies_default_section_parameters() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = Steward::builder(Arc::clone(&runtime) as Arc<dyn ParticipantRuntime>)
        .message_handler(common::quiet_handler())
        .config(Config::parse(SECTIONED).expect("config parses"))
        .build();

    steward.join_domain(0).expect("join");

    let config = runtime
        .transport_config("config-0-1")
        .expect("derived config installed");
    // Tuned default-section knobs carry over; only the port is patched.
    assert_eq!(config.instances[0].rcv_buffer_size, 1_048_576);
    assert_eq!(config.instances[0].multicast_port, 7401);
}

#[test]
fn test_named_section_bypasses_port_derivation() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = Steward::builder(Arc::clone(&runtime) as Arc<dyn ParticipantRuntime>)
        .message_handler(common::quiet_handler())
        .config(Config::parse(SECTIONED).expect("config parses"))
        .build();

    steward
        .join_domain_with(3, Some("low_latency"), None, None)
        .expect("join with named section");

    // The named section is installed verbatim, no per-domain derivation.
    let config = runtime
        .transport_config("low_latency")
        .expect("named section installed");
    assert_eq!(config.instances[0].multicast_port, 9400);
    assert!(runtime.transport_config("config-3-1").is_none());
}

#[test]
fn test_unknown_named_section_is_recoverable() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = steward(&runtime);

    let err = steward
        .join_domain_with(0, Some("no_such_section"), None, None)
        .unwrap_err();
    assert!(matches!(err, Error::UnknownConfigSection(_)));

    // The half-joined participant was rolled back; a corrected join works.
    assert_eq!(runtime.live_entities().participants, 0);
    assert_eq!(steward.domain_id(), None);
    steward.join_domain(0).expect("corrected join succeeds");
}

#[test]
fn test_participant_factory_exhaustion_is_recoverable() {
    let runtime = Arc::new(MockRuntime::new());
    runtime.set_participant_limit(0);
    let steward = steward(&runtime);

    let err = steward.join_domain(0).unwrap_err();
    assert!(matches!(err, Error::ParticipantCreation(0)));
    assert_eq!(steward.domain_id(), None);
}

#[test]
fn test_enable_requires_a_joined_domain() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = steward(&runtime);

    assert!(matches!(
        steward.enable_domain().unwrap_err(),
        Error::NotJoined
    ));

    steward.join_domain(0).expect("join");
    steward.enable_domain().expect("enable after join");
    assert!(runtime
        .call_log()
        .iter()
        .any(|call| call.starts_with("enable_participant")));
}

#[test]
fn test_security_unsupported_build_warns_but_joins() {
    let runtime = Arc::new(MockRuntime::new());
    runtime.set_security_supported(false);

    let (handler, lines) = capture_handler();
    let steward = Steward::builder(Arc::clone(&runtime) as Arc<dyn ParticipantRuntime>)
        .message_handler(handler)
        .config(Config::empty())
        .build();

    steward.enable_security(
        "ca.pem",
        "perm_ca.pem",
        "cert.pem",
        "key.pem",
        "governance.xml",
        "permissions.xml",
    );
    steward.join_domain(0).expect("join still succeeds");

    let warned = lines
        .lock()
        .iter()
        .any(|line| line.contains("without security support"));
    assert!(warned, "security must not be silently dropped");
}

#[test]
fn test_discovery_callbacks_report_peers() {
    let runtime = Arc::new(MockRuntime::new());
    let (handler, lines) = capture_handler();
    let steward = Steward::builder(Arc::clone(&runtime) as Arc<dyn ParticipantRuntime>)
        .message_handler(handler)
        .config(Config::empty())
        .build();

    steward.join_domain(9).expect("join");

    runtime.announce_participant(&ParticipantInfo {
        ip_address: "192.168.1.20".to_string(),
        guid: "0a0b0c".to_string(),
        discovered_at: SystemTime::now(),
    });
    runtime.depart_participant(&ParticipantInfo {
        ip_address: "192.168.1.20".to_string(),
        guid: "0a0b0c".to_string(),
        discovered_at: SystemTime::now(),
    });

    let lines = lines.lock();
    assert!(lines
        .iter()
        .any(|line| line.contains("joined domain 9") && line.contains("192.168.1.20")));
    assert!(lines
        .iter()
        .any(|line| line.contains("left domain 9") && line.contains("0a0b0c")));
}

#[test]
fn test_monitor_not_attached_without_callbacks() {
    let runtime = Arc::new(MockRuntime::new());
    let steward = steward(&runtime);

    steward
        .join_domain_with(0, None, None, None)
        .expect("join without callbacks");
    assert!(!runtime
        .call_log()
        .iter()
        .any(|call| call.starts_with("attach_discovery_monitor")));
}
