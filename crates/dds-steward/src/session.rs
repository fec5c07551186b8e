// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Domain session: one Participant Runtime connection for one domain id.
//!
//! The session owns the join protocol: resolve the configuration source,
//! create the participant (with security properties when enabled), attach a
//! discovery monitor when callbacks were supplied, then build or reuse a
//! transport configuration and bind it. A session is bound to exactly one
//! domain id for its lifetime; a join for a different id is rejected without
//! side effects, and a repeat join for the same id is idempotent.

use crate::config::{self, Config};
use crate::error::{Error, Result};
use crate::logging::Sink;
use crate::runtime::{
    DomainId, ParticipantCallback, ParticipantHandle, ParticipantRuntime, Property,
};
use crate::transport::TransportAllocator;
use parking_lot::Mutex;
use std::sync::Arc;

/// Environment variable forcing the participant's bind address.
pub const BIND_ADDRESS_ENV_VAR: &str = "STEWARD_BIND_ADDRESS";

/// File-backed security artifacts, passed through as opaque properties.
#[derive(Debug, Clone)]
pub struct SecurityArtifacts {
    identity_ca: String,
    permissions_ca: String,
    identity_cert: String,
    identity_key: String,
    governance: String,
    permissions: String,
}

impl SecurityArtifacts {
    /// Wrap the artifact paths, applying the `file:` scheme the runtime's
    /// security plugin expects.
    #[must_use]
    pub fn from_files(
        identity_ca: &str,
        permissions_ca: &str,
        identity_cert: &str,
        identity_key: &str,
        governance: &str,
        permissions: &str,
    ) -> Self {
        let file = |path: &str| format!("file:{}", path);
        Self {
            identity_ca: file(identity_ca),
            permissions_ca: file(permissions_ca),
            identity_cert: file(identity_cert),
            identity_key: file(identity_key),
            governance: file(governance),
            permissions: file(permissions),
        }
    }

    fn properties(&self) -> Vec<Property> {
        vec![
            Property::new("dds.sec.auth.identity_ca", &self.identity_ca),
            Property::new("dds.sec.auth.identity_certificate", &self.identity_cert),
            Property::new("dds.sec.auth.private_key", &self.identity_key),
            Property::new("dds.sec.access.permissions_ca", &self.permissions_ca),
            Property::new("dds.sec.access.governance", &self.governance),
            Property::new("dds.sec.access.permissions", &self.permissions),
        ]
    }
}

#[derive(Default)]
struct SessionState {
    participant: Option<ParticipantHandle>,
    domain: Option<DomainId>,
}

/// Owns exactly one Participant Runtime connection for one domain id.
pub struct DomainSession {
    runtime: Arc<dyn ParticipantRuntime>,
    allocator: Arc<TransportAllocator>,
    sink: Sink,
    state: Mutex<SessionState>,
    security: Mutex<Option<SecurityArtifacts>>,
    config_override: Mutex<Option<Config>>,
}

impl DomainSession {
    /// New unjoined session.
    pub fn new(
        runtime: Arc<dyn ParticipantRuntime>,
        allocator: Arc<TransportAllocator>,
        sink: Sink,
    ) -> Self {
        Self {
            runtime,
            allocator,
            sink,
            state: Mutex::new(SessionState::default()),
            security: Mutex::new(None),
            config_override: Mutex::new(None),
        }
    }

    /// Inject an already-loaded configuration.
    ///
    /// When absent, the file source is resolved at join time and an
    /// unopenable source terminates the process. Embedders and tests use
    /// this to bypass the file system.
    pub fn preload_config(&self, config: Config) {
        *self.config_override.lock() = Some(config);
    }

    /// Enable security for subsequent joins.
    ///
    /// If the runtime build lacks security support, joins still succeed but
    /// emit a warning: security is neither silently enforced nor silently
    /// dropped.
    pub fn enable_security(&self, artifacts: SecurityArtifacts) {
        *self.security.lock() = Some(artifacts);
    }

    /// The participant handle, once joined.
    #[must_use]
    pub fn participant(&self) -> Option<ParticipantHandle> {
        self.state.lock().participant
    }

    /// The domain id this session is bound to, once joined.
    #[must_use]
    pub fn domain_id(&self) -> Option<DomainId> {
        self.state.lock().domain
    }

    /// Join a domain.
    ///
    /// Idempotent for the bound domain id; rejected for any other id. The
    /// optional `section` names a transport section from the configuration
    /// file and bypasses the per-domain port derivation by design.
    pub fn join(
        &self,
        domain: DomainId,
        section: Option<&str>,
        on_add: Option<ParticipantCallback>,
        on_remove: Option<ParticipantCallback>,
    ) -> Result<()> {
        let mut state = self.state.lock();

        if let Some(joined) = state.domain {
            if joined != domain {
                self.sink.error(&format!(
                    "Session already bound to domain {}; refusing join for domain {}",
                    joined, domain
                ));
                return Err(Error::DomainMismatch {
                    joined,
                    requested: domain,
                });
            }
            return Ok(());
        }

        let config = match self.config_override.lock().as_ref() {
            Some(config) => config.clone(),
            None => config::load_or_exit(&self.sink),
        };

        self.sink.info(&format!("Joining domain {}", domain));

        let properties = self.participant_properties();
        let participant = match self.runtime.create_participant(domain, &properties) {
            Ok(handle) => handle,
            Err(code) => {
                self.sink.error(&format!(
                    "Error creating participant for domain {}: {}. This can happen after deleting and recreating sessions past the factory limit.",
                    domain,
                    code.name()
                ));
                return Err(Error::ParticipantCreation(domain));
            }
        };

        if on_add.is_some() || on_remove.is_some() {
            let code = self
                .runtime
                .attach_discovery_monitor(participant, on_add, on_remove);
            if !code.is_ok() {
                self.sink.warning(&format!(
                    "Discovery monitor rejected for domain {}: {}",
                    domain,
                    code.name()
                ));
            }
        }

        if let Err(e) = self.bind_transport(participant, domain, section, &config) {
            // Roll back so a corrected retry starts from a clean slate.
            self.runtime.delete_participant(participant);
            return Err(e);
        }

        state.participant = Some(participant);
        state.domain = Some(domain);
        Ok(())
    }

    /// Enable the participant after entity setup.
    pub fn enable(&self) -> Result<()> {
        let participant = self.participant().ok_or(Error::NotJoined)?;
        let code = self.runtime.enable_participant(participant);
        if code.is_ok() {
            Ok(())
        } else {
            self.sink
                .error(&format!("Participant enable rejected: {}", code.name()));
            Err(Error::Runtime {
                op: "enable_participant",
                code,
            })
        }
    }

    /// Delete the participant's contained entities, then the participant.
    ///
    /// Topic groups must already be gone; this is the session's final step.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        if let Some(participant) = state.participant.take() {
            let code = self.runtime.delete_contained_entities(participant);
            if !code.is_ok() {
                self.sink.warning(&format!(
                    "delete_contained_entities rejected: {}",
                    code.name()
                ));
            }
            let code = self.runtime.delete_participant(participant);
            if !code.is_ok() {
                self.sink
                    .warning(&format!("delete_participant rejected: {}", code.name()));
            }
        }
        state.domain = None;
    }

    fn participant_properties(&self) -> Vec<Property> {
        let mut properties = Vec::new();

        match std::env::var(BIND_ADDRESS_ENV_VAR) {
            Ok(address) if !address.is_empty() => {
                properties.push(Property::new("network.bind_address", address));
            }
            _ => {
                self.sink.info(&format!(
                    "The '{}' environment variable is not set; using the default interface.",
                    BIND_ADDRESS_ENV_VAR
                ));
            }
        }

        if let Some(artifacts) = self.security.lock().as_ref() {
            if self.runtime.security_supported() {
                properties.extend(artifacts.properties());
            } else {
                self.sink.warning(
                    "Unable to initialize security: the runtime was built without security support.",
                );
            }
        }

        properties
    }

    fn bind_transport(
        &self,
        participant: ParticipantHandle,
        domain: DomainId,
        section: Option<&str>,
        config: &Config,
    ) -> Result<()> {
        if let Some(name) = section {
            // Caller opted into a named section: no port segregation logic.
            if !self.runtime.has_transport_config(name) {
                let section_config = config.section(name).map_err(|e| {
                    self.sink.error(&format!(
                        "Unable to find the transport section named '{}' in the configuration file.",
                        name
                    ));
                    e
                })?;
                let code = self.runtime.install_transport_config(section_config);
                if !code.is_ok() {
                    self.sink.error(&format!(
                        "Transport section '{}' rejected: {}",
                        name,
                        code.name()
                    ));
                    return Err(Error::Runtime {
                        op: "install_transport_config",
                        code,
                    });
                }
            }
            return self.bind_by_name(participant, name);
        }

        // Transport instances cannot be shared across participants, even
        // recreated ones for the same domain: derive a fresh uniquely-named
        // config from the default section.
        let (name, instance) = self.allocator.next_config_name(domain);

        if self.runtime.has_transport_config(&name) {
            self.sink.info(&format!(
                "Binding to existing transport config '{}'",
                name
            ));
            return self.bind_by_name(participant, &name);
        }

        let derived = config
            .default_section()
            .derive_for_domain(name.clone(), domain, instance);
        log::debug!(
            "[DomainSession] Installing transport config '{}' ({} instance(s))",
            name,
            derived.instances.len()
        );
        let code = self.runtime.install_transport_config(derived);
        if !code.is_ok() {
            self.sink.error(&format!(
                "Transport config '{}' rejected: {}",
                name,
                code.name()
            ));
            return Err(Error::Runtime {
                op: "install_transport_config",
                code,
            });
        }
        self.bind_by_name(participant, &name)
    }

    fn bind_by_name(&self, participant: ParticipantHandle, name: &str) -> Result<()> {
        let code = self.runtime.bind_transport_config(participant, name);
        if code.is_ok() {
            Ok(())
        } else {
            self.sink.error(&format!(
                "Binding transport config '{}' rejected: {}",
                name,
                code.name()
            ));
            Err(Error::Runtime {
                op: "bind_transport_config",
                code,
            })
        }
    }
}

impl std::fmt::Debug for DomainSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("DomainSession")
            .field("domain", &state.domain)
            .field("joined", &state.participant.is_some())
            .finish_non_exhaustive()
    }
}
