// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport configuration source.
//!
//! The steward is configured by a YAML document of named transport sections:
//!
//! ```yaml
//! # steward.yaml
//! transports:
//!   default:
//!     instances:
//!       - name: rtps_main
//!         kind: rtps_udp
//!         multicast_group: 239.255.0.1
//!         rcv_buffer_size: 1048576
//!   low_latency:
//!     instances:
//!       - name: rtps_fast
//!         kind: rtps_udp
//!         heartbeat_period_ms: 50
//! ```
//!
//! The file path comes from the `STEWARD_CONFIG_FILE` environment variable,
//! falling back to `steward.yaml` next to the running executable or its
//! parent directory. A source that cannot be opened is fatal to the join
//! call: no meaningful domain join can proceed without infrastructure
//! configuration, so there is no partial/degraded mode.

use crate::error::{Error, Result};
use crate::logging::Sink;
use crate::transport::{TransportConfig, TransportInstance};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Conventional file name used when the environment variable is unset.
pub const DEFAULT_FILE_NAME: &str = "steward.yaml";

/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "STEWARD_CONFIG_FILE";

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigDoc {
    #[serde(default)]
    transports: HashMap<String, SectionSpec>,
}

#[derive(Debug, Clone, Deserialize)]
struct SectionSpec {
    #[serde(default)]
    instances: Vec<TransportInstance>,
}

/// Parsed transport configuration document.
#[derive(Debug, Clone)]
pub struct Config {
    doc: ConfigDoc,
}

impl Config {
    /// Parse a YAML document.
    pub fn parse(yaml: &str) -> Result<Self> {
        let doc: ConfigDoc =
            serde_yaml::from_str(yaml).map_err(|e| Error::ConfigParse(e.to_string()))?;
        Ok(Self { doc })
    }

    /// Load and parse a file.
    pub fn load(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigParse(format!("{}: {}", path.display(), e)))?;
        Self::parse(&yaml)
    }

    /// Empty configuration (built-in defaults only).
    #[must_use]
    pub fn empty() -> Self {
        Self {
            doc: ConfigDoc::default(),
        }
    }

    /// Whether a named section exists.
    #[must_use]
    pub fn has_section(&self, name: &str) -> bool {
        self.doc.transports.contains_key(name)
    }

    /// Build the named section as a bindable transport config.
    pub fn section(&self, name: &str) -> Result<TransportConfig> {
        let spec = self
            .doc
            .transports
            .get(name)
            .ok_or_else(|| Error::UnknownConfigSection(name.to_string()))?;
        Ok(TransportConfig {
            name: name.to_string(),
            instances: spec.instances.clone(),
        })
    }

    /// The default section, or a single built-in instance when the document
    /// does not define one.
    #[must_use]
    pub fn default_section(&self) -> TransportConfig {
        match self.section("default") {
            Ok(config) => config,
            Err(_) => TransportConfig {
                name: "default".to_string(),
                instances: vec![TransportInstance::default()],
            },
        }
    }
}

/// Resolve the configuration file path.
///
/// `STEWARD_CONFIG_FILE` wins when set; otherwise `steward.yaml` beside the
/// executable, then beside its parent directory.
#[must_use]
pub fn resolve_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));

    let beside_exe = exe_dir.join(DEFAULT_FILE_NAME);
    if beside_exe.exists() {
        return beside_exe;
    }
    exe_dir.join("..").join(DEFAULT_FILE_NAME)
}

/// Load the configuration source, terminating the process if it cannot be
/// opened.
///
/// Mirrors the "must have infra config to proceed" policy: a missing or
/// unreadable source leaves nothing sensible to join with.
pub fn load_or_exit(sink: &Sink) -> Config {
    let path = resolve_path();
    if !path.exists() {
        sink.error(&format!(
            "Unable to open '{}'. Set the '{}' environment variable or place {} next to the executable.",
            path.display(),
            CONFIG_ENV_VAR,
            DEFAULT_FILE_NAME
        ));
        std::process::exit(1);
    }
    match Config::load(&path) {
        Ok(config) => {
            sink.info(&format!("Loaded transport config from '{}'", path.display()));
            config
        }
        Err(e) => {
            sink.error(&format!("Transport config rejected: {}", e));
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportKind;
    use std::io::Write;

    const SAMPLE: &str = r#"
transports:
  default:
    instances:
      - name: rtps_main
        kind: rtps_udp
        multicast_group: 239.255.0.1
        rcv_buffer_size: 1048576
  low_latency:
    instances:
      - name: rtps_fast
        kind: rtps_udp
        heartbeat_period_ms: 50
      - name: shm0
        kind: shared_memory
"#;

    #[test]
    fn test_parse_sections() {
        let config = Config::parse(SAMPLE).expect("sample config parses");
        assert!(config.has_section("default"));
        assert!(config.has_section("low_latency"));
        assert!(!config.has_section("bulk"));

        let low = config.section("low_latency").expect("section exists");
        assert_eq!(low.instances.len(), 2);
        assert_eq!(low.instances[0].heartbeat_period_ms, 50);
        assert_eq!(low.instances[1].kind, TransportKind::SharedMemory);
    }

    #[test]
    fn test_unknown_section_is_an_error() {
        let config = Config::parse(SAMPLE).expect("sample config parses");
        let err = config.section("bulk").unwrap_err();
        assert!(matches!(err, Error::UnknownConfigSection(name) if name == "bulk"));
    }

    #[test]
    fn test_default_section_fallback() {
        let config = Config::empty();
        let default = config.default_section();
        assert_eq!(default.name, "default");
        assert_eq!(default.instances.len(), 1);
        assert_eq!(default.instances[0].kind, TransportKind::RtpsUdp);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(SAMPLE.as_bytes()).expect("write sample");

        let config = Config::load(file.path()).expect("file loads");
        assert!(config.has_section("default"));
        assert_eq!(
            config.default_section().instances[0].rcv_buffer_size,
            1_048_576
        );
    }

    #[test]
    fn test_malformed_yaml_is_a_parse_error() {
        let err = Config::parse("transports: [not, a, map]").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }
}
