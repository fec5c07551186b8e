// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Errors returned by steward operations.
//!
//! Three recoverable classes cross the public surface: configuration errors
//! (bad file, unknown section, unknown preset), precondition errors (unknown
//! topic, duplicate reader) and runtime rejections (a [`RetCode`] other than
//! `Ok`/`NoData`). An unopenable configuration source is not represented
//! here: it terminates the process during the join call.
//!
//! [`RetCode`]: crate::runtime::RetCode

use crate::runtime::RetCode;

/// Errors surfaced by the steward public API.
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Configuration errors
    // ========================================================================
    /// Transport configuration file could not be parsed.
    ConfigParse(String),
    /// Named transport section does not exist in the configuration file.
    UnknownConfigSection(String),
    /// QoS preset name did not match any known profile.
    UnknownQosPreset(String),

    // ========================================================================
    // Precondition errors
    // ========================================================================
    /// No domain has been joined yet.
    NotJoined,
    /// A session is already bound to a different domain id.
    DomainMismatch {
        /// Domain the session is bound to.
        joined: u32,
        /// Domain the caller asked for.
        requested: u32,
    },
    /// Operation referenced a topic that was never registered.
    UnknownTopic(String),
    /// Operation referenced a reader name not registered under the topic.
    UnknownReader {
        /// Topic the reader was looked up under.
        topic: String,
        /// The missing reader name.
        reader: String,
    },
    /// Reader names must not be empty.
    EmptyReaderName(String),
    /// A reader with this name is already registered under the topic.
    DuplicateReader {
        /// Topic the reader was registered under.
        topic: String,
        /// The conflicting reader name.
        reader: String,
    },
    /// Argument outside the accepted range (e.g. a zero receive interval).
    InvalidArgument(String),

    // ========================================================================
    // Runtime errors
    // ========================================================================
    /// The Participant Runtime rejected an operation.
    Runtime {
        /// Operation that failed, e.g. `"create_reader"`.
        op: &'static str,
        /// The runtime's return code.
        code: RetCode,
    },
    /// Participant creation failed (typically factory exhaustion).
    ParticipantCreation(u32),
    /// One or more topic teardowns failed during bulk cleanup.
    PartialTeardown(usize),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // Configuration
            Error::ConfigParse(msg) => write!(f, "Transport config parse error: {}", msg),
            Error::UnknownConfigSection(name) => {
                write!(f, "Unknown transport config section '{}'", name)
            }
            Error::UnknownQosPreset(name) => write!(f, "Unknown QoS preset '{}'", name),
            // Precondition
            Error::NotJoined => write!(f, "No domain joined"),
            Error::DomainMismatch { joined, requested } => write!(
                f,
                "Session bound to domain {} but domain {} was requested",
                joined, requested
            ),
            Error::UnknownTopic(topic) => write!(f, "Topic '{}' has not been registered", topic),
            Error::UnknownReader { topic, reader } => write!(
                f,
                "Reader '{}' is not registered under topic '{}'",
                reader, topic
            ),
            Error::EmptyReaderName(topic) => {
                write!(f, "Reader name for topic '{}' must not be empty", topic)
            }
            Error::DuplicateReader { topic, reader } => write!(
                f,
                "Reader '{}' is already registered under topic '{}'",
                reader, topic
            ),
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            // Runtime
            Error::Runtime { op, code } => {
                write!(f, "Runtime rejected {}: {}", op, code.name())
            }
            Error::ParticipantCreation(domain) => {
                write!(f, "Failed to create participant for domain {}", domain)
            }
            Error::PartialTeardown(failed) => {
                write!(f, "{} topic teardown(s) failed during cleanup", failed)
            }
        }
    }
}

impl std::error::Error for Error {}

/// Convenient alias for API results using the public [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_entities_involved() {
        let err = Error::UnknownReader {
            topic: "sensors".to_string(),
            reader: "R1".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("sensors"));
        assert!(text.contains("R1"));
    }

    #[test]
    fn test_runtime_error_uses_symbolic_code_name() {
        let err = Error::Runtime {
            op: "delete_topic",
            code: RetCode::PreconditionNotMet,
        };
        assert!(err.to_string().contains("PRECONDITION_NOT_MET"));
    }
}
