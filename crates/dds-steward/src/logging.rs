// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Operator-facing diagnostics sink.
//!
//! Every failure path in the public API reports a specific diagnostic (which
//! topic, which reader, which preset) through a single message handler before
//! the error is returned, so operators can tell "never registered" from
//! "already registered" from "runtime rejected". The handler is a plain
//! callback `(Severity, &str)`; the default writes `Info` to stdout and
//! `Warning`/`Error` to stderr.
//!
//! Internal fine-grained tracing goes through the `log` crate as usual; the
//! sink mirrors everything it emits to `log` so both channels stay coherent.

use std::sync::Arc;

/// Severity attached to each handler message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Normal operational information.
    Info,
    /// Something degraded but the operation continued.
    Warning,
    /// The operation failed.
    Error,
}

/// User-supplied message handler callback.
pub type MessageHandler = Arc<dyn Fn(Severity, &str) + Send + Sync>;

/// Default handler: info to stdout, warnings and errors to stderr.
pub fn default_handler() -> MessageHandler {
    Arc::new(|severity, message| match severity {
        Severity::Info => println!("dds-steward: {}", message),
        Severity::Warning | Severity::Error => eprintln!("dds-steward: {}", message),
    })
}

/// Shared diagnostics sink handed to every component.
#[derive(Clone)]
pub struct Sink {
    handler: MessageHandler,
}

impl Sink {
    /// Wrap a user handler.
    pub fn new(handler: MessageHandler) -> Self {
        Self { handler }
    }

    /// Sink backed by [`default_handler`].
    pub fn stdio() -> Self {
        Self::new(default_handler())
    }

    /// Emit an informational message.
    pub fn info(&self, message: &str) {
        log::info!("{}", message);
        (self.handler)(Severity::Info, message);
    }

    /// Emit a warning.
    pub fn warning(&self, message: &str) {
        log::warn!("{}", message);
        (self.handler)(Severity::Warning, message);
    }

    /// Emit an error diagnostic.
    pub fn error(&self, message: &str) {
        log::error!("{}", message);
        (self.handler)(Severity::Error, message);
    }
}

impl std::fmt::Debug for Sink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sink").finish_non_exhaustive()
    }
}
