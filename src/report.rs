// src/report.rs

//! Reporting channel for action diagnostics.
//!
//! Action code only ever *writes* events. What happens to them (printing,
//! aggregation, deduplication) is up to the sink:
//!
//! - [`ChannelReporter`] forwards events over an unbounded mpsc channel, so
//!   `report` never blocks and events from one sender stay in order.
//! - [`TracingReporter`] logs each event through `tracing`.

use std::fmt;
use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::action::ActionOwner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        })
    }
}

/// One diagnostic, attributed to the action that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub severity: Severity,
    pub message: String,
    pub owner: ActionOwner,
    pub mnemonic: String,
    /// Offending artifact path, for shape violations.
    pub path: Option<PathBuf>,
}

impl Event {
    pub fn new(
        severity: Severity,
        message: impl Into<String>,
        owner: ActionOwner,
        mnemonic: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            message: message.into(),
            owner,
            mnemonic: mnemonic.into(),
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} [{}]: {}",
            self.severity, self.owner, self.mnemonic, self.message
        )
    }
}

/// Sink for action diagnostics.
///
/// Implementations must be safe to call from many workers at once and must
/// not block the caller.
pub trait Reporter: Send + Sync + fmt::Debug {
    fn report(&self, event: Event);
}

/// Reporter backed by an unbounded mpsc channel.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: mpsc::UnboundedSender<Event>,
}

impl ChannelReporter {
    /// Create a reporter and the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Reporter for ChannelReporter {
    fn report(&self, event: Event) {
        // Receiver gone means nobody is listening any more; drop the event.
        let _ = self.tx.send(event);
    }
}

/// Reporter that logs every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: Event) {
        let owner = event.owner.label();
        let path = event.path.as_ref().map(|p| p.display().to_string());
        match event.severity {
            Severity::Error => error!(
                owner,
                mnemonic = %event.mnemonic,
                path = ?path,
                "{}",
                event.message
            ),
            Severity::Warning => warn!(
                owner,
                mnemonic = %event.mnemonic,
                path = ?path,
                "{}",
                event.message
            ),
            Severity::Info => info!(
                owner,
                mnemonic = %event.mnemonic,
                path = ?path,
                "{}",
                event.message
            ),
        }
    }
}
