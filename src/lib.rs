//! Harvester Core Library
//!
//! This library drives a real browser through an authenticated content
//! platform, finds the current hot-list articles, and saves each one as a
//! PDF document.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`driver`] - Browser-automation capability and the Chrome implementation
//! - [`session`] - Credential storage, liveness checks, interactive login
//! - [`discovery`] - Ranked content discovery with a strategy cascade
//! - [`extract`] - Article title, text and markup extraction
//! - [`export`] - PDF export with native rendering and browser-print fallback
//! - [`pipeline`] - The orchestrator tying the stages together
//! - [`config`] - Run configuration and defaults

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod atomic_file;
pub mod config;
pub mod discovery;
pub mod driver;
pub mod export;
pub mod extract;
pub mod pipeline;
pub mod session;

// Re-export commonly used types
pub use config::{ConfigError, HarvestConfig};
pub use discovery::{ContentItem, ContentLocator, DiscoveryReport, DiscoveryStrategy};
pub use driver::{BrowserDriver, ChromiumDriver, DriverError, LaunchOptions};
pub use export::{DocumentExporter, ExportResult, ExportStrategyKind, ExportTarget};
pub use extract::{ContentExtractor, ExtractedContent, ExtractionError};
pub use pipeline::{
    FatalError, ItemOutcome, ItemRecord, Orchestrator, PipelineState, RunProgress, RunSummary,
};
pub use session::{
    Credential, Liveness, LivenessProbe, LoginSignal, MarkerProbe, PersistenceError, SameSite,
    Session, SessionError, SessionStore, StdinConfirmation,
};
