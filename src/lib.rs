//! # Sentinel Monitor
//!
//! Live host-telemetry aggregator feeding an adaptive terminal dashboard.
//!
//! Heterogeneous sources (kernel counters, log tails, external tools) are
//! polled at independent rates through a multi-rate cache, kept as bounded
//! histories for trend display, correlated for security threats over sliding
//! windows, and laid out on screen by an allocator that shares the available
//! rows among panels whose content varies at runtime.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sentinel_monitor::{evaluate, format_summary, Config, Engine};
//! use std::time::Instant;
//!
//! let config = Config::default();
//! let mut engine = Engine::new(config);
//! let snapshot = engine.tick(Instant::now());
//! let alerts = evaluate(&snapshot, &engine.config().alerts);
//! println!("{}", format_summary("now", &snapshot, &alerts));
//! ```
//!
//! ## Feature Flags
//!
//! - `tui` (default): ratatui dashboard, themes, key handling and the `sentinel` binary

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
// Allow unwrap() in tests only - banned in production code
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::must_use_candidate)]

// ============================================================================
// Core Modules
// ============================================================================

/// Error types and classification.
pub mod error;

/// Component-tagged debug logging.
pub mod debug;

/// Configuration file support.
pub mod config;

/// Fixed-capacity history buffers.
pub mod history;

/// Counter delta calculators.
pub mod delta;

/// Multi-rate source cache.
pub mod cache;

/// Bounded external tool invocation.
pub mod subprocess;

// ============================================================================
// Data Sources
// ============================================================================

/// Host, integration and log sources.
pub mod collectors;

/// Incremental log reading.
pub mod logtail;

/// Windowed threat detection.
pub mod threat;

// ============================================================================
// Aggregation
// ============================================================================

/// Per-tick data model.
pub mod snapshot;

/// The tick context owning every source and history.
pub mod engine;

/// Threshold alert evaluation.
pub mod alerts;

/// Adaptive screen partitioning.
pub mod layout;

// ============================================================================
// Headless Mode
// ============================================================================

/// One-line tick summary.
pub mod summary;

/// Service loop.
pub mod service;

// ============================================================================
// Interactive Surface
// ============================================================================

/// Color themes.
#[cfg(feature = "tui")]
#[cfg_attr(docsrs, doc(cfg(feature = "tui")))]
pub mod theme;

/// Key handling.
#[cfg(feature = "tui")]
#[cfg_attr(docsrs, doc(cfg(feature = "tui")))]
pub mod input;

/// Widgets and panel rendering.
#[cfg(feature = "tui")]
#[cfg_attr(docsrs, doc(cfg(feature = "tui")))]
pub mod ui;

/// Dashboard loop.
#[cfg(feature = "tui")]
#[cfg_attr(docsrs, doc(cfg(feature = "tui")))]
pub mod app;

// ============================================================================
// Re-exports
// ============================================================================

pub use alerts::{evaluate, Alert, Severity};
pub use config::Config;
pub use engine::Engine;
pub use error::{MonitorError, Result};
pub use layout::{allocate, DashboardLayout, LayoutMode};
pub use service::run_service;
pub use snapshot::Snapshot;
pub use summary::format_summary;

#[cfg(feature = "tui")]
pub use app::App;
#[cfg(feature = "tui")]
pub use theme::Theme;
