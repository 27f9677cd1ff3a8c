//! # Matchdeck Core
//!
//! Startup resolution and result delivery: turns a URL typed by a founder
//! into a resolved startup, runs the timed scan while the resolver answers,
//! and renders the investor-match results page.
//!
//! ## Architecture
//!
//! - `startup/` - URL normalization and the `Resolver` seam
//! - `scan/` - Scan orchestrator, phase timer and results destinations
//! - `results/` - Results contract, payload fetching and the page state machine
//! - `state/` - SQLite-backed startup directory, payload store and shared views
//! - `backend/` - Local or hosted resolver/fetcher selection
//! - `config` - `.matchdeck/config.json` plus environment overrides
//!
//! ## Usage
//!
//! ```rust,ignore
//! use matchdeck_core::scan::ScanOrchestrator;
//! use matchdeck_core::results::ResultPage;
//!
//! let orchestrator = ScanOrchestrator::new(backends.resolver.clone());
//! let decision = orchestrator.run("acme.io").await?;
//!
//! let mut page = ResultPage::new();
//! page.open(backends.fetcher.as_ref(), &decision.destination).await;
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod results;
pub mod scan;
pub mod startup;
pub mod state;

pub use backend::Backends;
pub use config::MatchdeckConfig;
pub use error::{FetchError, ResolutionError, ResolveError, ValidationError};
