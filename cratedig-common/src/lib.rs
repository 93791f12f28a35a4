//! # cratedig Common Library
//!
//! Shared code for the cratedig dataset-curation tools including:
//! - Catalog model (JSONL upload records from ccMixter)
//! - Selection persistence (one upload id per line)
//! - Engine status types and the StatusBus broadcaster
//! - Configuration path resolution
//! - HTTP client construction (identifying headers, relaxed TLS)

pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod http;
pub mod selection;

pub use error::{Error, Result};
pub use events::{EngineStatus, StatusBus};
