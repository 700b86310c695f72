//! Stock Planning Core - Domain types and the replenishment engine.
//!
//! This crate provides the pieces shared by every stock planning component:
//! - `admin` - Internal HTTP service that gathers planning data and persists plans
//! - `cli` - Command-line tools for migrations and offline planning runs
//!
//! # Architecture
//!
//! The core crate contains only types and pure computation - no I/O, no
//! database access, no HTTP clients. Data is fetched by the caller and handed
//! to the engine as in-memory maps.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for SKU/store codes, quantities and planning windows
//! - [`replenishment`] - Segment merging, greedy allocation and summaries

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod replenishment;
pub mod types;

pub use types::*;
