//! Stock planning service library.
//!
//! Exposes the replenishment planner over HTTP and persists committed plans
//! as replenishment records. Kept as a library so the router can be driven
//! in-process by tests and reused by the CLI.
//!
//! # Modules
//!
//! - [`config`] - Environment configuration
//! - [`db`] - `PostgreSQL` collaborators
//! - [`services`] - Input aggregation, planning and the persistence seams
//! - [`routes`] - JSON API

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
