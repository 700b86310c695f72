//! Core types for stock planning.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod code;
pub mod quantity;
pub mod window;

pub use code::*;
pub use quantity::{Quantity, QuantityError};
pub use window::{PlanningWindow, WindowError};
